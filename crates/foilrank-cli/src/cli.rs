use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tropochief Airframe Team",
    version,
    about = "FoilRank CLI - Screen, verify and rank airfoil candidates with a panel solver and a field solver.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of solver runs executed concurrently.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep every candidate through the panel solver and rank the polars.
    Screen(ScreenArgs),
    /// Run field-solver cases per candidate and angle, then rank, with an optional detailed stage.
    Verify(VerifyArgs),
    /// Check that the field-solver case templates contain every required file.
    CheckTemplate(CheckTemplateArgs),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to the configuration file in TOML format.
    /// Defaults to `foilrank.toml` in the working directory when present.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the candidate list, e.g. `--candidates NACA2412,E168`.
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub candidates: Vec<String>,

    /// Override the directory holding `<name>.dat` coordinate files.
    #[arg(short, long, value_name = "PATH")]
    pub geometry_dir: Option<PathBuf>,

    /// Override the free-stream velocity in m/s.
    #[arg(long, value_name = "FLOAT")]
    pub velocity: Option<f64>,

    /// Override the reference chord in m.
    #[arg(long, value_name = "FLOAT")]
    pub chord: Option<f64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S flow.velocity=25
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `screen` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ScreenArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Override the panel-solver executable.
    #[arg(long, value_name = "PATH")]
    pub solver: Option<PathBuf>,

    /// Override the viscous iteration limit per angle.
    #[arg(long, value_name = "INT")]
    pub iterations: Option<u32>,
}

/// Arguments for the `verify` subcommand.
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub mode: ModeFlags,

    #[command(flatten)]
    pub stages: StageFlags,

    /// Re-apply geometry, angle marker and inlet velocity to cases that already exist.
    #[arg(long)]
    pub overwrite: bool,

    /// Override the script sourced before every phase plan.
    #[arg(long, value_name = "PATH")]
    pub env_script: Option<String>,

    /// Override the directory case families are created in.
    #[arg(long, value_name = "PATH")]
    pub cases_root: Option<PathBuf>,
}

/// Mutually exclusive execution modes; the default runs every phase.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct ModeFlags {
    /// Create and mesh cases only; nothing is solved, parsed or scored.
    #[arg(long)]
    pub mesh_only: bool,
    /// Run no solver; parse and score results already on disk.
    #[arg(long)]
    pub post_only: bool,
}

/// Mutually exclusive stage selection; the default runs both stages.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct StageFlags {
    /// Skip the detailed pressure-distribution stage.
    #[arg(long)]
    pub no_detailed: bool,
    /// Run only the detailed stage; existing sweep results are re-parsed.
    #[arg(long)]
    pub detailed_only: bool,
}

/// Arguments for the `check-template` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckTemplateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}
