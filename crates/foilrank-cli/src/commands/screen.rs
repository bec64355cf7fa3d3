use super::{print_failures, print_ranking};
use crate::cli::ScreenArgs;
use crate::config::{CommandOverrides, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use foilrank::engine::process::SystemProcessRunner;
use foilrank::engine::progress::ProgressReporter;
use foilrank::workflows::screen;
use tracing::info;

pub fn run(args: ScreenArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let overrides = CommandOverrides {
        panel_executable: args.solver.clone(),
        iterations: args.iterations,
        ..Default::default()
    };
    let app_config = build_config(&args.common, &overrides)?;
    let config = &app_config.core_config;
    if let Some(source) = &app_config.source {
        info!("Configuration loaded from {:?}", source);
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Screening {} candidate(s) with {} (Re = {:.0})...",
        config.candidates.len(),
        config.panel.executable.display(),
        config.flow.reynolds()
    );
    info!("Invoking the core screening workflow...");

    let result = screen::run(config, &SystemProcessRunner, &reporter)?;

    info!(
        "Workflow finished with {} usable polar(s) and {} failure(s).",
        result.tables.len(),
        result.failures.len()
    );

    print_ranking("Screening ranking", &result.ranking.scores, false);
    print_failures(&result.failures);

    let output = &config.output;
    println!(
        "\n✓ Tables written to: {}",
        output.processed_dir.join(screen::STAGE).display()
    );
    Ok(())
}
