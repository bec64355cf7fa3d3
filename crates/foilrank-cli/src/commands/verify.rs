use super::{print_failures, print_ranking};
use crate::cli::{ModeFlags, StageFlags, VerifyArgs};
use crate::config::{CommandOverrides, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use foilrank::engine::process::SystemProcessRunner;
use foilrank::engine::progress::ProgressReporter;
use foilrank::workflows::verify::{self, ExecutionMode, VerifyOptions};
use tracing::{info, warn};

fn options_from_flags(mode: ModeFlags, stages: StageFlags, overwrite: bool) -> VerifyOptions {
    let mode = if mode.mesh_only {
        ExecutionMode::MeshOnly
    } else if mode.post_only {
        ExecutionMode::PostProcessOnly
    } else {
        ExecutionMode::Full
    };
    VerifyOptions {
        mode,
        run_sweep: !stages.detailed_only,
        detailed: !stages.no_detailed,
        overwrite,
    }
}

pub fn run(args: VerifyArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let overrides = CommandOverrides {
        env_script: args.env_script.clone(),
        cases_root: args.cases_root.clone(),
        ..Default::default()
    };
    let app_config = build_config(&args.common, &overrides)?;
    let config = &app_config.core_config;
    let options = options_from_flags(args.mode, args.stages, args.overwrite);

    if options.detailed && !config.detailed.enabled {
        warn!("The detailed stage is disabled in the configuration; only the sweep will run.");
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Verifying {} candidate(s) at {} angle(s) under {}...",
        config.candidates.len(),
        config.field.angles.len(),
        config.field.cases_root.display()
    );
    info!(?options, "Invoking the core verification workflow...");

    let result = verify::run(config, &options, &SystemProcessRunner, &reporter)?;

    info!(
        "Workflow finished: {} case(s) completed, {} failure(s).",
        result.completed_cases,
        result.failures.len()
    );

    if options.mode == ExecutionMode::MeshOnly {
        println!("\n✓ Meshed {} case(s).", result.completed_cases);
        print_failures(&result.failures);
        return Ok(());
    }

    print_ranking("Verification ranking", &result.ranking.scores, false);
    if !result.detailed_scores.is_empty() {
        print_ranking(
            "Detailed ranking (with pressure distribution)",
            &result.detailed_scores,
            true,
        );
    }
    print_failures(&result.failures);

    println!(
        "\n✓ Tables written to: {}",
        config.output.processed_dir.join(verify::STAGE).display()
    );
    Ok(())
}
