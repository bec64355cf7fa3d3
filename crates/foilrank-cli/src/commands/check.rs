use crate::cli::CheckTemplateArgs;
use crate::config::{CommandOverrides, build_config};
use crate::error::{CliError, Result};
use foilrank::engine::case::{CaseFamily, CaseManager};
use foilrank::engine::config::PipelineConfig;
use foilrank::engine::error::EngineError;
use tracing::info;

/// Case managers for every family the configuration would run.
fn managers(config: &PipelineConfig) -> Vec<CaseManager> {
    let mut managers = vec![CaseManager::new(
        CaseFamily::Sweep,
        &config.field.template_dir,
        &config.field.cases_root,
    )];
    if config.detailed.enabled {
        managers.push(CaseManager::new(
            CaseFamily::Detailed,
            &config.detailed.template_dir,
            &config.field.cases_root,
        ));
    }
    managers
}

pub fn run(args: CheckTemplateArgs) -> Result<()> {
    let app_config = build_config(&args.common, &CommandOverrides::default())?;

    let mut incomplete = 0;
    for manager in managers(&app_config.core_config) {
        let family = manager.family().name();
        info!(family, template = %manager.template_dir().display(), "Checking template.");
        match manager.validate_template() {
            Ok(()) => println!(
                "✓ {} template {} is complete.",
                family,
                manager.template_dir().display()
            ),
            Err(EngineError::Configuration {
                missing,
                remediation,
                ..
            }) => {
                incomplete += 1;
                println!(
                    "✗ {} template {} is missing {} path(s):",
                    family,
                    manager.template_dir().display(),
                    missing.len()
                );
                for path in &missing {
                    println!("    {}", path);
                }
                println!("  {}", remediation);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if incomplete > 0 {
        return Err(CliError::Config(format!(
            "{} case template(s) are incomplete",
            incomplete
        )));
    }
    Ok(())
}
