use foilrank::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    /// The configuration file that was loaded, if any.
    pub source: Option<PathBuf>,
    pub core_config: core_config::PipelineConfig,
}
