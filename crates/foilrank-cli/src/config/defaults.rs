use std::path::PathBuf;

/// Values the CLI falls back to when neither a flag nor the config file provides one.
/// Section defaults (flow, sweep, weights, solver settings) come from the library types.
pub struct DefaultsConfig {
    pub config_file: PathBuf,
    pub geometry_dir: PathBuf,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("foilrank.toml"),
            geometry_dir: PathBuf::from("geometry"),
        }
    }
}
