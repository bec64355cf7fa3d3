use foilrank::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// A screening or verification workflow aborted, e.g. an incomplete case template or
    /// an unwritable results directory. Per-case solver failures are reported, not raised.
    #[error(transparent)]
    Workflow(#[from] EngineError),

    /// The merged settings are unusable: a malformed `-S key=value` override, weights that
    /// do not sum to one, no candidates, or a template that `check-template` found incomplete.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The configuration file exists but is not valid TOML for the expected schema.
    #[error("Failed to parse configuration file '{path}': {source}", path = path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The configuration file or the log file could not be read or created.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Process-level setup failed, e.g. the thread pool or the panic report hook.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
