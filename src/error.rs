use thiserror::Error;

#[derive(Error, Debug)]
pub enum GfError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Unknown {kind} operator '{name}'")]
    UnknownOperator { kind: &'static str, name: String },

    #[error("Lifecycle hook '{hook}' failed: {reason}")]
    Hook { hook: &'static str, reason: String },

    #[error("Failed to spawn execution path: {0}")]
    Spawn(std::io::Error),
}

pub type GfResult<T> = Result<T, GfError>;
