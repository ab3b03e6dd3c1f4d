use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShipgateError {
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid environment '{0}': choose from qa, uat, prod")]
    InvalidEnvironment(String),

    #[error("invalid release match strategy '{0}': must be substring or component")]
    InvalidMatchStrategy(String),

    #[error("audit ledger error: {0}")]
    Audit(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShipgateError>;
