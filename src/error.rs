use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("database configuration not found in registry under key `{key}`")]
    ConfigNotFound { key: String },
    #[error("invalid database configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),
    #[error("connection pool is not ready")]
    PoolNotReady,
    #[error("connection pool unavailable: {0}")]
    PoolUnavailable(String),
    #[error("query failed: {0}")]
    QueryExecution(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("invalid worker id: {0}")]
    InvalidWorkerId(String),
    #[error("port out of range: base port {base_port} + worker {identity} exceeds 65535; lower --port or --workers")]
    PortOutOfRange { base_port: u16, identity: u16 },
    #[error("failed to spawn worker: {0}")]
    Spawn(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::RegistryUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
