/// Domain-specific error types for the pricing service.
/// Numeric divergence between models is not an error: the comparator
/// recovers it and records a warning instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient price history: {0}")]
    InsufficientHistory(String),

    #[error("no options data: {0}")]
    NoOptionsData(String),

    #[error("non-finite model price: {0}")]
    NonFinite(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("pricing task failed: {0}")]
    Task(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
