use telemetry_api::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("record count must be non-negative, got {0}")]
    NegativeCount(i64),

    #[error("page number must be at least 1")]
    InvalidPage,

    #[error("page size must be greater than 0")]
    InvalidPageSize,

    #[error("catalog: {0}")]
    Catalog(String),

    #[error("{0}")]
    Parse(#[from] ParseError),
}
