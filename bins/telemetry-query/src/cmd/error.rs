use query_engine::EngineError;
use telemetry_api::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum QueryCliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
