use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("history query failed: {0}")]
    HistoryQuery(anyhow::Error),

    #[error("unknown instrument code: {0}")]
    UnknownCode(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
