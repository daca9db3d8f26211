//! Transport error types

/// Errors raised while talking to Telegram
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("file download failed: {0}")]
    Download(#[from] teloxide::DownloadError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HandlerResult = Result<(), BotError>;
