use lorebot_common::FromMessage;

/// Crate-wide result type for engine calls.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine's backing data source could not be read.
    #[error("engine data source unavailable: {0}")]
    Source(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

lorebot_common::impl_context!();
