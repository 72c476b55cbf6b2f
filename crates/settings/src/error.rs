use lorebot_common::FromMessage;

/// Crate-wide result type for settings operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A delimiter string would become empty.
    #[error("delimiter tokens cannot be empty")]
    EmptyDelimiter,

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

lorebot_common::impl_context!();
