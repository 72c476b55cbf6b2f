use lorebot_common::FromMessage;

/// Crate-wide result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A delimiter triple produced an uncompilable matcher.
    #[error("invalid token syntax: {0}")]
    TokenSyntax(#[from] regex::Error),

    #[error(transparent)]
    Command(#[from] lorebot_commands::Error),

    #[error("{0}")]
    Message(String),
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

lorebot_common::impl_context!();
