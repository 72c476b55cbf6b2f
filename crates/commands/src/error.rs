use lorebot_common::FromMessage;

/// Crate-wide result type for command dispatch.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A reply could not be delivered to the chat platform.
    #[error("could not deliver reply: {0}")]
    Delivery(anyhow::Error),

    #[error("{0}")]
    Message(String),
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

lorebot_common::impl_context!();
