//! Admin/configuration command surface: alias registry, permission-checked
//! dispatch, and the handlers that mutate guild settings.

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod help;
pub mod registry;

pub use {
    dispatch::{COMMAND_PREFIX, CommandContext, CommandDispatcher, CommandEffect},
    error::{Error, Result},
    registry::{CommandId, CommandRegistry},
};
