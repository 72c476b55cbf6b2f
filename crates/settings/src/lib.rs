//! Per-guild configuration: delimiter syntax, channel filters, bot channel.
//!
//! One [`GuildSettings`] record exists per guild, cached in memory and
//! persisted as a `key=value` text file under the data directory. All
//! mutations go through [`SettingsStore::update`], which serializes the
//! read-modify-write-persist sequence per guild.

pub mod error;
pub mod schema;
pub mod store;

pub use {
    error::{Error, Result},
    schema::{FilterChange, GuildSettings, SPLIT_DEFAULT, TOKEN_LEFT_DEFAULT, TOKEN_RIGHT_DEFAULT},
    store::SettingsStore,
};
