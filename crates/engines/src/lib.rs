//! Pluggable search engines and the token/result types they exchange.
//!
//! An engine takes a [`SearchToken`] and returns zero or more
//! [`SearchResult`]s; "no results" is an empty list, never an error. Engines
//! may perform network IO — the shipped implementations are file-backed, and
//! scraping engines live behind the same trait in their own crates.

pub mod easter_egg;
pub mod error;
pub mod glossary;
pub mod token;

use async_trait::async_trait;

pub use {
    easter_egg::EasterEggEngine,
    error::{Error, Result},
    glossary::GlossaryEngine,
    token::{EngineKind, SearchToken},
};

/// One match produced by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The engine asserts this corresponds precisely to the query text.
    pub is_exact_match: bool,
    /// Match confidence in `0.0..=1.0`; `1.0` for exact matches.
    pub similarity: f32,
    pub name: String,
    /// Only the owning engine interprets this; the aggregator passes it
    /// through untouched until a result is rendered.
    pub payload: ResultPayload,
}

/// Renderable body of a search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPayload {
    /// Send the text as-is.
    Plain(String),
    /// A titled reference to an external page.
    Reference { title: String, url: String },
}

impl ResultPayload {
    /// Render for delivery to a chat channel.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Reference { title, url } => format!("**{title}**\n{url}"),
        }
    }
}

/// Contract every search backend implements.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// The selector this engine answers to.
    fn kind(&self) -> EngineKind;

    /// Look up a token. Must return `Ok(vec![])` for "no results".
    async fn search(&self, token: &SearchToken) -> Result<Vec<SearchResult>>;
}
