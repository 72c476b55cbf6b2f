//! Extraction of delimited search tokens from message text.

use regex::Regex;

use {
    crate::error::Result,
    lorebot_engines::SearchToken,
    lorebot_settings::{GuildSettings, SPLIT_DEFAULT, TOKEN_LEFT_DEFAULT, TOKEN_RIGHT_DEFAULT},
};

/// Compiled matcher for one delimiter triple.
///
/// The pattern is `{left}query{right}` with an optional `{split}meta` segment
/// before the closing delimiter. The delimiters are user-supplied and matched
/// as literal text (escaped), case-insensitively. Degenerate configurations
/// (e.g. left == right) are accepted as-is; matches are whatever the compiled
/// pattern produces.
pub struct TokenExtractor {
    pattern: Regex,
}

impl TokenExtractor {
    pub fn new(left: &str, split: &str, right: &str) -> Result<Self> {
        let pattern = format!(
            "(?i){left}(?P<query>.+?)(?:{split}(?P<meta>.+?))?{right}",
            left = regex::escape(left),
            split = regex::escape(split),
            right = regex::escape(right),
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// Matcher for a guild's configured syntax.
    pub fn for_settings(settings: &GuildSettings) -> Result<Self> {
        Self::new(
            settings.token_left(),
            settings.split_marker(),
            settings.token_right(),
        )
    }

    /// Matcher for the process-wide default `[[query|meta]]` syntax.
    pub fn with_defaults() -> Result<Self> {
        Self::new(TOKEN_LEFT_DEFAULT, SPLIT_DEFAULT, TOKEN_RIGHT_DEFAULT)
    }

    /// All tokens in `text`, in input order. Query text comes back trimmed
    /// and lowercased; whitespace-only queries are dropped silently.
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<SearchToken> {
        self.pattern
            .captures_iter(text)
            .filter_map(|captures| {
                let query = captures.name("query")?.as_str().trim().to_lowercase();
                if query.is_empty() {
                    return None;
                }
                let meta = captures.name("meta").map(|m| m.as_str());
                Some(SearchToken::new(query, meta))
            })
            .collect()
    }
}
