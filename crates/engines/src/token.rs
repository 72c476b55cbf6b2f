//! Search tokens and the engine-selector prefix carried in their meta text.

use std::collections::HashMap;

use std::sync::LazyLock;

/// Reserved delimiter separating an engine selector from residual meta text.
const SELECTOR_DELIM: char = '-';

/// Which engine family a token is directed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineKind {
    /// No selector given; the default engine set handles the token.
    #[default]
    Unspecified,
    Glossary,
    EasterEgg,
}

static SELECTOR_ALIASES: LazyLock<HashMap<&'static str, EngineKind>> = LazyLock::new(|| {
    HashMap::from([
        ("gl", EngineKind::Glossary),
        ("glossary", EngineKind::Glossary),
        ("egg", EngineKind::EasterEgg),
    ])
});

impl EngineKind {
    /// Translate a selector string, case-insensitively. Unknown selectors map
    /// to [`EngineKind::Unspecified`].
    #[must_use]
    pub fn from_selector(selector: &str) -> Self {
        SELECTOR_ALIASES
            .get(selector.to_lowercase().as_str())
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    fn is_known_selector(selector: &str) -> bool {
        SELECTOR_ALIASES.contains_key(selector.to_lowercase().as_str())
    }
}

/// A delimited query extracted from message text.
///
/// `text` arrives already trimmed and lowercased by the extractor; the raw
/// meta keeps its case so selector parsing and engines see it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchToken {
    pub text: String,
    pub meta: Option<String>,
    pub engine: EngineKind,
}

impl SearchToken {
    /// Build a token from extracted query text and raw meta.
    ///
    /// The meta decomposes at the first `-` into a selector prefix and
    /// residual meta; without a `-`, the whole meta is tried as a selector.
    /// When the selector is unknown the raw meta is kept intact as residual
    /// meta so engines can still interpret it.
    #[must_use]
    pub fn new(text: impl Into<String>, raw_meta: Option<&str>) -> Self {
        let text = text.into();
        let Some(raw_meta) = raw_meta.map(str::trim).filter(|m| !m.is_empty()) else {
            return Self {
                text,
                meta: None,
                engine: EngineKind::Unspecified,
            };
        };

        let (selector, rest) = match raw_meta.split_once(SELECTOR_DELIM) {
            Some((selector, rest)) => (selector, Some(rest)),
            None => (raw_meta, None),
        };

        if EngineKind::is_known_selector(selector) {
            Self {
                text,
                meta: rest.map(str::to_string).filter(|m| !m.is_empty()),
                engine: EngineKind::from_selector(selector),
            }
        } else {
            Self {
                text,
                meta: Some(raw_meta.to_string()),
                engine: EngineKind::Unspecified,
            }
        }
    }

    /// A bare token with no meta, as produced for `{L}query{R}` matches.
    #[must_use]
    pub fn bare(text: impl Into<String>) -> Self {
        Self::new(text, None)
    }
}
