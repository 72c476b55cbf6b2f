//! Fan a token out to the relevant engines and merge what comes back.

use std::sync::Arc;

use tracing::{info, warn};

use lorebot_engines::{EngineKind, SearchEngine, SearchToken};

/// Outcome of searching one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// No engine produced anything.
    NoResults,
    /// Rendered bodies of the exact matches, capped, in engine order.
    Rendered(Vec<String>),
}

/// Invokes engines in a fixed, deterministic order and merges their results
/// under the per-query cap.
pub struct SearchAggregator {
    engines: Vec<Arc<dyn SearchEngine>>,
    cap_results: usize,
}

impl SearchAggregator {
    #[must_use]
    pub fn new(engines: Vec<Arc<dyn SearchEngine>>, cap_results: usize) -> Self {
        Self {
            engines,
            cap_results,
        }
    }

    /// Search one token. A token with a selector only consults engines of
    /// that kind; otherwise every engine runs, in registration order. An
    /// engine error is logged and contributes zero results — other engines
    /// and other tokens are unaffected.
    pub async fn search(&self, token: &SearchToken) -> SearchOutcome {
        let mut results = Vec::new();

        for engine in self
            .engines
            .iter()
            .filter(|e| token.engine == EngineKind::Unspecified || e.kind() == token.engine)
        {
            match engine.search(token).await {
                Ok(found) => results.extend(found),
                Err(err) => {
                    warn!(engine = ?engine.kind(), query = %token.text, %err, "engine call failed");
                },
            }
        }

        if results.is_empty() {
            info!(query = %token.text, "no results");
            return SearchOutcome::NoResults;
        }

        if results.len() > self.cap_results {
            info!(
                query = %token.text,
                found = results.len(),
                kept = self.cap_results,
                "capping results for query"
            );
            results.truncate(self.cap_results);
        }

        // Non-exact results are collected but never rendered.
        SearchOutcome::Rendered(
            results
                .into_iter()
                .filter(|result| result.is_exact_match)
                .map(|result| result.payload.render())
                .collect(),
        )
    }
}
