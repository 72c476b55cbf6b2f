//! Term lookup in a local `term=definition` database.
//!
//! Equality yields an exact match; terms the query is a prefix of come back
//! as non-exact results with a proportional similarity score.

use std::path::PathBuf;

use {async_trait::async_trait, tokio::fs};

use crate::{
    EngineKind, ResultPayload, SearchEngine, SearchResult, SearchToken,
    error::Result,
};

const DELIM: char = '=';

pub struct GlossaryEngine {
    db_path: PathBuf,
}

impl GlossaryEngine {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl SearchEngine for GlossaryEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Glossary
    }

    async fn search(&self, token: &SearchToken) -> Result<Vec<SearchResult>> {
        let db = fs::read_to_string(&self.db_path).await?;

        let mut results = Vec::new();
        for line in db.lines() {
            let Some((term, definition)) = line.split_once(DELIM) else {
                continue;
            };
            let term = term.trim();
            let key = term.to_lowercase();

            if key == token.text {
                // exact matches go first regardless of file order
                results.insert(0, SearchResult {
                    is_exact_match: true,
                    similarity: 1.0,
                    name: term.to_string(),
                    payload: ResultPayload::Plain(definition.to_string()),
                });
            } else if key.starts_with(&token.text) {
                results.push(SearchResult {
                    is_exact_match: false,
                    similarity: token.text.len() as f32 / key.len() as f32,
                    name: term.to_string(),
                    payload: ResultPayload::Plain(definition.to_string()),
                });
            }
        }

        Ok(results)
    }
}
