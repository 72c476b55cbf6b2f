//! Canned responses for a handful of special queries, kept in a flat file.

use std::path::PathBuf;

use {async_trait::async_trait, tokio::fs};

use crate::{
    EngineKind, ResultPayload, SearchEngine, SearchResult, SearchToken,
    error::Result,
};

const DELIM: char = '=';

/// Looks a query up in a `name=response` line database and returns the canned
/// response on an exact name match.
pub struct EasterEggEngine {
    db_path: PathBuf,
}

impl EasterEggEngine {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl SearchEngine for EasterEggEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::EasterEgg
    }

    async fn search(&self, token: &SearchToken) -> Result<Vec<SearchResult>> {
        let db = fs::read_to_string(&self.db_path).await?;

        for line in db.lines() {
            let Some((name, response)) = line.split_once(DELIM) else {
                continue;
            };
            if name.trim().to_lowercase() == token.text {
                return Ok(vec![SearchResult {
                    is_exact_match: true,
                    similarity: 1.0,
                    name: name.trim().to_string(),
                    payload: ResultPayload::Plain(response.to_string()),
                }]);
            }
        }

        Ok(Vec::new())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::io::Write, tempfile::NamedTempFile};

    fn make_engine(contents: &str) -> (NamedTempFile, EasterEggEngine) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let engine = EasterEggEngine::new(file.path().to_path_buf());
        (file, engine)
    }

    #[tokio::test]
    async fn exact_name_matches() {
        let (_file, engine) = make_engine("xyzzy=Nothing happens.\nplugh=A hollow voice says...\n");

        let results = engine.search(&SearchToken::bare("xyzzy")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_exact_match);
        assert_eq!(results[0].payload, ResultPayload::Plain("Nothing happens.".into()));
    }

    #[tokio::test]
    async fn miss_returns_empty_not_error() {
        let (_file, engine) = make_engine("xyzzy=Nothing happens.\n");
        let results = engine.search(&SearchToken::bare("frotz")).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn missing_database_is_an_error() {
        let engine = EasterEggEngine::new(PathBuf::from("/nonexistent/eggs.txt"));
        assert!(engine.search(&SearchToken::bare("xyzzy")).await.is_err());
    }
}
