// Article Data Loader
// Reads article records from JSON and flattens human coding for evaluation

use crate::models::Article;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One (article, frame, group) cell of the human coding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingRecord {
    pub article_id: String,
    pub source: String,
    pub frame_type: String,
    pub demographic_group: String,
    pub count: i64,
}

pub fn load_articles(path: &Path) -> Result<Vec<Article>, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let articles: Vec<Article> = serde_json::from_str(&content).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!(count = articles.len(), path = %path.display(), "data.loaded");
    Ok(articles)
}

pub fn filter_by_source<'a>(articles: &'a [Article], source: &str) -> Vec<&'a Article> {
    articles.iter().filter(|a| a.source == source).collect()
}

/// Flatten every article's coding into records; uncoded articles contribute nothing.
pub fn coding_records(articles: &[Article]) -> Vec<CodingRecord> {
    let mut records = Vec::new();
    for article in articles {
        let Some(coding) = &article.human_coding else {
            continue;
        };
        for (frame_type, groups) in coding {
            for (group, count) in groups {
                records.push(CodingRecord {
                    article_id: article.id.clone(),
                    source: article.source.clone(),
                    frame_type: frame_type.clone(),
                    demographic_group: group.clone(),
                    count: *count,
                });
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"[
        {"article_id": "a1", "source": "Daily", "date": "2021-01-01", "title": "T1",
         "content": "Women hold 21% of seats.",
         "human_coding": {"underrepresentation": {"women": 1, "men": 0}}},
        {"article_id": "a2", "source": "Weekly", "date": "2021-02-01", "title": "T2",
         "content": "The board appointed a new CEO."}
    ]"#;

    #[test]
    fn test_load_articles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("articles.json");
        fs::write(&path, SAMPLE).unwrap();

        let articles = load_articles(&path).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, "a1");
        assert!(articles[1].human_coding.is_none());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_articles(&missing), Err(DataError::NotFound(_))));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"[{"article_id": "a1"}]"#).unwrap();
        assert!(matches!(load_articles(&bad), Err(DataError::Parse { .. })));
    }

    #[test]
    fn test_filter_and_coding_records() {
        let articles: Vec<Article> = serde_json::from_str(SAMPLE).unwrap();
        let daily = filter_by_source(&articles, "Daily");
        assert_eq!(daily.len(), 1);

        let records = coding_records(&articles);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.article_id == "a1" && r.frame_type == "underrepresentation"));
        assert!(records.iter().any(|r| r.demographic_group == "women" && r.count == 1));
    }
}
