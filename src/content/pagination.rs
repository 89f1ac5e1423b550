//! Listing cursor with incremental "load more"

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::PostSummary;
use crate::cms::{CmsError, ContentSource, QueryResponse};

/// Accumulated listing state: the posts shown so far and where to continue.
///
/// A cursor is never mutated in place. Every load returns a new cursor and
/// the previous one stays valid, so a failed load leaves the caller's state
/// exactly as it was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
}

impl Pagination {
    /// Start a cursor from a single URL, with nothing loaded yet
    pub fn starting_at(next_page: impl Into<String>) -> Self {
        Self {
            next_page: Some(next_page.into()),
            results: Vec::new(),
        }
    }

    /// Normalize one page of search results.
    /// Documents that are not posts are logged and left out.
    pub fn from_response(response: QueryResponse) -> Self {
        let results = response
            .results
            .into_iter()
            .filter_map(|doc| match PostSummary::from_document(doc) {
                Ok(post) => Some(post),
                Err(e) => {
                    tracing::warn!("Skipping listing entry: {}", e);
                    None
                }
            })
            .collect();

        Self::default().appended(Self {
            next_page: response.next_page,
            results,
        })
    }

    /// Whether a "load more" trigger should be offered
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Append `page` after the current results and take its cursor.
    /// Posts whose uid is already listed are dropped.
    pub fn appended(&self, page: Pagination) -> Pagination {
        let mut seen: HashSet<String> = self.results.iter().map(|p| p.uid.clone()).collect();
        let mut results = self.results.clone();

        for post in page.results {
            if seen.insert(post.uid.clone()) {
                results.push(post);
            } else {
                tracing::debug!("Dropping duplicate post {}", post.uid);
            }
        }

        Pagination {
            next_page: page.next_page,
            results,
        }
    }

    /// Fetch `next_page` and return the extended cursor.
    /// Without a next page the cursor is returned as is.
    pub async fn load_more<S>(&self, source: &S) -> Result<Pagination, CmsError>
    where
        S: ContentSource + ?Sized,
    {
        let Some(url) = self.next_page.as_deref() else {
            return Ok(self.clone());
        };

        let response = source.fetch_page(url).await?;
        let page = Self::from_response(response);
        tracing::debug!(
            "Loaded {} more posts (more available: {})",
            page.results.len(),
            page.has_more()
        );
        Ok(self.appended(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{summary_doc, MemorySource};
    use crate::cms::Document;
    use std::collections::HashMap;

    fn page(uids: &[&str], next_page: Option<&str>) -> QueryResponse {
        QueryResponse {
            next_page: next_page.map(str::to_string),
            results: uids.iter().map(|uid| summary_doc(uid, uid)).collect(),
            ..QueryResponse::default()
        }
    }

    fn uids(pagination: &Pagination) -> Vec<&str> {
        pagination.results.iter().map(|p| p.uid.as_str()).collect()
    }

    fn three_page_source() -> MemorySource {
        MemorySource {
            pages: HashMap::from([
                ("p2".to_string(), page(&["b"], Some("p3"))),
                ("p3".to_string(), page(&["c"], None)),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_response() {
        let pagination = Pagination::from_response(page(&["a"], None));
        assert_eq!(uids(&pagination), vec!["a"]);
        assert!(!pagination.has_more());
    }

    #[test]
    fn test_from_response_skips_malformed_documents() {
        let mut response = page(&["a", "b"], Some("p2"));
        response.results.push(Document {
            uid: None,
            ..Document::default()
        });
        response.results[1].data = serde_json::json!({});

        let pagination = Pagination::from_response(response);
        assert_eq!(uids(&pagination), vec!["a"]);
        assert_eq!(pagination.next_page.as_deref(), Some("p2"));
    }

    #[test]
    fn test_appended_keeps_order_and_drops_duplicates() {
        let first = Pagination::from_response(page(&["a", "b"], Some("p2")));
        let next = Pagination::from_response(page(&["b", "c"], None));

        let merged = first.appended(next);
        assert_eq!(uids(&merged), vec!["a", "b", "c"]);
        assert!(merged.next_page.is_none());
        // The previous cursor is untouched
        assert_eq!(uids(&first), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_load_more_until_exhausted() {
        let source = three_page_source();
        let mut cursor = Pagination::from_response(page(&["a"], Some("p2")));
        let mut lengths = vec![cursor.results.len()];

        while cursor.has_more() {
            cursor = cursor.load_more(&source).await.unwrap();
            lengths.push(cursor.results.len());
        }

        assert_eq!(uids(&cursor), vec!["a", "b", "c"]);
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(source.request_count(), 2);
    }

    #[tokio::test]
    async fn test_load_more_without_next_page_is_a_no_op() {
        let source = MemorySource::default();
        let cursor = Pagination::from_response(page(&["a"], None));

        let same = cursor.load_more(&source).await.unwrap();
        assert_eq!(same, cursor);
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_cursor_unchanged() {
        let mut source = three_page_source();
        source.failing.insert("p2".to_string());
        let cursor = Pagination::from_response(page(&["a"], Some("p2")));
        let before = cursor.clone();

        assert!(cursor.load_more(&source).await.is_err());
        assert_eq!(cursor, before);

        // Retrying after the upstream recovers succeeds
        source.failing.clear();
        let next = cursor.load_more(&source).await.unwrap();
        assert_eq!(uids(&next), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_starting_at() {
        let source = three_page_source();
        let cursor = Pagination::starting_at("p3");
        assert!(cursor.results.is_empty());

        let loaded = cursor.load_more(&source).await.unwrap();
        assert_eq!(uids(&loaded), vec!["c"]);
        assert!(!loaded.has_more());
    }
}
