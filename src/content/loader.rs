//! Content loader - fetches posts from the CMS and normalizes them

use anyhow::Result;

use super::{Pagination, PostDetail};
use crate::cms::{ContentSource, Predicate, QueryOptions};
use crate::config::SiteConfig;

/// Page size used when enumerating every post
const SLUG_PAGE_SIZE: usize = 100;

/// Loads posts of the configured document type
pub struct ContentLoader<'a, S: ContentSource + ?Sized> {
    config: &'a SiteConfig,
    source: &'a S,
}

impl<'a, S: ContentSource + ?Sized> ContentLoader<'a, S> {
    /// Create a new content loader
    pub fn new(config: &'a SiteConfig, source: &'a S) -> Self {
        Self { config, source }
    }

    fn doc_type(&self) -> &str {
        &self.config.cms.document_type
    }

    fn type_predicate(&self) -> Predicate {
        Predicate::at("document.type", self.doc_type())
    }

    /// Fields requested for the listing
    pub fn summary_fields(&self) -> Vec<String> {
        ["title", "subtitle", "author"]
            .iter()
            .map(|field| format!("{}.{}", self.doc_type(), field))
            .collect()
    }

    /// Load the first listing page
    pub async fn load_listing(&self) -> Result<Pagination> {
        let options = QueryOptions::default()
            .fetch(self.summary_fields())
            .page_size(self.config.cms.page_size.max(1));

        let response = self.source.query(&[self.type_predicate()], &options).await?;
        let pagination = Pagination::from_response(response);
        tracing::debug!(
            "Loaded listing with {} posts (more available: {})",
            pagination.results.len(),
            pagination.has_more()
        );
        Ok(pagination)
    }

    /// Load a single post by slug; `None` if the CMS has no such document
    pub async fn load_post(&self, slug: &str) -> Result<Option<PostDetail>> {
        let Some(doc) = self.source.get_by_uid(self.doc_type(), slug).await? else {
            tracing::debug!("No {} document with uid {:?}", self.doc_type(), slug);
            return Ok(None);
        };
        Ok(Some(PostDetail::from_document(doc)?))
    }

    /// Uids of every post, in CMS order
    pub async fn load_slugs(&self) -> Result<Vec<String>> {
        let options = QueryOptions::default().page_size(SLUG_PAGE_SIZE);
        let mut response = self.source.query(&[self.type_predicate()], &options).await?;
        let mut slugs: Vec<String> = Vec::new();

        loop {
            for uid in response.results.into_iter().filter_map(|doc| doc.uid) {
                if !slugs.contains(&uid) {
                    slugs.push(uid);
                }
            }
            match response.next_page {
                Some(url) => response = self.source.fetch_page(&url).await?,
                None => break,
            }
        }

        Ok(slugs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{post_doc, summary_doc, MemorySource};
    use crate::cms::{Document, QueryResponse};
    use std::collections::HashMap;

    fn source() -> MemorySource {
        MemorySource {
            first_page: QueryResponse {
                next_page: Some("p2".to_string()),
                results: vec![summary_doc("a", "A")],
                ..QueryResponse::default()
            },
            pages: HashMap::from([(
                "p2".to_string(),
                QueryResponse {
                    results: vec![summary_doc("b", "B"), summary_doc("a", "A")],
                    ..QueryResponse::default()
                },
            )]),
            documents: vec![post_doc("a", "H", "T")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_listing_requests_summary_fields() {
        let config = SiteConfig::default();
        let source = source();
        let loader = ContentLoader::new(&config, &source);

        let listing = loader.load_listing().await.unwrap();
        assert_eq!(listing.results.len(), 1);
        assert_eq!(listing.next_page.as_deref(), Some("p2"));

        let queries = source.queries.lock().unwrap();
        let (q, options) = &queries[0];
        assert_eq!(q, r#"[[at(document.type, "posts")]]"#);
        assert_eq!(
            options.fetch,
            vec!["posts.title", "posts.subtitle", "posts.author"]
        );
        assert_eq!(options.page_size, Some(1));
    }

    #[tokio::test]
    async fn test_load_post() {
        let config = SiteConfig::default();
        let source = source();
        let loader = ContentLoader::new(&config, &source);

        let post = loader.load_post("a").await.unwrap().unwrap();
        assert_eq!(post.data.content[0].heading, "H");

        assert!(loader.load_post("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_post_with_bad_shape_is_an_error() {
        let config = SiteConfig::default();
        let source = MemorySource {
            documents: vec![Document {
                uid: Some("bad".to_string()),
                data: serde_json::json!({ "title": 42 }),
                ..Document::default()
            }],
            ..Default::default()
        };
        let loader = ContentLoader::new(&config, &source);
        assert!(loader.load_post("bad").await.is_err());
    }

    #[tokio::test]
    async fn test_load_slugs_walks_all_pages() {
        let config = SiteConfig::default();
        let source = source();
        let loader = ContentLoader::new(&config, &source);

        let slugs = loader.load_slugs().await.unwrap();
        assert_eq!(slugs, vec!["a", "b"]);
    }
}
