//! Content service client
//!
//! A thin layer over the Prismic REST API. Everything above this module
//! talks to the CMS through the [`ContentSource`] trait.

mod client;
mod model;

use async_trait::async_trait;
use std::fmt;

pub use client::PrismicClient;
pub use model::{timestamp, ApiInfo, ApiRef, Document, QueryResponse, Timestamp};

/// Errors raised while talking to the CMS
#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error("CMS endpoint is not configured (set cms.api_endpoint or PRISMIC_API_ENDPOINT)")]
    MissingEndpoint,

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("refusing to fetch {0}: not served by the configured CMS endpoint")]
    ForeignUrl(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GET {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CMS API did not report a master ref")]
    NoMasterRef,
}

/// A document query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[at(path, "value")]`: exact match on a field
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Render a predicate list as the `q` query parameter
    pub fn to_query(predicates: &[Predicate]) -> String {
        let inner: String = predicates.iter().map(|p| p.to_string()).collect();
        format!("[{}]", inner)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                let value = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "[at({}, \"{}\")]", path, value)
            }
        }
    }
}

/// Options for a document query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Restrict returned `data` to these `type.field` names
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
    pub page: Option<usize>,
}

impl QueryOptions {
    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

/// Query interface of the headless CMS
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a predicate query against the published content
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<QueryResponse, CmsError>;

    /// Fetch a `next_page` URL previously returned by [`ContentSource::query`]
    async fn fetch_page(&self, url: &str) -> Result<QueryResponse, CmsError>;

    /// Look a document up by its unique identifier
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Document>, CmsError> {
        let predicates = [Predicate::at(format!("my.{}.uid", doc_type), uid)];
        let response = self
            .query(&predicates, &QueryOptions::default().page_size(1))
            .await?;
        Ok(response.results.into_iter().next())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory content source for tests

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    pub struct MemorySource {
        /// Response to any listing query
        pub first_page: QueryResponse,
        /// Responses keyed by `next_page` URL
        pub pages: HashMap<String, QueryResponse>,
        /// Documents answering uid lookups
        pub documents: Vec<Document>,
        /// URLs that fail with a decode error
        pub failing: HashSet<String>,
        /// Artificial latency for every call
        pub delay: Option<Duration>,
        pub requests: AtomicUsize,
        pub queries: Mutex<Vec<(String, QueryOptions)>>,
    }

    impl MemorySource {
        pub fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        async fn enter(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl ContentSource for MemorySource {
        async fn query(
            &self,
            predicates: &[Predicate],
            options: &QueryOptions,
        ) -> Result<QueryResponse, CmsError> {
            self.enter().await;
            self.queries
                .lock()
                .unwrap()
                .push((Predicate::to_query(predicates), options.clone()));

            let uid = predicates.iter().find_map(|p| match p {
                Predicate::At { path, value } if path.ends_with(".uid") => Some(value.clone()),
                _ => None,
            });

            match uid {
                Some(uid) => Ok(QueryResponse {
                    results: self
                        .documents
                        .iter()
                        .filter(|d| d.uid.as_deref() == Some(uid.as_str()))
                        .cloned()
                        .collect(),
                    ..QueryResponse::default()
                }),
                None => Ok(self.first_page.clone()),
            }
        }

        async fn fetch_page(&self, url: &str) -> Result<QueryResponse, CmsError> {
            self.enter().await;
            if self.failing.contains(url) {
                return Err(CmsError::Decode {
                    url: url.to_string(),
                    source: serde_json::from_str::<QueryResponse>("not json").unwrap_err(),
                });
            }
            self.pages.get(url).cloned().ok_or(CmsError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }

    /// A listing document with the summary fields filled in
    pub fn summary_doc(uid: &str, title: &str) -> Document {
        Document {
            uid: Some(uid.to_string()),
            doc_type: "posts".to_string(),
            first_publication_date: timestamp::parse("2021-04-19T12:00:00+0000"),
            data: serde_json::json!({
                "title": title,
                "subtitle": format!("About {}", title),
                "author": "Joseph Oliveira",
            }),
            ..Document::default()
        }
    }

    /// A full post document with one content block
    pub fn post_doc(uid: &str, heading: &str, text: &str) -> Document {
        Document {
            uid: Some(uid.to_string()),
            doc_type: "posts".to_string(),
            first_publication_date: timestamp::parse("2021-04-19T12:00:00+0000"),
            data: serde_json::json!({
                "title": format!("Post {}", uid),
                "author": "Danilo Vieira",
                "banner": { "url": format!("https://images.prismic.io/{}.png", uid) },
                "group": [{
                    "heading": heading,
                    "body": [{ "type": "paragraph", "text": text, "spans": [] }],
                }],
            }),
            ..Document::default()
        }
    }
}
