//! Post models normalized from CMS documents

use serde::{Deserialize, Serialize};

use super::reading_time;
use crate::cms::{timestamp, Document, Timestamp};

/// A document that cannot be turned into a post
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("document {0:?} has no uid")]
    MissingUid(String),

    #[error("document {uid:?} does not match the post shape: {source}")]
    Shape {
        uid: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<Timestamp>,
    pub data: SummaryData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Keep only the listing fields of a document
    pub fn from_document(doc: Document) -> Result<Self, NormalizeError> {
        let uid = doc
            .uid
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| NormalizeError::MissingUid(doc.id.clone()))?;
        let data = serde_json::from_value(doc.data).map_err(|source| NormalizeError::Shape {
            uid: uid.clone(),
            source,
        })?;

        Ok(Self {
            uid,
            first_publication_date: doc.first_publication_date,
            data,
        })
    }
}

/// A full post with its content blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: Option<String>,
    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<Timestamp>,
    pub data: PostData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostData {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub banner: Banner,
    /// The repeatable group is called `group` in some repositories
    #[serde(default, alias = "group")]
    pub content: Vec<ContentBlock>,
    /// Remaining custom-type fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: String,
}

/// A heading followed by its paragraphs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<Paragraph>,
}

/// A rich-text leaf reduced to its plain text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub text: String,
}

impl PostDetail {
    pub fn from_document(doc: Document) -> Result<Self, NormalizeError> {
        let label = doc.uid.clone().unwrap_or_else(|| doc.id.clone());
        let data = serde_json::from_value(doc.data).map_err(|source| NormalizeError::Shape {
            uid: label,
            source,
        })?;

        Ok(Self {
            uid: doc.uid,
            first_publication_date: doc.first_publication_date,
            data,
        })
    }

    /// Estimated minutes to read the whole post
    pub fn reading_time(&self, words_per_minute: usize) -> usize {
        reading_time::estimate(&self.data.content, words_per_minute)
    }
}
