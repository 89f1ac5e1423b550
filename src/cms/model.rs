//! Raw Prismic API payloads

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Publication timestamp as reported by the CMS
pub type Timestamp = DateTime<FixedOffset>;

/// `GET {endpoint}` response; only the refs are of interest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiInfo {
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub label: String,
    #[serde(rename = "isMasterRef")]
    pub is_master_ref: bool,
}

impl ApiInfo {
    /// The ref pointing at the currently published content
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

/// One page of a document search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    pub page: u32,
    pub results_per_page: u32,
    pub total_results_size: u32,
    pub total_pages: u32,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    pub results: Vec<Document>,
}

/// A CMS document with its custom-type fields left untyped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<Timestamp>,
    #[serde(default, with = "timestamp")]
    pub last_publication_date: Option<Timestamp>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Nullable timestamps in Prismic's `2021-04-19T12:00:00+0000` form.
/// RFC 3339 is accepted as well so normalized posts round-trip.
pub mod timestamp {
    use super::Timestamp;
    use chrono::DateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const PRISMIC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn parse(value: &str) -> Option<Timestamp> {
        DateTime::parse_from_rfc3339(value)
            .or_else(|_| DateTime::parse_from_str(value, PRISMIC_FORMAT))
            .ok()
    }

    pub fn serialize<S: Serializer>(
        value: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_some(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "page": 1,
            "results_per_page": 1,
            "results_size": 1,
            "total_results_size": 3,
            "total_pages": 3,
            "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?page=2",
            "prev_page": null,
            "results": [{
                "id": "YHxyz",
                "uid": "como-utilizar-hooks",
                "type": "posts",
                "href": "ignored",
                "first_publication_date": "2021-03-15T19:25:28+0000",
                "last_publication_date": null,
                "data": { "title": "Como utilizar Hooks" }
            }]
        }"#;

        let response: QueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total_pages, 3);
        assert!(response.next_page.is_some());
        assert!(response.prev_page.is_none());

        let doc = &response.results[0];
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(doc.doc_type, "posts");
        let date = doc.first_publication_date.unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2021, 3, 15));
        assert_eq!(date.hour(), 19);
        assert!(doc.last_publication_date.is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: Document = serde_json::from_str(r#"{"data": {}}"#).unwrap();
        assert!(doc.uid.is_none());
        assert!(doc.first_publication_date.is_none());
    }

    #[test]
    fn test_invalid_timestamp_is_an_error() {
        let result = serde_json::from_str::<Document>(r#"{"first_publication_date": "yesterday"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_master_ref() {
        let info: ApiInfo = serde_json::from_str(
            r#"{"refs": [
                {"id": "preview", "ref": "abc", "label": "Preview", "isMasterRef": false},
                {"id": "master", "ref": "YHmaster", "label": "Master", "isMasterRef": true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(info.master_ref(), Some("YHmaster"));
        assert_eq!(ApiInfo::default().master_ref(), None);
    }
}
