//! Prismic REST API v2 client

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::{ApiInfo, CmsError, ContentSource, Predicate, QueryOptions, QueryResponse};
use crate::config::CmsConfig;

/// HTTP client for a single Prismic repository
#[derive(Debug, Clone)]
pub struct PrismicClient {
    client: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let raw = config.api_endpoint.trim().trim_end_matches('/');
        if raw.is_empty() {
            return Err(CmsError::MissingEndpoint);
        }
        let endpoint = Url::parse(raw).map_err(|e| CmsError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch the ref of the currently published content
    async fn master_ref(&self) -> Result<String, CmsError> {
        let request = self.with_token(self.client.get(self.endpoint.clone()));
        let info: ApiInfo = self.get_json(request, self.endpoint.as_str()).await?;
        info.master_ref()
            .map(str::to_string)
            .ok_or(CmsError::NoMasterRef)
    }

    fn search_url(&self) -> String {
        format!("{}/documents/search", self.endpoint.as_str().trim_end_matches('/'))
    }

    fn with_token(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.query(&[("access_token", token)]),
            None => request,
        }
    }

    /// Only follow URLs on the same origin as the configured endpoint
    fn check_origin(&self, url: &Url) -> Result<(), CmsError> {
        let same_origin = url.scheme() == self.endpoint.scheme()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default();
        if same_origin {
            Ok(())
        } else {
            Err(CmsError::ForeignUrl(url.to_string()))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, CmsError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(CmsError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| CmsError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<QueryResponse, CmsError> {
        let master_ref = self.master_ref().await?;
        let url = self.search_url();

        let mut params: Vec<(&str, String)> = vec![
            ("ref", master_ref),
            ("q", Predicate::to_query(predicates)),
        ];
        if !options.fetch.is_empty() {
            params.push(("fetch", options.fetch.join(",")));
        }
        if let Some(page_size) = options.page_size {
            params.push(("pageSize", page_size.to_string()));
        }
        if let Some(page) = options.page {
            params.push(("page", page.to_string()));
        }

        tracing::debug!("Querying {} with {:?}", url, params);
        let request = self.with_token(self.client.get(&url).query(&params));
        self.get_json(request, &url).await
    }

    async fn fetch_page(&self, url: &str) -> Result<QueryResponse, CmsError> {
        let parsed = Url::parse(url).map_err(|e| CmsError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        self.check_origin(&parsed)?;

        let has_token = parsed.query_pairs().any(|(k, _)| k == "access_token");
        let mut request = self.client.get(parsed.clone());
        if !has_token {
            request = self.with_token(request);
        }

        tracing::debug!("Fetching next page {}", url);
        self.get_json(request, url).await
    }
}
