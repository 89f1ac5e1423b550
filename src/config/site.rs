//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Environment variable overriding `cms.api_endpoint`
pub const API_ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Content service
    #[serde(default)]
    pub cms: CmsConfig,

    // Date format
    pub date_format: String,
    pub date_placeholder: String,

    // Reading time
    pub words_per_minute: usize,

    // Seconds before a generated page is regenerated in the background
    pub revalidate: u64,

    #[serde(default)]
    pub labels: LabelsConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            cms: CmsConfig::default(),

            date_format: "DD MMM YY".to_string(),
            date_placeholder: "--".to_string(),

            words_per_minute: 200,

            revalidate: 60 * 60 * 24,

            labels: LabelsConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply CMS credentials from the environment, if set
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(API_ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Using CMS endpoint from {}", API_ENDPOINT_ENV);
            self.cms.api_endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.cms.access_token = Some(token);
        }
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// Prismic API v2 endpoint, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub api_endpoint: String,
    /// Access token for private repositories
    pub access_token: Option<String>,
    /// Custom type of blog posts
    pub document_type: String,
    /// Results per listing page
    pub page_size: usize,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
        }
    }
}

/// User-facing strings rendered by the templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    pub load_more: String,
    pub loading: String,
    pub not_found: String,
    pub back_home: String,
    pub minutes: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            load_more: "Carregar mais posts".to_string(),
            loading: "Carregando...".to_string(),
            not_found: "Post não encontrado".to_string(),
            back_home: "Voltar para a página inicial".to_string(),
            minutes: "min".to_string(),
        }
    }
}
