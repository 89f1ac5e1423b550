//! spacetraveling: a static blog front-end for a Prismic repository
//!
//! Posts are fetched from the CMS, rendered with embedded Tera templates
//! into a paginated listing and one page per post, and either written to
//! the public directory or served with deferred generation.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cms::{ContentSource, PrismicClient};

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied verbatim into the public directory
    pub static_dir: PathBuf,
}

impl Blog {
    /// Create a new blog from a directory, reading `_config.yml` if present
    /// and CMS credentials from the environment
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::from_config(base_dir, config))
    }

    /// Create a blog from an already loaded configuration
    pub fn from_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        }
    }

    /// Client for the configured CMS repository
    pub fn source(&self) -> Result<Arc<dyn ContentSource>> {
        Ok(Arc::new(PrismicClient::new(&self.config.cms)?))
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<generator::GeneratedSite> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
