//! Built-in templates using the Tera template engine
//!
//! The templates are embedded in the binary. Autoescaping is off, so every
//! CMS-provided string goes through the `html_escape` filter in the templates.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::{LabelsConfig, SiteConfig};
use crate::content::ContentBlock;
use crate::helpers::{html_escape, url_for};

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("html/layout.html")),
            ("index.html", include_str!("html/index.html")),
            ("post.html", include_str!("html/post.html")),
            ("loading.html", include_str!("html/loading.html")),
            ("not_found.html", include_str!("html/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("html/partials/header.html"),
            ),
            (
                "partials/post_list.html",
                include_str!("html/partials/post_list.html"),
            ),
        ])?;

        // Register custom filters
        tera.register_filter("html_escape", html_escape_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: escape HTML without touching slashes in URLs
fn html_escape_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("html_escape", "value", String, value);
    Ok(tera::Value::String(html_escape(&s)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub home_url: String,
    pub logo_url: String,
    pub stylesheet_url: String,
    pub generator: String,
    pub labels: LabelsConfig,
}

impl ConfigData {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            home_url: url_for(config, "/"),
            logo_url: url_for(config, "logo.svg"),
            stylesheet_url: url_for(config, "css/style.css"),
            generator: format!("spacetraveling {}", env!("CARGO_PKG_VERSION")),
            labels: config.labels.clone(),
        }
    }
}

/// A post card in the listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCardData {
    pub uid: String,
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
}

/// A fully loaded post page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPageData {
    pub title: String,
    pub author: String,
    pub date: String,
    pub banner_url: String,
    pub reading_time: usize,
    pub content: Vec<ContentBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("config", &ConfigData::new(&SiteConfig::default()));
        context.insert("posts", &Vec::<PostCardData>::new());
        context.insert("more_url", &Option::<String>::None);

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains(r#"<html lang="pt-BR">"#));
        assert!(html.contains(r#"href="/css/style.css""#));
    }

    #[test]
    fn test_escapes_cms_text() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("config", &ConfigData::new(&SiteConfig::default()));
        context.insert(
            "posts",
            &vec![PostCardData {
                uid: "a".to_string(),
                href: "/post/a".to_string(),
                title: "<script>alert(1)</script>".to_string(),
                subtitle: String::new(),
                author: "Tom & Jerry".to_string(),
                date: "19 abr 21".to_string(),
            }],
        );

        let html = renderer.render("partials/post_list.html", &context).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Tom &amp; Jerry"));
    }
}
