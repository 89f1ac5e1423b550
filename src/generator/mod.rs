//! Generator module - renders the listing and post pages with the built-in templates

use anyhow::Result;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tera::Context;
use walkdir::WalkDir;

use crate::cache::PageStatus;
use crate::cms::ContentSource;
use crate::content::loader::ContentLoader;
use crate::content::{Pagination, PostDetail, PostSummary};
use crate::helpers::{post_url, url_for, DateFormatter};
use crate::templates::{ConfigData, PostCardData, PostPageData, TemplateRenderer};
use crate::Blog;

/// Seconds between reloads of the loading placeholder
const PLACEHOLDER_REFRESH_SECS: u64 = 2;

/// Route of the load-more endpoint, relative to the site root
pub const MORE_POSTS_PATH: &str = "api/posts/more";

/// Directory of the pre-rendered load-more chunks in static output
pub const LISTING_PAGES_DIR: &str = "posts/page";

/// One load-more step: post cards to append and where to fetch the next step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorePosts {
    pub html: String,
    pub next_page: Option<String>,
}

/// Pages produced by a full generation
#[derive(Debug, Clone, Default)]
pub struct GeneratedSite {
    /// Rendered listing page
    pub index: String,
    /// Rendered post pages keyed by uid
    pub posts: Vec<(String, String)>,
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    dates: DateFormatter,
    config_data: ConfigData,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            source,
            renderer: TemplateRenderer::new()?,
            dates: DateFormatter::from_config(&blog.config),
            config_data: ConfigData::new(&blog.config),
        })
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    pub fn source(&self) -> &dyn ContentSource {
        self.source.as_ref()
    }

    pub fn loader(&self) -> ContentLoader<'_, dyn ContentSource> {
        ContentLoader::new(&self.blog.config, self.source.as_ref())
    }

    /// Generate the entire site into the public directory
    pub async fn generate(&self) -> Result<GeneratedSite> {
        fs::create_dir_all(&self.blog.public_dir)?;

        self.copy_static_assets()?;

        // Listing, with load-more chunks as static files
        let index = self.build_static_listing().await?;
        let index_path = self.blog.public_dir.join("index.html");
        fs::write(&index_path, &index)?;
        tracing::debug!("Generated: {:?}", index_path);

        // Not-found page for static hosting
        let not_found = self.render_post_page(&PageStatus::NotFound)?;
        fs::write(self.blog.public_dir.join("404.html"), not_found)?;

        // Post pages
        let slugs = self.loader().load_slugs().await?;
        let mut posts = Vec::with_capacity(slugs.len());

        for slug in slugs {
            let Some(output_path) = self.post_output_path(&slug) else {
                tracing::warn!("Skipping post with unsafe uid {:?}", slug);
                continue;
            };

            match self.build_post(&slug).await {
                Ok(PageStatus::Ready(html)) => {
                    if let Some(parent) = output_path.parent() {
                        fs::create_dir_all(parent).map_err(|e| {
                            anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e)
                        })?;
                    }
                    fs::write(&output_path, &html)
                        .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
                    tracing::debug!("Generated post: {:?}", output_path);
                    posts.push((slug, html));
                }
                Ok(_) => tracing::warn!("Post {:?} disappeared during generation", slug),
                Err(e) => tracing::warn!("Failed to generate post {:?}: {}", slug, e),
            }
        }

        tracing::info!("Generated listing and {} posts", posts.len());
        Ok(GeneratedSite { index, posts })
    }

    /// Fetch the first listing page and render it, loading more through
    /// the server's endpoint
    pub async fn build_listing(&self) -> Result<String> {
        let listing = self.loader().load_listing().await?;
        let more = listing.next_page.as_deref().map(|cursor| self.more_url(cursor));
        self.render_listing(&listing, more.as_deref())
    }

    /// Render the listing for static hosting.
    ///
    /// The whole listing is fetched up front. Every page after the first is
    /// written as `posts/page/<n>.json` holding [`MorePosts`], chained
    /// through `next_page`, so loading more needs no server.
    pub async fn build_static_listing(&self) -> Result<String> {
        let first = self.loader().load_listing().await?;

        let mut shown = first.clone();
        let mut chunks: Vec<Vec<PostSummary>> = Vec::new();
        while shown.has_more() {
            let next = shown.load_more(self.source()).await?;
            chunks.push(next.results[shown.results.len()..].to_vec());
            shown = next;
        }

        let dir = self.blog.public_dir.join(LISTING_PAGES_DIR);
        if !chunks.is_empty() {
            fs::create_dir_all(&dir)?;
        }

        let total = chunks.len();
        for (i, posts) in chunks.iter().enumerate() {
            // The first chunk continues listing page 1
            let number = i + 2;
            let next_page = (i + 1 < total).then(|| self.static_page_url(number + 1));
            let chunk = MorePosts {
                html: self.render_post_cards(posts)?,
                next_page,
            };
            let path = dir.join(format!("{}.json", number));
            fs::write(&path, serde_json::to_string(&chunk)?)?;
            tracing::debug!("Generated: {:?}", path);
        }

        let more = (total > 0).then(|| self.static_page_url(2));
        self.render_listing(&first, more.as_deref())
    }

    /// Load-more endpoint URL continuing at a CMS cursor
    pub fn more_url(&self, cursor: &str) -> String {
        format!(
            "{}?cursor={}",
            url_for(&self.blog.config, MORE_POSTS_PATH),
            utf8_percent_encode(cursor, NON_ALPHANUMERIC)
        )
    }

    fn static_page_url(&self, number: usize) -> String {
        url_for(
            &self.blog.config,
            &format!("{}/{}.json", LISTING_PAGES_DIR, number),
        )
    }

    /// Fetch a post and render it; `NotFound` if the CMS has no such document
    pub async fn build_post(&self, slug: &str) -> Result<PageStatus<String>> {
        let status = PageStatus::from(self.loader().load_post(slug).await?);
        status.try_map(|post| self.render_post_page(&PageStatus::Ready(post)))
    }

    /// Render the listing page for a cursor.
    /// `more_url` is where the load-more button fetches the next [`MorePosts`];
    /// without one no button is rendered.
    pub fn render_listing(&self, listing: &Pagination, more_url: Option<&str>) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("posts", &self.post_cards(&listing.results));
        context.insert("more_url", &more_url);
        self.renderer.render("index.html", &context)
    }

    /// Render only the post cards, for appending to an existing listing
    pub fn render_post_cards(&self, posts: &[PostSummary]) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("posts", &self.post_cards(posts));
        self.renderer.render("partials/post_list.html", &context)
    }

    /// Render a post page in any of its generation states
    pub fn render_post_page(&self, status: &PageStatus<PostDetail>) -> Result<String> {
        let mut context = self.create_base_context();
        match status {
            PageStatus::Pending => {
                context.insert("refresh_seconds", &PLACEHOLDER_REFRESH_SECS);
                self.renderer.render("loading.html", &context)
            }
            PageStatus::Ready(post) => {
                context.insert("post", &self.post_page_data(post));
                self.renderer.render("post.html", &context)
            }
            PageStatus::NotFound => self.renderer.render("not_found.html", &context),
        }
    }

    fn create_base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("config", &self.config_data);
        context
    }

    fn post_cards(&self, posts: &[PostSummary]) -> Vec<PostCardData> {
        posts
            .iter()
            .map(|p| PostCardData {
                uid: p.uid.clone(),
                href: post_url(&self.blog.config, &p.uid),
                title: p.data.title.clone(),
                subtitle: p.data.subtitle.clone(),
                author: p.data.author.clone(),
                date: self.dates.format(p.first_publication_date.as_ref()),
            })
            .collect()
    }

    fn post_page_data(&self, post: &PostDetail) -> PostPageData {
        PostPageData {
            title: post.data.title.clone(),
            author: post.data.author.clone(),
            date: self.dates.format(post.first_publication_date.as_ref()),
            banner_url: post.data.banner.url.clone(),
            reading_time: post.reading_time(self.blog.config.words_per_minute),
            content: post.data.content.clone(),
        }
    }

    /// `public/post/<uid>/index.html`, or `None` for uids that would escape it
    fn post_output_path(&self, slug: &str) -> Option<PathBuf> {
        if !is_safe_slug(slug) {
            return None;
        }
        Some(
            self.blog
                .public_dir
                .join("post")
                .join(slug)
                .join("index.html"),
        )
    }

    /// Copy static assets (logo, stylesheets, ...) to the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.public_dir.join(relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::copy(path, &dest)?;
        }

        Ok(())
    }
}

/// Whether a uid can name a post page: one non-empty path segment
pub fn is_safe_slug(slug: &str) -> bool {
    !(slug.is_empty() || slug == "." || slug == ".." || slug.contains(['/', '\\']))
}
