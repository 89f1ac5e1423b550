//! HTTP server with deferred generation of post pages

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::cache::{PageCache, PageStatus};
use crate::cms::CmsError;
use crate::content::Pagination;
use crate::generator::{is_safe_slug, GeneratedSite, Generator, MorePosts, MORE_POSTS_PATH};
use crate::helpers::url_for;
use crate::Blog;

const LISTING_KEY: &str = "/";

/// Seconds a client should wait when no generation slot is free
const BUSY_RETRY_SECS: u64 = 5;

/// Server state
pub struct AppState {
    generator: Generator,
    pages: PageCache,
    public: ServeDir,
    /// Site root without the trailing slash, `""` when served at `/`
    base_path: String,
}

impl AppState {
    pub fn new(generator: Generator) -> Self {
        let revalidate = Duration::from_secs(generator.blog().config.revalidate);
        Self::with_cache(generator, PageCache::new(revalidate))
    }

    pub fn with_cache(generator: Generator, pages: PageCache) -> Self {
        let blog = generator.blog();
        let public = ServeDir::new(&blog.public_dir).append_index_html_on_directories(true);
        let base_path = base_path(&url_for(&blog.config, "/"));
        Self {
            generator,
            pages,
            public,
            base_path,
        }
    }

    /// Serve pages from a previous full generation
    pub fn seed(&self, site: &GeneratedSite) {
        self.pages
            .complete(LISTING_KEY, PageStatus::Ready(site.index.clone()));
        for (slug, html) in &site.posts {
            self.pages
                .complete(&post_key(slug), PageStatus::Ready(html.clone()));
        }
        tracing::debug!("Seeded {} pages", self.pages.len());
    }
}

/// `/blog/` -> `/blog`, `/` -> ``
fn base_path(home_url: &str) -> String {
    let trimmed = home_url.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn post_key(slug: &str) -> String {
    format!("/post/{}", slug)
}

/// Generate the site, then serve it
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let generator = Generator::new(blog, blog.source()?)?;

    tracing::info!("Generating static files...");
    let site = generator.generate().await?;

    let state = Arc::new(AppState::new(generator));
    state.seed(&site);
    let home = format!("{}/", state.base_path);

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}{}", ip, port, home);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes of the blog under the site root; anything else below the root is
/// served from the public directory
pub fn router(state: Arc<AppState>) -> Router {
    let base = state.base_path.clone();

    let mut router = Router::new()
        .route(&format!("{}/", base), get(index_handler))
        .route(&format!("{}/post/:slug", base), get(post_handler))
        .route(&format!("{}/post/:slug/", base), get(post_handler))
        .route(&format!("{}/{}", base, MORE_POSTS_PATH), get(more_handler));
    if !base.is_empty() {
        router = router.route(&base, get(index_handler));
    }

    router
        .fallback(static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Files of the public directory, addressed relative to the site root
async fn static_handler(State(state): State<Arc<AppState>>, mut req: Request) -> Response {
    let Some(uri) = strip_base(&state.base_path, req.uri()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    *req.uri_mut() = uri;

    let mut public = state.public.clone();
    match public.try_call(req).await {
        Ok(resp) => resp.map(Body::new),
        Err(e) => {
            tracing::error!("Failed to serve static file: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// The request URI relative to `base`, or `None` outside of it
fn strip_base(base: &str, uri: &Uri) -> Option<Uri> {
    let rest = uri.path().strip_prefix(base)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let path = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    path_and_query.parse().ok()
}

/// Listing page, regenerated in the background once stale
async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    if let Some((PageStatus::Ready(html), stale)) = state.pages.get(LISTING_KEY) {
        if stale && state.pages.claim(LISTING_KEY) {
            spawn_listing_regeneration(&state);
        }
        return Html(html).into_response();
    }

    // Another request is already building it
    if !state.pages.claim(LISTING_KEY) {
        return placeholder(&state);
    }

    // Nothing to serve yet, so build it inline
    match state.generator.build_listing().await {
        Ok(html) => {
            state
                .pages
                .complete(LISTING_KEY, PageStatus::Ready(html.clone()));
            Html(html).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to build listing: {:#}", e);
            state.pages.abandon(LISTING_KEY);
            (StatusCode::BAD_GATEWAY, "Failed to load posts").into_response()
        }
    }
}

fn spawn_listing_regeneration(state: &Arc<AppState>) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        match state.generator.build_listing().await {
            Ok(html) => {
                state.pages.complete(LISTING_KEY, PageStatus::Ready(html));
                tracing::info!("Regenerated listing");
            }
            Err(e) => {
                tracing::warn!("Listing regeneration failed: {:#}", e);
                state.pages.abandon(LISTING_KEY);
            }
        }
    });
}

/// Post page: placeholder while generating, 404 if the CMS has no such post
async fn post_handler(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    if !is_safe_slug(&slug) {
        return not_found(&state);
    }

    let key = post_key(&slug);
    if state.pages.claim(&key) {
        spawn_post_generation(&state, slug, key.clone());
    }

    match state.pages.get(&key).map(|(status, _)| status) {
        Some(PageStatus::Ready(html)) => Html(html).into_response(),
        Some(PageStatus::Pending) => placeholder(&state),
        Some(PageStatus::NotFound) => not_found(&state),
        None => {
            tracing::debug!("No generation slot for {:?}", key);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, BUSY_RETRY_SECS.to_string())],
                "Too many pages are being generated, try again shortly",
            )
                .into_response()
        }
    }
}

fn placeholder(state: &AppState) -> Response {
    match state.generator.render_post_page(&PageStatus::Pending) {
        Ok(html) => ([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response(),
        Err(e) => render_error(e),
    }
}

fn not_found(state: &AppState) -> Response {
    match state.generator.render_post_page(&PageStatus::NotFound) {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => render_error(e),
    }
}

fn spawn_post_generation(state: &Arc<AppState>, slug: String, key: String) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        match state.generator.build_post(&slug).await {
            Ok(status) => {
                tracing::info!(
                    "Generated post {:?} ({})",
                    slug,
                    if matches!(status, PageStatus::NotFound) {
                        "not found"
                    } else {
                        "ready"
                    }
                );
                state.pages.complete(&key, status);
            }
            Err(e) => {
                tracing::warn!("Failed to generate post {:?}: {:#}", slug, e);
                state.pages.abandon(&key);
            }
        }
    });
}

fn render_error(e: anyhow::Error) -> Response {
    tracing::error!("Render failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

#[derive(Debug, Deserialize)]
struct MoreQuery {
    cursor: String,
}

/// Load the page behind a listing cursor and render its post cards
async fn more_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MoreQuery>,
) -> Response {
    let cursor = Pagination::starting_at(query.cursor);

    let page = match cursor.load_more(state.generator.source()).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Failed to load more posts: {}", e);
            let status = match e {
                CmsError::ForeignUrl(_) | CmsError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            return (status, e.to_string()).into_response();
        }
    };

    match state.generator.render_post_cards(&page.results) {
        Ok(html) => Json(MorePosts {
            html,
            next_page: page
                .next_page
                .as_deref()
                .map(|next| state.generator.more_url(next)),
        })
        .into_response(),
        Err(e) => render_error(e),
    }
}
