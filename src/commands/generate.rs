//! Generate static files

use anyhow::Result;

use crate::generator::{GeneratedSite, Generator};
use crate::Blog;

/// Fetch every post from the CMS and write the site to the public directory
pub async fn run(blog: &Blog) -> Result<GeneratedSite> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog, blog.source()?)?;
    let site = generator.generate().await?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} posts in {:.2}s",
        site.posts.len(),
        duration.as_secs_f64()
    );

    Ok(site)
}
