//! List the posts published in the CMS

use anyhow::Result;

use crate::cms::ContentSource;
use crate::content::loader::ContentLoader;
use crate::content::{Pagination, PostSummary};
use crate::helpers::DateFormatter;
use crate::Blog;

/// Print every post, following the listing until the last page
pub async fn run(blog: &Blog) -> Result<()> {
    let source = blog.source()?;
    let listing = load_all(blog, source.as_ref()).await?;
    let dates = DateFormatter::from_config(&blog.config);

    println!("Posts ({}):", listing.results.len());
    for post in &listing.results {
        println!("{}", format_line(post, &dates));
    }

    Ok(())
}

/// Load the first listing page, then keep loading more until exhausted
pub async fn load_all<S>(blog: &Blog, source: &S) -> Result<Pagination>
where
    S: ContentSource + ?Sized,
{
    let loader = ContentLoader::new(&blog.config, source);
    let mut listing = loader.load_listing().await?;

    while listing.has_more() {
        listing = listing.load_more(source).await?;
    }

    Ok(listing)
}

fn format_line(post: &PostSummary, dates: &DateFormatter) -> String {
    format!(
        "  {} - {} [{}]",
        dates.format(post.first_publication_date.as_ref()),
        post.data.title,
        post.uid
    )
}
