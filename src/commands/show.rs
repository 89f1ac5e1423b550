//! Show a single post

use anyhow::Result;

use crate::content::loader::ContentLoader;
use crate::content::PostDetail;
use crate::helpers::DateFormatter;
use crate::Blog;

/// Print a post's metadata and section headings
pub async fn run(blog: &Blog, slug: &str) -> Result<()> {
    let source = blog.source()?;
    let loader = ContentLoader::new(&blog.config, source.as_ref());

    let Some(post) = loader.load_post(slug).await? else {
        anyhow::bail!("No post with uid {:?}", slug);
    };

    let dates = DateFormatter::from_config(&blog.config);
    let words_per_minute = blog.config.words_per_minute;
    print!(
        "{}",
        describe(&post, &dates, words_per_minute, &blog.config.labels.minutes)
    );
    Ok(())
}

fn describe(
    post: &PostDetail,
    dates: &DateFormatter,
    words_per_minute: usize,
    minutes: &str,
) -> String {
    let mut out = format!(
        "{}\n  {} | {} | {} {}\n",
        post.data.title,
        dates.format(post.first_publication_date.as_ref()),
        post.data.author,
        post.reading_time(words_per_minute),
        minutes
    );
    if !post.data.banner.url.is_empty() {
        out.push_str(&format!("  banner: {}\n", post.data.banner.url));
    }
    for block in &post.data.content {
        out.push_str(&format!(
            "  - {} ({} paragraphs)\n",
            block.heading,
            block.body.len()
        ));
    }
    out
}
