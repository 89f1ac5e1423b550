//! Content module - normalized posts, listing pagination and reading time

pub mod loader;
mod pagination;
mod post;
pub mod reading_time;
pub mod rich_text;

pub use pagination::Pagination;
pub use post::{
    Banner, ContentBlock, NormalizeError, Paragraph, PostData, PostDetail, PostSummary,
    SummaryData,
};
