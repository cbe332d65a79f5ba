//! Content module - post models, rich text and reading time

mod post;
pub mod reading;
mod richtext;

pub use post::{ContentSection, PostDetail, PostSummary, PostView};
pub use reading::reading_time;
pub use richtext::{Block, LinkData, RichText, Span, SpanKind};
