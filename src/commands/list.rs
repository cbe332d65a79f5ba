//! List the posts available from the content source

use anyhow::Result;

use crate::content::PostSummary;
use crate::listing::ListingAggregator;
use crate::prismic::{ContentSource, ListQuery};
use crate::Spacetraveling;

/// Print every post, newest first as the source orders them
pub async fn run(app: &Spacetraveling, source: &dyn ContentSource) -> Result<()> {
    let posts = collect(app, source).await?;

    println!("Posts ({}):", posts.len());
    for post in posts {
        println!("  {} - {} [{}]", post.display_date, post.title, post.uid);
    }

    Ok(())
}

/// Load as many pages as possible; a failing page ends the walk early
pub async fn collect(app: &Spacetraveling, source: &dyn ContentSource) -> Result<Vec<PostSummary>> {
    let api = &app.config.api;
    let mut listing = ListingAggregator::fetch_first_page(
        source,
        app.config.tz()?,
        &api.document_type,
        &ListQuery::summaries(&api.document_type, api.paths_page_size),
    )
    .await?;

    if let Err(e) = listing.load_all().await {
        tracing::warn!("Listing is incomplete: {}", e);
    }

    Ok(listing.into_state().items)
}
