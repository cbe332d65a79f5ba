//! Listing aggregator - the paginated post listing
//!
//! The listing starts from a first page and grows by following the
//! `next_page` token returned with every page. A failed fetch leaves the
//! state exactly as it was and hands the error back to the caller.

use chrono_tz::Tz;
use serde::Serialize;

use crate::content::PostSummary;
use crate::error::Result;
use crate::prismic::{ApiPage, ContentSource, Document, ListQuery};

/// Posts loaded so far plus the token of the next page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaginationState {
    /// In the order the source returned them
    pub items: Vec<PostSummary>,
    /// `None` once every page has been loaded
    pub next_page: Option<String>,
}

/// Result of a successful [`ListingAggregator::load_next_page`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// There was no next page; nothing was fetched
    Exhausted,
    /// A page was fetched and `count` posts were appended
    Appended { count: usize },
}

/// Accumulates pages of post summaries from a content source.
///
/// Loading takes `&mut self`, so at most one fetch is in flight per listing.
pub struct ListingAggregator<'a> {
    source: &'a dyn ContentSource,
    tz: Tz,
    state: PaginationState,
}

impl<'a> ListingAggregator<'a> {
    /// Start from an already fetched first page
    pub fn initialize(source: &'a dyn ContentSource, tz: Tz, first_page: ApiPage) -> Result<Self> {
        let items = summarize(&first_page.results, &tz)?;
        Ok(Self {
            source,
            tz,
            state: PaginationState {
                items,
                next_page: first_page.next_page,
            },
        })
    }

    /// Fetch the first page of `doc_type` and start from it
    pub async fn fetch_first_page(
        source: &'a dyn ContentSource,
        tz: Tz,
        doc_type: &str,
        query: &ListQuery,
    ) -> Result<Self> {
        let page = source.get_by_type(doc_type, query).await?;
        tracing::debug!(
            "First page: {} of {} posts",
            page.results.len(),
            page.total_results_size
        );
        Self::initialize(source, tz, page)
    }

    /// Resume from an existing state
    pub fn from_state(source: &'a dyn ContentSource, tz: Tz, state: PaginationState) -> Self {
        Self { source, tz, state }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn into_state(self) -> PaginationState {
        self.state
    }

    pub fn has_next_page(&self) -> bool {
        self.state.next_page.is_some()
    }

    /// Fetch the next page and append its posts.
    ///
    /// No-op when there is no next page. On failure the error is logged and
    /// returned; items and token are left untouched. A page whose `next_page`
    /// is its own token ends the listing.
    pub async fn load_next_page(&mut self) -> Result<LoadOutcome> {
        let Some(token) = self.state.next_page.clone() else {
            return Ok(LoadOutcome::Exhausted);
        };

        let page = match self.source.get_page(&token).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to load next page: {}", e);
                return Err(e);
            }
        };

        let mut items = match summarize(&page.results, &self.tz) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Failed to read next page: {}", e);
                return Err(e);
            }
        };

        // pages are expected not to overlap; drop repeats if they do
        items.retain(|item| {
            let seen = self.state.items.iter().any(|known| known.uid == item.uid);
            if seen {
                tracing::debug!("Skipping repeated post {}", item.uid);
            }
            !seen
        });

        let count = items.len();
        self.state.items.extend(items);
        self.state.next_page = match page.next_page {
            Some(next) if next == token => {
                tracing::warn!("Listing page links to itself; ending the listing");
                None
            }
            next => next,
        };

        Ok(LoadOutcome::Appended { count })
    }

    /// Follow `next_page` until the listing is exhausted; returns the number
    /// of posts appended
    pub async fn load_all(&mut self) -> Result<usize> {
        let mut total = 0;
        while let LoadOutcome::Appended { count } = self.load_next_page().await? {
            total += count;
        }
        Ok(total)
    }
}

fn summarize(docs: &[Document], tz: &Tz) -> Result<Vec<PostSummary>> {
    docs.iter()
        .map(|doc| PostSummary::from_document(doc, tz))
        .collect()
}
