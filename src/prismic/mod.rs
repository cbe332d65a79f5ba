//! Content source: the Prismic document API
//!
//! [`ContentSource`] is the seam between the site and the CMS. The generator,
//! the listing aggregator and the server only see the trait; the HTTP
//! implementation lives in [`client`].

mod client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub use client::PrismicClient;

use crate::error::Result;
use crate::helpers::parse_api_date;

/// A document as returned by the search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, deserialize_with = "deserialize_api_date")]
    pub first_publication_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of search results
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiPage {
    pub page: u32,
    pub results_per_page: usize,
    pub total_results_size: usize,
    pub total_pages: u32,
    /// Absolute URL of the next page; `None` on the last page
    pub next_page: Option<String>,
    pub results: Vec<Document>,
}

/// Field projection and page size of a list query
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Fully qualified fields, e.g. `post.title`
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
}

impl ListQuery {
    /// Query used by the listing: title, subtitle and author only
    pub fn summaries(doc_type: &str, page_size: usize) -> Self {
        Self {
            fetch: ["title", "subtitle", "author"]
                .iter()
                .map(|field| format!("{}.{}", doc_type, field))
                .collect(),
            page_size: Some(page_size),
        }
    }

    /// Query returning whole documents
    pub fn full(page_size: usize) -> Self {
        Self {
            fetch: Vec::new(),
            page_size: Some(page_size),
        }
    }
}

/// A paginated, read-only content source
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List documents of a custom type
    async fn get_by_type(&self, doc_type: &str, query: &ListQuery) -> Result<ApiPage>;

    /// Fetch a single document by its uid
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Document>>;

    /// Follow a `next_page` URL returned by a previous list call
    async fn get_page(&self, next_page: &str) -> Result<ApiPage>;
}

fn deserialize_api_date<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_api_date(&s).map_err(serde::de::Error::custom))
        .transpose()
}
