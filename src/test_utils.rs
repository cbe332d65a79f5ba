//! In-memory content source and document fixtures for tests

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ContentError, Result};
use crate::helpers::parse_api_date;
use crate::prismic::{ApiPage, ContentSource, Document, ListQuery};

/// Serves a fixed first page, follow-up pages keyed by token and documents by uid
#[derive(Default)]
pub struct MockSource {
    first: ApiPage,
    pages: HashMap<String, ApiPage>,
    documents: HashMap<String, Document>,
    failing: HashSet<String>,
    page_calls: AtomicUsize,
}

impl MockSource {
    pub fn new(first: ApiPage) -> Self {
        Self {
            first,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, token: &str, page: ApiPage) -> Self {
        self.pages.insert(token.to_string(), page);
        self
    }

    pub fn with_document(mut self, doc: Document) -> Self {
        let uid = doc.uid.clone().unwrap_or_default();
        self.documents.insert(uid, doc);
        self
    }

    /// Make fetching a page token or a uid fail like an unavailable server
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing.contains(key) {
            return Err(ContentError::Status {
                status: 503,
                url: key.to_string(),
            });
        }
        Ok(())
    }

    /// Number of `get_page` calls served so far
    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn get_by_type(&self, _doc_type: &str, _query: &ListQuery) -> Result<ApiPage> {
        Ok(self.first.clone())
    }

    async fn get_by_uid(&self, _doc_type: &str, uid: &str) -> Result<Option<Document>> {
        self.check(uid)?;
        Ok(self.documents.get(uid).cloned())
    }

    async fn get_page(&self, next_page: &str) -> Result<ApiPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.check(next_page)?;
        self.pages
            .get(next_page)
            .cloned()
            .ok_or_else(|| ContentError::Status {
                status: 404,
                url: next_page.to_string(),
            })
    }
}

pub fn api_page(results: Vec<Document>, next_page: Option<&str>) -> ApiPage {
    ApiPage {
        page: 1,
        results_per_page: results.len(),
        total_results_size: results.len(),
        total_pages: 1,
        next_page: next_page.map(String::from),
        results,
    }
}

/// A listing document with title, subtitle and author projected
pub fn summary_document(uid: &str, date: &str, title: &str) -> Document {
    Document {
        id: format!("id-{}", uid),
        uid: Some(uid.to_string()),
        doc_type: "post".to_string(),
        first_publication_date: parse_api_date(date).ok(),
        data: json!({
            "title": title,
            "subtitle": format!("Subtítulo de {}", title),
            "author": "Joseph Oliveira",
        }),
    }
}

/// A full post document with two content sections
pub fn detail_document(uid: &str) -> Document {
    Document {
        id: format!("id-{}", uid),
        uid: Some(uid.to_string()),
        doc_type: "post".to_string(),
        first_publication_date: parse_api_date("2021-03-25T19:25:28+0000").ok(),
        data: json!({
            "title": "Como utilizar Hooks",
            "subtitle": "Pensando em sincronização",
            "author": "Joseph Oliveira",
            "banner": {"url": "https://images.prismic.io/spacetraveling/banner.png"},
            "content": [
                {
                    "heading": "Proin et varius",
                    "body": [{
                        "type": "paragraph",
                        "text": "Nullam dolor sapien, vulputate eu",
                        "spans": [{"start": 0, "end": 6, "type": "strong"}]
                    }]
                },
                {
                    "heading": "Cras laoreet",
                    "body": [
                        {"type": "list-item", "text": "mi ac", "spans": []},
                        {"type": "list-item", "text": "tempor <b>eget</b>", "spans": []}
                    ]
                }
            ]
        }),
    }
}
