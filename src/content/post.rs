//! Post models built from CMS documents

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::reading::reading_time;
use super::RichText;
use crate::error::{ContentError, Result};
use crate::helpers::display_date;
use crate::prismic::Document;

/// Listing-view representation of a post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub uid: String,
    pub publication_date: Option<DateTime<Utc>>,
    /// Publication date as shown to readers, e.g. `25 mar 2021`
    pub display_date: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

#[derive(Deserialize)]
struct SummaryFields {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: String,
    #[serde(default)]
    author: String,
}

impl PostSummary {
    /// Build a summary, formatting the date for display right away
    pub fn from_document(doc: &Document, tz: &Tz) -> Result<Self> {
        let uid = require_uid(doc)?;
        let fields: SummaryFields =
            serde_json::from_value(doc.data.clone()).map_err(|e| malformed(doc, e))?;

        Ok(Self {
            uid,
            publication_date: doc.first_publication_date,
            display_date: display_date(doc.first_publication_date.as_ref(), tz),
            title: fields.title,
            subtitle: fields.subtitle,
            author: fields.author,
        })
    }
}

/// One titled section of a post body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentSection {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: RichText,
}

/// A fully fetched post
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub uid: String,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub content: Vec<ContentSection>,
}

#[derive(Deserialize)]
struct DetailFields {
    #[serde(default)]
    title: String,
    #[serde(default)]
    banner: Banner,
    #[serde(default)]
    author: String,
    #[serde(default)]
    content: Vec<ContentSection>,
}

#[derive(Default, Deserialize)]
struct Banner {
    url: Option<String>,
}

impl PostDetail {
    pub fn from_document(doc: Document) -> Result<Self> {
        let uid = require_uid(&doc)?;
        let fields: DetailFields =
            serde_json::from_value(doc.data.clone()).map_err(|e| malformed(&doc, e))?;

        Ok(Self {
            uid,
            title: fields.title,
            banner_url: fields.banner.url.unwrap_or_default(),
            author: fields.author,
            publication_date: doc.first_publication_date,
            content: fields.content,
        })
    }

    /// Estimated reading time in minutes
    pub fn reading_time(&self) -> usize {
        reading_time(&self.content)
    }
}

/// What a post page shows
#[derive(Debug, Clone)]
pub enum PostView {
    /// The post is still being fetched
    Loading,
    Ready(PostDetail),
    NotFound(String),
}

impl PostView {
    pub fn is_ready(&self) -> bool {
        matches!(self, PostView::Ready(_))
    }
}

fn require_uid(doc: &Document) -> Result<String> {
    doc.uid
        .clone()
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| ContentError::Malformed {
            id: doc.id.clone(),
            reason: "document has no uid".to_string(),
        })
}

fn malformed(doc: &Document, err: serde_json::Error) -> ContentError {
    ContentError::Malformed {
        id: doc.id.clone(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{detail_document, summary_document};

    #[test]
    fn test_summary_from_document() {
        let doc = summary_document("hooks", "2021-03-25T00:00:00Z", "Como utilizar Hooks");
        let summary = PostSummary::from_document(&doc, &chrono_tz::UTC).unwrap();

        assert_eq!(summary.uid, "hooks");
        assert_eq!(summary.title, "Como utilizar Hooks");
        assert_eq!(summary.subtitle, "Subtítulo de Como utilizar Hooks");
        assert_eq!(summary.author, "Joseph Oliveira");
        assert_eq!(summary.display_date, "25 mar 2021");
    }

    #[test]
    fn test_summary_requires_uid() {
        let mut doc = summary_document("hooks", "2021-03-25T00:00:00Z", "Hooks");
        doc.uid = None;
        let err = PostSummary::from_document(&doc, &chrono_tz::UTC).unwrap_err();
        assert!(matches!(err, ContentError::Malformed { .. }));
    }

    #[test]
    fn test_unpublished_summary_has_empty_date() {
        let mut doc = summary_document("draft", "2021-03-25T00:00:00Z", "Draft");
        doc.first_publication_date = None;
        let summary = PostSummary::from_document(&doc, &chrono_tz::UTC).unwrap();
        assert_eq!(summary.display_date, "");
    }

    #[test]
    fn test_detail_from_document() {
        let detail = PostDetail::from_document(detail_document("hooks")).unwrap();

        assert_eq!(detail.uid, "hooks");
        assert_eq!(detail.title, "Como utilizar Hooks");
        assert_eq!(detail.banner_url, "https://images.prismic.io/spacetraveling/banner.png");
        assert_eq!(detail.content.len(), 2);
        assert_eq!(detail.content[0].heading, "Proin et varius");
        // 3 + 5 + 2 + 4 words
        assert_eq!(detail.reading_time(), 1);
    }

    #[test]
    fn test_detail_with_wrong_shape_is_malformed() {
        let mut doc = detail_document("hooks");
        doc.data = serde_json::json!({"content": "not a list"});
        assert!(matches!(
            PostDetail::from_document(doc),
            Err(ContentError::Malformed { .. })
        ));
    }
}
