//! HTTP implementation of [`ContentSource`] over the Prismic REST API v2

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{ApiPage, ContentSource, Document, ListQuery};
use crate::config::ApiConfig;
use crate::error::{ContentError, Result};

/// How long a master ref is reused before the API root is asked again
const REF_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

struct CachedRef {
    value: String,
    fetched_at: Instant,
}

/// Prismic client, constructed once by the caller and passed around by reference
pub struct PrismicClient {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    master_ref: Mutex<Option<CachedRef>>,
}

impl PrismicClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            master_ref: Mutex::new(None),
        })
    }

    /// Current master ref, refreshed every few seconds so new releases show up
    async fn master_ref(&self) -> Result<String> {
        if let Some(cached) = self.cached_ref() {
            return Ok(cached);
        }

        let mut request = self.client.get(&self.endpoint);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }
        let root: ApiRoot = self.get_json(request).await?;

        let value = root
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(ContentError::NoMasterRef)?;

        tracing::debug!("Using master ref {}", value);
        *self.master_ref.lock().unwrap_or_else(|e| e.into_inner()) = Some(CachedRef {
            value: value.clone(),
            fetched_at: Instant::now(),
        });

        Ok(value)
    }

    fn cached_ref(&self) -> Option<String> {
        let guard = self.master_ref.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < REF_TTL)
            .map(|cached| cached.value.clone())
    }

    async fn search(&self, predicate: String, query: &ListQuery) -> Result<ApiPage> {
        let mut params: Vec<(&str, String)> =
            vec![("ref", self.master_ref().await?), ("q", predicate)];
        if let Some(size) = query.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if !query.fetch.is_empty() {
            params.push(("fetch", query.fetch.join(",")));
        }
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }

        let url = format!("{}/documents/search", self.endpoint);
        tracing::debug!("Searching {} with {:?}", url, query);
        self.get_json(self.client.get(&url).query(&params)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            // never leak the access token into error messages
            let mut url = response.url().clone();
            url.set_query(None);
            return Err(ContentError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn get_by_type(&self, doc_type: &str, query: &ListQuery) -> Result<ApiPage> {
        self.search(type_predicate(doc_type), query).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Document>> {
        let page = self
            .search(uid_predicate(doc_type, uid), &ListQuery::full(1))
            .await?;
        Ok(page.results.into_iter().next())
    }

    async fn get_page(&self, next_page: &str) -> Result<ApiPage> {
        tracing::debug!("Fetching next page");
        self.get_json(self.client.get(next_page)).await
    }
}

fn type_predicate(doc_type: &str) -> String {
    format!(r#"[[at(document.type, "{}")]]"#, escape_literal(doc_type))
}

fn uid_predicate(doc_type: &str, uid: &str) -> String {
    format!(r#"[[at(my.{}.uid, "{}")]]"#, doc_type, escape_literal(uid))
}

fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
