//! Preview server
//!
//! Serves the generated site and adds the dynamic parts a static host cannot
//! provide: the "load more" endpoint of the listing, on-demand rendering of
//! posts that were not generated yet, and periodic revalidation.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::content::PostView;
use crate::generator::{Generator, ListingPage};
use crate::helpers::{is_safe_uid, load_more_url, LOAD_MORE_PATH};
use crate::listing::{ListingAggregator, PaginationState};
use crate::prismic::ContentSource;
use crate::Spacetraveling;

/// Server state
pub struct ServerState {
    app: Spacetraveling,
    source: Arc<dyn ContentSource>,
    generator: Generator,
    tz: Tz,
    /// Posts currently being rendered on demand
    in_flight: Mutex<HashSet<String>>,
}

impl ServerState {
    pub fn new(app: &Spacetraveling, source: Arc<dyn ContentSource>) -> Result<Self> {
        Ok(Self {
            app: app.clone(),
            source,
            generator: Generator::new(app)?,
            tz: app.config.tz()?,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Render and write a post in the background.
    ///
    /// Returns `None` when the same post is already being rendered.
    fn spawn_generation(self: &Arc<Self>, uid: &str) -> Option<JoinHandle<Result<PostView>>> {
        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(uid.to_string()) {
                return None;
            }
        }

        let state = Arc::clone(self);
        let uid = uid.to_string();
        Some(tokio::spawn(async move {
            let result = state.generator.generate_post(&*state.source, &uid).await;
            state
                .in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&uid);
            if let Err(ref e) = result {
                tracing::warn!("Failed to render post {}: {}", uid, e);
                // keep serving the old page until the next revalidation
                if let Err(e) = state.generator.touch_post(&uid) {
                    tracing::warn!("Failed to touch page of {}: {}", uid, e);
                }
            }
            result
        }))
    }

    /// Whether a token points at the configured content API
    fn is_api_url(&self, url: &str) -> bool {
        let origin = |s: &str| reqwest::Url::parse(s).ok().map(|u| u.origin());
        match (origin(url), origin(&self.app.config.api.endpoint)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn page(&self, status: StatusCode, view: &PostView) -> Response {
        match self.generator.render_post(view) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Template error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }
}

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    let public_dir = state.app.public_dir.clone();
    let static_files = ServeDir::new(&public_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(public_dir.join("404.html")));

    Router::new()
        .route(&format!("/{}", LOAD_MORE_PATH), get(load_more_handler))
        .route("/post/:uid", get(post_handler))
        .route("/post/:uid/", get(post_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the preview server
pub async fn start(
    app: &Spacetraveling,
    source: Arc<dyn ContentSource>,
    ip: &str,
    port: u16,
) -> Result<()> {
    let state = Arc::new(ServerState::new(app, source)?);

    // Keep the home page fresh
    spawn_index_revalidation(
        Arc::clone(&state),
        Duration::from_secs(app.config.revalidate_secs.max(1)),
    );

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Regenerate the listing pages every `period`, first after one period
pub fn spawn_index_revalidation(state: Arc<ServerState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            match state.generator.generate_index(&*state.source).await {
                Ok(listed) => tracing::info!("Revalidated home page ({} posts)", listed),
                Err(e) => tracing::warn!("Failed to revalidate home page: {}", e),
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct LoadMoreParams {
    next: String,
}

/// Fetch one more listing page
async fn load_more_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<LoadMoreParams>,
) -> Response {
    if !state.is_api_url(&params.next) {
        return (StatusCode::BAD_REQUEST, "Invalid page token").into_response();
    }

    let mut listing = ListingAggregator::from_state(
        &*state.source,
        state.tz,
        PaginationState {
            items: Vec::new(),
            next_page: Some(params.next),
        },
    );

    if let Err(e) = listing.load_next_page().await {
        return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
    }

    let page = listing.into_state();
    match state.generator.render_post_cards(&page.items) {
        Ok(html) => Json(ListingPage {
            html,
            load_more_url: page
                .next_page
                .as_deref()
                .map(|next| load_more_url(&state.app.config, next)),
            next_page: page.next_page,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Template error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Serve a post page, rendering it on demand when it does not exist yet
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<String>,
) -> Response {
    if !is_safe_uid(&uid) {
        return state.page(StatusCode::NOT_FOUND, &PostView::NotFound(uid));
    }

    let path = state.generator.post_output_path(&uid);
    if let Ok(html) = tokio::fs::read_to_string(&path).await {
        let stale = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age.as_secs() >= state.app.config.revalidate_secs);
        if stale {
            tracing::debug!("Revalidating post {}", uid);
            let _ = state.spawn_generation(&uid);
        }
        return Html(html).into_response();
    }

    let Some(handle) = state.spawn_generation(&uid) else {
        return state.page(StatusCode::OK, &PostView::Loading);
    };

    let wait = Duration::from_millis(state.app.config.fallback_wait_ms);
    match tokio::time::timeout(wait, handle).await {
        Ok(Ok(Ok(view))) => {
            let status = if view.is_ready() {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            };
            state.page(status, &view)
        }
        Ok(Ok(Err(_))) => (StatusCode::BAD_GATEWAY, "Failed to load post").into_response(),
        Ok(Err(e)) => {
            tracing::error!("Render task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
        // still fetching: the task keeps running and writes the page
        Err(_) => state.page(StatusCode::OK, &PostView::Loading),
    }
}
