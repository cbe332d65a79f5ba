//! Generator module - renders the listing and post pages with the built-in templates

use anyhow::Result;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use tera::Context;

use crate::content::{PostDetail, PostSummary, PostView};
use crate::helpers::{
    date_xml, display_date, full_url_for, is_safe_uid, listing_page_path, load_more_url,
    meta_generator, open_graph, post_path, resolve_link, truncate, url_for, LISTING_PAGES_DIR,
};
use crate::listing::ListingAggregator;
use crate::prismic::{ContentSource, ListQuery};
use crate::templates::{
    ConfigData, PostCard, PostPageData, SectionData, TemplateRenderer, LOGO_SVG,
};
use crate::Spacetraveling;

/// Seconds before the loading placeholder reloads itself
const LOADING_REFRESH_SECS: u64 = 2;

/// Number of characters of post text used for the page description
const DESCRIPTION_LENGTH: usize = 160;

/// What a full generation produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub listed: usize,
    pub posts: usize,
    pub missing: usize,
}

/// One page of the listing as fetched by the "load more" control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPage {
    /// Listing entries to append
    pub html: String,
    pub next_page: Option<String>,
    /// Where the control should point next; absent on the last page
    pub load_more_url: Option<String>,
}

/// Static site generator using Tera templates
pub struct Generator {
    app: Spacetraveling,
    renderer: TemplateRenderer,
    tz: Tz,
}

impl Generator {
    /// Create a new generator
    pub fn new(app: &Spacetraveling) -> Result<Self> {
        Ok(Self {
            app: app.clone(),
            renderer: TemplateRenderer::new()?,
            tz: app.config.tz()?,
        })
    }

    /// Generate the entire site
    pub async fn generate(&self, source: &dyn ContentSource) -> Result<GenerateReport> {
        fs::create_dir_all(&self.app.public_dir)?;
        self.write_static_assets()?;

        let mut report = GenerateReport {
            listed: self.generate_index(source).await?,
            ..GenerateReport::default()
        };

        for uid in self.collect_uids(source).await? {
            match self.generate_post(source, &uid).await {
                Ok(PostView::Ready(_)) => report.posts += 1,
                Ok(_) => {
                    tracing::warn!("Post {} disappeared while generating", uid);
                    report.missing += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to generate post {}: {}", uid, e);
                    report.missing += 1;
                }
            }
        }

        self.write_page(
            "404.html",
            &self.render_post(&PostView::NotFound(String::new()))?,
        )?;

        Ok(report)
    }

    /// Write the home page and every following listing page.
    ///
    /// The home page holds the first page only. Later pages are written as
    /// JSON under `api/posts/page/` for the "load more" control, so a static
    /// host can serve them. If a page cannot be fetched, the last written
    /// page points at the preview server endpoint instead. Returns the number
    /// of posts on the home page.
    pub async fn generate_index(&self, source: &dyn ContentSource) -> Result<usize> {
        let mut listing = ListingAggregator::fetch_first_page(
            source,
            self.tz,
            &self.app.config.api.document_type,
            &self.listing_query(),
        )
        .await?;
        let first = listing.state().clone();

        // items of every later page, with the token that follows them
        let mut pages: Vec<(Vec<PostSummary>, Option<String>)> = Vec::new();
        while listing.has_next_page() {
            let before = listing.state().items.len();
            if listing.load_next_page().await.is_err() {
                tracing::warn!(
                    "Listing pages after page {} are left to the server",
                    pages.len() + 1
                );
                break;
            }
            let state = listing.state();
            pages.push((state.items[before..].to_vec(), state.next_page.clone()));
        }

        let pages_dir = self.app.public_dir.join(LISTING_PAGES_DIR);
        if pages_dir.exists() {
            fs::remove_dir_all(&pages_dir)?;
        }

        let link = |page: usize, token: Option<&String>| {
            token.map(|token| {
                if page - 2 < pages.len() {
                    url_for(&self.app.config, &listing_page_path(page))
                } else {
                    load_more_url(&self.app.config, token)
                }
            })
        };

        for (i, (items, next_page)) in pages.iter().enumerate() {
            let page = ListingPage {
                html: self.render_post_cards(items)?,
                next_page: next_page.clone(),
                load_more_url: link(i + 3, next_page.as_ref()),
            };
            self.write_page(&listing_page_path(i + 2), &serde_json::to_string(&page)?)?;
        }

        let load_more = link(2, first.next_page.as_ref());
        self.write_page(
            "index.html",
            &self.render_index(&first.items, load_more.as_deref())?,
        )?;
        tracing::debug!("Wrote {} listing pages", pages.len() + 1);

        Ok(first.items.len())
    }

    /// Query used by the listing and by every "load more"
    pub fn listing_query(&self) -> ListQuery {
        let api = &self.app.config.api;
        ListQuery::summaries(&api.document_type, api.page_size)
    }

    /// Fetch a post and wrap it in the view to render
    pub async fn fetch_post(&self, source: &dyn ContentSource, uid: &str) -> Result<PostView> {
        if !is_safe_uid(uid) {
            return Ok(PostView::NotFound(uid.to_string()));
        }

        let doc = source
            .get_by_uid(&self.app.config.api.document_type, uid)
            .await?;
        Ok(match doc {
            Some(doc) => PostView::Ready(PostDetail::from_document(doc)?),
            None => PostView::NotFound(uid.to_string()),
        })
    }

    /// Fetch a post and write its page when it exists; the page of a post
    /// that no longer exists is removed
    pub async fn generate_post(&self, source: &dyn ContentSource, uid: &str) -> Result<PostView> {
        let view = self.fetch_post(source, uid).await?;
        match view {
            PostView::Ready(ref post) => {
                let html = self.render_post(&view)?;
                self.write_page(&format!("{}index.html", post_path(&post.uid)), &html)?;
            }
            PostView::NotFound(_) => self.remove_post(uid)?,
            PostView::Loading => {}
        }
        Ok(view)
    }

    /// Delete the generated page of a post, if any
    pub fn remove_post(&self, uid: &str) -> Result<()> {
        if !is_safe_uid(uid) {
            return Ok(());
        }
        let path = self.post_output_path(uid);
        if path.exists() {
            fs::remove_file(&path)?;
            if let Some(dir) = path.parent() {
                // only succeeds when the directory is empty
                let _ = fs::remove_dir(dir);
            }
            tracing::info!("Removed page of deleted post {}", uid);
        }
        Ok(())
    }

    /// Mark the generated page of a post as fresh without fetching it again
    pub fn touch_post(&self, uid: &str) -> Result<()> {
        let path = self.post_output_path(uid);
        if path.exists() {
            fs::File::options()
                .write(true)
                .open(&path)?
                .set_modified(SystemTime::now())?;
        }
        Ok(())
    }

    /// Path of the generated page of a post
    pub fn post_output_path(&self, uid: &str) -> PathBuf {
        self.app
            .public_dir
            .join(post_path(uid))
            .join("index.html")
    }

    /// Render the listing page; `load_more_url` is where the "load more"
    /// control fetches the next page, if there is one
    pub fn render_index(
        &self,
        items: &[PostSummary],
        load_more_url: Option<&str>,
    ) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("posts", &self.post_cards(items));
        context.insert("load_more_url", &load_more_url);
        self.renderer.render("index.html", &context)
    }

    /// Render just the listing entries, for appending to an existing page
    pub fn render_post_cards(&self, items: &[PostSummary]) -> Result<String> {
        let mut context = Context::new();
        context.insert("posts", &self.post_cards(items));
        self.renderer.render("partials/post_cards.html", &context)
    }

    /// Render a post page, dispatching on the view
    pub fn render_post(&self, view: &PostView) -> Result<String> {
        let mut context = self.create_base_context();

        match view {
            PostView::Loading => {
                context.insert("refresh_secs", &LOADING_REFRESH_SECS);
                self.renderer.render("loading.html", &context)
            }
            PostView::Ready(post) => {
                let page = self.post_page_data(post);
                let text = post
                    .content
                    .iter()
                    .map(|section| section.body.as_text())
                    .collect::<Vec<_>>()
                    .join(" ");
                let description = truncate(text.trim(), DESCRIPTION_LENGTH, None);
                let og = open_graph(
                    &post.title,
                    &description,
                    &full_url_for(&self.app.config, &post_path(&post.uid)),
                    Some(&post.banner_url),
                    &self.app.config.title,
                );
                context.insert("open_graph", &og);
                context.insert("post", &page);
                self.renderer.render("post.html", &context)
            }
            PostView::NotFound(uid) => {
                if !uid.is_empty() {
                    tracing::debug!("Rendering not found page for {}", uid);
                }
                self.renderer.render("not_found.html", &context)
            }
        }
    }

    fn post_page_data(&self, post: &PostDetail) -> PostPageData {
        let config = &self.app.config;
        let resolve = |link: &crate::content::LinkData| resolve_link(config, link);

        PostPageData {
            title: post.title.clone(),
            banner_url: post.banner_url.clone(),
            author: post.author.clone(),
            date: display_date(post.publication_date.as_ref(), &self.tz),
            datetime: post
                .publication_date
                .as_ref()
                .map(date_xml)
                .unwrap_or_default(),
            reading_time: post.reading_time(),
            sections: post
                .content
                .iter()
                .map(|section| SectionData {
                    heading: section.heading.clone(),
                    html: section.body.as_html(&resolve),
                })
                .collect(),
        }
    }

    fn post_cards(&self, items: &[PostSummary]) -> Vec<PostCard> {
        items
            .iter()
            .map(|p| PostCard {
                path: url_for(&self.app.config, &post_path(&p.uid)),
                title: p.title.clone(),
                subtitle: p.subtitle.clone(),
                author: p.author.clone(),
                date: p.display_date.clone(),
            })
            .collect()
    }

    /// Create a base context with common variables
    fn create_base_context(&self) -> Context {
        let config = &self.app.config;
        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: config.title.clone(),
                language: config.language.clone(),
                root: url_for(config, "/"),
                logo_url: url_for(config, "images/logo.svg"),
            },
        );
        context.insert("generator_tag", &meta_generator());
        context
    }

    /// Walk every listing page to find all posts to pre-render
    async fn collect_uids(&self, source: &dyn ContentSource) -> Result<Vec<String>> {
        let api = &self.app.config.api;
        let mut listing = ListingAggregator::fetch_first_page(
            source,
            self.tz,
            &api.document_type,
            &ListQuery::summaries(&api.document_type, api.paths_page_size),
        )
        .await?;
        listing.load_all().await?;

        Ok(listing
            .into_state()
            .items
            .into_iter()
            .map(|p| p.uid)
            .filter(|uid| {
                let safe = is_safe_uid(uid);
                if !safe {
                    tracing::warn!("Skipping post with unusable uid {:?}", uid);
                }
                safe
            })
            .collect())
    }

    fn write_static_assets(&self) -> Result<()> {
        self.write_page("images/logo.svg", LOGO_SVG)
    }

    fn write_page(&self, relative: &str, content: &str) -> Result<()> {
        let output_path = self.app.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        fs::write(&output_path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{api_page, detail_document, summary_document, MockSource};

    fn app(dir: &std::path::Path) -> Spacetraveling {
        Spacetraveling::new(dir).unwrap()
    }

    fn source() -> MockSource {
        MockSource::new(api_page(
            vec![summary_document("hooks", "2021-03-25T19:25:28+0000", "Como utilizar Hooks")],
            Some("t1"),
        ))
        .with_page(
            "t1",
            api_page(
                vec![summary_document("rust", "2021-03-20T10:00:00+0000", "Por que Rust")],
                None,
            ),
        )
        .with_document(detail_document("hooks"))
    }

    #[tokio::test]
    async fn test_generate_site() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let generator = Generator::new(&app).unwrap();

        let report = generator.generate(&source()).await.unwrap();
        assert_eq!(
            report,
            GenerateReport {
                listed: 1,
                posts: 1,
                missing: 1
            }
        );

        let index = fs::read_to_string(app.public_dir.join("index.html")).unwrap();
        assert!(index.contains("Posts | Spacetraveling"));
        assert!(index.contains("Como utilizar Hooks"));
        assert!(index.contains("<time>25 mar 2021</time>"));
        assert!(index.contains("Carregar mais posts"));
        // second page is not on the static listing
        assert!(!index.contains("Por que Rust"));

        let post = fs::read_to_string(generator.post_output_path("hooks")).unwrap();
        assert!(post.contains("<h1>Como utilizar Hooks</h1>"));
        assert!(post.contains("<span>1 min</span>"));
        assert!(post.contains("<strong>Nullam</strong>"));
        assert!(post.contains("<ul><li>mi ac</li>"));
        assert!(post.contains("tempor &lt;b&gt;eget&lt;/b&gt;"));
        assert!(post.contains(r#"og:url" content="http://localhost:4000/post/hooks/""#));

        // autoescaped; the browser decodes the entities
        assert!(index.contains(r#"data-url="&#x2F;api&#x2F;posts&#x2F;page&#x2F;2.json""#));
        let page: ListingPage = serde_json::from_str(
            &fs::read_to_string(app.public_dir.join("api/posts/page/2.json")).unwrap(),
        )
        .unwrap();
        assert!(page.html.contains("Por que Rust"));
        assert_eq!(page.next_page, None);
        assert_eq!(page.load_more_url, None);

        assert!(!generator.post_output_path("rust").exists());
        assert!(app.public_dir.join("404.html").exists());
        assert!(app.public_dir.join("images/logo.svg").exists());
    }

    #[tokio::test]
    async fn test_last_page_has_no_load_more() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&app(dir.path())).unwrap();

        let html = generator.render_index(&[], None).unwrap();
        assert!(!html.contains("Carregar mais posts"));
    }

    #[tokio::test]
    async fn test_render_views() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&app(dir.path())).unwrap();

        let loading = generator.render_post(&PostView::Loading).unwrap();
        assert!(loading.contains("Carregando..."));
        assert!(loading.contains(r#"http-equiv="refresh""#));

        let missing = generator
            .render_post(&PostView::NotFound("nope".to_string()))
            .unwrap();
        assert!(missing.contains("Post não encontrado"));
    }

    #[tokio::test]
    async fn test_fetch_post_rejects_unsafe_uid() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&app(dir.path())).unwrap();

        let view = generator.fetch_post(&source(), "../secret").await.unwrap();
        assert!(matches!(view, PostView::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unreachable_listing_page_falls_back_to_server() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let generator = Generator::new(&app).unwrap();
        let source = source()
            .with_page(
                "t1",
                api_page(
                    vec![summary_document("rust", "2021-03-20T10:00:00+0000", "Por que Rust")],
                    Some("t2"),
                ),
            )
            .failing("t2");

        assert_eq!(generator.generate_index(&source).await.unwrap(), 1);

        let page: ListingPage = serde_json::from_str(
            &fs::read_to_string(app.public_dir.join("api/posts/page/2.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(page.next_page.as_deref(), Some("t2"));
        assert_eq!(page.load_more_url.as_deref(), Some("/api/posts/more?next=t2"));
        assert!(!app.public_dir.join("api/posts/page/3.json").exists());
    }

    #[tokio::test]
    async fn test_deleted_post_page_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&app(dir.path())).unwrap();
        let path = generator.post_output_path("gone");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<h1>Old</h1>").unwrap();

        let view = generator.generate_post(&source(), "gone").await.unwrap();
        assert!(matches!(view, PostView::NotFound(_)));
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_touch_post_refreshes_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&app(dir.path())).unwrap();
        let path = generator.post_output_path("hooks");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<h1>Old</h1>").unwrap();
        let old = SystemTime::now() - std::time::Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        generator.touch_post("hooks").unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(modified.elapsed().unwrap().as_secs() < 60);
        assert_eq!(fs::read_to_string(&path).unwrap(), "<h1>Old</h1>");
    }
}
