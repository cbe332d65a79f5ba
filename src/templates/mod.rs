//! Built-in templates using the Tera template engine
//!
//! All templates are embedded directly in the binary.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Logo referenced by the header
pub const LOGO_SVG: &str = include_str!("spacetraveling/logo.svg");

/// Template renderer with the embedded blog theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // CMS text is untrusted; pre-rendered HTML is marked `safe` in the templates
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("loading.html", include_str!("spacetraveling/loading.html")),
            ("not_found.html", include_str!("spacetraveling/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/post_cards.html",
                include_str!("spacetraveling/partials/post_cards.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub language: String,
    pub root: String,
    pub logo_url: String,
}

/// A post in the listing
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
}

/// A fully rendered post page
#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub date: String,
    pub datetime: String,
    pub reading_time: usize,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConfigData {
        ConfigData {
            title: "Spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            root: "/".to_string(),
            logo_url: "/images/logo.svg".to_string(),
        }
    }

    #[test]
    fn test_header_links_home() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("config", &config());
        context.insert("generator_tag", "");

        let html = renderer.render("not_found.html", &context).unwrap();
        assert!(html.contains(r#"<header class="header-container">"#));
        assert!(html.contains(r#"alt="logo""#));
        assert!(html.contains("Post não encontrado"));
    }

    #[test]
    fn test_cms_text_is_escaped() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert(
            "posts",
            &vec![PostCard {
                path: "/post/x/".to_string(),
                title: "<script>alert(1)</script>".to_string(),
                subtitle: String::new(),
                author: "Ana & Bia".to_string(),
                date: "25 mar 2021".to_string(),
            }],
        );

        let html = renderer.render("partials/post_cards.html", &context).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Ana &amp; Bia"));
    }
}
