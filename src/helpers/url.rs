//! URL helper functions

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::config::SiteConfig;
use crate::content::LinkData;

/// Unreserved characters (RFC 3986) stay as they are
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Path of the "load more" endpoint served by the preview server
pub const LOAD_MORE_PATH: &str = "api/posts/more";

/// Directory of the pre-rendered listing pages
pub const LISTING_PAGES_DIR: &str = "api/posts/page";

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hello/") // -> "/blog/post/hello/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/post/hello/") // -> "https://example.com/blog/post/hello/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Site-relative path of a post page
pub fn post_path(uid: &str) -> String {
    format!("post/{}/", encode_url(uid))
}

/// URL the "load more" control calls for the given page token
pub fn load_more_url(config: &SiteConfig, next_page: &str) -> String {
    format!(
        "{}?next={}",
        url_for(config, LOAD_MORE_PATH),
        encode_url(next_page)
    )
}

/// Site-relative path of the pre-rendered listing page `page` (the home
/// page is page 1)
pub fn listing_page_path(page: usize) -> String {
    format!("{}/{}.json", LISTING_PAGES_DIR, page)
}

/// Whether a uid can be used as a directory name under `post/`
pub fn is_safe_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Resolve a rich-text link to an href.
///
/// Links to documents of the blog's post type point at the generated post
/// page; other document links fall back to the home page.
pub fn resolve_link(config: &SiteConfig, link: &LinkData) -> Option<String> {
    if link.link_type == "Document" {
        let href = match (link.uid.as_deref(), link.doc_type.as_deref()) {
            (Some(uid), Some(doc_type)) if doc_type == config.api.document_type => {
                url_for(config, &post_path(uid))
            }
            _ => url_for(config, "/"),
        };
        return Some(href);
    }
    link.url.clone()
}

/// Percent-encode a path segment or query value
pub fn encode_url(path: &str) -> String {
    percent_encoding::utf8_percent_encode(path, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.url = "https://example.com".to_string();
        config.root = "/blog/".to_string();
        config
    }

    fn link(link_type: &str, url: Option<&str>, uid: Option<&str>, doc_type: Option<&str>) -> LinkData {
        LinkData {
            link_type: link_type.to_string(),
            url: url.map(String::from),
            uid: uid.map(String::from),
            doc_type: doc_type.map(String::from),
            target: None,
        }
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/images/logo.svg"), "/blog/images/logo.svg");
        assert_eq!(url_for(&config, "post/a/"), "/blog/post/a/");
        assert_eq!(url_for(&config, ""), "/blog/");
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/post/a/"),
            "https://example.com/blog/post/a/"
        );
    }

    #[test]
    fn test_load_more_url_encodes_token() {
        let config = SiteConfig::default();
        assert_eq!(
            load_more_url(&config, "https://x.io/api?page=2&ref=a"),
            "/api/posts/more?next=https%3A%2F%2Fx.io%2Fapi%3Fpage%3D2%26ref%3Da"
        );
    }

    #[test]
    fn test_listing_page_path() {
        let config = test_config();
        assert_eq!(listing_page_path(2), "api/posts/page/2.json");
        assert_eq!(
            url_for(&config, &listing_page_path(3)),
            "/blog/api/posts/page/3.json"
        );
    }

    #[test]
    fn test_post_path() {
        assert_eq!(post_path("como-utilizar-hooks"), "post/como-utilizar-hooks/");
        assert_eq!(post_path("a b"), "post/a%20b/");
    }

    #[test]
    fn test_is_safe_uid() {
        assert!(is_safe_uid("como-utilizar-hooks"));
        assert!(is_safe_uid("post_2"));
        assert!(!is_safe_uid(""));
        assert!(!is_safe_uid("../etc"));
        assert!(!is_safe_uid("a/b"));
    }

    #[test]
    fn test_resolve_link() {
        let config = test_config();
        assert_eq!(
            resolve_link(&config, &link("Web", Some("https://rust-lang.org"), None, None)),
            Some("https://rust-lang.org".to_string())
        );
        assert_eq!(
            resolve_link(&config, &link("Document", None, Some("hooks"), Some("post"))),
            Some("/blog/post/hooks/".to_string())
        );
        assert_eq!(
            resolve_link(&config, &link("Document", None, Some("about"), Some("page"))),
            Some("/blog/".to_string())
        );
        assert_eq!(resolve_link(&config, &link("Any", None, None, None)), None);
    }
}
