//! Structured rich text and its HTML rendering
//!
//! The CMS stores post bodies as a list of blocks (paragraphs, headings,
//! list items, images, embeds). Inline formatting is expressed as spans with
//! character offsets into the block text; spans may overlap, so rendering
//! re-opens tags where needed to keep the markup well nested.

use serde::Deserialize;

use crate::helpers::html_escape;

/// A rich-text field: an ordered sequence of blocks
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Block>);

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    #[serde(rename = "heading1")]
    Heading1(TextBlock),
    #[serde(rename = "heading2")]
    Heading2(TextBlock),
    #[serde(rename = "heading3")]
    Heading3(TextBlock),
    #[serde(rename = "heading4")]
    Heading4(TextBlock),
    #[serde(rename = "heading5")]
    Heading5(TextBlock),
    #[serde(rename = "heading6")]
    Heading6(TextBlock),
    #[serde(rename = "paragraph")]
    Paragraph(TextBlock),
    #[serde(rename = "preformatted")]
    Preformatted(TextBlock),
    #[serde(rename = "list-item")]
    ListItem(TextBlock),
    #[serde(rename = "o-list-item")]
    OrderedListItem(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
    #[serde(rename = "embed")]
    Embed(EmbedBlock),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageBlock {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedBlock {
    pub oembed: Oembed,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Oembed {
    pub html: Option<String>,
    pub embed_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub provider_name: Option<String>,
}

/// Inline formatting over `[start, end)` character offsets of a block's text
#[derive(Debug, Clone, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(flatten)]
    pub kind: SpanKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum SpanKind {
    #[serde(rename = "strong")]
    Strong,
    #[serde(rename = "em")]
    Em,
    #[serde(rename = "hyperlink")]
    Hyperlink { data: LinkData },
    #[serde(rename = "label")]
    Label { data: LabelData },
    #[serde(other)]
    Unsupported,
}

/// Target of a hyperlink span
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkData {
    /// `Web`, `Document` or `Media`
    #[serde(default)]
    pub link_type: String,
    pub url: Option<String>,
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelData {
    pub label: String,
}

impl Block {
    /// Text of the block, if it carries any
    pub fn text(&self) -> Option<&str> {
        self.text_block().map(|b| b.text.as_str())
    }

    fn text_block(&self) -> Option<&TextBlock> {
        match self {
            Block::Heading1(b)
            | Block::Heading2(b)
            | Block::Heading3(b)
            | Block::Heading4(b)
            | Block::Heading5(b)
            | Block::Heading6(b)
            | Block::Paragraph(b)
            | Block::Preformatted(b)
            | Block::ListItem(b)
            | Block::OrderedListItem(b) => Some(b),
            _ => None,
        }
    }

    fn list_tag(&self) -> Option<&'static str> {
        match self {
            Block::ListItem(_) => Some("ul"),
            Block::OrderedListItem(_) => Some("ol"),
            _ => None,
        }
    }
}

impl RichText {
    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    /// Plain text of all text blocks
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .filter_map(Block::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render to HTML; `resolve` maps hyperlink spans to an href
    pub fn as_html(&self, resolve: &dyn Fn(&LinkData) -> Option<String>) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for block in &self.0 {
            let list_tag = block.list_tag();
            if open_list != list_tag {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list_tag {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list_tag;
            }

            match block {
                Block::Heading1(b) => wrap(&mut html, "h1", b, resolve),
                Block::Heading2(b) => wrap(&mut html, "h2", b, resolve),
                Block::Heading3(b) => wrap(&mut html, "h3", b, resolve),
                Block::Heading4(b) => wrap(&mut html, "h4", b, resolve),
                Block::Heading5(b) => wrap(&mut html, "h5", b, resolve),
                Block::Heading6(b) => wrap(&mut html, "h6", b, resolve),
                Block::Paragraph(b) => wrap(&mut html, "p", b, resolve),
                Block::Preformatted(b) => wrap(&mut html, "pre", b, resolve),
                Block::ListItem(b) | Block::OrderedListItem(b) => wrap(&mut html, "li", b, resolve),
                Block::Image(image) => html.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    html_escape(&image.url),
                    html_escape(image.alt.as_deref().unwrap_or(""))
                )),
                Block::Embed(embed) => {
                    let oembed = &embed.oembed;
                    html.push_str(&format!(
                        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
                        html_escape(oembed.embed_url.as_deref().unwrap_or("")),
                        html_escape(oembed.kind.as_deref().unwrap_or("")),
                        html_escape(&oembed.provider_name.as_deref().unwrap_or("").to_lowercase()),
                        oembed.html.as_deref().unwrap_or("")
                    ))
                }
                Block::Unsupported => {}
            }
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        html
    }
}

fn wrap(
    html: &mut String,
    tag: &str,
    block: &TextBlock,
    resolve: &dyn Fn(&LinkData) -> Option<String>,
) {
    html.push_str(&format!("<{}>", tag));
    html.push_str(&render_spans(&block.text, &block.spans, resolve));
    html.push_str(&format!("</{}>", tag));
}

/// Render text with inline spans.
///
/// The text is cut at every span boundary. For each segment the covering
/// spans are ordered outermost first; tags are closed back to the longest
/// common prefix with what is currently open and the rest re-opened.
fn render_spans(
    text: &str,
    spans: &[Span],
    resolve: &dyn Fn(&LinkData) -> Option<String>,
) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut spans: Vec<&Span> = spans
        .iter()
        .filter(|s| !matches!(s.kind, SpanKind::Unsupported))
        .filter(|s| s.start < s.end.min(len))
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut boundaries: Vec<usize> = vec![0, len];
    for span in &spans {
        boundaries.push(span.start);
        boundaries.push(span.end.min(len));
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut out = String::new();
    let mut open: Vec<usize> = Vec::new();

    for window in boundaries.windows(2) {
        let (from, to) = (window[0], window[1]);
        let active: Vec<usize> = (0..spans.len())
            .filter(|&i| spans[i].start <= from && spans[i].end.min(len) >= to)
            .collect();

        let common = open
            .iter()
            .zip(&active)
            .take_while(|(a, b)| a == b)
            .count();
        for &i in open[common..].iter().rev() {
            out.push_str(close_tag(&spans[i].kind));
        }
        for &i in &active[common..] {
            out.push_str(&open_tag(&spans[i].kind, resolve));
        }
        open = active;

        let segment: String = chars[from..to].iter().collect();
        out.push_str(&html_escape(&segment).replace('\n', "<br />"));
    }

    for &i in open.iter().rev() {
        out.push_str(close_tag(&spans[i].kind));
    }

    out
}

fn open_tag(kind: &SpanKind, resolve: &dyn Fn(&LinkData) -> Option<String>) -> String {
    match kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink { data } => {
            let href = html_escape(&resolve(data).unwrap_or_default());
            match data.target.as_deref() {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener">"#,
                    href,
                    html_escape(target)
                ),
                None => format!(r#"<a href="{}">"#, href),
            }
        }
        SpanKind::Label { data } => format!(r#"<span class="{}">"#, html_escape(&data.label)),
        SpanKind::Unsupported => String::new(),
    }
}

fn close_tag(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink { .. } => "</a>",
        SpanKind::Label { .. } => "</span>",
        SpanKind::Unsupported => "",
    }
}
