//! HTML to [`PageContent`] extraction.
//!
//! Uses scraper for HTML parsing. Parsing is error-recovering, so extraction
//! never fails: a page with nothing readable simply yields empty `text` and
//! the pipeline decides what that means.

use crate::assets::resolve_favicon;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use url::Url;

/// Default cap on extracted text, in characters
pub const DEFAULT_MAX_TEXT_CHARS: usize = 8_000;

/// Elements whose contents never count as page text
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "header", "footer",
    "aside", "form", "input", "button", "select", "head",
];

/// Elements that start a new line of text when rendered
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "caption", "dd", "div", "dl", "dt", "figcaption",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Conventional favicon location when the page declares none
const FALLBACK_FAVICON: &str = "/favicon.ico";

/// An image referenced by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: Url,
    /// Declared `width` attribute in pixels, if any
    pub width: Option<u32>,
}

/// Normalised representation of a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub url: Url,
    /// Page title, empty when the page has none
    pub title: String,
    /// Visible text with whitespace collapsed, never markup
    pub text: String,
    /// Image candidates in document order
    pub images: Vec<ImageRef>,
    pub favicon: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    max_text_chars: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TEXT_CHARS)
    }
}

impl Extractor {
    pub fn new(max_text_chars: usize) -> Self {
        Self { max_text_chars }
    }

    /// Parse `html` and pull out title, text, images and favicon.
    ///
    /// Relative references are resolved against `base_url`, which should be
    /// the final URL after redirects.
    pub fn extract(&self, html: &str, base_url: &Url) -> PageContent {
        let document = Html::parse_document(html);

        let text = extract_text(&document);
        let text = truncate_chars(&text, self.max_text_chars);

        PageContent {
            url: base_url.clone(),
            title: extract_title(&document),
            text,
            images: extract_images(&document, base_url),
            favicon: extract_favicon(&document, base_url),
        }
    }
}

/// Keep at most `max` characters, cutting on a char boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the page title from the document <title> or the first <h1>
fn extract_title(document: &Html) -> String {
    // a bare "title" would also match <title> inside inline svg
    ["head > title", "h1"]
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .next()
                .map(|element| collapse_whitespace(&element.text().collect::<String>()))
                .filter(|title| !title.is_empty())
        })
        .unwrap_or_default()
}

fn is_boilerplate(element: &Element) -> bool {
    BOILERPLATE_TAGS.contains(&element.name())
        || element.attr("hidden").is_some()
        || element.attr("aria-hidden") == Some("true")
}

/// Visible text of <body> (or the whole document) in document order
fn extract_text(document: &Html) -> String {
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    // explicit stack, deeply nested markup must not blow the call stack.
    // `None` marks the end of a block element.
    let mut stack: Vec<_> = body.children().rev().map(Some).collect();
    while let Some(entry) = stack.pop() {
        let Some(node) = entry else {
            raw.push(' ');
            continue;
        };
        match node.value() {
            Node::Text(text) => raw.push_str(&text.text),
            Node::Element(element) if !is_boilerplate(element) => {
                if BLOCK_TAGS.contains(&element.name()) {
                    raw.push(' ');
                    stack.push(None);
                }
                stack.extend(node.children().rev().map(Some));
            }
            _ => {}
        }
    }

    collapse_whitespace(&raw)
}

/// Read a `width` attribute the way browsers read dimension values: the
/// leading integer counts, whatever follows it. Percentages are relative to
/// the layout and give no pixel width.
fn parse_width(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.ends_with('%') {
        return None;
    }
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let digits = &value[..end];
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<ImageRef> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|img| {
            let element = img.value();
            let src = element
                .attr("src")
                .filter(|src| !src.trim().is_empty())
                .or_else(|| element.attr("data-src"))?;
            let url = base_url.join(src.trim()).ok()?;
            if !matches!(url.scheme(), "http" | "https") {
                return None;
            }
            Some(ImageRef {
                url,
                width: element.attr("width").and_then(parse_width),
            })
        })
        .collect()
}

fn has_icon_rel(link: &ElementRef<'_>) -> bool {
    link.value()
        .attr("rel")
        .map(|rel| rel.split_whitespace().any(|token| token.eq_ignore_ascii_case("icon")))
        .unwrap_or(false)
}

fn extract_favicon(document: &Html, base_url: &Url) -> Option<Url> {
    let declared = Selector::parse("link[rel][href]").ok().and_then(|selector| {
        document
            .select(&selector)
            .filter(has_icon_rel)
            .find_map(|link| link.value().attr("href"))
            .map(str::to_string)
    });

    match declared {
        Some(href) => resolve_favicon(base_url, &href),
        None => resolve_favicon(base_url, FALLBACK_FAVICON),
    }
}
