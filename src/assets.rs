//! Image and favicon selection.
//!
//! Asset problems are never fatal: a favicon or image that cannot be resolved
//! is left out of the result instead of failing the summary.

use crate::extractor::ImageRef;
use tracing::debug;
use url::Url;

/// Images narrower than this are usually icons, spacers or tracking pixels
pub const DEFAULT_MIN_IMAGE_WIDTH: u32 = 100;

/// Number of representative images kept per summary
pub const DEFAULT_MAX_IMAGES: usize = 2;

/// Keep the first `max_count` images that pass the width filter.
///
/// An image without a declared width cannot be judged and is kept. Document
/// order is preserved.
pub fn select_images(candidates: &[ImageRef], min_width: u32, max_count: usize) -> Vec<ImageRef> {
    candidates
        .iter()
        .filter(|image| image.width.map_or(true, |width| width >= min_width))
        .take(max_count)
        .cloned()
        .collect()
}

/// Resolve a favicon `href` against the page URL.
///
/// Returns `None` for anything that does not resolve to an http(s) URL.
pub fn resolve_favicon(base_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    match base_url.join(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            debug!("ignoring favicon with scheme {}", url.scheme());
            None
        }
        Err(e) => {
            debug!("ignoring malformed favicon href {href:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(n: usize, width: Option<u32>) -> ImageRef {
        ImageRef {
            url: Url::parse(&format!("https://example.com/{n}.png")).unwrap(),
            width,
        }
    }

    fn widths(images: &[ImageRef]) -> Vec<Option<u32>> {
        images.iter().map(|img| img.width).collect()
    }

    #[test]
    fn picks_first_two_wide_enough_in_document_order() {
        let candidates: Vec<_> = [50, 150, 80, 200, 300]
            .into_iter()
            .enumerate()
            .map(|(n, w)| image(n, Some(w)))
            .collect();

        let selected = select_images(&candidates, DEFAULT_MIN_IMAGE_WIDTH, DEFAULT_MAX_IMAGES);
        assert_eq!(widths(&selected), vec![Some(150), Some(200)]);
        assert_eq!(selected[0].url.as_str(), "https://example.com/1.png");
    }

    #[test]
    fn undeclared_width_passes() {
        let candidates = vec![image(0, None), image(1, Some(10)), image(2, Some(100))];
        let selected = select_images(&candidates, 100, 2);
        assert_eq!(widths(&selected), vec![None, Some(100)]);
    }

    #[test]
    fn never_exceeds_cap_and_never_returns_narrow_images() {
        let candidates: Vec<_> = (0..40u32).map(|n| image(n as usize, Some(n * 7))).collect();
        for cap in 0..4 {
            let selected = select_images(&candidates, 100, cap);
            assert!(selected.len() <= cap);
            assert!(selected.iter().all(|img| img.width.map_or(true, |w| w >= 100)));
        }
        assert!(select_images(&[], 100, 2).is_empty());
    }

    #[test]
    fn favicon_resolution_is_non_fatal() {
        let base = Url::parse("https://example.com/a/b").unwrap();
        assert_eq!(
            resolve_favicon(&base, "icon.png").unwrap().as_str(),
            "https://example.com/a/icon.png"
        );
        assert_eq!(
            resolve_favicon(&base, "//static.example.com/f.ico").unwrap().as_str(),
            "https://static.example.com/f.ico"
        );
        assert!(resolve_favicon(&base, "data:image/x-icon;base64,AAAA").is_none());
        assert!(resolve_favicon(&base, "http://[::1").is_none());
        assert!(resolve_favicon(&base, "   ").is_none());
    }
}
