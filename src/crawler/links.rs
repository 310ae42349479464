//! Same-host link extraction

use crate::url::{same_host, strip_fragment};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Maximum number of distinct links kept per page
pub const MAX_LINKS_PER_PAGE: usize = 100;

/// Extracts the distinct same-host links of a document
///
/// # Link Extraction Rules
///
/// For every `<a href>` in document order:
/// - Resolve the href against `base_url`
/// - Keep only `http`/`https` results on exactly the same host as `base_url`
/// - Strip the fragment
/// - Drop links back to `base_url` itself
///
/// Duplicates are removed and extraction stops once `MAX_LINKS_PER_PAGE`
/// distinct links have been collected. Schemes such as `javascript:` and
/// `mailto:` fall out at the scheme check.
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use sitegraph::crawler::extract_links;
/// use url::Url;
///
/// let html = Html::parse_document(
///     r#"<a href="/a">A</a><a href="/a#top">A again</a><a href="https://other.com/">x</a>"#,
/// );
/// let base = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(&html, &base);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://example.com/a");
/// ```
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let base = strip_fragment(base_url.clone());
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if links.len() >= MAX_LINKS_PER_PAGE {
            break;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(link) = resolve_link(href, &base) else {
            continue;
        };

        if seen.insert(link.as_str().to_string()) {
            links.push(link);
        }
    }

    links
}

/// Resolves one href, returning None if it should not be followed
fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let resolved = base.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    if !same_host(&resolved, base) {
        return None;
    }

    let resolved = strip_fragment(resolved);
    if resolved == *base {
        return None;
    }

    Some(resolved)
}
