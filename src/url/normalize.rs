use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a URL string into its canonical page identity
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https` schemes
/// 3. Require a host
/// 4. Remove the fragment (everything after `#`)
///
/// Everything else (host case, default ports, empty paths) is left to the
/// `url` crate's own WHATWG normalization, so `http://Example.COM` becomes
/// `http://example.com/`. No query parameters are dropped or reordered.
///
/// # Examples
///
/// ```
/// use sitegraph::url::canonicalize;
///
/// let url = canonicalize("http://Example.com/docs?page=2#intro").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs?page=2");
/// ```
pub fn canonicalize(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(strip_fragment(url))
}

/// Removes the fragment component from an already-parsed URL
pub fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}
