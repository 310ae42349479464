//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests returning raw body bytes
//! - Error classification

use crate::config::Config;
use crate::url::same_host;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed for one request
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    /// Raw, undecoded response body
    pub body: Vec<u8>,
}

/// Errors reaching a URL
///
/// The crawler treats every variant the same way (record and move on); the
/// variants exist for logs and stored error messages.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status_code} for {url}")]
    Status { url: String, status_code: u16 },

    #[error("Request failed for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Redirect not followed for {url}: {message}")]
    Redirect { url: String, message: String },
}

impl FetchError {
    /// The URL the failed request was for
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Status { url, .. }
            | Self::Transport { url, .. }
            | Self::Body { url, .. }
            | Self::Redirect { url, .. } => url,
        }
    }

    /// Returns true for failures below HTTP (DNS, connect, timeout, I/O)
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::Status { .. } | Self::Redirect { .. })
    }

    fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_redirect() {
            Self::Redirect {
                url,
                message: error_chain(&error),
            }
        } else if error.is_connect() {
            Self::Connect {
                url,
                message: error.to_string(),
            }
        } else {
            Self::Transport {
                url,
                message: error.to_string(),
            }
        }
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Redirect policy: at most `MAX_REDIRECTS` hops, never leaving the host of
/// the original request
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
        }

        let leaves_host = attempt
            .previous()
            .first()
            .map_or(false, |origin| !same_host(origin, attempt.url()));
        if leaves_host {
            let message = format!("redirect to another host: {}", attempt.url());
            return attempt.error(message);
        }

        attempt.follow()
    })
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and timeout)
///
/// # Example
///
/// ```no_run
/// use sitegraph::config::Config;
/// use sitegraph::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.crawler.fetch_timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(redirect_policy())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs page fetches for the crawler
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with a client built from the configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a URL and returns its raw body
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Ok(FetchedPage)` |
    /// | Non-2xx after redirects | `FetchError::Status` |
    /// | Redirect off the host, or too many | `FetchError::Redirect` |
    /// | Timeout (connect or total) | `FetchError::Timeout` |
    /// | DNS / connection refused / TLS | `FetchError::Connect` |
    /// | Other request failure | `FetchError::Transport` |
    /// | Body read failure | `FetchError::Body` or `Timeout` |
    ///
    /// The body is returned undecoded; charset detection happens during
    /// content extraction.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status_code: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_with_timeout(secs: u64) -> Fetcher {
        let mut config = Config::default();
        config.crawler.fetch_timeout_secs = secs;
        Fetcher::new(&config).unwrap()
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&Config::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success_returns_raw_bytes() {
        let server = MockServer::start().await;
        let body = vec![0x3c, 0x70, 0x3e, 0xe9, 0x3c, 0x2f, 0x70, 0x3e]; // <p>\xe9</p>
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), "text/html"))
            .mount(&server)
            .await;

        let page = fetcher_with_timeout(5)
            .fetch(&url(&server, "/page"))
            .await
            .unwrap();

        assert_eq!(page.status_code, 200);
        assert_eq!(page.body, body);
        assert_eq!(page.content_type.as_deref(), Some("text/html"));
        assert_eq!(page.final_url.path(), "/page");
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "UaBot/9.9"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.user_agent.crawler_name = "UaBot".to_string();
        config.user_agent.crawler_version = "9.9".to_string();
        let fetcher = Fetcher::new(&config).unwrap();

        assert!(fetcher.fetch(&url(&server, "/")).await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = fetcher_with_timeout(5)
            .fetch(&url(&server, "/broken"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status_code: 500, .. }));
        assert!(!err.is_transport());
        assert!(err.url().ends_with("/broken"));
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start().await;

        let err = fetcher_with_timeout(5)
            .fetch(&url(&server, "/missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status_code: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = fetcher_with_timeout(1)
            .fetch(&url(&server, "/slow"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout { .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind and release a port so nothing is listening on it
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();

        let err = fetcher_with_timeout(2).fetch(&target).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>moved</p>", "text/html"))
            .mount(&server)
            .await;

        let page = fetcher_with_timeout(5)
            .fetch(&url(&server, "/old"))
            .await
            .unwrap();
        assert_eq!(page.final_url.path(), "/new");
    }

    #[tokio::test]
    async fn test_redirect_to_other_host_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/away"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "http://other-host.invalid/landing"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher_with_timeout(5)
            .fetch(&url(&server, "/away"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Redirect { .. }), "{:?}", err);
        assert!(!err.is_transport());
        assert!(err.url().ends_with("/away"));
        assert!(err.to_string().contains("other-host.invalid"), "{}", err);
    }

    #[tokio::test]
    async fn test_redirect_loop_stops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&server)
            .await;

        let err = fetcher_with_timeout(5)
            .fetch(&url(&server, "/loop"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Redirect { .. }), "{:?}", err);
    }
}
