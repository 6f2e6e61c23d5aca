//! Network boundary: requests, responses and the fetcher abstraction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};

use crate::error::Result;
use crate::key::canonical_url;

/// How a request interacts with intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Normal HTTP caching applies.
    #[default]
    Default,
    /// Bypass intermediate caches and force a fresh network read.
    Reload,
}

/// An outbound (or intercepted) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub cache_mode: CacheMode,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            cache_mode: CacheMode::Default,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// The key this request is stored under in a cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        canonical_url(&self.url)
    }
}

/// A response as returned by the network or replayed from a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Response {
    /// Creates a `200 OK` response.
    #[must_use]
    pub fn ok(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Abstraction over the network for testability.
///
/// A non-2xx response is still `Ok`; only transport failures are errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs the request and returns the full response.
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        (**self).fetch(request).await
    }
}

/// Builds a configured HTTP client for asset requests.
fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// Default fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    /// Creates a fetcher around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let url = request.cache_key();
        let mut builder = self.client.request(request.method.clone(), &url);
        if request.cache_mode == CacheMode::Reload {
            builder = builder
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        log::debug!("{} {} -> {status}", request.method, request.url);

        Ok(Response {
            url,
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns the raw request text.
    async fn serve_once(listener: TcpListener, reply: &'static str) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&buf).to_lowercase()
    }

    #[test]
    fn success_range() {
        assert!(Response::ok("u", "x").is_success());
        assert!(Response::ok("u", "x").with_status(204).is_success());
        assert!(!Response::ok("u", "x").with_status(304).is_success());
        assert!(!Response::ok("u", "x").with_status(500).is_success());
    }

    #[test]
    fn cache_key_ignores_fragment() {
        let req = Request::get("https://app.test/#/home");
        assert_eq!(req.cache_key(), "https://app.test/");
        assert_eq!(req.cache_mode, CacheMode::Default);
    }

    #[test]
    fn cache_key_bare_origin_matches_root() {
        assert_eq!(
            Request::get("https://app.test").cache_key(),
            Request::get("https://app.test/").cache_key()
        );
    }

    #[tokio::test]
    async fn http_fetcher_reads_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(
            listener,
            "HTTP/1.1 200 OK\r\nContent-Type: text/javascript\r\nContent-Length: 7\r\nConnection: close\r\n\r\nmain();",
        ));

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("http://{addr}/main.js");
        let response = fetcher.fetch(&Request::get(&url)).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.url, url);
        assert_eq!(response.content_type.as_deref(), Some("text/javascript"));
        assert_eq!(&response.body[..], b"main();");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("get /main.js"));
        assert!(!raw.contains("pragma: no-cache"));
    }

    #[tokio::test]
    async fn http_fetcher_reload_bypasses_caches() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(
            listener,
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ));

        let fetcher = HttpFetcher::new().unwrap();
        let request =
            Request::get(format!("http://{addr}/index.html")).with_cache_mode(CacheMode::Reload);
        let response = fetcher.fetch(&request).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());

        let raw = server.await.unwrap();
        assert!(raw.contains("cache-control: no-cache"));
        assert!(raw.contains("pragma: no-cache"));
    }

    #[tokio::test]
    async fn http_fetcher_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&Request::get(format!("http://{addr}/main.js")))
            .await
            .unwrap_err();
        assert!(err.is_network());
    }
}
