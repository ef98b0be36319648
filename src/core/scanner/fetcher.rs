// src/core/scanner/fetcher.rs

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveError;
use hickory_resolver::TokioAsyncResolver;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use std::error::Error as StdError;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::config::{FetcherConfig, ScanTarget, MAX_REDIRECTS};
use crate::core::error::{FetchError, ValidationError};
use crate::core::models::RawResponse;

/// Performs one bounded HTTP request for a target.
///
/// Implementations never retry: a failure is reported once and the caller
/// decides what to do with it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Sends one GET request for `target`.
    ///
    /// # Arguments
    /// * `target` - The URL plus its timeout and redirect options.
    ///
    /// # Returns
    /// The final URL, status code and headers, or the typed reason the
    /// request did not produce a response.
    async fn fetch(&self, target: &ScanTarget) -> Result<RawResponse, FetchError>;
}

/// A DNS failure raised by [`HickoryDns`]. Kept as a distinct type so it can
/// be picked out of the transport error chain.
#[derive(Debug, Error)]
#[error("failed to resolve {host}: {source}")]
struct DnsLookupError {
    host: String,
    #[source]
    source: ResolveError,
}

/// Resolves host names for reqwest through hickory.
struct HickoryDns {
    resolver: TokioAsyncResolver,
}

impl Resolve for HickoryDns {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.resolver.clone();
        Box::pin(async move {
            let host = name.as_str().to_string();
            debug!(host = %host, "Resolving host.");
            let lookup = resolver
                .lookup_ip(host.as_str())
                .await
                .map_err(|source| DnsLookupError { host: host.clone(), source })?;
            // The port is filled in by the connector.
            let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            debug!(host = %host, count = addrs.len(), "Host resolved.");
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<Addrs, Box<dyn StdError + Send + Sync>>(addrs)
        })
    }
}

/// The production fetcher: a GET request through reqwest.
///
/// Two clients are kept because the redirect policy is fixed per client:
/// one follows up to [`MAX_REDIRECTS`] hops, the other returns 3xx responses
/// as they are.
pub struct HttpFetcher {
    following: Client,
    direct: Client,
}

impl HttpFetcher {
    /// Builds both clients around the system DNS configuration.
    ///
    /// # Arguments
    /// * `config` - User-Agent and optional proxy shared by every request.
    ///
    /// # Returns
    /// The fetcher, or a `ValidationError` if the proxy URL is unusable or
    /// the TLS backend cannot be initialized.
    pub fn new(config: &FetcherConfig) -> Result<Self, ValidationError> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "System DNS configuration unavailable, using public resolvers.");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self::with_resolver(config, resolver)
    }

    fn with_resolver(config: &FetcherConfig, resolver: TokioAsyncResolver) -> Result<Self, ValidationError> {
        let dns = Arc::new(HickoryDns { resolver });
        Ok(Self {
            following: build_client(config, Policy::limited(MAX_REDIRECTS), dns.clone())?,
            direct: build_client(config, Policy::none(), dns)?,
        })
    }
}

fn build_client(config: &FetcherConfig, redirect: Policy, dns: Arc<HickoryDns>) -> Result<Client, ValidationError> {
    let mut builder = Client::builder().user_agent(config.user_agent.as_str()).redirect(redirect).dns_resolver(dns);

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy.as_str())
            .map_err(|e| ValidationError::InvalidProxy { proxy: proxy.clone(), reason: e.to_string() })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| {
        error!(error = %e, "Failed to build HTTP client.");
        ValidationError::HttpClient(e.to_string())
    })
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &ScanTarget) -> Result<RawResponse, FetchError> {
        let url = Url::parse(target.url())
            .map_err(|e| FetchError::InvalidUrl { url: target.url().to_string(), reason: e.to_string() })?;
        let options = target.options();
        let client = if options.follow_redirects { &self.following } else { &self.direct };

        info!(url = %url, follow_redirects = options.follow_redirects, "Sending request.");
        let request = client.get(url.clone()).timeout(options.timeout).send();

        // The outer bound also covers DNS and proxy negotiation.
        let response = match tokio::time::timeout(options.timeout, request).await {
            Err(_) => {
                error!(url = %url, "Request timed out.");
                return Err(FetchError::Timeout { after: options.timeout });
            }
            Ok(Err(e)) => {
                let err = classify(&e, &url, options.timeout);
                error!(url = %url, error = %err, "Request failed.");
                return Err(err);
            }
            Ok(Ok(response)) => response,
        };

        info!(url = %url, status = %response.status(), final_url = %response.url(), "Received HTTP response.");
        Ok(RawResponse {
            final_url: response.url().to_string(),
            status: response.status().as_u16(),
            headers: response.headers().clone(),
        })
    }
}

/// Maps a reqwest failure onto the typed error classes.
fn classify(err: &reqwest::Error, url: &Url, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout { after: timeout };
    }
    if err.is_redirect() {
        return FetchError::TooManyRedirects { limit: MAX_REDIRECTS };
    }
    if err.is_builder() {
        return FetchError::InvalidUrl { url: url.to_string(), reason: error_chain(err) };
    }

    let mut handshake_failed = false;
    let causes = std::iter::successors(Some(err as &(dyn StdError + 'static)), |&e| e.source());
    for cause in causes {
        if let Some(dns) = cause.downcast_ref::<DnsLookupError>() {
            return FetchError::DnsResolutionFailed { host: dns.host.clone(), reason: dns.source.to_string() };
        }
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            match io.kind() {
                io::ErrorKind::ConnectionRefused => {
                    let endpoint = format!(
                        "{}:{}",
                        url.host_str().unwrap_or_default(),
                        url.port_or_known_default().unwrap_or_default()
                    );
                    return FetchError::ConnectionRefused(endpoint);
                }
                io::ErrorKind::TimedOut => return FetchError::Timeout { after: timeout },
                // rustls reports handshake failures as these kinds.
                io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => handshake_failed = true,
                _ => {}
            }
        }
    }

    // reqwest's own message carries the URL; only its causes are inspected.
    let message = err.source().map(error_chain).unwrap_or_else(|| err.to_string());
    let lower = message.to_ascii_lowercase();
    let tls_connect = url.scheme() == "https" && err.is_connect();
    if tls_connect && (handshake_failed || ["certificate", "tls", "ssl", "handshake"].iter().any(|k| lower.contains(k))) {
        FetchError::TlsError(message)
    } else if lower.contains("dns error") {
        FetchError::DnsResolutionFailed { host: url.host_str().unwrap_or_default().to_string(), reason: message }
    } else {
        FetchError::Transport(message)
    }
}

/// Joins an error and its sources into one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        let text = e.to_string();
        // Wrappers often repeat their source's message verbatim.
        if parts.last().is_none_or(|last| !last.contains(&text)) {
            parts.push(text);
        }
        current = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScanOptions;
    use hickory_resolver::config::NameServerConfigGroup;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves canned responses on 127.0.0.1. The handler maps a request path
    /// to a raw HTTP response; `None` keeps the connection open without
    /// answering.
    async fn serve(handler: fn(&str, u16) -> Option<String>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut read = 0;
                    while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf[read..]).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => read += n,
                        }
                    }
                    let request = String::from_utf8_lossy(&buf[..read]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    match handler(&path, port) {
                        Some(response) => {
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                        None => tokio::time::sleep(Duration::from_secs(30)).await,
                    }
                });
            }
        });
        port
    }

    fn routes(path: &str, port: u16) -> Option<String> {
        match path {
            "/ok" => Some(
                "HTTP/1.1 200 OK\r\nX-Frame-Options: DENY\r\ncontent-security-policy: default-src 'self'\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    .to_string(),
            ),
            "/moved" => Some(format!(
                "HTTP/1.1 302 Found\r\nLocation: http://127.0.0.1:{port}/ok\r\nX-Content-Type-Options: nosniff\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )),
            "/loop" => Some(format!(
                "HTTP/1.1 302 Found\r\nLocation: http://127.0.0.1:{port}/loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )),
            "/silent" => None,
            "/tls-settings" | "/ssl/login" => Some(String::new()),
            _ => Some("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()),
        }
    }

    fn target(port: u16, path: &str, follow_redirects: bool, timeout_secs: u64) -> ScanTarget {
        let options = ScanOptions::new(timeout_secs, follow_redirects, false).unwrap();
        ScanTarget::new(&format!("http://127.0.0.1:{port}{path}"), options).unwrap()
    }

    #[tokio::test]
    async fn captures_status_and_headers() {
        let port = serve(routes).await;
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();

        let response = fetcher.fetch(&target(port, "/ok", true, 5)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("x-frame-options").unwrap(), "DENY");
        assert!(response.headers.contains_key("Content-Security-Policy"));
    }

    #[tokio::test]
    async fn redirect_is_terminal_when_not_following() {
        let port = serve(routes).await;
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();

        let response = fetcher.fetch(&target(port, "/moved", false, 5)).await.unwrap();
        assert_eq!(response.status, 302);
        assert!(response.headers.contains_key("x-content-type-options"));
        assert!(response.final_url.ends_with("/moved"));
    }

    #[tokio::test]
    async fn redirect_is_followed_when_enabled() {
        let port = serve(routes).await;
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();

        let response = fetcher.fetch(&target(port, "/moved", true, 5)).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.final_url.ends_with("/ok"));
        assert!(response.headers.contains_key("x-frame-options"));
    }

    #[tokio::test]
    async fn redirect_loop_hits_the_cap() {
        let port = serve(routes).await;
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();

        let err = fetcher.fetch(&target(port, "/loop", true, 5)).await.unwrap_err();
        assert_eq!(err, FetchError::TooManyRedirects { limit: MAX_REDIRECTS });
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let port = serve(routes).await;
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();

        let err = fetcher.fetch(&target(port, "/silent", true, 1)).await.unwrap_err();
        assert_eq!(err, FetchError::Timeout { after: Duration::from_secs(1) });
    }

    #[tokio::test]
    async fn closed_port_is_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();

        let err = fetcher.fetch(&target(port, "/", true, 5)).await.unwrap_err();
        assert!(matches!(err, FetchError::ConnectionRefused(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn hang_up_over_plain_http_is_transport() {
        let port = serve(routes).await;
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();

        for path in ["/tls-settings", "/ssl/login"] {
            let err = fetcher.fetch(&target(port, path, true, 5)).await.unwrap_err();
            let FetchError::Transport(message) = &err else { panic!("{path}: got {err:?}") };
            assert!(!message.contains(path), "{message}");
        }
    }

    #[tokio::test]
    async fn https_against_plain_listener_is_tls_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else { return };
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n").await;
            // Hold the socket until the client gives up on the handshake.
            while socket.read(&mut buf).await.is_ok_and(|n| n > 0) {}
        });
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();
        let options = ScanOptions::new(5, true, false).unwrap();
        let target = ScanTarget::new(&format!("https://127.0.0.1:{port}/"), options).unwrap();

        let err = fetcher.fetch(&target).await.unwrap_err();
        assert!(matches!(err, FetchError::TlsError(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unresolvable_host_is_dns_failure() {
        let config = ResolverConfig::from_parts(None, vec![], NameServerConfigGroup::new());
        let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());
        let fetcher = HttpFetcher::with_resolver(&FetcherConfig::default(), resolver).unwrap();
        let options = ScanOptions::new(5, true, false).unwrap();
        let target = ScanTarget::new("http://nonexistent.invalid/", options).unwrap();

        let err = fetcher.fetch(&target).await.unwrap_err();
        let FetchError::DnsResolutionFailed { host, .. } = &err else { panic!("got {err:?}") };
        assert_eq!(host, "nonexistent.invalid");
    }

    #[tokio::test]
    async fn bad_proxy_is_rejected_up_front() {
        let config = FetcherConfig { proxy: Some("not a proxy url".to_string()), ..FetcherConfig::default() };
        assert!(matches!(HttpFetcher::new(&config), Err(ValidationError::InvalidProxy { .. })));
    }
}
