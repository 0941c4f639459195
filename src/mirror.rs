//! HTTP access to the mirror's directory listings.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tokio_util::sync::CancellationToken;

use crate::config::{DuplicatePolicy, MirrorConfig};
use crate::error::{Error, Result};
use crate::listing::{RemoteDirEntry, RemoteIndex, build_index, parse_listing};

/// Builds the HTTP client used for listings and downloads.
///
/// Every request carries the configured `User-Agent` and `Accept` headers.
/// No timeouts are set.
///
/// # Errors
///
/// Returns [`Error::Config`] if a header value is not valid, or
/// [`Error::Http`] if the client cannot be built.
pub fn build_http_client(config: &MirrorConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|e| Error::Config(format!("user_agent: {e}")))?,
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_str(&config.accept).map_err(|e| Error::Config(format!("accept: {e}")))?,
    );

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

/// Awaits `request` unless `cancel` fires first.
///
/// No request timeouts are configured, so every network await goes through
/// this to stay interruptible.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = request => result,
    }
}

/// Client for a Myrient-style file mirror.
#[derive(Debug, Clone)]
pub struct MirrorClient {
    http: reqwest::Client,
    base_url: String,
}

impl MirrorClient {
    /// Creates a client from mirror settings.
    ///
    /// # Errors
    ///
    /// See [`build_http_client`].
    pub fn new(config: &MirrorConfig) -> Result<Self> {
        Ok(Self::with_client(
            build_http_client(config)?,
            config.normalized_base_url(),
        ))
    }

    /// Creates a client around an existing HTTP client. `base_url` must end
    /// with `/`.
    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Returns the underlying HTTP client.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the mirror base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a path relative to the mirror root.
    #[must_use]
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}{relative}", self.base_url)
    }

    /// Fetches and parses the listing at `relative` (empty for the root).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on request failure or an error status,
    /// [`Error::Listing`] if the page is not a directory listing, and
    /// [`Error::Cancelled`] if `cancel` fires before the page has arrived.
    pub async fn fetch_listing(
        &self,
        relative: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RemoteDirEntry>> {
        let url = self.url_for(relative);
        log::debug!("Fetching listing {url}");
        let body = cancellable(cancel, self.get_text(&url)).await?;

        parse_listing(&body).map_err(|e| match e {
            Error::Listing(reason) => Error::Listing(format!("{url}: {reason}")),
            other => other,
        })
    }

    /// Lists a collection directory and indexes its files by base name.
    ///
    /// # Errors
    ///
    /// See [`fetch_listing`](Self::fetch_listing).
    pub async fn enumerate(
        &self,
        catalog_href: &str,
        collection_href: &str,
        policy: DuplicatePolicy,
        cancel: &CancellationToken,
    ) -> Result<RemoteIndex> {
        let relative = format!("{catalog_href}{collection_href}");
        let entries = self.fetch_listing(&relative, cancel).await?;
        let index = build_index(&entries, &self.url_for(&relative), policy);
        log::debug!(
            "Indexed {} of {} listing entries under {relative}",
            index.len(),
            entries.len()
        );
        Ok(index)
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        Ok(self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

/// Answers the n-th connection with `replies[n]` (the last entry for any
/// later one) after reading the request head, then holds the connection
/// open without sending anything more.
#[cfg(test)]
pub(crate) async fn stalling_server(
    replies: &'static [&'static [u8]],
) -> (String, tokio::task::JoinHandle<()>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            let reply = replies[held.len().min(replies.len() - 1)];
            let _ = socket.write_all(reply).await;
            let _ = socket.flush().await;
            held.push(socket);
        }
    });
    (url, handle)
}
