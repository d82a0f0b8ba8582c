//! Remote snapshot source.

use crate::error::AircraftApiError;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

/// Snapshot source trait.
///
/// Defines the interface for fetching raw snapshot files.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch a snapshot file.
    ///
    /// Returns the response body as-is, whatever the response status.
    ///
    /// # Arguments
    ///
    /// * `url`: URL of the snapshot file
    async fn fetch(&self, url: &Url) -> Result<Bytes, AircraftApiError>;
}

/// HTTP snapshot source.
///
/// Implements [SnapshotSource] for HTTP. Redirects are followed.
#[derive(Debug)]
pub struct HttpSnapshotSource {
    reqwest_client: reqwest::Client,
}

impl HttpSnapshotSource {
    /// Create a new HTTP snapshot source.
    pub fn new() -> Self {
        Self {
            reqwest_client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpSnapshotSource {
    /// Create a default HTTP snapshot source.
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    #[tracing::instrument(level = "DEBUG", skip(self, url), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<Bytes, AircraftApiError> {
        let response = self.reqwest_client.get(url.as_str()).send().await?;
        // Error responses are stored like any other. Only transport failures abort a download.
        if !response.status().is_success() {
            tracing::warn!("Snapshot request returned status {}", response.status());
        }
        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    use axum::{
        http::{header, StatusCode},
        routing::get,
        Router,
    };

    fn source_router() -> Router {
        Router::new()
            .route("/snapshot", get(|| async { "snapshot" }))
            .route(
                "/missing",
                get(|| async { (StatusCode::NOT_FOUND, "no such snapshot") }),
            )
            .route(
                "/moved",
                get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/snapshot")]) }),
            )
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "server error") }),
            )
    }

    async fn fetch(path: &str) -> Result<Bytes, AircraftApiError> {
        let addr = test_utils::serve(source_router());
        let url = Url::parse(&format!("http://{addr}{path}")).unwrap();
        HttpSnapshotSource::new().fetch(&url).await
    }

    #[tokio::test]
    async fn fetch_ok() {
        assert_eq!(Bytes::from("snapshot"), fetch("/snapshot").await.unwrap());
    }

    #[tokio::test]
    async fn fetch_not_found_returns_body() {
        assert_eq!(
            Bytes::from("no such snapshot"),
            fetch("/missing").await.unwrap()
        );
    }

    #[tokio::test]
    async fn fetch_server_error_returns_body() {
        assert_eq!(Bytes::from("server error"), fetch("/broken").await.unwrap());
    }

    #[tokio::test]
    async fn fetch_follows_redirect() {
        assert_eq!(Bytes::from("snapshot"), fetch("/moved").await.unwrap());
    }

    #[tokio::test]
    async fn fetch_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/snapshot")).unwrap();
        let err = HttpSnapshotSource::new().fetch(&url).await.unwrap_err();
        assert!(
            matches!(err, AircraftApiError::SourceRequest(_)),
            "unexpected error {err}"
        );
    }
}
