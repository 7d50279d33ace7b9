//! Where the registry document comes from.

use crate::error::Result;
use anyhow::Context;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A fetchable registry document.
///
/// Implementations only move bytes; parsing happens in [`super::Registry::from_slice`].
pub trait RegistrySource: Send + Sync + Debug {
    /// Human-readable origin for logs and errors.
    fn describe(&self) -> String;

    /// Fetch the raw registry document.
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<u8>>>;
}

/// Registry served over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl RegistrySource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Vec<u8>>> {
        async move {
            tracing::debug!("Fetching registry from {}", self.url);
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .with_context(|| format!("Request to {} failed", self.url))?
                .error_for_status()
                .with_context(|| format!("Registry at {} returned an error status", self.url))?;
            let body = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read response body from {}", self.url))?;
            Ok(body.to_vec())
        }
        .boxed()
    }
}

/// Registry read from a local JSON file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegistrySource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Vec<u8>>> {
        async move {
            tokio::fs::read(&self.path)
                .await
                .with_context(|| format!("Failed to read registry file {}", self.path.display()))
        }
        .boxed()
    }
}

/// Registry held in memory.
#[derive(Debug, Clone)]
pub struct StaticSource {
    label: String,
    document: Arc<[u8]>,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, document: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            document: Arc::from(document.into()),
        }
    }
}

impl RegistrySource for StaticSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn fetch(&self) -> BoxFuture<'_, Result<Vec<u8>>> {
        let document = self.document.to_vec();
        async move { Ok(document) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[tokio::test]
    async fn test_file_source_reads_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extensions.json");
        std::fs::write(&path, b"{}").unwrap();

        let source = FileSource::new(&path);
        check!(source.fetch().await.unwrap() == b"{}");
        check!(source.describe().ends_with("extensions.json"));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileSource::new("/nonexistent/extensions.json");
        let error = source.fetch().await.unwrap_err();
        check!(format!("{:#}", error).contains("Failed to read registry file"));
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticSource::new("fixture", r#"{"a": {}}"#);
        check!(source.fetch().await.unwrap() == br#"{"a": {}}"#);
        check!(source.describe() == "fixture");
    }
}
