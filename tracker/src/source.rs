//! Where catalog text comes from, and how it's fetched.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// A catalog text resource, either remote or on the local filesystem.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Deserialize)]
#[serde(try_from = "String")]
pub enum CatalogSource {
    Url(Url),
    Path(PathBuf),
}

impl CatalogSource {
    /// Resolve `file` relative to this source, e.g. a catalog listed in a collection index.
    pub fn sibling(&self, file: &str) -> Result<CatalogSource, url::ParseError> {
        match self {
            CatalogSource::Url(url) => Ok(CatalogSource::Url(url.join(file)?)),
            CatalogSource::Path(path) => Ok(CatalogSource::Path(match path.parent() {
                Some(dir) => dir.join(file),
                None => PathBuf::from(file),
            })),
        }
    }
}

impl FromStr for CatalogSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https" | "file") => {
                Ok(CatalogSource::Url(url))
            }
            _ => Ok(CatalogSource::Path(PathBuf::from(s))),
        }
    }
}

impl TryFrom<String> for CatalogSource {
    type Error = Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PathBuf> for CatalogSource {
    fn from(value: PathBuf) -> Self {
        CatalogSource::Path(value)
    }
}

impl From<Url> for CatalogSource {
    fn from(value: Url) -> Self {
        CatalogSource::Url(value)
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::Url(url) => write!(f, "{url}"),
            CatalogSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to '{url}' failed")]
    Http {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to '{url}' returned status {status}")]
    Status {
        url: Url,
        status: reqwest::StatusCode,
    },
    #[error("Failed to read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{0}' is not a local file URL")]
    InvalidFileUrl(Url),
    #[error("{0}")]
    Other(String),
}

/// Retrieves the raw text of a catalog source.
pub trait Fetch {
    fn fetch(
        &self,
        source: &CatalogSource,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetches over HTTP(S) or from the filesystem.
#[derive(Clone, Debug, Default)]
pub struct SourceFetcher {
    client: reqwest::Client,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_url(&self, url: &Url) -> Result<String, FetchError> {
        let http_err = |source| FetchError::Http {
            url: url.clone(),
            source,
        };
        let response = self
            .client
            .get(url.clone())
            // Catalogs are polled for changes, a cached copy defeats that
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }
        response.text().await.map_err(http_err)
    }

    async fn fetch_path(&self, path: PathBuf) -> Result<String, FetchError> {
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(source) => Err(FetchError::Io { path, source }),
        }
    }
}

impl Fetch for SourceFetcher {
    async fn fetch(&self, source: &CatalogSource) -> Result<String, FetchError> {
        debug!(%source, "Fetching catalog source");
        match source {
            CatalogSource::Url(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::InvalidFileUrl(url.clone()))?;
                self.fetch_path(path).await
            }
            CatalogSource::Url(url) => self.fetch_url(url).await,
            CatalogSource::Path(path) => self.fetch_path(path.clone()).await,
        }
    }
}

/// Serves canned responses keyed by source, for tests and offline demos.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: Mutex<HashMap<CatalogSource, Result<String, String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, source: impl Into<CatalogSource>, text: impl Into<String>) -> Self {
        self.set(source, text);
        self
    }

    pub fn set(&self, source: impl Into<CatalogSource>, text: impl Into<String>) {
        self.responses().insert(source.into(), Ok(text.into()));
    }

    /// Make subsequent fetches of `source` fail with `reason`.
    pub fn fail(&self, source: impl Into<CatalogSource>, reason: impl Into<String>) {
        self.responses().insert(source.into(), Err(reason.into()));
    }

    fn responses(&self) -> MutexGuard<'_, HashMap<CatalogSource, Result<String, String>>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Fetch for StaticFetcher {
    async fn fetch(&self, source: &CatalogSource) -> Result<String, FetchError> {
        match self.responses().get(source) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(reason)) => Err(FetchError::Other(reason.clone())),
            None => Err(FetchError::Other(format!("No response for '{source}'"))),
        }
    }
}

impl<T: Fetch> Fetch for std::sync::Arc<T> {
    fn fetch(
        &self,
        source: &CatalogSource,
    ) -> impl Future<Output = Result<String, FetchError>> + Send {
        (**self).fetch(source)
    }
}
