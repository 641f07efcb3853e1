//! Named catalog collections listed by a JSON index.

use serde::Serialize;
use tracing::{info, warn};

use crate::source::{CatalogSource, Fetch, FetchError};

#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("Failed to fetch the collection index")]
    Fetch(#[from] FetchError),
    #[error("Collection index is not a JSON array of file names")]
    Index(#[from] serde_json::Error),
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct CollectionInfo {
    /// Human readable, e.g. `gps ops` for `gps-ops.txt`
    pub name: String,
    pub file: String,
    /// Accepted TLE records, 0 when the file couldn't be loaded
    pub count: usize,
}

impl CollectionInfo {
    pub fn source(&self, index: &CatalogSource) -> Option<CatalogSource> {
        index.sibling(&self.file).ok()
    }
}

pub fn display_name(file: &str) -> String {
    file.strip_suffix(".txt")
        .unwrap_or(file)
        .replace(['-', '_'], " ")
}

/// Fetch the index and count the records of every collection it lists, in index order.
///
/// A collection that fails to load is still listed, with a count of 0.
pub async fn load_collections<F: Fetch>(
    fetcher: &F,
    index: &CatalogSource,
) -> Result<Vec<CollectionInfo>, CollectionError> {
    let text = fetcher.fetch(index).await?;
    let files: Vec<String> = serde_json::from_str(&text)?;

    let mut collections = Vec::with_capacity(files.len());
    for file in files {
        let count = match index.sibling(&file) {
            Ok(source) => match fetcher.fetch(&source).await {
                Ok(text) => tleproto::parse_catalog(&text).accepted_count(),
                Err(e) => {
                    warn!(%file, err = %e, "Failed to load collection");
                    0
                }
            },
            Err(e) => {
                warn!(%file, err = %e, "Collection file name is not a valid path");
                0
            }
        };
        collections.push(CollectionInfo {
            name: display_name(&file),
            file,
            count,
        });
    }

    info!(%index, collections = collections.len(), "Loaded collection index");
    Ok(collections)
}
