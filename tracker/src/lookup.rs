//! Element set lookup of a single object by catalog number.

use sattypes::prelude::*;
use tracing::debug;
use url::Url;

use crate::source::{CatalogSource, Fetch, FetchError};

pub const CELESTRAK_GP_URL: &str = "https://celestrak.org/NORAD/elements/gp.php";

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("'{0}' contains no catalog number")]
    InvalidId(String),
    #[error("No element set found for catalog number {0}")]
    NotFound(String),
    #[error("Element set lookup failed")]
    Fetch(#[from] FetchError),
    #[error("Invalid lookup endpoint")]
    Url(#[from] url::ParseError),
}

/// The digits of a catalog number, e.g. `25544` for `25544U`.
pub fn clean_catalog_number(id: &str) -> Result<String, LookupError> {
    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        Err(LookupError::InvalidId(id.to_owned()))
    } else {
        Ok(digits)
    }
}

/// `<base>?CATNR=<number>&FORMAT=TLE`
pub fn lookup_source(base: &Url, catalog_number: &str) -> CatalogSource {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("CATNR", catalog_number)
        .append_pair("FORMAT", "TLE");
    CatalogSource::Url(url)
}

pub struct TleLookup<F> {
    fetcher: F,
    base: Url,
}

impl<F: Fetch> TleLookup<F> {
    pub fn new(fetcher: F, base: Url) -> Self {
        Self { fetcher, base }
    }

    pub fn celestrak(fetcher: F) -> Result<Self, LookupError> {
        Ok(Self::new(fetcher, Url::parse(CELESTRAK_GP_URL)?))
    }

    pub async fn by_catalog_number(&self, id: &str) -> Result<TleRecord, LookupError> {
        let number = clean_catalog_number(id)?;
        let source = lookup_source(&self.base, &number);
        debug!(%source, "Looking up element set");
        let text = self.fetcher.fetch(&source).await?;
        tleproto::parse_lookup_response(&text, &number).ok_or(LookupError::NotFound(number))
    }
}
