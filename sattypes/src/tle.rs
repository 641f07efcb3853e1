use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

pub const LINE1_PREFIX: &str = "1 ";
pub const LINE2_PREFIX: &str = "2 ";

/// A named two-line element set, exactly as it appeared in a catalog.
/// https://en.wikipedia.org/wiki/Two-line_element_set
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct TleRecord {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl TleRecord {
    pub fn new(
        name: impl Into<String>,
        line1: impl Into<String>,
        line2: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            line1: line1.into(),
            line2: line2.into(),
        }
    }

    /// Both element lines carry their line-number prefix.
    pub fn has_valid_prefixes(&self) -> bool {
        self.line1.starts_with(LINE1_PREFIX) && self.line2.starts_with(LINE2_PREFIX)
    }
}

/// Identifier of a tracked object.
///
/// Normally the catalog number taken from line 1 (e.g. `25544`), falling back to the
/// object name when line 1 carries no recognisable number.
#[derive(
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
pub struct SatelliteId(String);

impl SatelliteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SatelliteId {
    fn from(value: &str) -> Self {
        SatelliteId(value.to_owned())
    }
}

impl AsRef<str> for SatelliteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
