pub use crate::look::LookAngles;
pub use crate::pass::{GroundTrack, PassSearch, PassWindow};
pub use crate::station::GroundStation;
pub use crate::tle::{SatelliteId, TleRecord, LINE1_PREFIX, LINE2_PREFIX};
pub use crate::tracked::{EciState, GeoPoint, OrbitalState, TrackedObject};
pub use chrono::{DateTime, Utc};
