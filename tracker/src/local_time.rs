//! Rendering instants in a ground station's own time zone.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sattypes::prelude::*;
use tracing::debug;
use tzf_rs::DefaultFinder;

/// e.g. `1/15/24, 1:05 PM`
pub const LABEL_FORMAT: &str = "%-m/%-d/%y, %-I:%M %p";

/// Maps a geodetic location to an IANA time zone.
pub trait ZoneResolver: Send + Sync {
    fn zone_at(&self, latitude: f64, longitude: f64) -> Option<Tz>;
}

/// Polygon lookup over the bundled time-zone boundaries.
#[derive(Copy, Clone, Debug, Default)]
pub struct TzfResolver;

impl TzfResolver {
    fn finder() -> &'static DefaultFinder {
        static FINDER: OnceLock<DefaultFinder> = OnceLock::new();
        FINDER.get_or_init(DefaultFinder::new)
    }
}

impl ZoneResolver for TzfResolver {
    fn zone_at(&self, latitude: f64, longitude: f64) -> Option<Tz> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        let name = Self::finder().get_tz_name(longitude, latitude);
        if name.is_empty() {
            return None;
        }
        match name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(e) => {
                debug!(name, err = %e, "Unknown time zone name");
                None
            }
        }
    }
}

/// Always resolves to the same zone.
#[derive(Copy, Clone, Debug)]
pub struct FixedZone(pub Tz);

impl ZoneResolver for FixedZone {
    fn zone_at(&self, _latitude: f64, _longitude: f64) -> Option<Tz> {
        Some(self.0)
    }
}

/// Never resolves; every label is absent.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoZone;

impl ZoneResolver for NoZone {
    fn zone_at(&self, _latitude: f64, _longitude: f64) -> Option<Tz> {
        None
    }
}

/// `time` formatted in the station's zone, `None` when the zone can't be resolved.
pub fn local_label<Z: ZoneResolver + ?Sized>(
    zones: &Z,
    station: &GroundStation,
    time: DateTime<Utc>,
) -> Option<String> {
    let tz = zones.zone_at(station.latitude, station.longitude)?;
    Some(time.with_timezone(&tz).format(LABEL_FORMAT).to_string())
}
