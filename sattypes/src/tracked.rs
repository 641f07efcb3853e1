use chrono::{DateTime, Utc};
use na::Vector3;
use serde::Serialize;

use crate::tle::{SatelliteId, TleRecord};

/// A geodetic position on or above the WGS84 ellipsoid.
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct GeoPoint {
    /// [degrees]
    pub latitude: f64,
    /// [degrees]
    pub longitude: f64,
    /// [kilometers]
    pub altitude: f64,
}

/// An object in the live catalog.
///
/// `position` is `None` when propagation failed at the sampled instant; such objects are not
/// rendered rather than being placed at the origin.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct TrackedObject {
    pub id: SatelliteId,
    pub name: String,
    pub position: Option<GeoPoint>,
    pub tle: TleRecord,
}

impl TrackedObject {
    pub fn is_renderable(&self) -> bool {
        self.position.is_some()
    }
}

/// Inertial (TEME) state produced by the propagator.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EciState {
    pub time: DateTime<Utc>,
    /// [kilometers]
    pub position: Vector3<f64>,
    /// [kilometers / second]
    pub velocity: Vector3<f64>,
}

/// Geodetic position plus scalar speed of a single object.
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct OrbitalState {
    pub time: DateTime<Utc>,
    pub position: GeoPoint,
    /// [kilometers / second]
    pub speed: f64,
}
