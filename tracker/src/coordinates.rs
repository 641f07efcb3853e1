//! Frame conversions between the propagator's inertial (TEME) output, the earth-fixed
//! frame and geodetic coordinates, plus the topocentric look-angle transform.
//!
//! Distances are kilometers throughout, angles are degrees at the API boundary.

use chrono::{DateTime, Utc};
use na::Vector3;
use nav_types::{ECEF, WGS84};
use sattypes::prelude::*;
use std::f64::consts::{PI, TAU};

const SECONDS_PER_DAY: f64 = 86_400.0;
const JULIAN_DATE_UNIX_EPOCH: f64 = 2_440_587.5;
const JULIAN_DATE_J2000: f64 = 2_451_545.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

pub fn julian_date(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    seconds / SECONDS_PER_DAY + JULIAN_DATE_UNIX_EPOCH
}

/// Greenwich mean sidereal time (IAU-82), radians in [0, 2π).
pub fn gmst(time: DateTime<Utc>) -> f64 {
    let t = (julian_date(time) - JULIAN_DATE_J2000) / DAYS_PER_JULIAN_CENTURY;
    let seconds = -6.2e-6 * t.powi(3)
        + 0.093104 * t.powi(2)
        + (876_600.0 * 3600.0 + 8_640_184.812866) * t
        + 67_310.54841;
    // 240 seconds of sidereal time per degree
    (seconds / 240.0).to_radians().rem_euclid(TAU)
}

pub fn eci_to_ecef(eci: &Vector3<f64>, gmst: f64) -> Vector3<f64> {
    let (sin, cos) = gmst.sin_cos();
    Vector3::new(
        eci.x * cos + eci.y * sin,
        -eci.x * sin + eci.y * cos,
        eci.z,
    )
}

pub fn ecef_to_eci(ecef: &Vector3<f64>, gmst: f64) -> Vector3<f64> {
    let (sin, cos) = gmst.sin_cos();
    Vector3::new(
        ecef.x * cos - ecef.y * sin,
        ecef.x * sin + ecef.y * cos,
        ecef.z,
    )
}

/// Latitude and longitude folded into the ranges WGS84 accepts, degrees
fn normalized_degrees(station: &GroundStation) -> (f64, f64) {
    let latitude = station.latitude.clamp(-90.0, 90.0);
    let longitude = (station.longitude + 180.0).rem_euclid(360.0) - 180.0;
    (latitude, longitude)
}

fn station_wgs84(station: &GroundStation) -> WGS84<f64> {
    let (latitude, longitude) = normalized_degrees(station);
    WGS84::from_degrees_and_meters(latitude, longitude, station.altitude)
}

fn sin_cos_lat_lon(station: &GroundStation) -> ((f64, f64), (f64, f64)) {
    let (latitude, longitude) = normalized_degrees(station);
    (
        latitude.to_radians().sin_cos(),
        longitude.to_radians().sin_cos(),
    )
}

/// Earth-fixed position of a ground station
pub fn station_to_ecef(station: &GroundStation) -> Vector3<f64> {
    let ecef: ECEF<f64> = station_wgs84(station).into();
    Vector3::new(ecef.x(), ecef.y(), ecef.z()) / 1000.0
}

/// Unit normal of the ellipsoid at the station (the local vertical), earth-fixed
pub fn station_up(station: &GroundStation) -> Vector3<f64> {
    let ((sin_lat, cos_lat), (sin_lon, cos_lon)) = sin_cos_lat_lon(station);
    Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

pub fn ecef_to_geodetic(ecef: &Vector3<f64>) -> GeoPoint {
    let wgs: WGS84<f64> = ECEF::new(ecef.x * 1000.0, ecef.y * 1000.0, ecef.z * 1000.0).into();
    GeoPoint {
        latitude: wgs.latitude_degrees(),
        longitude: wgs.longitude_degrees(),
        altitude: wgs.altitude() / 1000.0,
    }
}

pub fn eci_to_geodetic(eci: &Vector3<f64>, time: DateTime<Utc>) -> GeoPoint {
    ecef_to_geodetic(&eci_to_ecef(eci, gmst(time)))
}

/// Azimuth/elevation/range of an earth-fixed position as seen from the station.
pub fn look_angles(station: &GroundStation, target_ecef: &Vector3<f64>) -> LookAngles {
    let range = target_ecef - station_to_ecef(station);
    let range_km = range.norm();
    if range_km == 0.0 {
        return LookAngles::new(0.0, 90.0, 0.0);
    }

    let ((sin_lat, cos_lat), (sin_lon, cos_lon)) = sin_cos_lat_lon(station);

    // South-East-Zenith topocentric frame
    let south = sin_lat * cos_lon * range.x + sin_lat * sin_lon * range.y - cos_lat * range.z;
    let east = -sin_lon * range.x + cos_lon * range.y;
    let zenith = cos_lat * cos_lon * range.x + cos_lat * sin_lon * range.y + sin_lat * range.z;

    let azimuth = (-east).atan2(south) + PI;
    let elevation = (zenith / range_km).clamp(-1.0, 1.0).asin();

    LookAngles::new(azimuth.to_degrees(), elevation.to_degrees(), range_km)
}
