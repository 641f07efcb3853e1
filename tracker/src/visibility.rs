//! Look angles and line-of-sight tests between an orbiting object and a ground station.

use chrono::{DateTime, Utc};
use sattypes::prelude::*;
use tracing::debug;

use crate::coordinates::{
    eci_to_ecef, eci_to_geodetic, ecef_to_eci, gmst, look_angles as topocentric, station_to_ecef,
    station_up,
};
use crate::propagator::{OrbitalPropagator, PropagationError, Sgp4Orbit};
use crate::units::Angle;

pub const DEFAULT_ELEVATION_THRESHOLD_DEGREES: f64 = 5.0;

/// Look angles at `time`, or `None` when the orbit can't be propagated to that instant.
///
/// Negative elevations are returned as-is; the object is below the horizon.
pub fn look_angles<P: OrbitalPropagator + ?Sized>(
    orbit: &P,
    station: &GroundStation,
    time: DateTime<Utc>,
) -> Option<LookAngles> {
    match orbit.propagate(time) {
        Ok(state) => Some(look_angles_from_eci(&state, station)),
        Err(e) => {
            debug!(%time, err = %e, "Propagation failed, no look angles");
            None
        }
    }
}

/// Convenience over [`look_angles`] that initializes the orbit from the record first.
pub fn record_look_angles(
    record: &TleRecord,
    station: &GroundStation,
    time: DateTime<Utc>,
) -> Option<LookAngles> {
    match Sgp4Orbit::from_record(record) {
        Ok(orbit) => look_angles(&orbit, station, time),
        Err(e) => {
            debug!(name = %record.name, err = %e, "Unusable elements, no look angles");
            None
        }
    }
}

pub fn look_angles_from_eci(state: &EciState, station: &GroundStation) -> LookAngles {
    let ecef = eci_to_ecef(&state.position, gmst(state.time));
    topocentric(station, &ecef)
}

/// The cheap visibility cue used for map highlighting.
///
/// Compares the angle between the station's local vertical and the station-to-object vector
/// against `90° - threshold`. It can disagree with [`LookAngles::visible`] near the horizon.
#[derive(Copy, Clone, Debug)]
pub struct LineOfSight {
    pub threshold: Angle,
}

impl Default for LineOfSight {
    fn default() -> Self {
        Self::new(Angle::from_degrees(DEFAULT_ELEVATION_THRESHOLD_DEGREES))
    }
}

impl LineOfSight {
    pub fn new(threshold: Angle) -> Self {
        Self { threshold }
    }

    pub fn is_visible(&self, sat: &EciState, station: &GroundStation) -> bool {
        let theta = gmst(sat.time);
        let station_eci = ecef_to_eci(&station_to_ecef(station), theta);
        let up = ecef_to_eci(&station_up(station), theta);
        let to_sat = sat.position - station_eci;
        let zenith_angle = Angle::from_radians(up.angle(&to_sat));
        zenith_angle < Angle::from_degrees(90.0) - self.threshold
    }
}

/// Geodetic position and scalar speed of an object at `time`.
pub fn orbital_state<P: OrbitalPropagator + ?Sized>(
    orbit: &P,
    time: DateTime<Utc>,
) -> Option<OrbitalState> {
    let state = match orbit.propagate(time) {
        Ok(s) => s,
        Err(e) => {
            debug!(%time, err = %e, "Propagation failed, no orbital state");
            return None;
        }
    };

    let position = eci_to_geodetic(&state.position, time);
    let speed = state.velocity.norm();
    if ![position.latitude, position.longitude, position.altitude, speed]
        .iter()
        .all(|v| v.is_finite())
    {
        debug!(%time, err = %PropagationError::NonFinite, "No orbital state");
        return None;
    }

    Some(OrbitalState {
        time,
        position,
        speed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagator::tests::{delta_debris, iss, vanguard};
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use na::Vector3;

    fn darmstadt() -> GroundStation {
        GroundStation::from_degrees_and_meters(49.8728, 8.6512, 0.0)
    }

    struct Broken;

    impl OrbitalPropagator for Broken {
        fn propagate(&self, _time: DateTime<Utc>) -> Result<EciState, PropagationError> {
            Err(PropagationError::Propagation("decayed".to_owned()))
        }
    }

    /// An inertial state `distance_km` away from the station at the given elevation, due north.
    fn state_at_elevation(
        station: &GroundStation,
        time: DateTime<Utc>,
        elevation_deg: f64,
        distance_km: f64,
    ) -> EciState {
        let (sin_lat, cos_lat) = station.latitude.to_radians().sin_cos();
        let (sin_lon, cos_lon) = station.longitude.to_radians().sin_cos();
        let north = Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
        let (sin_el, cos_el) = elevation_deg.to_radians().sin_cos();
        let ecef = station_to_ecef(station)
            + (north * cos_el + station_up(station) * sin_el) * distance_km;
        EciState {
            time,
            position: ecef_to_eci(&ecef, gmst(time)),
            velocity: Vector3::zeros(),
        }
    }

    #[test]
    fn reference_look_angles_at_epoch() {
        let orbit = Sgp4Orbit::from_record(&vanguard()).unwrap();
        let look = look_angles(&orbit, &darmstadt(), orbit.epoch()).unwrap();
        assert_abs_diff_eq!(look.azimuth_deg, 46.19103, epsilon = 0.1);
        assert_abs_diff_eq!(look.elevation_deg, -58.10327, epsilon = 0.1);
        assert_abs_diff_eq!(look.range_km, 11740.2515, epsilon = 1.0);
        assert!(!look.visible);
    }

    #[test]
    fn reference_look_angles_above_horizon() {
        // Kiritimati, under the object's track at its epoch
        let station = GroundStation::from_degrees_and_meters(1.87, -157.36, 0.0);
        let orbit = Sgp4Orbit::from_record(&delta_debris()).unwrap();
        let look = look_angles(&orbit, &station, orbit.epoch()).unwrap();
        assert_abs_diff_eq!(look.azimuth_deg, 153.64593, epsilon = 0.1);
        assert_abs_diff_eq!(look.elevation_deg, 59.18894, epsilon = 0.1);
        assert_abs_diff_eq!(look.range_km, 477.91007, epsilon = 1.0);
        assert!(look.visible);

        let state = orbit.propagate(orbit.epoch()).unwrap();
        assert!(LineOfSight::default().is_visible(&state, &station));
    }

    #[test]
    fn propagation_failure_gives_none() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(look_angles(&Broken, &darmstadt(), t), None);
        assert_eq!(orbital_state(&Broken, t), None);

        let junk = TleRecord::new("JUNK", "1 junk", "2 junk");
        assert_eq!(record_look_angles(&junk, &darmstadt(), t), None);
    }

    #[test]
    fn eci_state_overhead() {
        let station = darmstadt();
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 12, 5, 0).unwrap();
        let state = state_at_elevation(&station, t, 90.0, 420.0);
        let look = look_angles_from_eci(&state, &station);
        assert_abs_diff_eq!(look.elevation_deg, 90.0, epsilon = 1e-3);
        assert_abs_diff_eq!(look.range_km, 420.0, epsilon = 1e-6);
    }

    #[test]
    fn line_of_sight_threshold() {
        let station = darmstadt();
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 12, 5, 0).unwrap();
        let los = LineOfSight::default();

        assert!(los.is_visible(&state_at_elevation(&station, t, 90.0, 500.0), &station));
        assert!(los.is_visible(&state_at_elevation(&station, t, 10.0, 1000.0), &station));
        assert!(!los.is_visible(&state_at_elevation(&station, t, 3.0, 1000.0), &station));
        assert!(!los.is_visible(&state_at_elevation(&station, t, -20.0, 1000.0), &station));

        let permissive = LineOfSight::new(Angle::from_degrees(0.0));
        assert!(permissive.is_visible(&state_at_elevation(&station, t, 3.0, 1000.0), &station));
    }

    #[test]
    fn line_of_sight_at_high_latitude() {
        // Well inside the equatorial radius, only the zenith angle decides
        let station = GroundStation::from_degrees_and_meters(89.0, 0.0, 0.0);
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 12, 5, 0).unwrap();
        let state = state_at_elevation(&station, t, 0.5, 2400.0);
        assert_abs_diff_eq!(
            look_angles_from_eci(&state, &station).elevation_deg,
            0.5,
            epsilon = 1e-6
        );

        assert!(LineOfSight::new(Angle::from_degrees(0.0)).is_visible(&state, &station));
        assert!(!LineOfSight::default().is_visible(&state, &station));
    }

    #[test]
    fn line_of_sight_beyond_horizon() {
        let los = LineOfSight::default();

        // Opposite side of the earth
        let station = darmstadt();
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 12, 5, 0).unwrap();
        let antipode = -station_to_ecef(&station) * (6778.0 / 6366.0);
        let state = EciState {
            time: t,
            position: ecef_to_eci(&antipode, gmst(t)),
            velocity: Vector3::zeros(),
        };
        assert!(!los.is_visible(&state, &station));
    }

    #[test]
    fn orbital_state_of_low_orbit() {
        let orbit = Sgp4Orbit::from_record(&iss()).unwrap();
        let state = orbital_state(&orbit, orbit.epoch()).unwrap();
        assert!(state.position.latitude.abs() <= 52.0);
        assert!((-180.0..=180.0).contains(&state.position.longitude));
        assert!((300.0..450.0).contains(&state.position.altitude));
        assert!((7.5..7.9).contains(&state.speed));
    }
}
