//! Forward time-stepped search for the next visibility window.
//!
//! The search samples elevation every `step` from the start instant up to `horizon`. The
//! first sample above the horizon marks the rise; the first later sample at or below it marks
//! the set and ends the search. Rise and set are only known to within one step, no
//! interpolation between samples is done.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sattypes::prelude::*;
use tracing::debug;

use crate::local_time::{local_label, TzfResolver, ZoneResolver};
use crate::propagator::{OrbitalPropagator, Sgp4Orbit};
use crate::visibility::look_angles;

pub const DEFAULT_HORIZON: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_STEP: Duration = Duration::from_secs(30);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PassSearchParams {
    pub horizon: Duration,
    pub step: Duration,
}

impl Default for PassSearchParams {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            step: DEFAULT_STEP,
        }
    }
}

impl PassSearchParams {
    /// Number of samples the search takes at most
    pub fn max_steps(&self) -> u64 {
        if self.step.is_zero() {
            0
        } else {
            (self.horizon.as_nanos() / self.step.as_nanos()) as u64
        }
    }
}

/// Runs the search over an arbitrary elevation source.
///
/// `elevation_at` returns `None` when no elevation is available for an instant (propagation
/// failure); such samples are skipped and don't change the in-pass state. An object already
/// above the horizon at `from` rises at `from`.
pub fn search<F>(from: DateTime<Utc>, params: &PassSearchParams, mut elevation_at: F) -> PassSearch
where
    F: FnMut(DateTime<Utc>) -> Option<f64>,
{
    let Ok(step) = chrono::Duration::from_std(params.step) else {
        return PassSearch::NotFound;
    };
    let mut start_time: Option<DateTime<Utc>> = None;

    for i in 0..params.max_steps() {
        let Some(t) = i32::try_from(i)
            .ok()
            .and_then(|i| step.checked_mul(i))
            .and_then(|offset| from.checked_add_signed(offset))
        else {
            break;
        };
        let Some(elevation) = elevation_at(t) else {
            continue;
        };

        match start_time {
            None if elevation > 0.0 => start_time = Some(t),
            Some(start) if elevation <= 0.0 => {
                let duration = (t - start).num_milliseconds() as f64 / 1000.0;
                return PassSearch::Complete(PassWindow {
                    start_time: start,
                    local_start_label: None,
                    duration_seconds: duration,
                });
            }
            _ => (),
        }
    }

    match start_time {
        Some(start_time) => PassSearch::Incomplete { start_time },
        None => PassSearch::NotFound,
    }
}

/// Finds passes of an orbit over a station, labelling their start in the station's zone.
#[derive(Clone, Debug)]
pub struct PassPredictor<Z = TzfResolver> {
    params: PassSearchParams,
    zones: Z,
}

impl Default for PassPredictor {
    fn default() -> Self {
        Self::new(PassSearchParams::default())
    }
}

impl PassPredictor {
    pub fn new(params: PassSearchParams) -> Self {
        Self::with_resolver(params, TzfResolver)
    }
}

impl<Z: ZoneResolver> PassPredictor<Z> {
    pub fn with_resolver(params: PassSearchParams, zones: Z) -> Self {
        Self { params, zones }
    }

    pub fn params(&self) -> &PassSearchParams {
        &self.params
    }

    pub fn zones(&self) -> &Z {
        &self.zones
    }

    pub fn search<P: OrbitalPropagator + ?Sized>(
        &self,
        orbit: &P,
        station: &GroundStation,
        from: DateTime<Utc>,
    ) -> PassSearch {
        let outcome = search(from, &self.params, |t| {
            look_angles(orbit, station, t).map(|look| look.elevation_deg)
        });
        debug!(%from, ?outcome, "Pass search finished");

        match outcome {
            PassSearch::Complete(mut window) => {
                window.local_start_label = local_label(&self.zones, station, window.start_time);
                PassSearch::Complete(window)
            }
            other => other,
        }
    }

    /// Only a pass with both rise and set inside the horizon counts.
    pub fn next_pass<P: OrbitalPropagator + ?Sized>(
        &self,
        orbit: &P,
        station: &GroundStation,
        from: DateTime<Utc>,
    ) -> Option<PassWindow> {
        self.search(orbit, station, from).into_window()
    }
}

/// One-shot form: initializes the orbit from `tle` and searches with a polygon zone lookup.
pub fn next_pass(
    tle: &TleRecord,
    station: &GroundStation,
    from: DateTime<Utc>,
    horizon: Duration,
    step: Duration,
) -> Option<PassWindow> {
    let orbit = match Sgp4Orbit::from_record(tle) {
        Ok(o) => o,
        Err(e) => {
            debug!(name = %tle.name, err = %e, "Unusable elements, no pass");
            return None;
        }
    };
    PassPredictor::new(PassSearchParams { horizon, step }).next_pass(&orbit, station, from)
}
