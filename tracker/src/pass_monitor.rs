//! Keeps the look angles and next pass of the selected object fresh.
//!
//! A result is recomputed as soon as the selected object or ground station changes, and then on
//! a fixed period so the prediction follows the clock. A result computed for inputs that were
//! replaced in the meantime is dropped instead of published.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sattypes::prelude::*;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::local_time::{TzfResolver, ZoneResolver};
use crate::pass_predictor::PassPredictor;
use crate::propagator::Sgp4Orbit;
use crate::visibility::look_angles;

pub const DEFAULT_RECOMPUTE_INTERVAL: Duration = Duration::from_secs(10);

/// The selected object and the station it's observed from, if any.
pub type PassInputs = Option<(TleRecord, GroundStation)>;

/// Caller side of a running [`PassMonitor`].
#[derive(Debug)]
pub struct PassMonitorHandle {
    pub inputs: watch::Sender<PassInputs>,
    pub output: watch::Receiver<Option<GroundTrack>>,
}

impl PassMonitorHandle {
    /// Select an object and station. Returns false when they were already selected.
    pub fn select(&self, record: TleRecord, station: GroundStation) -> bool {
        self.replace(Some((record, station)))
    }

    pub fn clear(&self) -> bool {
        self.replace(None)
    }

    fn replace(&self, inputs: PassInputs) -> bool {
        self.inputs.send_if_modified(|current| {
            if *current == inputs {
                false
            } else {
                *current = inputs;
                true
            }
        })
    }
}

pub struct PassMonitor<Z = TzfResolver> {
    predictor: PassPredictor<Z>,
    period: Duration,
    clock: fn() -> DateTime<Utc>,
    inputs: watch::Receiver<PassInputs>,
    output: watch::Sender<Option<GroundTrack>>,
}

impl<Z: ZoneResolver> PassMonitor<Z> {
    pub fn new(predictor: PassPredictor<Z>, period: Duration) -> (Self, PassMonitorHandle) {
        let (inputs_tx, inputs_rx) = watch::channel(None);
        let (output_tx, output_rx) = watch::channel(None);
        let monitor = Self {
            predictor,
            period,
            clock: Utc::now,
            inputs: inputs_rx,
            output: output_tx,
        };
        let handle = PassMonitorHandle {
            inputs: inputs_tx,
            output: output_rx,
        };
        (monitor, handle)
    }

    /// Replace the wall clock, e.g. to replay an archived element set.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Look angles and pass search for `inputs` at `time`.
    ///
    /// `None` without inputs, or when the selected object can't be propagated to `time`.
    pub fn compute_at(&self, inputs: &PassInputs, time: DateTime<Utc>) -> Option<GroundTrack> {
        let (record, station) = inputs.as_ref()?;
        let orbit = match Sgp4Orbit::from_record(record) {
            Ok(orbit) => orbit,
            Err(e) => {
                warn!(name = %record.name, err = %e, "Selected object has unusable elements");
                return None;
            }
        };
        let look_angles = look_angles(&orbit, station, time)?;
        let next_pass = self.predictor.search(&orbit, station, time);
        Some(GroundTrack {
            computed_at: time,
            look_angles,
            next_pass,
        })
    }

    /// Runs until the handle is dropped.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                changed = self.inputs.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    interval.reset();
                }
                _ = interval.tick() => (),
            }
            if self.output.is_closed() {
                break;
            }

            let inputs = self.inputs.borrow_and_update().clone();
            let track = self.compute_at(&inputs, (self.clock)());
            if self.inputs.has_changed().unwrap_or(false) {
                debug!("Selection changed during recompute, dropping result");
                continue;
            }
            self.output.send_replace(track);
        }
        debug!("Pass monitor stopped");
    }
}
