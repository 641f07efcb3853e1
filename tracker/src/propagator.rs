//! SGP4 orbit propagation of a single TLE record.

use chrono::{DateTime, NaiveDateTime, Utc};
use na::Vector3;
use sattypes::prelude::*;
use sgp4::{Constants, Elements};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropagationError {
    #[error("Invalid orbital elements: {0}")]
    Elements(String),
    #[error("SGP4 propagation failed: {0}")]
    Propagation(String),
    #[error("Propagated state is not finite")]
    NonFinite,
    #[error("Requested time is too far from the element set epoch")]
    TimeOutOfRange,
}

/// Anything that can produce an inertial state for an instant.
pub trait OrbitalPropagator {
    fn propagate(&self, time: DateTime<Utc>) -> Result<EciState, PropagationError>;
}

/// An initialized SGP4 model for one element set.
///
/// Uses the WGS72 constants and the AFSPC epoch handling that published element sets are
/// fitted with.
pub struct Sgp4Orbit {
    elements: Elements,
    constants: Constants,
}

impl std::fmt::Debug for Sgp4Orbit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sgp4Orbit")
            .field("norad_id", &self.elements.norad_id)
            .field("epoch", &self.elements.datetime)
            .finish_non_exhaustive()
    }
}

impl Sgp4Orbit {
    pub fn from_record(record: &TleRecord) -> Result<Self, PropagationError> {
        let elements = Elements::from_tle(
            Some(record.name.clone()),
            record.line1.as_bytes(),
            record.line2.as_bytes(),
        )
        .map_err(|e| PropagationError::Elements(format!("{e:?}")))?;
        let constants = Constants::from_elements_afspc_compatibility_mode(&elements)
            .map_err(|e| PropagationError::Elements(format!("{e:?}")))?;
        Ok(Self {
            elements,
            constants,
        })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.naive_epoch().and_utc()
    }

    fn naive_epoch(&self) -> NaiveDateTime {
        self.elements.datetime
    }
}

impl OrbitalPropagator for Sgp4Orbit {
    fn propagate(&self, time: DateTime<Utc>) -> Result<EciState, PropagationError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&time.naive_utc())
            .map_err(|_| PropagationError::TimeOutOfRange)?;
        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| PropagationError::Propagation(format!("{e:?}")))?;

        let position = Vector3::from(prediction.position);
        let velocity = Vector3::from(prediction.velocity);
        if !position.iter().chain(velocity.iter()).all(|v| v.is_finite()) {
            return Err(PropagationError::NonFinite);
        }

        Ok(EciState {
            time,
            position,
            velocity,
        })
    }
}
