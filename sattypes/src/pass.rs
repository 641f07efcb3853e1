use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::look::LookAngles;

/// A complete visibility window over a ground station.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct PassWindow {
    pub start_time: DateTime<Utc>,
    /// `start_time` rendered in the station's local time zone, when it could be resolved
    pub local_start_label: Option<String>,
    pub duration_seconds: f64,
}

impl PassWindow {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::milliseconds((self.duration_seconds * 1000.0).round() as i64)
    }
}

/// Outcome of a forward pass search.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub enum PassSearch {
    /// Rise and set were both found inside the horizon
    Complete(PassWindow),
    /// The object rose but had not set when the horizon ran out
    Incomplete { start_time: DateTime<Utc> },
    NotFound,
}

impl PassSearch {
    pub fn window(&self) -> Option<&PassWindow> {
        match self {
            PassSearch::Complete(w) => Some(w),
            _ => None,
        }
    }

    pub fn into_window(self) -> Option<PassWindow> {
        match self {
            PassSearch::Complete(w) => Some(w),
            _ => None,
        }
    }
}

/// What a presentation layer shows for the selected object and ground station.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct GroundTrack {
    pub computed_at: DateTime<Utc>,
    pub look_angles: LookAngles,
    pub next_pass: PassSearch,
}
