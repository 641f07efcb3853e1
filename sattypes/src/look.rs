use serde::Serialize;

/// Azimuth, elevation and range from a ground station to an object.
#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct LookAngles {
    /// [0, 360) degrees, clockwise from north
    pub azimuth_deg: f64,
    /// [-90, 90] degrees, positive above the horizon
    pub elevation_deg: f64,
    pub range_km: f64,
    pub visible: bool,
}

impl LookAngles {
    pub fn new(azimuth_deg: f64, elevation_deg: f64, range_km: f64) -> Self {
        let azimuth_deg = azimuth_deg.rem_euclid(360.0);
        Self {
            // rem_euclid can round up to exactly 360.0 for tiny negative inputs
            azimuth_deg: if azimuth_deg >= 360.0 { 0.0 } else { azimuth_deg },
            elevation_deg: elevation_deg.clamp(-90.0, 90.0),
            range_km: range_km.max(0.0),
            visible: elevation_deg > 0.0,
        }
    }
}
