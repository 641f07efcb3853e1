use serde::{Deserialize, Serialize};

/// An observer on the ground. Owned by the caller and only ever read by the engine.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GroundStation {
    /// Geodetic latitude [degrees]
    pub latitude: f64,
    /// Longitude [degrees], east positive
    pub longitude: f64,
    /// Height above the WGS84 ellipsoid [meters]
    pub altitude: f64,
}

impl GroundStation {
    pub fn from_degrees_and_meters(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// `lat,lon` or `lat,lon,alt` in degrees and meters, e.g. `49.8728,8.6512,144`.
impl std::str::FromStr for GroundStation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| format!("Invalid coordinate '{}': {e}", v.trim()))
            })
            .collect::<Result<Vec<f64>, String>>()?;

        let station = match values.as_slice() {
            [lat, lon] => GroundStation::from_degrees_and_meters(*lat, *lon, 0.0),
            [lat, lon, alt] => GroundStation::from_degrees_and_meters(*lat, *lon, *alt),
            _ => return Err(format!("Expected 'lat,lon[,alt]', got '{s}'")),
        };

        if !(-90.0..=90.0).contains(&station.latitude) {
            return Err(format!("Latitude {} is outside [-90, 90]", station.latitude));
        }
        if !(-180.0..=180.0).contains(&station.longitude) {
            return Err(format!(
                "Longitude {} is outside [-180, 180]",
                station.longitude
            ));
        }
        Ok(station)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_from_str() {
        assert_eq!(
            "49.8728, 8.6512".parse::<GroundStation>(),
            Ok(GroundStation::from_degrees_and_meters(49.8728, 8.6512, 0.0))
        );
        assert_eq!(
            "-33.9,18.4,12".parse::<GroundStation>(),
            Ok(GroundStation::from_degrees_and_meters(-33.9, 18.4, 12.0))
        );
        assert!("49.8".parse::<GroundStation>().is_err());
        assert!("north,8.6".parse::<GroundStation>().is_err());
        assert!("95,0".parse::<GroundStation>().is_err());
        assert!("0,200".parse::<GroundStation>().is_err());
    }
}
