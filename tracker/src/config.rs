use crate::{
    catalog::DuplicatePolicy,
    pass_monitor::DEFAULT_RECOMPUTE_INTERVAL,
    pass_predictor::{PassSearchParams, DEFAULT_HORIZON, DEFAULT_STEP},
    source::CatalogSource,
    units::{Angle, Length},
    visibility::{LineOfSight, DEFAULT_ELEVATION_THRESHOLD_DEGREES},
};
use sattypes::prelude::*;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_SOURCE: &str = "data/active_tles.txt";
pub const DEFAULT_CATALOG_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POSITION_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file")]
    Toml(#[from] toml::de::Error),
    #[error("Ground station latitude {0}° is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("Ground station longitude {0}° is outside [-180, 180]")]
    InvalidLongitude(f64),
    #[error("'{0}' must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("'pass-step' is larger than 'pass-horizon'")]
    StepExceedsHorizon,
    #[error("Elevation threshold {0}° is outside [0, 90)")]
    InvalidThreshold(f64),
}

#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// The active catalog, a URL or a path
    pub source: Option<CatalogSource>,
    #[serde(deserialize_with = "human_duration")]
    pub catalog_poll_interval: Option<Duration>,
    #[serde(deserialize_with = "human_duration")]
    pub position_interval: Option<Duration>,
    #[serde(deserialize_with = "human_duration")]
    pub pass_recompute_interval: Option<Duration>,
    #[serde(deserialize_with = "human_duration")]
    pub pass_horizon: Option<Duration>,
    #[serde(deserialize_with = "human_duration")]
    pub pass_step: Option<Duration>,
    /// Degrees above the horizon for the line-of-sight cue
    pub elevation_threshold: Option<Angle>,
    pub duplicate_ids: Option<DuplicatePolicy>,
    pub ground_station: Option<GroundStationConfig>,
    pub collections_index: Option<CatalogSource>,
}

#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroundStationConfig {
    pub name: Option<String>,
    pub latitude: Angle,
    pub longitude: Angle,
    /// Meters above the ellipsoid
    #[serde(default)]
    pub altitude: Length,
}

impl GroundStationConfig {
    pub fn station(&self) -> GroundStation {
        GroundStation::from_degrees_and_meters(
            self.latitude.as_degrees(),
            self.longitude.as_degrees(),
            self.altitude.as_meters(),
        )
    }
}

fn human_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    s.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_str_checked(&content)
    }

    pub fn from_str_checked(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s)?;

        for (name, interval) in [
            ("catalog-poll-interval", cfg.catalog_poll_interval),
            ("position-interval", cfg.position_interval),
            ("pass-recompute-interval", cfg.pass_recompute_interval),
            ("pass-horizon", cfg.pass_horizon),
            ("pass-step", cfg.pass_step),
        ] {
            if interval.map(|d| d.is_zero()).unwrap_or(false) {
                return Err(ConfigError::ZeroInterval(name));
            }
        }

        let search = cfg.pass_search_params();
        if search.step > search.horizon {
            return Err(ConfigError::StepExceedsHorizon);
        }

        if let Some(threshold) = cfg.elevation_threshold {
            let deg = threshold.as_degrees();
            if !(0.0..90.0).contains(&deg) {
                return Err(ConfigError::InvalidThreshold(deg));
            }
        }

        if let Some(gs) = cfg.ground_station.as_ref() {
            let lat = gs.latitude.as_degrees();
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ConfigError::InvalidLatitude(lat));
            }
            let lon = gs.longitude.as_degrees();
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::InvalidLongitude(lon));
            }
        }

        Ok(cfg)
    }

    pub fn source(&self) -> CatalogSource {
        self.source
            .clone()
            .unwrap_or_else(|| CatalogSource::Path(PathBuf::from(DEFAULT_SOURCE)))
    }

    pub fn catalog_poll_interval(&self) -> Duration {
        self.catalog_poll_interval.unwrap_or(DEFAULT_CATALOG_POLL_INTERVAL)
    }

    pub fn position_interval(&self) -> Duration {
        self.position_interval.unwrap_or(DEFAULT_POSITION_INTERVAL)
    }

    pub fn pass_recompute_interval(&self) -> Duration {
        self.pass_recompute_interval.unwrap_or(DEFAULT_RECOMPUTE_INTERVAL)
    }

    pub fn pass_search_params(&self) -> PassSearchParams {
        PassSearchParams {
            horizon: self.pass_horizon.unwrap_or(DEFAULT_HORIZON),
            step: self.pass_step.unwrap_or(DEFAULT_STEP),
        }
    }

    pub fn line_of_sight(&self) -> LineOfSight {
        LineOfSight::new(
            self.elevation_threshold
                .unwrap_or_else(|| Angle::from_degrees(DEFAULT_ELEVATION_THRESHOLD_DEGREES)),
        )
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_ids.unwrap_or_default()
    }

    pub fn ground_station(&self) -> Option<GroundStation> {
        self.ground_station.as_ref().map(GroundStationConfig::station)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use indoc::indoc;

    #[test]
    fn defaults() {
        let cfg = Config::from_str_checked("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.source(), CatalogSource::Path(DEFAULT_SOURCE.into()));
        assert_eq!(cfg.catalog_poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.position_interval(), Duration::from_millis(100));
        assert_eq!(cfg.pass_recompute_interval(), Duration::from_secs(10));
        assert_eq!(cfg.pass_search_params(), PassSearchParams::default());
        assert_relative_eq!(cfg.line_of_sight().threshold.as_degrees(), 5.0);
        assert_eq!(cfg.duplicate_policy(), DuplicatePolicy::FirstWins);
        assert_eq!(cfg.ground_station(), None);
    }

    #[test]
    fn full_config() {
        const TOML: &str = indoc! {r#"
            source = "https://celestrak.org/NORAD/elements/gp.php?GROUP=stations&FORMAT=tle"
            catalog-poll-interval = "5s"
            position-interval = "250ms"
            pass-recompute-interval = "30s"
            pass-horizon = "2days"
            pass-step = "10s"
            elevation-threshold = 10.0
            duplicate-ids = "keep-all"
            collections-index = "data/index.json"

            [ground-station]
            name = "ESOC"
            latitude = 49.8728
            longitude = 8.6512
            altitude = 144.0
        "#};

        let cfg = Config::from_str_checked(TOML).unwrap();
        assert!(matches!(cfg.source(), CatalogSource::Url(_)));
        assert_eq!(cfg.catalog_poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.position_interval(), Duration::from_millis(250));
        assert_eq!(cfg.pass_recompute_interval(), Duration::from_secs(30));
        assert_eq!(
            cfg.pass_search_params(),
            PassSearchParams {
                horizon: Duration::from_secs(2 * 86_400),
                step: Duration::from_secs(10),
            }
        );
        assert_relative_eq!(cfg.line_of_sight().threshold.as_degrees(), 10.0);
        assert_eq!(cfg.duplicate_policy(), DuplicatePolicy::KeepAll);
        assert_eq!(
            cfg.collections_index,
            Some(CatalogSource::Path("data/index.json".into()))
        );
        assert_eq!(
            cfg.ground_station(),
            Some(GroundStation::from_degrees_and_meters(49.8728, 8.6512, 144.0))
        );
        let gs = cfg.ground_station.unwrap();
        assert_eq!(gs.name.as_deref(), Some("ESOC"));
        assert_eq!(gs.altitude, Length::from_meters(144.0));
    }

    #[test]
    fn invalid_values() {
        assert!(matches!(
            Config::from_str_checked("position-interval = \"0s\""),
            Err(ConfigError::ZeroInterval("position-interval"))
        ));
        assert!(matches!(
            Config::from_str_checked("pass-step = \"2h\"\npass-horizon = \"1h\""),
            Err(ConfigError::StepExceedsHorizon)
        ));
        assert!(matches!(
            Config::from_str_checked("elevation-threshold = 95.0"),
            Err(ConfigError::InvalidThreshold(_))
        ));
        assert!(matches!(
            Config::from_str_checked("[ground-station]\nlatitude = 91.0\nlongitude = 0.0"),
            Err(ConfigError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Config::from_str_checked("[ground-station]\nlatitude = 0.0\nlongitude = -181.0"),
            Err(ConfigError::InvalidLongitude(_))
        ));
        assert!(matches!(
            Config::from_str_checked("pass-step = \"soon\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            Config::from_str_checked("duplicate-ids = \"random\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
