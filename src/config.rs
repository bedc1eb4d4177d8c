use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GEOFENCE_RADIUS_METERS: f64 = 500.0;
// rough congestion heuristic, not a live traffic feed
pub const DEFAULT_TRAFFIC_MULTIPLIER: f64 = 1.2;
pub const DEFAULT_FALLBACK_SPEED_KMH: f64 = 60.0;
pub const DEFAULT_ROUTING_BASE_URL: &str = "https://router.project-osrm.org";

/// Tunables for one deployment. EMS units use the defaults, other fleets
/// usually only change the zone radius.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripConfig {
    pub geofence_radius_meters: f64,
    pub traffic_multiplier: f64,
    pub fallback_speed_kmh: f64,
    pub routing_base_url: String,
    pub routing_timeout_secs: u64,
    pub telemetry_interval_secs: u64,
}

impl Default for TripConfig {
    fn default() -> Self {
        TripConfig {
            geofence_radius_meters: DEFAULT_GEOFENCE_RADIUS_METERS,
            traffic_multiplier: DEFAULT_TRAFFIC_MULTIPLIER,
            fallback_speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
            routing_base_url: DEFAULT_ROUTING_BASE_URL.to_string(),
            routing_timeout_secs: 10,
            telemetry_interval_secs: 5,
        }
    }
}

impl TripConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TripConfig =
            serde_json::from_str(json).context("failed to parse trip config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read trip config: {}", path.display()))?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.geofence_radius_meters.is_finite() || self.geofence_radius_meters <= 0.0 {
            bail!(
                "invalid geofence radius: {} (must be a positive number of meters)",
                self.geofence_radius_meters
            );
        }
        if !self.traffic_multiplier.is_finite() || self.traffic_multiplier < 1.0 {
            bail!(
                "invalid traffic multiplier: {} (must be >= 1.0)",
                self.traffic_multiplier
            );
        }
        if !self.fallback_speed_kmh.is_finite() || self.fallback_speed_kmh <= 0.0 {
            bail!(
                "invalid fallback speed: {} km/h (must be positive)",
                self.fallback_speed_kmh
            );
        }
        if self.routing_base_url.trim().is_empty() {
            bail!("routing base url is empty");
        }
        if self.routing_timeout_secs == 0 {
            bail!("routing timeout must be at least one second");
        }
        Ok(())
    }

    pub fn fallback_speed_mps(&self) -> f64 {
        self.fallback_speed_kmh * 1000.0 / 3600.0
    }

    pub fn routing_timeout(&self) -> Duration {
        Duration::from_secs(self.routing_timeout_secs)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs)
    }
}
