/* Client side of the OSRM HTTP API (http://project-osrm.org/docs/v5.24.0/api/).
Only the `route` service is used. Coordinates on the wire are `[lng, lat]`.
*/
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::{Maneuver, Route, RouteStep, RoutingService};
use crate::geo_utils::Coordinate;

#[derive(Deserialize, Debug)]
pub struct RouteResponse {
    pub code: String,
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Deserialize, Debug)]
pub struct OsrmRoute {
    pub distance: f64,
    pub duration: f64,
    pub geometry: OsrmGeometry,
    pub legs: Vec<OsrmLeg>,
}

#[derive(Deserialize, Debug)]
pub struct OsrmGeometry {
    pub coordinates: Vec<Vec<f64>>,
}

#[derive(Deserialize, Debug)]
pub struct OsrmLeg {
    pub distance: f64,
    pub duration: f64,
    pub steps: Vec<OsrmStep>,
}

#[derive(Deserialize, Debug)]
pub struct OsrmStep {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub name: String,
    pub maneuver: Option<OsrmManeuver>,
}

#[derive(Deserialize, Debug)]
pub struct OsrmManeuver {
    #[serde(rename = "type")]
    pub r#type: String,
    pub modifier: Option<String>,
    pub location: Vec<f64>,
}

fn lng_lat_to_coordinate(lng_lat: &[f64]) -> Result<Coordinate> {
    match lng_lat {
        [lng, lat, ..] => Ok(Coordinate::new(*lat, *lng)),
        _ => bail!("malformed coordinate: {:?}", lng_lat),
    }
}

fn describe_step(maneuver: &OsrmManeuver, name: &str) -> String {
    let action = match (maneuver.r#type.as_str(), maneuver.modifier.as_deref()) {
        ("depart", _) => "Depart".to_string(),
        ("arrive", _) => return "Arrive at destination".to_string(),
        (_, Some("straight")) => "Continue straight".to_string(),
        (_, Some(modifier)) => format!("Turn {modifier}"),
        (other, None) => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => "Continue".to_string(),
            }
        }
    };
    if name.is_empty() {
        action
    } else {
        format!("{action} onto {name}")
    }
}

impl RouteResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("malformed routing response")
    }

    // Only the first (best) route is used. A response that can't be turned
    // into something navigable is an error, callers fall back on it.
    pub fn into_route(self) -> Result<Route> {
        if self.code != "Ok" {
            bail!(
                "routing service returned `{}`: {}",
                self.code,
                self.message.unwrap_or_default()
            );
        }
        let route = match self.routes.into_iter().next() {
            Some(route) => route,
            None => bail!("routing service returned no routes"),
        };

        let mut steps = Vec::new();
        for step in route.legs.into_iter().flat_map(|leg| leg.steps) {
            let maneuver = step
                .maneuver
                .as_ref()
                .ok_or_else(|| anyhow!("route step without maneuver"))?;
            let vocabulary = format!(
                "{} {}",
                maneuver.r#type,
                maneuver.modifier.as_deref().unwrap_or_default()
            );
            steps.push(RouteStep {
                instruction: describe_step(maneuver, &step.name),
                distance_meters: step.distance,
                duration_seconds: step.duration,
                maneuver: Maneuver::from_service_vocabulary(&vocabulary),
                coordinate: lng_lat_to_coordinate(&maneuver.location)?,
            });
        }
        if steps.is_empty() {
            bail!("route has no steps");
        }

        let geometry = route
            .geometry
            .coordinates
            .iter()
            .map(|c| lng_lat_to_coordinate(c))
            .collect::<Result<Vec<_>>>()?;

        Ok(Route {
            steps,
            total_distance_meters: route.distance,
            total_duration_seconds: route.duration,
            geometry,
        })
    }
}

pub struct OsrmRoutingService {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmRoutingService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("geotrip_core/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(OsrmRoutingService {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn route_url(&self, start: &Coordinate, destination: &Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson&steps=true",
            self.base_url,
            start.longitude,
            start.latitude,
            destination.longitude,
            destination.latitude
        )
    }
}

impl RoutingService for OsrmRoutingService {
    async fn request_route(
        &self,
        start: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteResponse> {
        let url = self.route_url(&start, &destination);
        debug!("requesting route: {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("routing service returned HTTP {}", status);
        }
        let body = response.text().await?;
        RouteResponse::from_json(&body)
    }
}
