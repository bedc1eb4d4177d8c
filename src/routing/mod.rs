pub mod osrm;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::config::TripConfig;
use crate::geo_utils::{self, Coordinate};
use osrm::{OsrmRoutingService, RouteResponse};

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Maneuver {
    TurnLeft,
    TurnRight,
    Straight,
    Depart,
    Arrive,
}

impl Maneuver {
    // Routing services have a much richer vocabulary ("end of road",
    // "sharp left", "roundabout", ...), we only keep what the in-vehicle
    // display can show.
    pub fn from_service_vocabulary(text: &str) -> Self {
        let text = text.to_lowercase();
        if text.contains("arrive") {
            Maneuver::Arrive
        } else if text.contains("depart") {
            Maneuver::Depart
        } else if text.contains("left") {
            Maneuver::TurnLeft
        } else if text.contains("right") {
            Maneuver::TurnRight
        } else {
            Maneuver::Straight
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub maneuver: Maneuver,
    pub coordinate: Coordinate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub steps: Vec<RouteStep>,
    pub total_distance_meters: f64,
    pub total_duration_seconds: f64,
    pub geometry: Vec<Coordinate>,
}

impl Route {
    pub fn apply_traffic_multiplier(&mut self, multiplier: f64) {
        self.total_duration_seconds *= multiplier;
        for step in &mut self.steps {
            step.duration_seconds *= multiplier;
        }
    }
}

/// Result of a route fetch. `Degraded` carries the straight-line fallback
/// together with the reason the routing service could not be used, the
/// display is expected to show the coarser estimate differently.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteOutcome {
    Ok(Route),
    Degraded(Route, String),
}

impl RouteOutcome {
    pub fn route(&self) -> &Route {
        match self {
            RouteOutcome::Ok(route) | RouteOutcome::Degraded(route, _) => route,
        }
    }

    pub fn into_route(self) -> Route {
        match self {
            RouteOutcome::Ok(route) | RouteOutcome::Degraded(route, _) => route,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RouteOutcome::Degraded(..))
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            RouteOutcome::Ok(_) => None,
            RouteOutcome::Degraded(_, reason) => Some(reason),
        }
    }
}

/// An external turn-by-turn routing service speaking the OSRM response
/// format.
pub trait RoutingService {
    fn request_route(
        &self,
        start: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<RouteResponse>> + Send;
}

pub fn fallback_route(start: Coordinate, destination: Coordinate, speed_mps: f64) -> Route {
    let distance_meters = geo_utils::distance(&start, &destination);
    let duration_seconds = distance_meters / speed_mps;
    Route {
        steps: vec![
            RouteStep {
                instruction: "Head to destination (straight-line estimate)".to_string(),
                distance_meters,
                duration_seconds,
                maneuver: Maneuver::Depart,
                coordinate: start,
            },
            RouteStep {
                instruction: "Arrive at destination".to_string(),
                distance_meters: 0.0,
                duration_seconds: 0.0,
                maneuver: Maneuver::Arrive,
                coordinate: destination,
            },
        ],
        total_distance_meters: distance_meters,
        total_duration_seconds: duration_seconds,
        geometry: vec![start, destination],
    }
}

pub struct RouteProviderClient<S> {
    service: S,
    traffic_multiplier: f64,
    fallback_speed_mps: f64,
}

impl RouteProviderClient<OsrmRoutingService> {
    pub fn from_config(config: &TripConfig) -> Result<Self> {
        let service = OsrmRoutingService::new(&config.routing_base_url, config.routing_timeout())?;
        Self::new(service, config)
    }
}

impl<S: RoutingService> RouteProviderClient<S> {
    pub fn new(service: S, config: &TripConfig) -> Result<Self> {
        config.validate()?;
        Ok(RouteProviderClient {
            service,
            traffic_multiplier: config.traffic_multiplier,
            fallback_speed_mps: config.fallback_speed_mps(),
        })
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    // Attempted exactly once, never fails: anything going wrong with the
    // service ends up as a `Degraded` straight-line route.
    pub async fn fetch_route(
        &self,
        start: Coordinate,
        destination: Coordinate,
        apply_traffic_adjustment: bool,
    ) -> RouteOutcome {
        let result = self
            .service
            .request_route(start, destination)
            .await
            .and_then(RouteResponse::into_route);
        match result {
            Ok(mut route) => {
                if apply_traffic_adjustment {
                    route.apply_traffic_multiplier(self.traffic_multiplier);
                }
                info!(
                    "route fetched: {} steps, {:.0} m, {:.0} s",
                    route.steps.len(),
                    route.total_distance_meters,
                    route.total_duration_seconds
                );
                RouteOutcome::Ok(route)
            }
            Err(e) => {
                warn!("routing service unavailable, using straight-line route: {e:#}");
                RouteOutcome::Degraded(
                    fallback_route(start, destination, self.fallback_speed_mps),
                    format!("{e:#}"),
                )
            }
        }
    }
}
