#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use geotrip_core::geo_utils::{Coordinate, EARTH_RADIUS};
use geotrip_core::location::LocationSample;
use geotrip_core::routing::osrm::RouteResponse;
use geotrip_core::routing::RoutingService;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PICKUP: Coordinate = Coordinate {
    latitude: 40.7128,
    longitude: -74.0060,
};
pub const DESTINATION: Coordinate = Coordinate {
    latitude: 40.7829,
    longitude: -73.9654,
};

pub fn load_osrm_route_json() -> String {
    std::fs::read_to_string("./tests/data/osrm_route.json").unwrap()
}

pub fn load_osrm_no_route_json() -> String {
    std::fs::read_to_string("./tests/data/osrm_no_route.json").unwrap()
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 9, 8, 30, 0).unwrap()
}

// Good enough for a few km, we only need points at a known distance.
pub fn offset(from: Coordinate, north_meters: f64, east_meters: f64) -> Coordinate {
    let meters_per_degree = EARTH_RADIUS.to_radians();
    Coordinate::new(
        from.latitude + north_meters / meters_per_degree,
        from.longitude + east_meters / (meters_per_degree * from.latitude.to_radians().cos()),
    )
}

pub fn sample(coordinate: Coordinate) -> LocationSample {
    LocationSample::at(coordinate)
}

// Points evenly spread between `from` and `to`, `to` excluded.
pub fn interpolate(from: Coordinate, to: Coordinate, count: usize) -> Vec<Coordinate> {
    (0..count)
        .map(|i| {
            let t = i as f64 / count as f64;
            Coordinate::new(
                from.latitude + (to.latitude - from.latitude) * t,
                from.longitude + (to.longitude - from.longitude) * t,
            )
        })
        .collect()
}

pub enum FakeReply {
    Json(String),
    Fail(String),
}

pub struct FakeRoutingService {
    reply: FakeReply,
    calls: AtomicUsize,
}

impl FakeRoutingService {
    pub fn json(json: String) -> Self {
        FakeRoutingService {
            reply: FakeReply::Json(json),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        FakeRoutingService {
            reply: FakeReply::Fail(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RoutingService for FakeRoutingService {
    async fn request_route(
        &self,
        _start: Coordinate,
        _destination: Coordinate,
    ) -> Result<RouteResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            FakeReply::Json(json) => RouteResponse::from_json(json),
            FakeReply::Fail(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}
