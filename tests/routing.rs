pub mod test_utils;

use assert_float_eq::assert_float_absolute_eq;
use geotrip_core::config::TripConfig;
use geotrip_core::geo_utils::{distance, Coordinate};
use geotrip_core::routing::osrm::{OsrmRoutingService, RouteResponse};
use geotrip_core::routing::{Maneuver, RouteOutcome, RouteProviderClient};
use std::time::Duration;
use test_utils::{
    load_osrm_no_route_json, load_osrm_route_json, FakeRoutingService, DESTINATION, PICKUP,
};

fn client(service: FakeRoutingService) -> RouteProviderClient<FakeRoutingService> {
    RouteProviderClient::new(service, &TripConfig::default()).unwrap()
}

#[test]
fn parse_osrm_route() {
    let route = RouteResponse::from_json(&load_osrm_route_json())
        .unwrap()
        .into_route()
        .unwrap();

    assert_eq!(route.steps.len(), 5);
    assert_eq!(
        route
            .steps
            .iter()
            .map(|s| s.maneuver)
            .collect::<Vec<_>>(),
        vec![
            Maneuver::Depart,
            Maneuver::TurnLeft,
            Maneuver::TurnRight,
            Maneuver::Straight,
            Maneuver::Arrive
        ]
    );
    assert_eq!(route.steps[0].instruction, "Depart onto Broadway");
    assert_eq!(route.steps[1].instruction, "Turn left onto Bowery");
    assert_eq!(route.steps[3].instruction, "Continue straight onto Park Avenue");
    assert_eq!(route.steps[4].instruction, "Arrive at destination");
    assert_eq!(route.steps[1].coordinate, Coordinate::new(40.723, -74.002));
    assert_eq!(route.total_distance_meters, 8530.2);
    assert_eq!(route.total_duration_seconds, 1030.0);
    assert_eq!(route.geometry.len(), 8);
    assert_eq!(route.geometry[0], PICKUP);
    assert_eq!(route.geometry[7], DESTINATION);
}

#[test]
fn primary_route() {
    let client = client(FakeRoutingService::json(load_osrm_route_json()));
    let outcome = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, false));
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.degraded_reason(), None);
    assert_eq!(outcome.route().steps.len(), 5);
    assert_eq!(outcome.route().total_duration_seconds, 1030.0);
    assert_eq!(client.service().calls(), 1);
}

#[test]
fn traffic_adjustment() {
    let client = client(FakeRoutingService::json(load_osrm_route_json()));
    let route = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, true)).into_route();
    assert_float_absolute_eq!(route.total_duration_seconds, 1236.0, 1e-9);
    assert_float_absolute_eq!(route.steps[1].duration_seconds, 384.0, 1e-9);
    // distances are untouched
    assert_eq!(route.total_distance_meters, 8530.2);
}

#[test]
fn custom_traffic_multiplier() {
    let config = TripConfig {
        traffic_multiplier: 1.5,
        ..TripConfig::default()
    };
    let client =
        RouteProviderClient::new(FakeRoutingService::json(load_osrm_route_json()), &config)
            .unwrap();
    let route = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, true)).into_route();
    assert_float_absolute_eq!(route.total_duration_seconds, 1545.0, 1e-9);
}

fn assert_fallback(outcome: &RouteOutcome, start: Coordinate, destination: Coordinate) {
    assert!(outcome.is_degraded());
    let route = outcome.route();
    let expected_distance = distance(&start, &destination);
    assert_eq!(route.steps.len(), 2);
    assert_eq!(route.steps[0].maneuver, Maneuver::Depart);
    assert_eq!(route.steps[0].coordinate, start);
    assert_eq!(route.steps[1].maneuver, Maneuver::Arrive);
    assert_eq!(route.steps[1].coordinate, destination);
    assert_eq!(route.geometry, vec![start, destination]);
    assert_float_absolute_eq!(route.total_distance_meters, expected_distance, 1e-6);
    // 60 km/h: one minute per kilometer
    assert_float_absolute_eq!(
        route.total_duration_seconds,
        expected_distance / 1000.0 * 60.0,
        1e-6
    );
}

#[test]
fn fallback_when_service_fails() {
    let client = client(FakeRoutingService::failing("connection refused"));
    let outcome = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, false));
    assert_fallback(&outcome, PICKUP, DESTINATION);
    assert!(outcome.degraded_reason().unwrap().contains("connection refused"));
    // no retries
    assert_eq!(client.service().calls(), 1);
}

#[test]
fn fallback_on_no_route() {
    let client = client(FakeRoutingService::json(load_osrm_no_route_json()));
    let outcome = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, false));
    assert_fallback(&outcome, PICKUP, DESTINATION);
    assert!(outcome.degraded_reason().unwrap().contains("NoRoute"));
}

#[test]
fn fallback_on_empty_routes() {
    let client = client(FakeRoutingService::json(
        r#"{"code": "Ok", "routes": []}"#.to_string(),
    ));
    let outcome = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, false));
    assert_fallback(&outcome, PICKUP, DESTINATION);
}

#[test]
fn fallback_on_malformed_response() {
    for json in [
        "<html>502 Bad Gateway</html>",
        r#"{"code": "Ok", "routes": [{"distance": 10.0}]}"#,
        r#"{"code": "Ok", "routes": [{"distance": 10.0, "duration": 2.0,
            "geometry": {"coordinates": [[-74.0]]},
            "legs": [{"distance": 10.0, "duration": 2.0, "steps": [
                {"distance": 10.0, "duration": 2.0, "maneuver": {"type": "depart", "location": [-74.0, 40.7]}}
            ]}]}]}"#,
        r#"{"code": "Ok", "routes": [{"distance": 10.0, "duration": 2.0,
            "geometry": {"coordinates": []},
            "legs": [{"distance": 10.0, "duration": 2.0, "steps": []}]}]}"#,
    ] {
        let client = client(FakeRoutingService::json(json.to_string()));
        let outcome = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, false));
        assert_fallback(&outcome, PICKUP, DESTINATION);
    }
}

#[test]
fn fallback_ignores_traffic_adjustment() {
    let client = client(FakeRoutingService::failing("timeout"));
    let adjusted = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, true));
    let plain = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, false));
    assert_eq!(adjusted, plain);
}

#[test]
fn fallback_uses_configured_speed() {
    let config = TripConfig {
        fallback_speed_kmh: 30.0,
        ..TripConfig::default()
    };
    let client =
        RouteProviderClient::new(FakeRoutingService::failing("offline"), &config).unwrap();
    let route = pollster::block_on(client.fetch_route(PICKUP, DESTINATION, false)).into_route();
    let d = distance(&PICKUP, &DESTINATION);
    assert_float_absolute_eq!(route.total_duration_seconds, d / 1000.0 * 120.0, 1e-6);
}

#[test]
fn fallback_for_identical_points() {
    let client = client(FakeRoutingService::failing("offline"));
    let route = pollster::block_on(client.fetch_route(PICKUP, PICKUP, false)).into_route();
    assert_eq!(route.total_distance_meters, 0.0);
    assert_eq!(route.total_duration_seconds, 0.0);
}

#[tokio::test]
async fn unreachable_osrm_server_degrades() {
    // nothing listens on the discard port
    let service = OsrmRoutingService::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let client = RouteProviderClient::new(service, &TripConfig::default()).unwrap();
    let outcome = client.fetch_route(PICKUP, DESTINATION, true).await;
    assert_fallback(&outcome, PICKUP, DESTINATION);
}

#[test]
fn client_rejects_invalid_config() {
    let stopped = TripConfig {
        fallback_speed_kmh: 0.0,
        ..TripConfig::default()
    };
    assert!(RouteProviderClient::new(FakeRoutingService::failing("offline"), &stopped).is_err());

    let faster_than_free_flow = TripConfig {
        traffic_multiplier: 0.5,
        ..TripConfig::default()
    };
    assert!(RouteProviderClient::new(
        FakeRoutingService::json(load_osrm_route_json()),
        &faster_than_free_flow
    )
    .is_err());

    let no_server = TripConfig {
        routing_base_url: String::new(),
        ..TripConfig::default()
    };
    assert!(RouteProviderClient::from_config(&no_server).is_err());
}
