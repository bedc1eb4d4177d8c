use geotrip_core::config::TripConfig;
use geotrip_core::event_sink::{channel_sink, SinkMessage};
use geotrip_core::geo_utils::Coordinate;
use geotrip_core::recorder;
use geotrip_core::routing::RouteProviderClient;
use geotrip_core::trip::TripSession;
use std::env;

// Replays a recorded trip:
//   cargo run --example replay -- <recording.csv> <pickup_lat> <pickup_lng> <dest_lat> <dest_lng> [config.json]
#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 6 {
        eprintln!(
            "usage: {} <recording.csv> <pickup_lat> <pickup_lng> <dest_lat> <dest_lng> [config.json]",
            args[0]
        );
        std::process::exit(1);
    }

    let samples = recorder::load_samples(&args[1])?;
    let pickup = Coordinate::new(args[2].parse()?, args[3].parse()?);
    let destination = Coordinate::new(args[4].parse()?, args[5].parse()?);
    let config = match args.get(6) {
        Some(path) => TripConfig::load(path)?,
        None => TripConfig::default(),
    };

    let (sink, receiver) = channel_sink();
    let mut trip = TripSession::new(&config, pickup, destination, Box::new(sink))?;
    let client = RouteProviderClient::from_config(&config)?;
    trip.fetch_route(&client, pickup, true).await;
    match trip.navigation().route() {
        Some(route) if trip.navigation().is_degraded() => println!(
            "routing unavailable, straight-line estimate: {:.0} m / {:.0} s",
            route.total_distance_meters, route.total_duration_seconds
        ),
        Some(route) => println!(
            "route: {} steps, {:.0} m / {:.0} s",
            route.steps.len(),
            route.total_distance_meters,
            route.total_duration_seconds
        ),
        None => println!("no route"),
    }

    for sample in &samples {
        let outcome = trip.handle_sample(sample);
        if let Some(state) = outcome.navigation {
            println!(
                "[{:>3}] {:<45} in {:>6.0} m, remaining {:>6.0} m, eta {}",
                state.current_step_index,
                state.next_instruction,
                state.distance_to_next_step_meters,
                state.remaining_distance_meters,
                state.eta.format("%H:%M:%S")
            );
        }
        for message in receiver.try_iter() {
            if let SinkMessage::Event(_) = message {
                println!("  -> {}", message.to_json()?);
            }
        }
    }
    trip.end()?;
    Ok(())
}
