use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

use crate::config::TripConfig;
use crate::event_sink::{DispatchRecord, EventSink, LocationUpdate, TelemetryThrottle};
use crate::geo_utils::Coordinate;
use crate::geofence::{GeofenceEvent, GeofenceEventKind, GeofenceTracker, GeofenceZone};
use crate::location::{LocationSample, TrackingSession};
use crate::navigation::{NavigationEngine, NavigationState};
use crate::recorder::TripRecorder;
use crate::routing::{RouteOutcome, RouteProviderClient, RoutingService};

pub const PICKUP_ZONE_NAME: &str = "pickup";
pub const DESTINATION_ZONE_NAME: &str = "destination";

// Identifies one route request. Only the result of the latest request of a
// trip that is still running gets installed, anything else is dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteTicket {
    generation: u64,
    pub from: Coordinate,
    pub to: Coordinate,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleOutcome {
    pub event: Option<GeofenceEvent>,
    pub navigation: Option<NavigationState>,
    pub location_forwarded: bool,
}

/// Everything one trip needs: both zones, the active route and the link to
/// dispatch. The geofence tracker and the navigation engine see the same
/// samples but never look at each other.
pub struct TripSession {
    id: Uuid,
    geofence: GeofenceTracker,
    navigation: NavigationEngine,
    telemetry: TelemetryThrottle,
    sink: Box<dyn EventSink + Send>,
    recorder: Option<TripRecorder>,
    route_generation: u64,
    ended: bool,
}

impl TripSession {
    pub fn new(
        config: &TripConfig,
        pickup: Coordinate,
        destination: Coordinate,
        sink: Box<dyn EventSink + Send>,
    ) -> Result<Self> {
        config.validate()?;
        let id = Uuid::new_v4();
        let radius = config.geofence_radius_meters;
        info!(
            "trip {} started: pickup=({}, {}) destination=({}, {}) radius={}m",
            id,
            pickup.latitude,
            pickup.longitude,
            destination.latitude,
            destination.longitude,
            radius
        );
        Ok(TripSession {
            id,
            geofence: GeofenceTracker::new(
                GeofenceZone::new(PICKUP_ZONE_NAME, pickup, radius)?,
                GeofenceZone::new(DESTINATION_ZONE_NAME, destination, radius)?,
            )?,
            navigation: NavigationEngine::new(),
            telemetry: TelemetryThrottle::new(config.telemetry_interval()),
            sink,
            recorder: None,
            route_generation: 0,
            ended: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn geofence(&self) -> &GeofenceTracker {
        &self.geofence
    }

    pub fn navigation(&self) -> &NavigationEngine {
        &self.navigation
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn enable_recording(&mut self, dir: &Path) -> Result<()> {
        if self.recorder.is_none() {
            self.recorder = Some(TripRecorder::create(dir, self.id)?);
        }
        Ok(())
    }

    pub fn handle_sample(&mut self, sample: &LocationSample) -> SampleOutcome {
        self.handle_sample_at(sample, Utc::now())
    }

    pub fn handle_sample_at(
        &mut self,
        sample: &LocationSample,
        now: DateTime<Utc>,
    ) -> SampleOutcome {
        if self.ended {
            debug!("trip {} already ended, sample ignored", self.id);
            return SampleOutcome::default();
        }

        let event = self.geofence.process_sample_at(sample, now);
        for event in self.geofence.drain_events() {
            let kind = event.kind;
            if let Err(e) = self
                .sink
                .publish_event(DispatchRecord::automatic(self.id, event))
            {
                error!("failed to publish geofence event {}: {:?}", kind, e);
            }
        }

        let navigation = self.navigation.update_location_at(sample, now);

        let sampled_at = sample
            .timestamp_ms
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(now);
        let location_forwarded = self.telemetry.should_forward(sampled_at);
        if location_forwarded {
            if let Err(e) = self
                .sink
                .publish_location(LocationUpdate::new(self.id, sample, sampled_at))
            {
                warn!("failed to publish location update: {:?}", e);
            }
        }

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.record(sample, event.as_ref().map(|e| e.kind)) {
                warn!("failed to record sample, recording stopped: {:?}", e);
                self.recorder = None;
            }
        }

        SampleOutcome {
            event,
            navigation,
            location_forwarded,
        }
    }

    // Processes whatever the location source pushed since the last call.
    pub fn handle_pending(&mut self, tracking: &mut TrackingSession) -> Vec<SampleOutcome> {
        tracking
            .drain_pending()
            .iter()
            .map(|sample| self.handle_sample(sample))
            .collect()
    }

    pub fn begin_route_request(&mut self, from: Coordinate) -> RouteTicket {
        self.route_generation += 1;
        RouteTicket {
            generation: self.route_generation,
            from,
            to: self.geofence.destination().center,
        }
    }

    // Returns `false` if the result was discarded because the trip ended or a
    // newer request was made in the meantime.
    pub fn complete_route_request(
        &mut self,
        ticket: RouteTicket,
        outcome: RouteOutcome,
    ) -> bool {
        if self.ended || ticket.generation != self.route_generation {
            debug!(
                "discarding stale route result (ticket {}, current {})",
                ticket.generation, self.route_generation
            );
            return false;
        }
        if let Some(reason) = outcome.degraded_reason() {
            warn!(
                "trip {} is navigating on a straight-line route: {}",
                self.id, reason
            );
        }
        self.navigation.set_route(outcome);
        true
    }

    pub async fn fetch_route<S: RoutingService>(
        &mut self,
        client: &RouteProviderClient<S>,
        from: Coordinate,
        apply_traffic_adjustment: bool,
    ) -> bool {
        let ticket = self.begin_route_request(from);
        let outcome = client
            .fetch_route(ticket.from, ticket.to, apply_traffic_adjustment)
            .await;
        self.complete_route_request(ticket, outcome)
    }

    pub fn record_manual_status(
        &mut self,
        kind: GeofenceEventKind,
        sample: &LocationSample,
    ) -> Result<()> {
        if self.ended {
            bail!("trip {} already ended", self.id);
        }
        info!("manual status change: {}", kind);
        self.sink.publish_event(DispatchRecord::manual(
            self.id,
            kind,
            Utc::now(),
            sample.coordinate(),
        ))
    }

    // Same pickup and destination, keeps the route. A fetch still in flight
    // belongs to the previous run and is dropped.
    pub fn restart(&mut self) {
        info!("trip {} restarted", self.id);
        self.route_generation += 1;
        self.geofence.reset();
        self.navigation.reset();
        self.telemetry.reset();
    }

    pub fn end(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        // invalidates any route request still in flight
        self.route_generation += 1;
        self.navigation.clear();
        info!("trip {} ended", self.id);
        if let Some(mut recorder) = self.recorder.take() {
            recorder.flush()?;
        }
        Ok(())
    }
}
