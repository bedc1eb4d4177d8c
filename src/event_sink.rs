use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use uuid::Uuid;

use crate::geo_utils::Coordinate;
use crate::geofence::{GeofenceEvent, GeofenceEventKind};
use crate::location::LocationSample;

// Distinguishes status changes derived from geofences from the ones a crew
// member triggered by hand on the same vehicle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    Automatic,
    Manual,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub trip_id: Uuid,
    pub kind: GeofenceEventKind,
    pub timestamp: DateTime<Utc>,
    pub location: Coordinate,
    pub source: StatusSource,
}

impl DispatchRecord {
    pub fn automatic(trip_id: Uuid, event: GeofenceEvent) -> Self {
        DispatchRecord {
            trip_id,
            kind: event.kind,
            timestamp: event.timestamp,
            location: event.location,
            source: StatusSource::Automatic,
        }
    }

    pub fn manual(
        trip_id: Uuid,
        kind: GeofenceEventKind,
        timestamp: DateTime<Utc>,
        location: Coordinate,
    ) -> Self {
        DispatchRecord {
            trip_id,
            kind,
            timestamp,
            location,
            source: StatusSource::Manual,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub trip_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub speed_mps: Option<f64>,
    pub heading_degrees: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationUpdate {
    pub fn new(trip_id: Uuid, sample: &LocationSample, timestamp: DateTime<Utc>) -> Self {
        LocationUpdate {
            trip_id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy_meters: sample.accuracy_meters,
            speed_mps: sample.speed_mps,
            heading_degrees: sample.heading_degrees,
            timestamp,
        }
    }
}

/// Receiver of everything the vehicle reports to dispatch. Delivery and
/// persistence are up to the implementation.
pub trait EventSink {
    fn publish_event(&mut self, record: DispatchRecord) -> Result<()>;
    fn publish_location(&mut self, update: LocationUpdate) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SinkMessage {
    Event(DispatchRecord),
    Location(LocationUpdate),
}

impl SinkMessage {
    // the shape the real-time transport broadcasts
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub struct ChannelEventSink {
    sender: Sender<SinkMessage>,
}

pub fn channel_sink() -> (ChannelEventSink, Receiver<SinkMessage>) {
    let (sender, receiver) = mpsc::channel();
    (ChannelEventSink { sender }, receiver)
}

impl ChannelEventSink {
    fn send(&self, message: SinkMessage) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| anyhow!("event sink receiver is closed"))
    }
}

impl EventSink for ChannelEventSink {
    fn publish_event(&mut self, record: DispatchRecord) -> Result<()> {
        self.send(SinkMessage::Event(record))
    }

    fn publish_location(&mut self, update: LocationUpdate) -> Result<()> {
        self.send(SinkMessage::Location(update))
    }
}

/// Rate limits location forwarding to dispatch. Geofence events are never
/// throttled, only the periodic position reports.
pub struct TelemetryThrottle {
    interval: TimeDelta,
    last_forwarded: Option<DateTime<Utc>>,
}

impl TelemetryThrottle {
    pub fn new(interval: Duration) -> Self {
        TelemetryThrottle {
            interval: TimeDelta::from_std(interval).unwrap_or(TimeDelta::MAX),
            last_forwarded: None,
        }
    }

    pub fn should_forward(&mut self, at: DateTime<Utc>) -> bool {
        // Some platforms deliver a late batch with older timestamps. Those give
        // a negative gap here and are dropped instead of sending dispatch back
        // in time.
        let due = match self.last_forwarded {
            None => true,
            Some(last) => at - last >= self.interval,
        };
        if due {
            self.last_forwarded = Some(at);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last_forwarded = None;
    }
}
