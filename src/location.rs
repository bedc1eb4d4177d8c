use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;
use uuid::Uuid;

use crate::geo_utils::Coordinate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub speed_mps: Option<f64>,
    pub heading_degrees: Option<f64>,
    // device time, absent on some platforms
    pub timestamp_ms: Option<i64>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64) -> Self {
        LocationSample {
            latitude,
            longitude,
            accuracy_meters,
            speed_mps: None,
            heading_degrees: None,
            timestamp_ms: None,
        }
    }

    pub fn at(coordinate: Coordinate) -> Self {
        Self::new(coordinate.latitude, coordinate.longitude, 5.0)
    }

    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/* The location source (device GPS bridge) pushes samples through a
`LocationFeed`, the core consumes them from the matching `TrackingSession`.
There is no process wide "current watch": every trip owns its session and
passes it around explicitly. Once the session is stopped or dropped, `push`
starts failing and the source is expected to clear its watch.
*/
pub struct LocationFeed {
    watch_id: Uuid,
    sender: Sender<LocationSample>,
}

impl LocationFeed {
    pub fn watch_id(&self) -> Uuid {
        self.watch_id
    }

    pub fn push(&self, sample: LocationSample) -> Result<()> {
        self.sender
            .send(sample)
            .map_err(|_| anyhow!("tracking session {} is no longer active", self.watch_id))
    }
}

pub struct TrackingSession {
    watch_id: Uuid,
    receiver: Option<Receiver<LocationSample>>,
    last_sample: Option<LocationSample>,
}

pub fn start_tracking() -> (LocationFeed, TrackingSession) {
    let watch_id = Uuid::new_v4();
    let (sender, receiver) = mpsc::channel();
    info!("location watch registered: {}", watch_id);
    (
        LocationFeed { watch_id, sender },
        TrackingSession {
            watch_id,
            receiver: Some(receiver),
            last_sample: None,
        },
    )
}

impl TrackingSession {
    pub fn watch_id(&self) -> Uuid {
        self.watch_id
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn last_sample(&self) -> Option<&LocationSample> {
        self.last_sample.as_ref()
    }

    // Returns the next sample that has already been pushed, without waiting.
    pub fn next_pending(&mut self) -> Option<LocationSample> {
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(sample) => {
                self.last_sample = Some(sample.clone());
                Some(sample)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                debug!("location feed for {} is gone", self.watch_id);
                None
            }
        }
    }

    // Waits for the source to push a sample. `None` on timeout or when the
    // source went away, which is the expected degraded mode when the device
    // has no GPS fix or permission.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<LocationSample> {
        let receiver = self.receiver.as_ref()?;
        match receiver.recv_timeout(timeout) {
            Ok(sample) => {
                self.last_sample = Some(sample.clone());
                Some(sample)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn drain_pending(&mut self) -> Vec<LocationSample> {
        let mut samples = Vec::new();
        while let Some(sample) = self.next_pending() {
            samples.push(sample);
        }
        samples
    }

    pub fn stop(&mut self) {
        if self.receiver.take().is_some() {
            info!("location watch cleared: {}", self.watch_id);
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.stop();
    }
}
