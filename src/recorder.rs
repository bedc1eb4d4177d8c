use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::geofence::GeofenceEventKind;
use crate::location::LocationSample;

/* This is an optional debugging aid, off by default: every sample a trip
   sees is written to a csv file together with the geofence event it caused.
   Recordings can be fed back with `load_samples` to replay a trip. It is not
   a storage layer, dispatch records go to the event sink.
*/
#[derive(Debug, Serialize, Deserialize)]
struct Row {
    timestamp_ms: Option<i64>,
    latitude: f64,
    longitude: f64,
    accuracy_meters: f64,
    speed_mps: Option<f64>,
    heading_degrees: Option<f64>,
    event: Option<GeofenceEventKind>,
}

pub struct TripRecorder {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl TripRecorder {
    pub fn create(dir: &Path, trip_id: Uuid) -> Result<TripRecorder> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create recorder dir: {}", dir.display()))?;
        let mut i = 0;
        let path = loop {
            let path = dir.join(format!("trip-{}-{}.csv", trip_id, i));
            if std::fs::metadata(&path).is_err() {
                break path;
            }
            i += 1;
        };
        let writer = csv::Writer::from_path(&path)?;
        info!("recording trip to {}", path.display());
        Ok(TripRecorder { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(
        &mut self,
        sample: &LocationSample,
        event: Option<GeofenceEventKind>,
    ) -> Result<()> {
        self.writer.serialize(Row {
            timestamp_ms: sample.timestamp_ms,
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy_meters: sample.accuracy_meters,
            speed_mps: sample.speed_mps,
            heading_degrees: sample.heading_degrees,
            event,
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<Vec<LocationSample>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("failed to open recording: {}", path.as_ref().display()))?;
    reader
        .deserialize::<Row>()
        .map(|row| -> Result<LocationSample> {
            let row = row?;
            Ok(LocationSample {
                latitude: row.latitude,
                longitude: row.longitude,
                accuracy_meters: row.accuracy_meters,
                speed_mps: row.speed_mps,
                heading_degrees: row.heading_degrees,
                timestamp_ms: row.timestamp_ms,
            })
        })
        .collect()
}

// Same as `load_samples` but keeps the recorded geofence events, used to
// check a replay against the original run.
pub fn load_recorded_events<P: AsRef<Path>>(path: P) -> Result<Vec<GeofenceEventKind>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut events = Vec::new();
    for row in reader.deserialize::<Row>() {
        if let Some(event) = row?.event {
            events.push(event);
        }
    }
    Ok(events)
}
