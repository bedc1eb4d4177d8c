use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::geo_utils::{self, Coordinate};
use crate::location::LocationSample;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeofenceZone {
    pub name: String,
    pub center: Coordinate,
    pub radius_meters: f64,
}

impl GeofenceZone {
    pub fn new(name: &str, center: Coordinate, radius_meters: f64) -> Result<Self> {
        let zone = GeofenceZone {
            name: name.to_string(),
            center,
            radius_meters,
        };
        zone.validate()?;
        Ok(zone)
    }

    // A zone with a non-positive radius contains nothing and would silently
    // never fire.
    pub fn validate(&self) -> Result<()> {
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            bail!(
                "zone `{}` has invalid radius {}",
                self.name,
                self.radius_meters
            );
        }
        if !self.center.latitude.is_finite() || !self.center.longitude.is_finite() {
            bail!("zone `{}` has a non-finite center", self.name);
        }
        Ok(())
    }

    pub fn distance_from(&self, point: &Coordinate) -> f64 {
        geo_utils::distance(&self.center, point)
    }

    // the boundary itself counts as inside
    pub fn contains(&self, point: &Coordinate) -> bool {
        self.distance_from(point) <= self.radius_meters
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeofenceStatus {
    pub pickup_entered: bool,
    pub pickup_exited: bool,
    pub destination_entered: bool,
    pub destination_exited: bool,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeofenceEventKind {
    EnRouteToDestination,
    ArrivedAtDestinationFacility,
    DepartedDestinationFacility,
    FinalArrival,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub kind: GeofenceEventKind,
    pub timestamp: DateTime<Utc>,
    pub location: Coordinate,
}

/// Edge-triggered tracker for the pickup and destination zones of one trip.
///
/// Every sample is checked against the rules below and the first one that
/// matches wins, so a single sample yields at most one event:
///
/// 1. inside pickup, not yet entered: mark entered (silent)
/// 2. outside pickup after entering it: mark exited, `EnRouteToDestination`
/// 3. inside destination after leaving pickup: `ArrivedAtDestinationFacility`
/// 4. outside destination after arriving: `DepartedDestinationFacility`
/// 5. inside destination after departing: `FinalArrival`, and clear the
///    departed flag so another departure/return cycle can fire again
///
/// Emitted events are queued until the sink drains them.
pub struct GeofenceTracker {
    pickup: GeofenceZone,
    destination: GeofenceZone,
    status: GeofenceStatus,
    pending_events: VecDeque<GeofenceEvent>,
}

impl GeofenceTracker {
    pub fn new(pickup: GeofenceZone, destination: GeofenceZone) -> Result<Self> {
        pickup.validate()?;
        destination.validate()?;
        Ok(GeofenceTracker {
            pickup,
            destination,
            status: GeofenceStatus::default(),
            pending_events: VecDeque::new(),
        })
    }

    pub fn pickup(&self) -> &GeofenceZone {
        &self.pickup
    }

    pub fn destination(&self) -> &GeofenceZone {
        &self.destination
    }

    pub fn status(&self) -> GeofenceStatus {
        self.status
    }

    pub fn process_sample(&mut self, sample: &LocationSample) -> Option<GeofenceEvent> {
        self.process_sample_at(sample, Utc::now())
    }

    pub fn process_sample_at(
        &mut self,
        sample: &LocationSample,
        now: DateTime<Utc>,
    ) -> Option<GeofenceEvent> {
        let location = sample.coordinate();
        let inside_pickup = self.pickup.contains(&location);
        let inside_destination = self.destination.contains(&location);
        let status = &mut self.status;

        let kind = if inside_pickup && !status.pickup_entered {
            status.pickup_entered = true;
            info!("entered pickup zone `{}`", self.pickup.name);
            None
        } else if !inside_pickup && status.pickup_entered && !status.pickup_exited {
            status.pickup_exited = true;
            Some(GeofenceEventKind::EnRouteToDestination)
        } else if inside_destination && !status.destination_entered && status.pickup_exited {
            status.destination_entered = true;
            Some(GeofenceEventKind::ArrivedAtDestinationFacility)
        } else if !inside_destination && status.destination_entered && !status.destination_exited
        {
            status.destination_exited = true;
            Some(GeofenceEventKind::DepartedDestinationFacility)
        } else if inside_destination && status.destination_exited {
            // NOTE: `destination_entered` stays set, so leaving again reports
            // another departure. A crew may step out and come back to the
            // same facility during one trip.
            status.destination_exited = false;
            Some(GeofenceEventKind::FinalArrival)
        } else {
            None
        };

        let event = GeofenceEvent {
            kind: kind?,
            timestamp: now,
            location,
        };
        info!(
            "geofence event: {} at ({}, {})",
            event.kind, location.latitude, location.longitude
        );
        self.pending_events.push_back(event.clone());
        Some(event)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    // Hands every queued event over to the caller, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = GeofenceEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn distance_to_pickup(&self, sample: &LocationSample) -> f64 {
        self.pickup.distance_from(&sample.coordinate())
    }

    pub fn distance_to_destination(&self, sample: &LocationSample) -> f64 {
        self.destination.distance_from(&sample.coordinate())
    }

    pub fn reset(&mut self) {
        self.status = GeofenceStatus::default();
        self.pending_events.clear();
    }
}
