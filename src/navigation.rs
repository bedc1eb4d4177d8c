use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::geo_utils;
use crate::location::LocationSample;
use crate::routing::{Maneuver, Route, RouteOutcome};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NavigationState {
    pub current_step_index: usize,
    pub distance_to_next_step_meters: f64,
    pub next_instruction: String,
    pub next_maneuver: Maneuver,
    pub eta: DateTime<Utc>,
    pub remaining_distance_meters: f64,
    pub remaining_time_seconds: f64,
}

/* Turn-by-turn progress is tracked by matching every sample to the nearest
upcoming step instead of doing proper map matching. GPS jitter can put a
sample a bit ahead or behind, so we only ever scan forward from the last
matched step and never go back. This is approximate around closely spaced
steps, which is fine for what the crew needs to see.
*/
pub struct NavigationEngine {
    route: Option<Route>,
    degraded: bool,
    current_step_index: usize,
}

impl NavigationEngine {
    pub fn new() -> Self {
        NavigationEngine {
            route: None,
            degraded: false,
            current_step_index: 0,
        }
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn has_route(&self) -> bool {
        self.route.is_some()
    }

    // `true` when the current route is the straight-line fallback.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    // A new route has a new list of steps, so matching starts over.
    pub fn set_route(&mut self, outcome: RouteOutcome) {
        self.degraded = outcome.is_degraded();
        self.route = Some(outcome.into_route());
        self.current_step_index = 0;
    }

    pub fn reset(&mut self) {
        self.current_step_index = 0;
    }

    pub fn clear(&mut self) {
        self.route = None;
        self.degraded = false;
        self.current_step_index = 0;
    }

    pub fn update_location(&mut self, sample: &LocationSample) -> Option<NavigationState> {
        self.update_location_at(sample, Utc::now())
    }

    pub fn update_location_at(
        &mut self,
        sample: &LocationSample,
        now: DateTime<Utc>,
    ) -> Option<NavigationState> {
        let route = self.route.as_ref()?;
        let here = sample.coordinate();
        let upcoming = route.steps.get(self.current_step_index..)?;

        // `position_min_by` keeps the first of equal elements, so ties go to
        // the earliest step.
        let offset = upcoming
            .iter()
            .map(|step| geo_utils::distance(&here, &step.coordinate))
            .position_min_by(|a, b| a.total_cmp(b))?;
        let index = self.current_step_index + offset;
        if index != self.current_step_index {
            debug!(
                "navigation advanced from step {} to {}",
                self.current_step_index, index
            );
        }
        self.current_step_index = index;

        let step = &route.steps[index];
        let remaining = &route.steps[index..];
        let distance_to_next_step_meters = geo_utils::distance(&here, &step.coordinate);
        let remaining_distance_meters = distance_to_next_step_meters
            + remaining.iter().map(|s| s.distance_meters).sum::<f64>();
        let remaining_time_seconds = remaining.iter().map(|s| s.duration_seconds).sum::<f64>();
        // `as` saturates, so an infinite duration lands on i64::MAX and fails
        // the range check below
        let eta = TimeDelta::try_milliseconds((remaining_time_seconds * 1000.0).round() as i64)
            .and_then(|remaining| now.checked_add_signed(remaining))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Some(NavigationState {
            current_step_index: index,
            distance_to_next_step_meters,
            next_instruction: step.instruction.clone(),
            next_maneuver: step.maneuver,
            eta,
            remaining_distance_meters,
            remaining_time_seconds,
        })
    }
}
