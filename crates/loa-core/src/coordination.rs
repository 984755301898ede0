//! Per-aircraft exit coordination proposals.
//!
//! Tracks manually coordinated exit altitudes and change-over points so
//! the display layer can keep showing an accepted value after the host
//! clears the live request state. Entries are dropped together with the
//! aircraft's cache entry.

use std::collections::HashMap;

/// State of one coordination request as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinationStatus {
    #[default]
    None,
    RequestedByMe,
    RequestedByOther,
    Accepted,
    Refused,
}

impl CoordinationStatus {
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            CoordinationStatus::RequestedByMe | CoordinationStatus::RequestedByOther
        )
    }
}

/// Remembered coordination values for one aircraft.
#[derive(Debug, Clone, Default)]
pub struct CoordinationState {
    pub exit_altitude_ft: Option<i32>,
    pub exit_altitude_status: CoordinationStatus,
    pub exit_point: Option<String>,
    pub exit_point_status: CoordinationStatus,
}

#[derive(Debug, Default)]
pub struct CoordinationLedger {
    entries: HashMap<String, CoordinationState>,
}

impl CoordinationLedger {
    pub fn get(&self, aircraft_id: &str) -> Option<&CoordinationState> {
        self.entries.get(aircraft_id)
    }

    /// Record a live exit-altitude request.
    pub fn note_exit_altitude(&mut self, aircraft_id: &str, altitude_ft: i32, status: CoordinationStatus) {
        let state = self.entries.entry(aircraft_id.to_string()).or_default();
        state.exit_altitude_ft = Some(altitude_ft);
        state.exit_altitude_status = status;
    }

    /// Record a live exit-point request.
    pub fn note_exit_point(&mut self, aircraft_id: &str, point: &str, status: CoordinationStatus) {
        let state = self.entries.entry(aircraft_id.to_string()).or_default();
        state.exit_point = Some(point.to_string());
        state.exit_point_status = status;
    }

    /// The host reports the request state cleared. A pending request
    /// whose value still matches was accepted by the other side.
    pub fn settle_exit_altitude(&mut self, aircraft_id: &str, altitude_ft: i32) {
        if let Some(state) = self.entries.get_mut(aircraft_id) {
            if state.exit_altitude_status.is_pending() && state.exit_altitude_ft == Some(altitude_ft)
            {
                state.exit_altitude_status = CoordinationStatus::Accepted;
            }
        }
    }

    pub fn settle_exit_point(&mut self, aircraft_id: &str, point: &str) {
        if let Some(state) = self.entries.get_mut(aircraft_id) {
            if state.exit_point_status.is_pending()
                && state.exit_point.as_deref() == Some(point)
            {
                state.exit_point_status = CoordinationStatus::Accepted;
            }
        }
    }

    pub fn evict(&mut self, aircraft_id: &str) {
        self.entries.remove(aircraft_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
