//! Domain types for delivery routes and routing solutions.
//!
//! `Route` and `Stop` are the persisted shapes; `RoutingSolution` is the
//! ephemeral, identity-free result of a provider solve and must be
//! reconciled back onto stops before anything is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A delivery address plus the contact number attached to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub house_number: String,
    pub city: String,
    pub district: String,
    /// Postal/area code, used as the zone-delay lookup key.
    pub zone_code: String,
    pub phone: String,
}

/// A geocoded waypoint: the address plus its resolved coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub address: Address,
    pub lat: f64,
    pub lon: f64,
}

impl Waypoint {
    pub fn new(address: Address, lat: f64, lon: f64) -> Self {
        Self { address, lat, lon }
    }

    pub fn coordinate(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

/// One shipment leg of a route, carrying stable identity (`gsin`).
///
/// Metrics and times are zero/absent until the first provider solve fills
/// them in. Once `delivered` is set the stop is moved out of the pending
/// sequence and never written again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Stable shipment identifier, unique within a route.
    pub gsin: String,
    pub departure: Waypoint,
    pub arrival: Waypoint,
    pub length_in_meters: i64,
    pub travel_time_in_seconds: i64,
    pub traffic_delay_in_seconds: i64,
    pub traffic_length_in_meters: i64,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Whether the imminent-arrival notice has already been sent.
    pub notified: bool,
}

impl Stop {
    /// A fresh, unsolved stop.
    pub fn new(gsin: impl Into<String>, departure: Waypoint, arrival: Waypoint) -> Self {
        Self {
            gsin: gsin.into(),
            departure,
            arrival,
            length_in_meters: 0,
            travel_time_in_seconds: 0,
            traffic_delay_in_seconds: 0,
            traffic_length_in_meters: 0,
            departure_time: None,
            arrival_time: None,
            delivered: false,
            delivered_at: None,
            notified: false,
        }
    }
}

/// Aggregate metrics over the current pending sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub start_address: Address,
    pub end_address: Address,
    pub length_in_meters: i64,
    pub travel_time_in_seconds: i64,
    pub traffic_delay_in_seconds: i64,
    pub traffic_length_in_meters: i64,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
}

/// Route lifecycle phase. No transitions out of `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutePhase {
    Active,
    Complete,
}

/// A multi-stop delivery route.
///
/// `pending` is ordered (current best travel sequence); `delivered` is
/// append-only. Every gsin lives in exactly one of the two collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Route/trace identifier, unique per created route.
    pub ginc: String,
    /// Lookup key for "today's active route" during arrival detection.
    pub date_key: String,
    pub summary: RouteSummary,
    pub pending: Vec<Stop>,
    pub delivered: Vec<Stop>,
    pub phase: RoutePhase,
}

impl Route {
    /// Total number of stops across both partitions.
    pub fn stop_count(&self) -> usize {
        self.pending.len() + self.delivered.len()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == RoutePhase::Complete
    }
}

/// Summary block of a provider solution.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionSummary {
    pub length_in_meters: i64,
    pub travel_time_in_seconds: i64,
    pub traffic_delay_in_seconds: i64,
    pub traffic_length_in_meters: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

/// One provider-returned segment between two consecutive coordinates.
///
/// Carries positional endpoints only; identity is re-attached during
/// reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedLeg {
    pub departure: (f64, f64),
    pub arrival: (f64, f64),
    pub length_in_meters: i64,
    pub travel_time_in_seconds: i64,
    pub traffic_delay_in_seconds: i64,
    pub traffic_length_in_meters: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

/// Normalized result of one provider solve. Never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingSolution {
    pub summary: SolutionSummary,
    pub legs: Vec<SolvedLeg>,
}

/// A raw device position report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
}
