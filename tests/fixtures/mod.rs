//! Test fixtures for eta-tracker.
//!
//! Mock implementations of the external seams (routing provider,
//! persistence, notification sink) plus stop/route builders over a small
//! set of real Milan locations.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use eta_tracker::error::{NotificationError, PersistenceError, ProviderError};
use eta_tracker::model::{
    Address, PositionReport, Route, RoutingSolution, SolutionSummary, SolvedLeg, Stop, Waypoint,
};
use eta_tracker::traits::{NotificationKind, NotificationSink, RoutePersistence, RoutingProvider};

// ============================================================================
// Locations (central Milan, well separated)
// ============================================================================

pub const DEPOT: (f64, f64) = (45.4600, 9.1900);
pub const STOP_A: (f64, f64) = (45.4700, 9.2100);
pub const STOP_B: (f64, f64) = (45.4800, 9.1700);
pub const STOP_C: (f64, f64) = (45.4500, 9.2300);

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
}

// ============================================================================
// Builders
// ============================================================================

pub fn address(label: &str, zone: &str) -> Address {
    Address {
        street: label.to_string(),
        house_number: "1".to_string(),
        city: "Milano".to_string(),
        district: "MI".to_string(),
        zone_code: zone.to_string(),
        phone: format!("+3933300{zone}"),
    }
}

pub fn stop(gsin: &str, dep: (f64, f64), dep_zone: &str, arr: (f64, f64), arr_zone: &str) -> Stop {
    Stop::new(
        gsin,
        Waypoint::new(address(&format!("{gsin}-dep"), dep_zone), dep.0, dep.1),
        Waypoint::new(address(&format!("{gsin}-arr"), arr_zone), arr.0, arr.1),
    )
}

/// Depot -> A -> B chain with distinct zone codes.
pub fn two_stop_list() -> Vec<Stop> {
    vec![
        stop("s-a", DEPOT, "20100", STOP_A, "20121"),
        stop("s-b", STOP_A, "20121", STOP_B, "20154"),
    ]
}

/// Depot -> A -> B -> C chain.
pub fn three_stop_list() -> Vec<Stop> {
    vec![
        stop("s-a", DEPOT, "20100", STOP_A, "20121"),
        stop("s-b", STOP_A, "20121", STOP_B, "20154"),
        stop("s-c", STOP_B, "20154", STOP_C, "20136"),
    ]
}

pub fn report_at(position: (f64, f64), offset_secs: i64) -> PositionReport {
    PositionReport {
        lat: position.0,
        lon: position.1,
        timestamp: base_time() + Duration::seconds(offset_secs),
    }
}

// ============================================================================
// Mock routing provider
// ============================================================================

pub const LEG_TRAVEL_SECS: i64 = 600;

/// Deterministic provider: legs run between consecutive request
/// coordinates, each taking [`LEG_TRAVEL_SECS`], departing at the fixed
/// base time. In `reversing` mode a best-order solve visits the drops in
/// reverse, which exercises reconciliation.
pub struct MockProvider {
    reversing: bool,
    legless: bool,
    pub calls: Mutex<Vec<bool>>,
    fail_after: Mutex<Option<usize>>,
}

impl MockProvider {
    pub fn ordered() -> Self {
        Self {
            reversing: false,
            legless: false,
            calls: Mutex::new(Vec::new()),
            fail_after: Mutex::new(None),
        }
    }

    pub fn reversing() -> Self {
        Self {
            reversing: true,
            ..Self::ordered()
        }
    }

    /// Answer every solve with a summary but an empty leg list.
    pub fn legless() -> Self {
        Self {
            legless: true,
            ..Self::ordered()
        }
    }

    /// Succeed for the first `calls` solves, then fail every solve.
    pub fn fail_after(self, calls: usize) -> Self {
        *self.fail_after.lock().unwrap() = Some(calls);
        self
    }

    pub fn call_flags(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl RoutingProvider for MockProvider {
    fn solve(
        &self,
        coordinates: &[(f64, f64)],
        allow_reorder: bool,
    ) -> Result<RoutingSolution, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(allow_reorder);
        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if calls.len() > limit {
                return Err(ProviderError::InvalidResponse(
                    "mock provider outage".to_string(),
                ));
            }
        }

        if self.legless {
            return Ok(RoutingSolution {
                summary: SolutionSummary {
                    length_in_meters: 0,
                    travel_time_in_seconds: 0,
                    traffic_delay_in_seconds: 0,
                    traffic_length_in_meters: 0,
                    departure_time: base_time(),
                    arrival_time: base_time(),
                },
                legs: Vec::new(),
            });
        }

        let mut chain: Vec<(f64, f64)> = coordinates.to_vec();
        if allow_reorder && self.reversing && chain.len() > 2 {
            chain[1..].reverse();
        }

        let legs: Vec<SolvedLeg> = chain
            .windows(2)
            .enumerate()
            .map(|(i, pair)| SolvedLeg {
                departure: pair[0],
                arrival: pair[1],
                length_in_meters: 1000,
                travel_time_in_seconds: LEG_TRAVEL_SECS,
                traffic_delay_in_seconds: 30,
                traffic_length_in_meters: 100,
                departure_time: base_time() + Duration::seconds(i as i64 * LEG_TRAVEL_SECS),
                arrival_time: base_time() + Duration::seconds((i as i64 + 1) * LEG_TRAVEL_SECS),
            })
            .collect();

        let arrival_time = legs
            .last()
            .map(|l| l.arrival_time)
            .unwrap_or_else(base_time);
        Ok(RoutingSolution {
            summary: SolutionSummary {
                length_in_meters: legs.iter().map(|l| l.length_in_meters).sum(),
                travel_time_in_seconds: legs.iter().map(|l| l.travel_time_in_seconds).sum(),
                traffic_delay_in_seconds: legs.iter().map(|l| l.traffic_delay_in_seconds).sum(),
                traffic_length_in_meters: legs.iter().map(|l| l.traffic_length_in_meters).sum(),
                departure_time: base_time(),
                arrival_time,
            },
            legs,
        })
    }
}

// ============================================================================
// Mock persistence
// ============================================================================

#[derive(Default)]
pub struct MemStore {
    routes: Mutex<HashMap<String, Route>>,
    pub replace_count: Mutex<usize>,
    pub fail_replace: Mutex<bool>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replaces(&self) -> usize {
        *self.replace_count.lock().unwrap()
    }

    pub fn set_fail_replace(&self, fail: bool) {
        *self.fail_replace.lock().unwrap() = fail;
    }
}

impl RoutePersistence for MemStore {
    fn get(&self, ginc: &str) -> Result<Option<Route>, PersistenceError> {
        Ok(self.routes.lock().unwrap().get(ginc).cloned())
    }

    fn get_active_by_key(&self, date_key: &str) -> Result<Option<Route>, PersistenceError> {
        Ok(self
            .routes
            .lock()
            .unwrap()
            .values()
            .find(|r| r.date_key == date_key && !r.is_complete())
            .cloned())
    }

    fn create(&self, route: &Route) -> Result<(), PersistenceError> {
        self.routes
            .lock()
            .unwrap()
            .insert(route.ginc.clone(), route.clone());
        Ok(())
    }

    fn replace(&self, route: &Route) -> Result<(), PersistenceError> {
        if *self.fail_replace.lock().unwrap() {
            return Err(PersistenceError::new("mock store write failure"));
        }
        *self.replace_count.lock().unwrap() += 1;
        self.routes
            .lock()
            .unwrap()
            .insert(route.ginc.clone(), route.clone());
        Ok(())
    }

    fn delete(&self, ginc: &str) -> Result<(), PersistenceError> {
        self.routes.lock().unwrap().remove(ginc);
        Ok(())
    }
}

// ============================================================================
// Mock notification sink
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<(String, NotificationKind)>>,
    pub fail: Mutex<bool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn sent_of(&self, kind: NotificationKind) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(gsin, _)| gsin.clone())
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, stop: &Stop, kind: NotificationKind) -> Result<(), NotificationError> {
        if *self.fail.lock().unwrap() {
            return Err(NotificationError::new("mock sms gateway down"));
        }
        self.sent.lock().unwrap().push((stop.gsin.clone(), kind));
        Ok(())
    }
}
