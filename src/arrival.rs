//! Arrival detection from device position reports.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::haversine;
use crate::model::{PositionReport, Route};

/// Outcome of evaluating one position report against a route.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationDecision {
    /// The report plausibly is the courier standing at the next stop.
    Confirm {
        gsin: String,
        delivered_at: DateTime<Utc>,
    },
    NoMatch,
}

/// Decides whether a position report counts as a physical arrival at the
/// next pending stop.
///
/// Only the first undelivered stop is ever considered: a report near a
/// later stop cannot confirm it while an earlier one remains pending, so
/// driving past a future stop never marks it delivered out of order.
#[derive(Debug, Clone)]
pub struct ArrivalDetector {
    /// Maximum distance from the stop's arrival coordinate, in meters.
    pub proximity_m: f64,
    /// Maximum deviation from the stop's estimated arrival time, either way.
    pub time_window: Duration,
}

impl Default for ArrivalDetector {
    fn default() -> Self {
        Self {
            proximity_m: 30.0,
            time_window: Duration::seconds(600),
        }
    }
}

impl ArrivalDetector {
    pub fn new(proximity_m: f64, time_window: Duration) -> Self {
        Self {
            proximity_m,
            time_window,
        }
    }

    /// Evaluate one report against the route's first pending stop.
    pub fn evaluate(&self, route: &Route, report: &PositionReport) -> ConfirmationDecision {
        let Some(stop) = route.pending.first() else {
            return ConfirmationDecision::NoMatch;
        };
        // A stop that was never solved has no arrival estimate to test.
        let Some(arrival_time) = stop.arrival_time else {
            return ConfirmationDecision::NoMatch;
        };

        let dist = haversine::distance_m((report.lat, report.lon), stop.arrival.coordinate());
        if dist > self.proximity_m {
            return ConfirmationDecision::NoMatch;
        }

        let deviation = report.timestamp.signed_duration_since(arrival_time);
        if deviation > self.time_window || deviation < -self.time_window {
            debug!(
                ginc = %route.ginc,
                gsin = %stop.gsin,
                "report inside proximity but outside time window"
            );
            return ConfirmationDecision::NoMatch;
        }

        debug!(ginc = %route.ginc, gsin = %stop.gsin, "delivery proof ok");
        ConfirmationDecision::Confirm {
            gsin: stop.gsin.clone(),
            delivered_at: report.timestamp,
        }
    }
}

/// Bounded device-identity map for the ingestion path.
///
/// Associates a lookup key (delivery address, owner id) with the reporting
/// device's MAC. Capacity-bounded with oldest-entry eviction so a long
/// running listener cannot grow it without limit. This replaces what used
/// to be a process-wide mutable map; owners inject it into their listener.
#[derive(Debug)]
pub struct DeviceRegistry {
    capacity: usize,
    entries: VecDeque<(String, String)>,
}

impl DeviceRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Derive a MAC-shaped identifier from a device IMEI: last 12
    /// characters, zero-padded, in colon-separated pairs.
    pub fn imei_to_mac(imei: &str) -> String {
        let chars: Vec<char> = imei.chars().collect();
        let start = chars.len().saturating_sub(12);
        let mut cropped: Vec<char> = chars[start..].to_vec();
        while cropped.len() < 12 {
            cropped.push('0');
        }
        cropped
            .chunks(2)
            .map(|pair| pair.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Insert or refresh a key→MAC mapping, evicting the oldest entry when
    /// full.
    pub fn insert(&mut self, key: impl Into<String>, mac: impl Into<String>) {
        let key = key.into();
        let mac = mac.into();
        if let Some(existing) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = mac;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, mac));
    }

    pub fn mac_for(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, mac)| mac.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
