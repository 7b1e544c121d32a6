//! Route orchestration service.
//!
//! The layer an HTTP/ingestion adapter talks to. Wraps the state machine
//! with per-route mutual exclusion, the persistence round-trip and
//! notification dispatch. Every mutation follows read-compute-persist-once:
//! the route is loaded, reworked entirely in memory and written back a
//! single time, so a failed provider call or store write leaves the
//! persisted route exactly as it was.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::arrival::{ArrivalDetector, ConfirmationDecision};
use crate::delay::{DelayKeying, ZoneDelayTable};
use crate::error::RouteError;
use crate::model::{PositionReport, Route, Stop};
use crate::route::RouteStateMachine;
use crate::traits::{NotificationKind, NotificationSink, RoutePersistence, RoutingProvider};

pub struct RouteService<P, S, N> {
    provider: P,
    store: S,
    notifier: N,
    delays: ZoneDelayTable,
    keying: DelayKeying,
    detector: ArrivalDetector,
    /// How far ahead of the estimated arrival the imminent notice goes out.
    notice_horizon: Duration,
    /// One mutex per ginc. The registry lock itself is held only long
    /// enough to fetch the per-route handle, so slow provider calls under
    /// one route never block the others.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<P, S, N> RouteService<P, S, N>
where
    P: RoutingProvider,
    S: RoutePersistence,
    N: NotificationSink,
{
    pub fn new(provider: P, store: S, notifier: N, delays: ZoneDelayTable) -> Self {
        Self {
            provider,
            store,
            notifier,
            delays,
            keying: DelayKeying::default(),
            detector: ArrivalDetector::default(),
            notice_horizon: Duration::hours(1),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_keying(mut self, keying: DelayKeying) -> Self {
        self.keying = keying;
        self
    }

    pub fn with_detector(mut self, detector: ArrivalDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_notice_horizon(mut self, horizon: Duration) -> Self {
        self.notice_horizon = horizon;
        self
    }

    /// Create a route from its initial stop list and persist it.
    ///
    /// The duplicate check runs under the route's lock, before the solve,
    /// so two concurrent creates for the same ginc cannot both succeed.
    pub fn create_route(
        &self,
        ginc: &str,
        date_key: &str,
        stops: Vec<Stop>,
    ) -> Result<Route, RouteError> {
        let lock = self.lock_for(ginc);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.store.get(ginc)?.is_some() {
            return Err(RouteError::DuplicateRoute(ginc.to_string()));
        }

        let route = self.machine().create(ginc, date_key, stops)?;
        self.store.create(&route)?;
        Ok(route)
    }

    pub fn route(&self, ginc: &str) -> Result<Route, RouteError> {
        self.store
            .get(ginc)?
            .ok_or_else(|| RouteError::RouteNotFound(ginc.to_string()))
    }

    /// Delete a route. Terminal; there is no undo.
    pub fn delete_route(&self, ginc: &str) -> Result<(), RouteError> {
        let lock = self.lock_for(ginc);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.store.get(ginc)?.is_none() {
            return Err(RouteError::RouteNotFound(ginc.to_string()));
        }
        self.store.delete(ginc)?;
        // Evict the lock entry too, or the registry grows with every route
        // the process ever saw. The Arc keeps our own guard alive.
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(ginc);
        info!(ginc, "route deleted");
        Ok(())
    }

    /// Confirm a delivery, re-solve the remainder and persist.
    ///
    /// Duplicate confirmations return the stored route unchanged: no
    /// solve, no write, no notification.
    pub fn confirm_delivery(
        &self,
        ginc: &str,
        gsin: &str,
        delivered_at: DateTime<Utc>,
    ) -> Result<Route, RouteError> {
        let lock = self.lock_for(ginc);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.confirm_locked(ginc, gsin, delivered_at)
    }

    /// Evaluate a device position report against the day's active route.
    ///
    /// Returns the (possibly updated) route, or `None` when no route is
    /// active for the key. Reports for distinct routes proceed in
    /// parallel; only reports for the same ginc serialize.
    pub fn submit_position_report(
        &self,
        date_key: &str,
        report: &PositionReport,
    ) -> Result<Option<Route>, RouteError> {
        let Some(route) = self.store.get_active_by_key(date_key)? else {
            return Ok(None);
        };

        let lock = self.lock_for(&route.ginc);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Re-read under the lock: another report may have advanced the
        // route between the key lookup and here.
        let Some(route) = self.store.get(&route.ginc)? else {
            return Ok(None);
        };

        match self.detector.evaluate(&route, report) {
            ConfirmationDecision::Confirm { gsin, delivered_at } => self
                .confirm_locked(&route.ginc, &gsin, delivered_at)
                .map(Some),
            ConfirmationDecision::NoMatch => Ok(Some(route)),
        }
    }

    /// Sweep pending stops and send one imminent-arrival notice to every
    /// stop whose estimated arrival falls within the horizon.
    ///
    /// A failed send is logged and retried on the next sweep; successful
    /// sends flip `notified` so the customer is messaged at most once.
    pub fn send_imminent_notices(&self, ginc: &str, now: DateTime<Utc>) -> Result<Route, RouteError> {
        let lock = self.lock_for(ginc);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut route = self.route(ginc)?;
        let cutoff = now + self.notice_horizon;
        let mut changed = false;

        for stop in &mut route.pending {
            if stop.notified {
                continue;
            }
            let Some(arrival_time) = stop.arrival_time else {
                continue;
            };
            if arrival_time >= cutoff {
                continue;
            }
            match self.notifier.notify(stop, NotificationKind::Imminent) {
                Ok(()) => {
                    stop.notified = true;
                    changed = true;
                    info!(ginc, gsin = %stop.gsin, "imminent-arrival notice sent");
                }
                Err(err) => {
                    warn!(ginc, gsin = %stop.gsin, %err, "imminent notice failed");
                }
            }
        }

        if changed {
            self.store.replace(&route)?;
        }
        Ok(route)
    }

    fn confirm_locked(
        &self,
        ginc: &str,
        gsin: &str,
        delivered_at: DateTime<Utc>,
    ) -> Result<Route, RouteError> {
        let route = self.route(ginc)?;

        if route.delivered.iter().any(|s| s.gsin == gsin) {
            return Ok(route);
        }

        let route = self.machine().confirm_delivery(route, gsin, delivered_at)?;
        self.store.replace(&route)?;

        if let Some(stop) = route.delivered.iter().find(|s| s.gsin == gsin) {
            if let Err(err) = self.notifier.notify(stop, NotificationKind::Delivered) {
                warn!(ginc, gsin, %err, "delivered notice failed");
            }
        }
        Ok(route)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Number of per-route locks currently tracked.
    pub fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn machine(&self) -> RouteStateMachine<'_, P> {
        RouteStateMachine::new(&self.provider, &self.delays, self.keying)
    }

    fn lock_for(&self, ginc: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(ginc.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
