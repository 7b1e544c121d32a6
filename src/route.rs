//! The route state machine.
//!
//! Sole owner of route mutation: partitions stops into pending/delivered,
//! decides when to re-solve against the routing provider, and reassembles
//! the schedule (reconciliation + zone delays) after every solve. All work
//! happens on an in-memory `Route`; callers persist the returned value
//! once, so a failed provider call leaves no partial state behind.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::delay::{DelayKeying, ZoneDelayTable};
use crate::error::{ProviderError, RouteError};
use crate::model::{Route, RoutePhase, RouteSummary, RoutingSolution, Stop};
use crate::reconcile;
use crate::schedule;
use crate::traits::RoutingProvider;

/// State machine over a single route's lifecycle.
///
/// Holds no route state of its own; each operation takes the route in and
/// hands the updated route back.
pub struct RouteStateMachine<'a, P: RoutingProvider> {
    provider: &'a P,
    delays: &'a ZoneDelayTable,
    keying: DelayKeying,
}

impl<'a, P: RoutingProvider> RouteStateMachine<'a, P> {
    pub fn new(provider: &'a P, delays: &'a ZoneDelayTable, keying: DelayKeying) -> Self {
        Self {
            provider,
            delays,
            keying,
        }
    }

    /// Build a new active route from its initial stop list.
    ///
    /// Runs a best-order solve over all stop coordinates, binds identities
    /// back onto the returned legs and applies zone delays. Requires at
    /// least two stops. Duplicate-ginc checking is a precondition of the
    /// caller, not of this operation.
    pub fn create(
        &self,
        ginc: impl Into<String>,
        date_key: impl Into<String>,
        stops: Vec<Stop>,
    ) -> Result<Route, RouteError> {
        if stops.len() < 2 {
            return Err(RouteError::TooFewStops(stops.len()));
        }

        let ginc = ginc.into();
        let solution = self.provider.solve(&coordinate_chain(&stops), true)?;
        check_leg_count(&stops, &solution)?;
        let (pending, summary) = self.assemble(&stops, &solution);

        info!(%ginc, stops = pending.len(), "route created");
        Ok(Route {
            ginc,
            date_key: date_key.into(),
            summary,
            pending,
            delivered: Vec::new(),
            phase: RoutePhase::Active,
        })
    }

    /// Move `gsin` from pending to delivered and refresh the remaining
    /// schedule.
    ///
    /// Confirming an already-delivered stop is a no-op (idempotent, no
    /// side effects). An unknown gsin fails with `StopNotFound` and leaves
    /// the route untouched. When the last pending stop is confirmed the
    /// route transitions to `Complete` without a re-solve; otherwise the
    /// remaining stops are re-solved with reordering disabled.
    pub fn confirm_delivery(
        &self,
        mut route: Route,
        gsin: &str,
        delivered_at: DateTime<Utc>,
    ) -> Result<Route, RouteError> {
        if route.delivered.iter().any(|s| s.gsin == gsin) {
            info!(ginc = %route.ginc, gsin, "duplicate confirmation ignored");
            return Ok(route);
        }

        let Some(pos) = route.pending.iter().position(|s| s.gsin == gsin) else {
            return Err(RouteError::StopNotFound {
                ginc: route.ginc.clone(),
                gsin: gsin.to_string(),
            });
        };

        let mut stop = route.pending.remove(pos);
        stop.delivered = true;
        stop.delivered_at = Some(delivered_at);
        route.delivered.push(stop);
        info!(ginc = %route.ginc, gsin, "stop delivered");

        if route.pending.is_empty() {
            route.phase = RoutePhase::Complete;
            info!(ginc = %route.ginc, "all stops delivered, route complete");
            return Ok(route);
        }

        // The remaining physical sequence is fixed; only timing changes.
        self.resolve_pending(&mut route, false)?;
        Ok(route)
    }

    /// Explicit best-order re-optimization over the pending stops.
    ///
    /// Only legal while nothing has been delivered: reordering afterwards
    /// could route the vehicle back through an already-passed stop.
    pub fn request_reorder_solve(&self, mut route: Route) -> Result<Route, RouteError> {
        if !route.delivered.is_empty() {
            return Err(RouteError::ReorderAfterDelivery(route.ginc));
        }
        self.resolve_pending(&mut route, true)?;
        Ok(route)
    }

    /// Re-solve the pending stops and swap in the reconciled, delayed
    /// schedule. Delivered stops are never touched.
    fn resolve_pending(&self, route: &mut Route, allow_reorder: bool) -> Result<(), RouteError> {
        let solution = self
            .provider
            .solve(&coordinate_chain(&route.pending), allow_reorder)?;
        check_leg_count(&route.pending, &solution)?;
        let (pending, summary) = self.assemble(&route.pending, &solution);
        debug!(
            ginc = %route.ginc,
            legs = pending.len(),
            allow_reorder,
            "pending schedule refreshed"
        );
        route.pending = pending;
        route.summary = summary;
        Ok(())
    }

    /// Reconcile a solution onto `stops` and project zone delays over it.
    fn assemble(&self, stops: &[Stop], solution: &RoutingSolution) -> (Vec<Stop>, RouteSummary) {
        let mut bound = reconcile::bind_identities(stops, solution);
        let mut summary = summary_from(solution, &bound);
        schedule::apply_zone_delays(&mut bound, &mut summary, self.delays, self.keying);
        (bound, summary)
    }
}

/// A usable solution carries exactly one leg per stop. Anything else would
/// drop or invent identities during reconciliation, so it is rejected
/// before any stop is touched.
fn check_leg_count(stops: &[Stop], solution: &RoutingSolution) -> Result<(), RouteError> {
    if solution.legs.len() != stops.len() {
        return Err(RouteError::Provider(ProviderError::InvalidResponse(
            format!(
                "expected {} legs, provider returned {}",
                stops.len(),
                solution.legs.len()
            ),
        )));
    }
    Ok(())
}

/// Ordered waypoint coordinates for a solve: the first stop's departure
/// followed by every stop's arrival.
fn coordinate_chain(stops: &[Stop]) -> Vec<(f64, f64)> {
    let mut coordinates = Vec::with_capacity(stops.len() + 1);
    if let Some(first) = stops.first() {
        coordinates.push(first.departure.coordinate());
    }
    coordinates.extend(stops.iter().map(|s| s.arrival.coordinate()));
    coordinates
}

fn summary_from(solution: &RoutingSolution, bound: &[Stop]) -> RouteSummary {
    let mut summary = RouteSummary {
        length_in_meters: solution.summary.length_in_meters,
        travel_time_in_seconds: solution.summary.travel_time_in_seconds,
        traffic_delay_in_seconds: solution.summary.traffic_delay_in_seconds,
        traffic_length_in_meters: solution.summary.traffic_length_in_meters,
        departure_time: Some(solution.summary.departure_time),
        arrival_time: Some(solution.summary.arrival_time),
        ..RouteSummary::default()
    };
    if let Some(first) = bound.first() {
        summary.start_address = first.departure.address.clone();
    }
    if let Some(last) = bound.last() {
        summary.end_address = last.arrival.address.clone();
    }
    summary
}
