//! Identity reconciliation between stops and anonymous solved legs.
//!
//! A provider solution carries coordinates and timing only. This module
//! re-attaches the stable stop identity (gsin, addresses, phone) onto the
//! solved legs by nearest-coordinate matching: for every original stop, the
//! leg with the closest departure endpoint receives the stop's departure
//! address, and the leg with the closest arrival endpoint receives its
//! arrival address and gsin. The two matches are independent.
//!
//! This is a best-effort nearest match, not a guaranteed bijection: stops
//! with near-identical coordinates, or legs the provider merged, can end up
//! with ambiguous assignments. Known accuracy limitation; the tie-break is
//! the first index at minimum distance. The repeated linear scan is O(n²),
//! which is fine for last-mile routes of tens of stops.

use crate::haversine;
use crate::model::{RoutingSolution, SolvedLeg, Stop, Waypoint};

/// Build the new ordered stop sequence from a solution, carrying identity
/// over from `original`.
///
/// Delivery bookkeeping resets to "not delivered" (only pending stops are
/// ever re-solved); the `notified` flag travels with the gsin so a re-solve
/// cannot re-trigger an imminent-arrival notice.
pub fn bind_identities(original: &[Stop], solution: &RoutingSolution) -> Vec<Stop> {
    let mut bound: Vec<Stop> = solution.legs.iter().map(stop_from_leg).collect();
    if bound.is_empty() {
        return bound;
    }

    for stop in original {
        let dep_idx = nearest_index(stop.departure.coordinate(), &solution.legs, |leg| {
            leg.departure
        });
        let arr_idx = nearest_index(stop.arrival.coordinate(), &solution.legs, |leg| leg.arrival);

        bound[dep_idx].departure.address = stop.departure.address.clone();
        bound[arr_idx].arrival.address = stop.arrival.address.clone();
        bound[arr_idx].gsin = stop.gsin.clone();
        bound[arr_idx].notified = stop.notified;
    }

    bound
}

fn stop_from_leg(leg: &SolvedLeg) -> Stop {
    Stop {
        gsin: String::new(),
        departure: Waypoint {
            address: Default::default(),
            lat: leg.departure.0,
            lon: leg.departure.1,
        },
        arrival: Waypoint {
            address: Default::default(),
            lat: leg.arrival.0,
            lon: leg.arrival.1,
        },
        length_in_meters: leg.length_in_meters,
        travel_time_in_seconds: leg.travel_time_in_seconds,
        traffic_delay_in_seconds: leg.traffic_delay_in_seconds,
        traffic_length_in_meters: leg.traffic_length_in_meters,
        departure_time: Some(leg.departure_time),
        arrival_time: Some(leg.arrival_time),
        delivered: false,
        delivered_at: None,
        notified: false,
    }
}

/// Index of the leg whose selected endpoint is closest to `point`.
/// First index wins on a tie.
fn nearest_index<F>(point: (f64, f64), legs: &[SolvedLeg], endpoint: F) -> usize
where
    F: Fn(&SolvedLeg) -> (f64, f64),
{
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, leg) in legs.iter().enumerate() {
        let dist = haversine::distance_m(point, endpoint(leg));
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}
