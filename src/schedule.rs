//! Schedule projection: propagating zone delays through the pending stops.

use chrono::Duration;

use crate::delay::{DelayKeying, ZoneDelayTable};
use crate::model::{RouteSummary, Stop};

/// Apply per-zone delays to an ordered stop sequence, cumulatively.
///
/// For each transition `i -> i+1` the delay is looked up with the keyed
/// zone of stop `i+1` and added to the departure and arrival times of
/// every stop from `i+1` onward, so delays compound down the remaining
/// route. The summary arrival time is pinned to the last stop's arrival.
pub fn apply_zone_delays(
    stops: &mut [Stop],
    summary: &mut RouteSummary,
    table: &ZoneDelayTable,
    keying: DelayKeying,
) {
    for i in 0..stops.len().saturating_sub(1) {
        let zone = match keying {
            DelayKeying::DepartureZone => &stops[i + 1].departure.address.zone_code,
            DelayKeying::ArrivalZone => &stops[i + 1].arrival.address.zone_code,
        };
        let delay = table.delay_for(zone);
        if delay == 0 {
            continue;
        }
        let shift = Duration::seconds(delay);
        for stop in &mut stops[i + 1..] {
            if let Some(t) = stop.departure_time {
                stop.departure_time = Some(t + shift);
            }
            if let Some(t) = stop.arrival_time {
                stop.arrival_time = Some(t + shift);
            }
        }
    }

    if let Some(last) = stops.last() {
        summary.arrival_time = last.arrival_time;
    }
}
