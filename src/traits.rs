//! Seams for the external collaborators of the route core.
//!
//! The core never reaches for global configuration; concrete adapters are
//! injected wherever one of these traits appears.

use crate::error::{NotificationError, PersistenceError, ProviderError};
use crate::model::{Route, RoutingSolution, Stop};

/// External routing engine that turns an ordered coordinate sequence into
/// timed legs.
///
/// Errors are surfaced as-is; the core never retries a solve.
pub trait RoutingProvider {
    /// Solve the route through `coordinates` (ordered `(lat, lon)` pairs,
    /// first entry is the departure point).
    ///
    /// With `allow_reorder` the provider may pick the best visiting order;
    /// otherwise the physical sequence is fixed and only timing is
    /// recalculated.
    fn solve(
        &self,
        coordinates: &[(f64, f64)],
        allow_reorder: bool,
    ) -> Result<RoutingSolution, ProviderError>;
}

/// Document store keyed by route id, atomic per route.
pub trait RoutePersistence {
    fn get(&self, ginc: &str) -> Result<Option<Route>, PersistenceError>;

    /// Fetch the active route for a date/owner key (arrival detection path).
    fn get_active_by_key(&self, date_key: &str) -> Result<Option<Route>, PersistenceError>;

    fn create(&self, route: &Route) -> Result<(), PersistenceError>;

    fn replace(&self, route: &Route) -> Result<(), PersistenceError>;

    fn delete(&self, ginc: &str) -> Result<(), PersistenceError>;
}

/// Customer-facing notice category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// The courier is expected shortly.
    Imminent,
    /// The shipment has been handed over.
    Delivered,
}

/// Outbound customer messaging (SMS or similar). Fire-and-log: a failed
/// notification never rolls back a route transition.
pub trait NotificationSink {
    fn notify(&self, stop: &Stop, kind: NotificationKind) -> Result<(), NotificationError>;
}
