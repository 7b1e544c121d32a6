//! eta-tracker route core
//!
//! Tracks multi-stop delivery routes, keeps ETAs current as stops are
//! completed, and turns live position reports into at-most-once delivery
//! confirmations. Routing itself is delegated to an external provider.

pub mod traits;
pub mod model;
pub mod error;
pub mod route;
pub mod service;
pub mod arrival;
pub mod reconcile;
pub mod schedule;
pub mod delay;
pub mod tomtom;
pub mod haversine;
