//! Zone delay configuration.
//!
//! Maps a postal/zone code to a fixed extra delay in seconds, with a
//! configurable default for unmapped zones. The table itself is static
//! configuration loaded at startup (typically from a JSON object of
//! zone code to seconds).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which zone of the affected leg keys the delay lookup.
///
/// Source revisions disagreed on this; departure zone of the next stop is
/// the behavior of the persisted service, so it is the default. Treat the
/// alternative as configuration, not a defect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayKeying {
    #[default]
    DepartureZone,
    ArrivalZone,
}

/// Zone code to delay-in-seconds table with a default for unmapped zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDelayTable {
    delays: HashMap<String, i64>,
    default_delay: i64,
}

impl ZoneDelayTable {
    pub fn new(delays: HashMap<String, i64>, default_delay: i64) -> Self {
        Self {
            delays,
            default_delay,
        }
    }

    /// Parse a `{"zone": seconds, ...}` JSON object.
    pub fn from_json_str(json: &str, default_delay: i64) -> Result<Self, serde_json::Error> {
        let delays: HashMap<String, i64> = serde_json::from_str(json)?;
        Ok(Self::new(delays, default_delay))
    }

    /// Delay in seconds for a zone code, falling back to the default.
    pub fn delay_for(&self, zone_code: &str) -> i64 {
        self.delays
            .get(zone_code)
            .copied()
            .unwrap_or(self.default_delay)
    }

    pub fn default_delay(&self) -> i64 {
        self.default_delay
    }
}
