use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One deduplicated journey. `start_time` is the natural key: two observations
/// with the same start instant are the same journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub start_location_id: Option<i64>,
    pub end_location_id: Option<i64>,
    pub activity_id: Option<i64>,
    pub activity_confidence: Option<f64>,
    pub transit_guess_id: Option<i64>,
    pub transit_confidence: Option<f64>,
    pub complete: bool,
}

impl Journey {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Lookup result for the dedup check: just enough to decide whether to skip,
/// resume, or insert.
#[derive(Debug, Clone, Copy)]
pub struct JourneyKey {
    pub id: i64,
    pub complete: bool,
}
