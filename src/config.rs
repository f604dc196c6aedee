use serde::{Deserialize, Serialize};

/// Tunable thresholds for journey reconstruction and trip merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum confidence (in %) for an activity guess to be considered at all.
    pub confidence_threshold: f64,

    /// Validity window (in minutes) of one ticket. Transit journeys starting
    /// within this many minutes of the previous one collapse into a single trip.
    pub merge_gap_minutes: f64,

    /// Activity tokens counted as public transit use.
    pub transit_modes: Vec<String>,

    /// Resolved place name a trip must start and end in to count toward the
    /// ticket comparison.
    pub home_city: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 30.0,
            merge_gap_minutes: 40.0,
            transit_modes: vec![
                "IN_BUS".into(),
                "IN_SUBWAY".into(),
                "IN_TRAIN".into(),
                "IN_TRAM".into(),
            ],
            home_city: "Vienna, Austria".into(),
        }
    }
}

impl AnalysisConfig {
    pub fn is_transit_mode(&self, token: &str) -> bool {
        self.transit_modes.iter().any(|mode| mode == token)
    }
}

/// Ticket prices in Euros. Price scraping lives outside this crate; callers
/// supply current prices or fall back to these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TicketPrices {
    pub single_ride: f64,
    pub yearly_pass: f64,
}

impl Default for TicketPrices {
    fn default() -> Self {
        Self {
            single_ride: 2.40,
            yearly_pass: 365.0,
        }
    }
}
