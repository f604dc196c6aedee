use crate::config::TicketPrices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    SingleRide,
    YearlyPass,
}

/// Cost of covering the analyzed period with each ticket type, and which one
/// came out cheaper. `delta_eur` is always the absolute difference, so the
/// comparison is never ambiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct FareComparison {
    pub single_total: f64,
    pub yearly_prorated: f64,
    pub delta_eur: f64,
    pub cheaper: TicketKind,
}

impl FareComparison {
    pub fn summary(&self) -> String {
        match self.cheaper {
            TicketKind::YearlyPass => format!(
                "A yearly pass would have saved {} Euros compared to single-ride tickets.",
                self.delta_eur
            ),
            TicketKind::SingleRide => format!(
                "No advantage of a yearly pass: it would have cost {} Euros more than \
                 single-ride tickets.",
                self.delta_eur
            ),
        }
    }
}

/// Weigh paying per trip against prorating a yearly pass over the period.
pub fn compare_fares(prices: &TicketPrices, trip_count: u64, period_days: i64) -> FareComparison {
    let single_total = prices.single_ride * trip_count as f64;
    let yearly_prorated = prices.yearly_pass * (period_days as f64 / 365.0);
    let delta = ((single_total - yearly_prorated) * 10.0).round() / 10.0;

    let cheaper = if delta > 0.0 {
        TicketKind::YearlyPass
    } else {
        TicketKind::SingleRide
    };

    FareComparison {
        single_total,
        yearly_prorated,
        delta_eur: delta.abs(),
        cheaper,
    }
}
