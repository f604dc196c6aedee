use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::config::AnalysisConfig;
use crate::db::helpers::round2;
use crate::db::models::{ActivityType, Journey};

/// Synthetic category all transit-mode tokens collapse into.
pub const PUBLIC_TRANSIT_CATEGORY: &str = "PUBLIC TRANSIT";

/// Activity mix for one calendar month of the analyzed period. Every known
/// category appears in `counts` and `per_day`, zeros included, so downstream
/// plotting gets a value for every (month, category) cell.
#[derive(Debug, Clone)]
pub struct MonthBucket {
    /// Display label, e.g. "March 2023".
    pub label: String,
    pub year: i32,
    pub month: u32,
    /// Days of this month inside the analyzed period. Boundary months are
    /// clipped to the actual first/last journey day.
    pub days: u32,
    pub counts: BTreeMap<String, u64>,
    /// `counts` normalized per clipped day, rounded to 2 decimals.
    pub per_day: BTreeMap<String, f64>,
}

/// Bucket journeys by calendar month and activity category.
///
/// `journeys` must be ordered by ascending start time; `first`/`last` bound
/// the analyzed period (normally the overall earliest and latest journey
/// starts). Months with no journeys at all are not represented.
pub fn activity_timeline(
    journeys: &[Journey],
    activity_types: &[ActivityType],
    config: &AnalysisConfig,
    first: NaiveDateTime,
    last: NaiveDateTime,
) -> Vec<MonthBucket> {
    let mut category_by_id: HashMap<i64, String> = HashMap::new();
    let mut categories: Vec<String> = Vec::new();

    for activity_type in activity_types {
        let category = display_category(&activity_type.token, config);
        if !categories.contains(&category) {
            categories.push(category.clone());
        }
        category_by_id.insert(activity_type.id, category);
    }

    let mut buckets: Vec<MonthBucket> = Vec::new();

    for journey in journeys {
        let date = journey.start_time.date();
        let (year, month) = (date.year(), date.month());

        let position = buckets
            .iter()
            .position(|bucket| bucket.year == year && bucket.month == month);
        let index = match position {
            Some(index) => index,
            None => {
                buckets.push(new_bucket(date, &categories, first, last));
                buckets.len() - 1
            }
        };

        if let Some(activity_id) = journey.activity_id {
            if let Some(category) = category_by_id.get(&activity_id) {
                *buckets[index].counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
    }

    for bucket in &mut buckets {
        for (category, count) in &bucket.counts {
            bucket
                .per_day
                .insert(category.clone(), round2(*count as f64 / f64::from(bucket.days)));
        }
    }

    buckets
}

fn display_category(token: &str, config: &AnalysisConfig) -> String {
    if config.is_transit_mode(token) {
        PUBLIC_TRANSIT_CATEGORY.to_string()
    } else {
        token.replace('_', " ")
    }
}

fn new_bucket(
    date: NaiveDate,
    categories: &[String],
    first: NaiveDateTime,
    last: NaiveDateTime,
) -> MonthBucket {
    let (year, month) = (date.year(), date.month());
    let month_days = days_in_month(year, month);

    // Clip boundary months to the analyzed period. Year and month are
    // compared together so a period touching the same-numbered month of two
    // different years clips only the true boundaries.
    let first_date = first.date();
    let last_date = last.date();
    let start_day = if (first_date.year(), first_date.month()) == (year, month) {
        first_date.day()
    } else {
        1
    };
    let end_day = if (last_date.year(), last_date.month()) == (year, month) {
        last_date.day()
    } else {
        month_days
    };

    let counts: BTreeMap<String, u64> = categories
        .iter()
        .map(|category| (category.clone(), 0))
        .collect();

    MonthBucket {
        label: format!("{} {}", MONTH_NAMES[(month - 1) as usize], year),
        year,
        month,
        days: end_day.saturating_sub(start_day) + 1,
        counts,
        per_day: BTreeMap::new(),
    }
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month start");
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid next month start");
    (next - first).num_days() as u32
}
