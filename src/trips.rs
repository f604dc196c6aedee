use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::config::AnalysisConfig;
use crate::db::models::Journey;

/// What the merge walk yields: billable trip count plus the span of the
/// analyzed period (over all journeys, not just transit ones).
#[derive(Debug, Clone, PartialEq)]
pub struct TripSummary {
    pub trip_count: u64,
    pub first_start: NaiveDateTime,
    pub last_start: NaiveDateTime,
    /// Inclusive day span between the first and last journey dates.
    pub period_days: i64,
}

/// Merge temporally adjacent home-city transit journeys into billable trips.
///
/// A journey is a candidate when it carries a transit guess and both ends
/// resolve to the same place, whose name is the configured home city. One
/// ticket covers the rider until `merge_gap_minutes` after boarding, so a
/// candidate only opens a new trip when the whole-minute gap from the
/// previous candidate exceeds that window. The anchor slides to every
/// candidate whether or not it was counted: three candidates each spaced just
/// inside the window collapse into one trip even though the first-to-third
/// gap exceeds it. Non-candidates never move the anchor.
///
/// `journeys` must already be ordered by ascending start time, which is how
/// the store hands them out.
pub fn merge_trips(
    journeys: &[Journey],
    location_names: &HashMap<i64, String>,
    config: &AnalysisConfig,
) -> Option<TripSummary> {
    let first = journeys.first()?;
    let last = journeys.last()?;
    let period_days = (last.start_time.date() - first.start_time.date()).num_days() + 1;

    let mut trip_count: u64 = 0;
    let mut last_trip_start: Option<NaiveDateTime> = None;

    for journey in journeys {
        if !is_home_city_transit(journey, location_names, config) {
            continue;
        }

        match last_trip_start {
            None => trip_count += 1,
            Some(previous) => {
                let gap_minutes =
                    ((journey.start_time - previous).num_seconds() as f64 / 60.0).round();
                if gap_minutes > config.merge_gap_minutes {
                    trip_count += 1;
                }
            }
        }

        last_trip_start = Some(journey.start_time);
    }

    Some(TripSummary {
        trip_count,
        first_start: first.start_time,
        last_start: last.start_time,
        period_days,
    })
}

fn is_home_city_transit(
    journey: &Journey,
    location_names: &HashMap<i64, String>,
    config: &AnalysisConfig,
) -> bool {
    if journey.transit_guess_id.is_none() {
        return false;
    }

    match (journey.start_location_id, journey.end_location_id) {
        (Some(start), Some(end)) if start == end => location_names
            .get(&start)
            .is_some_and(|name| name == &config.home_city),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const VIENNA_ID: i64 = 1;
    const ELSEWHERE_ID: i64 = 2;

    fn names() -> HashMap<i64, String> {
        HashMap::from([
            (VIENNA_ID, "Vienna, Austria".to_string()),
            (ELSEWHERE_ID, "Graz, Austria".to_string()),
        ])
    }

    fn at_minutes(offset: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            + chrono::Duration::minutes(offset)
    }

    fn journey(id: i64, start_offset_min: i64, transit: bool, place: i64) -> Journey {
        Journey {
            id,
            start_time: at_minutes(start_offset_min),
            end_time: at_minutes(start_offset_min + 10),
            start_location_id: Some(place),
            end_location_id: Some(place),
            activity_id: Some(1),
            activity_confidence: Some(80.0),
            transit_guess_id: transit.then_some(1),
            transit_confidence: transit.then_some(80.0),
            complete: true,
        }
    }

    #[test]
    fn empty_journey_set_has_no_summary() {
        assert!(merge_trips(&[], &names(), &AnalysisConfig::default()).is_none());
    }

    #[test]
    fn wide_gap_opens_a_new_trip() {
        // T, T+5, T+50 with a 40-minute window: T and T+5 merge, and T+50 is
        // 45 minutes past its immediate predecessor, so it counts.
        let journeys = vec![
            journey(1, 0, true, VIENNA_ID),
            journey(2, 5, true, VIENNA_ID),
            journey(3, 50, true, VIENNA_ID),
        ];
        let summary = merge_trips(&journeys, &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.trip_count, 2);
    }

    #[test]
    fn anchor_slides_with_every_candidate() {
        // T, T+10, T+45: the third is 35 minutes past the second, inside the
        // window, even though it is 45 minutes past the first.
        let journeys = vec![
            journey(1, 0, true, VIENNA_ID),
            journey(2, 10, true, VIENNA_ID),
            journey(3, 45, true, VIENNA_ID),
        ];
        let summary = merge_trips(&journeys, &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.trip_count, 1);
    }

    #[test]
    fn gap_equal_to_window_still_merges() {
        let journeys = vec![
            journey(1, 0, true, VIENNA_ID),
            journey(2, 40, true, VIENNA_ID),
        ];
        let summary = merge_trips(&journeys, &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.trip_count, 1);
    }

    #[test]
    fn non_candidates_do_not_move_the_anchor() {
        // A walking journey between two transit journeys must not reset the
        // window.
        let journeys = vec![
            journey(1, 0, true, VIENNA_ID),
            journey(2, 20, false, VIENNA_ID),
            journey(3, 35, true, VIENNA_ID),
        ];
        let summary = merge_trips(&journeys, &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.trip_count, 1);
    }

    #[test]
    fn journeys_outside_the_home_city_are_skipped() {
        let journeys = vec![
            journey(1, 0, true, ELSEWHERE_ID),
            journey(2, 100, true, VIENNA_ID),
        ];
        let summary = merge_trips(&journeys, &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.trip_count, 1);
    }

    #[test]
    fn mismatched_endpoints_are_skipped() {
        let mut crossing = journey(1, 0, true, VIENNA_ID);
        crossing.end_location_id = Some(ELSEWHERE_ID);
        let summary =
            merge_trips(&[crossing], &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.trip_count, 0);
    }

    #[test]
    fn period_spans_all_journeys_inclusively() {
        let mut far = journey(2, 0, false, VIENNA_ID);
        far.start_time = NaiveDate::from_ymd_opt(2023, 3, 20)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let journeys = vec![journey(1, 0, true, VIENNA_ID), far];
        let summary = merge_trips(&journeys, &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.period_days, 11);
        assert_eq!(summary.first_start, at_minutes(0));
    }

    #[test]
    fn gap_rounds_to_nearest_minute() {
        // 40 minutes 20 seconds rounds down to 40, inside the window.
        let mut close = journey(2, 40, true, VIENNA_ID);
        close.start_time += chrono::Duration::seconds(20);
        let journeys = vec![journey(1, 0, true, VIENNA_ID), close];
        let summary = merge_trips(&journeys, &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.trip_count, 1);

        // 40 minutes 40 seconds rounds up to 41, outside it.
        let mut apart = journey(2, 40, true, VIENNA_ID);
        apart.start_time += chrono::Duration::seconds(40);
        let journeys = vec![journey(1, 0, true, VIENNA_ID), apart];
        let summary = merge_trips(&journeys, &names(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.trip_count, 2);
    }
}
