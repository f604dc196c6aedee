use anyhow::Result;
use log::{info, warn};

use crate::classifier::classify;
use crate::config::AnalysisConfig;
use crate::db::{helpers::parse_instant, Database};
use crate::resolver::{CityResolver, UNIDENTIFIED_PLACE};
use crate::takeout::RawSegment;

/// Drive one observation batch into the store. Returns how many journeys were
/// driven to completion during this call (fresh inserts plus resumed
/// incomplete rows); journeys that were already complete cost nothing and
/// count nothing.
///
/// Every store mutation commits on its own, so an interrupt mid-segment
/// leaves at worst one row with `complete` unset. The next run finds that row
/// by its start instant and finishes it instead of inserting a duplicate.
pub async fn ingest_batch(
    db: &Database,
    resolver: &dyn CityResolver,
    config: &AnalysisConfig,
    batch: &[RawSegment],
) -> Result<u64> {
    let mut completed: u64 = 0;

    for segment in batch {
        // Malformed instants abort the batch; everything committed so far
        // stays committed.
        let start = parse_instant(&segment.start_timestamp)?;
        let end = parse_instant(&segment.end_timestamp)?;

        let journey_id = match db.find_journey_by_start(start).await? {
            Some(key) if key.complete => continue,
            Some(key) => key.id,
            None => db.insert_journey_times(start, end).await?,
        };

        let start_place = resolve_or_sentinel(resolver, &segment.start_coords).await;
        let end_place = resolve_or_sentinel(resolver, &segment.end_coords).await;
        let start_location_id = db.upsert_location(&start_place).await?;
        let end_location_id = db.upsert_location(&end_place).await?;
        db.set_journey_places(journey_id, start_location_id, end_location_id)
            .await?;

        let classification = classify(&segment.guesses, config, &segment.start_timestamp)?;

        if let Some(best) = &classification.best_activity {
            let activity_id = db.upsert_activity_type(&best.token).await?;
            db.set_journey_activity(journey_id, activity_id, best.confidence)
                .await?;
        }
        if let Some(transit) = &classification.best_transit {
            let activity_id = db.upsert_activity_type(&transit.token).await?;
            db.set_journey_transit_guess(journey_id, activity_id, transit.confidence)
                .await?;
        }

        db.mark_journey_complete(journey_id).await?;
        completed += 1;
        info!("{completed} journeys added to the store this run");
    }

    Ok(completed)
}

/// Place resolution is best-effort: a transport failure becomes the
/// unidentified sentinel rather than aborting the batch.
async fn resolve_or_sentinel(resolver: &dyn CityResolver, coords: &str) -> String {
    match resolver.resolve(coords).await {
        Ok(name) => name,
        Err(err) => {
            warn!("place resolution for '{coords}' failed, using sentinel: {err:#}");
            UNIDENTIFIED_PLACE.to_string()
        }
    }
}
