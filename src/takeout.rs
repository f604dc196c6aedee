use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// One ranked (activity type, confidence %) pair from the export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityGuess {
    #[serde(rename = "activityType")]
    pub token: String,
    #[serde(rename = "probability")]
    pub confidence: f64,
}

/// One observation the ingestion engine consumes: instants still in their raw
/// string form (the engine owns timestamp decoding and its failure semantics),
/// coordinates already comma-joined for the resolver.
#[derive(Debug, Clone)]
pub struct RawSegment {
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub start_coords: String,
    pub end_coords: String,
    pub guesses: Vec<ActivityGuess>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoordinate {
    // Raw exports carry E7 integers; redacted ones carry low-resolution
    // floats. serde_json::Number keeps either textual form intact.
    latitude_e7: Number,
    longitude_e7: Number,
}

impl RawCoordinate {
    fn join(&self) -> String {
        format!("{},{}", self.latitude_e7, self.longitude_e7)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDuration {
    start_timestamp: String,
    end_timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActivitySegment {
    duration: RawDuration,
    start_location: RawCoordinate,
    end_location: RawCoordinate,
    #[serde(default)]
    activities: Vec<ActivityGuess>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineObject {
    activity_segment: Option<RawActivitySegment>,
}

/// Exports come in two shapes: the original wrapped form and the redacted
/// bare array of the same objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportFile {
    Wrapped {
        #[serde(rename = "timelineObjects")]
        timeline_objects: Vec<TimelineObject>,
    },
    Bare(Vec<TimelineObject>),
}

impl ExportFile {
    fn into_objects(self) -> Vec<TimelineObject> {
        match self {
            ExportFile::Wrapped { timeline_objects } => timeline_objects,
            ExportFile::Bare(objects) => objects,
        }
    }
}

/// Collect the export files behind a path: a .json file stands alone, a
/// directory contributes its .json entries in name order. No files is an
/// error; the retry loop around it belongs to the caller.
pub fn collect_export_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            bail!("'{}' is not a .json file", path.display());
        }
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        bail!("'{}' is neither a file nor a directory", path.display());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .with_context(|| format!("failed to read directory '{}'", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    files.sort();

    if files.is_empty() {
        bail!("no .json files found under '{}'", path.display());
    }

    Ok(files)
}

/// Load one export file into an observation batch, dropping timeline objects
/// that do not describe a movement segment (place visits and the like).
pub fn load_batch(path: &Path) -> Result<Vec<RawSegment>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read export file '{}'", path.display()))?;
    parse_batch(&contents).with_context(|| format!("failed to parse '{}'", path.display()))
}

pub fn parse_batch(contents: &str) -> Result<Vec<RawSegment>> {
    let export: ExportFile =
        serde_json::from_str(contents).context("unrecognized export layout")?;

    let segments = export
        .into_objects()
        .into_iter()
        .filter_map(|object| object.activity_segment)
        .map(|segment| RawSegment {
            start_timestamp: segment.duration.start_timestamp,
            end_timestamp: segment.duration.end_timestamp,
            start_coords: segment.start_location.join(),
            end_coords: segment.end_location.join(),
            guesses: segment.activities,
        })
        .collect();

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRAPPED: &str = r#"{
        "timelineObjects": [
            { "placeVisit": { "location": {} } },
            {
                "activitySegment": {
                    "duration": {
                        "startTimestamp": "2023-07-01T15:54:25.881Z",
                        "endTimestamp": "2023-07-01T16:10:01.001Z"
                    },
                    "startLocation": { "latitudeE7": 482100000, "longitudeE7": 163700000 },
                    "endLocation": { "latitudeE7": 482000000, "longitudeE7": 163800000 },
                    "activities": [
                        { "activityType": "IN_TRAM", "probability": 74.2 },
                        { "activityType": "WALKING", "probability": 12.1 }
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn parses_wrapped_exports() {
        let batch = parse_batch(WRAPPED).unwrap();
        assert_eq!(batch.len(), 1);
        let segment = &batch[0];
        assert_eq!(segment.start_timestamp, "2023-07-01T15:54:25.881Z");
        assert_eq!(segment.start_coords, "482100000,163700000");
        assert_eq!(segment.guesses[0].token, "IN_TRAM");
    }

    #[test]
    fn parses_redacted_bare_arrays_with_float_coords() {
        let contents = r#"[
            {
                "activitySegment": {
                    "duration": {
                        "startTimestamp": "2023-07-02T08:00:00Z",
                        "endTimestamp": "2023-07-02T08:20:00Z"
                    },
                    "startLocation": { "latitudeE7": 48.21, "longitudeE7": 16.37 },
                    "endLocation": { "latitudeE7": 48.2, "longitudeE7": 16.38 },
                    "activities": []
                }
            }
        ]"#;
        let batch = parse_batch(contents).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].start_coords, "48.21,16.37");
        assert!(batch[0].guesses.is_empty());
    }

    #[test]
    fn missing_activities_default_to_empty() {
        let contents = r#"{
            "timelineObjects": [{
                "activitySegment": {
                    "duration": {
                        "startTimestamp": "2023-07-02T08:00:00Z",
                        "endTimestamp": "2023-07-02T08:20:00Z"
                    },
                    "startLocation": { "latitudeE7": 1, "longitudeE7": 2 },
                    "endLocation": { "latitudeE7": 3, "longitudeE7": 4 }
                }
            }]
        }"#;
        let batch = parse_batch(contents).unwrap();
        assert!(batch[0].guesses.is_empty());
    }

    #[test]
    fn non_segment_objects_are_dropped() {
        let batch = parse_batch(WRAPPED).unwrap();
        assert_eq!(batch.len(), 1);
    }
}
