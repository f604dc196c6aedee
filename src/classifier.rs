use crate::config::AnalysisConfig;
use crate::error::IngestError;
use crate::takeout::ActivityGuess;

/// Outcome of classifying one segment's ranked guess list. The two fields are
/// independent: a segment can have a suprathreshold best activity that is not
/// transit while a lower-ranked suprathreshold guess is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub best_activity: Option<ActivityGuess>,
    pub best_transit: Option<ActivityGuess>,
}

/// Select the best activity and best transit-mode guesses for one segment.
///
/// Guesses arrive ordered by descending confidence, so scanning stops at the
/// first sub-threshold guess: everything after it is sub-threshold too. The
/// upstream export does not actually promise that ordering, so it is checked
/// here and a violation fails the segment instead of silently truncating the
/// scan.
///
/// The threshold comparison is inclusive. The first suprathreshold guess whose
/// token is a transit mode wins as the transit guess, whatever its rank, and
/// ends the scan.
pub fn classify(
    guesses: &[ActivityGuess],
    config: &AnalysisConfig,
    segment_start: &str,
) -> Result<Classification, IngestError> {
    let mut previous_confidence: Option<f64> = None;
    for guess in guesses {
        if let Some(previous) = previous_confidence {
            if guess.confidence > previous {
                return Err(IngestError::UnorderedConfidence {
                    start: segment_start.to_string(),
                    previous,
                    current: guess.confidence,
                });
            }
        }
        previous_confidence = Some(guess.confidence);
    }

    let mut classification = Classification::default();

    for (rank, guess) in guesses.iter().enumerate() {
        if guess.confidence < config.confidence_threshold {
            break;
        }

        if rank == 0 {
            classification.best_activity = Some(guess.clone());
        }

        if config.is_transit_mode(&guess.token) {
            classification.best_transit = Some(guess.clone());
            break;
        }
    }

    Ok(classification)
}
