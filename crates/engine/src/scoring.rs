use crate::error::{EngineError, Result};
use crate::planner::PlannerConfig;
use crate::segment::{BRollClip, TranscriptSegment};

/// Best b-roll found for one eligible segment. Lives only for the duration of a planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    pub segment_id: String,
    pub segment_start: f64,
    pub segment_end: f64,
    pub segment_text: String,
    pub broll_id: String,
    pub broll_metadata: Option<String>,
    pub similarity_score: f32,
}

/// Cosine similarity between a segment and a clip.
///
/// Embeddings are unit-normalized upstream, so this is a plain dot product.
/// Vectors of different length are a data fault and are rejected.
pub fn score(segment: &TranscriptSegment, broll: &BRollClip) -> Result<f32> {
    if segment.embedding.len() != broll.embedding.len() {
        return Err(EngineError::DimensionMismatch {
            segment_id: segment.id.clone(),
            broll_id: broll.id.clone(),
            segment_dims: segment.embedding.len(),
            broll_dims: broll.embedding.len(),
        });
    }

    Ok(segment
        .embedding
        .iter()
        .zip(broll.embedding.iter())
        .map(|(a, b)| a * b)
        .sum())
}

/// A segment can host an insertion when the whole insertion window stays
/// clear of the opening and closing margins of the A-roll.
pub fn is_eligible(segment: &TranscriptSegment, a_roll_duration: f64, config: &PlannerConfig) -> bool {
    segment.start >= config.edge_margin_sec
        && segment.start + config.insertion_duration_sec
            <= a_roll_duration - config.edge_margin_sec
}

/// Pick the highest scoring clip for every eligible segment.
///
/// Equal scores resolve to the clip listed first. Segments outside the
/// eligible window and runs without clips yield no candidates.
pub fn best_matches(
    segments: &[TranscriptSegment],
    brolls: &[BRollClip],
    a_roll_duration: f64,
    config: &PlannerConfig,
) -> Result<Vec<CandidateMatch>> {
    let mut matches = Vec::new();

    for segment in segments {
        if !is_eligible(segment, a_roll_duration, config) {
            continue;
        }

        let mut best: Option<(&BRollClip, f32)> = None;
        for broll in brolls {
            let similarity = score(segment, broll)?;
            let better = match best {
                None => true,
                Some((_, top)) => similarity > top,
            };
            if better {
                best = Some((broll, similarity));
            }
        }

        if let Some((broll, similarity_score)) = best {
            matches.push(CandidateMatch {
                segment_id: segment.id.clone(),
                segment_start: segment.start,
                segment_end: segment.end,
                segment_text: segment.text.clone(),
                broll_id: broll.id.clone(),
                broll_metadata: broll.metadata.clone(),
                similarity_score,
            });
        }
    }

    Ok(matches)
}
