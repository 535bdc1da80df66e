use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::explain::explain;
use crate::scoring::{best_matches, CandidateMatch};
use crate::segment::{split_segments, AssetContext};

pub const EDGE_MARGIN_SEC: f64 = 5.0;
pub const INSERTION_DURATION_SEC: f64 = 3.0;
pub const MIN_GAP_SEC: f64 = 3.0;
pub const MAX_INSERTIONS: usize = 5;
pub const SPLIT_THRESHOLD_SEC: f64 = 10.0;
pub const CHUNK_SIZE_SEC: f64 = 6.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// No insertion may start before this or end after `duration - edge_margin_sec`.
    pub edge_margin_sec: f64,
    pub insertion_duration_sec: f64,
    /// Minimum edge-to-edge distance between two insertions.
    pub min_gap_sec: f64,
    pub max_insertions: usize,
    pub split_threshold_sec: f64,
    pub chunk_size_sec: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            edge_margin_sec: EDGE_MARGIN_SEC,
            insertion_duration_sec: INSERTION_DURATION_SEC,
            min_gap_sec: MIN_GAP_SEC,
            max_insertions: MAX_INSERTIONS,
            split_threshold_sec: SPLIT_THRESHOLD_SEC,
            chunk_size_sec: CHUNK_SIZE_SEC,
        }
    }
}

/// One accepted b-roll insertion. The JSON form is the `plan.json` schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertionPlanItem {
    pub start_sec: f64,
    pub duration_sec: f64,
    pub broll_id: String,
    pub similarity_score: f32,
    pub matched_segment: String,
    pub explanation: String,
}

impl InsertionPlanItem {
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }
}

/// Accepted insertions, ascending by `start_sec`.
pub type Plan = Vec<InsertionPlanItem>;

/// Result of a planning run, with the intermediate counts callers log.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub segment_count: usize,
    pub chunk_count: usize,
    pub candidate_count: usize,
    pub plan: Plan,
}

#[derive(Debug, Clone, Copy)]
struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    fn conflicts_with(&self, other: &TimeRange, min_gap: f64) -> bool {
        let overlap = self.end.min(other.end) - self.start.max(other.start);
        if overlap > 0.0 {
            return true;
        }

        let gap_before = self.start - other.end;
        let gap_after = other.start - self.end;
        (gap_before >= 0.0 && gap_before < min_gap) || (gap_after >= 0.0 && gap_after < min_gap)
    }
}

/// Greedy, score-first selection of non-conflicting insertions.
///
/// Candidates are ranked by score (stable, so equal scores keep their input
/// order) and accepted while they keep `min_gap_sec` clear of every accepted
/// window. Selection stops at `max_insertions`; the result is re-sorted by
/// start time.
///
/// The same clip may be accepted for several segments. Reuse is allowed on
/// purpose; see DESIGN.md before adding a uniqueness rule here.
pub fn select_insertions(candidates: &[CandidateMatch], config: &PlannerConfig) -> Plan {
    let mut ranked: Vec<&CandidateMatch> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut accepted: Vec<(TimeRange, &CandidateMatch)> = Vec::new();
    for candidate in ranked {
        if accepted.len() >= config.max_insertions {
            break;
        }

        let range = TimeRange {
            start: candidate.segment_start,
            end: candidate.segment_start + config.insertion_duration_sec,
        };
        if accepted
            .iter()
            .any(|(taken, _)| range.conflicts_with(taken, config.min_gap_sec))
        {
            continue;
        }

        accepted.push((range, candidate));
    }

    accepted.sort_by(|(a, _), (b, _)| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    accepted
        .into_iter()
        .map(|(range, candidate)| InsertionPlanItem {
            start_sec: range.start,
            duration_sec: config.insertion_duration_sec,
            broll_id: candidate.broll_id.clone(),
            similarity_score: candidate.similarity_score,
            matched_segment: candidate.segment_id.clone(),
            explanation: explain(
                &candidate.segment_text,
                candidate.broll_metadata.as_deref(),
                candidate.similarity_score,
            ),
        })
        .collect()
}

/// Full planning pipeline: split, score, select, explain.
pub fn generate_plan(context: &AssetContext, config: &PlannerConfig) -> Result<PlanOutcome> {
    let chunks = split_segments(
        &context.segments,
        config.split_threshold_sec,
        config.chunk_size_sec,
    );
    let candidates = best_matches(&chunks, &context.brolls, context.a_roll_duration, config)?;
    let plan = select_insertions(&candidates, config);

    Ok(PlanOutcome {
        segment_count: context.segments.len(),
        chunk_count: chunks.len(),
        candidate_count: candidates.len(),
        plan,
    })
}
