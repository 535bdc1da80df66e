use serde::{Deserialize, Deserializer, Serialize};

/// A time-bounded span of the A-roll transcript with its text embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub embedding: Vec<f32>,
    /// Set on chunks produced by [`split_segments`].
    #[serde(
        rename = "originalSegmentId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_segment_id: Option<String>,
}

impl TranscriptSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BRollClip {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub metadata: Option<String>,
    pub embedding: Vec<f32>,
}

/// Read-only inputs for one planning run.
#[derive(Debug, Clone)]
pub struct AssetContext {
    pub segments: Vec<TranscriptSegment>,
    pub brolls: Vec<BRollClip>,
    pub a_roll_duration: f64,
}

// Transcribers number their sentences, so ids show up as integers as often as strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

/// Break segments longer than `split_threshold` seconds into equal-width chunks.
///
/// `chunk_size` only decides how many chunks are produced
/// (`ceil(duration / chunk_size)`); the chunks themselves share the parent's
/// duration evenly. The last chunk always ends exactly at the parent's end.
/// Order is preserved: a parent's chunks take its place in the output.
pub fn split_segments(
    segments: &[TranscriptSegment],
    split_threshold: f64,
    chunk_size: f64,
) -> Vec<TranscriptSegment> {
    let mut result = Vec::with_capacity(segments.len());

    for segment in segments {
        let duration = segment.duration();
        if duration <= split_threshold {
            result.push(segment.clone());
            continue;
        }

        let num_chunks = (duration / chunk_size).ceil() as usize;
        let width = duration / num_chunks as f64;

        for i in 0..num_chunks {
            let start = segment.start + i as f64 * width;
            let end = if i == num_chunks - 1 {
                segment.end
            } else {
                segment.start + (i + 1) as f64 * width
            };

            result.push(TranscriptSegment {
                id: format!("{}_chunk_{}", segment.id, i),
                start,
                end,
                text: segment.text.clone(),
                embedding: segment.embedding.clone(),
                original_segment_id: Some(segment.id.clone()),
            });
        }
    }

    result
}
