use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{EngineError, Result};
use crate::planner::InsertionPlanItem;

/// Frame size of the base stream; clips are scaled and cropped to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for FrameSize {
    type Err = EngineError;

    /// Parses `"1920x1080"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EngineError::InvalidFrameSize(s.to_string());
        let (w, h) = s.trim().split_once('x').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(FrameSize { width, height })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

/// A stream handle inside the filter graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRef {
    /// A stream of one of the encoder's inputs, e.g. `0:v`.
    Input { index: usize, kind: MediaKind },
    /// The output of an earlier operation.
    Label { name: String },
}

impl StreamRef {
    pub fn video(index: usize) -> Self {
        StreamRef::Input { index, kind: MediaKind::Video }
    }

    pub fn audio(index: usize) -> Self {
        StreamRef::Input { index, kind: MediaKind::Audio }
    }

    pub fn label(name: impl Into<String>) -> Self {
        StreamRef::Label { name: name.into() }
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRef::Input { index, kind: MediaKind::Video } => write!(f, "{}:v", index),
            StreamRef::Input { index, kind: MediaKind::Audio } => write!(f, "{}:a", index),
            StreamRef::Label { name } => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterOp {
    /// Scale to cover `size` keeping aspect ratio, then crop to exactly `size`.
    ScaleCover {
        input: StreamRef,
        size: FrameSize,
        output: StreamRef,
    },
    /// Restart the stream's timestamps at `offset_sec`.
    TimelineShift {
        input: StreamRef,
        offset_sec: f64,
        output: StreamRef,
    },
    /// Composite `overlay` on `base` only while `start_sec <= t < end_sec`.
    /// Outside the window, or once the overlay runs out of frames, `base` shows through.
    WindowedOverlay {
        base: StreamRef,
        overlay: StreamRef,
        start_sec: f64,
        end_sec: f64,
        output: StreamRef,
    },
}

impl FilterOp {
    /// ffmpeg `filter_complex` form of this operation.
    pub fn to_filter(&self) -> String {
        match self {
            FilterOp::ScaleCover { input, size, output } => format!(
                "[{}]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1[{}]",
                input,
                output,
                w = size.width,
                h = size.height
            ),
            FilterOp::TimelineShift { input, offset_sec, output } => {
                format!("[{}]setpts=PTS-STARTPTS+{}/TB[{}]", input, offset_sec, output)
            }
            FilterOp::WindowedOverlay {
                base,
                overlay,
                start_sec,
                end_sec,
                output,
            } => format!(
                "[{}][{}]overlay=enable='gte(t,{})*lt(t,{})':eof_action=pass[{}]",
                base, overlay, start_sec, end_sec, output
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenderGraph {
    /// Nothing to insert: the output is the base input unchanged.
    Passthrough { base_input: usize },
    Composite {
        operations: Vec<FilterOp>,
        video_output: StreamRef,
        audio_output: StreamRef,
    },
}

impl RenderGraph {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, RenderGraph::Passthrough { .. })
    }

    pub fn filters(&self) -> Vec<String> {
        match self {
            RenderGraph::Passthrough { .. } => Vec::new(),
            RenderGraph::Composite { operations, .. } => {
                operations.iter().map(FilterOp::to_filter).collect()
            }
        }
    }
}

/// Compile a time-ordered plan into chained compositing stages.
///
/// `clip_inputs[i]` is the encoder input index holding the clip for
/// `plan[i]`. Each stage overlays onto the previous stage's output, so the
/// last stage's label is the finished video.
pub fn compile(
    plan: &[InsertionPlanItem],
    base_input: usize,
    clip_inputs: &[usize],
    frame: FrameSize,
) -> Result<RenderGraph> {
    if plan.len() != clip_inputs.len() {
        return Err(EngineError::ClipStreamMismatch {
            insertions: plan.len(),
            clip_streams: clip_inputs.len(),
        });
    }

    if plan.is_empty() {
        return Ok(RenderGraph::Passthrough { base_input });
    }

    let mut operations = Vec::with_capacity(plan.len() * 3);
    let mut current = StreamRef::video(base_input);

    // One stage per insertion, each compositing onto the previous stage's output
    for (i, (item, &clip_input)) in plan.iter().zip(clip_inputs).enumerate() {
        let scaled = StreamRef::label(format!("scaled_broll_{}", i));
        let delayed = StreamRef::label(format!("delayed_broll_{}", i));
        let composited = StreamRef::label(format!("v{}", i));

        // Fit the clip to the base frame: [1:v]scale=...,crop=...[scaled_broll_0]
        operations.push(FilterOp::ScaleCover {
            input: StreamRef::video(clip_input),
            size: frame,
            output: scaled.clone(),
        });
        // Start the clip's first frame at the insertion point
        operations.push(FilterOp::TimelineShift {
            input: scaled,
            offset_sec: item.start_sec,
            output: delayed.clone(),
        });
        // Show it only inside [start, end)
        operations.push(FilterOp::WindowedOverlay {
            base: current,
            overlay: delayed,
            start_sec: item.start_sec,
            end_sec: item.end_sec(),
            output: composited.clone(),
        });

        current = composited;
    }

    Ok(RenderGraph::Composite {
        operations,
        video_output: current,
        audio_output: StreamRef::audio(base_input),
    })
}

#[derive(Debug, Clone)]
pub struct RenderCommand {
    pub ffmpeg_args: Vec<String>,
    pub output_path: PathBuf,
}

/// Encoder arguments for a composite graph. `inputs` are given in input
/// index order. Passthrough graphs need no encoder and yield `None`.
pub fn generate_render_command(
    graph: &RenderGraph,
    inputs: &[PathBuf],
    output_path: PathBuf,
) -> Option<RenderCommand> {
    let (video_output, audio_output) = match graph {
        RenderGraph::Passthrough { .. } => return None,
        RenderGraph::Composite {
            video_output,
            audio_output,
            ..
        } => (video_output, audio_output),
    };

    // Base first, then one input per clip
    let mut args = Vec::new();
    for input in inputs {
        args.push("-i".to_string());
        args.push(input.to_string_lossy().to_string());
    }

    // Build filter_complex and map the last stage's video plus the untouched base audio
    args.push("-filter_complex".to_string());
    args.push(graph.filters().join(";"));
    args.push("-map".to_string());
    args.push(format!("[{}]", video_output));
    args.push("-map".to_string());
    args.push(audio_output.to_string());
    // Re-encode video only
    args.push("-c:v".to_string());
    args.push("libx264".to_string());
    args.push("-preset".to_string());
    args.push("medium".to_string());
    args.push("-crf".to_string());
    args.push("23".to_string());
    args.push("-c:a".to_string());
    args.push("copy".to_string());
    args.push("-y".to_string());
    args.push(output_path.to_string_lossy().to_string());

    Some(RenderCommand {
        ffmpeg_args: args,
        output_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: FrameSize = FrameSize { width: 1920, height: 1080 };

    fn item(start_sec: f64, broll_id: &str) -> InsertionPlanItem {
        InsertionPlanItem {
            start_sec,
            duration_sec: 3.0,
            broll_id: broll_id.to_string(),
            similarity_score: 0.7,
            matched_segment: "s".to_string(),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_empty_plan_is_passthrough() {
        let graph = compile(&[], 0, &[], HD).unwrap();
        assert_eq!(graph, RenderGraph::Passthrough { base_input: 0 });
        assert!(graph.filters().is_empty());
        assert!(generate_render_command(&graph, &[PathBuf::from("a.mp4")], PathBuf::from("out.mp4")).is_none());
    }

    #[test]
    fn test_single_insertion_filters() {
        let graph = compile(&[item(10.0, "beach")], 0, &[1], HD).unwrap();
        assert_eq!(
            graph.filters(),
            vec![
                "[1:v]scale=1920:1080:force_original_aspect_ratio=increase,crop=1920:1080,setsar=1[scaled_broll_0]",
                "[scaled_broll_0]setpts=PTS-STARTPTS+10/TB[delayed_broll_0]",
                "[0:v][delayed_broll_0]overlay=enable='gte(t,10)*lt(t,13)':eof_action=pass[v0]",
            ]
        );
    }

    #[test]
    fn test_stages_are_chained() {
        let plan = vec![item(6.0, "a"), item(12.5, "b"), item(20.0, "a")];
        let graph = compile(&plan, 0, &[1, 2, 3], HD).unwrap();

        let RenderGraph::Composite { operations, video_output, audio_output } = &graph else {
            panic!("expected a composite graph");
        };
        assert_eq!(operations.len(), 9);
        assert_eq!(video_output, &StreamRef::label("v2"));
        assert_eq!(audio_output, &StreamRef::audio(0));

        let overlays: Vec<_> = operations
            .iter()
            .filter_map(|op| match op {
                FilterOp::WindowedOverlay { base, start_sec, end_sec, .. } => {
                    Some((base.to_string(), *start_sec, *end_sec))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            overlays,
            vec![
                ("0:v".to_string(), 6.0, 9.0),
                ("v0".to_string(), 12.5, 15.5),
                ("v1".to_string(), 20.0, 23.0),
            ]
        );
    }

    #[test]
    fn test_clip_stream_count_must_match() {
        let err = compile(&[item(10.0, "a")], 0, &[], HD).unwrap_err();
        assert_eq!(err, EngineError::ClipStreamMismatch { insertions: 1, clip_streams: 0 });
    }

    #[test]
    fn test_render_command_maps_last_stage_and_base_audio() {
        let graph = compile(&[item(10.0, "a"), item(20.0, "b")], 0, &[1, 2], HD).unwrap();
        let inputs = vec![
            PathBuf::from("asset/a_roll.mp4"),
            PathBuf::from("asset/brolls/a.mp4"),
            PathBuf::from("asset/brolls/b.mp4"),
        ];
        let cmd = generate_render_command(&graph, &inputs, PathBuf::from("asset/final_video.mp4")).unwrap();
        let args = &cmd.ffmpeg_args;

        assert_eq!(&args[..6], &["-i", "asset/a_roll.mp4", "-i", "asset/brolls/a.mp4", "-i", "asset/brolls/b.mp4"]);
        let filter_at = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[filter_at + 1].split(';').count(), 6);
        assert_eq!(&args[filter_at + 2..filter_at + 6], &["-map", "[v1]", "-map", "0:a"]);
        assert_eq!(args.last().map(String::as_str), Some("asset/final_video.mp4"));
        assert_eq!(cmd.output_path, PathBuf::from("asset/final_video.mp4"));
    }

    #[test]
    fn test_frame_size_parsing() {
        assert_eq!("1280x720".parse::<FrameSize>().unwrap(), FrameSize { width: 1280, height: 720 });
        assert!("1280".parse::<FrameSize>().is_err());
        assert!("0x720".parse::<FrameSize>().is_err());
        assert!("wide x tall".parse::<FrameSize>().is_err());
    }

    #[test]
    fn test_graph_serializes_with_typed_ops() {
        let graph = compile(&[item(10.0, "a")], 0, &[1], HD).unwrap();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["mode"], "composite");
        assert_eq!(json["operations"][0]["op"], "scale_cover");
        assert_eq!(json["operations"][2]["op"], "windowed_overlay");
        assert_eq!(json["video_output"]["name"], "v0");
    }
}
