use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use engine::render::{compile, generate_render_command, FrameSize, RenderGraph};
use engine::{generate_plan, AssetContext, Plan, PlannerConfig};

use crate::media::MediaEngine;
use crate::store::{AssetStore, StoreError};

/// Plan one asset from its stored artifacts and persist `plan.json`.
pub async fn plan_asset(store: &AssetStore, config: &PlannerConfig, asset_id: &str) -> Result<Plan> {
    let (vectors, manifest) = store
        .load_planning_inputs(asset_id)
        .await
        .with_context(|| format!("Failed to load planning inputs for asset {}", asset_id))?;

    let context = AssetContext {
        segments: vectors.transcript_segments,
        brolls: vectors.brolls,
        a_roll_duration: manifest.a_roll.technical_metadata.duration,
    };

    let outcome = generate_plan(&context, config)
        .with_context(|| format!("Planning failed for asset {}", asset_id))?;

    info!(
        "Asset {}: {} segments, {} after splitting, {} candidates, plan with {} insertions",
        asset_id,
        outcome.segment_count,
        outcome.chunk_count,
        outcome.candidate_count,
        outcome.plan.len()
    );

    store
        .write_plan(asset_id, &outcome.plan)
        .await
        .with_context(|| format!("Failed to save plan for asset {}", asset_id))?;

    Ok(outcome.plan)
}

/// A compiled render for one asset, ready to execute.
#[derive(Debug, Clone)]
pub struct PreparedRender {
    pub plan: Plan,
    pub graph: RenderGraph,
    /// Encoder inputs in index order: the A-roll first, then one clip per insertion.
    pub inputs: Vec<PathBuf>,
    pub output_path: PathBuf,
}

/// Load the persisted plan and compile it against the asset's media files.
pub async fn prepare_render(
    store: &AssetStore,
    media: &dyn MediaEngine,
    asset_id: &str,
) -> Result<PreparedRender> {
    let asset_dir = store.asset_dir(asset_id).await?;
    let plan = store
        .read_plan(asset_id)
        .await
        .with_context(|| format!("No usable plan for asset {}", asset_id))?;

    let a_roll = store.a_roll_path(&asset_dir);
    let output_path = store.final_video_path(&asset_dir);

    // Nothing to composite, so no frame size is needed
    if plan.is_empty() {
        return Ok(PreparedRender {
            graph: RenderGraph::Passthrough { base_input: 0 },
            plan,
            inputs: vec![a_roll],
            output_path,
        });
    }

    let frame = base_frame_size(store, media, asset_id, &a_roll).await?;

    // Input 0 is the A-roll, input i+1 is the clip for plan[i]
    let mut inputs = Vec::with_capacity(plan.len() + 1);
    inputs.push(a_roll);
    for item in &plan {
        inputs.push(store.broll_path(&asset_dir, &item.broll_id)?);
    }
    let clip_inputs: Vec<usize> = (1..=plan.len()).collect();

    let graph = compile(&plan, 0, &clip_inputs, frame)?;

    Ok(PreparedRender {
        plan,
        graph,
        inputs,
        output_path,
    })
}

/// Execute a prepared render. An empty plan copies the A-roll unchanged.
/// Encoder failures are returned as-is; partial output is not cleaned up.
pub async fn execute_render(media: &dyn MediaEngine, prepared: &PreparedRender) -> Result<PathBuf> {
    match generate_render_command(&prepared.graph, &prepared.inputs, prepared.output_path.clone()) {
        // Empty plan: the output is a plain copy of the A-roll
        None => {
            info!(
                "No B-rolls to insert, copying A-roll to {}",
                prepared.output_path.display()
            );
            tokio::fs::copy(&prepared.inputs[0], &prepared.output_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to copy {} to {}",
                        prepared.inputs[0].display(),
                        prepared.output_path.display()
                    )
                })?;
        }
        // Run the encoder; its stderr tail travels back in the error
        Some(command) => {
            media.render(&command).await?;
            info!(
                "Rendered {} insertions into {}",
                prepared.plan.len(),
                prepared.output_path.display()
            );
        }
    }

    Ok(prepared.output_path.clone())
}

/// Frame size recorded in the manifest at ingest time, probing the A-roll when it is absent.
async fn base_frame_size(
    store: &AssetStore,
    media: &dyn MediaEngine,
    asset_id: &str,
    a_roll: &std::path::Path,
) -> Result<FrameSize> {
    // Prefer the resolution recorded at ingest
    match store.load_manifest(asset_id).await {
        Ok(manifest) => {
            if let Some(resolution) = manifest.a_roll.technical_metadata.resolution.as_deref() {
                match resolution.parse::<FrameSize>() {
                    Ok(frame) => return Ok(frame),
                    Err(e) => warn!("Asset {}: ignoring manifest resolution: {}", asset_id, e),
                }
            }
        }
        Err(StoreError::MissingArtifact { .. }) => {}
        Err(e) => warn!("Asset {}: manifest unreadable, probing A-roll: {}", asset_id, e),
    }

    media.probe_frame_size(a_roll).await
}
