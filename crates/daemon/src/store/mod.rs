use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use engine::segment::{BRollClip, TranscriptSegment};
use engine::Plan;

pub const VECTOR_STORE_FILE: &str = "vector_store.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const PLAN_FILE: &str = "plan.json";
pub const A_ROLL_FILE: &str = "a_roll.mp4";
pub const BROLL_DIR: &str = "brolls";
pub const FINAL_VIDEO_FILE: &str = "final_video.mp4";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid id {0:?}: expected letters, digits, '-' or '_'")]
    InvalidId(String),

    #[error("asset {0} not found")]
    AssetNotFound(String),

    #[error("missing artifact {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Contents of `vector_store.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorStore {
    pub transcript_segments: Vec<TranscriptSegment>,
    pub brolls: Vec<BRollClip>,
}

/// Contents of `manifest.json`. Only the A-roll technical metadata is read;
/// everything else written at ingest time is carried along untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub a_roll: ARollEntry,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ARollEntry {
    pub technical_metadata: TechnicalMetadata,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalMetadata {
    pub duration: f64,
    /// `"<width>x<height>"`
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
}

/// Artifacts that can be fetched as raw JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Manifest,
    VectorStore,
    Plan,
}

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Manifest => MANIFEST_FILE,
            ArtifactKind::VectorStore => VECTOR_STORE_FILE,
            ArtifactKind::Plan => PLAN_FILE,
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "manifest" => Ok(ArtifactKind::Manifest),
            "vector_store" => Ok(ArtifactKind::VectorStore),
            "plan" => Ok(ArtifactKind::Plan),
            other => Err(format!("unknown artifact type: {}", other)),
        }
    }
}

/// File-backed storage: one directory per asset under `root`.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        AssetStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of an existing asset.
    pub async fn asset_dir(&self, asset_id: &str) -> Result<PathBuf> {
        validate_id(asset_id)?;
        let dir = self.root.join(asset_id);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(StoreError::AssetNotFound(asset_id.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::AssetNotFound(asset_id.to_string()))
            }
            Err(source) => Err(StoreError::Io { path: dir, source }),
        }
    }

    /// Read `vector_store.json` and `manifest.json` concurrently.
    pub async fn load_planning_inputs(&self, asset_id: &str) -> Result<(VectorStore, Manifest)> {
        let dir = self.asset_dir(asset_id).await?;
        let vector_path = dir.join(VECTOR_STORE_FILE);
        let manifest_path = dir.join(MANIFEST_FILE);
        tokio::try_join!(
            read_json::<VectorStore>(&vector_path),
            read_json::<Manifest>(&manifest_path),
        )
    }

    pub async fn load_manifest(&self, asset_id: &str) -> Result<Manifest> {
        let dir = self.asset_dir(asset_id).await?;
        read_json(&dir.join(MANIFEST_FILE)).await
    }

    pub async fn write_plan(&self, asset_id: &str, plan: &Plan) -> Result<PathBuf> {
        let dir = self.asset_dir(asset_id).await?;
        let path = dir.join(PLAN_FILE);
        let body = serde_json::to_vec_pretty(plan).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    pub async fn read_plan(&self, asset_id: &str) -> Result<Plan> {
        let dir = self.asset_dir(asset_id).await?;
        read_json(&dir.join(PLAN_FILE)).await
    }

    pub async fn read_artifact(&self, asset_id: &str, kind: ArtifactKind) -> Result<Value> {
        let dir = self.asset_dir(asset_id).await?;
        read_json(&dir.join(kind.file_name())).await
    }

    pub fn a_roll_path(&self, asset_dir: &Path) -> PathBuf {
        asset_dir.join(A_ROLL_FILE)
    }

    pub fn broll_path(&self, asset_dir: &Path, broll_id: &str) -> Result<PathBuf> {
        validate_id(broll_id)?;
        Ok(asset_dir.join(BROLL_DIR).join(format!("{}.mp4", broll_id)))
    }

    pub fn final_video_path(&self, asset_dir: &Path) -> PathBuf {
        asset_dir.join(FINAL_VIDEO_FILE)
    }
}

/// Ids become path components, so they may not carry separators or dots.
fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            StoreError::MissingArtifact {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
