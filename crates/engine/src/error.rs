use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(
        "embedding dimension mismatch: segment {segment_id} has {segment_dims} dims, b-roll {broll_id} has {broll_dims}"
    )]
    DimensionMismatch {
        segment_id: String,
        broll_id: String,
        segment_dims: usize,
        broll_dims: usize,
    },

    #[error("render graph needs one clip stream per insertion: {insertions} insertions, {clip_streams} clip streams")]
    ClipStreamMismatch {
        insertions: usize,
        clip_streams: usize,
    },

    #[error("invalid frame size {0:?}, expected <width>x<height>")]
    InvalidFrameSize(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
