pub mod error;
pub mod explain;
pub mod planner;
pub mod render;
pub mod scoring;
pub mod segment;

pub use error::EngineError;
pub use planner::*;
pub use segment::*;
