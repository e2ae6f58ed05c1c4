use thiserror::Error;

/// Problems with level data.
///
/// None of these stop a level from running: an invalid path leaves the rig
/// idle and a placement without a template is skipped. They are reported so
/// the caller can surface them.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("path has {knots} knot(s), at least 2 are required")]
    InvalidPath { knots: usize },

    #[error("placement {index} at distance {distance:.1} has no enemy template")]
    MissingTemplate { index: usize, distance: f32 },

    #[error("failed to parse level data: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("failed to serialize level data: {0}")]
    Serialize(#[from] ron::Error),
}

pub type Result<T> = std::result::Result<T, LevelError>;
