use crate::pipeline::VideoStatus;

/// Result alias that carries the custom [`PipelineError`] type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Common error type for the core crate.
///
/// Every variant is recoverable from the caller's point of view: a failed
/// operation never leaves the session partially mutated.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The generation backend has not been connected yet.
    #[error("backend is not connected; connect before running the pipeline")]
    NotConnected,
    #[error("niche {0} does not exist in this session")]
    NicheNotFound(u64),
    #[error("video {0} does not exist in this session")]
    VideoNotFound(u64),
    /// The operation is not permitted for the video's current status.
    #[error("cannot {operation} video {video_id} while it is {status}")]
    InvalidState {
        video_id: u64,
        status: VideoStatus,
        operation: &'static str,
    },
    #[error("no published videos are available for analysis")]
    NoPublishedVideos,
    /// Caller supplied a malformed argument (country code, endpoint...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(String),
    /// The shared session lock was poisoned by a panicking holder.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Creates an [`PipelineError::InvalidInput`] from any message.
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a [`PipelineError::Config`] from any message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}
