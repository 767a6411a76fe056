/// Convenience result type used across rankreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Item-scoped variants (`NoCandidates`, `Acquisition`, `Render`, `Encode`) are recovered by the
/// orchestrator, which skips the ranked item and keeps going. The rest abort a run.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided configuration or data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The content generator returned no usable ranking.
    #[error("content generation failed: {0}")]
    ContentGeneration(String),

    /// No search result qualified as a source clip.
    #[error("no candidates: {0}")]
    NoCandidates(String),

    /// The downloader did not produce a media file.
    #[error("acquisition failed: {0}")]
    Acquisition(String),

    /// Local frame rasterization failed.
    #[error("render error: {0}")]
    Render(String),

    /// The external encoder failed for one clip.
    #[error("encode error: {0}")]
    Encode(String),

    /// Final stream-copy concatenation failed.
    #[error("concatenation failed: {0}")]
    Concatenation(String),

    /// The run was cancelled at a stage boundary.
    #[error("run cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::ContentGeneration`] value.
    pub fn content(msg: impl Into<String>) -> Self {
        Self::ContentGeneration(msg.into())
    }

    /// Build a [`ReelError::NoCandidates`] value.
    pub fn no_candidates(msg: impl Into<String>) -> Self {
        Self::NoCandidates(msg.into())
    }

    /// Build a [`ReelError::Acquisition`] value.
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition(msg.into())
    }

    /// Build a [`ReelError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ReelError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`ReelError::Concatenation`] value.
    pub fn concat(msg: impl Into<String>) -> Self {
        Self::Concatenation(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether the orchestrator may skip the current item and continue the run.
    pub fn is_item_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoCandidates(_) | Self::Acquisition(_) | Self::Render(_) | Self::Encode(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
