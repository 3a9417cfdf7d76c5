use thiserror::Error;

/// Errors surfaced by the import pipeline.
///
/// Detection and per-profile normalization failures inside a
/// multi-profile input are recovered at group level (the bad constituent
/// is skipped and recorded); only a fully failed group propagates as
/// `EmptyProfileGroup`.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unable to detect profile format")]
    UnrecognizedFormat,
    /// A required field is missing or has an unusable value. Carries the
    /// path of the offending field, e.g. `samples[3].timestamp`.
    #[error("malformed profile: `{0}`")]
    MalformedProfile(String),
    #[error("no profiles survived import ({failed} failed)")]
    EmptyProfileGroup { failed: usize },
}

impl ImportError {
    pub(crate) fn malformed(path: impl Into<String>) -> Self {
        Self::MalformedProfile(path.into())
    }
}
