use thiserror::Error;

/// Failures of a whole inference call.
///
/// Problems with a single instance never surface here; those are logged and the
/// instance is skipped.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("inference runtime failed: {0:#}")]
    Runtime(anyhow::Error),

    #[error("unexpected model output: {0}")]
    OutputShape(String),
}
