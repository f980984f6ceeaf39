use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Original,
    Mask,
    Replacement,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageRole::Original => "original",
            ImageRole::Mask => "mask",
            ImageRole::Replacement => "replacement",
        })
    }
}

/// Reasons a submission did not produce a result.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("select at least one region before submitting in manual mode")]
    EmptySelection,
    #[error("a submission is already in progress")]
    Busy,
    #[error("could not encode the {role} image for upload")]
    Encode {
        role: ImageRole,
        #[source]
        source: anyhow::Error,
    },
    #[error("inpainting service failed: {0:#}")]
    Service(#[source] anyhow::Error),
}

impl SubmitError {
    /// Validation failures are shown to the user as-is; nothing was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, SubmitError::EmptySelection | SubmitError::Busy)
    }
}

/// Compositing failures. Callers recover by using the raw replacement.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("could not decode the {role} image")]
    Decode {
        role: ImageRole,
        #[source]
        source: anyhow::Error,
    },
    #[error("{role} image decoder panicked")]
    DecoderPanicked { role: ImageRole },
    #[error("could not encode the composited image")]
    Encode(#[source] anyhow::Error),
}
