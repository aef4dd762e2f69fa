//! Error types for the compression pipeline.
//!
//! Every failure names the invariant it violated. Failures raised inside a
//! pass are wrapped in [`Error::Pass`] so the operator sees which
//! transformation's precondition broke.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for podar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The pipeline configuration cannot be executed as written.
    Configuration,
    /// Bookkeeping between masks, shapes and quantization state disagrees.
    Consistency,
    /// A ratio was requested from a zero baseline.
    NumericDegenerate,
    /// Filesystem or serialization failure at a checkpoint boundary.
    Io,
    /// The external trainer reported a failure.
    Collaborator,
}

/// Errors raised by the pass pipeline and its accounting core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown pass '{name}' (known passes: {known})")]
    UnknownPass { name: String, known: String },

    #[error("invalid configuration value for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    #[error("pass '{pass}' requires a {collaborator}, none was registered")]
    MissingCollaborator { pass: String, collaborator: String },

    #[error("calibration data is required but no batch was provided")]
    MissingCalibration,

    #[error(
        "mask count mismatch: {weight_masks} weight masks but {activation_masks} activation masks"
    )]
    MaskCountMismatch {
        weight_masks: usize,
        activation_masks: usize,
    },

    #[error("stale mask for layer '{layer}': mask shape {mask:?} does not match weight shape {weight:?}")]
    MaskShapeMismatch {
        layer: String,
        mask: Vec<usize>,
        weight: Vec<usize>,
    },

    #[error("layer '{layer}' has no {kind} mask while other layers do")]
    MissingMask { layer: String, kind: String },

    #[error("graph is not quantized; entropy coding needs a finite symbol set")]
    NotQuantized,

    #[error("layer '{layer}' was never quantized; entropy coding needs its quantized values")]
    LayerNotQuantized { layer: String },

    #[error("non-finite value {value} in layer '{layer}' cannot be a codebook symbol")]
    NonFiniteSymbol { layer: String, value: f32 },

    #[error("symbol is not part of the codebook alphabet")]
    UnknownSymbol,

    #[error("bitstream ends inside a code ({dangling} dangling bits)")]
    TruncatedBitStream { dangling: usize },

    #[error("decoded values of layer '{layer}' differ from the encoded values")]
    RoundTripMismatch { layer: String },

    #[error("tensor shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("duplicate node name '{name}' in graph")]
    DuplicateNode { name: String },

    #[error("layer '{layer}' does not exist in the graph")]
    UnknownLayer { layer: String },

    #[error("layer '{layer}' has no recorded output shape; run shape annotation first")]
    MissingShape { layer: String },

    #[error("{quantity} is undefined: baseline is zero")]
    NumericDegenerate { quantity: String },

    #[error("checkpoint file missing: {path}")]
    CheckpointNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("trainer failed: {0}")]
    Trainer(String),

    #[error("pass '{pass}' (#{index}) failed: {source}")]
    Pass {
        pass: String,
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig { field: field.into(), message: message.into() }
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(context: impl Into<String>, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Wrap this error with the pass that raised it.
    pub fn in_pass(self, pass: impl Into<String>, index: usize) -> Self {
        Self::Pass { pass: pass.into(), index, source: Box::new(self) }
    }

    /// Classify the error. Pass wrappers report the class of their cause.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::UnknownPass { .. }
            | Error::InvalidConfig { .. }
            | Error::MissingCollaborator { .. }
            | Error::MissingCalibration => ErrorClass::Configuration,
            Error::MaskCountMismatch { .. }
            | Error::MaskShapeMismatch { .. }
            | Error::MissingMask { .. }
            | Error::NotQuantized
            | Error::LayerNotQuantized { .. }
            | Error::NonFiniteSymbol { .. }
            | Error::UnknownSymbol
            | Error::TruncatedBitStream { .. }
            | Error::RoundTripMismatch { .. }
            | Error::ShapeMismatch { .. }
            | Error::DuplicateNode { .. }
            | Error::UnknownLayer { .. }
            | Error::MissingShape { .. } => ErrorClass::Consistency,
            Error::NumericDegenerate { .. } => ErrorClass::NumericDegenerate,
            Error::CheckpointNotFound { .. } | Error::Io(_) | Error::Serialization(_) => {
                ErrorClass::Io
            }
            Error::Trainer(_) => ErrorClass::Collaborator,
            Error::Pass { source, .. } => source.class(),
        }
    }

    /// Name of the failing pass, if the error was raised inside one.
    pub fn pass_name(&self) -> Option<&str> {
        match self {
            Error::Pass { pass, .. } => Some(pass),
            _ => None,
        }
    }

    /// The innermost error, with pass wrappers removed.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Pass { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {e}"))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {e}"))
    }
}

impl From<safetensors::SafeTensorError> for Error {
    fn from(e: safetensors::SafeTensorError) -> Self {
        Error::Serialization(format!("safetensors: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_wrapper_keeps_class_and_name() {
        let err = Error::MaskCountMismatch { weight_masks: 3, activation_masks: 2 }.in_pass("prune", 0);
        assert_eq!(err.class(), ErrorClass::Consistency);
        assert_eq!(err.pass_name(), Some("prune"));
        assert!(matches!(err.root_cause(), Error::MaskCountMismatch { .. }));

        let msg = err.to_string();
        assert!(msg.contains("prune"));
        assert!(msg.contains("3 weight masks"));
    }

    #[test]
    fn test_configuration_class() {
        let err = Error::UnknownPass { name: "prnue".into(), known: "prune".into() };
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert_eq!(Error::invalid_config("sparsity", "out of range").class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_degenerate_class() {
        let err = Error::NumericDegenerate { quantity: "parameter reduction".into() };
        assert_eq!(err.class(), ErrorClass::NumericDegenerate);
        assert!(err.to_string().contains("undefined"));
    }
}
