//! Error types for specgraph-core
//!
//! Every fatal variant carries the source position of the offending node so
//! consuming tools can point at the original text.

use thiserror::Error;

use crate::shared::models::Span;

/// Main error type for document model construction
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpecgraphError {
    /// A `$ref` key was present but its value was the empty string
    #[error("reference is empty")]
    EmptyReference,

    /// No index category, external document, or structural query produced
    /// a target for the reference string
    #[error("reference '{reference}' was not found ({pos})")]
    ReferenceNotFound { reference: String, pos: Span },

    /// A chain of references exceeded the resolution depth limit
    #[error("reference chain exceeds {depth} levels")]
    ReferenceTooDeep { depth: u32 },

    /// A reference chain returned to a node already being resolved
    #[error("circular reference: {} ({pos})", .journey.join(" -> "))]
    CircularReference { journey: Vec<String>, pos: Span },

    /// A sequence-valued field resolved to a non-sequence node
    #[error("expected a sequence ({pos})")]
    NotASequence { pos: Span },

    /// A mapping-valued field resolved to a non-mapping node
    #[error("expected a mapping ({pos})")]
    NotAMapping { pos: Span },

    /// A scalar could not be decoded as the numeric type the field expects
    #[error("field '{field}': cannot convert '{raw}' to a number")]
    NumericConversionFailed { field: String, raw: String },

    /// A nested build step failed
    #[error("build failed: {0}")]
    BuildFailed(#[source] Box<SpecgraphError>),
}

impl SpecgraphError {
    /// Wrap a nested build failure exactly once per nesting level.
    pub fn nested(err: SpecgraphError) -> Self {
        SpecgraphError::BuildFailed(Box::new(err))
    }

    /// Unwrap `BuildFailed` layers down to the error that started it.
    pub fn root_cause(&self) -> &SpecgraphError {
        match self {
            SpecgraphError::BuildFailed(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// True when the error is recoverable under circular tolerance.
    pub fn is_circular(&self) -> bool {
        matches!(self.root_cause(), SpecgraphError::CircularReference { .. })
    }
}

/// Result type alias for model construction
pub type Result<T> = std::result::Result<T, SpecgraphError>;
