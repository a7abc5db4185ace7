//! Parsing error types for the two known document shapes.
//!
//! Local extraction failures (one cell, one row, one bulletin line) are
//! recoverable and stay inside the parser that hit them; a document whose
//! overall shape no longer matches the site layout is not.

use thiserror::Error;

use crate::domain::substitutions::ShapeError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// One row, cell or line did not match its expected pattern.
    #[error("structural anomaly in {context}: {detail}")]
    StructuralAnomaly { context: String, detail: String },

    /// The document as a whole deviates from the known layout.
    #[error("unexpected document shape ({kind}): {message}")]
    DocumentShape { kind: String, message: String },
}

impl ParseError {
    /// Anomaly scoped to one row/cell/line.
    pub fn anomaly(context: &str, detail: impl Into<String>) -> Self {
        Self::StructuralAnomaly {
            context: context.to_string(),
            detail: detail.into(),
        }
    }

    /// Whole-document shape mismatch.
    pub fn shape(kind: &str, message: impl Into<String>) -> Self {
        Self::DocumentShape {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    /// Whether the surrounding parse can skip the failed element and go on.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::StructuralAnomaly { .. } => true,
            Self::DocumentShape { .. } => false,
        }
    }

    /// Serializable payload for embedding into a degraded parse result.
    pub fn to_shape_error(&self) -> ShapeError {
        match self {
            Self::StructuralAnomaly { context, detail } => {
                ShapeError::new("structural-anomaly", format!("{context}: {detail}"))
            }
            Self::DocumentShape { kind, message } => ShapeError::new(kind.clone(), message.clone()),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
