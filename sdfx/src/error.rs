//! Module containing the universal error type
use crate::context::{BooleanKind, NodePath};
use thiserror::Error;

/// Universal error type for `sdfx`
#[derive(Error, Debug)]
pub enum Error {
    /// Scene node is structurally invalid
    #[error("malformed node at {path}: {reason}")]
    MalformedNode {
        /// Location of the node within the scene
        path: NodePath,
        /// What's wrong with it
        reason: String,
    },

    /// Operator is not recognized
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    /// Smooth boolean operation is missing its blend radius
    #[error("`{0}` requires a blend radius")]
    MissingBlend(BooleanKind),

    /// Hard boolean operation was given a blend radius
    #[error("`{0}` does not take a blend radius")]
    UnexpectedBlend(BooleanKind),

    /// Scalar parameter could not be interpreted as a number
    #[error("bad parameter at {path}: `{text}` is not a finite number")]
    BadParam {
        /// Location of the transform within the scene
        path: NodePath,
        /// Parameter text
        text: String,
    },

    /// Scene is deeper than the configured limit
    #[error("scene exceeds maximum depth of {0}")]
    DepthLimit(usize),

    /// Operator was given the wrong number of operands
    #[error(
        "operator `{op}` must have exactly {expected} arguments (got {actual})"
    )]
    BadArity {
        /// Operator symbol
        op: String,
        /// Required number of operands
        expected: usize,
        /// Number of operands provided
        actual: usize,
    },

    /// Primitive is not implemented by the evaluator's atom library
    #[error("unknown primitive `{0}`")]
    UnknownAtom(String),

    /// Literal text could not be parsed for evaluation
    #[error("could not parse literal `{0}`")]
    BadLiteral(String),

    /// Evaluation produced a value of the wrong type
    #[error("type mismatch: {0}")]
    TypeMismatch(&'static str),

    /// Could not invert a matrix during evaluation
    #[error("could not invert matrix: {0}")]
    SingularMatrix(&'static str),

    /// JSON error; see inner code for details
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Rhai error; see inner code for details
    #[cfg(feature = "rhai")]
    #[error("Rhai parse error")]
    RhaiParseError(#[from] rhai::ParseError),

    /// Rhai error; see inner code for details
    #[cfg(feature = "rhai")]
    #[error("Rhai evaluation error: {0}")]
    RhaiEvalError(#[from] rhai::EvalAltResult),
}

#[cfg(feature = "rhai")]
impl From<Box<rhai::EvalAltResult>> for Error {
    fn from(e: Box<rhai::EvalAltResult>) -> Self {
        Error::RhaiEvalError(*e)
    }
}

impl Error {
    pub(crate) fn malformed<S: Into<String>>(
        path: &NodePath,
        reason: S,
    ) -> Self {
        Error::MalformedNode {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}
