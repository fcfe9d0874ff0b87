//! Error taxonomy for the grammar builder and the parser runtime.
//!
//! Mirrors the two error families the original interpreter distinguishes:
//! fatal grammar-construction errors raised while building the parser
//! model, and match failures raised while evaluating it. A third category,
//! semantic errors, is left for user-defined semantic actions to define for
//! themselves; the core never raises it.

use thiserror::Error;

/// Fatal error raised while converting a grammar description into an
/// expression graph. These are programming errors in the grammar
/// definition, not recoverable parse failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("rule '{0}' is referenced but never defined")]
    UnresolvedCrossRef(String),

    #[error("comments model can match the empty string, which would make comment retry loop forever")]
    NullableCommentsModel,

    #[error("invalid regex pattern '{0}': {1}")]
    InvalidRegex(String, String),
}

/// A single match failure: the parsing expression that did not match, the
/// input position it was attempted at, and (for the human-readable form)
/// a rendered `(line, col) => context` description.
///
/// The original implementation stores a reference to the owning parser
/// inside the exception so `__str__` can call back into it for
/// line/column and context lookup. A self-referential struct isn't a good
/// fit for Rust, so this type carries only the plain facts and
/// [`crate::Parser::describe_failure`] renders the human form on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatch {
    /// Name of the expression or rule that was expected.
    pub expected: String,
    /// Input position (in code units) where the failure occurred.
    pub position: usize,
}

impl NoMatch {
    pub fn new(expected: impl Into<String>, position: usize) -> Self {
        NoMatch {
            expected: expected.into(),
            position,
        }
    }
}

impl std::fmt::Display for NoMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Expected '{}' at position {}",
            self.expected, self.position
        )
    }
}

impl std::error::Error for NoMatch {}

/// Errors surfaced by [`crate::Parser::get_asg`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("parse tree is empty; call parse() before get_asg()")]
    NoParseTree,
    #[error("no semantic actions registered and none were supplied")]
    NoSemanticActions,
}
