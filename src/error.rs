//! Error taxonomy of the compiler.
//!
//! Errors are split the same way the compilation fails:
//!
//! - [`SyntaxError`]: a line cannot be read as a directive at all.
//! - [`SemanticError`]: the directive is well-formed but breaks a model invariant.
//! - [`EngineError`]: the CNF normalizer could not convert a constraint.
//!
//! The model mutation API reports [`ModelError`] (semantic or engine failures),
//! and the parser wraps everything into [`Error`], attaching the line number
//! and the offending line text.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::parser::Directive;
use crate::types::Feature;

/// A line that is not a valid directive.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SyntaxError {
    #[error("unknown directive `{keyword}`")]
    UnknownDirective { keyword: String },

    #[error("invalid feature name `{name}`, expected [A-Za-z0-9_]+")]
    InvalidFeatureName { name: String },
}

/// What a redefinition collides with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Definition {
    Feature,
    AlternativeGroup,
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Feature => f.write_str("feature"),
            Definition::AlternativeGroup => f.write_str("alternative group of"),
        }
    }
}

/// A directive that breaks an invariant of the feature model.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SemanticError {
    #[error("{definition} `{feature}` is already defined")]
    Redefinition { feature: Feature, definition: Definition },

    #[error("feature `{feature}` is used before it is declared")]
    UnknownFeatureReference { feature: Feature },

    #[error("feature `{feature}` is listed more than once")]
    DuplicateFeatureInDirective { feature: Feature },

    #[error("`{directive}` directive lists no features")]
    EmptyDirective { directive: Directive },

    #[error("`{directive}` directive is not allowed after the first `excluded` directive")]
    DirectiveOrderViolation { directive: Directive },
}

/// Failure of the CNF normalizer.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EngineError {
    #[error("CNF engine unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("CNF conversion timed out: {reason}")]
    Timeout { reason: String },

    #[error("malformed expression: {reason}")]
    MalformedExpression { reason: String },
}

impl EngineError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        EngineError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        EngineError::Timeout {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        EngineError::MalformedExpression {
            reason: reason.into(),
        }
    }
}

/// Error returned by the [`FeatureModel`][crate::model::FeatureModel] mutation API.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ModelError {
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Broad class of an [`Error`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Category {
    Syntax,
    Semantic,
    ExternalEngine,
    Io,
}

/// Compilation error, located at the line that caused it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("line {line}: {source}: `{text}`")]
    Syntax {
        line: usize,
        text: String,
        source: SyntaxError,
    },

    #[error("line {line}: {source}: `{text}`")]
    Semantic {
        line: usize,
        text: String,
        source: SemanticError,
    },

    #[error("line {line}: {source}: `{text}`")]
    Engine {
        line: usize,
        text: String,
        source: EngineError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn syntax(line: usize, text: &str, source: SyntaxError) -> Self {
        Error::Syntax {
            line,
            text: text.to_string(),
            source,
        }
    }

    pub(crate) fn semantic(line: usize, text: &str, source: SemanticError) -> Self {
        Error::Semantic {
            line,
            text: text.to_string(),
            source,
        }
    }

    pub(crate) fn model(line: usize, text: &str, source: ModelError) -> Self {
        match source {
            ModelError::Semantic(source) => Error::semantic(line, text, source),
            ModelError::Engine(source) => Error::Engine {
                line,
                text: text.to_string(),
                source,
            },
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Error::Syntax { .. } => Category::Syntax,
            Error::Semantic { .. } => Category::Semantic,
            Error::Engine { .. } => Category::ExternalEngine,
            Error::Io(_) => Category::Io,
        }
    }

    /// 1-based line number of the offending directive, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Syntax { line, .. } | Error::Semantic { line, .. } | Error::Engine { line, .. } => Some(*line),
            Error::Io(_) => None,
        }
    }

    pub fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            Error::Syntax { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn as_semantic(&self) -> Option<&SemanticError> {
        match self {
            Error::Semantic { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            Error::Engine { source, .. } => Some(source),
            _ => None,
        }
    }
}
