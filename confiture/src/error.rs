//! Error types produced while parsing and validating configuration data.

use thiserror::Error;

use crate::tree::Position;

/// An error raised while lexing or parsing configuration source text.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ParsingError {
    /// A byte at the given position did not match any lexer rule.
    #[error("Illegal character {character:?} ({position})")]
    IllegalCharacter {
        /// The offending character.
        character: char,
        /// Where it was found.
        position: Position,
    },

    /// The parser encountered a token it did not expect.
    #[error("Syntax error near \"{token}\" ({position})")]
    UnexpectedToken {
        /// A textual representation of the unexpected token.
        token: String,
        /// Where the token starts.
        position: Position,
    },

    /// The input ended while a production was still expecting tokens.
    ///
    /// Unlike the other variants, this carries no position: there is no
    /// byte left to point at.
    #[error("Unexpected end of file")]
    UnexpectedEof,

    /// Two children of the same section started seemingly on the same
    /// source line, which almost always means a newline is missing.
    #[error("Syntax error near \"{token}\", newline missing? ({position})")]
    NewlineMissing {
        /// The name of the child that triggered the guard.
        token: String,
        /// The position of that child.
        position: Position,
    },

    /// Two children of the same section were registered under the same
    /// name -- two plain assignments, two subsections colliding with a
    /// value, or a child pulled in by `include` colliding with one already
    /// registered at the including level.
    #[error("section {section}, a child named {name} already exists ({position})")]
    DuplicateChildName {
        /// The enclosing section's name.
        section: String,
        /// The colliding child name.
        name: String,
        /// The position of the second (losing) registration.
        position: Position,
    },

    /// A file matched by an `include` glob could not be opened or read.
    #[error("Unable to open {path} ({reason})")]
    IncludeOpenFailed {
        /// The path that could not be opened.
        path: String,
        /// A human-readable explanation (usually an I/O error message).
        reason: String,
    },

    /// The `include` glob pattern itself was malformed.
    #[error("Invalid include pattern {pattern:?}: {reason}")]
    InvalidIncludePattern {
        /// The offending pattern.
        pattern: String,
        /// A human-readable explanation.
        reason: String,
    },

    /// Section or include nesting exceeded the configured maximum depth.
    #[error("nesting too deep (max {max_depth}) ({position})")]
    NestingTooDeep {
        /// The configured limit that was exceeded.
        max_depth: usize,
        /// Where the limit was hit.
        position: Position,
    },
}

impl ParsingError {
    /// Returns the source position attached to this error, if any.
    ///
    /// [`ParsingError::UnexpectedEof`] has none, since there is no remaining
    /// byte to point at.
    pub fn position(&self) -> Option<&Position> {
        match self {
            ParsingError::IllegalCharacter { position, .. }
            | ParsingError::UnexpectedToken { position, .. }
            | ParsingError::NewlineMissing { position, .. }
            | ParsingError::DuplicateChildName { position, .. }
            | ParsingError::NestingTooDeep { position, .. } => Some(position),
            ParsingError::UnexpectedEof
            | ParsingError::IncludeOpenFailed { .. }
            | ParsingError::InvalidIncludePattern { .. } => None,
        }
    }
}

/// An error raised while validating a parsed tree against a schema.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The human-readable description of what went wrong.
    pub message: String,
    /// The position of the offending value or section, if known.
    pub position: Option<Position>,
}

impl ValidationError {
    /// Builds an error with no position attached.
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError {
            message: message.into(),
            position: None,
        }
    }

    /// Builds an error anchored at a specific position.
    pub fn at(message: impl Into<String>, position: Position) -> Self {
        ValidationError {
            message: message.into(),
            position: Some(position),
        }
    }

    /// Wraps this error's message with additional context, preserving its
    /// (innermost) position.
    ///
    /// This is how `section <name>, key <name>, <inner>`-style messages in
    /// spec.md §4.3 get built up as validation errors bubble up through
    /// nested sections.
    pub fn wrap(self, context: impl FnOnce(&str) -> String) -> Self {
        ValidationError {
            message: context(&self.message),
            position: self.position,
        }
    }
}

/// The top-level error type returned by [`crate::Confiture`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A parsing error, see [`ParsingError`].
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    /// A validation error, see [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
