//! # Core Error Types
//!
//! Failures of the entity store and the selector parser.

use thiserror::Error;

/// Errors returned by [`crate::EntityStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The world already holds as many live entities as it admits.
    #[error("entity quota exceeded: {quota} live entities allowed")]
    QuotaExceeded {
        /// The configured quota.
        quota: usize,
    },

    /// Every slot index has been handed out.
    #[error("entity index space exhausted")]
    IndexSpaceExhausted,
}

/// Result type for entity store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced while parsing a selector string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector (or one alternative of a list) was empty.
    #[error("empty selector at offset {0}")]
    Empty(usize),

    /// A character that cannot start or continue a selector part.
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Byte offset in the source string.
        offset: usize,
    },

    /// A bare word other than `*`, `entity` or `player`.
    #[error("unknown selector kind {name:?} at offset {offset}")]
    UnknownKind {
        /// The word found.
        name: String,
        /// Byte offset in the source string.
        offset: usize,
    },

    /// `#`, `.` or `[` not followed by a name.
    #[error("missing name at offset {0}")]
    MissingName(usize),

    /// An attribute test without its closing `]`.
    #[error("unterminated attribute test starting at offset {0}")]
    UnterminatedAttribute(usize),

    /// A quoted attribute value without its closing quote.
    #[error("unterminated quoted value starting at offset {0}")]
    UnterminatedQuote(usize),
}
