//! Snapshot error types.

use thiserror::Error;

/// Snapshot decode error type.
///
/// Any of these aborts the remaining parse; the store is left with
/// whatever state was already applied.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Input ended inside a header or element run.
    #[error("truncated input: {0}")]
    Truncated(#[from] std::io::Error),

    /// A section header carried the wrong tag.
    #[error("tag mismatch: expected {expected:#x}, found {found:#x}")]
    TagMismatch {
        /// The tag required at this position.
        expected: u32,
        /// The tag actually read.
        found: u32,
    },

    /// A section declared more bytes than remain in its parent.
    #[error("section overruns input: {declared} bytes declared, {remaining} remain")]
    Overrun {
        /// Byte length from the section header.
        declared: usize,
        /// Bytes left in the enclosing payload.
        remaining: usize,
    },

    /// An archetype mask referenced a component the store never declared.
    #[error("unknown component id {0}")]
    UnknownComponent(u32),
}

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
