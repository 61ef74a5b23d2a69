//! Error types for the ordered data source.
//!
//! The diff engine itself is total over well-formed input, so every variant here
//! describes either caller misuse or the lifecycle of the mutation worker.
//! Unit failures are delivered through the `after` hook of the unit that
//! failed; submission only fails when the worker is gone.

use thiserror::Error;

/// Result type for data source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors reported by [`DataSource`](crate::DataSource) and its mutation queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// `item_at` was called with an index past the end of the committed sequence.
    #[error("index {index} out of range for collection of length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Length of the committed sequence at lookup time
        len: usize,
    },

    /// The sequence about to be diffed is not ordered by the active comparator.
    ///
    /// `index` is the first position whose item sorts strictly before its predecessor.
    #[error("collection is not sorted by the active comparator at index {index}")]
    Unsorted {
        /// First out-of-order position
        index: usize,
    },

    /// A mutation unit panicked (usually inside the comparator).
    ///
    /// The committed state is left as it was before the unit started.
    #[error("mutation unit {unit} panicked: {message}")]
    UnitPanicked {
        /// Sequence number of the failed unit
        unit: u64,
        /// Panic payload, when it was a string
        message: String,
    },

    /// The mutation worker has stopped and can no longer accept or answer units.
    #[error("mutation worker has shut down")]
    WorkerGone,

    /// A data source was constructed outside of a tokio runtime.
    #[error("no tokio runtime available to host the mutation worker")]
    NoRuntime,
}

impl SourceError {
    /// Whether this error comes from caller misuse rather than the worker lifecycle.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            SourceError::IndexOutOfRange { .. }
                | SourceError::Unsorted { .. }
                | SourceError::UnitPanicked { .. }
        )
    }
}
