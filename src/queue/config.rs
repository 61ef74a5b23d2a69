//! Data source configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`DataSource`](crate::DataSource) and its mutation worker.
///
/// Every field has a default, so partial configurations deserialize cleanly:
///
/// ```
/// use ordered_source::SourceConfig;
///
/// let config = SourceConfig {
///     subscriber_buffer: 8,
///     ..Default::default()
/// };
/// assert!(config.validate_order);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Check that the snapshot is ordered by the active comparator before diffing.
    ///
    /// A violation fails the unit with [`SourceError::Unsorted`](crate::SourceError::Unsorted)
    /// and leaves the committed state untouched.
    pub validate_order: bool,

    /// Emit per-unit debug logs from the worker.
    pub enable_logging: bool,

    /// Capacity of each change subscription channel.
    ///
    /// A subscriber that falls this far behind misses batches.
    pub subscriber_buffer: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            validate_order: true,
            enable_logging: true,
            subscriber_buffer: 64,
        }
    }
}
