//! Error types for pool operations.
//!
//! Mirrors the error taxonomy in the teacher's `allocator::error` module
//! (a `Kind`-shaped enum with a `Display` impl and `std::error::Error`),
//! trimmed to the four categories this crate actually surfaces: invalid
//! arguments, stale handles, out-of-memory, and use-after-dispose.

/// Errors surfaced at the pool's public boundary.
///
/// `free` and `Pool::dispose` never return this type — both are
/// idempotent by contract and cannot fail.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A parameter was rejected before any mutation occurred.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The identifier is not present in the allocation table (and is not 0).
    #[error("allocation id {0} is stale or unknown")]
    StaleId(u32),

    /// The backing allocation failed, or the pool is full and growth is disabled.
    #[error("pool is out of memory ({requested} bytes requested)")]
    OutOfMemory {
        /// Bytes that were requested when the allocator gave up.
        requested: usize,
    },

    /// The operation was attempted on a pool that has already been disposed.
    #[error("operation attempted on a disposed pool")]
    Disposed,
}

impl PoolError {
    /// Shorthand for [`PoolError::InvalidArgument`] with a formatted message.
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result alias used throughout the crate's public API.
pub type PoolResult<T> = Result<T, PoolError>;

// Cheap sanity check that the Display strings stay human-readable; the
// exact wording isn't part of the contract so this only checks non-emptiness.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_non_empty() {
        let errs: Vec<PoolError> = vec![
            PoolError::invalid_argument("bad capacity"),
            PoolError::StaleId(42),
            PoolError::OutOfMemory { requested: 128 },
            PoolError::Disposed,
        ];
        for e in errs {
            assert!(!format!("{e}").is_empty());
        }
    }

    #[test]
    fn implements_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<PoolError>();
    }

    #[test]
    fn debug_is_distinct_from_display() {
        let e = PoolError::StaleId(7);
        assert!(format!("{e:?}").contains("StaleId"));
        assert_eq!(format!("{e}"), "allocation id 7 is stale or unknown");
    }
}
