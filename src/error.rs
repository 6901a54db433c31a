use thiserror::Error;

/// Errors returned by range and tree construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RangeTreeError {
    /// The low endpoint is greater than the high endpoint.
    #[error("invalid range: low cannot be greater than high")]
    InvalidRange,
}

/// Result type used across the crate.
pub type Result<T, E = RangeTreeError> = std::result::Result<T, E>;
