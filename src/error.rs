//! Error types for working with temporal profiles.
use crate::profile::ProfileType;
use thiserror::Error;

/// An error raised while building or combining temporal profiles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// Ratio data has the wrong dimensions
    #[error("Invalid shape: {0}")]
    Shape(String),
    /// A row of ratios does not sum to one
    #[error("Ratios of row {row} for {profile_type} profile sum to {sum}, not 1")]
    Normalisation {
        /// The profile type being constructed
        profile_type: ProfileType,
        /// Index of the offending row
        row: usize,
        /// The actual sum of the row
        sum: f64,
    },
    /// A profile of an unexpected type was supplied
    #[error("Invalid profile type: {0}")]
    Type(String),
    /// A requested profile, slot or label is absent
    #[error("Not found: {0}")]
    Lookup(String),
    /// An argument has an invalid value
    #[error("Invalid value: {0}")]
    Value(String),
}

/// Convenience type for `Result<T, ProfileError>`.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Return early with a [`ProfileError::Shape`] error
macro_rules! shape_err {
    ($($arg:tt)*) => {
        return Err($crate::error::ProfileError::Shape(format!($($arg)*)))
    };
}
pub(crate) use shape_err;

/// Return early with a [`ProfileError::Value`] error
macro_rules! value_err {
    ($($arg:tt)*) => {
        return Err($crate::error::ProfileError::Value(format!($($arg)*)))
    };
}
pub(crate) use value_err;
