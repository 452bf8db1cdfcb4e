//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// Every variant maps onto a stable machine-readable code (see [`CacheError::code`]);
/// the `Display` output is the interpolated human-readable message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Reserved; absence is reported through `None`, never through this variant
    #[error("Key `{0}` not found")]
    NotFound(String),

    /// Admission control rejected a write
    #[error("Cache max keys amount exceeded")]
    CacheFull,

    /// Key is neither a string nor an integer-valued number
    #[error("The key argument has to be of type `string` or `number`. Found: `{found}`")]
    KeyType {
        /// Runtime type name of the rejected key
        found: String,
    },

    /// A batch operation was given something other than a sequence of keys
    #[error("The keys argument has to be an array.")]
    KeysType,

    /// A batch entry carried a non-numeric TTL
    #[error("The ttl argument has to be a number.")]
    TtlType,

    /// forceString met a value graph with no textual form
    #[error("Value cannot be serialized: {0}")]
    Serialize(String),
}

impl CacheError {
    /// Builds a key-type error naming the type that was found.
    pub fn key_type(found: impl Into<String>) -> Self {
        CacheError::KeyType {
            found: found.into(),
        }
    }

    // == Error Code ==
    /// Returns the machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::NotFound(_) => "ENOTFOUND",
            CacheError::CacheFull => "ECACHEFULL",
            CacheError::KeyType { .. } => "EKEYTYPE",
            CacheError::KeysType => "EKEYSTYPE",
            CacheError::TtlType => "ETTLTYPE",
            CacheError::Serialize(_) => "ESERIALIZE",
        }
    }
}

// == Value Error Enum ==
/// Errors raised while constructing values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// The pattern source did not compile
    #[error("Invalid regular expression: {0}")]
    Pattern(#[from] regex::Error),

    /// The flag string contained an unknown or repeated flag
    #[error("Invalid regular expression flags: `{0}`")]
    Flags(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
