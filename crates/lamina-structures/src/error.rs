use std::error::Error;
use std::fmt::{Display, Formatter};

/// Common error type for Lamina data operations.
///
/// Provides structured error handling for buffer allocation, typed access,
/// element conversion, and serialization across the Lamina data layer.
///
/// # Examples
/// ```
/// use lamina_structures::LaminaDataError;
///
/// fn validate_index(index: usize, count: usize) -> Result<(), LaminaDataError> {
///     if index >= count {
///         return Err(LaminaDataError::OutOfRange(format!(
///             "Index {} exceeds element count {}!",
///             index, count
///         )));
///     }
///     Ok(())
/// }
///
/// assert!(validate_index(4, 4).is_err());
/// assert!(validate_index(3, 4).is_ok());
/// ```
#[derive(Debug)]
pub enum LaminaDataError {
    /// An element kind tag outside the closed enumeration was given
    InvalidKind(String),
    /// A typed accessor or conversion was used against a differing element kind
    TypeMismatch(String),
    /// An index, subset window, or converted value fell outside the legal range
    OutOfRange(String),
    /// Operation is not valid against a sparse-payload (SDR) buffer
    UnsupportedForSdr(String),
    /// Token-stream or packed input violated the serialization grammar
    MalformedStream(String),
    /// Structured-tree input violated the expected {type, data} shape
    MalformedTree(String),
    /// Internal error indicating a bug (please report)
    InternalError(String),
}

impl Display for LaminaDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LaminaDataError::InvalidKind(msg) => write!(f, "Invalid Element Kind: {}", msg),
            LaminaDataError::TypeMismatch(msg) => write!(f, "Element Type Mismatch: {}", msg),
            LaminaDataError::OutOfRange(msg) => write!(f, "Out Of Range: {}", msg),
            LaminaDataError::UnsupportedForSdr(msg) => {
                write!(f, "Unsupported For SDR Buffers: {}", msg)
            }
            LaminaDataError::MalformedStream(msg) => write!(f, "Malformed Stream: {}", msg),
            LaminaDataError::MalformedTree(msg) => write!(f, "Malformed Tree: {}", msg),
            LaminaDataError::InternalError(msg) => write!(
                f,
                "Internal Error, please raise an issue on Github: {}",
                msg
            ),
        }
    }
}
impl Error for LaminaDataError {}
