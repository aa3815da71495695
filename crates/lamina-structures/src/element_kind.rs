use crate::LaminaDataError;
use std::fmt::{Display, Formatter};

/// The closed set of element kinds a buffer can carry.
///
/// Each variant has a stable `u8` tag used by the packed serialization
/// format and a case-sensitive canonical name used by the textual formats.
/// Tag values outside the enumeration fail range validation via
/// [`TryFrom<u8>`].
///
/// # Examples
/// ```
/// use lamina_structures::ElementKind;
///
/// let kind = ElementKind::Int32;
/// assert_eq!(kind as u8, 3);
/// assert_eq!(kind.name(), "Int32");
///
/// assert!(ElementKind::try_from(3u8).is_ok());
/// assert!(ElementKind::try_from(42u8).is_err());
/// ```
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ElementKind {
    /// Signed 8-bit integer
    Int8 = 0,
    /// Signed 16-bit integer
    Int16 = 1,
    /// Unsigned 16-bit integer
    UInt16 = 2,
    /// Signed 32-bit integer
    Int32 = 3,
    /// Unsigned 32-bit integer
    UInt32 = 4,
    /// Signed 64-bit integer
    Int64 = 5,
    /// Unsigned 64-bit integer
    UInt64 = 6,
    /// 32-bit floating point
    Float32 = 7,
    /// 64-bit floating point
    Float64 = 8,
    /// Opaque handle value, excluded from conversion and serialization
    Handle = 9,
    /// Boolean
    Bool = 10,
    /// Sparse distributed representation payload. The buffer of this kind
    /// *is* an [`SdrPayload`](crate::SdrPayload) rather than a flat vector.
    Sdr = 11,
    /// Owning UTF-8 string per element
    Str = 12,
}

impl ElementKind {
    /// All kinds, in tag order.
    pub const ALL: [ElementKind; 13] = [
        ElementKind::Int8,
        ElementKind::Int16,
        ElementKind::UInt16,
        ElementKind::Int32,
        ElementKind::UInt32,
        ElementKind::Int64,
        ElementKind::UInt64,
        ElementKind::Float32,
        ElementKind::Float64,
        ElementKind::Handle,
        ElementKind::Bool,
        ElementKind::Sdr,
        ElementKind::Str,
    ];

    /// Canonical, case-sensitive name of this kind as used by the textual
    /// serialization formats.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Int8 => "Int8",
            ElementKind::Int16 => "Int16",
            ElementKind::UInt16 => "UInt16",
            ElementKind::Int32 => "Int32",
            ElementKind::UInt32 => "UInt32",
            ElementKind::Int64 => "Int64",
            ElementKind::UInt64 => "UInt64",
            ElementKind::Float32 => "Float32",
            ElementKind::Float64 => "Float64",
            ElementKind::Handle => "Handle",
            ElementKind::Bool => "Bool",
            ElementKind::Sdr => "SDR",
            ElementKind::Str => "Str",
        }
    }

    /// Parses a kind from its canonical name, with a small set of lowercase
    /// aliases accepted for convenience in hand-written configuration.
    ///
    /// # Examples
    /// ```
    /// use lamina_structures::ElementKind;
    ///
    /// assert_eq!(ElementKind::parse_name("Float32").unwrap(), ElementKind::Float32);
    /// assert_eq!(ElementKind::parse_name("int").unwrap(), ElementKind::Int32);
    /// assert!(ElementKind::parse_name("Complex128").is_err());
    /// ```
    pub fn parse_name(name: &str) -> Result<ElementKind, LaminaDataError> {
        match name {
            "Int8" => Ok(ElementKind::Int8),
            "Int16" => Ok(ElementKind::Int16),
            "UInt16" => Ok(ElementKind::UInt16),
            "Int32" | "int" => Ok(ElementKind::Int32),
            "UInt32" | "uint" => Ok(ElementKind::UInt32),
            "Int64" => Ok(ElementKind::Int64),
            "UInt64" => Ok(ElementKind::UInt64),
            "Float32" | "float" => Ok(ElementKind::Float32),
            "Float64" | "double" => Ok(ElementKind::Float64),
            "Handle" => Ok(ElementKind::Handle),
            "Bool" | "bool" => Ok(ElementKind::Bool),
            "SDR" => Ok(ElementKind::Sdr),
            "Str" | "String" | "string" => Ok(ElementKind::Str),
            _ => Err(LaminaDataError::InvalidKind(format!(
                "Unknown element kind name '{}'",
                name
            ))),
        }
    }

    /// Fixed width in bytes of one element of this kind.
    ///
    /// The SDR kind reports 1 (its cells are dense bytes). `Str` has no
    /// fixed width since every element owns its own heap data, and yields
    /// `None`.
    pub fn fixed_byte_size(&self) -> Option<usize> {
        match self {
            ElementKind::Int8 | ElementKind::Bool | ElementKind::Sdr => Some(1),
            ElementKind::Int16 | ElementKind::UInt16 => Some(2),
            ElementKind::Int32 | ElementKind::UInt32 | ElementKind::Float32 => Some(4),
            ElementKind::Int64
            | ElementKind::UInt64
            | ElementKind::Float64
            | ElementKind::Handle => Some(8),
            ElementKind::Str => None,
        }
    }
}

impl TryFrom<u8> for ElementKind {
    type Error = LaminaDataError;
    fn try_from(value: u8) -> Result<Self, LaminaDataError> {
        match value {
            0 => Ok(ElementKind::Int8),
            1 => Ok(ElementKind::Int16),
            2 => Ok(ElementKind::UInt16),
            3 => Ok(ElementKind::Int32),
            4 => Ok(ElementKind::UInt32),
            5 => Ok(ElementKind::Int64),
            6 => Ok(ElementKind::UInt64),
            7 => Ok(ElementKind::Float32),
            8 => Ok(ElementKind::Float64),
            9 => Ok(ElementKind::Handle),
            10 => Ok(ElementKind::Bool),
            11 => Ok(ElementKind::Sdr),
            12 => Ok(ElementKind::Str),
            _ => Err(LaminaDataError::InvalidKind(format!(
                "Element kind tag {} is outside the known range!",
                value
            ))),
        }
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An opaque handle value carried by [`ElementKind::Handle`] buffers.
///
/// Handles are ferried between computation nodes untouched. They take part
/// in allocation, zeroing, and equality, but are rejected by element
/// conversion and by every serialization codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueHandle(pub u64);

impl Display for OpaqueHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpaqueHandle({:#x})", self.0)
    }
}
