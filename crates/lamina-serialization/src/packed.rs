//! The size-delimited packed codec used for persisted snapshots.
//!
//! # Format
//! - Header: kind tag (1 byte) + element count (8 bytes, little endian)
//! - Numeric/boolean kinds: contiguous little-endian element bytes
//! - Strings: per element a 4-byte length followed by the UTF-8 bytes
//! - Payload: 4-byte rank, rank 4-byte dimensions, 8-byte active-cell
//!   count, then the 4-byte active-cell indices (the header count holds the
//!   total cell count)
//!
//! Reads are length-validated before every access; short input, unknown
//! tags, trailing bytes, and invalid UTF-8 all fail with `MalformedStream`.

use byteorder::{ByteOrder, LittleEndian};
use lamina_structures::{ElementArray, ElementKind, LaminaDataError, SdrPayload};

/// Encodes a buffer into the packed byte form.
pub fn encode_packed(array: &ElementArray) -> Result<Vec<u8>, LaminaDataError> {
    let count = array.element_count();
    let mut bytes: Vec<u8> = Vec::with_capacity(16 + array.byte_len());
    bytes.push(array.kind() as u8);
    bytes.extend_from_slice(&(count as u64).to_le_bytes());

    match array.kind() {
        ElementKind::Sdr => {
            if array.has_storage() {
                let payload = array.payload()?;
                let payload = payload.borrow();
                push_u32(&mut bytes, payload.dimensions().len() as u32);
                for dim in payload.dimensions() {
                    push_u32(&mut bytes, *dim);
                }
                let sparse = payload.to_sparse();
                bytes.extend_from_slice(&(sparse.len() as u64).to_le_bytes());
                for index in sparse {
                    push_u32(&mut bytes, index);
                }
            } else {
                // an unallocated payload persists as an empty rank-1 shape
                push_u32(&mut bytes, 1);
                push_u32(&mut bytes, 0);
                bytes.extend_from_slice(&0u64.to_le_bytes());
            }
        }
        ElementKind::Str => {
            if array.has_storage() {
                for value in array.values::<String>()?.iter() {
                    let encoded = value.as_bytes();
                    if encoded.len() > u32::MAX as usize {
                        return Err(LaminaDataError::OutOfRange(format!(
                            "String element of {} bytes exceeds the packed length field!",
                            encoded.len()
                        )));
                    }
                    push_u32(&mut bytes, encoded.len() as u32);
                    bytes.extend_from_slice(encoded);
                }
            }
        }
        ElementKind::Handle => {
            return Err(LaminaDataError::TypeMismatch(
                "Handle buffers cannot be serialized!".into(),
            ));
        }
        _ => {
            if array.has_storage() {
                encode_cell_bytes(&mut bytes, array)?;
            }
        }
    }
    Ok(bytes)
}

fn push_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_le_bytes());
}

fn encode_cell_bytes(bytes: &mut Vec<u8>, array: &ElementArray) -> Result<(), LaminaDataError> {
    let count = array.element_count();
    macro_rules! emit {
        ($element:ty, $write_into:ident) => {{
            let start = bytes.len();
            bytes.resize(start + count * std::mem::size_of::<$element>(), 0);
            LittleEndian::$write_into(&array.values::<$element>()?, &mut bytes[start..]);
        }};
    }
    match array.kind() {
        ElementKind::Int8 => {
            for value in array.values::<i8>()?.iter() {
                bytes.push(*value as u8);
            }
        }
        ElementKind::Bool => {
            for value in array.values::<bool>()?.iter() {
                bytes.push(u8::from(*value));
            }
        }
        ElementKind::Int16 => emit!(i16, write_i16_into),
        ElementKind::UInt16 => emit!(u16, write_u16_into),
        ElementKind::Int32 => emit!(i32, write_i32_into),
        ElementKind::UInt32 => emit!(u32, write_u32_into),
        ElementKind::Int64 => emit!(i64, write_i64_into),
        ElementKind::UInt64 => emit!(u64, write_u64_into),
        ElementKind::Float32 => emit!(f32, write_f32_into),
        ElementKind::Float64 => emit!(f64, write_f64_into),
        ElementKind::Handle | ElementKind::Sdr | ElementKind::Str => {
            return Err(LaminaDataError::InternalError(
                "Cell emission reached a non-cell kind!".into(),
            ));
        }
    }
    Ok(())
}

/// Decodes the packed byte form into a new buffer. The input must contain
/// exactly one buffer; trailing bytes are rejected.
pub fn decode_packed(bytes: &[u8]) -> Result<ElementArray, LaminaDataError> {
    let mut reader = PackedReader::new(bytes);
    let tag = reader.take_u8()?;
    let kind = ElementKind::try_from(tag).map_err(|_| {
        LaminaDataError::MalformedStream(format!("Unknown element kind tag {}!", tag))
    })?;
    let count = usize::try_from(reader.take_u64()?).map_err(|_| {
        LaminaDataError::MalformedStream("Element count exceeds the addressable range!".into())
    })?;

    let array = match kind {
        ElementKind::Sdr => {
            let rank = reader.take_u32()? as usize;
            if rank * 4 > reader.remaining() {
                return Err(LaminaDataError::MalformedStream(format!(
                    "Payload rank {} exceeds the remaining input!",
                    rank
                )));
            }
            let mut dimensions = Vec::with_capacity(rank);
            for _ in 0..rank {
                dimensions.push(reader.take_u32()?);
            }
            let mut payload = SdrPayload::new(&dimensions)?;
            if payload.total_len() != count {
                return Err(LaminaDataError::MalformedStream(format!(
                    "Payload shape {:?} holds {} cells but the header promised {}!",
                    dimensions,
                    payload.total_len(),
                    count
                )));
            }
            let active = reader.take_u64()? as usize;
            if active * 4 > reader.remaining() {
                return Err(LaminaDataError::MalformedStream(format!(
                    "Active cell count {} exceeds the remaining input!",
                    active
                )));
            }
            let mut indices = Vec::with_capacity(active);
            for _ in 0..active {
                indices.push(reader.take_u32()?);
            }
            payload.set_sparse(&indices).map_err(|error| {
                LaminaDataError::MalformedStream(format!("Active cell list is invalid: {}", error))
            })?;
            ElementArray::from_payload(&payload)
        }
        ElementKind::Str => {
            if count > reader.remaining() / 4 {
                return Err(LaminaDataError::MalformedStream(format!(
                    "String count {} exceeds the remaining input!",
                    count
                )));
            }
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let length = reader.take_u32()? as usize;
                let encoded = reader.take(length)?;
                values.push(String::from_utf8(encoded.to_vec()).map_err(|_| {
                    LaminaDataError::MalformedStream(
                        "String element holds invalid UTF-8!".into(),
                    )
                })?);
            }
            ElementArray::from_vec(values)
        }
        ElementKind::Handle => {
            return Err(LaminaDataError::MalformedStream(
                "Handle buffers cannot appear in packed data!".into(),
            ));
        }
        kind => decode_cell_bytes(&mut reader, kind, count)?,
    };

    if reader.remaining() != 0 {
        return Err(LaminaDataError::MalformedStream(format!(
            "{} trailing bytes after the packed buffer!",
            reader.remaining()
        )));
    }
    Ok(array)
}

/// Decodes into an existing buffer. On failure the target is reset to an
/// empty buffer of its declared kind and the error is returned.
pub fn decode_packed_into(
    target: &mut ElementArray,
    bytes: &[u8],
) -> Result<(), LaminaDataError> {
    match decode_packed(bytes) {
        Ok(decoded) => {
            *target = decoded;
            Ok(())
        }
        Err(error) => {
            target.release();
            Err(error)
        }
    }
}

fn decode_cell_bytes(
    reader: &mut PackedReader,
    kind: ElementKind,
    count: usize,
) -> Result<ElementArray, LaminaDataError> {
    // every cell kind occupies at least one byte per element
    if count > reader.remaining() {
        return Err(LaminaDataError::MalformedStream(format!(
            "Element count {} exceeds the remaining input!",
            count
        )));
    }
    macro_rules! read_all {
        ($element:ty, $read_into:ident, $zero:expr) => {{
            let raw = reader.take(count * std::mem::size_of::<$element>())?;
            let mut values: Vec<$element> = vec![$zero; count];
            LittleEndian::$read_into(raw, &mut values);
            ElementArray::from_vec(values)
        }};
    }
    Ok(match kind {
        ElementKind::Int8 => {
            let raw = reader.take(count)?;
            ElementArray::from_vec(raw.iter().map(|byte| *byte as i8).collect::<Vec<i8>>())
        }
        ElementKind::Bool => {
            let raw = reader.take(count)?;
            let mut values = Vec::with_capacity(count);
            for byte in raw {
                values.push(match *byte {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(LaminaDataError::MalformedStream(format!(
                            "Byte {} is not a valid Bool element!",
                            other
                        )))
                    }
                });
            }
            ElementArray::from_vec(values)
        }
        ElementKind::Int16 => read_all!(i16, read_i16_into, 0),
        ElementKind::UInt16 => read_all!(u16, read_u16_into, 0),
        ElementKind::Int32 => read_all!(i32, read_i32_into, 0),
        ElementKind::UInt32 => read_all!(u32, read_u32_into, 0),
        ElementKind::Int64 => read_all!(i64, read_i64_into, 0),
        ElementKind::UInt64 => read_all!(u64, read_u64_into, 0),
        ElementKind::Float32 => read_all!(f32, read_f32_into, 0.0),
        ElementKind::Float64 => read_all!(f64, read_f64_into, 0.0),
        ElementKind::Handle | ElementKind::Sdr | ElementKind::Str => {
            return Err(LaminaDataError::InternalError(
                "Cell decoding reached a non-cell kind!".into(),
            ));
        }
    })
}

/// Bounds-checked cursor over packed input.
struct PackedReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> PackedReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        PackedReader { bytes, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], LaminaDataError> {
        if count > self.remaining() {
            return Err(LaminaDataError::MalformedStream(format!(
                "Reading {} bytes at position {} goes out of bounds; input is only {} bytes long!",
                count,
                self.position,
                self.bytes.len()
            )));
        }
        let slice = &self.bytes[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, LaminaDataError> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32, LaminaDataError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn take_u64(&mut self) -> Result<u64, LaminaDataError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }
}
