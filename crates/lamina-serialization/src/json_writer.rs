//! Pure JSON emission, write-only.
//!
//! Emits a flat JSON array: numbers for the numeric kinds, `true`/`false`
//! for booleans, quoted and escaped strings, and for a payload the sparse
//! active-cell indices only (dimensions are not emitted). There is no
//! decoder; consumers wanting a round trip use the tree form.

use lamina_structures::{ElementArray, ElementKind, LaminaDataError};
use serde_json::{json, Value};

/// Emits a buffer's contents as flat JSON text.
///
/// Non-finite floats have no JSON representation and fail with
/// `OutOfRange`; Handle buffers refuse to emit.
///
/// # Examples
/// ```
/// use lamina_serialization::emit_json;
/// use lamina_structures::ElementArray;
///
/// let array = ElementArray::from_slice(&[true, false, true]);
/// assert_eq!(emit_json(&array).unwrap(), "[true,false,true]");
/// ```
pub fn emit_json(array: &ElementArray) -> Result<String, LaminaDataError> {
    macro_rules! collect {
        ($element:ty) => {
            array
                .values::<$element>()?
                .iter()
                .map(|value| json!(value))
                .collect()
        };
    }
    if !array.has_storage() {
        return Ok(Value::Array(Vec::new()).to_string());
    }
    let items: Vec<Value> = match array.kind() {
        ElementKind::Int8 => collect!(i8),
        ElementKind::Int16 => collect!(i16),
        ElementKind::UInt16 => collect!(u16),
        ElementKind::Int32 => collect!(i32),
        ElementKind::UInt32 => collect!(u32),
        ElementKind::Int64 => collect!(i64),
        ElementKind::UInt64 => collect!(u64),
        ElementKind::Bool => collect!(bool),
        ElementKind::Str => collect!(String),
        ElementKind::Float32 => {
            let mut items = Vec::with_capacity(array.element_count());
            for value in array.values::<f32>()?.iter() {
                items.push(finite_number(*value as f64)?);
            }
            items
        }
        ElementKind::Float64 => {
            let mut items = Vec::with_capacity(array.element_count());
            for value in array.values::<f64>()?.iter() {
                items.push(finite_number(*value)?);
            }
            items
        }
        ElementKind::Sdr => {
            let payload = array.payload()?;
            let sparse = payload.borrow().to_sparse();
            sparse.iter().map(|index| json!(index)).collect()
        }
        ElementKind::Handle => {
            return Err(LaminaDataError::TypeMismatch(
                "Handle buffers cannot be serialized!".into(),
            ));
        }
    };
    Ok(Value::Array(items).to_string())
}

fn finite_number(value: f64) -> Result<Value, LaminaDataError> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| {
            LaminaDataError::OutOfRange(format!(
                "Non-finite value {} cannot be represented in JSON!",
                value
            ))
        })
}
