//! Bulk element conversion between any pair of kinds.
//!
//! Every conversion funnels through a small scalar carrier so that each
//! source kind is matched exhaustively exactly once. Narrowing or
//! sign-crossing values outside the destination range fail rather than
//! clamp, and string elements always convert element-wise through text.

use super::storage::ElementStore;
use crate::LaminaDataError;

/// Read side of a conversion: cell storage, or the dense byte view of a
/// sparse payload.
pub(crate) enum SourceView<'a> {
    Cells(&'a ElementStore),
    Dense(&'a [u8]),
}

/// Write side of a conversion.
pub(crate) enum DestView<'a> {
    Cells(&'a mut ElementStore),
    Dense(&'a mut [u8]),
}

/// Converts every element of `source` into `destination`, writing `count`
/// elements starting at `offset`. The caller has already sized the
/// destination; `source` holds exactly `count` elements.
pub(crate) fn convert_region(
    source: &SourceView,
    destination: DestView,
    offset: usize,
    count: usize,
) -> Result<(), LaminaDataError> {
    let window = offset..offset + count;
    match destination {
        DestView::Cells(store) => match store {
            ElementStore::Int8(v) => fill_from_source(&mut v[window], source),
            ElementStore::Int16(v) => fill_from_source(&mut v[window], source),
            ElementStore::UInt16(v) => fill_from_source(&mut v[window], source),
            ElementStore::Int32(v) => fill_from_source(&mut v[window], source),
            ElementStore::UInt32(v) => fill_from_source(&mut v[window], source),
            ElementStore::Int64(v) => fill_from_source(&mut v[window], source),
            ElementStore::UInt64(v) => fill_from_source(&mut v[window], source),
            ElementStore::Float32(v) => fill_from_source(&mut v[window], source),
            ElementStore::Float64(v) => fill_from_source(&mut v[window], source),
            ElementStore::Bool(v) => fill_from_source(&mut v[window], source),
            ElementStore::Str(v) => fill_strings(&mut v[window], source),
            ElementStore::Handle(_) => Err(LaminaDataError::TypeMismatch(
                "Handle buffers take part in no element conversion!".into(),
            )),
        },
        DestView::Dense(cells) => fill_dense(&mut cells[window], source),
    }
}

/// Scalar carrier between source and destination element types.
#[derive(Debug, Clone, Copy)]
enum Scalar {
    Int(i128),
    Float(f64),
    Bool(bool),
}

/// Destination-side conversion from the scalar carrier or from element text.
trait FromScalar: Sized {
    fn from_scalar(scalar: Scalar) -> Result<Self, LaminaDataError>;
    fn from_text(text: &str) -> Result<Self, LaminaDataError>;
}

macro_rules! impl_from_scalar_for_int {
    ($($int:ty),*) => {
        $(
            impl FromScalar for $int {
                fn from_scalar(scalar: Scalar) -> Result<Self, LaminaDataError> {
                    match scalar {
                        Scalar::Int(value) => <$int>::try_from(value).map_err(|_| {
                            LaminaDataError::OutOfRange(format!(
                                "Value {} does not fit in {}!",
                                value,
                                stringify!($int)
                            ))
                        }),
                        Scalar::Float(value) => {
                            if value >= <$int>::MIN as f64 && value <= <$int>::MAX as f64 {
                                Ok(value as $int)
                            } else {
                                Err(LaminaDataError::OutOfRange(format!(
                                    "Value {} does not fit in {}!",
                                    value,
                                    stringify!($int)
                                )))
                            }
                        }
                        Scalar::Bool(value) => Ok(value as $int),
                    }
                }

                fn from_text(text: &str) -> Result<Self, LaminaDataError> {
                    text.trim().parse::<$int>().map_err(|_| {
                        LaminaDataError::OutOfRange(format!(
                            "Cannot parse '{}' as {}!",
                            text,
                            stringify!($int)
                        ))
                    })
                }
            }
        )*
    };
}
impl_from_scalar_for_int!(i8, i16, u16, i32, u32, i64, u64);

impl FromScalar for f32 {
    fn from_scalar(scalar: Scalar) -> Result<Self, LaminaDataError> {
        match scalar {
            Scalar::Int(value) => Ok(value as f32),
            Scalar::Float(value) => {
                if value.abs() <= f32::MAX as f64 || value == 0.0 {
                    Ok(value as f32)
                } else {
                    Err(LaminaDataError::OutOfRange(format!(
                        "Value {} does not fit in f32!",
                        value
                    )))
                }
            }
            Scalar::Bool(value) => Ok(if value { 1.0 } else { 0.0 }),
        }
    }

    fn from_text(text: &str) -> Result<Self, LaminaDataError> {
        text.trim()
            .parse::<f32>()
            .map_err(|_| LaminaDataError::OutOfRange(format!("Cannot parse '{}' as f32!", text)))
    }
}

impl FromScalar for f64 {
    fn from_scalar(scalar: Scalar) -> Result<Self, LaminaDataError> {
        match scalar {
            Scalar::Int(value) => Ok(value as f64),
            Scalar::Float(value) => Ok(value),
            Scalar::Bool(value) => Ok(if value { 1.0 } else { 0.0 }),
        }
    }

    fn from_text(text: &str) -> Result<Self, LaminaDataError> {
        text.trim()
            .parse::<f64>()
            .map_err(|_| LaminaDataError::OutOfRange(format!("Cannot parse '{}' as f64!", text)))
    }
}

impl FromScalar for bool {
    fn from_scalar(scalar: Scalar) -> Result<Self, LaminaDataError> {
        Ok(match scalar {
            Scalar::Int(value) => value != 0,
            Scalar::Float(value) => value != 0.0,
            Scalar::Bool(value) => value,
        })
    }

    fn from_text(text: &str) -> Result<Self, LaminaDataError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Ok(true),
            "false" | "off" | "0" => Ok(false),
            _ => Err(LaminaDataError::OutOfRange(format!(
                "Invalid value for a boolean: '{}'",
                text
            ))),
        }
    }
}

/// Fills a typed destination slice from any source view.
fn fill_from_source<T: FromScalar>(
    destination: &mut [T],
    source: &SourceView,
) -> Result<(), LaminaDataError> {
    match source {
        SourceView::Cells(store) => match store {
            ElementStore::Int8(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Int(*x as i128))),
            ElementStore::Int16(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Int(*x as i128))),
            ElementStore::UInt16(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Int(*x as i128))),
            ElementStore::Int32(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Int(*x as i128))),
            ElementStore::UInt32(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Int(*x as i128))),
            ElementStore::Int64(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Int(*x as i128))),
            ElementStore::UInt64(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Int(*x as i128))),
            ElementStore::Float32(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Float(*x as f64))),
            ElementStore::Float64(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Float(*x))),
            ElementStore::Bool(v) => fill_scalars(destination, v.iter().map(|x| Scalar::Bool(*x))),
            ElementStore::Str(v) => {
                for (slot, text) in destination.iter_mut().zip(v) {
                    *slot = T::from_text(text)?;
                }
                Ok(())
            }
            ElementStore::Handle(_) => Err(LaminaDataError::TypeMismatch(
                "Handle buffers take part in no element conversion!".into(),
            )),
        },
        SourceView::Dense(cells) => {
            fill_scalars(destination, cells.iter().map(|x| Scalar::Int(*x as i128)))
        }
    }
}

fn fill_scalars<T: FromScalar>(
    destination: &mut [T],
    scalars: impl Iterator<Item = Scalar>,
) -> Result<(), LaminaDataError> {
    for (slot, scalar) in destination.iter_mut().zip(scalars) {
        *slot = T::from_scalar(scalar)?;
    }
    Ok(())
}

/// Fills a string destination: every source element is formatted
/// individually, never byte-copied.
fn fill_strings(destination: &mut [String], source: &SourceView) -> Result<(), LaminaDataError> {
    macro_rules! format_into {
        ($values:expr) => {{
            for (slot, value) in destination.iter_mut().zip($values) {
                *slot = value.to_string();
            }
            Ok(())
        }};
    }
    match source {
        SourceView::Cells(store) => match store {
            ElementStore::Int8(v) => format_into!(v),
            ElementStore::Int16(v) => format_into!(v),
            ElementStore::UInt16(v) => format_into!(v),
            ElementStore::Int32(v) => format_into!(v),
            ElementStore::UInt32(v) => format_into!(v),
            ElementStore::Int64(v) => format_into!(v),
            ElementStore::UInt64(v) => format_into!(v),
            ElementStore::Float32(v) => format_into!(v),
            ElementStore::Float64(v) => format_into!(v),
            ElementStore::Bool(v) => format_into!(v),
            ElementStore::Str(v) => {
                destination.clone_from_slice(v);
                Ok(())
            }
            ElementStore::Handle(_) => Err(LaminaDataError::TypeMismatch(
                "Handle buffers take part in no element conversion!".into(),
            )),
        },
        SourceView::Dense(cells) => format_into!(cells.iter()),
    }
}

/// Fills a sparse payload's dense view: any non-zero source element becomes
/// an active cell.
fn fill_dense(destination: &mut [u8], source: &SourceView) -> Result<(), LaminaDataError> {
    macro_rules! truthy_into {
        ($values:expr, $zero:expr) => {{
            for (cell, value) in destination.iter_mut().zip($values) {
                *cell = u8::from(*value != $zero);
            }
            Ok(())
        }};
    }
    match source {
        SourceView::Cells(store) => match store {
            ElementStore::Int8(v) => truthy_into!(v, 0),
            ElementStore::Int16(v) => truthy_into!(v, 0),
            ElementStore::UInt16(v) => truthy_into!(v, 0),
            ElementStore::Int32(v) => truthy_into!(v, 0),
            ElementStore::UInt32(v) => truthy_into!(v, 0),
            ElementStore::Int64(v) => truthy_into!(v, 0),
            ElementStore::UInt64(v) => truthy_into!(v, 0),
            ElementStore::Float32(v) => truthy_into!(v, 0.0),
            ElementStore::Float64(v) => truthy_into!(v, 0.0),
            ElementStore::Bool(v) => {
                for (cell, value) in destination.iter_mut().zip(v) {
                    *cell = u8::from(*value);
                }
                Ok(())
            }
            ElementStore::Str(v) => {
                for (cell, text) in destination.iter_mut().zip(v) {
                    let value = i64::from_text(text)?;
                    *cell = u8::from(value != 0);
                }
                Ok(())
            }
            ElementStore::Handle(_) => Err(LaminaDataError::TypeMismatch(
                "Handle buffers take part in no element conversion!".into(),
            )),
        },
        SourceView::Dense(cells) => truthy_into!(cells.iter(), 0),
    }
}
