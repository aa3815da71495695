//! The structured-tree codec.
//!
//! Operates on a [`serde_json::Value`] tree of the shape
//! `{"type": "<kind>", "data": [...]}`. A `type` beginning with `SDR`
//! carries dimensions in parenthesized form (`SDR(40,40)`); any other
//! `type` names an element kind. The text entry points parse JSON; any
//! structured-value parser producing the same tree plugs in equally.

use lamina_structures::{ElementArray, ElementKind, LaminaDataError, SdrPayload};
use serde_json::{json, Map, Value};
use tracing::warn;

/// Encodes a buffer into the `{type, data}` tree form.
pub fn encode_tree(array: &ElementArray) -> Result<Value, LaminaDataError> {
    let mut tree = Map::new();
    match array.kind() {
        ElementKind::Sdr => {
            if !array.has_storage() {
                tree.insert("type".into(), Value::String("SDR(0)".into()));
                tree.insert("data".into(), Value::Array(Vec::new()));
                return Ok(Value::Object(tree));
            }
            let payload = array.payload()?;
            let payload = payload.borrow();
            let dimensions = payload
                .dimensions()
                .iter()
                .map(|dim| dim.to_string())
                .collect::<Vec<_>>()
                .join(",");
            tree.insert("type".into(), Value::String(format!("SDR({})", dimensions)));
            // A sparse list over a 1- or 2-cell payload would trip the
            // decoder's density heuristic, so tiny payloads go out dense.
            let data = if payload.total_len() <= 2 {
                payload.dense().iter().map(|cell| json!(cell)).collect()
            } else {
                payload.to_sparse().iter().map(|index| json!(index)).collect()
            };
            tree.insert("data".into(), Value::Array(data));
        }
        ElementKind::Handle => {
            return Err(LaminaDataError::TypeMismatch(
                "Handle buffers cannot be serialized!".into(),
            ));
        }
        kind => {
            tree.insert("type".into(), Value::String(kind.name().into()));
            tree.insert("data".into(), Value::Array(cell_data(array)?));
        }
    }
    Ok(Value::Object(tree))
}

/// Encodes a buffer into JSON text of the tree form.
pub fn encode_tree_text(array: &ElementArray) -> Result<String, LaminaDataError> {
    Ok(encode_tree(array)?.to_string())
}

fn cell_data(array: &ElementArray) -> Result<Vec<Value>, LaminaDataError> {
    macro_rules! collect {
        ($element:ty) => {
            array
                .values::<$element>()?
                .iter()
                .map(|value| json!(value))
                .collect()
        };
    }
    Ok(match array.kind() {
        _ if !array.has_storage() => Vec::new(),
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
            let mut data = Vec::with_capacity(array.element_count());
            for value in array.values::<f32>()?.iter() {
                data.push(finite_number(*value as f64)?);
            }
            data
        }
        ElementKind::Float64 => {
            let mut data = Vec::with_capacity(array.element_count());
            for value in array.values::<f64>()?.iter() {
                data.push(finite_number(*value)?);
            }
            data
        }
        ElementKind::Handle | ElementKind::Sdr => {
            return Err(LaminaDataError::InternalError(
                "Cell emission reached a non-cell kind!".into(),
            ));
        }
    })
}

fn finite_number(value: f64) -> Result<Value, LaminaDataError> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| {
            LaminaDataError::OutOfRange(format!(
                "Non-finite value {} cannot be represented in a tree!",
                value
            ))
        })
}

/// Decodes the `{type, data[, dim]}` tree form into a new buffer.
pub fn decode_tree(tree: &Value) -> Result<ElementArray, LaminaDataError> {
    let object = tree.as_object().ok_or_else(|| {
        LaminaDataError::MalformedTree(
            "Expected a map like {type: \"Int32\", data: [1, 0, 1]}!".into(),
        )
    })?;
    let type_name = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            LaminaDataError::MalformedTree("The tree is missing a 'type' string!".into())
        })?;
    let data = object
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            LaminaDataError::MalformedTree("The tree is missing a 'data' sequence!".into())
        })?;

    if type_name.starts_with("SDR") {
        return decode_sdr_tree(type_name, object, data);
    }

    let kind = ElementKind::parse_name(type_name).map_err(|_| {
        LaminaDataError::MalformedTree(format!(
            "'{}' does not name an element kind!",
            type_name
        ))
    })?;
    if kind == ElementKind::Handle {
        return Err(LaminaDataError::MalformedTree(
            "Handle buffers cannot appear in a tree!".into(),
        ));
    }
    decode_cell_tree(kind, data)
}

/// Decodes JSON text of the tree form into a new buffer.
pub fn decode_tree_text(text: &str) -> Result<ElementArray, LaminaDataError> {
    let tree: Value = serde_json::from_str(text).map_err(|error| {
        LaminaDataError::MalformedTree(format!("Tree text is not parseable: {}", error))
    })?;
    decode_tree(&tree)
}

/// Decodes into an existing buffer. On failure the target is reset to an
/// empty buffer of its declared kind and the error is returned.
pub fn decode_tree_into(target: &mut ElementArray, tree: &Value) -> Result<(), LaminaDataError> {
    match decode_tree(tree) {
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

fn decode_sdr_tree(
    type_name: &str,
    object: &Map<String, Value>,
    data: &[Value],
) -> Result<ElementArray, LaminaDataError> {
    let dimensions = match parse_type_dimensions(type_name)? {
        Some(dimensions) => dimensions,
        None => match object.get("dim") {
            Some(dim) => dim
                .as_array()
                .ok_or_else(|| {
                    LaminaDataError::MalformedTree("'dim' must be a sequence!".into())
                })?
                .iter()
                .map(|value| u32::try_from(scalar_as_u64(value)?).map_err(|_| {
                    LaminaDataError::MalformedTree(format!("'{}' is not a valid dimension!", value))
                }))
                .collect::<Result<Vec<u32>, _>>()?,
            None => vec![data.len() as u32],
        },
    };

    let mut payload = SdrPayload::new(&dimensions)?;
    let total = payload.total_len();

    // Dense data has exactly one entry per cell; a sparse list of that same
    // length is only distinguishable by peeking at index 2, which for
    // ascending unique indices must be >= 2.
    let dense = data.len() == total
        && (data.len() <= 2 || scalar_as_u64(&data[2])? <= 1);
    if dense && !data.is_empty() && data.len() <= 2 {
        warn!(
            cells = total,
            "density heuristic is ambiguous for payloads of 1 or 2 cells; reading dense"
        );
    }

    if dense {
        let mut bits = Vec::with_capacity(data.len());
        for value in data {
            bits.push(u8::from(scalar_as_bool(value)?));
        }
        payload.set_dense(&bits)?;
    } else {
        let mut indices = Vec::with_capacity(data.len());
        for value in data {
            indices.push(u32::try_from(scalar_as_u64(value)?).map_err(|_| {
                LaminaDataError::MalformedTree(format!(
                    "'{}' is not a valid active cell index!",
                    value
                ))
            })?);
        }
        payload.set_sparse(&indices).map_err(|error| {
            LaminaDataError::MalformedTree(format!("Active cell list is invalid: {}", error))
        })?;
    }
    Ok(ElementArray::from_payload(&payload))
}

/// Parses `SDR(d1,d2,...)` dimension syntax; bare `SDR` yields `None`.
fn parse_type_dimensions(type_name: &str) -> Result<Option<Vec<u32>>, LaminaDataError> {
    let Some(open) = type_name.find('(') else {
        return Ok(None);
    };
    let Some(close) = type_name.rfind(')') else {
        return Err(LaminaDataError::MalformedTree(format!(
            "Inconsistent dimension syntax in '{}'; expected SDR(nnn[,nnn[,nnn]])!",
            type_name
        )));
    };
    let mut dimensions = Vec::new();
    for part in type_name[open + 1..close].split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        dimensions.push(part.parse::<u32>().map_err(|_| {
            LaminaDataError::MalformedTree(format!(
                "'{}' is not a valid dimension in '{}'!",
                part, type_name
            ))
        })?);
    }
    Ok(Some(dimensions))
}

fn decode_cell_tree(kind: ElementKind, data: &[Value]) -> Result<ElementArray, LaminaDataError> {
    macro_rules! collect_ints {
        ($element:ty) => {{
            let mut values: Vec<$element> = Vec::with_capacity(data.len());
            for value in data {
                let wide = scalar_as_i128(value)?;
                values.push(<$element>::try_from(wide).map_err(|_| {
                    LaminaDataError::OutOfRange(format!(
                        "Value {} does not fit in {}!",
                        wide, kind
                    ))
                })?);
            }
            ElementArray::from_vec(values)
        }};
    }
    Ok(match kind {
        ElementKind::Int8 => collect_ints!(i8),
        ElementKind::Int16 => collect_ints!(i16),
        ElementKind::UInt16 => collect_ints!(u16),
        ElementKind::Int32 => collect_ints!(i32),
        ElementKind::UInt32 => collect_ints!(u32),
        ElementKind::Int64 => collect_ints!(i64),
        ElementKind::UInt64 => collect_ints!(u64),
        ElementKind::Float32 => {
            let mut values: Vec<f32> = Vec::with_capacity(data.len());
            for value in data {
                let wide = scalar_as_f64(value)?;
                if wide.abs() > f32::MAX as f64 {
                    return Err(LaminaDataError::OutOfRange(format!(
                        "Value {} does not fit in Float32!",
                        wide
                    )));
                }
                values.push(wide as f32);
            }
            ElementArray::from_vec(values)
        }
        ElementKind::Float64 => {
            let mut values: Vec<f64> = Vec::with_capacity(data.len());
            for value in data {
                values.push(scalar_as_f64(value)?);
            }
            ElementArray::from_vec(values)
        }
        ElementKind::Bool => {
            let mut values: Vec<bool> = Vec::with_capacity(data.len());
            for value in data {
                values.push(scalar_as_bool(value)?);
            }
            ElementArray::from_vec(values)
        }
        ElementKind::Str => {
            let mut values: Vec<String> = Vec::with_capacity(data.len());
            for value in data {
                values.push(scalar_as_string(value)?);
            }
            ElementArray::from_vec(values)
        }
        ElementKind::Handle | ElementKind::Sdr => {
            return Err(LaminaDataError::InternalError(
                "Cell decoding reached a non-cell kind!".into(),
            ));
        }
    })
}

// Scalar coercions over the tree's leaves. Numbers, booleans, and numeric
// strings all coerce the way the element registry would.

fn scalar_as_i128(value: &Value) -> Result<i128, LaminaDataError> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(int as i128)
            } else if let Some(int) = number.as_u64() {
                Ok(int as i128)
            } else {
                let float = number.as_f64().unwrap_or(f64::NAN);
                if float.fract() == 0.0 && float.abs() < i128::MAX as f64 {
                    Ok(float as i128)
                } else {
                    Err(LaminaDataError::OutOfRange(format!(
                        "Value {} is not an integral element!",
                        float
                    )))
                }
            }
        }
        Value::Bool(flag) => Ok(*flag as i128),
        Value::String(text) => text.trim().parse::<i128>().map_err(|_| {
            LaminaDataError::MalformedTree(format!("Cannot parse '{}' as an integer!", text))
        }),
        other => Err(LaminaDataError::MalformedTree(format!(
            "Element {} is not a scalar!",
            other
        ))),
    }
}

fn scalar_as_u64(value: &Value) -> Result<u64, LaminaDataError> {
    let wide = scalar_as_i128(value)?;
    u64::try_from(wide).map_err(|_| {
        LaminaDataError::OutOfRange(format!("Value {} is not a valid unsigned element!", wide))
    })
}

fn scalar_as_f64(value: &Value) -> Result<f64, LaminaDataError> {
    match value {
        Value::Number(number) => number.as_f64().ok_or_else(|| {
            LaminaDataError::MalformedTree(format!("Number {} is not representable!", number))
        }),
        Value::Bool(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| {
            LaminaDataError::MalformedTree(format!("Cannot parse '{}' as a float!", text))
        }),
        other => Err(LaminaDataError::MalformedTree(format!(
            "Element {} is not a scalar!",
            other
        ))),
    }
}

fn scalar_as_bool(value: &Value) -> Result<bool, LaminaDataError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(_) => Ok(scalar_as_i128(value)? != 0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Ok(true),
            "false" | "off" | "0" => Ok(false),
            _ => Err(LaminaDataError::MalformedTree(format!(
                "Cannot parse '{}' as a boolean!",
                text
            ))),
        },
        other => Err(LaminaDataError::MalformedTree(format!(
            "Element {} is not a scalar!",
            other
        ))),
    }
}

fn scalar_as_string(value: &Value) -> Result<String, LaminaDataError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(LaminaDataError::MalformedTree(format!(
            "Element {} is not a scalar!",
            other
        ))),
    }
}
