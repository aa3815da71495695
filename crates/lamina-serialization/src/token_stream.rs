//! The bracketed token-stream codec.
//!
//! An ASCII, whitespace-delimited grammar:
//!
//! ```text
//! [ <KindName> <count> ( v1 v2 ... vN ) ]     cell kinds, bools as 0/1
//! [ Str(<count>) "v1" "v2" ... "vN" ]         string buffers
//! [ SDR ( d1 ... dK ) ( i1 ... iM ) ]         payload dimensions, then
//!                                             active-cell indices
//! ```
//!
//! Decoding is strict: every literal token must appear in exactly this
//! order, and any violation fails with `MalformedStream` without producing
//! a buffer.

use lamina_structures::{ElementArray, ElementKind, LaminaDataError, SdrPayload};
use std::fmt::Write as _;

/// Encodes a buffer into the token-stream text form.
///
/// Handle buffers carry opaque values and refuse to encode.
pub fn encode_token_stream(array: &ElementArray) -> Result<String, LaminaDataError> {
    let mut out = String::new();
    match array.kind() {
        ElementKind::Sdr => {
            out.push_str("[ SDR ( ");
            if array.has_storage() {
                let payload = array.payload()?;
                let payload = payload.borrow();
                for dim in payload.dimensions() {
                    write!(out, "{} ", dim).ok();
                }
                out.push_str(") ( ");
                for index in payload.to_sparse() {
                    write!(out, "{} ", index).ok();
                }
            } else {
                out.push_str("0 ) ( ");
            }
            out.push_str(") ]");
        }
        ElementKind::Str => {
            write!(out, "[ Str({}) ", array.element_count()).ok();
            if array.has_storage() {
                for value in array.values::<String>()?.iter() {
                    write!(out, "\"{}\" ", escape_quoted(value)).ok();
                }
            }
            out.push(']');
        }
        ElementKind::Handle => {
            return Err(LaminaDataError::TypeMismatch(
                "Handle buffers cannot be serialized!".into(),
            ));
        }
        kind => {
            write!(out, "[ {} {} ( ", kind, array.element_count()).ok();
            if array.has_storage() {
                emit_cell_values(&mut out, array)?;
            }
            out.push_str(") ]");
        }
    }
    Ok(out)
}

fn emit_cell_values(out: &mut String, array: &ElementArray) -> Result<(), LaminaDataError> {
    macro_rules! emit {
        ($element:ty) => {
            for value in array.values::<$element>()?.iter() {
                write!(out, "{} ", value).ok();
            }
        };
    }
    match array.kind() {
        ElementKind::Int8 => emit!(i8),
        ElementKind::Int16 => emit!(i16),
        ElementKind::UInt16 => emit!(u16),
        ElementKind::Int32 => emit!(i32),
        ElementKind::UInt32 => emit!(u32),
        ElementKind::Int64 => emit!(i64),
        ElementKind::UInt64 => emit!(u64),
        ElementKind::Float32 => emit!(f32),
        ElementKind::Float64 => emit!(f64),
        ElementKind::Bool => {
            for value in array.values::<bool>()?.iter() {
                write!(out, "{} ", u8::from(*value)).ok();
            }
        }
        ElementKind::Handle | ElementKind::Sdr | ElementKind::Str => {
            return Err(LaminaDataError::InternalError(
                "Cell emission reached a non-cell kind!".into(),
            ));
        }
    }
    Ok(())
}

/// Decodes the token-stream text form into a new buffer.
pub fn decode_token_stream(text: &str) -> Result<ElementArray, LaminaDataError> {
    let mut lexer = Lexer::new(text);
    lexer.expect_word("[")?;

    let kind_token = lexer.next_word("an element kind")?;
    let array = if kind_token == "SDR" {
        decode_sdr(&mut lexer)?
    } else if let Some(count) = parse_counted_str_kind(&kind_token)? {
        decode_strings(&mut lexer, count)?
    } else {
        let kind = ElementKind::parse_name(&kind_token).map_err(|_| {
            LaminaDataError::MalformedStream(format!(
                "'{}' does not name an element kind!",
                kind_token
            ))
        })?;
        if kind == ElementKind::Handle {
            return Err(LaminaDataError::MalformedStream(
                "Handle buffers cannot appear in a token stream!".into(),
            ));
        }
        let count_token = lexer.next_word("an element count")?;
        let count: usize = count_token.parse().map_err(|_| {
            LaminaDataError::MalformedStream(format!(
                "'{}' is not a valid element count!",
                count_token
            ))
        })?;
        lexer.expect_word("(")?;
        let array = decode_cell_values(&mut lexer, kind, count)?;
        lexer.expect_word(")")?;
        array
    };
    lexer.expect_word("]")?;
    Ok(array)
}

/// Decodes into an existing buffer. On failure the target is reset to an
/// empty buffer of its declared kind and the error is returned.
pub fn decode_token_stream_into(
    target: &mut ElementArray,
    text: &str,
) -> Result<(), LaminaDataError> {
    match decode_token_stream(text) {
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

fn decode_sdr(lexer: &mut Lexer) -> Result<ElementArray, LaminaDataError> {
    lexer.expect_word("(")?;
    let dimensions = lexer.words_until_close("a payload dimension")?;
    let dimensions = dimensions
        .iter()
        .map(|token| {
            token.parse::<u32>().map_err(|_| {
                LaminaDataError::MalformedStream(format!(
                    "'{}' is not a valid payload dimension!",
                    token
                ))
            })
        })
        .collect::<Result<Vec<u32>, _>>()?;

    lexer.expect_word("(")?;
    let indices = lexer.words_until_close("an active cell index")?;
    let indices = indices
        .iter()
        .map(|token| {
            token.parse::<u32>().map_err(|_| {
                LaminaDataError::MalformedStream(format!(
                    "'{}' is not a valid active cell index!",
                    token
                ))
            })
        })
        .collect::<Result<Vec<u32>, _>>()?;

    let mut payload = SdrPayload::new(&dimensions)?;
    payload.set_sparse(&indices).map_err(|error| {
        LaminaDataError::MalformedStream(format!("Active cell list is invalid: {}", error))
    })?;
    Ok(ElementArray::from_payload(&payload))
}

// Upper bound for speculative pre-allocation while decoding; counts above
// this still decode, they just grow as elements actually arrive.
const PREALLOCATION_CAP: usize = 1 << 16;

fn decode_strings(lexer: &mut Lexer, count: usize) -> Result<ElementArray, LaminaDataError> {
    let mut values = Vec::with_capacity(count.min(PREALLOCATION_CAP));
    for _ in 0..count {
        values.push(lexer.next_quoted()?);
    }
    Ok(ElementArray::from_vec(values))
}

fn decode_cell_values(
    lexer: &mut Lexer,
    kind: ElementKind,
    count: usize,
) -> Result<ElementArray, LaminaDataError> {
    macro_rules! parse_all {
        ($element:ty) => {{
            let mut values: Vec<$element> = Vec::with_capacity(count.min(PREALLOCATION_CAP));
            for _ in 0..count {
                let token = lexer.next_word("an element value")?;
                values.push(token.parse::<$element>().map_err(|_| {
                    LaminaDataError::MalformedStream(format!(
                        "'{}' is not a valid {} element!",
                        token, kind
                    ))
                })?);
            }
            ElementArray::from_vec(values)
        }};
    }
    Ok(match kind {
        ElementKind::Int8 => parse_all!(i8),
        ElementKind::Int16 => parse_all!(i16),
        ElementKind::UInt16 => parse_all!(u16),
        ElementKind::Int32 => parse_all!(i32),
        ElementKind::UInt32 => parse_all!(u32),
        ElementKind::Int64 => parse_all!(i64),
        ElementKind::UInt64 => parse_all!(u64),
        ElementKind::Float32 => parse_all!(f32),
        ElementKind::Float64 => parse_all!(f64),
        ElementKind::Bool => {
            let mut values: Vec<bool> = Vec::with_capacity(count.min(PREALLOCATION_CAP));
            for _ in 0..count {
                let token = lexer.next_word("a boolean element")?;
                values.push(match token.as_str() {
                    "0" => false,
                    "1" => true,
                    _ => {
                        return Err(LaminaDataError::MalformedStream(format!(
                            "'{}' is not a valid Bool element (expected 0 or 1)!",
                            token
                        )))
                    }
                });
            }
            ElementArray::from_vec(values)
        }
        ElementKind::Handle | ElementKind::Sdr | ElementKind::Str => {
            return Err(LaminaDataError::InternalError(
                "Cell decoding reached a non-cell kind!".into(),
            ));
        }
    })
}

/// `Str(<count>)` kind token; anything else yields `None`.
fn parse_counted_str_kind(token: &str) -> Result<Option<usize>, LaminaDataError> {
    let Some(inner) = token.strip_prefix("Str(") else {
        return Ok(None);
    };
    let Some(digits) = inner.strip_suffix(')') else {
        return Err(LaminaDataError::MalformedStream(format!(
            "'{}' is not a valid string kind token (expected Str(<count>))!",
            token
        )));
    };
    digits.parse::<usize>().map(Some).map_err(|_| {
        LaminaDataError::MalformedStream(format!(
            "'{}' is not a valid string element count!",
            digits
        ))
    })
}

fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Whitespace-delimited tokenizer with quoted-string support.
struct Lexer<'a> {
    rest: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Lexer { rest: text }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Next bare word, or an error naming what was expected.
    fn next_word(&mut self, expected: &str) -> Result<String, LaminaDataError> {
        self.skip_whitespace();
        if self.rest.is_empty() {
            return Err(LaminaDataError::MalformedStream(format!(
                "Stream ended while expecting {}!",
                expected
            )));
        }
        if self.rest.starts_with('"') {
            return Err(LaminaDataError::MalformedStream(format!(
                "Found a quoted string while expecting {}!",
                expected
            )));
        }
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(word.to_string())
    }

    /// Requires the next bare word to be exactly `literal`.
    fn expect_word(&mut self, literal: &str) -> Result<(), LaminaDataError> {
        let word = self.next_word(&format!("'{}'", literal))?;
        if word != literal {
            return Err(LaminaDataError::MalformedStream(format!(
                "Expected '{}' but found '{}'!",
                literal, word
            )));
        }
        Ok(())
    }

    /// Collects bare words until the closing ')'.
    fn words_until_close(&mut self, expected: &str) -> Result<Vec<String>, LaminaDataError> {
        let mut words = Vec::new();
        loop {
            let word = self.next_word(expected)?;
            if word == ")" {
                return Ok(words);
            }
            words.push(word);
        }
    }

    /// Next quoted string, unescaped.
    fn next_quoted(&mut self) -> Result<String, LaminaDataError> {
        self.skip_whitespace();
        let mut chars = self.rest.char_indices();
        match chars.next() {
            Some((_, '"')) => {}
            _ => {
                return Err(LaminaDataError::MalformedStream(
                    "Expected an opening '\"' for a string element!".into(),
                ))
            }
        }
        let mut value = String::new();
        let mut escaped = false;
        for (index, ch) in chars {
            if escaped {
                value.push(match ch {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                self.rest = &self.rest[index + 1..];
                return Ok(value);
            } else {
                value.push(ch);
            }
        }
        Err(LaminaDataError::MalformedStream(
            "Stream ended inside a quoted string element!".into(),
        ))
    }
}
