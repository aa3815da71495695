use crate::{
    decode_packed, decode_token_stream, decode_tree, decode_tree_text, emit_json, encode_packed,
    encode_token_stream, encode_tree, encode_tree_text,
};
use lamina_structures::{ElementArray, LaminaDataError};
use serde_json::Value;

/// Serialization surface of a buffer: the three round-trip codecs plus the
/// write-only JSON emission, as methods.
///
/// The free codec functions remain the primitive API; this trait is the
/// convenience layer collaborators import.
///
/// # Examples
/// ```
/// use lamina_serialization::BufferSerialization;
/// use lamina_structures::ElementArray;
///
/// let array = ElementArray::from_slice(&[1i32, 2, 3]);
/// let text = array.to_token_stream().unwrap();
/// let decoded = ElementArray::from_token_stream(&text).unwrap();
/// assert!(decoded == array);
/// ```
pub trait BufferSerialization: Sized {
    /// Encodes into the bracketed token-stream text form.
    fn to_token_stream(&self) -> Result<String, LaminaDataError>;
    /// Decodes the token-stream text form.
    fn from_token_stream(text: &str) -> Result<Self, LaminaDataError>;

    /// Encodes into the `{type, data}` structured tree.
    fn to_tree(&self) -> Result<Value, LaminaDataError>;
    /// Encodes into JSON text of the structured tree.
    fn to_tree_text(&self) -> Result<String, LaminaDataError>;
    /// Decodes a structured tree.
    fn from_tree(tree: &Value) -> Result<Self, LaminaDataError>;
    /// Decodes JSON text of the structured tree.
    fn from_tree_text(text: &str) -> Result<Self, LaminaDataError>;

    /// Encodes into the packed byte form.
    fn to_packed(&self) -> Result<Vec<u8>, LaminaDataError>;
    /// Decodes the packed byte form.
    fn from_packed(bytes: &[u8]) -> Result<Self, LaminaDataError>;

    /// Emits flat JSON text (write-only).
    fn to_json_text(&self) -> Result<String, LaminaDataError>;
}

impl BufferSerialization for ElementArray {
    fn to_token_stream(&self) -> Result<String, LaminaDataError> {
        encode_token_stream(self)
    }

    fn from_token_stream(text: &str) -> Result<Self, LaminaDataError> {
        decode_token_stream(text)
    }

    fn to_tree(&self) -> Result<Value, LaminaDataError> {
        encode_tree(self)
    }

    fn to_tree_text(&self) -> Result<String, LaminaDataError> {
        encode_tree_text(self)
    }

    fn from_tree(tree: &Value) -> Result<Self, LaminaDataError> {
        decode_tree(tree)
    }

    fn from_tree_text(text: &str) -> Result<Self, LaminaDataError> {
        decode_tree_text(text)
    }

    fn to_packed(&self) -> Result<Vec<u8>, LaminaDataError> {
        encode_packed(self)
    }

    fn from_packed(bytes: &[u8]) -> Result<Self, LaminaDataError> {
        decode_packed(bytes)
    }

    fn to_json_text(&self) -> Result<String, LaminaDataError> {
        emit_json(self)
    }
}
