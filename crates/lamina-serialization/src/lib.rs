//! # Lamina Data Serialization
//!
//! This crate provides the serialization formats for the Lamina shared
//! buffer types: three independent round-trip codecs and a write-only JSON
//! emitter, each with strict, fail-closed decoding.
//!
//! ## Core Components
//!
//! - **Token stream** - a bracketed ASCII form, `[ Int32 3 ( 1 2 3 ) ]`
//! - **Structured tree** - a `{type, data}` tree over [`serde_json::Value`]
//! - **Packed form** - a size-delimited binary form for persisted snapshots
//! - **JSON emission** - a flat, write-only JSON array
//! - **[`BufferSerialization`]** - all of the above as methods on
//!   [`ElementArray`](lamina_structures::ElementArray)
//!
//! The three codecs are mutually non-interoperable; each decodes only what
//! its own encoder produced.
//!
//! ## Basic Usage
//!
//! ```rust
//! use lamina_serialization::BufferSerialization;
//! use lamina_structures::ElementArray;
//!
//! let array = ElementArray::from_slice(&[4i64, 0, -9]);
//!
//! let text = array.to_token_stream().unwrap();
//! assert_eq!(text, "[ Int64 3 ( 4 0 -9 ) ]");
//!
//! let bytes = array.to_packed().unwrap();
//! let reloaded = ElementArray::from_packed(&bytes).unwrap();
//! assert!(reloaded == array);
//! ```

mod buffer_serializable;
mod json_writer;
mod packed;
mod token_stream;
mod tree_form;

pub use buffer_serializable::BufferSerialization;
pub use json_writer::emit_json;
pub use packed::{decode_packed, decode_packed_into, encode_packed};
pub use token_stream::{decode_token_stream, decode_token_stream_into, encode_token_stream};
pub use tree_form::{
    decode_tree, decode_tree_into, decode_tree_text, encode_tree, encode_tree_text,
};
