//! # Lamina - Typed Shared Buffers for Neuro-Inspired Computation
//!
//! Lamina provides the typed, shareable data buffer that carries values
//! between the computation nodes of a neuro-inspired learning engine, along
//! with the serialization formats that move those buffers in and out of
//! persisted state.
//!
//! ## Components
//!
//! - **`lamina-structures`** - the buffer core: the closed element-kind
//!   registry, the reference-counted [`SharedElementBuffer`], the
//!   [`ElementArray`] value wrapper, the [`SdrPayload`] sparse payload, and
//!   the conversion registry between element kinds.
//! - **`lamina-serialization`** - three independent round-trip codecs
//!   (token stream, structured tree, packed bytes) plus a write-only JSON
//!   emitter, all surfaced through [`BufferSerialization`].
//!
//! ## Quick Start
//!
//! ```rust
//! use lamina::{BufferSerialization, ElementArray, ElementKind};
//!
//! // one non-generic handle over any element kind
//! let samples = ElementArray::from_slice(&[0i32, 5, 0, 7]);
//!
//! // zero-copy sharing, explicit deep copies
//! let shared = samples.share_handle();
//! assert!(shared.is_alias_of(&samples));
//! assert!(!samples.deep_copy().is_alias_of(&samples));
//!
//! // cross-kind conversion through the registry
//! let potentials = samples.convert_to(ElementKind::Float32).unwrap();
//! assert_eq!(potentials.as_vec::<f32>().unwrap(), vec![0.0, 5.0, 0.0, 7.0]);
//!
//! // three independent serialization formats
//! let text = samples.to_token_stream().unwrap();
//! let reloaded = ElementArray::from_token_stream(&text).unwrap();
//! assert!(reloaded == samples);
//! ```
//!
//! The buffer core is single threaded by design: sharing is plain `Rc`
//! reference counting, and the surrounding graph scheduler is responsible
//! for serializing access.

pub use lamina_serialization::{
    decode_packed, decode_packed_into, decode_token_stream, decode_token_stream_into, decode_tree,
    decode_tree_into, decode_tree_text, emit_json, encode_packed, encode_token_stream,
    encode_tree, encode_tree_text, BufferSerialization,
};
pub use lamina_structures::{
    BufferElement, ElementArray, ElementKind, ElementStore, LaminaDataError, OpaqueHandle,
    SdrPayload, SharedElementBuffer,
};
