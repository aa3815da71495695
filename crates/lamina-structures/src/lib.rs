//! The core crate for Lamina. Defines the typed shared buffers that carry
//! values between computation nodes, the sparse distributed payload they can
//! wrap, and the conversions between element kinds.

pub mod buffers;
mod element_kind;
mod error;
mod sparse_payload;

pub use buffers::{BufferElement, ElementArray, ElementStore, SharedElementBuffer};
pub use element_kind::{ElementKind, OpaqueHandle};
pub use error::LaminaDataError;
pub use sparse_payload::SdrPayload;
