use crate::{ElementKind, OpaqueHandle};

/// Tagged storage for every cell-style element kind.
///
/// One variant per kind keeps each element in its natural Rust type, so
/// cross-kind reinterpretation is impossible by construction. The SDR kind
/// is deliberately absent: a payload-kind buffer stores a live
/// [`SdrPayload`](crate::SdrPayload) instead of a flat vector.
#[derive(Debug, Clone)]
pub enum ElementStore {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Handle(Vec<OpaqueHandle>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

macro_rules! for_each_store_variant {
    ($self:ident, $values:ident => $body:expr) => {
        match $self {
            ElementStore::Int8($values) => $body,
            ElementStore::Int16($values) => $body,
            ElementStore::UInt16($values) => $body,
            ElementStore::Int32($values) => $body,
            ElementStore::UInt32($values) => $body,
            ElementStore::Int64($values) => $body,
            ElementStore::UInt64($values) => $body,
            ElementStore::Float32($values) => $body,
            ElementStore::Float64($values) => $body,
            ElementStore::Handle($values) => $body,
            ElementStore::Bool($values) => $body,
            ElementStore::Str($values) => $body,
        }
    };
}

impl ElementStore {
    /// Allocates zero-valued storage for `count` elements of a cell kind.
    /// Returns `None` for the SDR kind, which does not use cell storage.
    pub fn new_zeroed(kind: ElementKind, count: usize) -> Option<ElementStore> {
        Some(match kind {
            ElementKind::Int8 => ElementStore::Int8(vec![0; count]),
            ElementKind::Int16 => ElementStore::Int16(vec![0; count]),
            ElementKind::UInt16 => ElementStore::UInt16(vec![0; count]),
            ElementKind::Int32 => ElementStore::Int32(vec![0; count]),
            ElementKind::UInt32 => ElementStore::UInt32(vec![0; count]),
            ElementKind::Int64 => ElementStore::Int64(vec![0; count]),
            ElementKind::UInt64 => ElementStore::UInt64(vec![0; count]),
            ElementKind::Float32 => ElementStore::Float32(vec![0.0; count]),
            ElementKind::Float64 => ElementStore::Float64(vec![0.0; count]),
            ElementKind::Handle => ElementStore::Handle(vec![OpaqueHandle::default(); count]),
            ElementKind::Bool => ElementStore::Bool(vec![false; count]),
            ElementKind::Str => ElementStore::Str(vec![String::new(); count]),
            ElementKind::Sdr => return None,
        })
    }

    /// The element kind held by this store.
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementStore::Int8(_) => ElementKind::Int8,
            ElementStore::Int16(_) => ElementKind::Int16,
            ElementStore::UInt16(_) => ElementKind::UInt16,
            ElementStore::Int32(_) => ElementKind::Int32,
            ElementStore::UInt32(_) => ElementKind::UInt32,
            ElementStore::Int64(_) => ElementKind::Int64,
            ElementStore::UInt64(_) => ElementKind::UInt64,
            ElementStore::Float32(_) => ElementKind::Float32,
            ElementStore::Float64(_) => ElementKind::Float64,
            ElementStore::Handle(_) => ElementKind::Handle,
            ElementStore::Bool(_) => ElementKind::Bool,
            ElementStore::Str(_) => ElementKind::Str,
        }
    }

    /// Number of elements held.
    pub fn len(&self) -> usize {
        for_each_store_variant!(self, values => values.len())
    }

    /// True when no elements are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes occupied by the element data. Strings report their summed
    /// UTF-8 lengths.
    pub fn byte_len(&self) -> usize {
        match self {
            ElementStore::Str(values) => values.iter().map(|s| s.len()).sum(),
            _ => {
                // fixed_byte_size is Some for every non-Str cell kind
                self.len() * self.kind().fixed_byte_size().unwrap_or(0)
            }
        }
    }

    /// Resets every element to its zero value. Strings become empty rather
    /// than being byte-filled, since each element owns heap data.
    pub fn zero(&mut self) {
        match self {
            ElementStore::Int8(values) => values.fill(0),
            ElementStore::Int16(values) => values.fill(0),
            ElementStore::UInt16(values) => values.fill(0),
            ElementStore::Int32(values) => values.fill(0),
            ElementStore::UInt32(values) => values.fill(0),
            ElementStore::Int64(values) => values.fill(0),
            ElementStore::UInt64(values) => values.fill(0),
            ElementStore::Float32(values) => values.fill(0.0),
            ElementStore::Float64(values) => values.fill(0.0),
            ElementStore::Handle(values) => values.fill(OpaqueHandle::default()),
            ElementStore::Bool(values) => values.fill(false),
            ElementStore::Str(values) => {
                for value in values.iter_mut() {
                    value.clear();
                }
            }
        }
    }

    /// Shrinks the logical element count, keeping the allocation.
    pub fn truncate(&mut self, count: usize) {
        for_each_store_variant!(self, values => values.truncate(count))
    }

    /// Clones `count` elements starting at `offset` into a fresh store of
    /// the same kind. The caller has already bounds-checked the window.
    pub fn clone_range(&self, offset: usize, count: usize) -> ElementStore {
        match self {
            ElementStore::Int8(v) => ElementStore::Int8(v[offset..offset + count].to_vec()),
            ElementStore::Int16(v) => ElementStore::Int16(v[offset..offset + count].to_vec()),
            ElementStore::UInt16(v) => ElementStore::UInt16(v[offset..offset + count].to_vec()),
            ElementStore::Int32(v) => ElementStore::Int32(v[offset..offset + count].to_vec()),
            ElementStore::UInt32(v) => ElementStore::UInt32(v[offset..offset + count].to_vec()),
            ElementStore::Int64(v) => ElementStore::Int64(v[offset..offset + count].to_vec()),
            ElementStore::UInt64(v) => ElementStore::UInt64(v[offset..offset + count].to_vec()),
            ElementStore::Float32(v) => ElementStore::Float32(v[offset..offset + count].to_vec()),
            ElementStore::Float64(v) => ElementStore::Float64(v[offset..offset + count].to_vec()),
            ElementStore::Handle(v) => ElementStore::Handle(v[offset..offset + count].to_vec()),
            ElementStore::Bool(v) => ElementStore::Bool(v[offset..offset + count].to_vec()),
            ElementStore::Str(v) => ElementStore::Str(v[offset..offset + count].to_vec()),
        }
    }

    /// Content equality. Floats compare bit-exact, so NaN-bearing stores
    /// are equal to their copies.
    pub fn content_equal(&self, other: &ElementStore) -> bool {
        match (self, other) {
            (ElementStore::Int8(a), ElementStore::Int8(b)) => a == b,
            (ElementStore::Int16(a), ElementStore::Int16(b)) => a == b,
            (ElementStore::UInt16(a), ElementStore::UInt16(b)) => a == b,
            (ElementStore::Int32(a), ElementStore::Int32(b)) => a == b,
            (ElementStore::UInt32(a), ElementStore::UInt32(b)) => a == b,
            (ElementStore::Int64(a), ElementStore::Int64(b)) => a == b,
            (ElementStore::UInt64(a), ElementStore::UInt64(b)) => a == b,
            (ElementStore::Float32(a), ElementStore::Float32(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ElementStore::Float64(a), ElementStore::Float64(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ElementStore::Handle(a), ElementStore::Handle(b)) => a == b,
            (ElementStore::Bool(a), ElementStore::Bool(b)) => a == b,
            (ElementStore::Str(a), ElementStore::Str(b)) => a == b,
            _ => false,
        }
    }

    /// Truthiness of one element: is it exactly its zero value? Floats test
    /// their bit pattern, strings their emptiness.
    pub fn is_zero_at(&self, index: usize) -> bool {
        match self {
            ElementStore::Int8(v) => v[index] == 0,
            ElementStore::Int16(v) => v[index] == 0,
            ElementStore::UInt16(v) => v[index] == 0,
            ElementStore::Int32(v) => v[index] == 0,
            ElementStore::UInt32(v) => v[index] == 0,
            ElementStore::Int64(v) => v[index] == 0,
            ElementStore::UInt64(v) => v[index] == 0,
            ElementStore::Float32(v) => v[index].to_bits() == 0,
            ElementStore::Float64(v) => v[index].to_bits() == 0,
            ElementStore::Handle(v) => v[index].0 == 0,
            ElementStore::Bool(v) => !v[index],
            ElementStore::Str(v) => v[index].is_empty(),
        }
    }
}

/// Binds a Rust element type to its [`ElementKind`] and store variant.
///
/// Implemented for every cell element type; there is intentionally no
/// implementation for [`SdrPayload`](crate::SdrPayload), so a "vector of
/// payloads" is rejected at compile time rather than at run time.
pub trait BufferElement: Clone + 'static {
    /// The kind tag this element type maps to.
    const KIND: ElementKind;

    /// Extracts the typed slice when the store holds this element type.
    fn slice_of(store: &ElementStore) -> Option<&[Self]>;

    /// Extracts the typed mutable slice when the store holds this element type.
    fn slice_of_mut(store: &mut ElementStore) -> Option<&mut [Self]>;

    /// Wraps an owned vector of this element type into a store.
    fn store_from_vec(values: Vec<Self>) -> ElementStore;
}

macro_rules! impl_buffer_element {
    ($($element:ty => $variant:ident),* $(,)?) => {
        $(
            impl BufferElement for $element {
                const KIND: ElementKind = ElementKind::$variant;

                fn slice_of(store: &ElementStore) -> Option<&[Self]> {
                    match store {
                        ElementStore::$variant(values) => Some(values),
                        _ => None,
                    }
                }

                fn slice_of_mut(store: &mut ElementStore) -> Option<&mut [Self]> {
                    match store {
                        ElementStore::$variant(values) => Some(values),
                        _ => None,
                    }
                }

                fn store_from_vec(values: Vec<Self>) -> ElementStore {
                    ElementStore::$variant(values)
                }
            }
        )*
    };
}

impl_buffer_element!(
    i8 => Int8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    OpaqueHandle => Handle,
    bool => Bool,
    String => Str,
);
