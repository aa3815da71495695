use super::shared_buffer::{SharedElementBuffer, StorageHandle};
use super::storage::BufferElement;
use crate::{ElementKind, LaminaDataError, SdrPayload};
use ndarray::Array1;
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// The user-facing value wrapper over [`SharedElementBuffer`].
///
/// Adds deep copy, typed vector population and extraction, single-item
/// typed access, range-subset extraction, and construction from raw
/// sequences. Every core operation of the underlying buffer is available
/// through deref.
///
/// Sharing semantics follow the core: [`share_handle`] yields another array
/// over the same storage, and only [`deep_copy`] produces independently
/// owned storage.
///
/// # Examples
/// ```
/// use lamina_structures::{ElementArray, ElementKind};
///
/// let array = ElementArray::from_slice(&[1i32, 2, 3, 4]);
/// assert_eq!(array.kind(), ElementKind::Int32);
///
/// let alias = array.share_handle();
/// let copy = array.deep_copy();
/// assert!(alias.is_alias_of(&array));
/// assert!(!copy.is_alias_of(&array));
/// assert!(copy == array);
/// ```
///
/// [`share_handle`]: ElementArray::share_handle
/// [`deep_copy`]: ElementArray::deep_copy
#[derive(Debug, PartialEq)]
pub struct ElementArray {
    buffer: SharedElementBuffer,
}

impl ElementArray {
    /// Creates an empty array of the given kind. No storage is allocated.
    pub fn new(kind: ElementKind) -> Self {
        ElementArray {
            buffer: SharedElementBuffer::new(kind),
        }
    }

    /// Wraps an existing buffer handle.
    pub fn from_buffer(buffer: SharedElementBuffer) -> Self {
        ElementArray { buffer }
    }

    /// Creates an array owning the given values. The kind follows the
    /// element type.
    pub fn from_vec<T: BufferElement>(values: Vec<T>) -> Self {
        let mut array = ElementArray::new(T::KIND);
        array.buffer.storage = Some(StorageHandle::Cells(Rc::new(RefCell::new(
            T::store_from_vec(values),
        ))));
        array
    }

    /// Creates an array by copying in the given values.
    pub fn from_slice<T: BufferElement>(values: &[T]) -> Self {
        Self::from_vec(values.to_vec())
    }

    /// Creates an SDR array owning a copy of the given payload, dimensions
    /// included.
    pub fn from_payload(payload: &SdrPayload) -> Self {
        let mut array = ElementArray::new(ElementKind::Sdr);
        array.buffer.storage = Some(StorageHandle::Payload(Rc::new(RefCell::new(
            payload.clone(),
        ))));
        array
    }

    /// Returns a new array sharing this array's storage.
    pub fn share_handle(&self) -> Self {
        ElementArray {
            buffer: self.buffer.share_handle(),
        }
    }

    /// Makes a full copy with new owned storage: byte-identical cells, an
    /// element-wise clone for strings, and a dense-bit copy at the current
    /// dimensions for a payload. The copy is never an alias of the
    /// original.
    pub fn deep_copy(&self) -> Self {
        let storage = match &self.buffer.storage {
            None => None,
            Some(StorageHandle::Cells(store)) => Some(StorageHandle::Cells(Rc::new(
                RefCell::new(store.borrow().clone()),
            ))),
            Some(StorageHandle::Payload(payload)) => Some(StorageHandle::Payload(Rc::new(
                RefCell::new(payload.borrow().clone()),
            ))),
        };
        let mut buffer = SharedElementBuffer::new(self.buffer.kind());
        buffer.storage = storage;
        ElementArray { buffer }
    }

    /// Copies every element out as a vector of `T`, converting each element
    /// through the kind registry. An empty or unallocated array yields an
    /// empty vector.
    ///
    /// # Examples
    /// ```
    /// use lamina_structures::ElementArray;
    ///
    /// let array = ElementArray::from_slice(&[1i32, 0, 7]);
    /// assert_eq!(array.as_vec::<f64>().unwrap(), vec![1.0, 0.0, 7.0]);
    /// assert_eq!(array.as_vec::<bool>().unwrap(), vec![true, false, true]);
    /// ```
    pub fn as_vec<T: BufferElement>(&self) -> Result<Vec<T>, LaminaDataError> {
        if !self.buffer.has_storage() || self.buffer.element_count() == 0 {
            return Ok(Vec::new());
        }
        if self.buffer.kind() == T::KIND {
            return Ok(self.buffer.values::<T>()?.to_vec());
        }
        let converted = self.convert_to(T::KIND)?;
        let result = converted.values::<T>()?.to_vec();
        Ok(result)
    }

    /// Copies every element out as a 1-D ndarray of `T`, with conversion.
    pub fn copy_as_ndarray<T: BufferElement>(&self) -> Result<Array1<T>, LaminaDataError> {
        Ok(Array1::from_vec(self.as_vec::<T>()?))
    }

    /// Fills this array from a slice, reallocating to the slice's length
    /// and converting each element into this array's kind. An SDR array
    /// loads the slice as a rank-1 dense view and refreshes its cached
    /// representations.
    ///
    /// A slice of payloads is not expressible: [`BufferElement`] is
    /// implemented for cell element types only.
    pub fn populate<T: BufferElement>(&mut self, values: &[T]) -> Result<(), LaminaDataError> {
        let source = ElementArray::from_slice(values);
        self.buffer.allocate(values.len())?;
        source.buffer.convert_into(&mut self.buffer, 0, 0)
    }

    /// Allocates a new zero-filled array of `kind` sized to this array's
    /// count and converts this array into it.
    pub fn convert_to(&self, kind: ElementKind) -> Result<ElementArray, LaminaDataError> {
        let mut converted = ElementArray::new(kind);
        converted.buffer.allocate(self.buffer.element_count())?;
        self.buffer.convert_into(&mut converted.buffer, 0, 0)?;
        Ok(converted)
    }

    /// Returns the element at `index` as `T`. Fails with `OutOfRange` when
    /// the index is not below the count and with `TypeMismatch` when `T`
    /// does not match this array's kind.
    pub fn item<T: BufferElement>(&self, index: usize) -> Result<T, LaminaDataError> {
        if index >= self.buffer.element_count() {
            return Err(LaminaDataError::OutOfRange(format!(
                "Index {} exceeds the element count {}!",
                index,
                self.buffer.element_count()
            )));
        }
        if T::KIND != self.buffer.kind() {
            return Err(LaminaDataError::TypeMismatch(format!(
                "Requested a {} item from a {} buffer!",
                T::KIND,
                self.buffer.kind()
            )));
        }
        Ok(self.buffer.values::<T>()?[index].clone())
    }

    /// Copies the requested range into a new owned array of the same kind.
    /// Not valid for SDR arrays; the window must satisfy
    /// `offset + count <= element_count()`.
    ///
    /// # Examples
    /// ```
    /// use lamina_structures::ElementArray;
    ///
    /// let array = ElementArray::from_vec((0i32..10).collect::<Vec<_>>());
    /// let window = array.subset(3, 4).unwrap();
    /// assert_eq!(window.as_vec::<i32>().unwrap(), vec![3, 4, 5, 6]);
    /// ```
    pub fn subset(&self, offset: usize, count: usize) -> Result<ElementArray, LaminaDataError> {
        if self.buffer.kind() == ElementKind::Sdr {
            return Err(LaminaDataError::UnsupportedForSdr(
                "subset is not valid against a payload buffer".into(),
            ));
        }
        if offset + count > self.buffer.element_count() {
            return Err(LaminaDataError::OutOfRange(format!(
                "Requested subset out of range; offset ({}) + count ({}) is larger than the element count ({})!",
                offset,
                count,
                self.buffer.element_count()
            )));
        }
        let mut window = ElementArray::new(self.buffer.kind());
        match &self.buffer.storage {
            Some(StorageHandle::Cells(store)) => {
                window.buffer.storage = Some(StorageHandle::Cells(Rc::new(RefCell::new(
                    store.borrow().clone_range(offset, count),
                ))));
            }
            _ => {
                // unallocated source with a zero window still yields valid empty storage
                window.buffer.allocate(count)?;
            }
        }
        Ok(window)
    }
}

impl Deref for ElementArray {
    type Target = SharedElementBuffer;
    fn deref(&self) -> &SharedElementBuffer {
        &self.buffer
    }
}

impl DerefMut for ElementArray {
    fn deref_mut(&mut self) -> &mut SharedElementBuffer {
        &mut self.buffer
    }
}

impl std::fmt::Display for ElementArray {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ElementArray({})", self.buffer)
    }
}
