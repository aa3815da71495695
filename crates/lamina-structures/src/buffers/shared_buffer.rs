use super::conversion::{convert_region, DestView, SourceView};
use super::storage::{BufferElement, ElementStore};
use crate::{ElementKind, LaminaDataError, SdrPayload};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use tracing::trace;

/// Reference-counted handle to a buffer's backing storage.
///
/// Cell kinds share an [`ElementStore`]; the SDR kind shares a live
/// [`SdrPayload`] directly, so every holder of the handle observes payload
/// mutations immediately.
#[derive(Debug, Clone)]
pub(crate) enum StorageHandle {
    Cells(Rc<RefCell<ElementStore>>),
    Payload(Rc<RefCell<SdrPayload>>),
}

/// The shared, type-tagged memory cell carrying values between computation
/// nodes.
///
/// A buffer is created empty with a fixed element kind, then allocates its
/// own storage or attaches storage shared by another owner. Storage is
/// reference counted (single threaded, `Rc`): the last handle to drop frees
/// it. Sharing is always explicit through [`share_handle`], and only
/// [`ElementArray::deep_copy`](crate::ElementArray::deep_copy) breaks
/// aliasing.
///
/// # Examples
/// ```
/// use lamina_structures::{ElementKind, SharedElementBuffer};
///
/// let mut buffer = SharedElementBuffer::new(ElementKind::Int32);
/// assert!(!buffer.has_storage());
///
/// buffer.allocate(4).unwrap();
/// assert!(buffer.has_storage());
/// assert_eq!(buffer.element_count(), 4);
/// buffer.values_mut::<i32>().unwrap()[2] = 7;
///
/// let alias = buffer.share_handle();
/// assert!(alias.is_alias_of(&buffer));
/// assert_eq!(alias.values::<i32>().unwrap()[2], 7);
/// ```
///
/// [`share_handle`]: SharedElementBuffer::share_handle
#[derive(Debug)]
pub struct SharedElementBuffer {
    /// Element kind; fixed while storage exists
    kind: ElementKind,
    /// Backing storage; `None` when never allocated or released
    pub(crate) storage: Option<StorageHandle>,
}

impl SharedElementBuffer {
    /// Creates an empty buffer of the given kind. No storage is allocated.
    pub fn new(kind: ElementKind) -> Self {
        SharedElementBuffer {
            kind,
            storage: None,
        }
    }

    /// The element kind of this buffer.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// True once storage has been allocated or attached, including a
    /// zero-element allocation. Distinguishes "never allocated" from
    /// "allocated empty".
    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    /// Number of elements held. For the SDR kind this is always re-derived
    /// from the live payload, so mutations made by another holder of the
    /// payload handle are reflected immediately.
    pub fn element_count(&self) -> usize {
        match &self.storage {
            None => 0,
            Some(StorageHandle::Cells(store)) => store.borrow().len(),
            Some(StorageHandle::Payload(payload)) => payload.borrow().total_len(),
        }
    }

    /// Bytes occupied by the element data.
    pub fn byte_len(&self) -> usize {
        match &self.storage {
            None => 0,
            Some(StorageHandle::Cells(store)) => store.borrow().byte_len(),
            Some(StorageHandle::Payload(payload)) => payload.borrow().total_len(),
        }
    }

    /// Returns a new buffer sharing this buffer's storage. The storage is
    /// freed only when the last sharing handle drops.
    pub fn share_handle(&self) -> Self {
        SharedElementBuffer {
            kind: self.kind,
            storage: self.storage.clone(),
        }
    }

    /// Allocates owned, zeroed storage for `count` elements, releasing any
    /// existing storage first. Allocating zero elements is legal and leaves
    /// the buffer with valid, empty storage.
    ///
    /// For the SDR kind this delegates to [`allocate_shaped`] with a rank-1
    /// shape of `[count]`.
    ///
    /// [`allocate_shaped`]: SharedElementBuffer::allocate_shaped
    pub fn allocate(&mut self, count: usize) -> Result<(), LaminaDataError> {
        if self.kind == ElementKind::Sdr {
            let dim = u32::try_from(count).map_err(|_| {
                LaminaDataError::OutOfRange(format!(
                    "Cannot allocate a payload of {} cells; the cell index space is 32-bit!",
                    count
                ))
            })?;
            return self.allocate_shaped(&[dim]);
        }
        let store = ElementStore::new_zeroed(self.kind, count).ok_or_else(|| {
            LaminaDataError::InternalError("Cell allocation reached the SDR kind!".into())
        })?;
        self.storage = Some(StorageHandle::Cells(Rc::new(RefCell::new(store))));
        Ok(())
    }

    /// Allocates an owned payload of the given shape. Valid only for the
    /// SDR kind; the element count becomes the payload's total cell count.
    pub fn allocate_shaped(&mut self, dimensions: &[u32]) -> Result<(), LaminaDataError> {
        if self.kind != ElementKind::Sdr {
            return Err(LaminaDataError::TypeMismatch(format!(
                "Shaped allocation is only valid for SDR buffers, not {}!",
                self.kind
            )));
        }
        let payload = SdrPayload::new(dimensions)?;
        self.storage = Some(StorageHandle::Payload(Rc::new(RefCell::new(payload))));
        Ok(())
    }

    /// Attaches caller-owned cell storage without copying. The caller keeps
    /// its own handle, so the storage stays alive for as long as either side
    /// needs it. The store's kind must match this buffer's kind, and SDR
    /// storage must go through [`attach_payload`] instead.
    ///
    /// [`attach_payload`]: SharedElementBuffer::attach_payload
    pub fn attach_shared(
        &mut self,
        storage: Rc<RefCell<ElementStore>>,
    ) -> Result<(), LaminaDataError> {
        if self.kind == ElementKind::Sdr {
            return Err(LaminaDataError::TypeMismatch(
                "SDR buffers attach a payload handle, not cell storage!".into(),
            ));
        }
        let attached_kind = storage.borrow().kind();
        if attached_kind != self.kind {
            return Err(LaminaDataError::TypeMismatch(format!(
                "Cannot attach {} storage to a {} buffer!",
                attached_kind, self.kind
            )));
        }
        self.storage = Some(StorageHandle::Cells(storage));
        Ok(())
    }

    /// Attaches a caller-owned sparse payload without copying. The buffer
    /// becomes an SDR buffer; any previous storage is released.
    pub fn attach_payload(&mut self, payload: Rc<RefCell<SdrPayload>>) {
        self.kind = ElementKind::Sdr;
        self.storage = Some(StorageHandle::Payload(payload));
    }

    /// Drops this handle's storage reference and resets the count to zero.
    /// Other handles sharing the storage are unaffected. Safe to call
    /// repeatedly.
    pub fn release(&mut self) {
        self.storage = None;
    }

    /// Resets every element to its zero value: numeric and boolean cells are
    /// zero-filled, an SDR payload is cleared through its own zero
    /// operation, and string elements become empty strings. A no-op without
    /// storage.
    pub fn zero(&mut self) {
        match &self.storage {
            None => {}
            Some(StorageHandle::Cells(store)) => store.borrow_mut().zero(),
            Some(StorageHandle::Payload(payload)) => payload.borrow_mut().zero(),
        }
    }

    /// Shrinks the logical element count, keeping the allocation. Affects
    /// every handle sharing the storage. Not valid for the SDR kind.
    pub fn truncate(&mut self, count: usize) -> Result<(), LaminaDataError> {
        match &self.storage {
            None => Err(LaminaDataError::OutOfRange(
                "Cannot truncate a buffer with no storage!".into(),
            )),
            Some(StorageHandle::Payload(_)) => Err(LaminaDataError::UnsupportedForSdr(
                "truncate is not valid against a payload buffer".into(),
            )),
            Some(StorageHandle::Cells(store)) => {
                let mut store = store.borrow_mut();
                if count > store.len() {
                    return Err(LaminaDataError::OutOfRange(format!(
                        "Cannot truncate {} elements to {}!",
                        store.len(),
                        count
                    )));
                }
                store.truncate(count);
                Ok(())
            }
        }
    }

    /// Typed view of the elements. Fails with `TypeMismatch` when `T` does
    /// not match this buffer's kind (SDR buffers expose their cells through
    /// [`dense_values`]) and with `OutOfRange` when no storage exists.
    ///
    /// [`dense_values`]: SharedElementBuffer::dense_values
    pub fn values<T: BufferElement>(&self) -> Result<Ref<'_, [T]>, LaminaDataError> {
        match &self.storage {
            None => Err(no_storage_error(self.kind)),
            Some(StorageHandle::Payload(_)) => Err(LaminaDataError::TypeMismatch(
                "SDR buffers expose their cells through dense_values()!".into(),
            )),
            Some(StorageHandle::Cells(store)) => {
                Ref::filter_map(store.borrow(), |store| {
                    T::slice_of(store).map(|values| &values[..])
                })
                .map_err(|_| typed_view_error(T::KIND, self.kind))
            }
        }
    }

    /// Typed mutable view of the elements. Writes are visible to every
    /// handle sharing the storage.
    pub fn values_mut<T: BufferElement>(&mut self) -> Result<RefMut<'_, [T]>, LaminaDataError> {
        match &self.storage {
            None => Err(no_storage_error(self.kind)),
            Some(StorageHandle::Payload(_)) => Err(LaminaDataError::TypeMismatch(
                "SDR buffers expose their cells through dense_values_mut()!".into(),
            )),
            Some(StorageHandle::Cells(store)) => {
                RefMut::filter_map(store.borrow_mut(), |store| {
                    T::slice_of_mut(store).map(|values| &mut values[..])
                })
                .map_err(|_| typed_view_error(T::KIND, self.kind))
            }
        }
    }

    /// Dense 0/1 byte view of an SDR buffer's cells.
    pub fn dense_values(&self) -> Result<Ref<'_, [u8]>, LaminaDataError> {
        match &self.storage {
            None => Err(no_storage_error(self.kind)),
            Some(StorageHandle::Cells(_)) => Err(LaminaDataError::TypeMismatch(format!(
                "dense_values() is only valid for SDR buffers, not {}!",
                self.kind
            ))),
            Some(StorageHandle::Payload(payload)) => {
                Ok(Ref::map(payload.borrow(), |payload| payload.dense()))
            }
        }
    }

    /// Dense mutable byte view of an SDR buffer's cells. Invalidates the
    /// payload's cached sparse view.
    pub fn dense_values_mut(&mut self) -> Result<RefMut<'_, [u8]>, LaminaDataError> {
        match &self.storage {
            None => Err(no_storage_error(self.kind)),
            Some(StorageHandle::Cells(_)) => Err(LaminaDataError::TypeMismatch(format!(
                "dense_values_mut() is only valid for SDR buffers, not {}!",
                self.kind
            ))),
            Some(StorageHandle::Payload(payload)) => Ok(RefMut::map(
                payload.borrow_mut(),
                |payload| payload.dense_mut(),
            )),
        }
    }

    /// The live payload handle of an SDR buffer.
    pub fn payload(&self) -> Result<Rc<RefCell<SdrPayload>>, LaminaDataError> {
        match &self.storage {
            Some(StorageHandle::Payload(payload)) => Ok(Rc::clone(payload)),
            Some(StorageHandle::Cells(_)) => Err(LaminaDataError::TypeMismatch(format!(
                "A {} buffer does not contain a payload!",
                self.kind
            ))),
            None => Err(no_storage_error(self.kind)),
        }
    }

    /// True iff both buffers are non-empty and share the identical backing
    /// storage. Content equality alone never makes buffers aliases.
    pub fn is_alias_of(&self, other: &SharedElementBuffer) -> bool {
        match (&self.storage, &other.storage) {
            (Some(StorageHandle::Cells(a)), Some(StorageHandle::Cells(b))) => Rc::ptr_eq(a, b),
            (Some(StorageHandle::Payload(a)), Some(StorageHandle::Payload(b))) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Converts this buffer's contents into `destination`'s kind, writing
    /// `self.element_count()` elements starting at element `offset`.
    ///
    /// `limit` is the total destination size in elements; 0 means
    /// `self.element_count() + offset`. A destination smaller than `limit`
    /// is reallocated to `limit` and zero-filled before the write, so
    /// unwritten regions are defined.
    ///
    /// Multiple sources may fan in to disjoint offset ranges of one
    /// destination: pre-size the destination with the final `limit` and
    /// write in increasing offset order, otherwise an intermediate
    /// reallocation discards earlier writes.
    pub fn convert_into(
        &self,
        destination: &mut SharedElementBuffer,
        offset: usize,
        limit: usize,
    ) -> Result<(), LaminaDataError> {
        let count = self.element_count();
        let limit = if limit == 0 { count + offset } else { limit };
        if limit > destination.element_count() {
            trace!(
                kind = %destination.kind(),
                from = destination.element_count(),
                to = limit,
                "growing conversion destination"
            );
            destination.allocate(limit)?;
        }
        if count + offset > limit {
            return Err(LaminaDataError::OutOfRange(format!(
                "Converting {} elements at offset {} exceeds the destination limit {}!",
                count, offset, limit
            )));
        }
        if count == 0 {
            return Ok(());
        }
        if self.is_alias_of(destination) {
            if offset == 0 && self.kind == destination.kind {
                return Ok(());
            }
            return Err(LaminaDataError::TypeMismatch(
                "Cannot convert a buffer into its own backing storage at an offset!".into(),
            ));
        }
        match (&self.storage, &destination.storage) {
            (Some(StorageHandle::Cells(source)), Some(StorageHandle::Cells(dest))) => {
                let source = source.borrow();
                let mut dest = dest.borrow_mut();
                convert_region(
                    &SourceView::Cells(&source),
                    DestView::Cells(&mut dest),
                    offset,
                    count,
                )
            }
            (Some(StorageHandle::Cells(source)), Some(StorageHandle::Payload(dest))) => {
                let source = source.borrow();
                let mut dest = dest.borrow_mut();
                convert_region(
                    &SourceView::Cells(&source),
                    DestView::Dense(dest.dense_mut()),
                    offset,
                    count,
                )
            }
            (Some(StorageHandle::Payload(source)), Some(StorageHandle::Cells(dest))) => {
                let source = source.borrow();
                let mut dest = dest.borrow_mut();
                convert_region(
                    &SourceView::Dense(source.dense()),
                    DestView::Cells(&mut dest),
                    offset,
                    count,
                )
            }
            (Some(StorageHandle::Payload(source)), Some(StorageHandle::Payload(dest))) => {
                let source = source.borrow();
                let mut dest = dest.borrow_mut();
                convert_region(
                    &SourceView::Dense(source.dense()),
                    DestView::Dense(dest.dense_mut()),
                    offset,
                    count,
                )
            }
            _ => Err(LaminaDataError::InternalError(
                "Conversion reached a buffer without storage!".into(),
            )),
        }
    }

    /// Truthiness comparison against a plain byte sequence: equal iff,
    /// elementwise, "this element is exactly zero" matches "this byte is
    /// zero". Magnitudes are ignored.
    ///
    /// # Examples
    /// ```
    /// use lamina_structures::ElementArray;
    ///
    /// let buffer = ElementArray::from_slice(&[0i32, 5, 0, 7]);
    /// assert!(buffer.matches_nonzero_pattern(&[0, 1, 0, 1]));
    /// assert!(!buffer.matches_nonzero_pattern(&[1, 0, 0, 1]));
    /// ```
    pub fn matches_nonzero_pattern(&self, pattern: &[u8]) -> bool {
        if self.element_count() != pattern.len() {
            return false;
        }
        match &self.storage {
            None => true, // both empty
            Some(StorageHandle::Cells(store)) => {
                let store = store.borrow();
                pattern
                    .iter()
                    .enumerate()
                    .all(|(index, byte)| store.is_zero_at(index) == (*byte == 0))
            }
            Some(StorageHandle::Payload(payload)) => {
                let payload = payload.borrow();
                payload
                    .dense()
                    .iter()
                    .zip(pattern)
                    .all(|(cell, byte)| (*cell == 0) == (*byte == 0))
            }
        }
    }
}

fn no_storage_error(kind: ElementKind) -> LaminaDataError {
    LaminaDataError::OutOfRange(format!("The {} buffer has no allocated storage!", kind))
}

fn typed_view_error(requested: ElementKind, actual: ElementKind) -> LaminaDataError {
    LaminaDataError::TypeMismatch(format!(
        "Requested a {} view of a {} buffer!",
        requested, actual
    ))
}

/// Content equality: equal kind and count, then structural payload equality
/// for SDR, element-wise equality for strings, and bit-exact comparison for
/// everything else. Two empty buffers of one kind are always equal.
impl PartialEq for SharedElementBuffer {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind || self.element_count() != other.element_count() {
            return false;
        }
        if self.element_count() == 0 {
            return true;
        }
        match (&self.storage, &other.storage) {
            (Some(StorageHandle::Cells(a)), Some(StorageHandle::Cells(b))) => {
                Rc::ptr_eq(a, b) || a.borrow().content_equal(&b.borrow())
            }
            (Some(StorageHandle::Payload(a)), Some(StorageHandle::Payload(b))) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for SharedElementBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.has_storage() {
            write!(
                f,
                "SharedElementBuffer({}, {} elements)",
                self.kind,
                self.element_count()
            )
        } else {
            write!(f, "SharedElementBuffer({}, unallocated)", self.kind)
        }
    }
}
