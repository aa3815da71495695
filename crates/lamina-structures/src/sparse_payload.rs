use crate::LaminaDataError;
use ndarray::Array1;

/// A sparse distributed representation carried as one buffer element kind.
///
/// The payload owns its shape and exposes two interchangeable views over the
/// same cells: a dense byte view (one 0/1 byte per cell, the canonical
/// storage) and a sparse view listing the indices of active cells. The
/// sparse view is cached and rebuilt lazily after any mutation of the dense
/// side.
///
/// # Examples
/// ```
/// use lamina_structures::SdrPayload;
///
/// let mut payload = SdrPayload::new(&[3, 3]).unwrap();
/// assert_eq!(payload.total_len(), 9);
///
/// payload.set_sparse(&[1, 4, 8]).unwrap();
/// assert_eq!(payload.dense(), &[0, 1, 0, 0, 1, 0, 0, 0, 1]);
/// assert_eq!(payload.sparse(), &[1, 4, 8]);
/// ```
#[derive(Debug, Clone)]
pub struct SdrPayload {
    /// Shape of the payload; the flat cell count is the product of all entries
    dimensions: Vec<u32>,
    /// Canonical dense view, one byte per cell holding 0 or 1
    dense: Vec<u8>,
    /// Cached ascending active-cell indices; `None` after a dense mutation
    sparse_cache: Option<Vec<u32>>,
}

impl SdrPayload {
    /// Creates a zeroed payload of the given shape.
    ///
    /// A zero anywhere in the shape (or an empty shape) yields a valid
    /// payload with no cells.
    pub fn new(dimensions: &[u32]) -> Result<Self, LaminaDataError> {
        let total = Self::cell_count_of(dimensions)?;
        Ok(SdrPayload {
            dimensions: dimensions.to_vec(),
            dense: vec![0u8; total],
            sparse_cache: Some(Vec::new()),
        })
    }

    /// Creates a rank-1 payload directly from a dense 0/1 byte view.
    pub fn from_dense(bits: &[u8]) -> Self {
        SdrPayload {
            dimensions: vec![bits.len() as u32],
            dense: bits.iter().map(|b| u8::from(*b != 0)).collect(),
            sparse_cache: None,
        }
    }

    fn cell_count_of(dimensions: &[u32]) -> Result<usize, LaminaDataError> {
        if dimensions.is_empty() {
            return Ok(0);
        }
        let mut total: usize = 1;
        for dim in dimensions {
            total = total.checked_mul(*dim as usize).ok_or_else(|| {
                LaminaDataError::OutOfRange(format!(
                    "Payload shape {:?} overflows the addressable cell count!",
                    dimensions
                ))
            })?;
        }
        Ok(total)
    }

    /// Shape of this payload.
    pub fn dimensions(&self) -> &[u32] {
        &self.dimensions
    }

    /// Total number of cells, the product of all dimensions.
    pub fn total_len(&self) -> usize {
        self.dense.len()
    }

    /// True when this payload has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Number of active (non-zero) cells.
    pub fn active_count(&self) -> usize {
        match &self.sparse_cache {
            Some(sparse) => sparse.len(),
            None => self.dense.iter().filter(|b| **b != 0).count(),
        }
    }

    /// The dense view: one byte per cell, 0 or 1.
    pub fn dense(&self) -> &[u8] {
        &self.dense
    }

    /// Mutable dense view. Invalidates the cached sparse view, since the
    /// caller may flip any cell through the returned slice.
    pub fn dense_mut(&mut self) -> &mut [u8] {
        self.sparse_cache = None;
        &mut self.dense
    }

    /// Replaces the dense view. The input length must match the cell count;
    /// non-zero input bytes are normalized to 1.
    pub fn set_dense(&mut self, bits: &[u8]) -> Result<(), LaminaDataError> {
        if bits.len() != self.dense.len() {
            return Err(LaminaDataError::OutOfRange(format!(
                "Dense input holds {} cells but payload shape {:?} holds {}!",
                bits.len(),
                self.dimensions,
                self.dense.len()
            )));
        }
        for (cell, bit) in self.dense.iter_mut().zip(bits) {
            *cell = u8::from(*bit != 0);
        }
        self.sparse_cache = None;
        Ok(())
    }

    /// Replaces the contents from a sparse list of active-cell indices.
    /// Indices may arrive in any order; each must address a valid cell.
    pub fn set_sparse(&mut self, indices: &[u32]) -> Result<(), LaminaDataError> {
        for index in indices {
            if *index as usize >= self.dense.len() {
                return Err(LaminaDataError::OutOfRange(format!(
                    "Active cell index {} exceeds payload cell count {}!",
                    index,
                    self.dense.len()
                )));
            }
        }
        self.dense.fill(0);
        for index in indices {
            self.dense[*index as usize] = 1;
        }
        self.sparse_cache = None;
        Ok(())
    }

    /// The sparse view: ascending indices of all active cells. Rebuilt from
    /// the dense view on first access after a mutation, then cached.
    pub fn sparse(&mut self) -> &[u32] {
        if self.sparse_cache.is_none() {
            self.sparse_cache = Some(self.to_sparse());
        }
        self.sparse_cache.as_deref().unwrap_or(&[])
    }

    /// Computes the sparse view without touching the cache. Useful when only
    /// a shared (non-mutable) payload handle is held.
    pub fn to_sparse(&self) -> Vec<u32> {
        self.dense
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell != 0)
            .map(|(index, _)| index as u32)
            .collect()
    }

    /// Clears every cell to 0.
    pub fn zero(&mut self) {
        self.dense.fill(0);
        self.sparse_cache = Some(Vec::new());
    }

    /// Copies the dense view out as a 1-D ndarray.
    ///
    /// # Examples
    /// ```
    /// use lamina_structures::SdrPayload;
    ///
    /// let mut payload = SdrPayload::new(&[4]).unwrap();
    /// payload.set_sparse(&[2]).unwrap();
    /// let nd = payload.copy_dense_as_ndarray();
    /// assert_eq!(nd.to_vec(), vec![0, 0, 1, 0]);
    /// ```
    pub fn copy_dense_as_ndarray(&self) -> Array1<u8> {
        Array1::from_vec(self.dense.clone())
    }
}

/// Structural equality: same shape and the same dense cells.
impl PartialEq for SdrPayload {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions && self.dense == other.dense
    }
}
impl Eq for SdrPayload {}

impl std::fmt::Display for SdrPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "SdrPayload(dimensions: {:?}, {} of {} cells active)",
            self.dimensions,
            self.active_count(),
            self.total_len()
        )
    }
}
