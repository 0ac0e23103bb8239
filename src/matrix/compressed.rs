//! Compressed sparse storage in CSR or CSC layout

use std::fmt;

use crate::error::{AlgebraError, Result};
use crate::matrix::{check_bounds, Matrix, MatrixMut, Scalar, Stamp, StorageOrder};

/// What to do when the same (row, col) pair appears twice during construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail with `MalformedInput`
    #[default]
    Reject,
    /// Sum the repeated values into one stored entry
    Accumulate,
}

/// A sparse matrix in compressed row (CSR) or compressed column (CSC) format
///
/// The matrix is stored using three arrays:
/// - pointers: size major + 1, pointers[k] is where segment k starts in indices/values
/// - indices: size nnz, the minor-axis index of each stored value
/// - values: size nnz, the stored values
///
/// For `RowMajor` the major axis is the row and indices are columns; for
/// `ColumnMajor` it is the other way around. Indices are strictly increasing
/// inside every segment. Stored values may be zero.
#[derive(Clone)]
pub struct CompressedMatrix<T> {
    n_rows: usize,
    n_cols: usize,
    order: StorageOrder,
    pointers: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<T>,
    stamp: Stamp,
}

impl<T: Scalar> CompressedMatrix<T> {
    /// Creates an empty matrix with the given dimensions
    pub fn zeros(n_rows: usize, n_cols: usize, order: StorageOrder) -> Self {
        let major = major_dim(n_rows, n_cols, order);
        Self {
            n_rows,
            n_cols,
            order,
            pointers: vec![0; major + 1],
            indices: Vec::new(),
            values: Vec::new(),
            stamp: Stamp::fresh(),
        }
    }

    /// Creates an identity matrix of the given size
    pub fn identity(n: usize, order: StorageOrder) -> Self {
        Self {
            n_rows: n,
            n_cols: n,
            order,
            pointers: (0..=n).collect(),
            indices: (0..n).collect(),
            values: vec![T::one(); n],
            stamp: Stamp::fresh(),
        }
    }

    /// Creates a matrix from raw compressed arrays, checking every invariant
    ///
    /// # Errors
    ///
    /// `MalformedInput` if:
    /// - pointers.len() is not major + 1, or pointers[0] != 0
    /// - pointers decrease anywhere
    /// - the last pointer differs from indices.len() or values.len()
    /// - an index is outside the minor dimension or a segment is not strictly increasing
    pub fn from_raw(
        n_rows: usize,
        n_cols: usize,
        order: StorageOrder,
        pointers: Vec<usize>,
        indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        let major = major_dim(n_rows, n_cols, order);
        let minor = minor_dim(n_rows, n_cols, order);

        if pointers.len() != major + 1 {
            return Err(AlgebraError::malformed_structure(format!(
                "expected {} pointers, found {}",
                major + 1,
                pointers.len()
            )));
        }
        if pointers[0] != 0 {
            return Err(AlgebraError::malformed_structure("first pointer must be 0"));
        }
        if indices.len() != values.len() || pointers[major] != indices.len() {
            return Err(AlgebraError::malformed_structure(format!(
                "last pointer {} does not match {} indices and {} values",
                pointers[major],
                indices.len(),
                values.len()
            )));
        }
        // Checked before any segment is sliced
        if let Some(k) = pointers.windows(2).position(|window| window[0] > window[1]) {
            return Err(AlgebraError::malformed_structure(format!(
                "pointers decrease at segment {k}"
            )));
        }
        for (k, window) in pointers.windows(2).enumerate() {
            let segment = &indices[window[0]..window[1]];
            if let Some(&bad) = segment.iter().find(|&&idx| idx >= minor) {
                return Err(AlgebraError::malformed_structure(format!(
                    "index {bad} in segment {k} exceeds minor dimension {minor}"
                )));
            }
            if segment.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(AlgebraError::malformed_structure(format!(
                    "indices in segment {k} are not strictly increasing"
                )));
            }
        }

        Ok(Self {
            n_rows,
            n_cols,
            order,
            pointers,
            indices,
            values,
            stamp: Stamp::fresh(),
        })
    }

    /// Bulk-loads (row, col, value) triplets sorted by major then minor index
    ///
    /// Repeated pairs are rejected or summed according to `duplicates`; any
    /// other ordering violation, or an index outside the extents, fails with
    /// `MalformedInput`.
    pub fn from_triplets<I>(
        n_rows: usize,
        n_cols: usize,
        order: StorageOrder,
        triplets: I,
        duplicates: DuplicatePolicy,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, T)>,
    {
        let major = major_dim(n_rows, n_cols, order);
        let mut pointers = Vec::with_capacity(major + 1);
        let mut indices = Vec::new();
        let mut values: Vec<T> = Vec::new();
        pointers.push(0);

        let mut current_major = 0;
        let mut last: Option<(usize, usize)> = None;

        for (n, (i, j, value)) in triplets.into_iter().enumerate() {
            if i >= n_rows || j >= n_cols {
                return Err(AlgebraError::malformed_structure(format!(
                    "entry {n} at ({i}, {j}) lies outside a {n_rows}x{n_cols} matrix"
                )));
            }
            let (maj, min) = split_index(i, j, order);

            if let Some((prev_maj, prev_min)) = last {
                if maj < prev_maj || (maj == prev_maj && min < prev_min) {
                    return Err(AlgebraError::malformed_structure(format!(
                        "entry {n} at ({i}, {j}) is out of order"
                    )));
                }
                if maj == prev_maj && min == prev_min {
                    match duplicates {
                        DuplicatePolicy::Accumulate => {
                            if let Some(stored) = values.last_mut() {
                                *stored += value;
                            }
                            continue;
                        }
                        DuplicatePolicy::Reject => {
                            return Err(AlgebraError::malformed_structure(format!(
                                "duplicate entry at ({i}, {j})"
                            )));
                        }
                    }
                }
            }

            // Close every segment before this one
            while current_major < maj {
                pointers.push(indices.len());
                current_major += 1;
            }

            indices.push(min);
            values.push(value);
            last = Some((maj, min));
        }

        while pointers.len() < major + 1 {
            pointers.push(indices.len());
        }

        Ok(Self {
            n_rows,
            n_cols,
            order,
            pointers,
            indices,
            values,
            stamp: Stamp::fresh(),
        })
    }

    /// Wraps arrays produced by in-crate kernels that uphold the invariants
    pub(crate) fn assemble(
        n_rows: usize,
        n_cols: usize,
        order: StorageOrder,
        pointers: Vec<usize>,
        indices: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        debug_assert_eq!(pointers.len(), major_dim(n_rows, n_cols, order) + 1);
        debug_assert_eq!(pointers.last().copied(), Some(indices.len()));
        debug_assert_eq!(indices.len(), values.len());
        Self {
            n_rows,
            n_cols,
            order,
            pointers,
            indices,
            values,
            stamp: Stamp::fresh(),
        }
    }

    /// Sorts the triplets into storage order, then loads them like [`from_triplets`](Self::from_triplets)
    pub fn from_unsorted_triplets(
        n_rows: usize,
        n_cols: usize,
        order: StorageOrder,
        mut triplets: Vec<(usize, usize, T)>,
        duplicates: DuplicatePolicy,
    ) -> Result<Self> {
        triplets.sort_by_key(|&(i, j, _)| split_index(i, j, order));
        Self::from_triplets(n_rows, n_cols, order, triplets, duplicates)
    }

    pub fn order(&self) -> StorageOrder {
        self.order
    }

    /// Returns the number of stored entries (explicit zeros included)
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn pointers(&self) -> &[usize] {
        &self.pointers
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Length of the axis walked by `pointers`
    pub fn major_dim(&self) -> usize {
        major_dim(self.n_rows, self.n_cols, self.order)
    }

    pub fn minor_dim(&self) -> usize {
        minor_dim(self.n_rows, self.n_cols, self.order)
    }

    /// Returns an iterator over the stored entries of segment `k`
    ///
    /// Each item is (minor index, value): (column, value) for CSR, (row, value) for CSC.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not below the major dimension.
    pub fn outer_iter(&self, k: usize) -> impl Iterator<Item = (usize, &T)> {
        assert!(k < self.major_dim(), "Segment index out of bounds");

        let start = self.pointers[k];
        let end = self.pointers[k + 1];

        self.indices[start..end]
            .iter()
            .zip(&self.values[start..end])
            .map(|(&idx, val)| (idx, val))
    }

    /// All stored entries as (row, col, value) in storage order
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let order = self.order;
        (0..self.major_dim()).flat_map(move |k| {
            self.outer_iter(k).map(move |(idx, &val)| match order {
                StorageOrder::RowMajor => (k, idx, val),
                StorageOrder::ColumnMajor => (idx, k, val),
            })
        })
    }

    /// Position of (i, j) in `values`, if stored
    fn find(&self, i: usize, j: usize) -> Option<usize> {
        let (maj, min) = split_index(i, j, self.order);
        let start = self.pointers[maj];
        let end = self.pointers[maj + 1];
        self.indices[start..end]
            .binary_search(&min)
            .ok()
            .map(|pos| start + pos)
    }

    /// Reshapes to new extents, dropping entries that fall outside them.
    ///
    /// Returns the number of stored entries dropped and invalidates any
    /// diagonal view bound to this matrix.
    pub fn resize(&mut self, new_rows: usize, new_cols: usize) -> usize {
        let old_major = self.major_dim();
        let new_major = major_dim(new_rows, new_cols, self.order);
        let new_minor = minor_dim(new_rows, new_cols, self.order);

        let mut pointers = Vec::with_capacity(new_major + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        pointers.push(0);

        for k in 0..new_major {
            if k < old_major {
                for p in self.pointers[k]..self.pointers[k + 1] {
                    if self.indices[p] < new_minor {
                        indices.push(self.indices[p]);
                        values.push(self.values[p]);
                    }
                }
            }
            pointers.push(indices.len());
        }

        let dropped = self.nnz() - values.len();
        self.n_rows = new_rows;
        self.n_cols = new_cols;
        self.pointers = pointers;
        self.indices = indices;
        self.values = values;
        self.stamp.bump();
        dropped
    }

    /// Reinterprets the storage as the transpose: the CSR arrays of A are the CSC arrays of Aᵀ
    pub fn transpose(self) -> Self {
        Self {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            order: self.order.transposed(),
            pointers: self.pointers,
            indices: self.indices,
            values: self.values,
            stamp: Stamp::fresh(),
        }
    }

    /// Bytes held by the three compressed arrays
    pub fn weight(&self) -> usize {
        self.values.len() * std::mem::size_of::<T>()
            + (self.indices.len() + self.pointers.len()) * std::mem::size_of::<usize>()
    }
}

impl<T: Scalar> Matrix<T> for CompressedMatrix<T> {
    fn rows(&self) -> usize {
        self.n_rows
    }

    fn cols(&self) -> usize {
        self.n_cols
    }

    fn get(&self, i: usize, j: usize) -> Result<T> {
        check_bounds(i, j, self.n_rows, self.n_cols)?;
        Ok(self.find(i, j).map_or_else(T::zero, |pos| self.values[pos]))
    }

    fn stamp(&self) -> &Stamp {
        &self.stamp
    }
}

impl<T: Scalar> MatrixMut<T> for CompressedMatrix<T> {
    /// Overwrites a stored entry. Writing zero to an absent cell is a no-op;
    /// writing anything else there would need a new entry and is refused.
    fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        check_bounds(i, j, self.n_rows, self.n_cols)?;
        match self.find(i, j) {
            Some(pos) => {
                self.values[pos] = value;
                Ok(())
            }
            None if value.is_zero() => Ok(()),
            None => Err(AlgebraError::UnsupportedMutation { row: i, col: j }),
        }
    }
}

#[inline]
pub(crate) fn major_dim(n_rows: usize, n_cols: usize, order: StorageOrder) -> usize {
    match order {
        StorageOrder::RowMajor => n_rows,
        StorageOrder::ColumnMajor => n_cols,
    }
}

#[inline]
pub(crate) fn minor_dim(n_rows: usize, n_cols: usize, order: StorageOrder) -> usize {
    match order {
        StorageOrder::RowMajor => n_cols,
        StorageOrder::ColumnMajor => n_rows,
    }
}

/// (row, col) to (major, minor) for the given order
#[inline]
fn split_index(i: usize, j: usize, order: StorageOrder) -> (usize, usize) {
    match order {
        StorageOrder::RowMajor => (i, j),
        StorageOrder::ColumnMajor => (j, i),
    }
}

impl<T: Scalar> fmt::Debug for CompressedMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CompressedMatrix {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  order: {:?}", self.order)?;
        writeln!(f, "  nnz: {}", self.nnz())?;

        let label = match self.order {
            StorageOrder::RowMajor => "row",
            StorageOrder::ColumnMajor => "col",
        };
        let max_segments = 5.min(self.major_dim());

        if max_segments > 0 {
            writeln!(f, "  content sample:")?;

            for k in 0..max_segments {
                write!(f, "    {} {}: ", label, k)?;
                let start = self.pointers[k];
                let end = self.pointers[k + 1];

                if start == end {
                    writeln!(f, "(empty)")?;
                } else {
                    let max_elements = 5.min(end - start);

                    for p in start..(start + max_elements) {
                        write!(f, "({}, {:?}) ", self.indices[p], self.values[p])?;
                    }

                    if end - start > max_elements {
                        write!(f, "... ({} more)", end - start - max_elements)?;
                    }

                    writeln!(f)?;
                }
            }

            if self.major_dim() > max_segments {
                writeln!(f, "    ... ({} more)", self.major_dim() - max_segments)?;
            }
        }

        write!(f, "}}")
    }
}
