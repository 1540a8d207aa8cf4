//! Column-major array view with an explicit index origin.
//!
//! Native arrays address their first element at index 1 (more generally, at a
//! declared lower bound). `FortArray` keeps that origin as a first-class
//! `offset` property so managed-side indexing stays consistent with what the
//! native side reports, instead of silently renumbering from zero.

use std::fmt;

/// Element payload of a [`FortArray`], tagged by primitive kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Real(Vec<f64>),
    Int(Vec<i32>),
    Logical(Vec<bool>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Real(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Logical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ElemKind {
        match self {
            ArrayData::Real(_) => ElemKind::Real,
            ArrayData::Int(_) => ElemKind::Int,
            ArrayData::Logical(_) => ElemKind::Logical,
        }
    }
}

/// Primitive element kind of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemKind {
    Real,
    Int,
    Logical,
}

impl ElemKind {
    /// Floating kinds get tolerance-based comparison; the rest compare exactly.
    pub fn is_floating(&self) -> bool {
        matches!(self, ElemKind::Real)
    }
}

impl fmt::Display for ElemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElemKind::Real => write!(f, "real"),
            ElemKind::Int => write!(f, "int"),
            ElemKind::Logical => write!(f, "logical"),
        }
    }
}

/// A managed array over native contiguous memory.
///
/// Storage is column-major (first dimension fastest), matching the native
/// layout. `shape` and `offset` are fixed at construction; mutation changes
/// contents only.
#[derive(Debug, Clone, PartialEq)]
pub struct FortArray {
    data: ArrayData,
    shape: Vec<usize>,
    /// Index of the first element along every dimension (1 for native arrays).
    offset: i64,
    /// Presentation hint: render transposed when displayed.
    pub transpose_on_print: bool,
}

impl FortArray {
    fn build(data: ArrayData, shape: Vec<usize>) -> Result<Self, String> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(format!(
                "array data length {} doesn't match shape {:?} ({} elements)",
                data.len(),
                shape,
                expected
            ));
        }
        Ok(FortArray { data, shape, offset: 1, transpose_on_print: false })
    }

    pub fn real(data: Vec<f64>, shape: Vec<usize>) -> Result<Self, String> {
        Self::build(ArrayData::Real(data), shape)
    }

    pub fn int(data: Vec<i32>, shape: Vec<usize>) -> Result<Self, String> {
        Self::build(ArrayData::Int(data), shape)
    }

    pub fn logical(data: Vec<bool>, shape: Vec<usize>) -> Result<Self, String> {
        Self::build(ArrayData::Logical(data), shape)
    }

    /// Build a 2-D real array from row-major rows (handy for literals).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, String> {
        let nrows = rows.len();
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != ncols) {
            return Err("rows have unequal lengths".to_string());
        }
        let mut data = vec![0.0; nrows * ncols];
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                // Column-major linearization: lin = row + col*rows
                data[r + c * nrows] = *v;
            }
        }
        Self::real(data, vec![nrows, ncols])
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        FortArray {
            data: ArrayData::Real(vec![0.0; size]),
            shape,
            offset: 1,
            transpose_on_print: false,
        }
    }

    /// Rebase the index origin. The offset is a construction-time property;
    /// this consumes and returns the array.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_transpose_on_print(mut self, transpose: bool) -> Self {
        self.transpose_on_print = transpose;
        self
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn kind(&self) -> ElemKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn ndims(&self) -> usize {
        self.shape.len()
    }

    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    pub fn cols(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    /// Translate an offset-based multi-index to a flat storage index.
    fn flat_index(&self, index: &[i64]) -> Result<usize, String> {
        if index.len() != self.shape.len() {
            return Err(format!(
                "index {:?} has {} dimensions but array shape is {:?}",
                index,
                index.len(),
                self.shape
            ));
        }
        let mut flat = 0usize;
        let mut stride = 1usize;
        for (d, (&i, &dim)) in index.iter().zip(self.shape.iter()).enumerate() {
            let rel = i - self.offset;
            if rel < 0 || rel as usize >= dim {
                return Err(format!(
                    "index {:?} out of bounds along dimension {} for shape {:?} with offset {}",
                    index, d, self.shape, self.offset
                ));
            }
            flat += rel as usize * stride;
            stride *= dim;
        }
        Ok(flat)
    }

    /// Convert a flat storage index to 0-based multi-dimensional coordinates
    /// in column-major (first dimension fastest) order.
    pub fn unravel(&self, flat: usize) -> Vec<usize> {
        let mut rem = flat;
        let mut coords = Vec::with_capacity(self.shape.len());
        for &dim in &self.shape {
            coords.push(rem % dim);
            rem /= dim;
        }
        coords
    }

    pub fn get_real(&self, index: &[i64]) -> Result<f64, String> {
        let flat = self.flat_index(index)?;
        match &self.data {
            ArrayData::Real(v) => Ok(v[flat]),
            other => Err(format!("expected real array, found {} array", other.kind())),
        }
    }

    pub fn set_real(&mut self, index: &[i64], value: f64) -> Result<(), String> {
        let flat = self.flat_index(index)?;
        match &mut self.data {
            ArrayData::Real(v) => {
                v[flat] = value;
                Ok(())
            }
            other => Err(format!("expected real array, found {} array", other.kind())),
        }
    }

    pub fn get_int(&self, index: &[i64]) -> Result<i32, String> {
        let flat = self.flat_index(index)?;
        match &self.data {
            ArrayData::Int(v) => Ok(v[flat]),
            other => Err(format!("expected int array, found {} array", other.kind())),
        }
    }

    pub fn set_int(&mut self, index: &[i64], value: i32) -> Result<(), String> {
        let flat = self.flat_index(index)?;
        match &mut self.data {
            ArrayData::Int(v) => {
                v[flat] = value;
                Ok(())
            }
            other => Err(format!("expected int array, found {} array", other.kind())),
        }
    }

    pub fn get_logical(&self, index: &[i64]) -> Result<bool, String> {
        let flat = self.flat_index(index)?;
        match &self.data {
            ArrayData::Logical(v) => Ok(v[flat]),
            other => Err(format!("expected logical array, found {} array", other.kind())),
        }
    }

    /// Inclusive slice along one dimension, in offset-based coordinates.
    /// The result keeps the same offset convention and element kind.
    pub fn slice(&self, dim: usize, lo: i64, hi: i64) -> Result<FortArray, String> {
        if dim >= self.shape.len() {
            return Err(format!(
                "slice dimension {} out of range for shape {:?}",
                dim, self.shape
            ));
        }
        let upper = self.offset + self.shape[dim] as i64 - 1;
        if lo < self.offset || hi > upper || lo > hi {
            return Err(format!(
                "slice bounds {}..{} invalid along dimension {} (valid {}..{})",
                lo, hi, dim, self.offset, upper
            ));
        }
        let mut new_shape = self.shape.clone();
        new_shape[dim] = (hi - lo + 1) as usize;
        let count: usize = new_shape.iter().product();
        let shift = (lo - self.offset) as usize;

        // Map each output flat index to its source flat index.
        let mut source = Vec::with_capacity(count);
        for out_flat in 0..count {
            let mut rem = out_flat;
            let mut src_flat = 0usize;
            let mut stride = 1usize;
            for (d, &dim_len) in new_shape.iter().enumerate() {
                let mut coord = rem % dim_len;
                rem /= dim_len;
                if d == dim {
                    coord += shift;
                }
                src_flat += coord * stride;
                stride *= self.shape[d];
            }
            source.push(src_flat);
        }

        let data = match &self.data {
            ArrayData::Real(v) => ArrayData::Real(source.iter().map(|&i| v[i]).collect()),
            ArrayData::Int(v) => ArrayData::Int(source.iter().map(|&i| v[i]).collect()),
            ArrayData::Logical(v) => ArrayData::Logical(source.iter().map(|&i| v[i]).collect()),
        };
        Ok(FortArray {
            data,
            shape: new_shape,
            offset: self.offset,
            transpose_on_print: self.transpose_on_print,
        })
    }

    /// Elementwise absolute difference of two real arrays of identical shape.
    pub fn abs_diff(&self, other: &FortArray) -> Result<FortArray, String> {
        if self.shape != other.shape {
            return Err(format!(
                "shape mismatch: {:?} vs {:?}",
                self.shape, other.shape
            ));
        }
        match (&self.data, &other.data) {
            (ArrayData::Real(a), ArrayData::Real(b)) => {
                let diff: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).collect();
                Ok(FortArray {
                    data: ArrayData::Real(diff),
                    shape: self.shape.clone(),
                    offset: self.offset,
                    transpose_on_print: self.transpose_on_print,
                })
            }
            _ => Err("abs_diff requires two real arrays".to_string()),
        }
    }

    /// Maximum element and the flat storage index of its first occurrence,
    /// scanning in storage order. Empty or non-real arrays yield None.
    pub fn max_with_argmax(&self) -> Option<(f64, usize)> {
        let v = match &self.data {
            ArrayData::Real(v) => v,
            _ => return None,
        };
        let mut best: Option<(f64, usize)> = None;
        for (i, &x) in v.iter().enumerate() {
            match best {
                Some((m, _)) if x <= m => {}
                _ => best = Some((x, i)),
            }
        }
        best
    }
}

fn write_element(f: &mut fmt::Formatter<'_>, data: &ArrayData, flat: usize) -> fmt::Result {
    match data {
        ArrayData::Real(v) => write!(f, "{}", v[flat]),
        ArrayData::Int(v) => write!(f, "{}", v[flat]),
        ArrayData::Logical(v) => write!(f, "{}", if v[flat] { "T" } else { "F" }),
    }
}

impl fmt::Display for FortArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape.len() {
            0 | 1 => {
                write!(f, "[")?;
                for i in 0..self.data.len() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write_element(f, &self.data, i)?;
                }
                write!(f, "]")
            }
            2 => {
                let rows = self.rows();
                let cols = self.cols();
                // Presentation transpose swaps the roles of rows and columns
                // without touching storage.
                let (out_rows, out_cols) = if self.transpose_on_print {
                    (cols, rows)
                } else {
                    (rows, cols)
                };
                write!(f, "[")?;
                for r in 0..out_rows {
                    for c in 0..out_cols {
                        if c > 0 {
                            write!(f, " ")?;
                        }
                        let flat = if self.transpose_on_print {
                            c + r * rows
                        } else {
                            r + c * rows
                        };
                        write_element(f, &self.data, flat)?;
                    }
                    if r + 1 < out_rows {
                        write!(f, "; ")?;
                    }
                }
                write!(f, "]")
            }
            _ => write!(f, "FortArray(kind={}, shape={:?})", self.kind(), self.shape),
        }
    }
}
