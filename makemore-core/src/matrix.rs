use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{MakemoreError, Result};

/// Dense, row-major `f32` matrix.
///
/// This covers exactly the operations the bigram models need: elementwise
/// exponentiation, row normalization, scaled accumulation, row gather and
/// scatter and a naive matrix product. Shapes are checked at runtime and mismatches come
/// back as [`MakemoreError::ShapeMismatch`].
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MakemoreError::DataLength {
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Samples every entry independently from a standard normal distribution.
    pub fn random_normal<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let data = (0..rows * cols)
            .map(|_| StandardNormal.sample(rng))
            .collect();
        Self { rows, cols, data }
    }

    /// One row per index, each `1.0` at that index and `0.0` everywhere else.
    pub fn one_hot(indices: &[usize], num_classes: usize) -> Result<Self> {
        let mut result = Self::zeros(indices.len(), num_classes);
        for (row, &index) in indices.iter().enumerate() {
            if index >= num_classes {
                return Err(MakemoreError::IndexOutOfRange {
                    index,
                    len: num_classes,
                });
            }
            result.data[row * num_classes + index] = 1.0;
        }
        Ok(result)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    fn check_same_shape(&self, other: &Matrix) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(self.mismatch(other));
        }
        Ok(())
    }

    fn mismatch(&self, other: &Matrix) -> MakemoreError {
        MakemoreError::ShapeMismatch {
            lhs_rows: self.rows,
            lhs_cols: self.cols,
            rhs_rows: other.rows,
            rhs_cols: other.cols,
        }
    }

    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&value| f(value)).collect(),
        }
    }

    pub fn exp(&self) -> Matrix {
        self.map(f32::exp)
    }

    pub fn scale(&self, value: f32) -> Matrix {
        self.map(|x| x * value)
    }

    /// `self += scale * other`, in place.
    pub fn add_scaled(&mut self, other: &Matrix, scale: f32) -> Result<()> {
        self.check_same_shape(other)?;
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += scale * b;
        }
        Ok(())
    }

    /// Mean of the squared entries.
    pub fn mean_squares(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|x| x * x).sum::<f32>() / self.data.len() as f32
    }

    /// Divides every row by its own sum.
    pub fn normalize_rows(&self) -> Matrix {
        let mut result = self.clone();
        for r in 0..self.rows {
            let row = result.row_mut(r);
            let total: f32 = row.iter().sum();
            for value in row {
                *value /= total;
            }
        }
        result
    }

    /// Exponentiates and normalizes each row. The row maximum is subtracted
    /// first so large logits can't overflow `exp`; the result is unchanged
    /// since softmax is shift invariant.
    pub fn row_softmax(&self) -> Matrix {
        let mut result = self.clone();
        for r in 0..self.rows {
            softmax_in_place(result.row_mut(r));
        }
        result
    }

    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(self.mismatch(other));
        }
        let mut result = Matrix::zeros(self.rows, other.cols);
        for r in 0..self.rows {
            for k in 0..self.cols {
                let lhs = self.data[r * self.cols + k];
                if lhs == 0.0 {
                    continue;
                }
                let rhs = other.row(k);
                for (out, &value) in result.row_mut(r).iter_mut().zip(rhs) {
                    *out += lhs * value;
                }
            }
        }
        Ok(result)
    }

    /// Gathers the given rows into a new matrix. This is what
    /// `one_hot(indices) · self` computes, without building the one-hot
    /// matrix.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Matrix> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &index in indices {
            if index >= self.rows {
                return Err(MakemoreError::IndexOutOfRange {
                    index,
                    len: self.rows,
                });
            }
            data.extend_from_slice(self.row(index));
        }
        Matrix::from_vec(indices.len(), self.cols, data)
    }

    /// Adds row `i` of `source` into row `indices[i]` of `self`. This is
    /// `self += one_hot(indices)ᵀ · source`, the adjoint of
    /// [`Matrix::select_rows`].
    pub fn index_add_rows(&mut self, indices: &[usize], source: &Matrix) -> Result<()> {
        if source.rows != indices.len() || source.cols != self.cols {
            return Err(self.mismatch(source));
        }
        for (i, &index) in indices.iter().enumerate() {
            if index >= self.rows {
                return Err(MakemoreError::IndexOutOfRange {
                    index,
                    len: self.rows,
                });
            }
            let cols = self.cols;
            let src = &source.data[i * cols..(i + 1) * cols];
            for (out, &value) in self.row_mut(index).iter_mut().zip(src) {
                *out += value;
            }
        }
        Ok(())
    }
}

/// `ln(Σ exp(row))`, shifted by the row maximum to stay finite.
pub(crate) fn log_sum_exp(row: &[f32]) -> f32 {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let total: f32 = row.iter().map(|&value| (value - max).exp()).sum();
    max + total.ln()
}

pub(crate) fn softmax_in_place(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut total = 0.0;
    for value in row.iter_mut() {
        *value = (*value - max).exp();
        total += *value;
    }
    for value in row.iter_mut() {
        *value /= total;
    }
}
