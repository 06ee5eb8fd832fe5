//! Owned row-major tensor buffer exchanged with the model sessions.
//!
//! Same layout the ONNX runner feeds to `ort`: a shape plus one flat,
//! C-contiguous `Vec`.

use anyhow::{ensure, Result};

/// A dense tensor: shape + flat data in row-major (C) order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> Tensor<T> {
    /// Build a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        ensure!(
            data.len() == expected,
            "tensor data has {} elements but shape {:?} needs {}",
            data.len(),
            shape,
            expected
        );
        Ok(Self { shape, data })
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Size of the leading (batch) dimension.
    pub fn batch(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T: Clone + Default> Tensor<T> {
    /// A tensor of `T::default()` values.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let n = shape.iter().product();
        Self { shape, data: vec![T::default(); n] }
    }
}

impl<T: Copy> Tensor<T> {
    /// Element at `[i, j, k]` of a rank-3 tensor.
    pub fn at3(&self, i: usize, j: usize, k: usize) -> T {
        self.data[self.offset3(i, j, k)]
    }

    fn offset3(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.shape[1] + j) * self.shape[2] + k
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
