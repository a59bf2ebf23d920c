//! Physical-space geometry of an image.
//!
//! A geometry maps a continuous index `i` to a physical point
//! `p = origin + D * diag(spacing) * i`, where `D` is the direction matrix
//! stored row-major with one column per image axis.

use nalgebra::{DMatrix, DVector};

use crate::error::{ImageError, ImageResult};

/// Tolerance used when comparing geometries.
pub const GEOMETRY_TOLERANCE: f64 = 1e-6;

/// Spacing, origin and direction of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    spacing: Vec<f64>,
    origin: Vec<f64>,
    direction: Vec<f64>,
}

impl Geometry {
    /// Unit spacing, zero origin, identity direction.
    pub fn identity(dimension: usize) -> Self {
        Self {
            spacing: vec![1.0; dimension],
            origin: vec![0.0; dimension],
            direction: identity_matrix(dimension),
        }
    }

    /// Creates a geometry, checking that all parts agree on the dimension.
    pub fn new(spacing: Vec<f64>, origin: Vec<f64>, direction: Vec<f64>) -> ImageResult<Self> {
        let n = spacing.len();
        if origin.len() != n || direction.len() != n * n {
            return Err(ImageError::invalid_geometry(format!(
                "spacing has {} entries, origin {}, direction {} (expected {})",
                n,
                origin.len(),
                direction.len(),
                n * n
            )));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ImageError::invalid_geometry(format!(
                "spacing must be finite and non-zero, got {:?}",
                spacing
            )));
        }
        Ok(Self {
            spacing,
            origin,
            direction,
        })
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.spacing.len()
    }

    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    /// Row-major direction matrix.
    pub fn direction(&self) -> &[f64] {
        &self.direction
    }

    /// Direction matrix entry at `(row, col)`.
    pub fn direction_at(&self, row: usize, col: usize) -> f64 {
        self.direction[row * self.dimension() + col]
    }

    pub fn set_spacing_at(&mut self, axis: usize, spacing: f64) {
        self.spacing[axis] = spacing;
    }

    pub fn set_origin_at(&mut self, axis: usize, origin: f64) {
        self.origin[axis] = origin;
    }

    /// Compares two geometries within [`GEOMETRY_TOLERANCE`].
    pub fn approx_eq(&self, other: &Geometry) -> bool {
        fn close(a: &[f64], b: &[f64]) -> bool {
            a.len() == b.len()
                && a
                    .iter()
                    .zip(b)
                    .all(|(x, y)| (x - y).abs() <= GEOMETRY_TOLERANCE)
        }
        close(&self.spacing, &other.spacing)
            && close(&self.origin, &other.origin)
            && close(&self.direction, &other.direction)
    }

    /// Keeps the first `dimension` axes. The direction keeps its top-left
    /// submatrix.
    pub fn submatrix(&self, dimension: usize) -> Geometry {
        let n = self.dimension();
        let m = dimension.min(n);
        let mut direction = Vec::with_capacity(m * m);
        for row in 0..m {
            for col in 0..m {
                direction.push(self.direction[row * n + col]);
            }
        }
        Geometry {
            spacing: self.spacing[..m].to_vec(),
            origin: self.origin[..m].to_vec(),
            direction,
        }
    }

    /// Adds trailing axes with the given spacing, zero origin and identity
    /// direction.
    pub fn extended(&self, dimension: usize, spacing: f64) -> Geometry {
        let n = self.dimension();
        if dimension <= n {
            return self.clone();
        }
        let mut direction = identity_matrix(dimension);
        for row in 0..n {
            for col in 0..n {
                direction[row * dimension + col] = self.direction[row * n + col];
            }
        }
        let mut spacings = self.spacing.clone();
        spacings.resize(dimension, spacing);
        let mut origin = self.origin.clone();
        origin.resize(dimension, 0.0);
        Geometry {
            spacing: spacings,
            origin,
            direction,
        }
    }

    /// Maps a continuous index to a physical point.
    pub fn index_to_physical(&self, index: &[f64]) -> Vec<f64> {
        let n = self.dimension();
        (0..n)
            .map(|row| {
                self.origin[row]
                    + (0..n)
                        .map(|col| self.direction[row * n + col] * self.spacing[col] * index[col])
                        .sum::<f64>()
            })
            .collect()
    }

    /// Builds the inverse mapping from physical points to continuous indices.
    pub fn index_mapper(&self) -> ImageResult<IndexMapper> {
        let n = self.dimension();
        let inverse = DMatrix::from_row_slice(n, n, &self.direction)
            .try_inverse()
            .ok_or_else(|| ImageError::invalid_geometry("direction matrix is singular"))?;
        let scale = DMatrix::from_diagonal(&DVector::from_iterator(
            n,
            self.spacing.iter().map(|s| 1.0 / s),
        ));
        Ok(IndexMapper {
            matrix: scale * inverse,
            origin: DVector::from_column_slice(&self.origin),
        })
    }
}

/// Precomputed physical-to-index transform of a [`Geometry`]:
/// `i = diag(1/spacing) * D^-1 * (p - origin)`.
#[derive(Debug, Clone)]
pub struct IndexMapper {
    matrix: DMatrix<f64>,
    origin: DVector<f64>,
}

impl IndexMapper {
    /// Maps a physical point to a continuous index.
    pub fn physical_to_index(&self, point: &[f64], out: &mut [f64]) {
        let n = self.origin.len();
        for (row, slot) in out.iter_mut().enumerate().take(n) {
            *slot = (0..n)
                .map(|col| self.matrix[(row, col)] * (point[col] - self.origin[col]))
                .sum();
        }
    }
}

fn identity_matrix(n: usize) -> Vec<f64> {
    let mut m = vec![0.0; n * n];
    for i in 0..n {
        m[i * n + i] = 1.0;
    }
    m
}
