//! Heap-backed linear algebra for variable-size filters
//!
//! The UKF state grows and shrinks as scanners come and go, so dimensions
//! are only known at runtime. Matrices are row-major `Vec<Vec<f32>>`.

use alloc::{vec, vec::Vec};

/// Row-major matrix
pub type Matrix = Vec<Vec<f32>>;

/// `rows × cols` zero matrix
pub fn zeros(rows: usize, cols: usize) -> Matrix {
    vec![vec![0.0; cols]; rows]
}

/// `n × n` identity scaled by `scale`
pub fn scaled_identity(n: usize, scale: f32) -> Matrix {
    let mut m = zeros(n, n);
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = scale;
    }
    m
}

/// Matrix multiplication: C = A × B
///
/// Dimensions: A[R×K] × B[K×C] = C[R×C]
pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let rows = a.len();
    let inner = b.len();
    let cols = b.first().map_or(0, Vec::len);
    let mut result = zeros(rows, cols);
    for i in 0..rows {
        for j in 0..cols {
            let mut sum = 0.0;
            for k in 0..inner {
                sum += a[i][k] * b[k][j];
            }
            result[i][j] = sum;
        }
    }
    result
}

/// Matrix transpose: B = Aᵀ
pub fn transpose(a: &Matrix) -> Matrix {
    let rows = a.len();
    let cols = a.first().map_or(0, Vec::len);
    let mut result = zeros(cols, rows);
    for i in 0..rows {
        for j in 0..cols {
            result[j][i] = a[i][j];
        }
    }
    result
}

/// Make matrix symmetric: A = (A + Aᵀ) / 2
pub fn make_symmetric(matrix: &mut Matrix) {
    let n = matrix.len();
    for i in 0..n {
        for j in i + 1..n {
            let avg = (matrix[i][j] + matrix[j][i]) * 0.5;
            matrix[i][j] = avg;
            matrix[j][i] = avg;
        }
    }
}

/// Cholesky decomposition: A = L × Lᵀ
///
/// ```text
/// L[j,j] = sqrt(A[j,j] − Σₖ L[j,k]²)
/// L[i,j] = (A[i,j] − Σₖ L[i,k]·L[j,k]) / L[j,j]
/// ```
///
/// `None` if the matrix is not positive definite.
pub fn cholesky(a: &Matrix) -> Option<Matrix> {
    let n = a.len();
    let mut l = zeros(n, n);
    for j in 0..n {
        let mut sum = 0.0;
        for k in 0..j {
            sum += l[j][k] * l[j][k];
        }
        let diag = a[j][j] - sum;
        if !(diag > 0.0) {
            return None;
        }
        l[j][j] = libm::sqrtf(diag);
        for i in j + 1..n {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[i][k] * l[j][k];
            }
            l[i][j] = (a[i][j] - sum) / l[j][j];
        }
    }
    Some(l)
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting
///
/// `None` if the matrix is singular.
pub fn invert(a: &Matrix) -> Option<Matrix> {
    let n = a.len();
    let mut aug = zeros(n, 2 * n);
    for i in 0..n {
        aug[i][..n].copy_from_slice(&a[i][..n]);
        aug[i][n + i] = 1.0;
    }

    for k in 0..n {
        let mut max_row = k;
        let mut max_val = libm::fabsf(aug[k][k]);
        for (i, row) in aug.iter().enumerate().skip(k + 1) {
            let value = libm::fabsf(row[k]);
            if value > max_val {
                max_val = value;
                max_row = i;
            }
        }
        if !(max_val >= 1e-10) {
            return None;
        }
        aug.swap(k, max_row);

        let pivot = aug[k][k];
        for value in aug[k].iter_mut() {
            *value /= pivot;
        }

        let pivot_row = aug[k].clone();
        for (i, row) in aug.iter_mut().enumerate() {
            if i == k {
                continue;
            }
            let factor = row[k];
            if factor == 0.0 {
                continue;
            }
            for (value, pivot_value) in row.iter_mut().zip(pivot_row.iter()) {
                *value -= factor * pivot_value;
            }
        }
    }

    Some(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: &Matrix, b: &Matrix) -> bool {
        a.iter()
            .zip(b.iter())
            .all(|(ra, rb)| ra.iter().zip(rb.iter()).all(|(x, y)| (x - y).abs() < 1e-4))
    }

    #[test]
    fn cholesky_reconstructs_matrix() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let l = cholesky(&a).unwrap();
        assert!(approx(&multiply(&l, &transpose(&l)), &a));
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert!(cholesky(&a).is_none());
    }

    #[test]
    fn invert_round_trips_to_identity() {
        let a = vec![
            vec![4.0, 1.0, 0.0],
            vec![1.0, 3.0, 0.5],
            vec![0.0, 0.5, 2.0],
        ];
        let inv = invert(&a).unwrap();
        assert!(approx(&multiply(&a, &inv), &scaled_identity(3, 1.0)));
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(invert(&a).is_none());
    }

    #[test]
    fn symmetrise() {
        let mut a = vec![vec![1.0, 2.0], vec![4.0, 1.0]];
        make_symmetric(&mut a);
        assert_eq!(a[0][1], 3.0);
        assert_eq!(a[1][0], 3.0);
    }
}
