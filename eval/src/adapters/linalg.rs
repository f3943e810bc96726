// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dense symmetric positive-definite solvers on ndarray

use ndarray::{s, Array1, Array2, ArrayView1, Axis};

/// A pivot is singular once elimination leaves less than this share of its own diagonal
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Lower-triangular Cholesky factor, or `None` when `a` is not numerically positive definite
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return None;
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        if !diag.is_finite() || diag <= PIVOT_TOLERANCE * a[[j, j]].abs() {
            return None;
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / pivot;
        }
    }
    Some(l)
}

/// Solve `L Lᵀ x = b` given the Cholesky factor `L`
pub fn cholesky_solve(l: &Array2<f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

pub fn solve_spd(a: &Array2<f64>, b: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
    cholesky(a).map(|l| cholesky_solve(&l, b))
}

/// Inverse from a Cholesky factor, one column at a time
pub fn cholesky_inverse(l: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));
    let mut unit = Array1::<f64>::zeros(n);
    for j in 0..n {
        unit.fill(0.0);
        unit[j] = 1.0;
        let col = cholesky_solve(l, unit.view());
        inv.column_mut(j).assign(&col);
    }
    inv
}

/// log |A| from its Cholesky factor
pub fn log_det(l: &Array2<f64>) -> f64 {
    2.0 * l.diag().iter().map(|d| d.ln()).sum::<f64>()
}

/// Prepend a column of ones
pub fn with_intercept(x: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
    out.slice_mut(s![.., 1..]).assign(x);
    out
}

/// Mean row of the selected rows
pub fn row_mean(x: &Array2<f64>, rows: &[usize]) -> Array1<f64> {
    let selected = x.select(Axis(0), rows);
    selected
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()))
}

/// Scatter matrix Σ (x - center)(x - center)ᵀ over the selected rows
pub fn scatter(x: &Array2<f64>, rows: &[usize], center: &Array1<f64>) -> Array2<f64> {
    let centered = &x.select(Axis(0), rows) - center;
    centered.t().dot(&centered)
}

/// Add `ridge` times the mean diagonal to the diagonal
pub fn regularize(a: &mut Array2<f64>, ridge: f64) {
    let n = a.nrows();
    if n == 0 {
        return;
    }
    let bump = ridge * a.diag().sum() / n as f64;
    for i in 0..n {
        a[[i, i]] += bump;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cholesky_solve_known_system() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = solve_spd(&a, b.view()).unwrap();

        let back = a.dot(&x);
        assert!((back[0] - 2.0).abs() < 1e-12);
        assert!((back[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_rejected() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(cholesky(&a).is_none());
    }

    #[test]
    fn test_mixed_scale_gram_matrix_factors() {
        // intercept next to a column in the hundreds of thousands, as with duration_ms
        let x = with_intercept(&array![[90_000.0], [180_000.0], [250_000.0], [420_000.0]]);
        let gram = x.t().dot(&x);
        let l = cholesky(&gram).unwrap();

        let back = l.dot(&l.t());
        for (got, want) in back.iter().zip(gram.iter()) {
            assert!((got - want).abs() <= 1e-9 * want.abs().max(1.0));
        }
    }

    #[test]
    fn test_collinear_gram_matrix_rejected() {
        let x = with_intercept(&array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]]);
        assert!(cholesky(&x.t().dot(&x)).is_none());
    }

    #[test]
    fn test_inverse_and_log_det() {
        let a = array![[2.0, 0.0], [0.0, 8.0]];
        let l = cholesky(&a).unwrap();
        let inv = cholesky_inverse(&l);

        assert!((inv[[0, 0]] - 0.5).abs() < 1e-12);
        assert!((inv[[1, 1]] - 0.125).abs() < 1e-12);
        assert!((log_det(&l) - 16.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_with_intercept() {
        let x = array![[3.0], [5.0]];
        let x1 = with_intercept(&x);
        assert_eq!(x1, array![[1.0, 3.0], [1.0, 5.0]]);
    }
}
