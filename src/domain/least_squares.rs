//! Minimum-norm ordinary least squares via a one-sided Jacobi SVD.
//!
//! Rank-deficient systems (fewer rows than columns, collinear columns, all-zero
//! columns) solve to the minimum-norm solution, matching pseudo-inverse
//! semantics. The only failure is a row count mismatch between `a` and `b`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use thiserror::Error;

const MAX_SWEEPS: usize = 64;
const ORTHOGONALITY_TOL: f64 = 1e-15;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LeastSquaresError {
    #[error("design matrix has {rows} rows but target vector has {targets} entries")]
    DimensionMismatch { rows: usize, targets: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeastSquaresSolution {
    pub coefficients: Array1<f64>,
    pub rank: usize,
    pub residual_sum_of_squares: f64,
}

/// Solve `min ||a·x - b||²`, returning the minimum-norm `x`.
pub fn solve(
    a: ArrayView2<'_, f64>,
    b: ArrayView1<'_, f64>,
) -> Result<LeastSquaresSolution, LeastSquaresError> {
    let (rows, cols) = a.dim();
    if rows != b.len() {
        return Err(LeastSquaresError::DimensionMismatch {
            rows,
            targets: b.len(),
        });
    }

    let mut coefficients = Array1::<f64>::zeros(cols);
    if rows == 0 || cols == 0 {
        return Ok(LeastSquaresSolution {
            coefficients,
            rank: 0,
            residual_sum_of_squares: b.dot(&b),
        });
    }

    let (u, v) = jacobi_rotate(a.to_owned());
    let sigmas: Vec<f64> = u
        .axis_iter(Axis(1))
        .map(|column| column.dot(&column).sqrt())
        .collect();
    let largest = sigmas.iter().copied().fold(0.0, f64::max);
    let cutoff = largest * rows.max(cols) as f64 * f64::EPSILON;

    let mut rank = 0;
    for (j, &sigma) in sigmas.iter().enumerate() {
        if sigma <= cutoff || sigma == 0.0 {
            continue;
        }
        rank += 1;
        // u's column j is sigma_j times the unit left singular vector.
        let scale = u.column(j).dot(&b) / (sigma * sigma);
        coefficients.scaled_add(scale, &v.column(j));
    }

    let residual = &a.dot(&coefficients) - &b;
    Ok(LeastSquaresSolution {
        residual_sum_of_squares: residual.dot(&residual),
        coefficients,
        rank,
    })
}

/// Orthogonalize the columns of `u` in place, accumulating the rotations in `v`.
fn jacobi_rotate(mut u: Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let cols = u.ncols();
    let mut v = Array2::<f64>::eye(cols);

    for _ in 0..MAX_SWEEPS {
        let mut rotated = false;
        for p in 0..cols {
            for q in (p + 1)..cols {
                let alpha = u.column(p).dot(&u.column(p));
                let beta = u.column(q).dot(&u.column(q));
                let gamma = u.column(p).dot(&u.column(q));
                if gamma == 0.0 || gamma.abs() <= ORTHOGONALITY_TOL * (alpha * beta).sqrt() {
                    continue;
                }
                rotated = true;

                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;
                rotate_columns(&mut u, p, q, c, s);
                rotate_columns(&mut v, p, q, c, s);
            }
        }
        if !rotated {
            break;
        }
    }

    (u, v)
}

fn rotate_columns(m: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    for mut row in m.rows_mut() {
        let (xp, xq) = (row[p], row[q]);
        row[p] = c * xp - s * xq;
        row[q] = s * xp + c * xq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn solves_well_posed_system_exactly() {
        let a = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let truth = array![3.0, -1.5];
        let b = a.dot(&truth);
        let solution = solve(a.view(), b.view()).unwrap();
        assert_eq!(solution.rank, 2);
        assert!(close(solution.coefficients[0], 3.0));
        assert!(close(solution.coefficients[1], -1.5));
        assert!(solution.residual_sum_of_squares < 1e-12);
    }

    #[test]
    fn overdetermined_system_minimizes_residual() {
        // Best fit of y = w·x through (1,1), (2,3), (3,2): w = 13/14.
        let a = array![[1.0], [2.0], [3.0]];
        let b = array![1.0, 3.0, 2.0];
        let solution = solve(a.view(), b.view()).unwrap();
        assert!(close(solution.coefficients[0], 13.0 / 14.0));
    }

    #[test]
    fn collinear_columns_yield_minimum_norm() {
        let a = array![[1.0, 1.0], [2.0, 2.0]];
        let b = array![2.0, 4.0];
        let solution = solve(a.view(), b.view()).unwrap();
        assert_eq!(solution.rank, 1);
        assert!(close(solution.coefficients[0], 1.0));
        assert!(close(solution.coefficients[1], 1.0));
    }

    #[test]
    fn underdetermined_system_yields_minimum_norm() {
        let a = array![[3.0, 4.0, 0.0]];
        let b = array![5.0];
        let solution = solve(a.view(), b.view()).unwrap();
        assert_eq!(solution.rank, 1);
        assert!(close(solution.coefficients[0], 0.6));
        assert!(close(solution.coefficients[1], 0.8));
        assert!(close(solution.coefficients[2], 0.0));
    }

    #[test]
    fn zero_column_gets_zero_weight() {
        let a = array![[1.0, 0.0], [2.0, 0.0]];
        let b = array![1.0, 2.0];
        let solution = solve(a.view(), b.view()).unwrap();
        assert!(close(solution.coefficients[0], 1.0));
        assert_eq!(solution.coefficients[1], 0.0);
    }

    #[test]
    fn empty_input_solves_to_zero() {
        let a = Array2::<f64>::zeros((0, 5));
        let b = Array1::<f64>::zeros(0);
        let solution = solve(a.view(), b.view()).unwrap();
        assert_eq!(solution.rank, 0);
        assert!(solution.coefficients.iter().all(|w| *w == 0.0));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let a = Array2::<f64>::zeros((3, 2));
        let b = Array1::<f64>::zeros(2);
        assert_eq!(
            solve(a.view(), b.view()),
            Err(LeastSquaresError::DimensionMismatch { rows: 3, targets: 2 })
        );
    }
}
