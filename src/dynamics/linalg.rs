//! Dense linear solve used by the contact-force solver.

use crate::math::Real;

/// Pivots smaller than this are treated as zero.
const PIVOT_EPSILON: Real = 1e-12;

/// Solve the `n`-by-`n` system `A x = b` by Gaussian elimination with
/// partial pivoting. `a` is row-major. Returns `None` when the system has
/// no unique solution.
pub fn solve_dense(n: usize, a: &[Real], b: &[Real]) -> Option<Vec<Real>> {
    debug_assert_eq!(a.len(), n * n);
    debug_assert_eq!(b.len(), n);

    let mut m = a.to_vec();
    let mut x = b.to_vec();

    for col in 0..n {
        // pick the largest remaining pivot in this column
        let mut pivot_row = col;
        for row in (col + 1)..n {
            if m[row * n + col].abs() > m[pivot_row * n + col].abs() {
                pivot_row = row;
            }
        }
        if m[pivot_row * n + col].abs() < PIVOT_EPSILON {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                m.swap(col * n + k, pivot_row * n + k);
            }
            x.swap(col, pivot_row);
        }

        let pivot = m[col * n + col];
        for row in (col + 1)..n {
            let factor = m[row * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[row * n + k] -= factor * m[col * n + k];
            }
            x[row] -= factor * x[col];
        }
    }

    // back substitution
    for col in (0..n).rev() {
        let mut sum = x[col];
        for k in (col + 1)..n {
            sum -= m[col * n + k] * x[k];
        }
        x[col] = sum / m[col * n + col];
    }

    Some(x)
}
