//! Small dense least-squares helpers for model fitting

use crate::error::FitError;

/// Relative ridge term added to the normal equations' diagonal
const RIDGE: f64 = 1e-8;

/// Pivots smaller than this are treated as singular
const PIVOT_EPSILON: f64 = 1e-12;

/// Difference a series `d` times
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut out = series.to_vec();
    for _ in 0..d {
        if out.len() < 2 {
            return Vec::new();
        }
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Ordinary least squares `min ||X b - y||` via ridge-stabilised normal equations.
///
/// An all-zero design (no signal at all) yields zero coefficients.
pub fn least_squares(rows: &[Vec<f64>], targets: &[f64]) -> Result<Vec<f64>, FitError> {
    let cols = rows.first().map(|r| r.len()).unwrap_or(0);
    if cols == 0 {
        return Ok(Vec::new());
    }
    if rows.len() != targets.len() {
        return Err(FitError::InvalidParameter(format!(
            "{} design rows for {} targets",
            rows.len(),
            targets.len()
        )));
    }
    if rows.len() < cols {
        return Err(FitError::Degenerate(format!(
            "{} observations for {} coefficients",
            rows.len(),
            cols
        )));
    }

    let mut xtx = vec![vec![0.0; cols]; cols];
    let mut xty = vec![0.0; cols];
    for (row, y) in rows.iter().zip(targets) {
        for i in 0..cols {
            xty[i] += row[i] * y;
            for j in 0..cols {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let trace: f64 = (0..cols).map(|i| xtx[i][i]).sum();
    if !trace.is_finite() {
        return Err(FitError::NonFinite("normal equations"));
    }
    if trace < PIVOT_EPSILON {
        return Ok(vec![0.0; cols]);
    }
    let ridge = RIDGE * trace / cols as f64;
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += ridge;
    }

    solve(xtx, xty)
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, FitError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return Err(FitError::Degenerate("singular system".to_string()));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FitError::NonFinite("least-squares solution"))
    }
}
