//! Penalised least squares
//!
//! Solves `(X^T X + diag(penalties)) beta = X^T y` through a Cholesky
//! factorisation of the normal equations.

use crate::{MathError, Result};

const JITTER: f64 = 1e-9;
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Solve a ridge-penalised least squares problem
///
/// `rows` holds one feature vector per observation. A zero penalty leaves
/// the matching coefficient unconstrained.
pub fn least_squares(rows: &[Vec<f64>], targets: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    if rows.is_empty() {
        return Err(MathError::InsufficientData(
            "Least squares needs at least one observation".to_string(),
        ));
    }
    if rows.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Row count ({}) doesn't match target count ({})",
            rows.len(),
            targets.len()
        )));
    }

    let k = penalties.len();
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Least squares needs at least one feature".to_string(),
        ));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != k) {
        return Err(MathError::InvalidInput(format!(
            "Row {} has {} features, expected {}",
            bad,
            rows[bad].len(),
            k
        )));
    }

    let mut gram = vec![vec![0.0; k]; k];
    let mut rhs = vec![0.0; k];
    for (row, &target) in rows.iter().zip(targets) {
        for i in 0..k {
            rhs[i] += row[i] * target;
            for j in 0..=i {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        gram[i][i] += penalties[i];
        for j in 0..i {
            gram[j][i] = gram[i][j];
        }
    }

    let factor = match cholesky(&gram) {
        Ok(factor) => factor,
        Err(_) => {
            let scale = (0..k).map(|i| gram[i][i].abs()).fold(1.0, f64::max);
            let mut jittered = gram.clone();
            for (i, row) in jittered.iter_mut().enumerate() {
                row[i] += JITTER * scale;
            }
            cholesky(&jittered)?
        }
    };

    Ok(cholesky_solve(&factor, &rhs))
}

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix
pub fn cholesky(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut lower = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|m| lower[i][m] * lower[j][m]).sum();
            if i == j {
                let diagonal = matrix[i][i] - dot;
                if diagonal <= PIVOT_TOLERANCE * matrix[i][i].abs() || !diagonal.is_finite() {
                    return Err(MathError::CalculationError(format!(
                        "Matrix is not positive definite (pivot {} = {})",
                        i, diagonal
                    )));
                }
                lower[i][j] = diagonal.sqrt();
            } else {
                lower[i][j] = (matrix[i][j] - dot) / lower[j][j];
            }
        }
    }

    Ok(lower)
}

/// Solve `L L^T x = b` given the Cholesky factor `L`
pub fn cholesky_solve(lower: &[Vec<f64>], rhs: &[f64]) -> Vec<f64> {
    let n = lower.len();

    let mut forward = vec![0.0; n];
    for i in 0..n {
        let dot: f64 = (0..i).map(|j| lower[i][j] * forward[j]).sum();
        forward[i] = (rhs[i] - dot) / lower[i][i];
    }

    let mut solution = vec![0.0; n];
    for i in (0..n).rev() {
        let dot: f64 = (i + 1..n).map(|j| lower[j][i] * solution[j]).sum();
        solution[i] = (forward[i] - dot) / lower[i][i];
    }

    solution
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_exact_line() {
        // y = 3 + 2x
        let rows: Vec<Vec<f64>> = (0..10).map(|x| vec![1.0, x as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|x| 3.0 + 2.0 * x as f64).collect();

        let beta = least_squares(&rows, &targets, &[0.0, 0.0]).unwrap();
        assert_relative_eq!(beta[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(beta[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_penalty_shrinks_coefficient() {
        let rows: Vec<Vec<f64>> = (0..10).map(|x| vec![x as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|x| 2.0 * x as f64).collect();

        let free = least_squares(&rows, &targets, &[0.0]).unwrap();
        let shrunk = least_squares(&rows, &targets, &[1000.0]).unwrap();
        assert!(shrunk[0].abs() < free[0].abs());
    }

    #[test]
    fn test_collinear_columns_use_jitter() {
        let rows: Vec<Vec<f64>> = (0..5).map(|x| vec![x as f64, x as f64]).collect();
        let targets: Vec<f64> = (0..5).map(|x| x as f64).collect();

        let beta = least_squares(&rows, &targets, &[0.0, 0.0]).unwrap();
        assert_relative_eq!(beta[0] + beta[1], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_shape_validation() {
        assert!(least_squares(&[], &[], &[0.0]).is_err());
        assert!(least_squares(&[vec![1.0]], &[1.0, 2.0], &[0.0]).is_err());
        assert!(least_squares(&[vec![1.0, 2.0]], &[1.0], &[0.0]).is_err());
    }
}
