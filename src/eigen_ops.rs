//! Small operations built around a finished eigen decomposition.

use nalgebra::{DMatrix, DVector};

use crate::{
    eigenvalue_decomposition::EigenDecomposition,
    error::{check_square, EigenError, Result},
    householder::find_max,
};

/// True if `a` is square and every `|a[i,j] - a[j,i]|` is at most `tolerance`
/// times the largest absolute entry of `a`.
pub fn is_symmetric(a: &DMatrix<f64>, tolerance: f64) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }

    let max = find_max(a.as_slice());
    if max == 0.0 {
        return true;
    }

    let n = a.nrows();
    (0..n).all(|i| (i + 1..n).all(|j| (a[(i, j)] - a[(j, i)]).abs() <= tolerance * max))
}

/// `v^T A v / v^T v`, the eigenvalue estimate for an approximate eigenvector `v`.
pub fn rayleigh_quotient(a: &DMatrix<f64>, v: &DVector<f64>) -> Result<f64> {
    let n = check_square(a.nrows(), a.ncols())?;
    if v.len() != n {
        return Err(EigenError::DimensionMismatch {
            expected: (n, 1),
            found: (v.len(), 1),
        });
    }

    let av = a * v;
    Ok(v.dot(&av) / v.dot(v))
}

/// Diagonal matrix holding the eigenvalues in decomposition order.
pub fn eigenvalue_matrix<E: EigenDecomposition>(eig: &E) -> Result<DMatrix<f64>> {
    let n = eig.number_of_eigenvalues();
    if n == 0 {
        return Err(EigenError::NotDecomposed);
    }

    let mut d = DMatrix::zeros(n, n);
    for i in 0..n {
        d[(i, i)] = eig.eigenvalue(i)?;
    }
    Ok(d)
}

/// Matrix with eigenvector `i` in column `i`.
pub fn eigenvector_matrix<E: EigenDecomposition>(eig: &E) -> Result<DMatrix<f64>> {
    let n = eig.number_of_eigenvalues();
    if n == 0 {
        return Err(EigenError::NotDecomposed);
    }

    let mut v = DMatrix::zeros(n, n);
    for i in 0..n {
        v.set_column(i, eig.eigenvector(i)?);
    }
    Ok(v)
}

/// Lower and upper bound of the largest eigenvalue of a non-negative matrix.
///
/// By Perron-Frobenius the spectral radius lies between the smallest and the
/// largest row sum.
pub fn bound_largest_eigenvalue(a: &DMatrix<f64>) -> Result<(f64, f64)> {
    let n = check_square(a.nrows(), a.ncols())?;
    if n == 0 {
        return Ok((0.0, 0.0));
    }

    let mut lower = f64::MAX;
    let mut upper = f64::MIN;
    for row in 0..n {
        let mut sum = 0.0;
        for col in 0..n {
            let x = a[(row, col)];
            if x < 0.0 {
                return Err(EigenError::NegativeEntry { row, col });
            }
            sum += x;
        }
        lower = lower.min(sum);
        upper = upper.max(sum);
    }
    Ok((lower, upper))
}
