use thiserror::Error;

/// Errors reported at the boundary of the decompositions.
///
/// Running out of iterations is not an error: `decompose` returns `Ok(false)`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EigenError {
    #[error("matrix must be square, found {rows} x {cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("output buffer must be {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("eigenvectors were not requested when the decomposition was configured")]
    VectorsNotRequested,

    #[error("matrix is not symmetric within a relative tolerance of {tolerance}")]
    NotSymmetric { tolerance: f64 },

    #[error("no successful decomposition is available")]
    NotDecomposed,

    #[error("index {index} is out of bounds for {len} eigenvalues")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("matrix has a negative entry at ({row}, {col})")]
    NegativeEntry { row: usize, col: usize },
}

pub type Result<T> = std::result::Result<T, EigenError>;

/// Fails with [`EigenError::NotSquare`] unless `rows == cols`.
pub(crate) fn check_square(rows: usize, cols: usize) -> Result<usize> {
    if rows != cols {
        return Err(EigenError::NotSquare { rows, cols });
    }
    Ok(rows)
}
