#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), deny(warnings))] // Forbid warnings in release builds
#![warn(clippy::all, rust_2018_idioms)]

//! Eigenvalues and eigenvectors of dense real symmetric matrices.
//!
//! The matrix is reduced to tridiagonal form with Householder reflections and the
//! tridiagonal matrix is diagonalized with implicitly shifted QR steps. Start with
//! [`SymmetricQrEigen`].

pub mod config;
pub mod eigen_ops;
pub mod eigenvalue_decomposition;
pub mod error;
pub mod householder;
pub mod symmetric_qr;
pub mod tridiagonal;

pub use config::EigenConfig;
pub use eigen_ops::{
    bound_largest_eigenvalue, eigenvalue_matrix, eigenvector_matrix, is_symmetric,
    rayleigh_quotient,
};
pub use eigenvalue_decomposition::{EigenDecomposition, SymmetricQrEigen};
pub use error::{EigenError, Result};
pub use symmetric_qr::{SymmetricQrState, Transition};
pub use tridiagonal::TridiagonalDecomposition;
