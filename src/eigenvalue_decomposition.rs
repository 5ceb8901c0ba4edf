use nalgebra::{DMatrix, DVector};

use crate::{
    config::EigenConfig,
    eigen_ops::is_symmetric,
    error::{check_square, EigenError, Result},
    symmetric_qr::SymmetricQrState,
    tridiagonal::TridiagonalDecomposition,
};

/// Shared surface of eigen decompositions.
pub trait EigenDecomposition {
    /// Decomposes `a`. `Ok(false)` means the iteration did not converge (or `a` is
    /// empty); the accessors must not be used then.
    fn decompose(&mut self, a: &DMatrix<f64>) -> Result<bool>;

    fn number_of_eigenvalues(&self) -> usize;

    fn eigenvalue(&self, index: usize) -> Result<f64>;

    fn eigenvector(&self, index: usize) -> Result<&DVector<f64>>;

    /// True if the last call consumed the caller's matrix.
    fn input_modified(&self) -> bool;
}

/** Eigenvalues and eigenvectors of a real symmetric matrix.

    A = V*D*V' where the eigenvalue matrix D is diagonal and the eigenvector
    matrix V is orthogonal. The matrix is first reduced to tridiagonal form by
    Householder reflections and then diagonalized by implicitly shifted QR steps.

    Depending on [`EigenConfig`] the eigenvectors are skipped, accumulated in the
    same pass as the eigenvalues, or (the default) computed by a second pass that
    reuses the eigenvalues of a cheap first pass as shifts.

    Eigenvalues are reported in the order the iteration finalized them, not sorted.
    Eigenvector `i` always belongs to eigenvalue `i`.
**/
#[derive(Clone, Debug)]
pub struct SymmetricQrEigen {
    config: EigenConfig,
    tridiagonal: TridiagonalDecomposition,
    state: SymmetricQrState,

    /// Tridiagonal form, kept so that the second pass can start over from it.
    diag: Vec<f64>,
    off: Vec<f64>,

    values: Vec<f64>,
    /// Eigenvectors in its columns after a successful decomposition.
    v: Option<DMatrix<f64>>,
    vectors: Vec<DVector<f64>>,
    decomposed: bool,
}

impl SymmetricQrEigen {
    pub fn new(config: EigenConfig) -> Result<Self> {
        if config.vectors_with_values && !config.compute_vectors {
            return Err(EigenError::VectorsNotRequested);
        }

        Ok(Self {
            config,
            tridiagonal: TridiagonalDecomposition::new(),
            state: SymmetricQrState::new(
                config.max_iterations,
                config.exceptional_threshold,
                config.script_fallback_steps,
            ),
            diag: Vec::new(),
            off: Vec::new(),
            values: Vec::new(),
            v: None,
            vectors: Vec::new(),
            decomposed: false,
        })
    }

    pub fn config(&self) -> &EigenConfig {
        &self.config
    }

    /// Decomposes a copy of `a`.
    pub fn decompose(&mut self, a: &DMatrix<f64>) -> Result<bool> {
        puffin::profile_function!();
        self.decomposed = false;
        let n = check_square(a.nrows(), a.ncols())?;
        if n == 0 {
            return Ok(false);
        }

        self.tridiagonal.decompose(a)?;
        self.solve()
    }

    /// Decomposes `a`, using its storage as the working matrix.
    pub fn decompose_owned(&mut self, a: DMatrix<f64>) -> Result<bool> {
        puffin::profile_function!();
        self.decomposed = false;
        let n = check_square(a.nrows(), a.ncols())?;
        if n == 0 {
            return Ok(false);
        }

        self.tridiagonal.decompose_owned(a)?;
        self.solve()
    }

    /// Like [`Self::decompose`], but first checks that `a` is symmetric within the
    /// configured relative tolerance.
    pub fn decompose_checked(&mut self, a: &DMatrix<f64>) -> Result<bool> {
        check_square(a.nrows(), a.ncols())?;
        if !is_symmetric(a, self.config.symmetry_tolerance) {
            self.decomposed = false;
            return Err(EigenError::NotSymmetric {
                tolerance: self.config.symmetry_tolerance,
            });
        }
        self.decompose(a)
    }

    fn solve(&mut self) -> Result<bool> {
        let n = self.tridiagonal.size();
        self.diag.resize(n, 0.0);
        self.off.resize(n - 1, 0.0);
        self.tridiagonal.diagonal(&mut self.diag, &mut self.off);

        let converged = if !self.config.compute_vectors {
            self.compute_values()?
        } else if self.config.vectors_with_values {
            self.extract_together()?
        } else {
            self.extract_separate()?
        };

        if converged {
            log::debug!("decomposed {}x{} symmetric matrix", n, n);
        }
        self.decomposed = converged;
        Ok(converged)
    }

    /// Eigenvalues only, with `2 x 2` blocks solved in closed form.
    fn compute_values(&mut self) -> Result<bool> {
        puffin::profile_scope!("eigenvalues");
        self.state.init(&self.diag, &self.off)?;
        self.state.set_fast_eigenvalues(true);

        if !self.state.run() {
            return Ok(false);
        }
        self.save_values();
        Ok(true)
    }

    /// One pass that rotates `Q` along with every step.
    fn extract_together(&mut self) -> Result<bool> {
        puffin::profile_scope!("eigenvalues with eigenvectors");
        let q = self.reconstruct_q()?;
        self.state.init(&self.diag, &self.off)?;
        self.state.set_q(Some(q))?;

        let converged = self.state.run();
        self.v = self.state.take_q();
        if !converged {
            return Ok(false);
        }

        self.save_values();
        self.save_vectors();
        Ok(true)
    }

    /// Eigenvalues first, then a second pass over the same tridiagonal matrix that
    /// follows them as shifts while accumulating `Q`.
    fn extract_separate(&mut self) -> Result<bool> {
        if !self.compute_values()? {
            return Ok(false);
        }

        puffin::profile_scope!("eigenvectors");
        let q = self.reconstruct_q()?;
        self.state.init(&self.diag, &self.off)?;
        self.state.set_q(Some(q))?;
        self.state.follow_script(&self.values)?;

        let converged = self.state.run();
        self.v = self.state.take_q();
        if !converged {
            return Ok(false);
        }

        // the second pass may finalize the values in a different order
        self.save_values();
        self.save_vectors();
        Ok(true)
    }

    fn reconstruct_q(&mut self) -> Result<DMatrix<f64>> {
        let n = self.tridiagonal.size();
        let buffer = self.v.take().filter(|v| v.shape() == (n, n));
        self.tridiagonal.q(buffer, false)
    }

    fn save_values(&mut self) {
        self.values.clear();
        self.values.extend_from_slice(self.state.eigenvalues());
    }

    fn save_vectors(&mut self) {
        let Self { v, vectors, .. } = self;
        let v = match v.as_ref() {
            Some(v) => v,
            None => return,
        };

        let n = v.ncols();
        vectors.truncate(n);
        vectors.resize_with(n, || DVector::zeros(n));
        for (i, vector) in vectors.iter_mut().enumerate() {
            if vector.len() != n {
                *vector = DVector::zeros(n);
            }
            vector.copy_from(&v.column(i));
        }
    }

    fn check_decomposed(&self) -> Result<()> {
        if !self.decomposed {
            return Err(EigenError::NotDecomposed);
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        self.check_decomposed()?;
        if index >= self.values.len() {
            return Err(EigenError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            });
        }
        Ok(())
    }

    pub fn eigenvalues(&self) -> Result<&[f64]> {
        self.check_decomposed()?;
        Ok(&self.values)
    }

    /// Eigenvectors as the columns of one orthogonal matrix.
    pub fn eigenvector_matrix(&self) -> Result<&DMatrix<f64>> {
        if !self.config.compute_vectors {
            return Err(EigenError::VectorsNotRequested);
        }
        self.check_decomposed()?;
        self.v.as_ref().ok_or(EigenError::NotDecomposed)
    }

    pub fn eigenvectors(&self) -> Result<&[DVector<f64>]> {
        if !self.config.compute_vectors {
            return Err(EigenError::VectorsNotRequested);
        }
        self.check_decomposed()?;
        Ok(&self.vectors)
    }

    /// The tridiagonal reduction of the last decomposed matrix, for extracting `T`
    /// and `Q`.
    pub fn tridiagonal(&mut self) -> &mut TridiagonalDecomposition {
        &mut self.tridiagonal
    }
}

impl EigenDecomposition for SymmetricQrEigen {
    fn decompose(&mut self, a: &DMatrix<f64>) -> Result<bool> {
        SymmetricQrEigen::decompose(self, a)
    }

    fn number_of_eigenvalues(&self) -> usize {
        if self.decomposed {
            self.values.len()
        } else {
            0
        }
    }

    fn eigenvalue(&self, index: usize) -> Result<f64> {
        self.check_index(index)?;
        Ok(self.values[index])
    }

    fn eigenvector(&self, index: usize) -> Result<&DVector<f64>> {
        if !self.config.compute_vectors {
            return Err(EigenError::VectorsNotRequested);
        }
        self.check_index(index)?;
        Ok(&self.vectors[index])
    }

    fn input_modified(&self) -> bool {
        self.tridiagonal.input_modified()
    }
}
