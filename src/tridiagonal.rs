//! Householder reduction of a symmetric matrix to a similar tridiagonal matrix.
//!
//! Only the lower triangle of the working matrix is read and written, column by
//! column. After [`TridiagonalDecomposition::decompose`] its diagonal and first
//! sub-diagonal hold `T`, and column `k` below the sub-diagonal holds the tail of the
//! `k`-th Householder vector (its leading element is an implicit `1`).

use nalgebra::DMatrix;

use crate::{
    error::{check_square, EigenError, Result},
    householder::{
        apply_reflector_left, apply_reflector_right, compute_tau_and_divide, divide_elements,
        find_max,
    },
};

/// Computes `T = Q^T * A * Q` for a symmetric `A`.
#[derive(Clone, Debug)]
pub struct TridiagonalDecomposition {
    /// Tridiagonal values and reflectors, lower triangle only.
    qt: DMatrix<f64>,
    n: usize,
    /// `gammas[k]` scales the reflector stored in column `k`.
    gammas: Vec<f64>,
    u: Vec<f64>,
    w: Vec<f64>,
    temp: Vec<f64>,
    input_modified: bool,
}

impl Default for TridiagonalDecomposition {
    fn default() -> Self {
        Self {
            qt: DMatrix::zeros(0, 0),
            n: 0,
            gammas: Vec::new(),
            u: Vec::new(),
            w: Vec::new(),
            temp: Vec::new(),
            input_modified: false,
        }
    }
}

impl TridiagonalDecomposition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decomposes a copy of `a`. The copy lives in a buffer that is reused by later calls
    /// with the same size.
    pub fn decompose(&mut self, a: &DMatrix<f64>) -> Result<()> {
        puffin::profile_function!();
        check_square(a.nrows(), a.ncols())?;
        if self.qt.shape() == a.shape() {
            self.qt.copy_from(a);
        } else {
            self.qt = a.clone();
        }
        self.input_modified = false;
        self.reduce();
        Ok(())
    }

    /// Decomposes `a` in place. Its storage becomes the working matrix and can be
    /// taken back with [`Self::into_qt`].
    pub fn decompose_owned(&mut self, a: DMatrix<f64>) -> Result<()> {
        puffin::profile_function!();
        check_square(a.nrows(), a.ncols())?;
        self.qt = a;
        self.input_modified = true;
        self.reduce();
        Ok(())
    }

    /// True if the last decomposition consumed the caller's matrix.
    pub fn input_modified(&self) -> bool {
        self.input_modified
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn qt(&self) -> &DMatrix<f64> {
        &self.qt
    }

    pub fn into_qt(self) -> DMatrix<f64> {
        self.qt
    }

    /// Reflector scales, one per reduction step (`N - 1` of them). Zero marks a
    /// column that was already reduced.
    pub fn gammas(&self) -> &[f64] {
        &self.gammas
    }

    fn reduce(&mut self) {
        let n = self.qt.nrows();
        self.n = n;
        self.gammas.clear();
        self.gammas.resize(n.saturating_sub(1), 0.0);
        self.u.resize(n, 0.0);
        self.w.resize(n, 0.0);
        self.temp.resize(n, 0.0);

        for k in 1..n {
            self.similar_transform(k);
        }
    }

    /// Builds the reflector that zeros column `k - 1` below the sub-diagonal and applies
    /// it to both sides of the trailing submatrix.
    fn similar_transform(&mut self, k: usize) {
        let n = self.n;
        let col = k - 1;

        let Self { qt, u, .. } = self;
        // column-major storage, so column `col` starts at `col * n`
        let column = col * n;
        u[k..n].copy_from_slice(&qt.as_slice()[column + k..column + n]);

        let max = find_max(&u[k..n]);
        if max == 0.0 {
            self.gammas[col] = 0.0;
            return;
        }

        let tau = compute_tau_and_divide(&mut u[k..n], max);
        let nu = u[k] + tau;
        divide_elements(&mut u[k + 1..n], nu);
        u[k] = 1.0;
        qt.as_mut_slice()[column + k..column + n].copy_from_slice(&u[k..n]);

        let gamma = nu / tau;
        self.gammas[col] = gamma;

        self.householder_symmetric(k, gamma);

        // the leading 1 is implicit, so the slot holds the new sub-diagonal value
        self.qt[(k, col)] = -tau * max;
    }

    /// `A = (I - gamma*u*u^T) * A * (I - gamma*u*u^T)` on the trailing submatrix,
    /// written as the rank-2 update `A + w*u^T + u*w^T`.
    fn householder_symmetric(&mut self, start: usize, gamma: f64) {
        let n = self.n;
        let Self { qt, u, w, .. } = self;

        // w = -gamma*A*u; each stored column also stands in for its mirrored row
        w[start..n].iter_mut().for_each(|x| *x = 0.0);
        for j in start..n {
            let column = qt.column(j);
            let uj = u[j];
            let mut total = column[j] * uj;
            for i in j + 1..n {
                w[i] += column[i] * uj;
                total += column[i] * u[i];
            }
            w[j] += total;
        }
        for x in &mut w[start..n] {
            *x *= -gamma;
        }

        let mut alpha = 0.0;
        for i in start..n {
            alpha += u[i] * w[i];
        }
        alpha *= -0.5 * gamma;

        for i in start..n {
            w[i] += alpha * u[i];
        }

        for j in start..n {
            let (wj, uj) = (w[j], u[j]);
            let mut column = qt.column_mut(j);
            for i in j..n {
                column[i] += w[i] * uj + u[i] * wj;
            }
        }
    }

    /// Copies the diagonal and off-diagonal of `T` into the given slices.
    pub fn diagonal(&self, diag: &mut [f64], off: &mut [f64]) {
        let n = self.n;
        for i in 0..n {
            diag[i] = self.qt[(i, i)];
            if i + 1 < n {
                off[i] = self.qt[(i + 1, i)];
            }
        }
    }

    pub fn diagonals(&self) -> (Vec<f64>, Vec<f64>) {
        let mut diag = vec![0.0; self.n];
        let mut off = vec![0.0; self.n.saturating_sub(1)];
        self.diagonal(&mut diag, &mut off);
        (diag, off)
    }

    /// The symmetric tridiagonal matrix `T`, written into `out` when one is supplied.
    pub fn t(&self, out: Option<DMatrix<f64>>) -> Result<DMatrix<f64>> {
        let n = self.n;
        let mut t = zeroed_output(out, n)?;

        for i in 0..n {
            t[(i, i)] = self.qt[(i, i)];
            if i + 1 < n {
                let a = self.qt[(i + 1, i)];
                t[(i, i + 1)] = a;
                t[(i + 1, i)] = a;
            }
        }
        Ok(t)
    }

    /// Rebuilds the orthogonal `Q` (or `Q^T` when `transposed`) from the stored
    /// reflectors, last reflector first.
    pub fn q(&mut self, out: Option<DMatrix<f64>>, transposed: bool) -> Result<DMatrix<f64>> {
        puffin::profile_function!();
        let n = self.n;
        let mut q = zeroed_output(out, n)?;
        q.fill_with_identity();

        let Self {
            qt, gammas, w, temp, ..
        } = self;
        w.iter_mut().for_each(|x| *x = 0.0);

        for j in (0..n.saturating_sub(1)).rev() {
            w[j + 1] = 1.0;
            w[j + 2..n].copy_from_slice(&qt.as_slice()[j * n + j + 2..(j + 1) * n]);
            if transposed {
                apply_reflector_right(&mut q, w, gammas[j], j + 1..n, j + 1..n, temp);
            } else {
                apply_reflector_left(&mut q, w, gammas[j], j + 1..n, j + 1..n, temp);
            }
        }
        Ok(q)
    }
}

/// Returns `out` cleared to zero, or a new `n x n` zero matrix.
pub(crate) fn zeroed_output(out: Option<DMatrix<f64>>, n: usize) -> Result<DMatrix<f64>> {
    match out {
        None => Ok(DMatrix::zeros(n, n)),
        Some(mut m) => {
            if m.shape() != (n, n) {
                return Err(EigenError::DimensionMismatch {
                    expected: (n, n),
                    found: m.shape(),
                });
            }
            m.fill(0.0);
            Ok(m)
        }
    }
}
