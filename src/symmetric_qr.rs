//! Implicit symmetric QR iteration on a tridiagonal matrix.
//!
//! [`SymmetricQrState`] owns private copies of the diagonal and off-diagonal, the
//! active window `[x1, x2]` of the unconverged submatrix and the stack of split points.
//! Each call to [`SymmetricQrState::step`] performs exactly one transition:
//!
//! 1. `x1 == x2`: `diag[x1]` has converged, the window moves to the next block.
//! 2. In fast mode a `2 x 2` window is solved in closed form.
//! 3. A negligible `off[i]` inside the window splits it; the window restarts at `i + 1`.
//! 4. Too many steps since the last exceptional shift: rotate by a random angle.
//! 5. Otherwise one implicit QR step with a Wilkinson (or scripted) shift.
//!
//! When an orthogonal matrix is attached every Givens rotation is also applied to
//! its columns, so `A = Q * T * Q^T` is preserved throughout.

use nalgebra::DMatrix;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::{DEFAULT_EXCEPTIONAL_THRESHOLD, DEFAULT_MAX_ITERATIONS, DEFAULT_SCRIPT_FALLBACK_STEPS},
    error::{EigenError, Result},
};

/// Seed of the generator behind exceptional shifts. Fixed so runs are reproducible.
pub const EXCEPTIONAL_SEED: u64 = 0x34671e;

/// Growth of the exceptional rotation angle per exceptional shift, capped at one radian.
pub const EXCEPTIONAL_ANGLE_STEP: f64 = 0.05;

/// Outcome of a single [`SymmetricQrState::step`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transition {
    /// `diag[index]` is an eigenvalue.
    Converged { index: usize },
    /// Both values of the window starting at `x1` were computed in closed form.
    Solved2x2 { x1: usize },
    /// `off[at]` is negligible; the window now starts at `at + 1`.
    SplitFound { at: usize },
    ExceptionalShift,
    ImplicitStep { shift: f64 },
    /// The eigenvalue script stopped converging and the Wilkinson shift takes over.
    ScriptAbandoned,
    /// Every block has converged.
    AllConverged,
    /// A block used up its iterations.
    Failed,
}

/// A Givens rotation together with the products needed for a symmetric update.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Rotation {
    c: f64,
    s: f64,
    c2: f64,
    s2: f64,
    cs: f64,
}

impl Rotation {
    const IDENTITY: Self = Self {
        c: 1.0,
        s: 0.0,
        c2: 1.0,
        s2: 0.0,
        cs: 0.0,
    };

    fn from_angle(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self {
            c,
            s,
            c2: c * c,
            s2: s * s,
            cs: c * s,
        }
    }

    /// Rotation taking `(run, rise)` onto the first axis. The larger magnitude is
    /// divided out first.
    fn from_run_rise(run: f64, rise: f64) -> Self {
        if run == 0.0 && rise == 0.0 {
            return Self::IDENTITY;
        }

        if rise.abs() > run.abs() {
            let k = run / rise;
            let bottom = 1.0 + k * k;
            let bottom_sq = bottom.sqrt();
            Self {
                c: k / bottom_sq,
                s: 1.0 / bottom_sq,
                c2: k * k / bottom,
                s2: 1.0 / bottom,
                cs: k / bottom,
            }
        } else {
            let t = rise / run;
            let bottom = 1.0 + t * t;
            let bottom_sq = bottom.sqrt();
            Self {
                c: 1.0 / bottom_sq,
                s: t / bottom_sq,
                c2: 1.0 / bottom,
                s2: t * t / bottom,
                cs: t / bottom,
            }
        }
    }
}

/// Eigenvalues of `[[a11, a12], [a12, a22]]`, larger first.
pub fn symmetric_2x2_eigenvalues(a11: f64, a12: f64, a22: f64) -> (f64, f64) {
    let left = (a11 + a22) * 0.5;
    let b = (a11 - a22) * 0.5;
    let right = (b * b + a12 * a12).sqrt();
    (left + right, left - right)
}

/// Divides the three entries of a symmetric `2 x 2` block by their largest magnitude.
fn normalized_2x2(a: f64, b: f64, c: f64) -> Option<(f64, [f64; 3])> {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 {
        return None;
    }
    Some((scale, [a / scale, b / scale, c / scale]))
}

fn check_length(found: usize, expected: usize) -> Result<()> {
    if found != expected {
        return Err(EigenError::DimensionMismatch {
            expected: (expected, 1),
            found: (found, 1),
        });
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct SymmetricQrState {
    n: usize,
    diag: Vec<f64>,
    off: Vec<f64>,

    x1: usize,
    x2: usize,
    done: bool,
    splits: Vec<usize>,

    steps: usize,
    num_exceptional: usize,
    last_exceptional: usize,

    bulge: f64,
    q: Option<DMatrix<f64>>,
    rng: StdRng,

    fast_eigenvalues: bool,
    following_script: bool,
    script: Vec<f64>,

    max_iterations: usize,
    exceptional_threshold: usize,
    script_fallback_steps: usize,
}

impl Default for SymmetricQrState {
    fn default() -> Self {
        Self {
            n: 0,
            diag: Vec::new(),
            off: Vec::new(),
            x1: 0,
            x2: 0,
            done: true,
            splits: Vec::new(),
            steps: 0,
            num_exceptional: 0,
            last_exceptional: 0,
            bulge: 0.0,
            q: None,
            rng: StdRng::seed_from_u64(EXCEPTIONAL_SEED),
            fast_eigenvalues: false,
            following_script: false,
            script: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            exceptional_threshold: DEFAULT_EXCEPTIONAL_THRESHOLD,
            script_fallback_steps: DEFAULT_SCRIPT_FALLBACK_STEPS,
        }
    }
}

impl SymmetricQrState {
    pub fn new(
        max_iterations: usize,
        exceptional_threshold: usize,
        script_fallback_steps: usize,
    ) -> Self {
        Self {
            max_iterations,
            exceptional_threshold,
            script_fallback_steps,
            ..Self::default()
        }
    }

    /// Loads a tridiagonal matrix and resets the iteration. Buffers are resized, not
    /// reallocated, when the size repeats. The attached `Q` and the modes are cleared.
    pub fn init(&mut self, diag: &[f64], off: &[f64]) -> Result<()> {
        let n = diag.len();
        check_length(off.len(), n.saturating_sub(1))?;

        self.reset(n);
        self.diag.clear();
        self.diag.extend_from_slice(diag);
        self.off.clear();
        self.off.extend_from_slice(off);
        Ok(())
    }

    fn reset(&mut self, n: usize) {
        self.n = n;
        self.splits.clear();
        self.x1 = 0;
        self.x2 = n.saturating_sub(1);
        self.done = n == 0;
        self.steps = 0;
        self.num_exceptional = 0;
        self.last_exceptional = 0;
        self.bulge = 0.0;
        self.q = None;
        self.rng = StdRng::seed_from_u64(EXCEPTIONAL_SEED);
        self.fast_eigenvalues = false;
        self.following_script = false;
    }

    /// Solve `2 x 2` windows in closed form. Only valid without an attached `Q`.
    pub fn set_fast_eigenvalues(&mut self, fast: bool) {
        self.fast_eigenvalues = fast;
    }

    /// Uses previously computed eigenvalues as shifts, `eigenvalues[x2]` for the
    /// window ending at `x2`, until a block takes more than `script_fallback_steps`.
    pub fn follow_script(&mut self, eigenvalues: &[f64]) -> Result<()> {
        check_length(eigenvalues.len(), self.n)?;
        self.script.clear();
        self.script.extend_from_slice(eigenvalues);
        self.following_script = true;
        self.fast_eigenvalues = false;
        Ok(())
    }

    pub fn is_following_script(&self) -> bool {
        self.following_script
    }

    /// Attaches the matrix that accumulates the rotations. It needs one column per
    /// row of the tridiagonal matrix.
    pub fn set_q(&mut self, q: Option<DMatrix<f64>>) -> Result<()> {
        if let Some(q) = &q {
            if q.ncols() != self.n {
                return Err(EigenError::DimensionMismatch {
                    expected: (q.nrows(), self.n),
                    found: q.shape(),
                });
            }
        }
        self.q = q;
        Ok(())
    }

    pub fn q(&self) -> Option<&DMatrix<f64>> {
        self.q.as_ref()
    }

    pub fn take_q(&mut self) -> Option<DMatrix<f64>> {
        self.q.take()
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    pub fn off(&self) -> &[f64] {
        &self.off
    }

    /// The unconverged window, `None` once everything has converged.
    pub fn window(&self) -> Option<(usize, usize)> {
        if self.done {
            None
        } else {
            Some((self.x1, self.x2))
        }
    }

    pub fn splits(&self) -> &[usize] {
        &self.splits
    }

    /// Steps taken since the last converged eigenvalue.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn num_exceptional(&self) -> usize {
        self.num_exceptional
    }

    /// Eigenvalues in index order. Only meaningful after [`Transition::AllConverged`].
    pub fn eigenvalues(&self) -> &[f64] {
        &self.diag
    }

    /// Runs [`Self::step`] until every block converged (`true`) or one ran out of
    /// iterations (`false`).
    pub fn run(&mut self) -> bool {
        puffin::profile_function!();
        loop {
            match self.step() {
                Transition::AllConverged => return true,
                Transition::Failed => return false,
                _ => {}
            }
        }
    }

    /// Performs one transition of the iteration.
    pub fn step(&mut self) -> Transition {
        if self.done {
            return Transition::AllConverged;
        }
        if self.steps > self.max_iterations {
            log::warn!(
                "no convergence in window [{}, {}] after {} steps",
                self.x1,
                self.x2,
                self.steps
            );
            return Transition::Failed;
        }

        let transition = if self.x1 == self.x2 {
            let index = self.x1;
            log::trace!("eigenvalue {} converged to {}", index, self.diag[index]);
            self.reset_steps();
            if !self.next_split() {
                self.done = true;
            }
            Transition::Converged { index }
        } else if self.fast_eigenvalues && self.x2 - self.x1 == 1 {
            let x1 = self.x1;
            self.reset_steps();
            self.eigenvalue_2x2(x1);
            self.x1 = self.x2;
            Transition::Solved2x2 { x1 }
        } else if self.steps - self.last_exceptional > self.exceptional_threshold {
            self.exceptional_shift();
            Transition::ExceptionalShift
        } else {
            self.perform_step()
        };

        self.steps += 1;
        transition
    }

    fn reset_steps(&mut self) {
        self.steps = 0;
        self.last_exceptional = 0;
    }

    /// Moves the window to the block below the most recent split.
    fn next_split(&mut self) -> bool {
        match self.splits.pop() {
            Some(x2) => {
                self.x2 = x2;
                self.x1 = self.splits.last().map_or(0, |&split| split + 1);
                true
            }
            None => false,
        }
    }

    /// `off[index]` is negligible relative to its neighbouring diagonal entries.
    fn is_zero(&self, index: usize) -> bool {
        let bottom = self.diag[index].abs() + self.diag[index + 1].abs();
        self.off[index].abs() <= bottom * f64::EPSILON
    }

    fn perform_step(&mut self) -> Transition {
        for i in (self.x1..self.x2).rev() {
            if self.is_zero(i) {
                log::trace!("split at {} in window [{}, {}]", i, self.x1, self.x2);
                self.splits.push(i);
                self.x1 = i + 1;
                return Transition::SplitFound { at: i };
            }
        }

        let shift = if self.following_script {
            if self.steps > self.script_fallback_steps {
                log::warn!(
                    "eigenvalue script stalled on window [{}, {}], using wilkinson shifts",
                    self.x1,
                    self.x2
                );
                self.following_script = false;
                return Transition::ScriptAbandoned;
            }
            // the exact eigenvalue converges in one or two steps
            self.script[self.x2]
        } else {
            self.compute_shift()
        };

        self.perform_implicit_single_step(shift, false);
        Transition::ImplicitStep { shift }
    }

    pub fn compute_shift(&self) -> f64 {
        if self.x2 > self.x1 {
            self.wilkinson_shift()
        } else {
            self.diag[self.x2]
        }
    }

    /// Eigenvalue of the trailing `2 x 2` block closest to `diag[x2]`.
    pub fn wilkinson_shift(&self) -> f64 {
        let x2 = self.x2;
        let (a, b, c) = (self.diag[x2 - 1], self.off[x2 - 1], self.diag[x2]);

        // an all zero block splits before a shift is ever needed
        let (scale, [a, b, c]) = match normalized_2x2(a, b, c) {
            Some(normalized) => normalized,
            None => return 0.0,
        };

        let (value0, value1) = symmetric_2x2_eigenvalues(a, b, c);
        if (value0 - c).abs() < (value1 - c).abs() {
            scale * value0
        } else {
            scale * value1
        }
    }

    fn eigenvalue_2x2(&mut self, x1: usize) {
        let (a, b, c) = (self.diag[x1], self.off[x1], self.diag[x1 + 1]);

        self.off[x1] = 0.0;
        match normalized_2x2(a, b, c) {
            Some((scale, [a, b, c])) => {
                let (value0, value1) = symmetric_2x2_eigenvalues(a, b, c);
                self.diag[x1] = scale * value0;
                self.diag[x1 + 1] = scale * value1;
            }
            None => {
                self.diag[x1] = 0.0;
                self.diag[x1 + 1] = 0.0;
            }
        }
    }

    /// Rotates by a random angle whose magnitude grows with each exceptional shift.
    fn exceptional_shift(&mut self) {
        self.num_exceptional += 1;
        let mag = (EXCEPTIONAL_ANGLE_STEP * self.num_exceptional as f64).min(1.0);
        let theta = 2.0 * (self.rng.gen::<f64>() - 0.5) * mag;
        log::debug!(
            "exceptional shift {} on window [{}, {}], angle {}",
            self.num_exceptional,
            self.x1,
            self.x2,
            theta
        );

        self.perform_implicit_single_step(theta, true);
        self.last_exceptional = self.steps;
    }

    /// One implicit QR step on the window. `value` is the shift, or the rotation
    /// angle when `by_angle` is set.
    fn perform_implicit_single_step(&mut self, value: f64, by_angle: bool) {
        let (x1, x2) = (self.x1, self.x2);
        let rotation = if by_angle {
            Rotation::from_angle(value)
        } else {
            Rotation::from_run_rise(self.diag[x1] - value, self.off[x1])
        };

        if x2 - x1 == 1 {
            self.rotate_block(x1, rotation);
            return;
        }

        let a23 = self.off[x1 + 1];
        self.rotate_block(x1, rotation);
        self.off[x1 + 1] = rotation.c * a23;
        self.bulge = rotation.s * a23;

        let mut i = x1;
        while i + 2 < x2 && self.bulge != 0.0 {
            self.remove_bulge(i, true);
            i += 1;
        }
        if self.bulge != 0.0 {
            self.remove_bulge(x2 - 2, false);
        }
    }

    /// Chases the bulge at `(i, i + 2)` one position down. At the bottom of the window
    /// there is no `off[i + 2]` to pass it on to.
    fn remove_bulge(&mut self, i: usize, pass_on: bool) {
        let a12 = self.off[i];
        let rotation = Rotation::from_run_rise(a12, self.bulge);

        self.off[i] = rotation.c * a12 + rotation.s * self.bulge;
        self.rotate_block(i + 1, rotation);

        if pass_on {
            let a34 = self.off[i + 2];
            self.off[i + 2] = rotation.c * a34;
            self.bulge = rotation.s * a34;
        } else {
            self.bulge = 0.0;
        }
    }

    /// Applies `R * B * R^T` to the `2 x 2` diagonal block at `(i, i + 1)` and the
    /// same rotation to columns `i` and `i + 1` of `Q`.
    fn rotate_block(&mut self, i: usize, r: Rotation) {
        let a11 = self.diag[i];
        let a22 = self.diag[i + 1];
        let a12 = self.off[i];

        self.diag[i] = r.c2 * a11 + 2.0 * r.cs * a12 + r.s2 * a22;
        self.diag[i + 1] = r.c2 * a22 - 2.0 * r.cs * a12 + r.s2 * a11;
        self.off[i] = a12 * (r.c2 - r.s2) + r.cs * (a22 - a11);

        if let Some(q) = self.q.as_mut() {
            let rows = q.nrows();
            let data = q.as_mut_slice();
            let (left, right) = data.split_at_mut((i + 1) * rows);
            let col_a = &mut left[i * rows..];
            let col_b = &mut right[..rows];
            for (a, b) in col_a.iter_mut().zip(col_b.iter_mut()) {
                let (va, vb) = (*a, *b);
                *a = r.c * va + r.s * vb;
                *b = -r.s * va + r.c * vb;
            }
        }
    }
}
