/// After this many steps without convergence an exceptional shift is applied.
pub const DEFAULT_EXCEPTIONAL_THRESHOLD: usize = 15;

/// Steps a block may spend at most before the decomposition gives up.
pub const DEFAULT_MAX_ITERATIONS: usize = DEFAULT_EXCEPTIONAL_THRESHOLD * 15;

/// Steps the eigenvector pass follows the known eigenvalues before it falls back to the
/// Wilkinson shift.
pub const DEFAULT_SCRIPT_FALLBACK_STEPS: usize = 10;

/// Relative tolerance used by [`crate::SymmetricQrEigen::decompose_checked`].
pub const DEFAULT_SYMMETRY_TOLERANCE: f64 = 1e-8;

/// Construction-time settings of a symmetric eigen decomposition.
#[cfg_attr(feature = "persistence", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EigenConfig {
    /// Compute eigenvectors as well as eigenvalues.
    pub compute_vectors: bool,

    /// Accumulate the eigenvectors in the same pass as the eigenvalues instead of
    /// running a cheap eigenvalue pass first and replaying it.
    pub vectors_with_values: bool,

    pub max_iterations: usize,
    pub exceptional_threshold: usize,
    pub script_fallback_steps: usize,
    pub symmetry_tolerance: f64,
}

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            compute_vectors: true,
            vectors_with_values: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            exceptional_threshold: DEFAULT_EXCEPTIONAL_THRESHOLD,
            script_fallback_steps: DEFAULT_SCRIPT_FALLBACK_STEPS,
            symmetry_tolerance: DEFAULT_SYMMETRY_TOLERANCE,
        }
    }
}

impl EigenConfig {
    /// Eigenvalues only.
    pub fn values_only() -> Self {
        Self {
            compute_vectors: false,
            ..Self::default()
        }
    }

    pub fn with_compute_vectors(mut self, compute_vectors: bool) -> Self {
        self.compute_vectors = compute_vectors;
        self
    }

    pub fn with_vectors_with_values(mut self, vectors_with_values: bool) -> Self {
        self.vectors_with_values = vectors_with_values;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_exceptional_threshold(mut self, exceptional_threshold: usize) -> Self {
        self.exceptional_threshold = exceptional_threshold;
        self
    }

    pub fn with_script_fallback_steps(mut self, script_fallback_steps: usize) -> Self {
        self.script_fallback_steps = script_fallback_steps;
        self
    }

    pub fn with_symmetry_tolerance(mut self, symmetry_tolerance: f64) -> Self {
        self.symmetry_tolerance = symmetry_tolerance;
        self
    }
}
