use nalgebra::DMatrix;
use rand::{rngs::StdRng, Rng};
use symeig::EigenConfig;

/// Symmetric matrix with entries uniform in `[-1, 1)`.
pub fn random_symmetric(rng: &mut StdRng, n: usize) -> DMatrix<f64> {
    let mut a = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let x = rng.gen_range(-1.0..1.0);
            a[(i, j)] = x;
            a[(j, i)] = x;
        }
    }
    a
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut values = values.to_vec();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    values
}

pub fn vector_modes() -> [EigenConfig; 2] {
    [
        EigenConfig::default(),
        EigenConfig::default().with_vectors_with_values(true),
    ]
}
