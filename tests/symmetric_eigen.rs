mod common;

use approx::assert_abs_diff_eq;
use common::{random_symmetric, sorted, vector_modes};
use nalgebra::{dmatrix, DMatrix};
use rand::{rngs::StdRng, SeedableRng};
use symeig::{
    eigenvalue_matrix, eigenvector_matrix, rayleigh_quotient, EigenConfig, EigenDecomposition,
    EigenError, SymmetricQrEigen,
};

/// Checks `A = V D V^T`, `V^T V = I` and `A v = lambda v`. `tolerance` is relative
/// to `scale`, the magnitude of the entries of `a`.
fn assert_decomposes(
    eig: &SymmetricQrEigen,
    a: &DMatrix<f64>,
    tolerance: f64,
    scale: f64,
) -> anyhow::Result<()> {
    let n = a.nrows();
    let d = eigenvalue_matrix(eig)?;
    let v = eigenvector_matrix(eig)?;

    assert_abs_diff_eq!(&v * &d * v.transpose(), a.clone(), epsilon = tolerance * scale);
    assert_abs_diff_eq!(v.transpose() * &v, DMatrix::identity(n, n), epsilon = tolerance);
    for i in 0..n {
        let vector = eig.eigenvector(i)?;
        assert_abs_diff_eq!(
            a * vector,
            vector * eig.eigenvalue(i)?,
            epsilon = tolerance * scale
        );
    }
    Ok(())
}

#[test]
fn random_matrices_in_every_mode() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for n in 1..=50 {
        let a = random_symmetric(&mut rng, n);
        let expected = sorted(a.clone().symmetric_eigenvalues().as_slice());

        for config in vector_modes() {
            let mut eig = SymmetricQrEigen::new(config)?;
            assert!(eig.decompose(&a)?, "n = {}, {:?}", n, config);
            assert_eq!(eig.number_of_eigenvalues(), n);
            assert_decomposes(&eig, &a, 1e-10, 1.0)?;

            for (x, y) in sorted(eig.eigenvalues()?).iter().zip(&expected) {
                assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
            }
        }

        let mut eig = SymmetricQrEigen::new(EigenConfig::values_only())?;
        assert!(eig.decompose(&a)?);
        for (x, y) in sorted(eig.eigenvalues()?).iter().zip(&expected) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-10);
        }
    }
    Ok(())
}

#[test]
fn diagonal_input_keeps_its_entries() -> anyhow::Result<()> {
    let a = DMatrix::from_diagonal(&nalgebra::dvector![3.0, -1.0, 7.5, 0.0, 2.0]);
    for config in vector_modes() {
        let mut eig = SymmetricQrEigen::new(config)?;
        assert!(eig.decompose(&a)?);
        assert_eq!(sorted(eig.eigenvalues()?), vec![-1.0, 0.0, 2.0, 3.0, 7.5]);
        assert_decomposes(&eig, &a, 1e-14, 1.0)?;
    }
    Ok(())
}

#[test]
fn block_diagonal_input() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let upper = random_symmetric(&mut rng, 4);
    let lower = random_symmetric(&mut rng, 5);

    let mut a = DMatrix::zeros(9, 9);
    a.slice_mut((0, 0), (4, 4)).copy_from(&upper);
    a.slice_mut((4, 4), (5, 5)).copy_from(&lower);

    let mut expected = upper.symmetric_eigenvalues().as_slice().to_vec();
    expected.extend_from_slice(lower.symmetric_eigenvalues().as_slice());
    let expected = sorted(&expected);

    for config in vector_modes() {
        let mut eig = SymmetricQrEigen::new(config)?;
        assert!(eig.decompose(&a)?);
        for (x, y) in sorted(eig.eigenvalues()?).iter().zip(&expected) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
        assert_decomposes(&eig, &a, 1e-12, 1.0)?;
    }
    Ok(())
}

#[test]
fn repeated_eigenvalues() -> anyhow::Result<()> {
    // 2I plus a rank one update: eigenvalue 2 with multiplicity 5 and 2 + 6
    let n = 6;
    let a = DMatrix::from_fn(n, n, |i, j| if i == j { 3.0 } else { 1.0 });
    for config in vector_modes() {
        let mut eig = SymmetricQrEigen::new(config)?;
        assert!(eig.decompose(&a)?);
        let values = sorted(eig.eigenvalues()?);
        for x in &values[..5] {
            assert_abs_diff_eq!(*x, 2.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(values[5], 8.0, epsilon = 1e-12);
        assert_decomposes(&eig, &a, 1e-12, 1.0)?;
    }
    Ok(())
}

#[test]
fn extreme_scales() -> anyhow::Result<()> {
    let base = dmatrix![
        4.0, 1.0, 0.5;
        1.0, -3.0, 2.0;
        0.5, 2.0, 1.0;
    ];
    let mut reference = SymmetricQrEigen::new(EigenConfig::values_only())?;
    assert!(reference.decompose(&base)?);
    let expected = sorted(reference.eigenvalues()?);

    for scale in [1e-200, 1e200] {
        let a = &base * scale;
        for config in vector_modes() {
            let mut eig = SymmetricQrEigen::new(config)?;
            assert!(eig.decompose(&a)?);
            for (x, y) in sorted(eig.eigenvalues()?).iter().zip(&expected) {
                assert_abs_diff_eq!(*x / scale, *y, epsilon = 1e-12);
            }
            assert_decomposes(&eig, &a, 1e-12, scale)?;
        }
    }
    Ok(())
}

#[test]
fn tridiagonal_factors_rebuild_input() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let a = random_symmetric(&mut rng, 12);

    let mut eig = SymmetricQrEigen::new(EigenConfig::default())?;
    assert!(eig.decompose(&a)?);

    let tridiagonal = eig.tridiagonal();
    let t = tridiagonal.t(None)?;
    let q = tridiagonal.q(None, false)?;
    assert_abs_diff_eq!(&q * &t * q.transpose(), a, epsilon = 1e-12);

    // extraction does not disturb the stored reduction
    assert_eq!(tridiagonal.t(None)?, t);
    assert_eq!(tridiagonal.q(Some(q.clone()), false)?, q);
    Ok(())
}

#[test]
fn rayleigh_quotients_match_eigenvalues() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_symmetric(&mut rng, 8);

    let mut eig = SymmetricQrEigen::new(EigenConfig::default())?;
    assert!(eig.decompose(&a)?);
    for i in 0..8 {
        let quotient = rayleigh_quotient(&a, eig.eigenvector(i)?)?;
        assert_abs_diff_eq!(quotient, eig.eigenvalue(i)?, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn usable_through_the_trait() -> anyhow::Result<()> {
    fn largest(eig: &mut dyn EigenDecomposition, a: &DMatrix<f64>) -> anyhow::Result<f64> {
        anyhow::ensure!(eig.decompose(a)?, "no convergence");
        let mut max = f64::MIN;
        for i in 0..eig.number_of_eigenvalues() {
            max = max.max(eig.eigenvalue(i)?);
        }
        Ok(max)
    }

    let a = dmatrix![
        2.0, -1.0, 0.0;
        -1.0, 2.0, -1.0;
        0.0, -1.0, 2.0;
    ];
    let mut eig = SymmetricQrEigen::new(EigenConfig::values_only())?;
    assert_abs_diff_eq!(largest(&mut eig, &a)?, 2.0 + 2.0_f64.sqrt(), epsilon = 1e-12);
    Ok(())
}

#[test]
fn asymmetric_input_is_rejected() -> anyhow::Result<()> {
    let mut eig = SymmetricQrEigen::new(EigenConfig::default())?;
    let a = dmatrix![
        1.0, 2.0, 0.0;
        0.0, 1.0, 2.0;
        0.0, 0.0, 1.0;
    ];
    let err = eig.decompose_checked(&a).unwrap_err();
    assert!(matches!(err, EigenError::NotSymmetric { .. }));
    assert_eq!(eig.eigenvalue(0), Err(EigenError::NotDecomposed));
    Ok(())
}
