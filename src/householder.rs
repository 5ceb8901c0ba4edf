//! Householder reflector helpers shared by the tridiagonal reduction and the
//! reconstruction of its orthogonal factor.
//!
//! A reflector is stored as a vector `u` and a scalar `gamma`, representing
//! `I - gamma * u * u^T`. Only the part of `u` inside the affected range is read.

use std::ops::Range;

use nalgebra::DMatrix;

/// Largest absolute value in `u`, zero for an empty slice.
pub fn find_max(u: &[f64]) -> f64 {
    u.iter().fold(0.0, |max, x| max.max(x.abs()))
}

pub fn divide_elements(u: &mut [f64], divisor: f64) {
    for x in u.iter_mut() {
        *x /= divisor;
    }
}

/// Divides `u` by `max` in place and returns its 2-norm, signed like `u[0]`.
///
/// Every element is divided before it is squared so that very large or very
/// small columns neither overflow nor underflow.
pub fn compute_tau_and_divide(u: &mut [f64], max: f64) -> f64 {
    let mut tau = 0.0;
    for x in u.iter_mut() {
        *x /= max;
        tau += *x * *x;
    }
    tau = tau.sqrt();

    if u.first().map_or(false, |&lead| lead < 0.0) {
        tau = -tau;
    }
    tau
}

/// `A = (I - gamma*u*u^T) * A`, restricted to `rows x cols`.
///
/// `u` is indexed by row. `temp` needs room for `cols.end` values.
pub fn apply_reflector_left(
    a: &mut DMatrix<f64>,
    u: &[f64],
    gamma: f64,
    rows: Range<usize>,
    cols: Range<usize>,
    temp: &mut [f64],
) {
    assert!(rows.end <= a.nrows() && cols.end <= a.ncols());
    assert!(u.len() >= rows.end && temp.len() >= cols.end);

    for j in cols.clone() {
        let column = a.column(j);
        let mut total = 0.0;
        for i in rows.clone() {
            total += u[i] * column[i];
        }
        temp[j] = gamma * total;
    }

    for j in cols {
        let t = temp[j];
        let mut column = a.column_mut(j);
        for i in rows.clone() {
            column[i] -= u[i] * t;
        }
    }
}

/// `A = A * (I - gamma*u*u^T)`, restricted to `rows x cols`.
///
/// `u` is indexed by column. `temp` needs room for `rows.end` values.
pub fn apply_reflector_right(
    a: &mut DMatrix<f64>,
    u: &[f64],
    gamma: f64,
    rows: Range<usize>,
    cols: Range<usize>,
    temp: &mut [f64],
) {
    assert!(rows.end <= a.nrows() && cols.end <= a.ncols());
    assert!(u.len() >= cols.end && temp.len() >= rows.end);

    for i in rows.clone() {
        temp[i] = 0.0;
    }
    for j in cols.clone() {
        let uj = u[j];
        let column = a.column(j);
        for i in rows.clone() {
            temp[i] += column[i] * uj;
        }
    }

    for j in cols {
        let uj = gamma * u[j];
        let mut column = a.column_mut(j);
        for i in rows.clone() {
            column[i] -= temp[i] * uj;
        }
    }
}
