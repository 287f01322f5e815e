use nalgebra::{Matrix4, Vector4};

use crate::dynamics::params::ModelParams;
use crate::dynamics::state::Control;
use crate::sim::SimError;

// ---------------------------------------------------------------------------
// Luijten two-body lateral model:  M x' = A(u1) x + B delta
// ---------------------------------------------------------------------------

/// Mass matrix of the linear tractor-semitrailer model.
///
/// Depends on the parameters only. Row 3 is the identity row for the
/// articulation angle, which is integrated kinematically.
pub fn mass_matrix(params: &ModelParams) -> Matrix4<f64> {
    let p = &params.truck;
    let (m1, m2, i1, i2) = (p.m1, p.m2, p.i1, p.i2);
    let (h1, a2) = (p.h1, p.a2);

    Matrix4::new(
        m1 + m2,   -m2 * (h1 + a2),            -m2 * a2,              0.0,
        -m2 * h1,  i1 + m2 * h1 * (h1 + a2),   m2 * h1 * a2,          0.0,
        -m2 * a2,  i2 + m2 * a2 * (h1 + a2),   i2 + m2 * a2.powi(2),  0.0,
        0.0,       0.0,                        0.0,                   1.0,
    )
}

/// Distribution of the steer tire angle into the generalized forces.
pub fn input_vector(params: &ModelParams) -> Vector4<f64> {
    let p = &params.truck;
    Vector4::new(p.c1, p.a1 * p.c1, 0.0, 0.0)
}

/// Velocity-dependent stiffness matrix for the current control.
///
/// The whole matrix is scaled by `-1/u1`, so a zero longitudinal velocity
/// has no defined model and is rejected.
pub fn stiffness_matrix(params: &ModelParams, control: &Control) -> Result<Matrix4<f64>, SimError> {
    let u1 = control.velocity;
    if !u1.is_finite() || !control.steer_angle.is_finite() {
        return Err(SimError::NonFiniteControl(*control));
    }
    if u1 == 0.0 {
        return Err(SimError::ZeroVelocity);
    }

    let p = &params.truck;
    let c45 = p.c45();
    let (h1, l2, a2) = (p.h1, p.l2, p.a2);
    let u1_sq = u1 * u1;

    let a11 = p.c1 + p.c2 + p.c3 + p.c4 + p.c5;
    let a12 = params.cs1 - c45 * (h1 + l2) + (p.m1 + p.m2) * u1_sq;
    let a13 = -c45 * l2;
    let a14 = -c45 * u1;

    let a21 = params.cs1 - c45 * h1;
    let a22 = params.cq1 + c45 * (h1 + l2) * h1 - p.m2 * h1 * u1_sq;
    let a23 = c45 * h1 * l2;
    let a24 = c45 * h1 * u1;

    let a31 = -c45 * l2;
    let a32 = c45 * l2 * (h1 + l2) - p.m2 * a2 * u1_sq;
    let a33 = c45 * l2.powi(2);
    let a34 = c45 * l2 * u1;

    let a = Matrix4::new(
        a11, a12, a13, a14,
        a21, a22, a23, a24,
        a31, a32, a33, a34,
        0.0, 0.0, -u1, 0.0,
    );

    Ok(a * (-1.0 / u1))
}
