use nalgebra::Vector3;
use rand::Rng;
use std::f64::consts::{PI, TAU};

/// Three-component real vector used for spins, fluxes, fields and coefficients.
pub type Vector = Vector3<f64>;

pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);
pub const I: Vector = Vector::new(1.0, 0.0, 0.0);
pub const J: Vector = Vector::new(0.0, 1.0, 0.0);
pub const K: Vector = Vector::new(0.0, 0.0, 1.0);

/// Builds a vector from cylindrical coordinates.
///
/// # Arguments
///
/// * `r` - Distance from the z-axis.
/// * `theta` - Azimuth in radians, measured from the positive x-axis towards the positive y-axis.
/// * `z` - Height along the z-axis.
pub fn cylindrical_form(r: f64, theta: f64, z: f64) -> Vector {
    Vector::new(r * theta.cos(), r * theta.sin(), z)
}

pub fn polar_form(r: f64, theta: f64) -> Vector {
    cylindrical_form(r, theta, 0.0)
}

/// Builds a vector from spherical coordinates.
///
/// # Arguments
///
/// * `rho` - Magnitude of the vector.
/// * `theta` - Azimuth in radians of the projection onto the xy-plane.
/// * `phi` - Elevation in radians above the xy-plane, in `[-PI/2, PI/2]`.
pub fn spherical_form(rho: f64, theta: f64, phi: f64) -> Vector {
    cylindrical_form(rho * phi.cos(), theta, rho * phi.sin())
}

/// Azimuth of the vector's projection onto the xy-plane.
pub fn theta(v: &Vector) -> f64 {
    v.y.atan2(v.x)
}

/// Elevation of the vector above the xy-plane. The zero vector has elevation 0.
pub fn phi(v: &Vector) -> f64 {
    let r = v.x.hypot(v.y);
    if r == 0.0 {
        if v.z > 0.0 {
            PI / 2.0
        } else if v.z < 0.0 {
            -PI / 2.0
        } else {
            0.0
        }
    } else {
        v.z.atan2(r)
    }
}

/// Rotates `v` in place by `theta` in the xy-plane and `phi` towards the z-axis,
/// preserving its magnitude.
pub fn rotate(v: &mut Vector, theta_delta: f64, phi_delta: f64) {
    *v = spherical_form(v.norm(), theta(v) + theta_delta, phi(v) + phi_delta);
}

/// Component-wise squares, used by the anisotropy term.
pub fn squared(v: &Vector) -> Vector {
    v.component_mul(v)
}

/// Rescales `v` to magnitude `magnitude`. A zero vector points along +y afterwards.
pub fn with_magnitude(v: &Vector, magnitude: f64) -> Vector {
    let norm = v.norm();
    if norm == 0.0 {
        J * magnitude
    } else {
        v * (magnitude / norm)
    }
}

/// Draws a vector of magnitude `rho` uniformly distributed over the sphere.
pub fn random_on_sphere<R: Rng + ?Sized>(rng: &mut R, rho: f64) -> Vector {
    let theta = TAU * rng.gen_range(0.0..1.0);
    let phi = (2.0 * rng.gen_range(0.0..1.0) - 1.0_f64).asin();
    spherical_form(rho, theta, phi)
}
