//! Polynomial Padé radial function with compact support.

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{direction_sq, ParamGradient, ParamName, RadialFunction};
use crate::error::QmcError;

/// `b(r) = (1 - p(z)) / (1 + β p(z))` with `z = r / rcut` and
/// `p(z) = 6z² - 8z³ + 3z⁴`.
///
/// Positive at small `r`, decreasing to zero with zero slope at `r = rcut`,
/// identically zero beyond. Nothing is evaluated for `r >= rcut`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PolyPadeFunction {
    pub beta: f64,
    pub rcut: f64,
}

/// Chain-rule pieces shared by the kernels.
struct Terms {
    z: f64,
    p: f64,
    /// (dp/dz) / z = 12 (1 - z)², finite at the origin
    g: f64,
    /// db/dp
    dbdp: f64,
}

impl PolyPadeFunction {
    pub fn new(beta: f64, rcut: f64) -> Self {
        Self { beta, rcut }
    }

    #[inline]
    fn inside(&self, r: f64) -> bool {
        r < self.rcut
    }

    #[inline]
    fn terms(&self, r: f64) -> Terms {
        let z = r / self.rcut;
        let p = z * z * (6.0 - 8.0 * z + 3.0 * z * z);
        let g = 12.0 * (1.0 - z).powi(2);
        let dbdp = -(1.0 + self.beta) / (1.0 + self.beta * p).powi(2);
        Terms { z, p, g, dbdp }
    }

    /// `∂b/∂x_i = b' g x_i / rcut²`
    #[inline]
    fn grad_from(&self, t: &Terms, rvec: &Vector3<f64>) -> Vector3<f64> {
        rvec * (t.dbdp * t.g / (self.rcut * self.rcut))
    }

    /// `∂²b/∂x_i² = b'' (∂p/∂x_i)² + b' ∂²p/∂x_i²` with
    /// `∂²p/∂x_i² = (g - 24 z (1 - z) (x_i/r)²) / rcut²`.
    #[inline]
    fn lap_from(&self, t: &Terms, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        let beta = self.beta;
        let rcut2 = self.rcut * self.rcut;
        let d2bdp2 = 2.0 * beta * (1.0 + beta) / (1.0 + beta * t.p).powi(3);
        let curv = 24.0 * t.z * (1.0 - t.z);
        rvec.map(|x| {
            let dpdx = t.g * x / rcut2;
            let d2pdx2 = (t.g - curv * direction_sq(x, r)) / rcut2;
            d2bdp2 * dpdx * dpdx + t.dbdp * d2pdx2
        })
    }
}

impl RadialFunction for PolyPadeFunction {
    fn parameter_names(&self) -> &'static [ParamName] {
        &[ParamName::Beta, ParamName::Rcut]
    }

    fn parameter(&self, name: ParamName) -> Option<f64> {
        match name {
            ParamName::Beta => Some(self.beta),
            ParamName::Rcut => Some(self.rcut),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: ParamName, value: f64) -> Result<(), QmcError> {
        match name {
            ParamName::Beta => self.beta = value,
            ParamName::Rcut => self.rcut = value,
            other => return Err(QmcError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }

    fn value_at(&self, _rvec: &Vector3<f64>, r: f64) -> f64 {
        if !self.inside(r) {
            return 0.0;
        }
        let t = self.terms(r);
        (1.0 - t.p) / (1.0 + self.beta * t.p)
    }

    fn gradient_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        if !self.inside(r) {
            return Vector3::zeros();
        }
        let t = self.terms(r);
        self.grad_from(&t, rvec)
    }

    fn laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        if !self.inside(r) {
            return Vector3::zeros();
        }
        let t = self.terms(r);
        self.lap_from(&t, rvec, r)
    }

    fn gradient_value_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, f64) {
        if !self.inside(r) {
            return (Vector3::zeros(), 0.0);
        }
        let t = self.terms(r);
        let value = (1.0 - t.p) / (1.0 + self.beta * t.p);
        (self.grad_from(&t, rvec), value)
    }

    fn gradient_laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, Vector3<f64>) {
        if !self.inside(r) {
            return (Vector3::zeros(), Vector3::zeros());
        }
        let t = self.terms(r);
        (self.grad_from(&t, rvec), self.lap_from(&t, rvec, r))
    }

    fn pgradient(&self, _rvec: &[Vector3<f64>], r: &[f64]) -> ParamGradient {
        let beta = self.beta;
        let rcut = self.rcut;
        let (dbeta, drcut): (Vec<f64>, Vec<f64>) = r
            .par_iter()
            .map(|&r| {
                if !self.inside(r) {
                    return (0.0, 0.0);
                }
                let t = self.terms(r);
                let dbeta = -t.p * (1.0 - t.p) / (1.0 + beta * t.p).powi(2);
                let drcut = -t.dbdp * t.g * t.z * t.z / rcut;
                (dbeta, drcut)
            })
            .unzip();
        ParamGradient::from([(ParamName::Beta, dbeta), (ParamName::Rcut, drcut)])
    }
}
