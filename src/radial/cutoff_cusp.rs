//! Cusp-carrying radial function with compact support.

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ParamGradient, ParamName, RadialFunction};
use crate::error::QmcError;

/// `b(r) = rcut · [-p(y) / (1 + γ p(y)) + 1 / (3 + γ)]` with `y = r / rcut`
/// and `p(y) = y - y² + y³/3`.
///
/// The slope at the origin is `-1`, which is what produces the cusp in a
/// Jastrow factor. The function and its slope reach zero at `r = rcut`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CutoffCuspFunction {
    pub gamma: f64,
    pub rcut: f64,
}

struct Terms {
    y: f64,
    /// p'(y) = (1 - y)²
    a: f64,
    /// p(y)
    b: f64,
    /// 1 / ((1 + γ p)² rcut r)
    c: f64,
}

impl CutoffCuspFunction {
    pub fn new(gamma: f64, rcut: f64) -> Self {
        Self { gamma, rcut }
    }

    #[inline]
    fn inside(&self, r: f64) -> bool {
        r < self.rcut
    }

    #[inline]
    fn terms(&self, r: f64) -> Terms {
        let y = r / self.rcut;
        let a = 1.0 - 2.0 * y + y * y;
        let b = y - y * y + y * y * y / 3.0;
        let c = 1.0 / (1.0 + self.gamma * b).powi(2) / (self.rcut * r);
        Terms { y, a, b, c }
    }

    /// Value without the overall `rcut` factor.
    #[inline]
    fn reduced_value(&self, t: &Terms) -> f64 {
        -t.b / (1.0 + self.gamma * t.b) + 1.0 / (3.0 + self.gamma)
    }

    #[inline]
    fn grad_from(&self, t: &Terms, rvec: &Vector3<f64>) -> Vector3<f64> {
        rvec * (-self.rcut * t.a * t.c)
    }

    #[inline]
    fn lap_from(&self, t: &Terms, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        let rcut = self.rcut;
        let gamma = self.gamma;
        let temp = 2.0 * (t.y - 1.0) / (rcut * r)
            - t.a / (r * r)
            - 2.0 * t.a * t.a * t.c * gamma * (1.0 + gamma * t.b);
        rvec.map(|x| -rcut * t.c * (t.a + x * x * temp))
    }
}

impl RadialFunction for CutoffCuspFunction {
    fn parameter_names(&self) -> &'static [ParamName] {
        &[ParamName::Gamma, ParamName::Rcut]
    }

    fn parameter(&self, name: ParamName) -> Option<f64> {
        match name {
            ParamName::Gamma => Some(self.gamma),
            ParamName::Rcut => Some(self.rcut),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: ParamName, value: f64) -> Result<(), QmcError> {
        match name {
            ParamName::Gamma => self.gamma = value,
            ParamName::Rcut => self.rcut = value,
            other => return Err(QmcError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }

    fn value_at(&self, _rvec: &Vector3<f64>, r: f64) -> f64 {
        if !self.inside(r) {
            return 0.0;
        }
        let y = r / self.rcut;
        let p = y - y * y + y * y * y / 3.0;
        self.rcut * (-p / (1.0 + self.gamma * p) + 1.0 / (3.0 + self.gamma))
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
        (self.grad_from(&t, rvec), self.rcut * self.reduced_value(&t))
    }

    fn gradient_laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, Vector3<f64>) {
        if !self.inside(r) {
            return (Vector3::zeros(), Vector3::zeros());
        }
        let t = self.terms(r);
        (self.grad_from(&t, rvec), self.lap_from(&t, rvec, r))
    }

    fn pgradient(&self, _rvec: &[Vector3<f64>], r: &[f64]) -> ParamGradient {
        let gamma = self.gamma;
        let rcut = self.rcut;
        let (dgamma, drcut): (Vec<f64>, Vec<f64>) = r
            .par_iter()
            .map(|&r| {
                if !self.inside(r) {
                    return (0.0, 0.0);
                }
                let t = self.terms(r);
                let denom = 1.0 + gamma * t.b;
                let dgamma = ((t.b / denom).powi(2) - 1.0 / (3.0 + gamma).powi(2)) * rcut;
                let drcut = t.y * t.a / denom.powi(2) + self.reduced_value(&t);
                (dgamma, drcut)
            })
            .unzip();
        ParamGradient::from([(ParamName::Gamma, dgamma), (ParamName::Rcut, drcut)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cutoff_cusp_origin_value_and_slope() {
        let f = CutoffCuspFunction::new(2.0, 3.0);
        assert_relative_eq!(f.value_at(&Vector3::zeros(), 0.0), 3.0 / 5.0, epsilon = 1e-14);
        // df/dr -> -1 as r -> 0
        let r = 1e-6;
        let x = Vector3::new(r, 0.0, 0.0);
        assert_relative_eq!(f.gradient_at(&x, r).x, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_cutoff_cusp_outputs_vanish_at_and_beyond_cutoff() {
        let f = CutoffCuspFunction::new(1.0, 2.0);
        let rvec = vec![Vector3::new(2.0, 0.0, 0.0), Vector3::new(1.5, 1.5, 1.5)];
        let r = super::super::norms(&rvec);
        assert!(f.value(&rvec, &r).iter().all(|&v| v == 0.0));
        assert!(f.gradient(&rvec, &r).iter().all(|g| *g == Vector3::zeros()));
        assert!(f.laplacian(&rvec, &r).iter().all(|l| *l == Vector3::zeros()));
        for (_, d) in f.pgradient(&rvec, &r) {
            assert!(d.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_cutoff_cusp_approaches_zero_continuously() {
        let f = CutoffCuspFunction::new(0.5, 1.0);
        let dir = Vector3::new(0.6, 0.0, -0.8);
        for eps in [1e-2, 1e-3, 1e-4] {
            let r = 1.0 - eps;
            let x = dir * r;
            assert!(f.value_at(&x, r).abs() < 10.0 * eps * eps);
            assert!(f.gradient_at(&x, r).norm() < 10.0 * eps * eps);
        }
    }
}
