//! Padé radial function `(α r / (1 + α r))²`.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{direction_sq, map_param, ParamGradient, ParamName, RadialFunction};
use crate::error::QmcError;

/// Padé form `a_k(r) = (α_k r / (1 + α_k r))²`.
///
/// Usually instantiated as a family with `α_k = α / 2^k`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PadeFunction {
    pub alphak: f64,
}

impl PadeFunction {
    pub fn new(alphak: f64) -> Self {
        Self { alphak }
    }

    /// `temp (1 - 3a/(1+a) (x_i/r)²)`, which tends to `2α²` at the origin.
    #[inline]
    fn lap_from(&self, rvec: &Vector3<f64>, r: f64, temp: f64) -> Vector3<f64> {
        let a = self.alphak * r;
        let shape = 3.0 * a / (1.0 + a);
        rvec.map(|x| temp * (1.0 - shape * direction_sq(x, r)))
    }
}

impl RadialFunction for PadeFunction {
    fn parameter_names(&self) -> &'static [ParamName] {
        &[ParamName::AlphaK]
    }

    fn parameter(&self, name: ParamName) -> Option<f64> {
        match name {
            ParamName::AlphaK => Some(self.alphak),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: ParamName, value: f64) -> Result<(), QmcError> {
        match name {
            ParamName::AlphaK => self.alphak = value,
            other => return Err(QmcError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }

    fn value_at(&self, _rvec: &Vector3<f64>, r: f64) -> f64 {
        let a = self.alphak * r;
        (a / (1.0 + a)).powi(2)
    }

    fn gradient_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        let a = self.alphak * r;
        rvec * (2.0 * self.alphak.powi(2) / (1.0 + a).powi(3))
    }

    fn laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        let a = self.alphak * r;
        let temp = 2.0 * self.alphak.powi(2) / (1.0 + a).powi(3);
        self.lap_from(rvec, r, temp)
    }

    fn gradient_value_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, f64) {
        let a = self.alphak * r;
        let value = (a / (1.0 + a)).powi(2);
        let grad = rvec * (2.0 * self.alphak.powi(2) / (1.0 + a).powi(3));
        (grad, value)
    }

    fn gradient_laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, Vector3<f64>) {
        let a = self.alphak * r;
        let temp = 2.0 * self.alphak.powi(2) / (1.0 + a).powi(3);
        (rvec * temp, self.lap_from(rvec, r, temp))
    }

    fn pgradient(&self, rvec: &[Vector3<f64>], r: &[f64]) -> ParamGradient {
        let alphak = self.alphak;
        let dalpha = map_param(rvec, r, |_, r| {
            let a = alphak * r;
            2.0 * a / (1.0 + a).powi(3) * r
        });
        ParamGradient::from([(ParamName::AlphaK, dalpha)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pade_evaluate() {
        let f = PadeFunction::new(0.2);
        let x = Vector3::new(0.0, 5.0, 0.0);
        // a = 1, (1/2)^2
        assert_relative_eq!(f.value_at(&x, 5.0), 0.25, epsilon = 1e-14);
    }

    #[test]
    fn test_pade_laplacian_sums_to_scalar_formula() {
        // ∇²f = 6α² / (1 + αr)^4
        let f = PadeFunction::new(0.2);
        let x = Vector3::new(1.1, -0.3, 0.8);
        let r = x.norm();
        let a: f64 = 0.2 * r;
        let expected = 6.0 * 0.2f64.powi(2) / (1.0 + a).powi(4);
        assert_relative_eq!(f.laplacian_at(&x, r).sum(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_pade_is_finite_for_coincident_particles() {
        let f = PadeFunction::new(0.3);
        let origin = Vector3::zeros();
        let (grad, lap) = f.gradient_laplacian_at(&origin, 0.0);
        assert_eq!(f.value_at(&origin, 0.0), 0.0);
        assert_eq!(grad, Vector3::zeros());
        for i in 0..3 {
            assert_relative_eq!(lap[i], 2.0 * 0.09, epsilon = 1e-14);
        }
        assert_eq!(f.laplacian_at(&origin, 0.0), lap);

        // continuous with a nearby point
        let x = Vector3::new(1e-6, 0.0, 0.0);
        let near = f.laplacian_at(&x, 1e-6);
        for i in 0..3 {
            assert_relative_eq!(near[i], lap[i], epsilon = 1e-5);
        }
    }
}
