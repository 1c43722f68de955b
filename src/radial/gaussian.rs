//! Gaussian radial function `exp(-α r²)`.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{map_param, ParamGradient, ParamName, RadialFunction};
use crate::error::QmcError;

/// Gaussian `exp(-α r²)` with `α` stored as `exponent`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GaussianFunction {
    pub exponent: f64,
}

impl GaussianFunction {
    pub fn new(exponent: f64) -> Self {
        Self { exponent }
    }
}

impl RadialFunction for GaussianFunction {
    fn parameter_names(&self) -> &'static [ParamName] {
        &[ParamName::Exponent]
    }

    fn parameter(&self, name: ParamName) -> Option<f64> {
        match name {
            ParamName::Exponent => Some(self.exponent),
            _ => None,
        }
    }

    fn set_parameter(&mut self, name: ParamName, value: f64) -> Result<(), QmcError> {
        match name {
            ParamName::Exponent => self.exponent = value,
            other => return Err(QmcError::UnknownParameter(other.to_string())),
        }
        Ok(())
    }

    fn value_at(&self, _rvec: &Vector3<f64>, r: f64) -> f64 {
        (-self.exponent * r * r).exp()
    }

    fn gradient_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        let v = self.value_at(rvec, r);
        rvec * (-2.0 * self.exponent * v)
    }

    fn laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        let v = self.value_at(rvec, r);
        let alpha = self.exponent;
        rvec.map(|x| (4.0 * alpha * alpha * x * x - 2.0 * alpha) * v)
    }

    fn gradient_value_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, f64) {
        let v = self.value_at(rvec, r);
        (rvec * (-2.0 * self.exponent * v), v)
    }

    fn gradient_laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, Vector3<f64>) {
        let v = self.value_at(rvec, r);
        let alpha = self.exponent;
        let grad = rvec * (-2.0 * alpha * v);
        let lap = rvec.map(|x| (4.0 * alpha * alpha * x * x - 2.0 * alpha) * v);
        (grad, lap)
    }

    fn pgradient(&self, rvec: &[Vector3<f64>], r: &[f64]) -> ParamGradient {
        let alpha = self.exponent;
        let dexp = map_param(rvec, r, |_, r| {
            let r2 = r * r;
            -r2 * (-alpha * r2).exp()
        });
        ParamGradient::from([(ParamName::Exponent, dexp)])
    }
}
