//! Slater 1s orbitals and a product wavefunction built from them.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::traits::{
    complexify, masked_indices, Configs, Dtype, LogAmplitude, PGradient, ParamValues, Scalar,
    WaveFunction,
};
use crate::error::QmcError;

/// Slater 1s orbital centered at position `center` with exponent `alpha`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Slater1s {
    /// Orbital exponent
    pub alpha: f64,
    /// Center position of the orbital
    pub center: Vector3<f64>,
}

impl Slater1s {
    pub fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        let dr = r - self.center;
        (-self.alpha * dr.norm()).exp()
    }

    pub fn derivative(&self, r: &Vector3<f64>) -> Vector3<f64> {
        let dr = r - self.center;
        let r_norm = dr.norm();
        if r_norm == 0.0 {
            return Vector3::zeros();
        }
        let scalar = -self.alpha / r_norm * (-self.alpha * r_norm).exp();
        dr * scalar
    }

    pub fn laplacian(&self, r: &Vector3<f64>) -> f64 {
        let dr = r - self.center;
        let r_norm = dr.norm();
        if r_norm == 0.0 {
            return f64::NEG_INFINITY;
        }
        let exp_part = (-self.alpha * r_norm).exp();
        (self.alpha.powi(2) - 2.0 * self.alpha / r_norm) * exp_part
    }

    /// ∂φ/∂α
    pub fn alpha_derivative(&self, r: &Vector3<f64>) -> f64 {
        let r_norm = (r - self.center).norm();
        -r_norm * (-self.alpha * r_norm).exp()
    }
}

/// Orbital value, gradient, Laplacian and α-derivative at one point.
struct OrbitalEval {
    value: f64,
    grad: Vector3<f64>,
    lap: f64,
    dalpha: f64,
}

/// Hartree product `ψ(R) = Π_e φ(r_e)` of a single LCAO orbital
/// `φ(r) = Σ_c w_c exp(-α |r - R_c|)`.
///
/// Weights of opposite sign give an orbital with a nodal surface, so the
/// sign of ψ changes between configurations.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrbitalProduct {
    /// Shared orbital exponent
    pub alpha: f64,
    /// Nuclear centers
    pub centers: Vec<Vector3<f64>>,
    /// LCAO weights, one per center
    pub weights: Vec<f64>,
    #[serde(skip)]
    configs: Configs,
    /// φ(r_e) per configuration and electron (cached)
    #[serde(skip)]
    orbitals: Vec<Vec<f64>>,
}

impl OrbitalProduct {
    pub fn new(alpha: f64, centers: Vec<Vector3<f64>>, weights: Vec<f64>) -> Result<Self, QmcError> {
        QmcError::check_lengths("orbital centers vs weights", centers.len(), weights.len())?;
        Ok(Self {
            alpha,
            centers,
            weights,
            configs: Configs::default(),
            orbitals: Vec::new(),
        })
    }

    fn slater(&self, center: &Vector3<f64>) -> Slater1s {
        Slater1s { alpha: self.alpha, center: *center }
    }

    fn orbital_value(&self, r: &Vector3<f64>) -> f64 {
        self.centers
            .iter()
            .zip(&self.weights)
            .map(|(c, w)| w * self.slater(c).evaluate(r))
            .sum()
    }

    fn orbital(&self, r: &Vector3<f64>) -> OrbitalEval {
        let mut out = OrbitalEval {
            value: 0.0,
            grad: Vector3::zeros(),
            lap: 0.0,
            dalpha: 0.0,
        };
        for (c, w) in self.centers.iter().zip(&self.weights) {
            let s = self.slater(c);
            out.value += w * s.evaluate(r);
            out.grad += s.derivative(r) * *w;
            out.lap += w * s.laplacian(r);
            out.dalpha += w * s.alpha_derivative(r);
        }
        out
    }

    fn ratio(&self, e: usize, c: usize, r: &Vector3<f64>) -> Scalar {
        Scalar::new(self.orbital_value(r) / self.orbitals[c][e], 0.0)
    }
}

impl WaveFunction for OrbitalProduct {
    fn dtype(&self) -> Dtype {
        Dtype::Real
    }

    fn nconf(&self) -> usize {
        self.configs.nconf()
    }

    fn recompute(&mut self, configs: &Configs) -> LogAmplitude {
        self.orbitals = configs
            .electrons
            .iter()
            .map(|conf| conf.iter().map(|r| self.orbital_value(r)).collect())
            .collect();
        self.configs = configs.clone();
        self.value()
    }

    fn value(&self) -> LogAmplitude {
        let sign = self
            .orbitals
            .iter()
            .map(|phi| Scalar::new(phi.iter().map(|p| p.signum()).product::<f64>(), 0.0))
            .collect();
        let logabs = self
            .orbitals
            .iter()
            .map(|phi| phi.iter().map(|p| p.abs().ln()).sum::<f64>())
            .collect();
        LogAmplitude { sign, logabs }
    }

    fn updateinternals(&mut self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) {
        for c in masked_indices(mask) {
            self.orbitals[c][e] = self.orbital_value(&epos[c]);
        }
        self.configs.apply_move(e, epos, mask);
        trace!(electron = e, "orbital product updateinternals");
    }

    fn testvalue(&self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) -> Vec<Scalar> {
        masked_indices(mask)
            .into_iter()
            .map(|c| self.ratio(e, c, &epos[c]))
            .collect()
    }

    fn testvalue_many(&self, e: usize, epos: &[Vec<Vector3<f64>>], mask: &[bool]) -> Vec<Vec<Scalar>> {
        masked_indices(mask)
            .into_iter()
            .map(|c| epos[c].iter().map(|r| self.ratio(e, c, r)).collect())
            .collect()
    }

    fn gradient(&self, _e: usize, epos: &[Vector3<f64>]) -> Vec<Vector3<Scalar>> {
        epos.iter()
            .map(|r| {
                let phi = self.orbital(r);
                complexify(&(phi.grad / phi.value))
            })
            .collect()
    }

    fn gradient_value(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        epos.iter()
            .enumerate()
            .map(|(c, r)| {
                let phi = self.orbital(r);
                let ratio = Scalar::new(phi.value / self.orbitals[c][e], 0.0);
                (complexify(&(phi.grad / phi.value)), ratio)
            })
            .unzip()
    }

    fn gradient_laplacian(&self, _e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        epos.iter()
            .map(|r| {
                let phi = self.orbital(r);
                (
                    complexify(&(phi.grad / phi.value)),
                    Scalar::new(phi.lap / phi.value, 0.0),
                )
            })
            .unzip()
    }

    fn laplacian(&self, _e: usize, epos: &[Vector3<f64>]) -> Vec<Scalar> {
        epos.iter()
            .map(|r| {
                let phi = self.orbital(r);
                Scalar::new(phi.lap / phi.value, 0.0)
            })
            .collect()
    }

    fn pgradient(&self) -> PGradient {
        let dalpha = self
            .configs
            .electrons
            .iter()
            .map(|conf| {
                let d: f64 = conf
                    .iter()
                    .map(|r| {
                        let phi = self.orbital(r);
                        phi.dalpha / phi.value
                    })
                    .sum();
                Scalar::new(d, 0.0)
            })
            .collect();
        PGradient::from([("alpha".to_string(), dalpha)])
    }

    fn parameters(&self) -> ParamValues {
        ParamValues::from([("alpha".to_string(), self.alpha)])
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), QmcError> {
        match name {
            "alpha" => {
                self.alpha = value;
                Ok(())
            }
            _ => Err(QmcError::UnknownParameter(name.to_string())),
        }
    }
}
