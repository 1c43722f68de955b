//! Plane-wave phase factor, the simplest complex-valued component.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::traits::{
    masked_indices, Configs, Dtype, LogAmplitude, PGradient, ParamValues, Scalar, WaveFunction,
};
use crate::error::QmcError;

/// ψ(R) = exp(i k·Σ_e r_e)
///
/// Unit modulus everywhere, so `ln|ψ| = 0` and all the information sits in
/// the phase. Has no variational parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PlaneWavePhase {
    pub k: Vector3<f64>,
    #[serde(skip)]
    configs: Configs,
    /// k·Σ r_e per configuration (cached)
    #[serde(skip)]
    phase: Vec<f64>,
}

impl PlaneWavePhase {
    pub fn new(k: Vector3<f64>) -> Self {
        Self {
            k,
            configs: Configs::default(),
            phase: Vec::new(),
        }
    }

    /// Evaluate plane wave factor for a phase: exp(iθ)
    #[inline]
    fn plane_wave(phase: f64) -> Scalar {
        Scalar::new(phase.cos(), phase.sin())
    }

    fn ratio(&self, e: usize, c: usize, r: &Vector3<f64>) -> Scalar {
        let old = self.configs.electrons[c][e];
        Self::plane_wave(self.k.dot(&(r - old)))
    }

    /// ∇ ln ψ = i k, independent of position.
    fn log_gradient(&self) -> Vector3<Scalar> {
        self.k.map(|k| Scalar::new(0.0, k))
    }
}

impl WaveFunction for PlaneWavePhase {
    fn dtype(&self) -> Dtype {
        Dtype::Complex
    }

    fn nconf(&self) -> usize {
        self.configs.nconf()
    }

    fn recompute(&mut self, configs: &Configs) -> LogAmplitude {
        self.phase = configs
            .electrons
            .iter()
            .map(|conf| conf.iter().map(|r| self.k.dot(r)).sum::<f64>())
            .collect();
        self.configs = configs.clone();
        self.value()
    }

    fn value(&self) -> LogAmplitude {
        LogAmplitude {
            sign: self.phase.iter().map(|&p| Self::plane_wave(p)).collect(),
            logabs: vec![0.0; self.phase.len()],
        }
    }

    fn updateinternals(&mut self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) {
        for c in masked_indices(mask) {
            self.phase[c] += self.k.dot(&(epos[c] - self.configs.electrons[c][e]));
        }
        self.configs.apply_move(e, epos, mask);
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
        vec![self.log_gradient(); epos.len()]
    }

    fn gradient_value(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        let ratio = epos
            .iter()
            .enumerate()
            .map(|(c, r)| self.ratio(e, c, r))
            .collect();
        (self.gradient(e, epos), ratio)
    }

    fn gradient_laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        (self.gradient(e, epos), self.laplacian(e, epos))
    }

    fn laplacian(&self, _e: usize, epos: &[Vector3<f64>]) -> Vec<Scalar> {
        // (ik)·(ik)
        vec![Scalar::new(-self.k.norm_squared(), 0.0); epos.len()]
    }

    fn pgradient(&self) -> PGradient {
        PGradient::new()
    }

    fn parameters(&self) -> ParamValues {
        ParamValues::new()
    }

    fn set_parameter(&mut self, name: &str, _value: f64) -> Result<(), QmcError> {
        Err(QmcError::UnknownParameter(name.to_string()))
    }
}
