//! Linear superposition of wavefunction components.
//!
//! `ψ = Σ_i c_i ψ_i` with every component reported in log form. The
//! combination is carried out relative to a per-configuration reference
//! `ref = max_i ln|ψ_i|`, so no raw amplitude is ever exponentiated.
//!
//! Derivatives of the total are weighted by each component's share of the
//! total amplitude, `c_i ψ_i / ψ`, never by the bare coefficients.

use nalgebra::Vector3;
use tracing::{debug, trace};

use super::parameters::{namespaced, split_namespace};
use super::traits::{
    full_mask, masked_indices, Configs, Dtype, LogAmplitude, PGradient, ParamValues, Scalar,
    WaveFunction,
};
use crate::error::QmcError;

pub struct SuperposeWf {
    coeffs: Vec<Scalar>,
    components: Vec<Box<dyn WaveFunction>>,
    /// Fixed at construction
    dtype: Dtype,
}

/// Per-row products `rcc_i · tv_i`, normalized by their column sums, plus
/// the column sums themselves.
fn shares(rcc: Vec<Vec<Scalar>>, tv: &[Vec<Scalar>]) -> (Vec<Vec<Scalar>>, Vec<Scalar>) {
    let weighted: Vec<Vec<Scalar>> = rcc
        .into_iter()
        .zip(tv)
        .map(|(r, t)| r.iter().zip(t).map(|(a, b)| a * b).collect())
        .collect();
    let total = column_sums(&weighted);
    let normalized = weighted
        .into_iter()
        .map(|w| w.iter().zip(&total).map(|(x, t)| x / t).collect())
        .collect();
    (normalized, total)
}

fn column_sums(rows: &[Vec<Scalar>]) -> Vec<Scalar> {
    let n = rows.first().map_or(0, Vec::len);
    (0..n).map(|c| rows.iter().map(|r| r[c]).sum()).collect()
}

fn weighted_gradient(weights: &[Vec<Scalar>], grads: &[Vec<Vector3<Scalar>>]) -> Vec<Vector3<Scalar>> {
    let n = weights.first().map_or(0, Vec::len);
    (0..n)
        .map(|c| {
            weights
                .iter()
                .zip(grads)
                .fold(Vector3::zeros(), |acc, (w, g)| acc + g[c].map(|x| x * w[c]))
        })
        .collect()
}

fn weighted_sum(weights: &[Vec<Scalar>], values: &[Vec<Scalar>]) -> Vec<Scalar> {
    let n = weights.first().map_or(0, Vec::len);
    (0..n)
        .map(|c| weights.iter().zip(values).map(|(w, v)| w[c] * v[c]).sum())
        .collect()
}

impl SuperposeWf {
    pub fn new(coeffs: Vec<Scalar>, components: Vec<Box<dyn WaveFunction>>) -> Result<Self, QmcError> {
        if components.is_empty() {
            return Err(QmcError::EmptySuperposition);
        }
        QmcError::check_lengths("superposition coefficients vs components", coeffs.len(), components.len())?;
        let coeff_dtype = if coeffs.iter().any(|c| c.im != 0.0) {
            Dtype::Complex
        } else {
            Dtype::Real
        };
        let dtype = components
            .iter()
            .fold(coeff_dtype, |acc, wf| acc.promote(wf.dtype()));
        debug!(ncomp = components.len(), ?dtype, "built superposition");
        Ok(Self {
            coeffs,
            components,
            dtype,
        })
    }

    /// Superposition with real coefficients.
    pub fn real(coeffs: Vec<f64>, components: Vec<Box<dyn WaveFunction>>) -> Result<Self, QmcError> {
        Self::new(coeffs.into_iter().map(|c| Scalar::new(c, 0.0)).collect(), components)
    }

    pub fn coefficients(&self) -> &[Scalar] {
        &self.coeffs
    }

    pub fn components(&self) -> &[Box<dyn WaveFunction>] {
        &self.components
    }

    fn component_values(&self) -> Vec<LogAmplitude> {
        self.components.iter().map(|wf| wf.value()).collect()
    }

    /// Combine component amplitudes with the reference moved by `shift`.
    ///
    /// The result does not depend on `shift` beyond rounding. A vanishing
    /// sum yields a NaN sign and `-inf` log-magnitude.
    pub fn combine_shifted(&self, values: &[LogAmplitude], shift: f64) -> LogAmplitude {
        let nconf = values.first().map_or(0, LogAmplitude::len);
        let (sign, logabs) = (0..nconf)
            .map(|c| {
                let reference = values
                    .iter()
                    .map(|v| v.logabs[c])
                    .fold(f64::NEG_INFINITY, f64::max)
                    + shift;
                let s: Scalar = self
                    .coeffs
                    .iter()
                    .zip(values)
                    .map(|(coeff, v)| coeff * v.sign[c] * (v.logabs[c] - reference).exp())
                    .sum();
                let norm = s.norm();
                (s / norm, norm.ln() + reference)
            })
            .unzip();
        LogAmplitude { sign, logabs }
    }

    fn combine(&self, values: &[LogAmplitude]) -> LogAmplitude {
        self.combine_shifted(values, 0.0)
    }

    /// `c_i ψ_i / ψ` at the cached configurations, `[ncomp][nmask]`.
    /// Sums to one over components.
    pub fn ratio_current_config(&self, mask: &[bool]) -> Vec<Vec<Scalar>> {
        let values = self.component_values();
        let total = self.combine(&values);
        let idx = masked_indices(mask);
        self.coeffs
            .iter()
            .zip(&values)
            .map(|(coeff, v)| {
                idx.iter()
                    .map(|&c| coeff * v.sign[c] / total.sign[c] * (v.logabs[c] - total.logabs[c]).exp())
                    .collect()
            })
            .collect()
    }

    /// `c_i ψ_i / ψ` with electron `e` moved to `epos`, `[ncomp][nmask]`.
    pub fn ratio(&self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) -> Vec<Vec<Scalar>> {
        let tv: Vec<Vec<Scalar>> = self
            .components
            .iter()
            .map(|wf| wf.testvalue(e, epos, mask))
            .collect();
        shares(self.ratio_current_config(mask), &tv).0
    }
}

impl WaveFunction for SuperposeWf {
    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn nconf(&self) -> usize {
        self.components.first().map_or(0, |wf| wf.nconf())
    }

    fn recompute(&mut self, configs: &Configs) -> LogAmplitude {
        debug!(
            nconf = configs.nconf(),
            ncomp = self.components.len(),
            "recomputing superposition"
        );
        let values: Vec<LogAmplitude> = self
            .components
            .iter_mut()
            .map(|wf| wf.recompute(configs))
            .collect();
        self.combine(&values)
    }

    fn value(&self) -> LogAmplitude {
        self.combine(&self.component_values())
    }

    fn updateinternals(&mut self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) {
        trace!(electron = e, "superposition updateinternals");
        for wf in self.components.iter_mut() {
            wf.updateinternals(e, epos, mask);
        }
    }

    fn testvalue(&self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) -> Vec<Scalar> {
        let tv: Vec<Vec<Scalar>> = self
            .components
            .iter()
            .map(|wf| wf.testvalue(e, epos, mask))
            .collect();
        weighted_sum(&self.ratio_current_config(mask), &tv)
    }

    fn testvalue_many(&self, e: usize, epos: &[Vec<Vector3<f64>>], mask: &[bool]) -> Vec<Vec<Scalar>> {
        let rcc = self.ratio_current_config(mask);
        let tv: Vec<Vec<Vec<Scalar>>> = self
            .components
            .iter()
            .map(|wf| wf.testvalue_many(e, epos, mask))
            .collect();
        (0..masked_indices(mask).len())
            .map(|m| {
                let npos = tv.first().map_or(0, |t| t[m].len());
                (0..npos)
                    .map(|p| rcc.iter().zip(&tv).map(|(w, t)| w[m] * t[m][p]).sum())
                    .collect()
            })
            .collect()
    }

    fn gradient(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Vector3<Scalar>> {
        let ratio = self.ratio(e, epos, &full_mask(epos.len()));
        let grads: Vec<_> = self.components.iter().map(|wf| wf.gradient(e, epos)).collect();
        weighted_gradient(&ratio, &grads)
    }

    fn gradient_value(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        let (grads, tv): (Vec<_>, Vec<_>) = self
            .components
            .iter()
            .map(|wf| wf.gradient_value(e, epos))
            .unzip();
        let (ratio, value) = shares(self.ratio_current_config(&full_mask(epos.len())), &tv);
        (weighted_gradient(&ratio, &grads), value)
    }

    fn gradient_laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        let ratio = self.ratio(e, epos, &full_mask(epos.len()));
        let (grads, laps): (Vec<_>, Vec<_>) = self
            .components
            .iter()
            .map(|wf| wf.gradient_laplacian(e, epos))
            .unzip();
        (weighted_gradient(&ratio, &grads), weighted_sum(&ratio, &laps))
    }

    fn laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Scalar> {
        let ratio = self.ratio(e, epos, &full_mask(epos.len()));
        let laps: Vec<_> = self.components.iter().map(|wf| wf.laplacian(e, epos)).collect();
        weighted_sum(&ratio, &laps)
    }

    fn pgradient(&self) -> PGradient {
        let rcc = self.ratio_current_config(&full_mask(self.nconf()));
        namespaced(self.components.iter().zip(&rcc).map(|(wf, weight)| {
            wf.pgradient()
                .into_iter()
                .map(|(name, d)| (name, d.iter().zip(weight).map(|(x, w)| x * w).collect()))
                .collect::<PGradient>()
        }))
    }

    fn parameters(&self) -> ParamValues {
        namespaced(self.components.iter().map(|wf| wf.parameters()))
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), QmcError> {
        let (index, rest) = split_namespace(name)?;
        self.components
            .get_mut(index)
            .ok_or_else(|| QmcError::BadNamespace(name.to_string()))?
            .set_parameter(rest, value)
    }
}
