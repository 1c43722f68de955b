//! Wave function component interface for QMC calculations.
//!
//! A component caches whatever it needs about the current walker ensemble
//! and answers questions about single-electron moves relative to that cache.
//! Amplitudes are always reported as `(sign, ln|ψ|)` so that no component
//! ever forms a raw amplitude that could over- or underflow.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::QmcError;

/// Amplitude-level scalar. Real wavefunctions carry a zero imaginary part.
pub type Scalar = Complex64;

/// Promote a real gradient to the amplitude scalar type.
pub fn complexify(v: &Vector3<f64>) -> Vector3<Scalar> {
    v.map(|x| Scalar::new(x, 0.0))
}

/// Whether a component's amplitude is real or complex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    Real,
    Complex,
}

impl Dtype {
    /// Complex if either side is complex.
    pub fn promote(self, other: Dtype) -> Dtype {
        if self == Dtype::Complex || other == Dtype::Complex {
            Dtype::Complex
        } else {
            Dtype::Real
        }
    }
}

/// `ψ = sign · exp(logabs)` for every configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LogAmplitude {
    /// Unit-modulus phase (±1 for real wavefunctions).
    pub sign: Vec<Scalar>,
    /// `ln|ψ|`
    pub logabs: Vec<f64>,
}

impl LogAmplitude {
    /// A positive amplitude with the given log-magnitudes.
    pub fn positive(logabs: Vec<f64>) -> Self {
        Self {
            sign: vec![Scalar::new(1.0, 0.0); logabs.len()],
            logabs,
        }
    }

    pub fn len(&self) -> usize {
        self.logabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logabs.is_empty()
    }
}

/// Electron positions of an ensemble of walkers, `[nconf][nelec]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configs {
    pub electrons: Vec<Vec<Vector3<f64>>>,
}

impl Configs {
    pub fn new(electrons: Vec<Vec<Vector3<f64>>>) -> Self {
        Self { electrons }
    }

    /// Walkers with electron coordinates drawn from `N(0, scale²)`.
    pub fn random<R: Rng + ?Sized>(nconf: usize, nelec: usize, scale: f64, rng: &mut R) -> Self {
        let electrons = (0..nconf)
            .map(|_| {
                (0..nelec)
                    .map(|_| scale * Vector3::<f64>::from_distribution(&StandardNormal, rng))
                    .collect()
            })
            .collect();
        Self { electrons }
    }

    pub fn nconf(&self) -> usize {
        self.electrons.len()
    }

    pub fn nelec(&self) -> usize {
        self.electrons.first().map_or(0, |c| c.len())
    }

    /// Position of electron `e` in every configuration.
    pub fn electron(&self, e: usize) -> Vec<Vector3<f64>> {
        self.electrons.iter().map(|c| c[e]).collect()
    }

    /// Copy with electron `e` moved to `epos` wherever `mask` is set.
    pub fn moved(&self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) -> Self {
        let mut out = self.clone();
        out.apply_move(e, epos, mask);
        out
    }

    pub fn apply_move(&mut self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) {
        for (c, conf) in self.electrons.iter_mut().enumerate() {
            if mask[c] {
                conf[e] = epos[c];
            }
        }
    }
}

/// Mask selecting every configuration.
pub fn full_mask(nconf: usize) -> Vec<bool> {
    vec![true; nconf]
}

/// Indices of the configurations selected by `mask`, in order.
pub fn masked_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &m)| m.then_some(i))
        .collect()
}

/// Per-configuration parameter derivatives `∂ ln ψ / ∂p`, keyed by name.
pub type PGradient = BTreeMap<String, Vec<Scalar>>;

/// Current parameter values, keyed by name.
pub type ParamValues = BTreeMap<String, f64>;

/// Contract for anything that can take part in a superposition.
///
/// Move-related methods take `epos` with one proposed position per
/// configuration. Methods taking a `mask` return one entry per selected
/// configuration; the others cover every configuration.
pub trait WaveFunction {
    fn dtype(&self) -> Dtype;

    /// Number of configurations in the cache.
    fn nconf(&self) -> usize;

    /// Rebuild the cache from scratch and return the amplitude.
    fn recompute(&mut self, configs: &Configs) -> LogAmplitude;

    /// Amplitude of the cached configurations.
    fn value(&self) -> LogAmplitude;

    /// Commit electron `e` at `epos` for configurations selected by `mask`.
    fn updateinternals(&mut self, e: usize, epos: &[Vector3<f64>], mask: &[bool]);

    /// `ψ(R')/ψ(R)` with electron `e` moved to `epos`.
    fn testvalue(&self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) -> Vec<Scalar>;

    /// `ψ(R')/ψ(R)` for several candidates per configuration, `[nmask][npos]`.
    fn testvalue_many(&self, e: usize, epos: &[Vec<Vector3<f64>>], mask: &[bool]) -> Vec<Vec<Scalar>>;

    /// `∇_e ψ/ψ` at the proposed position.
    fn gradient(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Vector3<Scalar>>;

    /// `∇_e ψ/ψ` at the proposed position and `ψ(R')/ψ(R)`.
    fn gradient_value(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>);

    /// `∇_e ψ/ψ` and `∇_e² ψ/ψ` at the proposed position.
    fn gradient_laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>);

    /// `∇_e² ψ/ψ` at the proposed position.
    fn laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Scalar>;

    /// `∂ ln ψ / ∂p` at the cached configurations.
    fn pgradient(&self) -> PGradient;

    fn parameters(&self) -> ParamValues;

    /// Change a parameter. The cache is stale until the next `recompute`.
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), QmcError>;
}

impl<W: WaveFunction + ?Sized> WaveFunction for Box<W> {
    fn dtype(&self) -> Dtype {
        (**self).dtype()
    }

    fn nconf(&self) -> usize {
        (**self).nconf()
    }

    fn recompute(&mut self, configs: &Configs) -> LogAmplitude {
        (**self).recompute(configs)
    }

    fn value(&self) -> LogAmplitude {
        (**self).value()
    }

    fn updateinternals(&mut self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) {
        (**self).updateinternals(e, epos, mask)
    }

    fn testvalue(&self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) -> Vec<Scalar> {
        (**self).testvalue(e, epos, mask)
    }

    fn testvalue_many(&self, e: usize, epos: &[Vec<Vector3<f64>>], mask: &[bool]) -> Vec<Vec<Scalar>> {
        (**self).testvalue_many(e, epos, mask)
    }

    fn gradient(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Vector3<Scalar>> {
        (**self).gradient(e, epos)
    }

    fn gradient_value(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        (**self).gradient_value(e, epos)
    }

    fn gradient_laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        (**self).gradient_laplacian(e, epos)
    }

    fn laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Scalar> {
        (**self).laplacian(e, epos)
    }

    fn pgradient(&self) -> PGradient {
        (**self).pgradient()
    }

    fn parameters(&self) -> ParamValues {
        (**self).parameters()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), QmcError> {
        (**self).set_parameter(name, value)
    }
}
