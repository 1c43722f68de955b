//! Radial correlation functions used to build Jastrow factors.
//!
//! Every function is a closed-form `f(r; params)` of a displacement `rvec`
//! and its norm `r`. Inputs are flattened batches: the caller decides what
//! the inner indices mean (electron pairs, electron-ion pairs, ...), the
//! function only sees one 3-vector and one radius per element.
//!
//! Laplacians are returned as the three diagonal second partials
//! `∂²f/∂x_i²` so callers can sum them over whatever particles they need.

mod cutoff_cusp;
mod gaussian;
pub mod numerical;
mod pade;
mod poly_pade;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::QmcError;

pub use cutoff_cusp::CutoffCuspFunction;
pub use gaussian::GaussianFunction;
pub use pade::PadeFunction;
pub use poly_pade::PolyPadeFunction;

/// Variational parameter names used by the radial functions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParamName {
    Exponent,
    AlphaK,
    Beta,
    Gamma,
    Rcut,
}

impl ParamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::Exponent => "exponent",
            ParamName::AlphaK => "alphak",
            ParamName::Beta => "beta",
            ParamName::Gamma => "gamma",
            ParamName::Rcut => "rcut",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = QmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exponent" => Ok(ParamName::Exponent),
            "alphak" => Ok(ParamName::AlphaK),
            "beta" => Ok(ParamName::Beta),
            "gamma" => Ok(ParamName::Gamma),
            "rcut" => Ok(ParamName::Rcut),
            other => Err(QmcError::UnknownParameter(other.to_string())),
        }
    }
}

/// Parameter derivatives of a batch, one vector (shaped like `value`) per name.
pub type ParamGradient = BTreeMap<ParamName, Vec<f64>>;

/// Contract shared by all radial functions.
///
/// The `*_at` kernels evaluate a single element; the batch methods map them
/// over a flattened batch in parallel. The fused kernels must agree with the
/// unfused ones, which the finite-difference and fused checks in
/// [`numerical`] verify.
pub trait RadialFunction: Sync {
    /// Parameters declared by this function, in a fixed order.
    fn parameter_names(&self) -> &'static [ParamName];

    fn parameter(&self, name: ParamName) -> Option<f64>;

    fn set_parameter(&mut self, name: ParamName, value: f64) -> Result<(), QmcError>;

    fn value_at(&self, rvec: &Vector3<f64>, r: f64) -> f64;

    /// Cartesian gradient `(df/dr) x_i / r`.
    fn gradient_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64>;

    /// Diagonal second partials `∂²f/∂x_i²`, not summed.
    fn laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64>;

    fn gradient_value_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, f64);

    fn gradient_laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, Vector3<f64>);

    /// `∂f/∂p` for every declared parameter, shaped like [`RadialFunction::value`].
    fn pgradient(&self, rvec: &[Vector3<f64>], r: &[f64]) -> ParamGradient;

    fn value(&self, rvec: &[Vector3<f64>], r: &[f64]) -> Vec<f64> {
        debug_assert_eq!(rvec.len(), r.len());
        rvec.par_iter()
            .zip(r.par_iter())
            .map(|(x, &r)| self.value_at(x, r))
            .collect()
    }

    fn gradient(&self, rvec: &[Vector3<f64>], r: &[f64]) -> Vec<Vector3<f64>> {
        debug_assert_eq!(rvec.len(), r.len());
        rvec.par_iter()
            .zip(r.par_iter())
            .map(|(x, &r)| self.gradient_at(x, r))
            .collect()
    }

    fn laplacian(&self, rvec: &[Vector3<f64>], r: &[f64]) -> Vec<Vector3<f64>> {
        debug_assert_eq!(rvec.len(), r.len());
        rvec.par_iter()
            .zip(r.par_iter())
            .map(|(x, &r)| self.laplacian_at(x, r))
            .collect()
    }

    fn gradient_value(&self, rvec: &[Vector3<f64>], r: &[f64]) -> (Vec<Vector3<f64>>, Vec<f64>) {
        debug_assert_eq!(rvec.len(), r.len());
        rvec.par_iter()
            .zip(r.par_iter())
            .map(|(x, &r)| self.gradient_value_at(x, r))
            .unzip()
    }

    fn gradient_laplacian(
        &self,
        rvec: &[Vector3<f64>],
        r: &[f64],
    ) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>) {
        debug_assert_eq!(rvec.len(), r.len());
        rvec.par_iter()
            .zip(r.par_iter())
            .map(|(x, &r)| self.gradient_laplacian_at(x, r))
            .unzip()
    }
}

/// Norms of a displacement batch along the Cartesian axis.
pub fn norms(rvec: &[Vector3<f64>]) -> Vec<f64> {
    rvec.iter().map(|x| x.norm()).collect()
}

/// `(x_i / r)²`, zero at the origin where it only ever multiplies a
/// vanishing factor.
#[inline]
pub(crate) fn direction_sq(x: f64, r: f64) -> f64 {
    if r > 0.0 {
        (x / r).powi(2)
    } else {
        0.0
    }
}

/// Compute `∂f/∂p` over a batch for a single-parameter kernel.
pub(crate) fn map_param(
    rvec: &[Vector3<f64>],
    r: &[f64],
    f: impl Fn(&Vector3<f64>, f64) -> f64 + Sync + Send,
) -> Vec<f64> {
    rvec.par_iter().zip(r.par_iter()).map(|(x, &r)| f(x, r)).collect()
}

/// Any of the radial functions, as stored in config files and Jastrow factors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Radial {
    Gaussian(GaussianFunction),
    Pade(PadeFunction),
    PolyPade(PolyPadeFunction),
    CutoffCusp(CutoffCuspFunction),
}

impl Radial {
    pub fn name(&self) -> &'static str {
        match self {
            Radial::Gaussian(_) => "gaussian",
            Radial::Pade(_) => "pade",
            Radial::PolyPade(_) => "poly_pade",
            Radial::CutoffCusp(_) => "cutoff_cusp",
        }
    }

    fn inner(&self) -> &dyn RadialFunction {
        match self {
            Radial::Gaussian(f) => f,
            Radial::Pade(f) => f,
            Radial::PolyPade(f) => f,
            Radial::CutoffCusp(f) => f,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn RadialFunction {
        match self {
            Radial::Gaussian(f) => f,
            Radial::Pade(f) => f,
            Radial::PolyPade(f) => f,
            Radial::CutoffCusp(f) => f,
        }
    }
}

impl From<GaussianFunction> for Radial {
    fn from(f: GaussianFunction) -> Self {
        Radial::Gaussian(f)
    }
}

impl From<PadeFunction> for Radial {
    fn from(f: PadeFunction) -> Self {
        Radial::Pade(f)
    }
}

impl From<PolyPadeFunction> for Radial {
    fn from(f: PolyPadeFunction) -> Self {
        Radial::PolyPade(f)
    }
}

impl From<CutoffCuspFunction> for Radial {
    fn from(f: CutoffCuspFunction) -> Self {
        Radial::CutoffCusp(f)
    }
}

impl RadialFunction for Radial {
    fn parameter_names(&self) -> &'static [ParamName] {
        self.inner().parameter_names()
    }

    fn parameter(&self, name: ParamName) -> Option<f64> {
        self.inner().parameter(name)
    }

    fn set_parameter(&mut self, name: ParamName, value: f64) -> Result<(), QmcError> {
        self.inner_mut().set_parameter(name, value)
    }

    fn value_at(&self, rvec: &Vector3<f64>, r: f64) -> f64 {
        self.inner().value_at(rvec, r)
    }

    fn gradient_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        self.inner().gradient_at(rvec, r)
    }

    fn laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
        self.inner().laplacian_at(rvec, r)
    }

    fn gradient_value_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, f64) {
        self.inner().gradient_value_at(rvec, r)
    }

    fn gradient_laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, Vector3<f64>) {
        self.inner().gradient_laplacian_at(rvec, r)
    }

    fn pgradient(&self, rvec: &[Vector3<f64>], r: &[f64]) -> ParamGradient {
        self.inner().pgradient(rvec, r)
    }
}
