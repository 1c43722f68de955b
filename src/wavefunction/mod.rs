//! Wavefunction components and the combinators that compose them.

mod multiply;
mod parameters;
mod plane_wave;
mod slater;
mod superpose;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use multiply::MultiplyWf;
pub use parameters::{namespaced, split_namespace};
pub use plane_wave::PlaneWavePhase;
pub use slater::{OrbitalProduct, Slater1s};
pub use superpose::SuperposeWf;
pub use traits::{
    complexify, full_mask, masked_indices, Configs, Dtype, LogAmplitude, PGradient,
    ParamValues, Scalar, WaveFunction,
};
