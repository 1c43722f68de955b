//! Stable superposition of quantum Monte Carlo trial wavefunctions.
//!
//! The crate provides a family of radial correlation functions, a
//! Jastrow factor and simple orbital components built on them, and
//! [`SuperposeWf`], which combines any number of components
//! `ψ = Σ_i c_i ψ_i` in the log domain without overflow.
//!
//! All amplitudes are handled as `(sign, ln|ψ|)` over a batch of walker
//! configurations.

pub mod correlation;
pub mod error;
pub mod io;
pub mod radial;
pub mod wavefunction;

// Re-export commonly used types at crate root
pub use correlation::JastrowFactor;
pub use error::QmcError;
pub use radial::{
    CutoffCuspFunction, GaussianFunction, PadeFunction, ParamName, PolyPadeFunction, Radial,
    RadialFunction,
};
pub use wavefunction::{
    Configs, LogAmplitude, MultiplyWf, OrbitalProduct, PlaneWavePhase, Scalar, SuperposeWf,
    WaveFunction,
};
