//! Error types for wavefunction construction and configuration loading.
//!
//! Numerical kernels never fail: non-finite values (for example at a node of a
//! superposition) propagate to the caller unchanged. Errors are reserved for
//! usage mistakes and I/O.

use thiserror::Error;

/// Returned from constructors, parameter setters and config loading.
#[derive(Debug, Error)]
pub enum QmcError {
    /// Parameter name not declared by the function or wavefunction.
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    /// Two sequences that must match in length do not.
    #[error("length mismatch: {what}; got {left} and {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// A superposition needs at least one component.
    #[error("superposition requires at least one component")]
    EmptySuperposition,

    /// Parameter name without a valid `wf{index}.` prefix.
    #[error("parameter `{0}` is not namespaced by a component index")]
    BadNamespace(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl QmcError {
    pub(crate) fn check_lengths(what: &'static str, left: usize, right: usize) -> Result<(), Self> {
        (left == right)
            .then_some(())
            .ok_or(Self::LengthMismatch { what, left, right })
    }
}
