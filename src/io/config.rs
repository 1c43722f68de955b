use serde::{Deserialize, Serialize};

use crate::error::QmcError;
use crate::radial::numerical::DEFAULT_DELTAS;
use crate::radial::Radial;

/// Settings for the finite-difference self check of radial functions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CheckConfig {
    pub functions: Vec<Radial>,
    #[serde(default = "default_deltas")]
    pub deltas: Vec<f64>,
    #[serde(default = "default_nsamples")]
    pub nsamples: usize,
    /// Largest acceptable error at the smallest-error delta
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_deltas() -> Vec<f64> {
    DEFAULT_DELTAS.to_vec()
}

fn default_nsamples() -> usize {
    150
}

fn default_tolerance() -> f64 {
    1e-4
}

/// Read a [`CheckConfig`] from a yaml file.
pub fn read_check_config(filename: &str) -> Result<CheckConfig, QmcError> {
    let file = std::fs::File::open(filename)?;
    let reader = std::io::BufReader::new(file);
    let config: CheckConfig = serde_yaml::from_reader(reader)?;
    Ok(config)
}

// example of yaml file
// functions:
//   - type: pade
//     alphak: 0.2
//   - type: poly_pade
//     beta: -0.5
//     rcut: 7.5
// deltas: [1.0e-3, 1.0e-5]
// nsamples: 150
