//! Correlation factors built on the radial function family.

mod jastrow;

pub use jastrow::JastrowFactor;
