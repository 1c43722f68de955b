//! IO module - configuration file handling.

mod config;

pub use config::{read_check_config, CheckConfig};
