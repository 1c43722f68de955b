use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use qmc_superpose::error::QmcError;
use qmc_superpose::io::read_check_config;
use qmc_superpose::radial::numerical::{
    fused_error, gradient_error, laplacian_error, pgradient_error, random_displacements,
};

/// Finite-difference self check of the radial functions listed in a config file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Seed for the random displacement vectors
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<(), QmcError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = read_check_config(&args.config)?;
    info!(
        config = %args.config,
        functions = config.functions.len(),
        nsamples = config.nsamples,
        "loaded check config"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let rvec = random_displacements(config.nsamples, &mut rng);
    let mut failures = 0;

    for f in &config.functions {
        let mut best_grad = f64::INFINITY;
        let mut best_lap = f64::INFINITY;
        let mut best_pgrad = f64::INFINITY;
        for &delta in &config.deltas {
            let grad = gradient_error(f, &rvec, delta);
            let lap = laplacian_error(f, &rvec, delta);
            let pgrad = pgradient_error(f, &rvec, delta)?
                .values()
                .fold(0.0, |acc: f64, e| acc.max(*e));
            info!(function = f.name(), delta, grad, lap, pgrad, "finite-difference errors");
            best_grad = best_grad.min(grad);
            best_lap = best_lap.min(lap);
            best_pgrad = best_pgrad.min(pgrad);
        }

        let fused = fused_error(f, &rvec).max();
        info!(function = f.name(), fused, "fused vs unfused divergence");

        for (what, err) in [
            ("gradient", best_grad),
            ("laplacian", best_lap),
            ("pgradient", best_pgrad),
            ("fused", fused),
        ] {
            if err > config.tolerance {
                warn!(function = f.name(), what, err, tolerance = config.tolerance, "check failed");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        warn!(failures, "self check finished with failures");
        std::process::exit(1);
    }
    info!("all checks passed");
    Ok(())
}
