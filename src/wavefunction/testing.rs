//! Finite-difference helpers shared by the wavefunction tests.

use nalgebra::Vector3;

use super::{full_mask, Configs, Scalar, WaveFunction};

fn shifted(epos: &[Vector3<f64>], axis: usize, h: f64) -> Vec<Vector3<f64>> {
    epos.iter()
        .map(|x| {
            let mut x = *x;
            x[axis] += h;
            x
        })
        .collect()
}

/// Central-difference `∇_e ψ/ψ` at `epos`, built from `testvalue` ratios.
pub(crate) fn numerical_gradient<W: WaveFunction + ?Sized>(
    wf: &W,
    e: usize,
    epos: &[Vector3<f64>],
    h: f64,
) -> Vec<Vector3<Scalar>> {
    let mask = full_mask(epos.len());
    let center = wf.testvalue(e, epos, &mask);
    let mut grad = vec![Vector3::<Scalar>::zeros(); epos.len()];
    for axis in 0..3 {
        let plus = wf.testvalue(e, &shifted(epos, axis, h), &mask);
        let minus = wf.testvalue(e, &shifted(epos, axis, -h), &mask);
        for c in 0..epos.len() {
            grad[c][axis] = (plus[c] - minus[c]) / (2.0 * h) / center[c];
        }
    }
    grad
}

/// Central-difference `∇_e² ψ/ψ` at `epos`.
pub(crate) fn numerical_laplacian<W: WaveFunction + ?Sized>(
    wf: &W,
    e: usize,
    epos: &[Vector3<f64>],
    h: f64,
) -> Vec<Scalar> {
    let mask = full_mask(epos.len());
    let center = wf.testvalue(e, epos, &mask);
    let mut lap = vec![Scalar::new(0.0, 0.0); epos.len()];
    for axis in 0..3 {
        let plus = wf.testvalue(e, &shifted(epos, axis, h), &mask);
        let minus = wf.testvalue(e, &shifted(epos, axis, -h), &mask);
        for c in 0..epos.len() {
            lap[c] += (plus[c] - 2.0 * center[c] + minus[c]) / (h * h);
        }
    }
    lap.iter().zip(&center).map(|(l, c)| l / c).collect()
}

/// Max deviation of `testvalue` from the ratio of two full recomputations.
/// Leaves `wf` recomputed at `configs`.
pub(crate) fn testvalue_error<W: WaveFunction + ?Sized>(
    wf: &mut W,
    configs: &Configs,
    e: usize,
    epos: &[Vector3<f64>],
) -> f64 {
    let mask = full_mask(configs.nconf());
    let before = wf.recompute(configs);
    let ratio = wf.testvalue(e, epos, &mask);
    let after = wf.recompute(&configs.moved(e, epos, &mask));
    wf.recompute(configs);
    (0..configs.nconf())
        .map(|c| {
            let expected = after.sign[c] / before.sign[c] * (after.logabs[c] - before.logabs[c]).exp();
            (ratio[c] - expected).norm() / expected.norm().max(1.0)
        })
        .fold(0.0, f64::max)
}

/// Central-difference `∂ ln|ψ| / ∂p`. Leaves `wf` recomputed at `configs`
/// with the parameter restored.
pub(crate) fn numerical_pgradient<W: WaveFunction + ?Sized>(
    wf: &mut W,
    configs: &Configs,
    name: &str,
    h: f64,
) -> Vec<f64> {
    let p0 = wf.parameters()[name];
    wf.set_parameter(name, p0 + h).unwrap();
    let plus = wf.recompute(configs);
    wf.set_parameter(name, p0 - h).unwrap();
    let minus = wf.recompute(configs);
    wf.set_parameter(name, p0).unwrap();
    wf.recompute(configs);
    plus.logabs
        .iter()
        .zip(&minus.logabs)
        .map(|(p, m)| (p - m) / (2.0 * h))
        .collect()
}
