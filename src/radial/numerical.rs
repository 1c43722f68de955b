//! Finite-difference cross-checks for radial functions.
//!
//! The analytic gradient, Laplacian and parameter gradient are only trusted
//! once they agree with central differences of the lower-order quantity. The
//! error of a central difference shrinks as `O(δ²)` until round-off takes
//! over, so checks are usually run over a range of steps.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;

use super::{norms, ParamName, RadialFunction};
use crate::error::QmcError;

/// Steps used by default when scanning the finite-difference error.
pub const DEFAULT_DELTAS: [f64; 5] = [1e-3, 1e-4, 1e-5, 1e-6, 1e-7];

/// Draw `n` displacement vectors with standard normal components.
pub fn random_displacements<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Vector3<f64>> {
    (0..n)
        .map(|_| Vector3::<f64>::from_distribution(&StandardNormal, rng))
        .collect()
}

fn shifted(rvec: &[Vector3<f64>], axis: usize, h: f64) -> (Vec<Vector3<f64>>, Vec<f64>) {
    let pos: Vec<Vector3<f64>> = rvec
        .iter()
        .map(|x| {
            let mut x = *x;
            x[axis] += h;
            x
        })
        .collect();
    let r = norms(&pos);
    (pos, r)
}

fn max_abs_diff(a: impl Iterator<Item = f64>, b: impl Iterator<Item = f64>) -> f64 {
    a.zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

/// Max absolute error between `gradient` and central differences of `value`.
pub fn gradient_error<F: RadialFunction + ?Sized>(f: &F, rvec: &[Vector3<f64>], delta: f64) -> f64 {
    let r = norms(rvec);
    let grad = f.gradient(rvec, &r);
    let mut err: f64 = 0.0;
    for axis in 0..3 {
        let (plus, rplus) = shifted(rvec, axis, delta);
        let (minus, rminus) = shifted(rvec, axis, -delta);
        let vplus = f.value(&plus, &rplus);
        let vminus = f.value(&minus, &rminus);
        let numeric = vplus.iter().zip(&vminus).map(|(p, m)| (p - m) / (2.0 * delta));
        err = err.max(max_abs_diff(grad.iter().map(|g| g[axis]), numeric));
    }
    err
}

/// Max absolute error between `laplacian` and central differences of `gradient`.
pub fn laplacian_error<F: RadialFunction + ?Sized>(f: &F, rvec: &[Vector3<f64>], delta: f64) -> f64 {
    let r = norms(rvec);
    let lap = f.laplacian(rvec, &r);
    let mut err: f64 = 0.0;
    for axis in 0..3 {
        let (plus, rplus) = shifted(rvec, axis, delta);
        let (minus, rminus) = shifted(rvec, axis, -delta);
        let gplus = f.gradient(&plus, &rplus);
        let gminus = f.gradient(&minus, &rminus);
        let numeric = gplus
            .iter()
            .zip(&gminus)
            .map(|(p, m)| (p[axis] - m[axis]) / (2.0 * delta));
        err = err.max(max_abs_diff(lap.iter().map(|l| l[axis]), numeric));
    }
    err
}

/// Max absolute error of `pgradient` against central differences of `value`
/// in each declared parameter.
///
/// Fails if a declared parameter cannot be read, set, or is missing from
/// the `pgradient` output.
pub fn pgradient_error<F: RadialFunction + Clone>(
    f: &F,
    rvec: &[Vector3<f64>],
    delta: f64,
) -> Result<BTreeMap<ParamName, f64>, QmcError> {
    let r = norms(rvec);
    let pgrad = f.pgradient(rvec, &r);
    let mut errors = BTreeMap::new();
    for &name in f.parameter_names() {
        let unknown = || QmcError::UnknownParameter(name.to_string());
        let p0 = f.parameter(name).ok_or_else(unknown)?;
        let analytic = pgrad.get(&name).ok_or_else(unknown)?;
        let mut plus = f.clone();
        let mut minus = f.clone();
        plus.set_parameter(name, p0 + delta)?;
        minus.set_parameter(name, p0 - delta)?;
        let vplus = plus.value(rvec, &r);
        let vminus = minus.value(rvec, &r);
        let numeric = vplus.iter().zip(&vminus).map(|(p, m)| (p - m) / (2.0 * delta));
        errors.insert(name, max_abs_diff(analytic.iter().copied(), numeric));
    }
    Ok(errors)
}

/// Divergence between fused kernels and their unfused counterparts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FusedError {
    /// `gradient_value().0` vs `gradient()`
    pub grad_value_grad: f64,
    /// `gradient_value().1` vs `value()`
    pub grad_value_value: f64,
    /// `gradient_laplacian().0` vs `gradient()`
    pub grad_lap_grad: f64,
    /// `gradient_laplacian().1` vs `laplacian()`
    pub grad_lap_lap: f64,
}

impl FusedError {
    pub fn max(&self) -> f64 {
        self.grad_value_grad
            .max(self.grad_value_value)
            .max(self.grad_lap_grad)
            .max(self.grad_lap_lap)
    }
}

pub fn fused_error<F: RadialFunction + ?Sized>(f: &F, rvec: &[Vector3<f64>]) -> FusedError {
    let r = norms(rvec);
    let grad = f.gradient(rvec, &r);
    let value = f.value(rvec, &r);
    let lap = f.laplacian(rvec, &r);
    let (gv_grad, gv_value) = f.gradient_value(rvec, &r);
    let (gl_grad, gl_lap) = f.gradient_laplacian(rvec, &r);

    let vec_err = |a: &[Vector3<f64>], b: &[Vector3<f64>]| {
        a.iter().zip(b).map(|(x, y)| (x - y).amax()).fold(0.0, f64::max)
    };
    FusedError {
        grad_value_grad: vec_err(&grad, &gv_grad),
        grad_value_value: max_abs_diff(value.iter().copied(), gv_value.iter().copied()),
        grad_lap_grad: vec_err(&grad, &gl_grad),
        grad_lap_lap: vec_err(&lap, &gl_lap),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radial::{
        CutoffCuspFunction, GaussianFunction, PadeFunction, ParamGradient, PolyPadeFunction, Radial,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn all_functions() -> Vec<Radial> {
        vec![
            PadeFunction::new(0.2).into(),
            GaussianFunction::new(0.4).into(),
            PolyPadeFunction::new(1.2, 1.7).into(),
            CutoffCuspFunction::new(0.8, 1.9).into(),
        ]
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(7);
        let rvec = random_displacements(150, &mut rng);
        for f in all_functions() {
            let err = gradient_error(&f, &rvec, 1e-5);
            assert!(err < 1e-4, "{} gradient error {}", f.name(), err);
        }
    }

    #[test]
    fn test_laplacian_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(11);
        let rvec = random_displacements(150, &mut rng);
        for f in all_functions() {
            let err = laplacian_error(&f, &rvec, 1e-5);
            assert!(err < 1e-4, "{} laplacian error {}", f.name(), err);
        }
    }

    #[test]
    fn test_finite_difference_error_is_second_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let rvec = random_displacements(50, &mut rng);
        for f in all_functions() {
            let ratio = gradient_error(&f, &rvec, 1e-3) / gradient_error(&f, &rvec, 1e-4);
            assert!(ratio > 50.0, "{} gradient error ratio {}", f.name(), ratio);
            let ratio = laplacian_error(&f, &rvec, 1e-3) / laplacian_error(&f, &rvec, 1e-4);
            assert!(ratio > 50.0, "{} laplacian error ratio {}", f.name(), ratio);
        }
    }

    #[test]
    fn test_pgradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(19);
        let rvec = random_displacements(150, &mut rng);
        for f in all_functions() {
            let errors = pgradient_error(&f, &rvec, 1e-5).unwrap();
            assert_eq!(errors.len(), f.parameter_names().len());
            for (name, err) in errors {
                assert!(err < 1e-5, "{} d/d{} error {}", f.name(), name, err);
            }
        }
    }

    #[test]
    fn test_fused_kernels_equal_unfused() {
        let mut rng = StdRng::seed_from_u64(23);
        let rvec = random_displacements(150, &mut rng);
        for f in all_functions() {
            let err = fused_error(&f, &rvec);
            assert!(err.max() < 1e-12, "{} fused error {:?}", f.name(), err);
        }
    }

    /// Declares a parameter it does not report a derivative for.
    #[derive(Clone)]
    struct Undeclared(PadeFunction);

    impl RadialFunction for Undeclared {
        fn parameter_names(&self) -> &'static [ParamName] {
            &[ParamName::AlphaK, ParamName::Beta]
        }
        fn parameter(&self, name: ParamName) -> Option<f64> {
            self.0.parameter(name)
        }
        fn set_parameter(&mut self, name: ParamName, value: f64) -> Result<(), QmcError> {
            self.0.set_parameter(name, value)
        }
        fn value_at(&self, rvec: &Vector3<f64>, r: f64) -> f64 {
            self.0.value_at(rvec, r)
        }
        fn gradient_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
            self.0.gradient_at(rvec, r)
        }
        fn laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> Vector3<f64> {
            self.0.laplacian_at(rvec, r)
        }
        fn gradient_value_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, f64) {
            self.0.gradient_value_at(rvec, r)
        }
        fn gradient_laplacian_at(&self, rvec: &Vector3<f64>, r: f64) -> (Vector3<f64>, Vector3<f64>) {
            self.0.gradient_laplacian_at(rvec, r)
        }
        fn pgradient(&self, rvec: &[Vector3<f64>], r: &[f64]) -> ParamGradient {
            self.0.pgradient(rvec, r)
        }
    }

    #[test]
    fn test_pgradient_error_rejects_undeclared_parameter() {
        let mut rng = StdRng::seed_from_u64(29);
        let rvec = random_displacements(10, &mut rng);
        let f = Undeclared(PadeFunction::new(0.2));
        assert!(matches!(
            pgradient_error(&f, &rvec, 1e-5),
            Err(QmcError::UnknownParameter(_))
        ));
    }
}
