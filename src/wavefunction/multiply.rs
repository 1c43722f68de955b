//! Product of two wavefunction components.

use nalgebra::Vector3;

use super::parameters::{namespaced, split_namespace};
use super::traits::{Configs, Dtype, LogAmplitude, PGradient, ParamValues, Scalar, WaveFunction};
use crate::error::QmcError;

/// Product `ψ = ψ₀ ψ₁` of two components, e.g. orbitals times a Jastrow factor.
///
/// Parameters are exposed as `wf0.*` and `wf1.*`.
#[derive(Debug, Clone)]
pub struct MultiplyWf<A, B> {
    pub wf0: A,
    pub wf1: B,
}

impl<A: WaveFunction, B: WaveFunction> MultiplyWf<A, B> {
    pub fn new(wf0: A, wf1: B) -> Self {
        Self { wf0, wf1 }
    }

    fn combine(a: LogAmplitude, b: LogAmplitude) -> LogAmplitude {
        LogAmplitude {
            sign: a.sign.iter().zip(&b.sign).map(|(x, y)| x * y).collect(),
            logabs: a.logabs.iter().zip(&b.logabs).map(|(x, y)| x + y).collect(),
        }
    }
}

fn product(a: Vec<Scalar>, b: Vec<Scalar>) -> Vec<Scalar> {
    a.into_iter().zip(b).map(|(x, y)| x * y).collect()
}

fn sum_gradients(a: Vec<Vector3<Scalar>>, b: &[Vector3<Scalar>]) -> Vec<Vector3<Scalar>> {
    a.into_iter().zip(b).map(|(x, y)| x + y).collect()
}

/// `∇²(AB)/(AB) = ∇²A/A + ∇²B/B + 2 ∇lnA·∇lnB`
fn product_laplacian(
    grad0: &[Vector3<Scalar>],
    lap0: &[Scalar],
    grad1: &[Vector3<Scalar>],
    lap1: &[Scalar],
) -> Vec<Scalar> {
    grad0
        .iter()
        .zip(lap0)
        .zip(grad1.iter().zip(lap1))
        .map(|((g0, l0), (g1, l1))| l0 + l1 + Scalar::new(2.0, 0.0) * g0.dot(g1))
        .collect()
}

impl<A: WaveFunction, B: WaveFunction> WaveFunction for MultiplyWf<A, B> {
    fn dtype(&self) -> Dtype {
        self.wf0.dtype().promote(self.wf1.dtype())
    }

    fn nconf(&self) -> usize {
        self.wf0.nconf()
    }

    fn recompute(&mut self, configs: &Configs) -> LogAmplitude {
        let a = self.wf0.recompute(configs);
        let b = self.wf1.recompute(configs);
        Self::combine(a, b)
    }

    fn value(&self) -> LogAmplitude {
        Self::combine(self.wf0.value(), self.wf1.value())
    }

    fn updateinternals(&mut self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) {
        self.wf0.updateinternals(e, epos, mask);
        self.wf1.updateinternals(e, epos, mask);
    }

    fn testvalue(&self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) -> Vec<Scalar> {
        product(self.wf0.testvalue(e, epos, mask), self.wf1.testvalue(e, epos, mask))
    }

    fn testvalue_many(&self, e: usize, epos: &[Vec<Vector3<f64>>], mask: &[bool]) -> Vec<Vec<Scalar>> {
        self.wf0
            .testvalue_many(e, epos, mask)
            .into_iter()
            .zip(self.wf1.testvalue_many(e, epos, mask))
            .map(|(a, b)| product(a, b))
            .collect()
    }

    fn gradient(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Vector3<Scalar>> {
        sum_gradients(self.wf0.gradient(e, epos), &self.wf1.gradient(e, epos))
    }

    fn gradient_value(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        let (g0, v0) = self.wf0.gradient_value(e, epos);
        let (g1, v1) = self.wf1.gradient_value(e, epos);
        (sum_gradients(g0, &g1), product(v0, v1))
    }

    fn gradient_laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        let (g0, l0) = self.wf0.gradient_laplacian(e, epos);
        let (g1, l1) = self.wf1.gradient_laplacian(e, epos);
        let lap = product_laplacian(&g0, &l0, &g1, &l1);
        (sum_gradients(g0, &g1), lap)
    }

    fn laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Scalar> {
        self.gradient_laplacian(e, epos).1
    }

    fn pgradient(&self) -> PGradient {
        namespaced([self.wf0.pgradient(), self.wf1.pgradient()])
    }

    fn parameters(&self) -> ParamValues {
        namespaced([self.wf0.parameters(), self.wf1.parameters()])
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), QmcError> {
        match split_namespace(name)? {
            (0, rest) => self.wf0.set_parameter(rest, value),
            (1, rest) => self.wf1.set_parameter(rest, value),
            _ => Err(QmcError::BadNamespace(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::JastrowFactor;
    use crate::radial::{CutoffCuspFunction, PadeFunction};
    use crate::wavefunction::testing::{
        numerical_gradient, numerical_laplacian, numerical_pgradient, testvalue_error,
    };
    use crate::wavefunction::{full_mask, OrbitalProduct, PlaneWavePhase};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn slater_jastrow() -> MultiplyWf<OrbitalProduct, JastrowFactor> {
        let centers = vec![Vector3::new(0.0, 0.0, 0.7), Vector3::new(0.0, 0.0, -0.7)];
        let orbitals = OrbitalProduct::new(0.8, centers.clone(), vec![1.0, 0.6]).unwrap();
        let jastrow = JastrowFactor::new(
            centers,
            vec![PadeFunction::new(0.5).into()],
            vec![-0.2],
            vec![CutoffCuspFunction::new(1.0, 4.0).into()],
            vec![0.5],
        )
        .unwrap();
        MultiplyWf::new(orbitals, jastrow)
    }

    #[test]
    fn test_product_value_adds_logs() {
        let mut rng = StdRng::seed_from_u64(53);
        let configs = Configs::random(5, 2, 1.0, &mut rng);
        let mut wf = slater_jastrow();
        let total = wf.recompute(&configs);
        let a = wf.wf0.value();
        let b = wf.wf1.value();
        for c in 0..5 {
            assert_relative_eq!(total.logabs[c], a.logabs[c] + b.logabs[c], epsilon = 1e-14);
            assert_eq!(total.sign[c], a.sign[c] * b.sign[c]);
        }
        assert_eq!(wf.dtype(), Dtype::Real);
    }

    #[test]
    fn test_product_testvalue_matches_recompute() {
        let mut rng = StdRng::seed_from_u64(59);
        let configs = Configs::random(8, 2, 1.0, &mut rng);
        let epos = Configs::random(8, 1, 1.0, &mut rng).electron(0);
        let mut wf = slater_jastrow();
        assert!(testvalue_error(&mut wf, &configs, 0, &epos) < 1e-10);
    }

    #[test]
    fn test_product_derivatives_match_finite_difference() {
        let mut rng = StdRng::seed_from_u64(61);
        let configs = Configs::random(6, 2, 1.0, &mut rng);
        let epos = Configs::random(6, 1, 1.0, &mut rng).electron(0);
        let mut wf = slater_jastrow();
        wf.recompute(&configs);
        let (grad, lap) = wf.gradient_laplacian(1, &epos);
        let num_grad = numerical_gradient(&wf, 1, &epos, 1e-5);
        let num_lap = numerical_laplacian(&wf, 1, &epos, 1e-4);
        for c in 0..6 {
            for d in 0..3 {
                assert_relative_eq!(grad[c][d].re, num_grad[c][d].re, epsilon = 1e-5, max_relative = 1e-5);
            }
            assert_relative_eq!(lap[c].re, num_lap[c].re, epsilon = 1e-3, max_relative = 1e-4);
        }
        assert_eq!(wf.laplacian(1, &epos), lap);
        assert_eq!(wf.gradient(1, &epos), grad);
    }

    #[test]
    fn test_product_parameters_are_namespaced() {
        let mut rng = StdRng::seed_from_u64(67);
        let configs = Configs::random(4, 2, 1.0, &mut rng);
        let mut wf = slater_jastrow();
        wf.recompute(&configs);
        let params = wf.parameters();
        assert_eq!(params["wf0.alpha"], 0.8);
        assert_eq!(params["wf1.bcoeff0"], 0.5);
        assert!(wf.set_parameter("wf2.alpha", 1.0).is_err());
        assert!(wf.set_parameter("alpha", 1.0).is_err());

        let pgrad = wf.pgradient();
        for name in ["wf0.alpha", "wf1.acoeff0", "wf1.bcoeff0"] {
            let numeric = numerical_pgradient(&mut wf, &configs, name, 1e-6);
            for c in 0..4 {
                assert_relative_eq!(pgrad[name][c].re, numeric[c], epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_product_with_phase_is_complex() {
        let mut rng = StdRng::seed_from_u64(71);
        let configs = Configs::random(4, 2, 1.0, &mut rng);
        let epos = Configs::random(4, 1, 1.0, &mut rng).electron(0);
        let mut wf = MultiplyWf::new(
            slater_jastrow().wf0,
            PlaneWavePhase::new(Vector3::new(0.4, 0.1, -0.3)),
        );
        assert_eq!(wf.dtype(), Dtype::Complex);
        assert!(testvalue_error(&mut wf, &configs, 1, &epos) < 1e-10);
        let many: Vec<Vec<Vector3<f64>>> = epos.iter().map(|r| vec![*r, configs.electrons[0][1]]).collect();
        let tv_many = wf.testvalue_many(1, &many, &full_mask(4));
        let tv = wf.testvalue(1, &epos, &full_mask(4));
        for c in 0..4 {
            assert_relative_eq!(tv_many[c][0].re, tv[c].re, epsilon = 1e-14);
            assert_relative_eq!(tv_many[c][0].im, tv[c].im, epsilon = 1e-14);
        }
    }
}
