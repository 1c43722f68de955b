//! Jastrow correlation factor built from radial functions.
//!
//! ln J(R) = Σ_e Σ_I Σ_k a_k A_k(|r_e - R_I|) + Σ_{i<j} Σ_k b_k B_k(|r_i - r_j|)
//!
//! The one-body sum runs over electron-ion pairs, the two-body sum over
//! electron pairs. Only the linear coefficients `a_k`, `b_k` are variational
//! parameters of the factor; the shapes of `A_k` and `B_k` are fixed.

use std::ops::{AddAssign, Mul};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::QmcError;
use crate::radial::{norms, Radial, RadialFunction};
use crate::wavefunction::{
    complexify, masked_indices, Configs, Dtype, LogAmplitude, PGradient, ParamValues, Scalar,
    WaveFunction,
};

/// Two-body plus one-body Jastrow factor.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JastrowFactor {
    /// Ion positions for the one-body term
    pub ions: Vec<Vector3<f64>>,
    /// Electron-ion basis functions A_k
    pub a_basis: Vec<Radial>,
    /// Electron-electron basis functions B_k
    pub b_basis: Vec<Radial>,
    pub acoeff: Vec<f64>,
    pub bcoeff: Vec<f64>,
    #[serde(skip)]
    configs: Configs,
    /// ln J per configuration (cached)
    #[serde(skip)]
    logval: Vec<f64>,
}

/// Add `coeff * Σ chunk` of every `stride`-sized chunk of `terms` into `acc`.
fn accumulate<T>(acc: &mut [T], terms: &[T], stride: usize, coeff: f64)
where
    T: Copy + AddAssign + Mul<f64, Output = T>,
{
    if stride == 0 {
        return;
    }
    for (a, chunk) in acc.iter_mut().zip(terms.chunks(stride)) {
        for &t in chunk {
            *a += t * coeff;
        }
    }
}

impl JastrowFactor {
    pub fn new(
        ions: Vec<Vector3<f64>>,
        a_basis: Vec<Radial>,
        acoeff: Vec<f64>,
        b_basis: Vec<Radial>,
        bcoeff: Vec<f64>,
    ) -> Result<Self, QmcError> {
        QmcError::check_lengths("one-body basis vs coefficients", a_basis.len(), acoeff.len())?;
        QmcError::check_lengths("two-body basis vs coefficients", b_basis.len(), bcoeff.len())?;
        Ok(Self {
            ions,
            a_basis,
            b_basis,
            acoeff,
            bcoeff,
            configs: Configs::default(),
            logval: Vec::new(),
        })
    }

    /// Two-body only factor.
    pub fn electron_electron(b_basis: Vec<Radial>, bcoeff: Vec<f64>) -> Result<Self, QmcError> {
        Self::new(Vec::new(), Vec::new(), Vec::new(), b_basis, bcoeff)
    }

    fn nelec(&self) -> usize {
        self.configs.nelec()
    }

    /// Displacements from electron `e` placed at `pos[n]` in configuration
    /// `idx[n]`: first to every ion, then to every other electron.
    fn displacements(
        &self,
        e: usize,
        pos: &[Vector3<f64>],
        idx: &[usize],
    ) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>) {
        let mut ion_rvec = Vec::with_capacity(idx.len() * self.ions.len());
        let mut ee_rvec = Vec::with_capacity(idx.len() * self.nelec().saturating_sub(1));
        for (x, &c) in pos.iter().zip(idx) {
            ion_rvec.extend(self.ions.iter().map(|ion| x - ion));
            ee_rvec.extend(
                self.configs.electrons[c]
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != e)
                    .map(|(_, rj)| x - rj),
            );
        }
        (ion_rvec, ee_rvec)
    }

    /// Contribution of electron `e` to ln J, placed at `pos`.
    fn electron_value(&self, e: usize, pos: &[Vector3<f64>], idx: &[usize]) -> Vec<f64> {
        let (ion_rvec, ee_rvec) = self.displacements(e, pos, idx);
        let (ion_r, ee_r) = (norms(&ion_rvec), norms(&ee_rvec));
        let ee_stride = self.nelec().saturating_sub(1);
        let mut u = vec![0.0; idx.len()];
        for (&c, f) in self.acoeff.iter().zip(&self.a_basis) {
            accumulate(&mut u, &f.value(&ion_rvec, &ion_r), self.ions.len(), c);
        }
        for (&c, f) in self.bcoeff.iter().zip(&self.b_basis) {
            accumulate(&mut u, &f.value(&ee_rvec, &ee_r), ee_stride, c);
        }
        u
    }

    /// `∇_e ln J` and the contribution of electron `e` to ln J.
    fn electron_gradient_value(
        &self,
        e: usize,
        pos: &[Vector3<f64>],
        idx: &[usize],
    ) -> (Vec<Vector3<f64>>, Vec<f64>) {
        let (ion_rvec, ee_rvec) = self.displacements(e, pos, idx);
        let (ion_r, ee_r) = (norms(&ion_rvec), norms(&ee_rvec));
        let ee_stride = self.nelec().saturating_sub(1);
        let mut grad = vec![Vector3::zeros(); idx.len()];
        let mut u = vec![0.0; idx.len()];
        for (&c, f) in self.acoeff.iter().zip(&self.a_basis) {
            let (g, v) = f.gradient_value(&ion_rvec, &ion_r);
            accumulate(&mut grad, &g, self.ions.len(), c);
            accumulate(&mut u, &v, self.ions.len(), c);
        }
        for (&c, f) in self.bcoeff.iter().zip(&self.b_basis) {
            let (g, v) = f.gradient_value(&ee_rvec, &ee_r);
            accumulate(&mut grad, &g, ee_stride, c);
            accumulate(&mut u, &v, ee_stride, c);
        }
        (grad, u)
    }

    /// `∇_e ln J` and `∇_e² ln J`.
    fn electron_gradient_laplacian(
        &self,
        e: usize,
        pos: &[Vector3<f64>],
        idx: &[usize],
    ) -> (Vec<Vector3<f64>>, Vec<f64>) {
        let (ion_rvec, ee_rvec) = self.displacements(e, pos, idx);
        let (ion_r, ee_r) = (norms(&ion_rvec), norms(&ee_rvec));
        let ee_stride = self.nelec().saturating_sub(1);
        let mut grad = vec![Vector3::zeros(); idx.len()];
        let mut lap = vec![0.0; idx.len()];
        for (&c, f) in self.acoeff.iter().zip(&self.a_basis) {
            let (g, l) = f.gradient_laplacian(&ion_rvec, &ion_r);
            let l: Vec<f64> = l.iter().map(|l| l.sum()).collect();
            accumulate(&mut grad, &g, self.ions.len(), c);
            accumulate(&mut lap, &l, self.ions.len(), c);
        }
        for (&c, f) in self.bcoeff.iter().zip(&self.b_basis) {
            let (g, l) = f.gradient_laplacian(&ee_rvec, &ee_r);
            let l: Vec<f64> = l.iter().map(|l| l.sum()).collect();
            accumulate(&mut grad, &g, ee_stride, c);
            accumulate(&mut lap, &l, ee_stride, c);
        }
        (grad, lap)
    }

    /// Per-basis-function sums over all electron-ion and electron-electron
    /// pairs of every configuration: `(Σ A_k, Σ B_k)`, each `[k][nconf]`.
    fn basis_sums(&self, configs: &Configs) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let nelec = configs.nelec();
        let ion_stride = nelec * self.ions.len();
        let ee_stride = nelec * nelec.saturating_sub(1) / 2;
        let mut ion_rvec = Vec::with_capacity(configs.nconf() * ion_stride);
        let mut ee_rvec = Vec::with_capacity(configs.nconf() * ee_stride);
        for conf in &configs.electrons {
            for (i, ri) in conf.iter().enumerate() {
                ion_rvec.extend(self.ions.iter().map(|ion| ri - ion));
                ee_rvec.extend(conf[i + 1..].iter().map(|rj| ri - rj));
            }
        }
        let (ion_r, ee_r) = (norms(&ion_rvec), norms(&ee_rvec));

        let sums = |basis: &[Radial], rvec: &[Vector3<f64>], r: &[f64], stride: usize| {
            basis
                .iter()
                .map(|f| {
                    let mut s = vec![0.0; configs.nconf()];
                    accumulate(&mut s, &f.value(rvec, r), stride, 1.0);
                    s
                })
                .collect::<Vec<_>>()
        };
        (
            sums(&self.a_basis, &ion_rvec, &ion_r, ion_stride),
            sums(&self.b_basis, &ee_rvec, &ee_r, ee_stride),
        )
    }

    fn current_positions(&self, e: usize, idx: &[usize]) -> Vec<Vector3<f64>> {
        idx.iter().map(|&c| self.configs.electrons[c][e]).collect()
    }
}

impl WaveFunction for JastrowFactor {
    fn dtype(&self) -> Dtype {
        Dtype::Real
    }

    fn nconf(&self) -> usize {
        self.configs.nconf()
    }

    fn recompute(&mut self, configs: &Configs) -> LogAmplitude {
        let (asums, bsums) = self.basis_sums(configs);
        let mut logval = vec![0.0; configs.nconf()];
        for (&c, s) in self.acoeff.iter().zip(&asums).chain(self.bcoeff.iter().zip(&bsums)) {
            for (u, v) in logval.iter_mut().zip(s) {
                *u += c * v;
            }
        }
        self.configs = configs.clone();
        self.logval = logval;
        self.value()
    }

    fn value(&self) -> LogAmplitude {
        LogAmplitude::positive(self.logval.clone())
    }

    fn updateinternals(&mut self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) {
        let idx = masked_indices(mask);
        let new_pos: Vec<Vector3<f64>> = idx.iter().map(|&c| epos[c]).collect();
        let new = self.electron_value(e, &new_pos, &idx);
        let old = self.electron_value(e, &self.current_positions(e, &idx), &idx);
        for (n, &c) in idx.iter().enumerate() {
            self.logval[c] += new[n] - old[n];
        }
        self.configs.apply_move(e, epos, mask);
        trace!(electron = e, moved = idx.len(), "jastrow updateinternals");
    }

    fn testvalue(&self, e: usize, epos: &[Vector3<f64>], mask: &[bool]) -> Vec<Scalar> {
        let idx = masked_indices(mask);
        let new_pos: Vec<Vector3<f64>> = idx.iter().map(|&c| epos[c]).collect();
        let new = self.electron_value(e, &new_pos, &idx);
        let old = self.electron_value(e, &self.current_positions(e, &idx), &idx);
        new.iter()
            .zip(&old)
            .map(|(n, o)| Scalar::new((n - o).exp(), 0.0))
            .collect()
    }

    fn testvalue_many(&self, e: usize, epos: &[Vec<Vector3<f64>>], mask: &[bool]) -> Vec<Vec<Scalar>> {
        let idx = masked_indices(mask);
        let npos = idx.first().map_or(0, |&c| epos[c].len());
        let old = self.electron_value(e, &self.current_positions(e, &idx), &idx);
        let mut out = vec![Vec::with_capacity(npos); idx.len()];
        for p in 0..npos {
            let pos: Vec<Vector3<f64>> = idx.iter().map(|&c| epos[c][p]).collect();
            let new = self.electron_value(e, &pos, &idx);
            for (n, row) in out.iter_mut().enumerate() {
                row.push(Scalar::new((new[n] - old[n]).exp(), 0.0));
            }
        }
        out
    }

    fn gradient(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Vector3<Scalar>> {
        let idx: Vec<usize> = (0..self.nconf()).collect();
        let (grad, _) = self.electron_gradient_value(e, epos, &idx);
        grad.iter().map(complexify).collect()
    }

    fn gradient_value(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        let idx: Vec<usize> = (0..self.nconf()).collect();
        let (grad, new) = self.electron_gradient_value(e, epos, &idx);
        let old = self.electron_value(e, &self.current_positions(e, &idx), &idx);
        let ratio = new
            .iter()
            .zip(&old)
            .map(|(n, o)| Scalar::new((n - o).exp(), 0.0))
            .collect();
        (grad.iter().map(complexify).collect(), ratio)
    }

    fn gradient_laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> (Vec<Vector3<Scalar>>, Vec<Scalar>) {
        let idx: Vec<usize> = (0..self.nconf()).collect();
        let (grad, lap) = self.electron_gradient_laplacian(e, epos, &idx);
        // ∇²J/J = ∇² ln J + |∇ ln J|²
        let lap = grad
            .iter()
            .zip(&lap)
            .map(|(g, l)| Scalar::new(l + g.norm_squared(), 0.0))
            .collect();
        (grad.iter().map(complexify).collect(), lap)
    }

    fn laplacian(&self, e: usize, epos: &[Vector3<f64>]) -> Vec<Scalar> {
        self.gradient_laplacian(e, epos).1
    }

    fn pgradient(&self) -> PGradient {
        let (asums, bsums) = self.basis_sums(&self.configs);
        let to_scalar = |s: Vec<f64>| -> Vec<Scalar> {
            s.into_iter().map(|v| Scalar::new(v, 0.0)).collect()
        };
        let mut pgrad = PGradient::new();
        for (k, s) in asums.into_iter().enumerate() {
            pgrad.insert(format!("acoeff{}", k), to_scalar(s));
        }
        for (k, s) in bsums.into_iter().enumerate() {
            pgrad.insert(format!("bcoeff{}", k), to_scalar(s));
        }
        pgrad
    }

    fn parameters(&self) -> ParamValues {
        let a = self.acoeff.iter().enumerate().map(|(k, &v)| (format!("acoeff{}", k), v));
        let b = self.bcoeff.iter().enumerate().map(|(k, &v)| (format!("bcoeff{}", k), v));
        a.chain(b).collect()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), QmcError> {
        let unknown = || QmcError::UnknownParameter(name.to_string());
        let (coeffs, k) = if let Some(k) = name.strip_prefix("acoeff") {
            (&mut self.acoeff, k)
        } else if let Some(k) = name.strip_prefix("bcoeff") {
            (&mut self.bcoeff, k)
        } else {
            return Err(unknown());
        };
        let k: usize = k.parse().map_err(|_| unknown())?;
        let slot = coeffs.get_mut(k).ok_or_else(unknown)?;
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radial::{CutoffCuspFunction, PadeFunction, PolyPadeFunction};
    use crate::wavefunction::testing::{
        numerical_gradient, numerical_laplacian, numerical_pgradient, testvalue_error,
    };
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn h2_jastrow() -> JastrowFactor {
        JastrowFactor::new(
            vec![Vector3::new(0.0, 0.0, 0.7), Vector3::new(0.0, 0.0, -0.7)],
            vec![PolyPadeFunction::new(1.0, 3.0).into(), PadeFunction::new(0.5).into()],
            vec![-0.4, 0.3],
            vec![CutoffCuspFunction::new(1.0, 4.0).into(), PolyPadeFunction::new(0.5, 2.5).into()],
            vec![0.5, 0.2],
        )
        .unwrap()
    }

    #[test]
    fn test_jastrow_rejects_mismatched_coefficients() {
        let err = JastrowFactor::electron_electron(vec![PadeFunction::new(1.0).into()], vec![]);
        assert!(matches!(err, Err(QmcError::LengthMismatch { .. })));
    }

    #[test]
    fn test_jastrow_two_electron_value() {
        let mut j = JastrowFactor::electron_electron(vec![PadeFunction::new(1.0).into()], vec![2.0])
            .unwrap();
        let configs = Configs::new(vec![vec![Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0)]]);
        let val = j.recompute(&configs);
        // b(1) = (1/2)^2
        assert_relative_eq!(val.logabs[0], 0.5, epsilon = 1e-14);
        assert_eq!(val.sign[0], Scalar::new(1.0, 0.0));
    }

    #[test]
    fn test_jastrow_testvalue_matches_recompute() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut j = h2_jastrow();
        let configs = Configs::random(8, 4, 1.0, &mut rng);
        for e in 0..4 {
            let epos = Configs::random(8, 1, 1.0, &mut rng).electron(0);
            let err = testvalue_error(&mut j, &configs, e, &epos);
            assert!(err < 1e-10, "electron {} error {}", e, err);
        }
    }

    #[test]
    fn test_jastrow_updateinternals_matches_recompute() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut j = h2_jastrow();
        let configs = Configs::random(6, 3, 1.0, &mut rng);
        j.recompute(&configs);
        let epos = Configs::random(6, 1, 1.0, &mut rng).electron(0);
        let mask = vec![true, false, true, true, false, true];
        j.updateinternals(1, &epos, &mask);
        let updated = j.value();
        let fresh = j.clone().recompute(&configs.moved(1, &epos, &mask));
        for c in 0..6 {
            assert_relative_eq!(updated.logabs[c], fresh.logabs[c], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_jastrow_gradient_laplacian_match_finite_difference() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut j = h2_jastrow();
        let configs = Configs::random(5, 3, 1.0, &mut rng);
        j.recompute(&configs);
        let epos = Configs::random(5, 1, 1.0, &mut rng).electron(0);
        let grad = j.gradient(2, &epos);
        let lap = j.laplacian(2, &epos);
        let num_grad = numerical_gradient(&j, 2, &epos, 1e-5);
        let num_lap = numerical_laplacian(&j, 2, &epos, 1e-4);
        for c in 0..5 {
            for d in 0..3 {
                assert_relative_eq!(grad[c][d].re, num_grad[c][d].re, epsilon = 1e-6);
            }
            assert_relative_eq!(lap[c].re, num_lap[c].re, epsilon = 1e-4);
        }
        let (g2, l2) = j.gradient_laplacian(2, &epos);
        let (g3, _) = j.gradient_value(2, &epos);
        assert_eq!(g2, grad);
        assert_eq!(g3, grad);
        assert_eq!(l2, lap);
    }

    #[test]
    fn test_jastrow_testvalue_many_agrees_with_testvalue() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut j = h2_jastrow();
        let configs = Configs::random(4, 3, 1.0, &mut rng);
        j.recompute(&configs);
        let candidates: Vec<Vec<Vector3<f64>>> = (0..4)
            .map(|_| Configs::random(1, 3, 1.0, &mut rng).electrons.remove(0))
            .collect();
        let mask = vec![true, true, false, true];
        let many = j.testvalue_many(0, &candidates, &mask);
        assert_eq!(many.len(), 3);
        for p in 0..3 {
            let epos: Vec<Vector3<f64>> = candidates.iter().map(|c| c[p]).collect();
            let single = j.testvalue(0, &epos, &mask);
            for n in 0..3 {
                assert_relative_eq!(many[n][p].re, single[n].re, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_jastrow_pgradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut j = h2_jastrow();
        let configs = Configs::random(6, 3, 1.0, &mut rng);
        j.recompute(&configs);
        let pgrad = j.pgradient();
        assert_eq!(pgrad.len(), 4);
        for (name, analytic) in &pgrad {
            let numeric = numerical_pgradient(&mut j, &configs, name, 1e-5);
            for c in 0..6 {
                assert_relative_eq!(analytic[c].re, numeric[c], epsilon = 1e-6);
            }
        }
        assert!(j.set_parameter("ccoeff0", 1.0).is_err());
        assert!(j.set_parameter("bcoeff7", 1.0).is_err());
    }
}
