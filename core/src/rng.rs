//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulator may call any platform RNG.
//! All randomness flows through SimRng instances derived from the
//! single master seed stored on the run record.
//!
//! Each company gets its own RNG stream, seeded deterministically
//! from (master_seed XOR stream_index). This means:
//!   - Companies can be simulated on any thread, in any order, and
//!     still produce the same losses.
//!   - Adding companies never changes existing companies' streams.

use crate::types::CompanyId;
use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, Poisson, StandardNormal};
use rand_pcg::Pcg64Mcg;

/// Source of the two variates the loss model needs.
///
/// The simulator only ever draws through this trait, so tests can
/// script exact attack counts and costs.
pub trait LossSampler {
    /// Number of attacks in one run: Poisson with the given mean.
    fn attack_count(&mut self, frequency: f64) -> u64;

    /// Cost of one attack: Normal(mean, std_dev).
    fn attack_cost(&mut self, mean: f64, std_dev: f64) -> f64;
}

/// A named, deterministic RNG for a single stream.
pub struct SimRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SimRng {
    /// Create an RNG from the master seed and a stable stream index.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Stand-alone stream for one-off simulations.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(seed, 0).with_name("adhoc")
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a float in [low, high).
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Poisson draw. A zero (or negative) mean always yields zero events.
    pub fn poisson(&mut self, lambda: f64) -> u64 {
        if lambda <= 0.0 {
            return 0;
        }
        match Poisson::new(lambda) {
            Ok(dist) => {
                let k: f64 = dist.sample(&mut self.inner);
                k as u64
            }
            Err(e) => {
                log::warn!("rng[{}]: poisson({lambda}) rejected: {e}", self.name);
                0
            }
        }
    }

    /// Normal draw via the standard normal ziggurat.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let z: f64 = StandardNormal.sample(&mut self.inner);
        mean + std_dev * z
    }
}

impl LossSampler for SimRng {
    fn attack_count(&mut self, frequency: f64) -> u64 {
        self.poisson(frequency)
    }

    fn attack_cost(&mut self, mean: f64, std_dev: f64) -> f64 {
        self.normal(mean, std_dev)
    }
}

/// All RNG streams for a single analysis run.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

/// Stable stream assignments. Company ids start at 1, so stream 0 is
/// free for population generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RngStream {
    Population,
    Company(CompanyId),
}

impl RngStream {
    pub fn index(&self) -> u64 {
        match self {
            Self::Population  => 0,
            Self::Company(id) => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Company(_) => "company",
        }
    }
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_stream(&self, stream: RngStream) -> SimRng {
        SimRng::new(self.master_seed, stream.index()).with_name(stream.name())
    }

    pub fn for_company(&self, company_id: CompanyId) -> SimRng {
        self.for_stream(RngStream::Company(company_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let bank = RngBank::new(12345);
        let mut a = bank.for_company(7);
        let mut b = bank.for_company(7);
        for _ in 0..50 {
            assert_eq!(a.poisson(3.0), b.poisson(3.0));
            assert_eq!(a.normal(10.0, 1.0), b.normal(10.0, 1.0));
        }
    }

    #[test]
    fn company_streams_differ() {
        let bank = RngBank::new(12345);
        let a: Vec<f64> = {
            let mut r = bank.for_company(1);
            (0..20).map(|_| r.next_f64()).collect()
        };
        let b: Vec<f64> = {
            let mut r = bank.for_company(2);
            (0..20).map(|_| r.next_f64()).collect()
        };
        assert_ne!(a, b);
    }

    #[test]
    fn zero_frequency_means_no_attacks() {
        let mut r = SimRng::from_seed(1);
        for _ in 0..100 {
            assert_eq!(r.poisson(0.0), 0);
        }
    }

    #[test]
    fn poisson_sample_mean_is_close_to_lambda() {
        let mut r = SimRng::from_seed(99);
        let n = 20_000;
        let total: u64 = (0..n).map(|_| r.poisson(2.5)).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 2.5).abs() < 0.1, "sample mean {mean}");
    }

    #[test]
    fn normal_with_zero_dispersion_is_constant() {
        let mut r = SimRng::from_seed(3);
        assert_eq!(r.normal(4.2, 0.0), 4.2);
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut r = SimRng::from_seed(5);
        for _ in 0..1000 {
            let x = r.uniform(1.0, 1000.0);
            assert!((1.0..1000.0).contains(&x));
        }
    }
}
