use super::error::EngineError;
use super::{Engine, FlippingAlgorithm};
use crate::core::models::lattice::Lattice;
use crate::core::utils::vector;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, trace};

/// Single-site Metropolis sampler backed by a seeded ChaCha generator.
#[derive(Debug, Clone)]
pub struct MetropolisEngine {
    seed: u64,
    rng: ChaCha8Rng,
    algorithm: FlippingAlgorithm,
}

impl MetropolisEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            algorithm: FlippingAlgorithm::default(),
        }
    }

    /// An engine seeded from the thread-local entropy source.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().next_u64())
    }

    pub fn with_flipping_algorithm(mut self, algorithm: FlippingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    fn restart(&mut self, reseed: bool) {
        if reseed {
            self.reseed();
        } else {
            self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        }
    }

    fn step(&mut self, lattice: &mut Lattice, kt: f64) {
        let sites = lattice.site_indices();
        let a = sites[self.rng.gen_range(0..sites.len())];
        let (spin, _) = lattice.state(a);

        let new_spin = match self.algorithm {
            FlippingAlgorithm::UpDown => -spin,
            FlippingAlgorithm::ContinuousSpin => vector::random_on_sphere(&mut self.rng, spin.norm()),
        };
        let flux_magnitude = lattice.flux_bound(a) * self.rng.gen_range(0.0..1.0);
        let new_flux = vector::random_on_sphere(&mut self.rng, flux_magnitude);

        let update = lattice.evaluate_update(a, new_spin, new_flux);
        let du = update.energy_change();
        if du <= 0.0 || self.rng.gen_range(0.0..1.0) < (-du / kt).exp() {
            lattice.apply_update(&update);
        }
    }
}

impl Default for MetropolisEngine {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Engine for MetropolisEngine {
    fn seed(&self) -> u64 {
        self.seed
    }

    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    fn reseed(&mut self) -> u64 {
        let seed = rand::thread_rng().next_u64();
        self.set_seed(seed);
        debug!(seed, "Reseeded engine.");
        seed
    }

    fn flipping_algorithm(&self) -> FlippingAlgorithm {
        self.algorithm
    }

    fn set_flipping_algorithm(&mut self, algorithm: FlippingAlgorithm) {
        self.algorithm = algorithm;
    }

    #[instrument(level = "debug", skip_all, fields(steps = steps))]
    fn metropolis(&mut self, lattice: &mut Lattice, steps: u64) -> Result<(), EngineError> {
        if steps == 0 {
            return Ok(());
        }
        if lattice.site_indices().is_empty() {
            return Err(EngineError::EmptyLattice);
        }
        let kt = lattice.parameters().kt;
        if kt.is_nan() {
            return Err(EngineError::InvalidTemperature(kt));
        }
        for _ in 0..steps {
            self.step(lattice, kt);
        }
        lattice.advance_time(steps);
        trace!(t = lattice.results().t, u = lattice.results().u, "Batch finished.");
        Ok(())
    }

    fn randomize(&mut self, lattice: &mut Lattice, reseed: bool) {
        self.restart(reseed);
        lattice.randomize(&mut self.rng);
    }

    fn reinitialize(&mut self, lattice: &mut Lattice, reseed: bool) {
        self.restart(reseed);
        lattice.reinitialize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::geometry::LatticeBuilder;
    use crate::core::models::parameters::Results;

    fn lattice() -> Lattice {
        LatticeBuilder::new(6, 3, 3)
            .mol_len(2)
            .height_l(2)
            .depth_r(2)
            .build()
            .unwrap()
    }

    fn assert_consistent(lattice: &Lattice) {
        let fresh: Results = crate::core::hamiltonian::evaluate(lattice);
        let cached = lattice.results();
        assert!((fresh.u - cached.u).abs() < 1e-8, "{} != {}", fresh.u, cached.u);
        assert!((fresh.m - cached.m).norm() < 1e-8);
    }

    #[test]
    fn metropolis_advances_time_and_keeps_results_consistent() {
        let mut l = lattice();
        let mut p = *l.parameters();
        p.fl = 0.4;
        p.fr = 0.2;
        p.kt = 1.5;
        l.set_parameters(p);
        let mut engine = MetropolisEngine::new(1);
        engine.metropolis(&mut l, 500).unwrap();
        assert_eq!(l.results().t, 500);
        assert_consistent(&l);
    }

    #[test]
    fn same_seed_replays_the_same_trajectory() {
        let mut a = lattice();
        let mut b = lattice();
        let mut first = MetropolisEngine::new(42);
        let mut second = MetropolisEngine::new(42);
        first.metropolis(&mut a, 300).unwrap();
        second.metropolis(&mut b, 300).unwrap();
        assert_eq!(a, b);

        first.reinitialize(&mut a, false);
        first.metropolis(&mut a, 300).unwrap();
        assert_eq!(a.results(), b.results());
    }

    #[test]
    fn up_down_flips_preserve_magnitudes() {
        let mut l = lattice();
        let mut engine = MetropolisEngine::new(3).with_flipping_algorithm(FlippingAlgorithm::UpDown);
        engine.metropolis(&mut l, 200).unwrap();
        for site in l.sites().items() {
            assert!(site.spin.x.abs() < 1e-12 && site.spin.z.abs() < 1e-12);
            assert!((site.spin.y.abs() - 1.0).abs() < 1e-12);
        }
        assert_consistent(&l);
    }

    #[test]
    fn zero_temperature_never_raises_the_energy() {
        let mut l = lattice();
        let mut engine = MetropolisEngine::new(8);
        engine.randomize(&mut l, false);
        let mut p = *l.parameters();
        p.kt = 0.0;
        l.set_parameters(p);
        let mut previous = l.results().u;
        for _ in 0..20 {
            engine.metropolis(&mut l, 25).unwrap();
            assert!(l.results().u <= previous + 1e-9);
            previous = l.results().u;
        }
    }

    #[test]
    fn recorded_runs_append_one_sample_per_batch() {
        let mut l = lattice();
        let mut engine = MetropolisEngine::new(5);
        engine.metropolis_recorded(&mut l, 250, 100).unwrap();
        let times: Vec<u64> = l.record().samples().iter().map(|r| r.t).collect();
        assert_eq!(times, vec![100, 200, 250]);
    }

    #[test]
    fn nan_temperature_is_rejected() {
        let mut l = lattice();
        l.set_temperature(f64::NAN);
        let err = MetropolisEngine::new(0).metropolis(&mut l, 1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTemperature(_)));
    }

    #[test]
    fn randomize_without_reseed_replays_the_current_seed() {
        let mut engine = MetropolisEngine::new(10);
        let fresh = engine.reseed();
        assert_eq!(engine.seed(), fresh);
        engine.set_seed(77);
        assert_eq!(engine.seed(), 77);
        let mut a = lattice();
        engine.randomize(&mut a, false);
        let mut b = lattice();
        engine.randomize(&mut b, false);
        assert_eq!(a, b);
    }
}
