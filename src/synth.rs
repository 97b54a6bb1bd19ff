use crate::config::SynthConfig;
use crate::model::Target;
use crate::store::{Store, Variable};
use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Bernoulli, LogNormal};

/// Synthetic telemetry generator.
///
/// Produces a spin sector counter and an omni-directional flux with a
/// power-law spectrum, log-normal noise and randomly dropped values.
pub struct Synthesizer {
    cfg: SynthConfig,
    rng: ChaCha12Rng,
}

impl Synthesizer {
    /// Create a new `Synthesizer` seeded from the configuration.
    pub fn new(cfg: SynthConfig) -> Self {
        let rng = ChaCha12Rng::seed_from_u64(cfg.seed);
        Self { cfg, rng }
    }

    fn n_samples(&self) -> usize {
        self.cfg.n_spins * self.cfg.sectors_per_spin - self.cfg.first_sector
    }

    fn generate_times(&self) -> Array1<f64> {
        (0..self.n_samples())
            .map(|i_sample| self.cfg.start_time + i_sample as f64 * self.cfg.sample_period)
            .collect()
    }

    fn generate_sectors(&self) -> Array1<i64> {
        (0..self.n_samples())
            .map(|i_sample| ((self.cfg.first_sector + i_sample) % self.cfg.sectors_per_spin) as i64)
            .collect()
    }

    fn generate_flux(&mut self) -> Result<Array2<f64>> {
        let noise_dist = LogNormal::new(0.0, self.cfg.flux_std_dev)?;
        let fill_dist = Bernoulli::new(self.cfg.prob_fill)?;

        let n_samples = self.n_samples();
        let energies = &self.cfg.energies;
        let flux_scale = self.cfg.flux_scale;
        let rng = &mut self.rng;
        let flux = Array2::from_shape_fn(
            (n_samples, energies.len()),
            |(_, i_energy)| {
                // Dropped samples become fill values.
                if fill_dist.sample(rng) {
                    return f64::NAN;
                }
                flux_scale * energies[i_energy].powi(-2) * noise_dist.sample(rng)
            },
        );

        Ok(flux)
    }

    /// Generate the sector counter and flux variables.
    pub fn generate(&mut self) -> Result<(Variable, Variable)> {
        let times = self.generate_times();
        let sectors = Variable::counter(times.clone(), self.generate_sectors());

        let flux = self.generate_flux().context("failed to generate flux")?;
        let energies = Array1::from_vec(self.cfg.energies.clone());
        let flux = Variable::spectrum(times, flux, energies);

        Ok((sectors, flux))
    }

    /// Generate the input variables of `target` and write them to `store`.
    ///
    /// Returns the names of the written variables.
    pub fn write_target<S: Store + ?Sized>(
        &mut self,
        target: &Target,
        store: &mut S,
    ) -> Result<Vec<String>> {
        let (sectors, flux) = self.generate()?;

        let sector_name = target.sector_name();
        store
            .put(&sector_name, sectors)
            .with_context(|| format!("failed to store {sector_name:?}"))?;

        let flux_name = target.flux_name();
        store
            .put(&flux_name, flux)
            .with_context(|| format!("failed to store {flux_name:?}"))?;

        Ok(vec![sector_name, flux_name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spin::find_spin_starts;
    use crate::store::MemStore;

    fn small_cfg() -> SynthConfig {
        SynthConfig {
            n_spins: 3,
            sectors_per_spin: 4,
            first_sector: 2,
            sample_period: 0.5,
            start_time: 10.0,
            energies: vec![10.0, 20.0],
            ..SynthConfig::default()
        }
    }

    #[test]
    fn sectors_wrap_once_per_spin() {
        let (sectors, flux) = Synthesizer::new(small_cfg()).generate().unwrap();
        let counts = sectors.as_counter().unwrap();
        assert_eq!(counts.to_vec(), vec![2, 3, 0, 1, 2, 3, 0, 1, 2, 3]);
        assert_eq!(find_spin_starts(counts), vec![2, 6]);

        assert_eq!(sectors.times, flux.times);
        assert_eq!(sectors.times[0], 10.0);
        assert_eq!(sectors.times[9], 14.5);

        let (y, v) = flux.as_spectrum().unwrap();
        assert_eq!(y.dim(), (10, 2));
        assert_eq!(v.to_vec(), vec![10.0, 20.0]);
    }

    #[test]
    fn same_seed_same_flux() {
        let (_, flux_a) = Synthesizer::new(small_cfg()).generate().unwrap();
        let (_, flux_b) = Synthesizer::new(small_cfg()).generate().unwrap();
        let (y_a, _) = flux_a.as_spectrum().unwrap();
        let (y_b, _) = flux_b.as_spectrum().unwrap();
        for (a, b) in y_a.iter().zip(y_b.iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn fill_probability_bounds() {
        let cfg = SynthConfig {
            prob_fill: 0.0,
            ..small_cfg()
        };
        let (_, flux) = Synthesizer::new(cfg).generate().unwrap();
        let (y, _) = flux.as_spectrum().unwrap();
        assert!(y.iter().all(|val| val.is_finite() && *val > 0.0));
    }

    #[test]
    fn writes_target_inputs() {
        let target = Target::default();
        let mut store = MemStore::new();
        let names = Synthesizer::new(small_cfg())
            .write_target(&target, &mut store)
            .unwrap();
        assert_eq!(names, vec![target.sector_name(), target.flux_name()]);
        assert_eq!(store.names().unwrap().len(), 2);
    }
}
