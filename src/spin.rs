//! Spin averaging of omni-directional energy spectra.
//!
//! The spin sector counter increases within a spin and wraps at the start of
//! the next one. Flux samples between consecutive wraps are averaged per
//! energy channel, skipping missing values.

use crate::model::Target;
use crate::stats::nan_mean_cols;
use crate::store::{Store, Variable};
use anyhow::{Context, Result, bail};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};
use serde_value::Value;

/// Spin-averaged spectra, one row per spin.
#[derive(Debug, PartialEq)]
pub struct SpinAveraged {
    /// Start time of each spin.
    pub times: Array1<f64>,
    /// Averaged flux (matrix `n_spins x n_energies`).
    pub flux: Array2<f64>,
    /// Energy channel labels.
    pub energies: Array1<f64>,
}

impl SpinAveraged {
    pub fn n_spins(&self) -> usize {
        self.flux.nrows()
    }

    fn into_variable(self) -> Variable {
        Variable::spectrum(self.times, self.flux, self.energies)
    }
}

/// Indices of the samples where the sector counter wraps.
///
/// A new spin starts at `i + 1` whenever `sectors[i] >= sectors[i + 1]`.
pub fn find_spin_starts(sectors: ArrayView1<i64>) -> Vec<usize> {
    sectors
        .iter()
        .zip(sectors.iter().skip(1))
        .enumerate()
        .filter(|(_, (prev, next))| prev >= next)
        .map(|(i_sample, _)| i_sample + 1)
        .collect()
}

/// Average `flux` over the spins delimited by `spin_starts`.
///
/// Row `k` averages samples `spin_starts[0]..=spin_starts[1]` for `k = 0`
/// and `spin_starts[k] + 1..=spin_starts[k + 1]` afterwards, and is stamped
/// with `times[spin_starts[k]]`. The last two spin starts only close
/// intervals, so there are `spin_starts.len() - 2` rows (none if fewer than
/// three starts are given).
pub fn average_spins(
    times: ArrayView1<f64>,
    flux: ArrayView2<f64>,
    energies: ArrayView1<f64>,
    spin_starts: &[usize],
) -> Result<SpinAveraged> {
    let n_spins = spin_starts.len().saturating_sub(2);
    let n_samples = flux.nrows();

    let mut spin_times = Array1::zeros(n_spins);
    let mut spin_flux = Array2::from_elem((n_spins, flux.ncols()), f64::NAN);

    let mut i_first = spin_starts.first().copied().unwrap_or_default();
    for (i_spin, pair) in spin_starts.windows(2).take(n_spins).enumerate() {
        let (i_start, i_last) = (pair[0], pair[1]);
        if i_last >= n_samples {
            bail!("spin boundary {i_last} is out of range for {n_samples} flux samples");
        }
        if i_last < i_first {
            bail!("spin boundaries must be strictly increasing");
        }

        spin_times[i_spin] = *times
            .get(i_start)
            .with_context(|| format!("no flux time for spin boundary {i_start}"))?;

        let spin_mean = nan_mean_cols(flux.slice(s![i_first..=i_last, ..]));
        spin_flux.row_mut(i_spin).assign(&spin_mean);

        i_first = i_last + 1;
    }

    Ok(SpinAveraged {
        times: spin_times,
        flux: spin_flux,
        energies: energies.to_owned(),
    })
}

/// Display options attached to every spin-averaged variable.
fn display_options() -> [(&'static str, Value); 4] {
    [
        ("spec", Value::Bool(true)),
        ("ylog", Value::Bool(true)),
        ("zlog", Value::Bool(true)),
        ("Colormap", Value::String("jet".to_string())),
    ]
}

/// Spin averager for one set of FEEPS variables.
pub struct SpinAverager {
    target: Target,
}

impl SpinAverager {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    /// Lowest valid energy channel for the target species.
    ///
    /// Reported only; the averaged spectra keep every channel.
    pub fn lower_energy_channel(&self) -> usize {
        self.target.datatype.lower_energy_channel()
    }

    /// Spin-average the target flux held in `store`.
    ///
    /// Stores the result under [`Target::spin_name`], replacing any previous
    /// value, and returns that name.
    pub fn run<S: Store + ?Sized>(&self, store: &mut S) -> Result<String> {
        log::debug!("lower energy channel: {}", self.lower_energy_channel());

        let sector_name = self.target.sector_name();
        let sectors = store
            .get(&sector_name)
            .context("failed to get spin sectors")?;
        let spin_starts = find_spin_starts(
            sectors
                .as_counter()
                .with_context(|| format!("invalid {sector_name:?}"))?,
        );
        log::debug!("found {} spin starts", spin_starts.len());

        let flux_name = self.target.flux_name();
        let flux = store.get(&flux_name).context("failed to get flux")?;
        let (y, v) = flux
            .as_spectrum()
            .with_context(|| format!("invalid {flux_name:?}"))?;
        if sectors.len() != flux.len() {
            log::warn!(
                "{sector_name:?} has {} samples but {flux_name:?} has {}",
                sectors.len(),
                flux.len()
            );
        }

        let averaged = average_spins(flux.times.view(), y, v, &spin_starts)
            .context("failed to average spins")?;
        let n_spins = averaged.n_spins();

        let spin_name = self.target.spin_name();
        store
            .put(&spin_name, averaged.into_variable())
            .with_context(|| format!("failed to store {spin_name:?}"))?;
        for (key, value) in display_options() {
            store
                .set_option(&spin_name, key, value)
                .with_context(|| format!("failed to set option {key:?}"))?;
        }
        log::info!("stored {spin_name:?} ({n_spins} spins)");

        Ok(spin_name)
    }
}
