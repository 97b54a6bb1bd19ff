use crate::model::Target;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Variables to spin-average.
    pub target: Target,
    /// Synthetic telemetry parameters.
    pub synth: SynthConfig,
}

/// Parameters of the synthetic telemetry generator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
    /// Random number generator seed.
    pub seed: u64,

    /// Number of spins (the first one is partial).
    pub n_spins: usize,
    /// Number of sectors per spin.
    pub sectors_per_spin: usize,
    /// Sector number of the first sample.
    pub first_sector: usize,

    /// Time between samples (seconds).
    pub sample_period: f64,
    /// Time of the first sample (seconds).
    pub start_time: f64,

    /// Energy channel labels (keV).
    pub energies: Vec<f64>,
    /// Flux at 1 keV.
    pub flux_scale: f64,
    /// Standard deviation of the log-normal flux noise.
    pub flux_std_dev: f64,
    /// Probability of a value being replaced with a fill value.
    pub prob_fill: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_spins: 16,
            sectors_per_spin: 12,
            first_sector: 5,
            sample_period: 1.6,
            start_time: 1.4501e9,
            energies: vec![51.0, 70.0, 95.0, 120.0],
            flux_scale: 1.0e6,
            flux_std_dev: 0.3,
            prob_fill: 0.05,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded; missing fields take their default value.
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_target(&self.target).context("invalid target")?;
        check_synth(&self.synth).context("invalid synth")?;
        Ok(())
    }
}

fn check_target(target: &Target) -> Result<()> {
    let probe: usize = target
        .probe
        .parse()
        .with_context(|| format!("probe must be a number, but is {:?}", target.probe))?;
    check_num(probe, 1..=4).context("invalid probe")?;

    check_tag(&target.level, false).context("invalid level")?;
    check_tag(&target.suffix, true).context("invalid suffix")?;

    Ok(())
}

fn check_synth(synth: &SynthConfig) -> Result<()> {
    check_num(synth.n_spins, 1..100_000).context("invalid number of spins")?;
    check_num(synth.sectors_per_spin, 2..10_000).context("invalid number of sectors per spin")?;
    check_num(synth.first_sector, 0..synth.sectors_per_spin).context("invalid first sector")?;

    check_num(synth.sample_period, f64::MIN_POSITIVE..1.0e3).context("invalid sample period")?;
    check_num(synth.start_time, 0.0..1.0e10).context("invalid start time")?;

    check_energies(&synth.energies).context("invalid energies")?;
    check_num(synth.flux_scale, f64::MIN_POSITIVE..1.0e12).context("invalid flux scale")?;
    check_num(synth.flux_std_dev, 0.0..10.0).context("invalid flux standard deviation")?;
    check_num(synth.prob_fill, 0.0..1.0).context("invalid fill probability")?;

    Ok(())
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_tag(tag: &str, allow_empty: bool) -> Result<()> {
    if tag.is_empty() && !allow_empty {
        bail!("tag must not be empty");
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!("tag must only contain ASCII letters, digits, '_' or '-', but is {tag:?}");
    }
    Ok(())
}

fn check_energies(energies: &[f64]) -> Result<()> {
    check_num(energies.len(), 1..1_000).context("invalid number of energies")?;
    // Energies must be positive and strictly increasing.
    if energies.iter().any(|&ele| !(ele > 0.0 && ele.is_finite())) {
        bail!("energies must be positive and finite");
    }
    if energies.windows(2).any(|pair| pair[0] >= pair[1]) {
        bail!("energies must be strictly increasing");
    }
    Ok(())
}
