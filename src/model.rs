use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical units of the omni-directional flux.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataUnits {
    #[default]
    Intensity,
    CountRate,
}

impl DataUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intensity => "intensity",
            Self::CountRate => "count_rate",
        }
    }
}

/// Particle species measured by the instrument.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datatype {
    #[default]
    Electron,
    Ion,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electron => "electron",
            Self::Ion => "ion",
        }
    }

    /// Index of the lowest energy channel considered valid for this species.
    pub fn lower_energy_channel(&self) -> usize {
        match self {
            Self::Electron => 71,
            Self::Ion => 78,
        }
    }
}

/// Instrument data rate.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRate {
    /// Survey.
    #[default]
    Srvy,
    /// Burst.
    Brst,
}

impl DataRate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Srvy => "srvy",
            Self::Brst => "brst",
        }
    }
}

macro_rules! impl_display {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display!(DataUnits, Datatype, DataRate);

/// Selection of the FEEPS variables to operate on.
///
/// The fields only parameterize variable names; see [`Target::sector_name`],
/// [`Target::flux_name`] and [`Target::spin_name`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Target {
    /// Spacecraft number, e.g. `"4"` for MMS4.
    pub probe: String,
    pub data_units: DataUnits,
    pub datatype: Datatype,
    pub data_rate: DataRate,
    /// Data level, e.g. `"l2"`.
    pub level: String,
    /// Suffix of the loaded data.
    pub suffix: String,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            probe: "1".to_string(),
            data_units: DataUnits::default(),
            datatype: Datatype::default(),
            data_rate: DataRate::default(),
            level: "l2".to_string(),
            suffix: String::new(),
        }
    }
}

impl Target {
    fn prefix(&self) -> String {
        format!(
            "mms{}_epd_feeps_{}_{}_{}_",
            self.probe, self.data_rate, self.level, self.datatype
        )
    }

    /// Name of the spin sector counter variable.
    pub fn sector_name(&self) -> String {
        format!("{}spinsectnum{}", self.prefix(), self.suffix)
    }

    /// Name of the omni-directional flux variable.
    pub fn flux_name(&self) -> String {
        format!("{}{}_omni", self.prefix(), self.data_units)
    }

    /// Name of the spin-averaged flux variable.
    pub fn spin_name(&self) -> String {
        format!("{}{SPIN_MARKER}{}", self.flux_name(), self.suffix)
    }
}

/// Token appended to the flux name to form the spin-averaged name.
pub const SPIN_MARKER: &str = "_spin";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names() {
        let target = Target::default();
        assert_eq!(
            target.sector_name(),
            "mms1_epd_feeps_srvy_l2_electron_spinsectnum"
        );
        assert_eq!(
            target.flux_name(),
            "mms1_epd_feeps_srvy_l2_electron_intensity_omni"
        );
        assert_eq!(
            target.spin_name(),
            "mms1_epd_feeps_srvy_l2_electron_intensity_omni_spin"
        );
    }

    #[test]
    fn suffix_is_not_part_of_flux_name() {
        let target = Target {
            probe: "4".to_string(),
            data_units: DataUnits::CountRate,
            datatype: Datatype::Ion,
            data_rate: DataRate::Brst,
            level: "l1b".to_string(),
            suffix: "_v2".to_string(),
        };
        assert_eq!(
            target.sector_name(),
            "mms4_epd_feeps_brst_l1b_ion_spinsectnum_v2"
        );
        assert_eq!(
            target.flux_name(),
            "mms4_epd_feeps_brst_l1b_ion_count_rate_omni"
        );
        assert_eq!(
            target.spin_name(),
            "mms4_epd_feeps_brst_l1b_ion_count_rate_omni_spin_v2"
        );
    }

    #[test]
    fn energy_thresholds() {
        assert_eq!(Datatype::Electron.lower_energy_channel(), 71);
        assert_eq!(Datatype::Ion.lower_energy_channel(), 78);
    }
}
