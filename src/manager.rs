use crate::config::Config;
use crate::model::SPIN_MARKER;
use crate::spin::SpinAverager;
use crate::store::{DirStore, Store};
use crate::synth::Synthesizer;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct Manager {
    store_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(store_dir: P) -> Result<Self> {
        let store_dir = store_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(store_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { store_dir, cfg })
    }

    fn open_store(&self) -> Result<DirStore> {
        DirStore::new(&self.store_dir)
            .with_context(|| format!("failed to open store {:?}", self.store_dir))
    }

    pub fn synthesize(&self) -> Result<()> {
        let mut store = self.open_store()?;

        let mut synth = Synthesizer::new(self.cfg.synth.clone());
        let names = synth
            .write_target(&self.cfg.target, &mut store)
            .context("failed to write synthetic telemetry")?;
        for name in names {
            log::info!("created {name:?}");
        }

        Ok(())
    }

    pub fn spin_average(&self) -> Result<()> {
        let mut store = self.open_store()?;

        let averager = SpinAverager::new(self.cfg.target.clone());
        log::info!("lower energy channel: {}", averager.lower_energy_channel());

        let name = averager
            .run(&mut store)
            .context("failed to spin-average flux")?;
        let var = store.get(&name)?;
        log::info!("created {name:?}: {}", var.describe());

        Ok(())
    }

    pub fn list_vars(&self) -> Result<()> {
        let store = self.open_store()?;

        for name in store.names().context("failed to list variables")? {
            let var = store.get(&name)?;
            log::info!("{name}: {}", var.describe());
        }

        Ok(())
    }

    pub fn clean_vars(&self) -> Result<()> {
        let mut store = self.open_store()?;

        let flux_name = self.cfg.target.flux_name();
        let spin_prefix = format!("{flux_name}{SPIN_MARKER}");
        for name in store.names().context("failed to list variables")? {
            if !name.starts_with(&spin_prefix) {
                continue;
            }
            store
                .remove(&name)
                .with_context(|| format!("failed to remove {name:?}"))?;
            log::info!("removed {name:?}");
        }

        Ok(())
    }
}
