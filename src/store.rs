//! Named time-series variables and the stores that hold them.

use anyhow::{Context, Result, bail};
use glob::glob;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use serde_value::Value;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Sample values of a [`Variable`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Values {
    /// One integer per sample.
    Counter(Array1<i64>),
    /// Matrix `samples x channels` with one label per channel.
    Spectrum { y: Array2<f64>, v: Array1<f64> },
}

/// Time series stored under a name, with its display options.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub times: Array1<f64>,
    pub values: Values,
    pub options: BTreeMap<String, Value>,
}

impl Variable {
    pub fn counter(times: Array1<f64>, counts: Array1<i64>) -> Self {
        Self {
            times,
            values: Values::Counter(counts),
            options: BTreeMap::new(),
        }
    }

    pub fn spectrum(times: Array1<f64>, y: Array2<f64>, v: Array1<f64>) -> Self {
        Self {
            times,
            values: Values::Spectrum { y, v },
            options: BTreeMap::new(),
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn as_counter(&self) -> Result<ArrayView1<'_, i64>> {
        match &self.values {
            Values::Counter(counts) => Ok(counts.view()),
            Values::Spectrum { .. } => bail!("variable holds a spectrum, not a counter"),
        }
    }

    pub fn as_spectrum(&self) -> Result<(ArrayView2<'_, f64>, ArrayView1<'_, f64>)> {
        match &self.values {
            Values::Spectrum { y, v } => Ok((y.view(), v.view())),
            Values::Counter(_) => bail!("variable holds a counter, not a spectrum"),
        }
    }

    /// Short description of the shape, for logging.
    pub fn describe(&self) -> String {
        match &self.values {
            Values::Counter(_) => format!("counter [{}]", self.len()),
            Values::Spectrum { y, .. } => format!("spectrum [{} x {}]", y.nrows(), y.ncols()),
        }
    }

    fn validate(&self) -> Result<()> {
        let n_times = self.times.len();
        match &self.values {
            Values::Counter(counts) => {
                let len = counts.len();
                if len != n_times {
                    bail!("counter length must be {n_times}, but is {len}");
                }
            }
            Values::Spectrum { y, v } => {
                let dim = y.dim();
                let exp_dim = (n_times, v.len());
                if dim != exp_dim {
                    bail!("spectrum shape must be {exp_dim:?}, but is {dim:?}");
                }
            }
        }
        Ok(())
    }
}

/// Key-value store of named variables.
pub trait Store {
    /// Get a copy of the variable stored under `name`.
    fn get(&self, name: &str) -> Result<Variable>;

    /// Store `var` under `name`, replacing any previous variable.
    fn put(&mut self, name: &str, var: Variable) -> Result<()>;

    /// Set a display option of an existing variable.
    fn set_option(&mut self, name: &str, key: &str, value: Value) -> Result<()> {
        let mut var = self.get(name)?;
        var.options.insert(key.to_string(), value);
        self.put(name, var)
    }

    /// Sorted names of all stored variables.
    fn names(&self) -> Result<Vec<String>>;

    fn remove(&mut self, name: &str) -> Result<()>;
}

/// Store keeping every variable in memory.
#[derive(Debug, Default)]
pub struct MemStore {
    var_map: BTreeMap<String, Variable>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn get(&self, name: &str) -> Result<Variable> {
        self.var_map
            .get(name)
            .cloned()
            .with_context(|| format!("variable {name:?} not found"))
    }

    fn put(&mut self, name: &str, var: Variable) -> Result<()> {
        var.validate()
            .with_context(|| format!("invalid variable {name:?}"))?;
        self.var_map.insert(name.to_string(), var);
        Ok(())
    }

    fn set_option(&mut self, name: &str, key: &str, value: Value) -> Result<()> {
        let var = self
            .var_map
            .get_mut(name)
            .with_context(|| format!("variable {name:?} not found"))?;
        var.options.insert(key.to_string(), value);
        Ok(())
    }

    fn names(&self) -> Result<Vec<String>> {
        Ok(self.var_map.keys().cloned().collect())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        self.var_map
            .remove(name)
            .with_context(|| format!("variable {name:?} not found"))?;
        Ok(())
    }
}

/// Store keeping one MessagePack file per variable in a directory.
#[derive(Debug)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            bail!("{dir:?} is not a directory");
        }
        Ok(Self { dir })
    }

    fn var_file(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) {
            bail!("invalid variable name {name:?}");
        }
        Ok(self.dir.join(format!("{name}.msgpack")))
    }
}

impl Store for DirStore {
    fn get(&self, name: &str) -> Result<Variable> {
        let file = self.var_file(name)?;
        let file = File::open(&file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let var = decode::from_read(&mut reader)
            .with_context(|| format!("failed to deserialize variable {name:?}"))?;
        Ok(var)
    }

    fn put(&mut self, name: &str, var: Variable) -> Result<()> {
        var.validate()
            .with_context(|| format!("invalid variable {name:?}"))?;

        let file = self.var_file(name)?;
        let file = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &var)
            .with_context(|| format!("failed to serialize variable {name:?}"))?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    fn names(&self) -> Result<Vec<String>> {
        let pattern = self.dir.join("*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut names: Vec<_> = glob(pattern)
            .context("failed to glob variable files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .filter_map(|p| Some(p.file_stem()?.to_str()?.to_string()))
            .collect();
        names.sort();
        Ok(names)
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        let file = self.var_file(name)?;
        fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::env;

    fn sample_spectrum() -> Variable {
        Variable::spectrum(
            array![0.0, 1.0],
            array![[1.0, f64::NAN], [3.0, 4.0]],
            array![51.0, 70.0],
        )
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("feeps-spin-{name}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).expect("failed to create test directory");
        dir
    }

    #[test]
    fn put_rejects_mismatched_shapes() {
        let mut store = MemStore::new();
        let var = Variable::counter(array![0.0, 1.0, 2.0], array![0, 1]);
        assert!(store.put("bad", var).is_err());

        let var = Variable::spectrum(array![0.0], array![[1.0, 2.0]], array![51.0]);
        assert!(store.put("bad", var).is_err());
        assert!(store.names().unwrap().is_empty());
    }

    #[test]
    fn mem_store_overwrites_and_sets_options() {
        let mut store = MemStore::new();
        store.put("flux", sample_spectrum()).unwrap();
        store
            .set_option("flux", "ylog", Value::Bool(true))
            .unwrap();
        assert_eq!(store.get("flux").unwrap().options["ylog"], Value::Bool(true));

        store.put("flux", sample_spectrum()).unwrap();
        assert!(store.get("flux").unwrap().options.is_empty());
        assert_eq!(store.names().unwrap(), vec!["flux".to_string()]);
    }

    #[test]
    fn unknown_names_are_errors() {
        let mut store = MemStore::new();
        assert!(store.get("missing").is_err());
        assert!(store.set_option("missing", "spec", Value::Bool(true)).is_err());
        assert!(store.remove("missing").is_err());
    }

    #[test]
    fn variable_kind_is_checked() {
        let var = sample_spectrum();
        assert!(var.as_counter().is_err());
        let (y, v) = var.as_spectrum().unwrap();
        assert_eq!(y.dim(), (2, 2));
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn dir_store_persists_variables() {
        let dir = test_dir("persist");

        let mut store = DirStore::new(&dir).unwrap();
        store
            .put("sect", Variable::counter(array![0.0, 1.0], array![3, 0]))
            .unwrap();
        store.put("flux", sample_spectrum()).unwrap();
        store
            .set_option("flux", "Colormap", Value::String("jet".to_string()))
            .unwrap();

        let store = DirStore::new(&dir).unwrap();
        assert_eq!(store.names().unwrap(), vec!["flux", "sect"]);
        assert_eq!(store.get("sect").unwrap().as_counter().unwrap(), array![3, 0]);

        let flux = store.get("flux").unwrap();
        let (y, _) = flux.as_spectrum().unwrap();
        assert!(y[[0, 1]].is_nan());
        assert_eq!(y[[1, 0]], 3.0);
        assert_eq!(
            flux.options["Colormap"],
            Value::String("jet".to_string())
        );

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dir_store_removes_and_rejects_paths() {
        let dir = test_dir("remove");

        let mut store = DirStore::new(&dir).unwrap();
        store.put("flux", sample_spectrum()).unwrap();
        store.remove("flux").unwrap();
        assert!(store.names().unwrap().is_empty());
        assert!(store.get("flux").is_err());
        assert!(store.put("../flux", sample_spectrum()).is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
