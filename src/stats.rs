use ndarray::{Array1, ArrayView2, Axis};

/// Running mean that skips missing values.
///
/// Any non-finite value counts as missing.
pub struct Accumulator {
    n_vals: usize,
    sum: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self { n_vals: 0, sum: 0.0 }
    }

    pub fn add(&mut self, val: f64) {
        if !val.is_finite() {
            return;
        }
        self.n_vals += 1;
        self.sum += val;
    }

    /// Mean of the values added so far, or `NaN` if there are none.
    pub fn mean(&self) -> f64 {
        if self.n_vals == 0 {
            return f64::NAN;
        }
        self.sum / self.n_vals as f64
    }
}

/// Mean of each column of `mat`, ignoring missing values.
pub fn nan_mean_cols(mat: ArrayView2<f64>) -> Array1<f64> {
    mat.axis_iter(Axis(1))
        .map(|col| {
            let mut acc = Accumulator::new();
            col.iter().for_each(|&val| acc.add(val));
            acc.mean()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn skips_non_finite_values() {
        let mut acc = Accumulator::new();
        for val in [2.0, f64::NAN, f64::INFINITY, 4.0, f64::NEG_INFINITY] {
            acc.add(val);
        }
        assert_eq!(acc.mean(), 3.0);
    }

    #[test]
    fn all_missing_is_nan() {
        let mut acc = Accumulator::new();
        assert!(acc.mean().is_nan());
        acc.add(f64::NAN);
        assert!(acc.mean().is_nan());
    }

    #[test]
    fn column_means() {
        let mat = array![[1.0, f64::NAN, 5.0], [3.0, f64::NAN, f64::NAN]];
        let means = nan_mean_cols(mat.view());
        assert_eq!(means.len(), 3);
        assert_eq!(means[0], 2.0);
        assert!(means[1].is_nan());
        assert_eq!(means[2], 5.0);
    }
}
