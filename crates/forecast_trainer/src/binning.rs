//! Quantile binning of feature columns for histogram split finding
//!
//! Each feature gets at most `max_bins - 1` cut points. A value falls into bin
//! `b` when exactly `b` cut points are strictly below it, so "bin <= b" is the
//! same predicate as "x <= cuts[b]" used by tree traversal.

/// Column-major binned copy of a feature matrix
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    n_rows: usize,
    cuts: Vec<Vec<f64>>,
    bins: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    pub fn from_rows(rows: &[Vec<f64>], max_bins: usize) -> Self {
        let n_rows = rows.len();
        let n_features = rows.first().map_or(0, Vec::len);
        let max_bins = max_bins.clamp(2, 256);

        let mut cuts = Vec::with_capacity(n_features);
        let mut bins = Vec::with_capacity(n_features);
        for f in 0..n_features {
            let column: Vec<f64> = rows.iter().map(|r| r[f]).collect();
            let feature_cuts = quantile_cuts(&column, max_bins);
            let feature_bins = column
                .iter()
                .map(|x| feature_cuts.partition_point(|c| c < x) as u8)
                .collect();
            cuts.push(feature_cuts);
            bins.push(feature_bins);
        }

        Self { n_rows, cuts, bins }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.cuts.len()
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }

    #[inline]
    pub fn bin(&self, feature: usize, row: usize) -> usize {
        self.bins[feature][row] as usize
    }

    /// Split threshold separating bins `..=bin` from the rest
    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.cuts[feature][bin]
    }
}

/// Cut points at data quantiles; never includes the column maximum
fn quantile_cuts(column: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Vec::new();
    }
    sorted.sort_by(f64::total_cmp);
    let max = sorted[sorted.len() - 1];

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() <= max_bins {
        distinct.pop();
        return distinct;
    }

    let n = sorted.len();
    let mut cuts: Vec<f64> = Vec::with_capacity(max_bins - 1);
    for q in 1..max_bins {
        let v = sorted[(q * n) / max_bins];
        if v < max && cuts.last().map_or(true, |last| *last < v) {
            cuts.push(v);
        }
    }
    cuts
}
