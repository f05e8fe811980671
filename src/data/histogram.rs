use super::model::{
    Histogram1D, Histogram2D, Histogram2DStack, HistogramSpec, TransformedDataset,
    TransformedSamples, TransformedTrace, TRACE_VALUE_DOMAIN,
};

// ---------------------------------------------------------------------------
// Bin axis
// ---------------------------------------------------------------------------

/// Equal-width binning of `[lower, upper)`, or `[lower, upper]` when `closed`.
#[derive(Debug, Clone, Copy)]
struct BinAxis {
    lower: f64,
    upper: f64,
    bins: usize,
    closed: bool,
}

impl BinAxis {
    fn half_open(lower: f64, upper: f64, bins: usize) -> Self {
        BinAxis {
            lower,
            upper,
            bins,
            closed: false,
        }
    }

    fn closed(lower: f64, upper: f64, bins: usize) -> Self {
        BinAxis {
            lower,
            upper,
            bins,
            closed: true,
        }
    }

    /// Bin holding `v`, `None` outside the axis (NaN included).
    fn index_of(&self, v: f64) -> Option<usize> {
        if self.bins == 0 || !(v >= self.lower) || v > self.upper {
            return None;
        }
        if v == self.upper {
            return self.closed.then_some(self.bins - 1);
        }
        let fraction = (v - self.lower) / (self.upper - self.lower);
        let mut idx = ((fraction * self.bins as f64) as usize).min(self.bins - 1);
        // Rounding in `fraction` can put a value on the wrong side of an edge.
        while idx > 0 && v < self.edge(idx) {
            idx -= 1;
        }
        while idx + 1 < self.bins && v >= self.edge(idx + 1) {
            idx += 1;
        }
        Some(idx)
    }

    /// Left edge of bin `i`, computed exactly as [`HistogramSpec::edges`] does.
    fn edge(&self, i: usize) -> f64 {
        self.lower + (self.upper - self.lower) * i as f64 / self.bins as f64
    }
}

// ---------------------------------------------------------------------------
// 1D
// ---------------------------------------------------------------------------

/// Count `values` into the bins of `spec`.
///
/// Values outside `[lower, upper)` are ignored.  No values gives all-zero counts.
pub fn histogram_1d(values: impl IntoIterator<Item = f64>, spec: &HistogramSpec) -> Histogram1D {
    let axis = BinAxis::half_open(spec.lower(), spec.upper(), spec.bins());
    let mut counts = vec![0u64; spec.bins()];
    for v in values {
        if let Some(idx) = axis.index_of(v) {
            counts[idx] += 1;
        }
    }
    Histogram1D {
        centers: spec.centers(),
        counts,
    }
}

/// 1D histogram of every value in the dataset, traces flattened.
pub fn dataset_histogram_1d(data: &TransformedDataset, spec: &HistogramSpec) -> Histogram1D {
    histogram_1d(data.samples.values(), spec)
}

// ---------------------------------------------------------------------------
// 2D
// ---------------------------------------------------------------------------

/// Value × position grid of one trace.
///
/// The value axis is [`TRACE_VALUE_DOMAIN`] (closed), the position axis is
/// `[0, trace.len)`; both use `bins` bins.  Positions are the sample indices
/// in the source trace, so excluded samples leave empty cells.
pub fn trace_histogram_2d(trace: &TransformedTrace, bins: usize) -> Histogram2D {
    let (lo, hi) = TRACE_VALUE_DOMAIN;
    let value_axis = BinAxis::closed(lo, hi, bins);
    let position_upper = trace.len as f64;
    let position_axis = BinAxis::half_open(0.0, position_upper, bins);

    let mut counts = vec![0u64; bins * bins];
    if trace.len > 0 {
        for &(pos, v) in &trace.points {
            let (Some(vi), Some(pi)) = (value_axis.index_of(v), position_axis.index_of(pos as f64))
            else {
                continue;
            };
            counts[vi * bins + pi] += 1;
        }
    }
    Histogram2D {
        position_upper,
        counts,
    }
}

/// One 2D grid per trace, in trace order.
///
/// Only the bin count of `spec` is used.  Returns `None` for a flat dataset.
pub fn histogram_2d_stack(data: &TransformedDataset, spec: &HistogramSpec) -> Option<Histogram2DStack> {
    let TransformedSamples::Traces(traces) = &data.samples else {
        return None;
    };
    let bins = spec.bins();
    Some(Histogram2DStack {
        value_domain: TRACE_VALUE_DOMAIN,
        bins,
        grids: traces.iter().map(|t| trace_histogram_2d(t, bins)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{DatasetId, RawDataset, Samples, Transform};
    use crate::data::transform;

    fn spec(lower: f64, upper: f64, bins: usize) -> HistogramSpec {
        HistogramSpec::new(lower, upper, bins).unwrap()
    }

    #[test]
    fn one_value_per_bin() {
        let h = histogram_1d([0.5, 1.5, 2.5, 3.5], &spec(0.0, 4.0, 4));
        assert_eq!(h.centers, vec![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(h.counts, vec![1, 1, 1, 1]);
    }

    #[test]
    fn empty_input_gives_zero_counts() {
        let h = histogram_1d(std::iter::empty(), &spec(0.0, 10.0, 5));
        assert_eq!(h.counts, vec![0, 0, 0, 0, 0]);
        assert_eq!(h.centers.len(), 5);
    }

    #[test]
    fn out_of_domain_values_are_not_counted() {
        let values = [-0.1, 0.0, 0.99, 1.0, 2.0, 2.0001, f64::NAN];
        let h = histogram_1d(values, &spec(0.0, 2.0, 2));
        // 0.0 and 0.99 in the first bin, 1.0 in the second, upper edge excluded
        assert_eq!(h.counts, vec![2, 1]);
        assert!(h.total() <= values.len() as u64);
    }

    #[test]
    fn every_left_edge_lands_in_its_own_bin() {
        for (lower, upper) in [(-7.3, 2.1), (-10.0, 0.0), (-12.7, -0.3), (0.1, 0.7)] {
            for bins in (1..=64).chain([100, 128, 257, 512]) {
                let s = spec(lower, upper, bins);
                let edges = s.edges();
                for (i, &edge) in edges[..bins].iter().enumerate() {
                    let h = histogram_1d([edge], &s);
                    assert_eq!(h.counts[i], 1, "edge {edge} of {s} not in bin {i}");
                }
            }
        }
    }

    #[test]
    fn single_bin_covers_whole_domain() {
        let h = histogram_1d([-9.9, -5.0, -0.1], &spec(-10.0, 0.0, 1));
        assert_eq!(h.centers, vec![-5.0]);
        assert_eq!(h.counts, vec![3]);
    }

    #[test]
    fn total_equals_len_when_all_values_inside() {
        let values: Vec<f64> = (0..1000).map(|i| -10.0 + i as f64 * 0.00999).collect();
        let s = spec(-10.0, 0.0, 128);
        let h = histogram_1d(values.iter().copied(), &s);
        assert_eq!(h.total(), values.len() as u64);
        assert_eq!(h.counts.len(), 128);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let values: Vec<f64> = (0..500).map(|i| ((i * 37) % 101) as f64 / 10.0).collect();
        let s = spec(0.0, 10.0, 17);
        let a = histogram_1d(values.iter().copied(), &s);
        let b = histogram_1d(values.iter().copied(), &s);
        assert_eq!(a, b);
    }

    #[test]
    fn trace_grid_bins_value_and_position() {
        // 4 samples, 2 bins: positions {0,1} -> bin 0, {2,3} -> bin 1
        let trace = TransformedTrace {
            len: 4,
            points: vec![(0, -9.0), (1, -1.0), (2, -1.0), (3, 0.0)],
        };
        let grid = trace_histogram_2d(&trace, 2);
        assert_eq!(grid.position_upper, 4.0);
        // value bin 0 = [-10, -5), value bin 1 = [-5, 0]
        assert_eq!(grid.counts, vec![1, 0, 1, 2]);
    }

    #[test]
    fn trace_grid_ignores_values_outside_fixed_domain() {
        let trace = TransformedTrace {
            len: 3,
            points: vec![(0, 1.5), (1, -12.0), (2, -3.0)],
        };
        let grid = trace_histogram_2d(&trace, 4);
        assert_eq!(grid.counts.iter().sum::<u64>(), 1);
    }

    #[test]
    fn empty_trace_gives_empty_grid() {
        let trace = TransformedTrace {
            len: 0,
            points: Vec::new(),
        };
        let grid = trace_histogram_2d(&trace, 3);
        assert_eq!(grid.counts, vec![0; 9]);
    }

    #[test]
    fn stack_follows_trace_order_and_ignores_1d_domain() {
        let raw = RawDataset::new(
            DatasetId::from_content("s.csv", b"s"),
            "s.csv",
            Samples::Traces(vec![vec![1e-1, 1e-2], vec![1e-9], vec![1e-5, 1e-5, 1e-5]]),
        );
        let data = transform::apply(&raw, Transform::Log10);
        // 1D domain deliberately far away from the 2D value domain
        let stack = histogram_2d_stack(&data, &spec(5.0, 10.0, 8)).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.bins, 8);
        assert_eq!(stack.value_domain, (-10.0, 0.0));
        let totals: Vec<u64> = stack.grids.iter().map(|g| g.counts.iter().sum()).collect();
        assert_eq!(totals, vec![2, 1, 3]);
        assert_eq!(stack.grids[2].position_upper, 3.0);
    }

    #[test]
    fn flat_dataset_has_no_stack() {
        let raw = RawDataset::new(
            DatasetId::from_content("f.csv", b"f"),
            "f.csv",
            Samples::Flat(vec![1.0, 2.0]),
        );
        let data = transform::apply(&raw, Transform::Identity);
        assert!(histogram_2d_stack(&data, &spec(0.0, 1.0, 4)).is_none());
    }
}
