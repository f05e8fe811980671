use std::sync::Arc;

use super::cache::{CacheKey, HistogramCache};
use super::error::PipelineWarning;
use super::histogram::{dataset_histogram_1d, histogram_2d_stack};
use super::model::{
    Histogram2DStack, HistogramSpec, OverlayEntry, OverlaySet, TransformedDataset,
    TRACE_VALUE_DOMAIN,
};

/// Bin every dataset with the same `spec` and collect the series in input order.
///
/// Each dataset goes through the cache.  Datasets with nothing to bin still
/// get an (all-zero) entry and add a [`PipelineWarning::EmptyDataset`].
pub fn build_overlay(
    datasets: &[TransformedDataset],
    spec: &HistogramSpec,
    cache: &mut HistogramCache,
) -> OverlaySet {
    let mut entries = Vec::with_capacity(datasets.len());
    let mut warnings = Vec::new();

    for data in datasets {
        if data.samples.is_empty() {
            log::warn!("{}: no valid values to bin", data.name);
            warnings.push(PipelineWarning::EmptyDataset {
                name: data.name.clone(),
            });
        }
        let key = CacheKey::new(data.id, data.transform, *spec);
        let histogram = cache
            .one_d
            .get_or_compute(key, || dataset_histogram_1d(data, spec));
        entries.push(OverlayEntry {
            id: data.id,
            name: data.name.clone(),
            histogram,
        });
    }

    OverlaySet {
        spec: *spec,
        entries,
        warnings,
    }
}

/// Cached per-trace 2D stack of one dataset; `None` for flat data.
///
/// Only the bin count of `spec` matters, so moving the 1D domain reuses the
/// same stack.
pub fn trace_stack(
    data: &TransformedDataset,
    spec: &HistogramSpec,
    cache: &mut HistogramCache,
) -> Option<Arc<Histogram2DStack>> {
    if !data.has_traces() {
        return None;
    }
    let grid = spec.trace_grid();
    let key = CacheKey::new(data.id, data.transform, grid);
    let stack = cache.two_d.get_or_compute(key, || {
        histogram_2d_stack(data, &grid).unwrap_or_else(|| Histogram2DStack {
            value_domain: TRACE_VALUE_DOMAIN,
            bins: spec.bins(),
            grids: Vec::new(),
        })
    });
    Some(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{DatasetId, RawDataset, Samples, Transform};
    use crate::data::transform;

    fn dataset(name: &str, samples: Samples, transform: Transform) -> TransformedDataset {
        let raw = RawDataset::new(DatasetId::from_content(name, name.as_bytes()), name, samples);
        transform::apply(&raw, transform)
    }

    #[test]
    fn overlay_shares_bins_and_keeps_order() {
        let datasets = vec![
            dataset("a.csv", Samples::Flat(vec![1.0, 2.0, 3.0]), Transform::Identity),
            dataset("b.csv", Samples::Flat(vec![2.0, 3.0, 4.0]), Transform::Identity),
        ];
        let spec = HistogramSpec::new(0.0, 5.0, 5).unwrap();
        let mut cache = HistogramCache::new();

        let overlay = build_overlay(&datasets, &spec, &mut cache);

        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay.entries[0].name, "a.csv");
        assert_eq!(overlay.entries[1].name, "b.csv");
        assert_eq!(overlay.entries[0].id, datasets[0].id);
        assert_eq!(overlay.entries[1].id, datasets[1].id);
        let expected_centers = vec![0.5, 1.5, 2.5, 3.5, 4.5];
        assert_eq!(overlay.entries[0].histogram.centers, expected_centers);
        assert_eq!(overlay.entries[1].histogram.centers, expected_centers);
        assert_eq!(overlay.entries[0].histogram.counts, vec![0, 1, 1, 1, 0]);
        assert_eq!(overlay.entries[1].histogram.counts, vec![0, 0, 1, 1, 1]);
        assert_eq!(overlay.max_count(), 1);
        assert!(overlay.warnings.is_empty());
    }

    #[test]
    fn rebuilding_with_same_spec_hits_the_cache() {
        let datasets = vec![
            dataset("a.csv", Samples::Flat(vec![0.1, 0.01]), Transform::Log10),
            dataset("b.csv", Samples::Flat(vec![0.001]), Transform::Log10),
        ];
        let spec = HistogramSpec::new(-10.0, 0.0, 128).unwrap();
        let mut cache = HistogramCache::new();

        let first = build_overlay(&datasets, &spec, &mut cache);
        assert_eq!(cache.one_d.computations(), 2);
        let second = build_overlay(&datasets, &spec, &mut cache);
        assert_eq!(cache.one_d.computations(), 2);

        for (a, b) in first.entries.iter().zip(&second.entries) {
            assert!(Arc::ptr_eq(&a.histogram, &b.histogram));
        }

        let wider = HistogramSpec::new(-15.0, 0.0, 128).unwrap();
        build_overlay(&datasets, &wider, &mut cache);
        assert_eq!(cache.one_d.computations(), 4);
    }

    #[test]
    fn empty_dataset_yields_zero_series_and_warning() {
        let datasets = vec![
            dataset("neg.csv", Samples::Flat(vec![-1.0, 0.0]), Transform::Log10),
            dataset("ok.csv", Samples::Flat(vec![1.0]), Transform::Log10),
        ];
        let spec = HistogramSpec::new(-1.0, 1.0, 4).unwrap();
        let mut cache = HistogramCache::new();

        let overlay = build_overlay(&datasets, &spec, &mut cache);

        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay.entries[0].histogram.counts, vec![0, 0, 0, 0]);
        assert_eq!(overlay.entries[1].histogram.total(), 1);
        assert_eq!(
            overlay.warnings,
            vec![PipelineWarning::EmptyDataset {
                name: "neg.csv".to_string()
            }]
        );
    }

    #[test]
    fn trace_stack_is_cached_and_skips_flat_data() {
        let traces = dataset(
            "t.csv",
            Samples::Traces(vec![vec![1e-3, 1e-4], vec![1e-6]]),
            Transform::Log10,
        );
        let flat = dataset("f.csv", Samples::Flat(vec![1e-3]), Transform::Log10);
        let spec = HistogramSpec::new(-10.0, 0.0, 16).unwrap();
        let mut cache = HistogramCache::new();

        let a = trace_stack(&traces, &spec, &mut cache).unwrap();
        let b = trace_stack(&traces, &spec, &mut cache).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 2);
        assert_eq!(cache.two_d.computations(), 1);

        assert!(trace_stack(&flat, &spec, &mut cache).is_none());
        assert_eq!(cache.two_d.computations(), 1);
    }

    #[test]
    fn trace_stack_ignores_the_1d_domain() {
        let traces = dataset(
            "t.csv",
            Samples::Traces(vec![vec![1e-3, 1e-4], vec![1e-6]]),
            Transform::Log10,
        );
        let mut cache = HistogramCache::new();

        let first = trace_stack(&traces, &HistogramSpec::new(-10.0, 0.0, 32).unwrap(), &mut cache);
        for i in 1..10 {
            let spec = HistogramSpec::new(-10.0 + 0.1 * i as f64, 0.0, 32).unwrap();
            let again = trace_stack(&traces, &spec, &mut cache);
            assert!(Arc::ptr_eq(first.as_ref().unwrap(), again.as_ref().unwrap()));
        }
        assert_eq!(cache.two_d.computations(), 1);
        assert_eq!(cache.two_d.len(), 1);

        trace_stack(&traces, &HistogramSpec::new(-10.0, 0.0, 64).unwrap(), &mut cache);
        assert_eq!(cache.two_d.computations(), 2);
    }
}
