use super::model::{
    RawDataset, Samples, Transform, TransformedDataset, TransformedSamples, TransformedTrace,
};

/// Apply `transform` element-wise.
///
/// Under [`Transform::Log10`] every value `<= 0` is dropped, per element and
/// per trace; traces themselves are never discarded.
pub fn apply(raw: &RawDataset, transform: Transform) -> TransformedDataset {
    let samples = match &raw.samples {
        Samples::Flat(values) => {
            TransformedSamples::Flat(values.iter().filter_map(|&v| map_value(v, transform)).collect())
        }
        Samples::Traces(traces) => TransformedSamples::Traces(
            traces
                .iter()
                .map(|trace| TransformedTrace {
                    len: trace.len(),
                    points: trace
                        .iter()
                        .enumerate()
                        .filter_map(|(i, &v)| map_value(v, transform).map(|t| (i, t)))
                        .collect(),
                })
                .collect(),
        ),
    };

    let excluded = raw.len() - samples.len();
    if excluded > 0 {
        log::debug!(
            "{}: excluded {excluded} non-positive value(s) from log10",
            raw.name
        );
    }

    TransformedDataset {
        id: raw.id,
        name: raw.name.clone(),
        transform,
        samples,
        excluded,
    }
}

#[inline]
fn map_value(v: f64, transform: Transform) -> Option<f64> {
    match transform {
        Transform::Identity => Some(v),
        Transform::Log10 if v > 0.0 => Some(v.log10()),
        Transform::Log10 => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::DatasetId;

    fn raw(samples: Samples) -> RawDataset {
        RawDataset::new(DatasetId::from_content("t.csv", b"t"), "t.csv", samples)
    }

    #[test]
    fn log10_drops_non_positive_values() {
        let ds = raw(Samples::Flat(vec![-1.0, 0.0, 1.0, 10.0]));
        let out = apply(&ds, Transform::Log10);
        assert_eq!(out.samples, TransformedSamples::Flat(vec![0.0, 1.0]));
        assert_eq!(out.excluded, 2);
        assert_eq!(out.samples.len(), ds.len() - 2);
    }

    #[test]
    fn identity_keeps_everything() {
        let values = vec![-3.0, 0.0, 0.25, 1e-7, 42.0];
        let ds = raw(Samples::Flat(values.clone()));
        let out = apply(&ds, Transform::Identity);
        assert_eq!(out.samples, TransformedSamples::Flat(values));
        assert_eq!(out.excluded, 0);
        assert_eq!(out.transform, Transform::Identity);

        let traces = vec![vec![1.0, -1.0], vec![], vec![0.0]];
        let ds = raw(Samples::Traces(traces.clone()));
        let out = apply(&ds, Transform::Identity);
        let TransformedSamples::Traces(out) = out.samples else {
            panic!("shape changed");
        };
        for (src, t) in traces.iter().zip(&out) {
            assert_eq!(t.len, src.len());
            assert_eq!(t.values().collect::<Vec<_>>(), *src);
        }
    }

    #[test]
    fn log10_excludes_per_element_within_traces() {
        let ds = raw(Samples::Traces(vec![
            vec![1.0, 10.0, -0.5, 100.0],
            vec![0.0, -1.0],
            vec![1000.0],
        ]));
        let out = apply(&ds, Transform::Log10);
        let TransformedSamples::Traces(traces) = &out.samples else {
            panic!("shape changed");
        };
        assert_eq!(traces.len(), 3);
        assert_eq!(traces[0].len, 4);
        assert_eq!(traces[0].points, vec![(0, 0.0), (1, 1.0), (3, 2.0)]);
        assert!(traces[1].points.is_empty());
        assert_eq!(traces[1].len, 2);
        assert_eq!(traces[2].points, vec![(0, 3.0)]);
        assert_eq!(out.excluded, 3);
    }

    #[test]
    fn excluded_count_matches_non_positive_count() {
        let values: Vec<f64> = (-20..20).map(|i| i as f64 * 0.37).collect();
        let non_positive = values.iter().filter(|&&v| v <= 0.0).count();
        let ds = raw(Samples::Flat(values.clone()));
        let out = apply(&ds, Transform::Log10);
        assert_eq!(out.samples.len(), values.len() - non_positive);
        assert!(out.samples.values().all(f64::is_finite));
    }
}
