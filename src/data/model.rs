use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::error::{PipelineWarning, SpecError};

/// Value-axis domain of every 2D histogram, in log10(G/G0).
///
/// Independent of the operator-selected 1D domain.
pub const TRACE_VALUE_DOMAIN: (f64, f64) = (-10.0, 0.0);

// ---------------------------------------------------------------------------
// DatasetId – identity of one uploaded file
// ---------------------------------------------------------------------------

/// Identity of an uploaded dataset, derived from its file name and content.
///
/// Re-uploading a changed file under the same name yields a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(u64);

impl DatasetId {
    pub fn from_content(name: &str, content: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        content.hash(&mut hasher);
        DatasetId(hasher.finish())
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RawDataset – parsed file content, never mutated
// ---------------------------------------------------------------------------

/// Numeric content of a file: one flat sequence or a ragged set of traces.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Flat(Vec<f64>),
    /// One row per trace; rows keep their own length.
    Traces(Vec<Vec<f64>>),
}

impl Samples {
    /// Total number of samples over all traces.
    pub fn len(&self) -> usize {
        match self {
            Samples::Flat(v) => v.len(),
            Samples::Traces(traces) => traces.iter().map(Vec::len).sum(),
        }
    }
}

/// One uploaded file after parsing.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub id: DatasetId,
    /// File name shown to the operator.
    pub name: String,
    pub samples: Samples,
    /// Missing-value placeholders skipped while parsing.
    pub missing: usize,
}

impl RawDataset {
    pub fn new(id: DatasetId, name: impl Into<String>, samples: Samples) -> Self {
        RawDataset {
            id,
            name: name.into(),
            samples,
            missing: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn shape_label(&self) -> String {
        match &self.samples {
            Samples::Flat(v) => format!("flat ({})", v.len()),
            Samples::Traces(traces) => {
                let longest = traces.iter().map(Vec::len).max().unwrap_or(0);
                format!("{} traces (≤{longest})", traces.len())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TransformedDataset
// ---------------------------------------------------------------------------

/// Element-wise transform applied before binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transform {
    Identity,
    #[default]
    Log10,
}

impl Transform {
    pub fn from_flag(log10: bool) -> Self {
        if log10 {
            Transform::Log10
        } else {
            Transform::Identity
        }
    }
}

/// A trace after transformation.
///
/// Excluded samples leave gaps: each kept sample remembers its position in the
/// source trace, and `len` stays the source length.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedTrace {
    pub len: usize,
    /// (sample index in the source trace, transformed value)
    pub points: Vec<(usize, f64)>,
}

impl TransformedTrace {
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformedSamples {
    Flat(Vec<f64>),
    Traces(Vec<TransformedTrace>),
}

impl TransformedSamples {
    /// Number of values that survive the transform.
    pub fn len(&self) -> usize {
        match self {
            TransformedSamples::Flat(v) => v.len(),
            TransformedSamples::Traces(traces) => traces.iter().map(|t| t.points.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All values, trace by trace.
    pub fn values(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            TransformedSamples::Flat(v) => Box::new(v.iter().copied()),
            TransformedSamples::Traces(traces) => Box::new(traces.iter().flat_map(|t| t.values())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformedDataset {
    pub id: DatasetId,
    pub name: String,
    pub transform: Transform,
    pub samples: TransformedSamples,
    /// Samples dropped by the transform (non-positive under log10).
    pub excluded: usize,
}

impl TransformedDataset {
    pub fn has_traces(&self) -> bool {
        matches!(self.samples, TransformedSamples::Traces(_))
    }
}

// ---------------------------------------------------------------------------
// HistogramSpec – validated binning parameters
// ---------------------------------------------------------------------------

/// Domain `[lower, upper)` split into `bins` equal-width bins.
///
/// Only constructible through [`HistogramSpec::new`], so every value in
/// circulation satisfies `lower < upper` and `bins >= 1`.
#[derive(Debug, Clone, Copy)]
pub struct HistogramSpec {
    lower: f64,
    upper: f64,
    bins: usize,
}

impl HistogramSpec {
    pub fn new(lower: f64, upper: f64, bins: usize) -> Result<Self, SpecError> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(SpecError::NonFiniteBound { lower, upper });
        }
        if lower >= upper {
            return Err(SpecError::EmptyDomain { lower, upper });
        }
        if bins < 1 {
            return Err(SpecError::NoBins);
        }
        Ok(HistogramSpec { lower, upper, bins })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Same bin count over [`TRACE_VALUE_DOMAIN`], the only part of a spec a
    /// 2D histogram depends on.
    pub fn trace_grid(&self) -> HistogramSpec {
        let (lower, upper) = TRACE_VALUE_DOMAIN;
        HistogramSpec {
            lower,
            upper,
            bins: self.bins,
        }
    }

    /// `bins + 1` evenly spaced edges from `lower` to `upper`.
    pub fn edges(&self) -> Vec<f64> {
        bin_edges(self.lower, self.upper, self.bins)
    }

    /// Midpoint of each bin.
    pub fn centers(&self) -> Vec<f64> {
        self.edges().windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }
}

// Bounds compare by bit pattern so the spec can key a HashMap.
impl PartialEq for HistogramSpec {
    fn eq(&self, other: &Self) -> bool {
        self.lower.to_bits() == other.lower.to_bits()
            && self.upper.to_bits() == other.upper.to_bits()
            && self.bins == other.bins
    }
}

impl Eq for HistogramSpec {}

impl Hash for HistogramSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower.to_bits().hash(state);
        self.upper.to_bits().hash(state);
        self.bins.hash(state);
    }
}

impl fmt::Display for HistogramSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}) × {} bins", self.lower, self.upper, self.bins)
    }
}

pub(crate) fn bin_edges(lower: f64, upper: f64, bins: usize) -> Vec<f64> {
    let span = upper - lower;
    (0..=bins)
        .map(|i| lower + span * i as f64 / bins as f64)
        .collect()
}

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

/// Counts per bin, paired with the bin centers.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    pub centers: Vec<f64>,
    pub counts: Vec<u64>,
}

impl Histogram1D {
    pub fn pairs(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.centers.iter().copied().zip(self.counts.iter().copied())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Count grid of one trace: value bins × position bins, row-major by value bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    /// Upper edge of the position axis (the source trace length).
    pub position_upper: f64,
    pub counts: Vec<u64>,
}

/// One grid per trace, in trace order (trace × value-bin × position-bin).
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2DStack {
    pub value_domain: (f64, f64),
    /// Resolution of both axes.
    pub bins: usize,
    pub grids: Vec<Histogram2D>,
}

impl Histogram2DStack {
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    /// Element-wise sum over all traces.
    pub fn summed(&self) -> Vec<u64> {
        let mut total = vec![0; self.bins * self.bins];
        for grid in &self.grids {
            for (acc, c) in total.iter_mut().zip(&grid.counts) {
                *acc += c;
            }
        }
        total
    }

    pub fn summed_density(&self) -> DensityGrid {
        DensityGrid::new(self.bins, self.summed(), None)
    }

    pub fn trace_density(&self, trace: usize) -> Option<DensityGrid> {
        let grid = self.grids.get(trace)?;
        Some(DensityGrid::new(
            self.bins,
            grid.counts.clone(),
            Some(grid.position_upper),
        ))
    }

    pub fn value_centers(&self) -> Vec<f64> {
        bin_edges(self.value_domain.0, self.value_domain.1, self.bins)
            .windows(2)
            .map(|w| (w[0] + w[1]) / 2.0)
            .collect()
    }
}

/// One value × position grid ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    pub bins: usize,
    pub counts: Vec<u64>,
    pub max: u64,
    /// Trace length behind the position axis; `None` for a sum over traces.
    pub position_upper: Option<f64>,
}

impl DensityGrid {
    fn new(bins: usize, counts: Vec<u64>, position_upper: Option<f64>) -> Self {
        let max = counts.iter().copied().max().unwrap_or(0);
        DensityGrid {
            bins,
            counts,
            max,
            position_upper,
        }
    }

    pub fn count(&self, value_bin: usize, position_bin: usize) -> u64 {
        self.counts[value_bin * self.bins + position_bin]
    }
}

// ---------------------------------------------------------------------------
// OverlaySet – what the renderer receives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OverlayEntry {
    pub id: DatasetId,
    pub name: String,
    pub histogram: Arc<Histogram1D>,
}

/// 1D histograms of several datasets, in upload order, binned with one spec.
#[derive(Debug, Clone)]
pub struct OverlaySet {
    pub spec: HistogramSpec,
    pub entries: Vec<OverlayEntry>,
    pub warnings: Vec<PipelineWarning>,
}

impl OverlaySet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Largest count over all series, for axis scaling.
    pub fn max_count(&self) -> u64 {
        self.entries
            .iter()
            .flat_map(|e| e.histogram.counts.iter().copied())
            .max()
            .unwrap_or(0)
    }
}
