use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::data::cache::HistogramCache;
use crate::data::error::SpecError;
use crate::data::loader;
use crate::data::model::{
    DensityGrid, Histogram2DStack, HistogramSpec, OverlaySet, RawDataset, Transform, TransformedDataset,
};
use crate::data::overlay::{build_overlay, trace_stack};
use crate::data::transform;
use crate::metadata::Experiment;

/// Selectable bin counts.
pub const BIN_RANGE: RangeInclusive<usize> = 4..=512;
/// Selectable domain bounds, log10(G/G0) when the transform is on.
pub const DOMAIN_RANGE: RangeInclusive<f64> = -15.0..=10.0;

/// Example files loaded when nothing has been uploaded.
pub const EXAMPLE_FILES: [&str; 2] = ["example_tunneling_data.csv", "example_molecular_data.csv"];

/// Environment variable bounding the histogram cache (entries per table).
pub const CACHE_CAPACITY_ENV: &str = "NANOBREAK_CACHE_CAPACITY";

// ---------------------------------------------------------------------------
// Operator settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Take log10 of the data before binning.
    pub log10: bool,
    pub bins: usize,
    pub lower: f64,
    pub upper: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log10: true,
            bins: 128,
            lower: -10.0,
            upper: 0.0,
        }
    }
}

impl Settings {
    pub fn transform(&self) -> Transform {
        Transform::from_flag(self.log10)
    }

    pub fn histogram_spec(&self) -> Result<HistogramSpec, SpecError> {
        HistogramSpec::new(self.lower, self.upper, self.bins)
    }
}

/// Which part of the 2D stack is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceView {
    #[default]
    Summed,
    Single(usize),
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full session state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Uploaded datasets in upload order.
    pub datasets: Vec<RawDataset>,

    /// `datasets` under `transformed_with`, same order.
    pub transformed: Vec<TransformedDataset>,
    transformed_with: Transform,

    /// Per-file load errors of the last upload.
    pub failures: Vec<String>,

    pub cache: HistogramCache,

    /// Latest successfully built overlay.
    pub overlay: Option<OverlaySet>,

    /// Set while the current settings do not form a valid spec.
    pub spec_error: Option<SpecError>,

    /// Dataset index shown in the 2D view.
    pub selected_2d: Option<usize>,
    pub trace_view: TraceView,
    pub stack: Option<Arc<Histogram2DStack>>,
    /// `stack` reduced to what `trace_view` shows.
    pub density: Option<DensityGrid>,

    pub experiment: Experiment,

    /// Whether the bundled example files are being shown.
    pub using_examples: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_cache(HistogramCache::new())
    }
}

impl AppState {
    pub fn with_cache(cache: HistogramCache) -> Self {
        let settings = Settings::default();
        Self {
            transformed_with: settings.transform(),
            settings,
            datasets: Vec::new(),
            transformed: Vec::new(),
            failures: Vec::new(),
            cache,
            overlay: None,
            spec_error: None,
            selected_2d: None,
            trace_view: TraceView::Summed,
            stack: None,
            density: None,
            experiment: Experiment::example(),
            using_examples: false,
            status_message: None,
        }
    }

    /// Build the state from the environment (cache bound via [`CACHE_CAPACITY_ENV`]).
    pub fn from_env() -> Self {
        let cache = match std::env::var(CACHE_CAPACITY_ENV) {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(capacity) => {
                    log::info!("histogram cache limited to {capacity} entries per table");
                    HistogramCache::with_capacity_limit(capacity)
                }
                Err(_) => {
                    log::warn!("ignoring {CACHE_CAPACITY_ENV}={raw:?}: not a number");
                    HistogramCache::new()
                }
            },
            Err(_) => HistogramCache::new(),
        };
        Self::with_cache(cache)
    }

    // -- Datasets --------------------------------------------------------------

    /// Load every path; failures are recorded per file and do not stop the rest.
    ///
    /// Returns the number of files loaded.
    /// The example data is replaced only once at least one file loads.
    pub fn load_files(&mut self, paths: &[PathBuf]) -> usize {
        let mut datasets = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();
        for path in paths {
            match loader::load_file(path) {
                Ok(dataset) => {
                    log::info!(
                        "Loaded {}: {} samples, {}",
                        dataset.name,
                        dataset.len(),
                        dataset.shape_label()
                    );
                    datasets.push(dataset);
                }
                Err(e) => {
                    log::error!("Failed to load {}: {e}", e.file());
                    failures.push(e.to_string());
                }
            }
        }

        if self.using_examples && !datasets.is_empty() {
            self.clear_datasets();
            self.using_examples = false;
        }
        let loaded = datasets.len();
        for dataset in datasets {
            self.insert_dataset(dataset);
        }
        self.failures = failures;

        self.status_message = Some(match self.failures.len() {
            0 => format!("Loaded {loaded} file(s)"),
            n => format!("Loaded {loaded} file(s), {n} failed"),
        });
        self.refresh();
        loaded
    }

    /// Load the example files from `dir`, skipping any that are missing.
    pub fn load_examples(&mut self, dir: &Path) {
        let paths: Vec<PathBuf> = EXAMPLE_FILES
            .iter()
            .map(|f| dir.join(f))
            .filter(|p| p.is_file())
            .collect();
        if paths.is_empty() {
            log::info!("no example data in {}", dir.display());
            return;
        }
        self.load_files(&paths);
        self.using_examples = true;
        self.status_message =
            Some("Using example data. Open one or more files to use your own data!".to_string());
    }

    /// Add a dataset, replacing an earlier upload with the same name.
    fn insert_dataset(&mut self, dataset: RawDataset) {
        if let Some(idx) = self.datasets.iter().position(|d| d.name == dataset.name) {
            let old = self.datasets[idx].id;
            if old == dataset.id {
                log::debug!("{} unchanged, keeping cached results", dataset.name);
                return;
            }
            log::info!("{} re-uploaded with new content", dataset.name);
            self.cache.invalidate_dataset(old);
            self.transformed[idx] = transform::apply(&dataset, self.transformed_with);
            self.datasets[idx] = dataset;
        } else {
            self.transformed
                .push(transform::apply(&dataset, self.transformed_with));
            self.datasets.push(dataset);
        }
    }

    pub fn remove_dataset(&mut self, idx: usize) {
        if idx >= self.datasets.len() {
            return;
        }
        let removed = self.datasets.remove(idx);
        self.transformed.remove(idx);
        self.cache.invalidate_dataset(removed.id);
        self.selected_2d = match self.selected_2d {
            Some(sel) if sel == idx => None,
            Some(sel) if sel > idx => Some(sel - 1),
            other => other,
        };
        self.refresh();
    }

    pub fn clear_datasets(&mut self) {
        self.datasets.clear();
        self.transformed.clear();
        self.cache.clear();
        self.failures.clear();
        self.selected_2d = None;
        self.overlay = None;
        self.stack = None;
        self.density = None;
    }

    // -- Settings --------------------------------------------------------------

    pub fn set_log10(&mut self, log10: bool) {
        self.settings.log10 = log10;
        self.refresh();
    }

    pub fn set_bins(&mut self, bins: usize) {
        self.settings.bins = bins;
        self.refresh();
    }

    pub fn set_domain(&mut self, lower: f64, upper: f64) {
        self.settings.lower = lower;
        self.settings.upper = upper;
        self.refresh();
    }

    pub fn select_2d(&mut self, idx: Option<usize>) {
        self.selected_2d = idx;
        self.trace_view = TraceView::Summed;
        self.density = None;
        self.refresh();
    }

    pub fn set_trace_view(&mut self, view: TraceView) {
        self.trace_view = view;
        self.update_density();
    }

    // -- Recompute -------------------------------------------------------------

    /// One pass: transform (if the flag changed) → histograms → overlay.
    ///
    /// With invalid settings the previous overlay stays on screen.
    pub fn refresh(&mut self) {
        let wanted = self.settings.transform();
        if wanted != self.transformed_with {
            self.transformed_with = wanted;
            self.transformed = self
                .datasets
                .iter()
                .map(|d| transform::apply(d, wanted))
                .collect();
        }

        let spec = match self.settings.histogram_spec() {
            Ok(spec) => {
                self.spec_error = None;
                spec
            }
            Err(e) => {
                log::warn!("invalid histogram settings: {e}");
                self.spec_error = Some(e);
                return;
            }
        };

        self.overlay = Some(build_overlay(&self.transformed, &spec, &mut self.cache));

        if self.selected_2d.is_none() {
            self.selected_2d = self
                .transformed
                .iter()
                .position(|d| d.has_traces());
        }
        let stack = self
            .selected_2d
            .and_then(|idx| self.transformed.get(idx))
            .and_then(|data| trace_stack(data, &spec, &mut self.cache));
        let unchanged = match (&stack, &self.stack) {
            (Some(new), Some(old)) => Arc::ptr_eq(new, old),
            (None, None) => true,
            _ => false,
        };
        self.stack = stack;
        if !unchanged || self.density.is_none() {
            self.update_density();
        }

        log::debug!(
            "refresh {spec}: {} 1D / {} 2D histograms computed this session",
            self.cache.one_d.computations(),
            self.cache.two_d.computations()
        );
    }

    fn update_density(&mut self) {
        let Some(stack) = &self.stack else {
            self.density = None;
            return;
        };
        if let TraceView::Single(trace) = self.trace_view {
            if trace >= stack.len() {
                self.trace_view = TraceView::Summed;
            }
        }
        self.density = match self.trace_view {
            TraceView::Summed => Some(stack.summed_density()),
            TraceView::Single(trace) => stack.trace_density(trace),
        };
    }

    // -- Metadata --------------------------------------------------------------

    pub fn load_metadata(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        self.experiment = Experiment::from_json(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        log::info!("Loaded experiment metadata from {}", path.display());
        Ok(())
    }
}
