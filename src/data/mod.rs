/// Data layer: loading, transform, binning, caching and overlay.
///
/// Architecture:
/// ```text
///  .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawDataset (flat or ragged traces)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ transform  │  optional log10, non-positive values dropped
///   └───────────┘
///        │
///        ▼
///   ┌───────────┐      ┌────────┐
///   │ histogram  │ ◄──► │ cache  │  keyed by (dataset, transform, spec)
///   └───────────┘      └────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ overlay   │  one 1D series per dataset → OverlaySet
///   └──────────┘
/// ```

pub mod cache;
pub mod error;
pub mod histogram;
pub mod loader;
pub mod model;
pub mod overlay;
pub mod transform;
