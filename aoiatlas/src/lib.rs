//! AOIAtlas - administrative-area indicator aggregation
//!
//! This library resolves an administrative area of interest (state →
//! district → block → village) against remote ArcGIS feature layers and
//! derives composite indicators for it: groundwater stress, aquifer type,
//! land-use figures and district employment statistics.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use aoiatlas::config::Settings;
//! use aoiatlas::resolver::AoiRequest;
//! use aoiatlas::service::ReportService;
//!
//! let service = ReportService::new(Settings::from_env())?;
//! let request = AoiRequest::new("Tripura").district("Dhalai");
//! let report = service.report(&request).await?;
//! ```

pub mod arcgis;
pub mod config;
pub mod geo;
pub mod indicators;
pub mod layers;
pub mod logging;
pub mod model;
pub mod resolver;
pub mod service;

/// Version of the AOIAtlas library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
