//! Report assembly
//!
//! `ReportService` owns the configured client and registry, and produces
//! complete reports: resolve the AOI, derive its indicators, and attach
//! the provenance metadata with every degradation note.

use chrono::Utc;
use tracing::info;

use crate::arcgis::{ArcGisClient, ArcGisError, HttpClient, ReqwestClient};
use crate::config::Settings;
use crate::indicators::IndicatorService;
use crate::layers::LayerRegistry;
use crate::model::{IndicatorSet, Report, ReportMeta, UNRESOLVED};
use crate::resolver::{AoiRequest, AoiResolver, Resolution, ResolveError};

/// Errors from report assembly.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Client(#[from] ArcGisError),
}

/// Produces AOI reports against the production layer catalog.
pub struct ReportService<C: HttpClient> {
    settings: Settings,
    registry: LayerRegistry,
    client: ArcGisClient<C>,
}

impl ReportService<ReqwestClient> {
    /// Builds a service over a real HTTP transport.
    pub fn new(settings: Settings) -> Result<Self, ArcGisError> {
        let http = ReqwestClient::with_timeout(settings.request_timeout_secs)?;
        let client = ArcGisClient::new(http)
            .with_token(settings.arcgis_token.clone())
            .with_retry(settings.max_retries, settings.backoff_factor);
        Ok(Self {
            settings,
            registry: LayerRegistry::default(),
            client,
        })
    }
}

impl<C: HttpClient> ReportService<C> {
    /// Assembles a service from explicit parts.
    pub fn with_parts(settings: Settings, registry: LayerRegistry, client: ArcGisClient<C>) -> Self {
        Self {
            settings,
            registry,
            client,
        }
    }

    /// Resolves a request without computing indicators.
    pub async fn resolve(&self, request: &AoiRequest) -> Result<Resolution, ResolveError> {
        AoiResolver::new(&self.client, &self.registry)
            .resolve(request)
            .await
    }

    /// Resolves the AOI and assembles the full report.
    pub async fn report(&self, request: &AoiRequest) -> Result<Report, ReportError> {
        let resolution = self.resolve(request).await?;
        info!(
            state = %resolution.aoi.state,
            district = %resolution.aoi.district,
            "AOI resolved, collecting indicators"
        );

        let indicators = IndicatorService::new(&self.client, &self.registry, &self.settings)
            .build_bundle(&resolution.aoi)
            .await;

        let meta = ReportMeta {
            generated_at: Utc::now(),
            data_sources: self.data_sources(),
            notes: meta_notes(&resolution, &indicators),
        };

        Ok(Report {
            aoi: resolution.aoi,
            indicators,
            meta,
        })
    }

    fn data_sources(&self) -> Vec<String> {
        self.registry
            .entries()
            .map(|(key, layer)| format!("{}:{}", key, layer.url))
            .collect()
    }
}

/// Merges resolution notes with indicator-availability notes.
fn meta_notes(resolution: &Resolution, indicators: &IndicatorSet) -> Vec<String> {
    let mut notes = resolution.notes.clone();

    let mentions = |notes: &[String], needle: &str| {
        notes.iter().any(|note| note.to_lowercase().contains(needle))
    };
    if is_placeholder(&resolution.aoi.village) && !mentions(&notes, "village boundary") {
        notes.push("Village boundary unavailable; report uses higher-level geometry.".to_string());
    }
    if is_placeholder(&resolution.aoi.block) && !mentions(&notes, "block boundary") {
        notes.push("Block boundary unavailable; report uses district context.".to_string());
    }

    if indicators.lulc_pc.is_empty() {
        notes.push("LULC data unavailable; values omitted.".to_string());
    }
    if indicators.gw.stressed.is_none() {
        notes.push("Groundwater stress could not be evaluated.".to_string());
    }
    if indicators.gw.pre_post_delta_m.is_none() {
        notes.push("Groundwater change data unavailable; delta omitted.".to_string());
    }
    notes
}

fn is_placeholder(label: &str) -> bool {
    label.trim().is_empty() || label == UNRESOLVED
}
