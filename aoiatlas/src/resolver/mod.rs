//! Hierarchical AOI resolution
//!
//! Resolves a state/district/block/village request against the boundary
//! layers, strictly from the top of the hierarchy down. Each resolved
//! level feeds a resolution context that scopes the queries below it, so
//! "Dhalai" only matches inside the requested state. Failures below the
//! state level degrade to the nearest resolved ancestor and leave a note;
//! only an unresolvable state is an error.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::arcgis::{ArcGisClient, Feature, HttpClient, Predicate};
use crate::geo;
use crate::layers::{self, AdminLevel, Layer, LayerRegistry};
use crate::model::{Aoi, UNRESOLVED};

/// A request to resolve an area of interest.
///
/// Only the state is mandatory. Blank or whitespace-only values for the
/// lower levels are treated as not requested.
#[derive(Debug, Clone, Default)]
pub struct AoiRequest {
    pub state: String,
    pub district: Option<String>,
    pub block: Option<String>,
    pub village: Option<String>,
}

impl AoiRequest {
    pub fn new(state: &str) -> Self {
        Self {
            state: state.to_string(),
            ..Self::default()
        }
    }

    pub fn district(mut self, name: &str) -> Self {
        self.district = Some(name.to_string());
        self
    }

    pub fn block(mut self, name: &str) -> Self {
        self.block = Some(name.to_string());
        self
    }

    pub fn village(mut self, name: &str) -> Self {
        self.village = Some(name.to_string());
        self
    }

    /// The requested name for a level, if present and non-blank.
    fn requested(&self, level: AdminLevel) -> Option<&str> {
        let raw = match level {
            AdminLevel::State => Some(self.state.as_str()),
            AdminLevel::District => self.district.as_deref(),
            AdminLevel::Block => self.block.as_deref(),
            AdminLevel::Village => self.village.as_deref(),
        };
        raw.map(str::trim).filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("state is required to resolve an AOI")]
    MissingState,
    #[error("state '{0}' not found")]
    StateNotFound(String),
}

/// The outcome of a resolution: the AOI plus the degradation notes
/// accumulated while producing it.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub aoi: Aoi,
    pub notes: Vec<String>,
}

/// Values carried from resolved levels into the queries below them.
#[derive(Debug, Default)]
struct ResolutionContext {
    names: HashMap<AdminLevel, String>,
    codes: HashMap<AdminLevel, String>,
    state_full: Option<String>,
    state_abbrev: Option<String>,
    /// Parent-link values keyed by the field that carries them, e.g. a
    /// sub-district code a village layer filters on.
    parent_links: HashMap<String, String>,
}

impl ResolutionContext {
    /// The state value to filter descendant layers by. Datasets that key
    /// on the two-letter code store it in a two-character field, so a
    /// two-character abbreviation wins over the full name.
    fn state_filter_value(&self) -> Option<&str> {
        match self.state_abbrev.as_deref() {
            Some(abbrev) if abbrev.len() == 2 => Some(abbrev),
            _ => self.state_full.as_deref(),
        }
    }

    fn label(&self, level: AdminLevel, request: &AoiRequest) -> String {
        self.names
            .get(&level)
            .cloned()
            .or_else(|| request.requested(level).map(str::to_string))
            .unwrap_or_else(|| UNRESOLVED.to_string())
    }
}

/// Resolves AOI requests against a layer registry.
pub struct AoiResolver<'a, C: HttpClient> {
    client: &'a ArcGisClient<C>,
    registry: &'a LayerRegistry,
}

impl<'a, C: HttpClient> AoiResolver<'a, C> {
    pub fn new(client: &'a ArcGisClient<C>, registry: &'a LayerRegistry) -> Self {
        Self { client, registry }
    }

    /// Resolves a request top-down and returns the AOI with its notes.
    pub async fn resolve(&self, request: &AoiRequest) -> Result<Resolution, ResolveError> {
        let state_name = request
            .requested(AdminLevel::State)
            .ok_or(ResolveError::MissingState)?;

        let mut notes = Vec::new();
        let mut ctx = ResolutionContext::default();

        let state_layer = self.registry.aoi_layer(AdminLevel::State);
        let state_feature = match state_layer {
            Some(layer) => self
                .resolve_feature(AdminLevel::State, layer, state_name, &ctx)
                .await,
            None => None,
        };
        let state_feature = match (state_layer, state_feature) {
            (Some(layer), Some(feature)) => {
                update_context(AdminLevel::State, layer, &feature, state_name, &mut ctx);
                feature
            }
            _ => return Err(ResolveError::StateNotFound(state_name.to_string())),
        };

        let mut best = (AdminLevel::State, state_feature);
        for level in [AdminLevel::District, AdminLevel::Block, AdminLevel::Village] {
            let Some(name) = request.requested(level) else {
                continue;
            };
            let Some(layer) = self.registry.aoi_layer(level) else {
                notes.push(match level {
                    AdminLevel::District => {
                        "District layer not configured; using state boundary.".to_string()
                    }
                    _ => format!("{} layer not configured; skipping.", level.title()),
                });
                continue;
            };
            match self.resolve_feature(level, layer, name, &ctx).await {
                Some(feature) => {
                    update_context(level, layer, &feature, name, &mut ctx);
                    best = (level, feature);
                }
                None => notes.push(match level {
                    AdminLevel::District => format!(
                        "District '{name}' not found; using state boundary for calculations."
                    ),
                    _ => format!("{} '{name}' not found; using higher-level boundary.", level.title()),
                }),
            }
        }

        let deepest_requested = [AdminLevel::Village, AdminLevel::Block, AdminLevel::District]
            .into_iter()
            .find(|level| request.requested(*level).is_some())
            .unwrap_or(AdminLevel::State);
        let (best_level, best_feature) = best;
        if best_level != deepest_requested {
            notes.push(format!("AOI geometry resolved at {best_level} level."));
        }

        let centroid = geo::feature_centroid(&best_feature);

        let mut additional_attributes = serde_json::Map::new();
        let mut area_sqkm = None;
        match best_level {
            AdminLevel::State => {
                if let Some(value) = best_feature.attributes.get("GA_sqkm") {
                    additional_attributes.insert("geographic_area_sqkm".to_string(), value.clone());
                }
                if let Some(value) = best_feature.attributes.get("State_Cens") {
                    additional_attributes.insert("state_census_code".to_string(), value.clone());
                }
            }
            AdminLevel::District => {
                area_sqkm = best_feature.attr_f64("st_area_sh");
                if let Some(value) = best_feature.attributes.get("st_area_sh") {
                    additional_attributes.insert("area_sqkm".to_string(), value.clone());
                }
            }
            _ => {}
        }

        let aoi = Aoi {
            state: ctx.label(AdminLevel::State, request),
            district: ctx.label(AdminLevel::District, request),
            block: ctx.label(AdminLevel::Block, request),
            village: ctx.label(AdminLevel::Village, request),
            centroid_lat: centroid.map(|(lat, _)| lat),
            centroid_lon: centroid.map(|(_, lon)| lon),
            source_layer: self
                .registry
                .aoi_layer(best_level)
                .map(|layer| layer.url.clone()),
            area_sqkm,
            census_code: ctx.codes.get(&best_level).cloned(),
            additional_attributes,
        };

        Ok(Resolution { aoi, notes })
    }

    /// Looks up one level's boundary feature, scoped by the resolved
    /// ancestors. Query failures and empty results both yield `None`; the
    /// caller decides how to degrade.
    async fn resolve_feature(
        &self,
        level: AdminLevel,
        layer: &Layer,
        name: &str,
        ctx: &ResolutionContext,
    ) -> Option<Feature> {
        let mut clauses = Vec::new();
        if let Some(field) = &layer.name_field {
            clauses.push(Predicate::eq_fold(field, name));
        }
        if level != AdminLevel::State {
            if let (Some(field), Some(value)) = (&layer.state_field, ctx.state_filter_value()) {
                clauses.push(Predicate::eq_fold(field, value));
            }
            if level > AdminLevel::District {
                if let (Some(field), Some(district)) =
                    (&layer.district_field, ctx.names.get(&AdminLevel::District))
                {
                    clauses.push(Predicate::eq_fold(field, district));
                }
            }
        }
        if let Some(field) = &layer.parent_field {
            if let Some(value) = ctx.parent_links.get(field) {
                clauses.push(Predicate::eq_fold(field, value));
            }
        }
        let predicate = Predicate::and(clauses);
        debug!(level = %level, filter = %predicate, "querying boundary layer");

        match self.client.query_where(&layer.url, &predicate).await {
            Ok(features) if features.is_empty() => {
                debug!(level = %level, name, "no boundary features matched");
                None
            }
            Ok(mut features) => Some(features.swap_remove(0)),
            Err(err) => {
                warn!(level = %level, name, error = %err, "boundary lookup failed");
                None
            }
        }
    }
}

/// Records a resolved feature's identifying values for downstream filters.
fn update_context(
    level: AdminLevel,
    layer: &Layer,
    feature: &Feature,
    fallback_name: &str,
    ctx: &mut ResolutionContext,
) {
    let resolved_name = layer
        .name_field
        .as_deref()
        .and_then(|field| feature.attr_string(field))
        .unwrap_or_else(|| fallback_name.to_string());

    if level == AdminLevel::State {
        let mut full = feature.attr_string("State_FSI");
        let mut abbrev = feature.attr_string("State_Name");
        if abbrev.is_none() {
            if let Some(name) = &full {
                abbrev = layers::state_abbreviation(name).map(str::to_string);
            }
        }
        if full.is_none() {
            if let Some(code) = &abbrev {
                full = layers::state_full_name(code).map(str::to_string);
            }
        }
        let full = full.unwrap_or(resolved_name);
        ctx.state_abbrev = abbrev;
        ctx.state_full = Some(full.clone());
        ctx.names.insert(level, full);
    } else {
        ctx.names.insert(level, resolved_name);
    }

    if let Some(field) = &layer.code_field {
        if let Some(code) = feature.attr_string(field) {
            ctx.codes.insert(level, code);
        }
    }
    if let Some(field) = &layer.parent_field {
        if let Some(value) = feature.attr_string(field) {
            ctx.parent_links.insert(field.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcgis::MockHttpClient;
    use serde_json::json;

    fn state_body() -> serde_json::Value {
        json!({
            "features": [{
                "attributes": {
                    "State_FSI": "Tripura",
                    "State_Name": "TR",
                    "State_Cens": "16",
                    "GA_sqkm": 10486.0
                },
                "geometry": {
                    "rings": [[[91.0, 23.0], [92.0, 23.0], [92.0, 24.0], [91.0, 24.0], [91.0, 23.0]]]
                }
            }]
        })
    }

    fn district_body() -> serde_json::Value {
        json!({
            "features": [{
                "attributes": {
                    "District": "Dhalai",
                    "State": "TR",
                    "st_area_sh": 2400.5
                },
                "geometry": {
                    "rings": [[[91.6, 23.6], [91.9, 23.6], [91.9, 23.9], [91.6, 23.9], [91.6, 23.6]]]
                }
            }]
        })
    }

    fn fast_client(mock: MockHttpClient) -> ArcGisClient<MockHttpClient> {
        ArcGisClient::new(mock).with_retry(0, 0.001)
    }

    async fn resolve(
        client: &ArcGisClient<MockHttpClient>,
        request: AoiRequest,
    ) -> Result<Resolution, ResolveError> {
        let registry = LayerRegistry::default();
        AoiResolver::new(client, &registry).resolve(&request).await
    }

    #[tokio::test]
    async fn test_state_only_resolution() {
        let client = fast_client(MockHttpClient::from_json(&[state_body()]));
        let resolution = resolve(&client, AoiRequest::new("Tripura")).await.unwrap();

        assert_eq!(resolution.aoi.state, "Tripura");
        assert_eq!(resolution.aoi.district, "N/A");
        assert_eq!(resolution.aoi.census_code.as_deref(), Some("16"));
        assert!((resolution.aoi.centroid_lat.unwrap() - 23.5).abs() < 1e-9);
        assert!((resolution.aoi.centroid_lon.unwrap() - 91.5).abs() < 1e-9);
        assert!(resolution.notes.is_empty());
        assert_eq!(
            resolution.aoi.additional_attributes["geographic_area_sqkm"],
            json!(10486.0)
        );

        assert_eq!(
            client.http().recorded(0).param("where"),
            Some("UPPER(State_FSI) = UPPER('Tripura')")
        );
    }

    #[tokio::test]
    async fn test_blank_state_is_rejected() {
        let client = fast_client(MockHttpClient::new(vec![]));
        let result = resolve(&client, AoiRequest::new("  ")).await;
        assert!(matches!(result, Err(ResolveError::MissingState)));
    }

    #[tokio::test]
    async fn test_unknown_state_is_an_error() {
        let client = fast_client(MockHttpClient::from_json(&[json!({"features": []})]));
        match resolve(&client, AoiRequest::new("Atlantis")).await {
            Err(ResolveError::StateNotFound(name)) => assert_eq!(name, "Atlantis"),
            other => panic!("expected StateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_district_query_is_scoped_by_state_abbreviation() {
        let client = fast_client(MockHttpClient::from_json(&[state_body(), district_body()]));
        let resolution = resolve(&client, AoiRequest::new("Tripura").district("Dhalai"))
            .await
            .unwrap();

        assert_eq!(resolution.aoi.district, "Dhalai");
        assert_eq!(resolution.aoi.area_sqkm, Some(2400.5));
        assert!(resolution
            .aoi
            .source_layer
            .as_deref()
            .unwrap()
            .contains("district_boundary"));
        assert!(resolution.notes.is_empty());

        assert_eq!(
            client.http().recorded(1).param("where"),
            Some("UPPER(District) = UPPER('Dhalai') AND UPPER(State) = UPPER('TR')")
        );
    }

    #[tokio::test]
    async fn test_missing_district_degrades_to_state() {
        let client = fast_client(MockHttpClient::from_json(&[
            state_body(),
            json!({"features": []}),
        ]));
        let resolution = resolve(&client, AoiRequest::new("Tripura").district("Nowhere"))
            .await
            .unwrap();

        assert_eq!(resolution.aoi.district, "Nowhere");
        assert!(resolution
            .aoi
            .source_layer
            .as_deref()
            .unwrap()
            .contains("state_boundary"));
        assert_eq!(
            resolution.notes,
            vec![
                "District 'Nowhere' not found; using state boundary for calculations."
                    .to_string(),
                "AOI geometry resolved at state level.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_block_without_layer_is_noted_and_skipped() {
        let client = fast_client(
            MockHttpClient::from_json(&[state_body(), district_body()]).with_default_empty(),
        );
        let resolution = resolve(
            &client,
            AoiRequest::new("Tripura").district("Dhalai").block("Salema"),
        )
        .await
        .unwrap();

        // No query was issued for the block level.
        assert_eq!(client.http().request_count(), 2);
        assert_eq!(resolution.aoi.block, "Salema");
        assert!(resolution
            .notes
            .contains(&"Block layer not configured; skipping.".to_string()));
        assert!(resolution
            .notes
            .contains(&"AOI geometry resolved at district level.".to_string()));
    }

    #[tokio::test]
    async fn test_village_query_is_scoped_by_resolved_ancestors() {
        let village_body = json!({
            "features": [{
                "attributes": {
                    "name": "Kamalpur",
                    "lgd_villagecode": "271234",
                    "State": "TR",
                    "district": "Dhalai"
                },
                "geometry": {"x": 91.83, "y": 23.95}
            }]
        });
        let client = fast_client(MockHttpClient::from_json(&[
            state_body(),
            district_body(),
            village_body,
        ]));
        let resolution = resolve(
            &client,
            AoiRequest::new("Tripura").district("Dhalai").village("Kamalpur"),
        )
        .await
        .unwrap();

        assert_eq!(resolution.aoi.village, "Kamalpur");
        assert_eq!(resolution.aoi.census_code.as_deref(), Some("271234"));
        assert!(resolution.notes.is_empty());
        assert_eq!(resolution.aoi.centroid(), Some((23.95, 91.83)));

        assert_eq!(
            client.http().recorded(2).param("where"),
            Some(
                "UPPER(name) = UPPER('Kamalpur') AND UPPER(State) = UPPER('TR') \
                 AND UPPER(district) = UPPER('Dhalai')"
            )
        );
    }

    #[tokio::test]
    async fn test_transport_failure_below_state_degrades() {
        let client = fast_client(MockHttpClient::new(vec![
            Ok(state_body().to_string().into_bytes()),
            Err(crate::arcgis::ArcGisError::fatal("boom")),
        ]));
        let resolution = resolve(&client, AoiRequest::new("Tripura").district("Dhalai"))
            .await
            .unwrap();

        assert_eq!(resolution.aoi.district, "Dhalai");
        assert!(resolution.notes.iter().any(|note| note
            .contains("District 'Dhalai' not found; using state boundary")));
    }
}
