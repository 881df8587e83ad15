//! Indicator aggregation
//!
//! Derives the indicator bundle for a resolved AOI: groundwater metrics
//! (administrative plus seasonal measurements), the aquifer under the
//! centroid, state forest cover, and district employment statistics.
//! Every fetch degrades independently; a failed layer produces absent
//! values, never a failed bundle.

use serde_json::json;
use tracing::{debug, warn};

use crate::arcgis::{ArcGisClient, Feature, HttpClient, Predicate, QueryParams};
use crate::config::Settings;
use crate::layers::{AdminLevel, Layer, LayerRegistry};
use crate::model::{Aoi, Aquifer, EmploymentStats, GroundWater, IndicatorSet, LandUse, UNRESOLVED};

/// Candidate attribute names for district annual groundwater extraction.
const ANNUAL_EXTRACTION_FIELDS: [&str; 2] = ["Annual_Gro", "Annual_G00"];
/// Candidate attribute names for district net groundwater availability.
const NET_AVAILABLE_FIELDS: [&str; 2] = ["Net_Ground", "Ground_Wat"];
/// District stage-of-development attribute.
const STAGE_FIELD: &str = "Stage_of_d";
/// Candidate attribute names for the aquifer type, most specific first.
const AQUIFER_TYPE_FIELDS: [&str; 4] = ["aquifer", "aquifers", "aquifer_0", "systems"];
/// Candidate attribute names for the aquifer code.
const AQUIFER_CODE_FIELDS: [&str; 2] = ["new_code_14", "newcode43"];

/// Computes indicator bundles against a layer registry.
pub struct IndicatorService<'a, C: HttpClient> {
    client: &'a ArcGisClient<C>,
    registry: &'a LayerRegistry,
    stress_threshold_m: f64,
}

impl<'a, C: HttpClient> IndicatorService<'a, C> {
    pub fn new(client: &'a ArcGisClient<C>, registry: &'a LayerRegistry, settings: &Settings) -> Self {
        Self {
            client,
            registry,
            stress_threshold_m: settings.gw_stress_threshold_m,
        }
    }

    /// Fetches and derives all indicators for the AOI.
    pub async fn build_bundle(&self, aoi: &Aoi) -> IndicatorSet {
        IndicatorSet {
            gw: self.fetch_groundwater(aoi).await,
            aquifer: self.fetch_aquifer(aoi).await,
            lulc_pc: self.fetch_land_use(aoi).await,
            mgnrega: self.fetch_employment(aoi).await,
        }
    }

    async fn fetch_groundwater(&self, aoi: &Aoi) -> GroundWater {
        let mut gw = self.fetch_district_groundwater(aoi).await;

        let pre = self
            .average_seasonal_layer("groundwater_pre_monsoon", aoi)
            .await;
        let during = self
            .average_seasonal_layer("groundwater_during_monsoon", aoi)
            .await;
        let post = self
            .average_seasonal_layer("groundwater_post_monsoon", aoi)
            .await;

        let primary = post.or(during).or(pre);
        let delta = match (post, during, pre) {
            (Some(post), _, Some(pre)) => Some(round2(post - pre)),
            (None, Some(during), Some(pre)) => Some(round2(during - pre)),
            _ => None,
        };

        gw.pre_monsoon_depth_m = pre;
        gw.during_monsoon_depth_m = during;
        gw.post_monsoon_depth_m = post;
        gw.primary_depth_m = primary.map(round2);
        gw.pre_post_delta_m = delta;
        gw.stressed = primary.map(|depth| depth >= self.stress_threshold_m);
        gw
    }

    /// Administrative groundwater metrics from the district boundary layer.
    async fn fetch_district_groundwater(&self, aoi: &Aoi) -> GroundWater {
        let mut gw = GroundWater::default();
        let Some(layer) = self.registry.aoi_layer(AdminLevel::District) else {
            return gw;
        };

        let mut clauses = Vec::new();
        if let (Some(field), Some(state)) = (&layer.state_field, present(&aoi.state)) {
            if let Some(abbrev) = crate::layers::state_abbreviation(state) {
                clauses.push(Predicate::eq(field, abbrev));
            }
        }
        if let (Some(field), Some(district)) = (&layer.name_field, present(&aoi.district)) {
            clauses.push(Predicate::eq(field, district));
        }

        let Some(feature) = self.first_match(layer, Predicate::and(clauses), "district groundwater").await
        else {
            return gw;
        };

        gw.annual_extraction_mcm = first_f64(&feature, &ANNUAL_EXTRACTION_FIELDS);
        gw.net_available_mcm = first_f64(&feature, &NET_AVAILABLE_FIELDS);
        if let Some(stage) = feature.attr_f64(STAGE_FIELD) {
            gw.stage_of_development_pc = Some(stage);
            gw.category = Some(stage_category(stage).to_string());
        }
        gw
    }

    /// Averages the value field of one seasonal measurement layer over the
    /// AOI's state and district. Non-numeric values are skipped; no usable
    /// values means `None`.
    async fn average_seasonal_layer(&self, layer_key: &str, aoi: &Aoi) -> Option<f64> {
        let layer = self.registry.indicator_layer(layer_key)?;

        let mut clauses = Vec::new();
        if let Some(state) = present(&aoi.state) {
            if let Some(field) = layer.state_field.as_ref().or(layer.parent_field.as_ref()) {
                clauses.push(Predicate::eq_fold(field, state));
            }
        }
        if let Some(district) = present(&aoi.district) {
            if let Some(field) = layer.district_field.as_ref().or(layer.name_field.as_ref()) {
                clauses.push(Predicate::eq_fold(field, district));
            }
        }

        let features = match self
            .client
            .query_where(&layer.url, &Predicate::and(clauses))
            .await
        {
            Ok(features) => features,
            Err(err) => {
                warn!(layer = layer_key, error = %err, "seasonal groundwater query failed");
                return None;
            }
        };

        let value_field = layer.value_field.as_deref().unwrap_or("wl_mbgl");
        let values: Vec<f64> = features
            .iter()
            .filter_map(|feature| feature.attr_f64(value_field))
            .collect();
        if values.is_empty() {
            debug!(layer = layer_key, "no usable seasonal measurements");
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Point-in-polygon lookup of the aquifer under the AOI centroid.
    async fn fetch_aquifer(&self, aoi: &Aoi) -> Aquifer {
        let Some(layer) = self.registry.indicator_layer("aquifer") else {
            debug!("aquifer layer not configured");
            return Aquifer::default();
        };
        let Some((lat, lon)) = aoi.centroid() else {
            debug!("no centroid available for aquifer lookup");
            return Aquifer::default();
        };

        let params = QueryParams {
            return_geometry: Some(false),
            extra: vec![
                ("geometryType".to_string(), "esriGeometryPoint".to_string()),
                ("spatialRel".to_string(), "esriSpatialRelWithin".to_string()),
                (
                    "geometry".to_string(),
                    json!({"x": lon, "y": lat, "spatialReference": {"wkid": 4326}}).to_string(),
                ),
            ],
            ..QueryParams::default()
        };

        let features = match self.client.query(&layer.url, params).await {
            Ok(features) => features,
            Err(err) => {
                warn!(error = %err, "aquifer query failed");
                return Aquifer::default();
            }
        };
        let Some(feature) = features.first() else {
            debug!("no aquifer found at centroid");
            return Aquifer::default();
        };

        Aquifer {
            kind: first_string(feature, &AQUIFER_TYPE_FIELDS),
            code: first_string(feature, &AQUIFER_CODE_FIELDS),
        }
    }

    /// Forest-cover shares from the state boundary layer.
    async fn fetch_land_use(&self, aoi: &Aoi) -> LandUse {
        let mut land_use = LandUse::default();
        let Some(layer) = self.registry.aoi_layer(AdminLevel::State) else {
            return land_use;
        };

        let mut clauses = Vec::new();
        if let (Some(field), Some(state)) = (&layer.name_field, present(&aoi.state)) {
            clauses.push(Predicate::eq(field, state));
        }

        let Some(feature) = self.first_match(layer, Predicate::and(clauses), "state forest").await
        else {
            return land_use;
        };

        land_use.geographic_area_sqkm = feature.attr_f64("GA_sqkm");
        land_use.forest_area_sqkm = feature.attr_f64("Forest_201");
        land_use.forest_percentage = feature.attr_f64("Per_GA_201");
        land_use.scrub_area_sqkm = feature.attr_f64("Scrub2019");
        land_use
    }

    /// District job-card and worker statistics with derived rates.
    async fn fetch_employment(&self, aoi: &Aoi) -> EmploymentStats {
        let Some(layer) = self.registry.indicator_layer("mgnrega_workers") else {
            debug!("employment layer not configured");
            return EmploymentStats::default();
        };

        let mut clauses = Vec::new();
        if let (Some(field), Some(state)) = (&layer.state_field, present(&aoi.state)) {
            clauses.push(Predicate::eq(field, state));
        }
        if let (Some(field), Some(district)) = (&layer.district_field, present(&aoi.district)) {
            clauses.push(Predicate::eq(field, district));
        }

        let Some(feature) = self.first_match(layer, Predicate::and(clauses), "employment").await
        else {
            return EmploymentStats::default();
        };

        let jobcards_applied = feature.attr_i64("number_of_jobcards_applied_for");
        let jobcards_issued = feature.attr_i64("number_of_jobcards_issued");
        let registered_total = feature.attr_i64("registered_workers_total");
        let active_total = feature.attr_i64("active_workers_total_workers");
        let active_women = feature.attr_i64("active_workers_women");

        EmploymentStats {
            jobcards_applied,
            jobcards_issued,
            registered_workers_total: registered_total,
            registered_workers_sc: feature.attr_i64("registered_workers_sc"),
            registered_workers_st: feature.attr_i64("registered_workers_st"),
            registered_workers_women: feature.attr_i64("registered_workers_women"),
            active_job_cards: feature.attr_i64("number_of_active_job_cards"),
            active_workers_total: active_total,
            active_workers_sc: feature.attr_i64("active_workers_sc"),
            active_workers_st: feature.attr_i64("active_workers_st"),
            active_workers_women: active_women,
            jobcard_issuance_rate_pc: rate(jobcards_issued, jobcards_applied),
            worker_activation_rate_pc: rate(active_total, registered_total),
            women_participation_pc: rate(active_women, active_total),
        }
    }

    /// Runs an attribute query and returns the first feature, logging and
    /// absorbing failures.
    async fn first_match(
        &self,
        layer: &Layer,
        predicate: Predicate,
        what: &str,
    ) -> Option<Feature> {
        match self.client.query_where(&layer.url, &predicate).await {
            Ok(mut features) if !features.is_empty() => Some(features.swap_remove(0)),
            Ok(_) => {
                debug!(layer = %layer.name, what, "no matching features");
                None
            }
            Err(err) => {
                warn!(layer = %layer.name, what, error = %err, "indicator query failed");
                None
            }
        }
    }
}

/// Treats blank and placeholder labels as absent filter values.
fn present(label: &str) -> Option<&str> {
    let trimmed = label.trim();
    if trimmed.is_empty() || trimmed == UNRESOLVED {
        None
    } else {
        Some(trimmed)
    }
}

/// First numeric value among candidate attribute names.
fn first_f64(feature: &Feature, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| feature.attr_f64(field))
}

/// First non-empty string among candidate attribute names.
fn first_string(feature: &Feature, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| feature.attr_string(field))
}

/// Percentage of `numerator` over `denominator`, defined only for a
/// strictly positive denominator.
fn rate(numerator: Option<i64>, denominator: Option<i64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(num), Some(den)) if den > 0 => Some(round2(num as f64 / den as f64 * 100.0)),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Assessment category band for a stage-of-development percentage.
fn stage_category(stage_pc: f64) -> &'static str {
    if stage_pc >= 100.0 {
        "Over-exploited"
    } else if stage_pc >= 90.0 {
        "Critical"
    } else if stage_pc >= 70.0 {
        "Semi-critical"
    } else {
        "Safe"
    }
}
