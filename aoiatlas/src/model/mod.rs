//! Report data model
//!
//! Serializable output types for resolved AOIs and their indicator
//! bundles. Field names match the published report schema.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Placeholder label for hierarchy levels that were not requested or
/// could not be resolved.
pub const UNRESOLVED: &str = "N/A";

/// A resolved area of interest.
#[derive(Debug, Clone, Serialize)]
pub struct Aoi {
    pub state: String,
    pub district: String,
    pub block: String,
    pub village: String,
    /// Centroid of the best resolved boundary, if any geometry was returned.
    pub centroid_lat: Option<f64>,
    pub centroid_lon: Option<f64>,
    /// Key of the layer whose geometry the report uses.
    pub source_layer: Option<String>,
    pub area_sqkm: Option<f64>,
    pub census_code: Option<String>,
    /// Extra attributes harvested from boundary features (geographic area,
    /// census codes and the like).
    pub additional_attributes: Map<String, Value>,
}

impl Aoi {
    pub fn unresolved() -> Self {
        Self {
            state: UNRESOLVED.to_string(),
            district: UNRESOLVED.to_string(),
            block: UNRESOLVED.to_string(),
            village: UNRESOLVED.to_string(),
            centroid_lat: None,
            centroid_lon: None,
            source_layer: None,
            area_sqkm: None,
            census_code: None,
            additional_attributes: Map::new(),
        }
    }

    /// Centroid as a `(lat, lon)` pair when both components are present.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        match (self.centroid_lat, self.centroid_lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Land use and land cover shares for the AOI's state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LandUse {
    pub forest_area_sqkm: Option<f64>,
    pub forest_percentage: Option<f64>,
    pub scrub_area_sqkm: Option<f64>,
    pub geographic_area_sqkm: Option<f64>,
}

impl LandUse {
    pub fn is_empty(&self) -> bool {
        self.forest_area_sqkm.is_none()
            && self.forest_percentage.is_none()
            && self.scrub_area_sqkm.is_none()
            && self.geographic_area_sqkm.is_none()
    }
}

/// Groundwater assessment and seasonal water-level summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroundWater {
    /// District annual extraction, million cubic metres.
    pub annual_extraction_mcm: Option<f64>,
    /// District net annual availability, million cubic metres.
    pub net_available_mcm: Option<f64>,
    /// Stage of groundwater development, percent.
    pub stage_of_development_pc: Option<f64>,
    /// Assessment category derived from the development stage.
    pub category: Option<String>,
    pub pre_monsoon_depth_m: Option<f64>,
    pub during_monsoon_depth_m: Option<f64>,
    pub post_monsoon_depth_m: Option<f64>,
    /// First available seasonal depth, post over during over pre, rounded
    /// to two decimals.
    pub primary_depth_m: Option<f64>,
    /// Seasonal depth change in metres, post minus pre when both exist.
    pub pre_post_delta_m: Option<f64>,
    /// True when the primary seasonal depth is at or beyond the stress
    /// threshold.
    pub stressed: Option<bool>,
}

/// Aquifer system under the AOI centroid.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aquifer {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
}

/// MGNREGA employment statistics for the AOI's district.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmploymentStats {
    pub jobcards_applied: Option<i64>,
    pub jobcards_issued: Option<i64>,
    pub registered_workers_total: Option<i64>,
    pub registered_workers_sc: Option<i64>,
    pub registered_workers_st: Option<i64>,
    pub registered_workers_women: Option<i64>,
    pub active_job_cards: Option<i64>,
    pub active_workers_total: Option<i64>,
    pub active_workers_sc: Option<i64>,
    pub active_workers_st: Option<i64>,
    pub active_workers_women: Option<i64>,
    pub jobcard_issuance_rate_pc: Option<f64>,
    pub worker_activation_rate_pc: Option<f64>,
    pub women_participation_pc: Option<f64>,
}

/// All indicators computed for one AOI.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndicatorSet {
    pub lulc_pc: LandUse,
    pub gw: GroundWater,
    pub aquifer: Aquifer,
    pub mgnrega: EmploymentStats,
}

/// Provenance block attached to every report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub generated_at: DateTime<Utc>,
    /// `key:url` pairs for every layer consulted.
    pub data_sources: Vec<String>,
    /// Degradation and substitution notes accumulated during resolution
    /// and aggregation.
    pub notes: Vec<String>,
}

/// A complete AOI report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub aoi: Aoi,
    pub indicators: IndicatorSet,
    pub meta: ReportMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_aoi_labels() {
        let aoi = Aoi::unresolved();
        assert_eq!(aoi.state, "N/A");
        assert_eq!(aoi.village, "N/A");
        assert!(aoi.centroid().is_none());
    }

    #[test]
    fn test_centroid_requires_both_components() {
        let mut aoi = Aoi::unresolved();
        aoi.centroid_lat = Some(23.5);
        assert!(aoi.centroid().is_none());
        aoi.centroid_lon = Some(91.5);
        assert_eq!(aoi.centroid(), Some((23.5, 91.5)));
    }

    #[test]
    fn test_aquifer_serializes_kind_as_type() {
        let aquifer = Aquifer {
            kind: Some("Alluvium".to_string()),
            code: Some("AL01".to_string()),
        };
        let json = serde_json::to_value(&aquifer).unwrap();
        assert_eq!(json["type"], "Alluvium");
        assert_eq!(json["code"], "AL01");
    }

    #[test]
    fn test_land_use_emptiness() {
        assert!(LandUse::default().is_empty());
        let populated = LandUse {
            forest_area_sqkm: Some(7726.0),
            ..LandUse::default()
        };
        assert!(!populated.is_empty());
    }
}
