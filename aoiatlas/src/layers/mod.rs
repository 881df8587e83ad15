//! Layer registry
//!
//! Static catalog of the feature layers the service queries: the
//! administrative AOI hierarchy (state → district → block → village) and
//! the indicator layers, each declaring its queryable fields. The registry
//! is a constructed, immutable value injected into the resolver and the
//! aggregator, so tests can substitute a reduced catalog.

use std::collections::BTreeMap;
use std::fmt;

/// Administrative hierarchy levels, most general first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdminLevel {
    State,
    District,
    Block,
    Village,
}

impl AdminLevel {
    /// All levels in cascade order.
    pub const ALL: [AdminLevel; 4] = [
        AdminLevel::State,
        AdminLevel::District,
        AdminLevel::Block,
        AdminLevel::Village,
    ];

    /// Lowercase level name used in registry keys and notes.
    pub fn name(&self) -> &'static str {
        match self {
            AdminLevel::State => "state",
            AdminLevel::District => "district",
            AdminLevel::Block => "block",
            AdminLevel::Village => "village",
        }
    }

    /// Capitalized level name for user-facing notes.
    pub fn title(&self) -> &'static str {
        match self {
            AdminLevel::State => "State",
            AdminLevel::District => "District",
            AdminLevel::Block => "Block",
            AdminLevel::Village => "Village",
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor for a queryable feature layer.
///
/// Immutable after registration; the field links (`state_field`,
/// `district_field`, `parent_field`) drive how the resolver scopes a
/// level's query by its already-resolved ancestors.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    /// Layer root or query endpoint URL.
    pub url: String,
    /// Declared output fields.
    pub fields: Vec<String>,
    pub description: Option<String>,
    /// Field holding the feature's own name.
    pub name_field: Option<String>,
    /// Field linking to the parent state (full name or abbreviation,
    /// whichever this layer's dataset stores).
    pub state_field: Option<String>,
    /// Field linking to the parent district.
    pub district_field: Option<String>,
    /// Field linking to a non-district parent (e.g. sub-district code).
    pub parent_field: Option<String>,
    /// Field holding the feature's administrative code.
    pub code_field: Option<String>,
    /// Field holding the layer's measured value, for value layers.
    pub value_field: Option<String>,
}

impl Layer {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            fields: Vec::new(),
            description: None,
            name_field: None,
            state_field: None,
            district_field: None,
            parent_field: None,
            code_field: None,
            value_field: None,
        }
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn name_field(mut self, field: &str) -> Self {
        self.name_field = Some(field.to_string());
        self
    }

    pub fn state_field(mut self, field: &str) -> Self {
        self.state_field = Some(field.to_string());
        self
    }

    pub fn district_field(mut self, field: &str) -> Self {
        self.district_field = Some(field.to_string());
        self
    }

    pub fn parent_field(mut self, field: &str) -> Self {
        self.parent_field = Some(field.to_string());
        self
    }

    pub fn code_field(mut self, field: &str) -> Self {
        self.code_field = Some(field.to_string());
        self
    }

    pub fn value_field(mut self, field: &str) -> Self {
        self.value_field = Some(field.to_string());
        self
    }
}

/// Immutable catalog of AOI and indicator layers.
///
/// Lookups return `None` for unconfigured keys; downstream components
/// treat that as "feature unavailable", not as an error.
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    aoi: BTreeMap<AdminLevel, Layer>,
    indicators: BTreeMap<String, Layer>,
}

impl LayerRegistry {
    pub fn new(aoi: BTreeMap<AdminLevel, Layer>, indicators: BTreeMap<String, Layer>) -> Self {
        Self { aoi, indicators }
    }

    /// Returns the boundary layer for an administrative level.
    pub fn aoi_layer(&self, level: AdminLevel) -> Option<&Layer> {
        self.aoi.get(&level)
    }

    /// Returns an indicator layer by its logical key.
    pub fn indicator_layer(&self, key: &str) -> Option<&Layer> {
        self.indicators.get(key)
    }

    /// Enumerates all registered layers as `(key, layer)` pairs, AOI
    /// layers first, in a deterministic order.
    pub fn entries(&self) -> impl Iterator<Item = (String, &Layer)> {
        self.aoi
            .iter()
            .map(|(level, layer)| (level.name().to_string(), layer))
            .chain(
                self.indicators
                    .iter()
                    .map(|(key, layer)| (key.clone(), layer)),
            )
    }
}

impl Default for LayerRegistry {
    /// The production catalog.
    ///
    /// There is intentionally no `block` boundary layer: none is published
    /// for this hierarchy, and the resolver degrades with a "layer not
    /// configured" note.
    fn default() -> Self {
        let mut aoi = BTreeMap::new();
        aoi.insert(
            AdminLevel::State,
            Layer::new(
                "state",
                "https://services5.arcgis.com/73n8CSGpSSyHr1T9/arcgis/rest/services/state_boundary/FeatureServer/0",
            )
            .fields(&[
                "FID", "shape_leng", "State_Name", "State_Cens", "State_FSI", "GA_sqkm",
                "VDF2019", "MDF2019", "OF2019", "Forest_201", "Per_GA_201", "Forest_200",
                "Ch_wrt2017", "Ch_per", "Scrub2019", "TC2019", "Fcount_RFA", "Extent_TOF",
                "Per_FTC_St", "Per_GA_Sta", "RFA_GW_as_", "nfa_orfa", "F_FC_Outsid",
                "st_area_sh", "st_length_", "Shape__Area", "Shape__Length", "GlobalID",
                "geometry",
            ])
            .description("India state boundaries with forest-cover assessment attributes.")
            // State_FSI carries the full name ("Tripura"); State_Name the
            // two-letter abbreviation ("TR").
            .name_field("State_FSI")
            .state_field("State_FSI")
            .code_field("State_Cens"),
        );
        aoi.insert(
            AdminLevel::District,
            Layer::new(
                "district",
                "https://services5.arcgis.com/73n8CSGpSSyHr1T9/arcgis/rest/services/district_boundary/FeatureServer/0",
            )
            .fields(&[
                "FID", "District", "State", "Annual_Gro", "Annual_G00", "Annual_Rep",
                "Natural_Di", "Projected_", "Ground_Wat", "Net_Ground", "Annual_Dra",
                "Stage_of_d", "st_area_sh", "st_length_", "Shape__Area", "Shape__Length",
                "GlobalID", "geometry",
            ])
            .description("District boundaries with groundwater assessment attributes.")
            .name_field("District")
            // The district dataset scopes by the state abbreviation.
            .state_field("State"),
        );
        aoi.insert(
            AdminLevel::Village,
            Layer::new(
                "village",
                "https://livingatlas.esri.in/server/rest/services/IAB2024/IAB_Village_2024/MapServer/0",
            )
            .fields(&[
                "objectid", "id", "name", "subdistrict", "District", "State", "country",
                "censusname", "villagename_locallang", "lgd_villagename", "lgd_villagecode",
                "lgd_subdistrictcode", "lgd_districtcode", "lgd_statecode", "censuscode2001",
                "censuscode2011", "censuscode2021", "level_2011", "tru_2011", "shape",
            ])
            .description("India village boundaries (Living Atlas 2024).")
            .name_field("name")
            .state_field("State")
            .district_field("district")
            .parent_field("lgd_subdistrictcode")
            .code_field("lgd_villagecode"),
        );

        let mut indicators = BTreeMap::new();
        indicators.insert(
            "groundwater_pre_monsoon".to_string(),
            Layer::new(
                "groundwater_pre_monsoon",
                "https://livingatlas.esri.in/server1/rest/services/Water/Pre_Post_Monsoon_Water_Level_Depth/FeatureServer/1",
            )
            .fields(&[
                "objectid", "state_", "district_name", "block_", "village_name", "lat",
                "long", "date_", "dtwl_",
            ])
            .description("Pre-monsoon groundwater depth measurements (latest, mbgl).")
            .name_field("district_name")
            .parent_field("state_")
            .state_field("state_")
            .district_field("district_name")
            .value_field("dtwl_"),
        );
        indicators.insert(
            "groundwater_during_monsoon".to_string(),
            Layer::new(
                "groundwater_during_monsoon",
                "https://livingatlas.esri.in/server1/rest/services/Water/Pre_Post_Monsoon_Water_Level_Depth/FeatureServer/2",
            )
            .fields(&[
                "objectid", "State", "district_name", "block_", "village_name", "lat",
                "long", "date_", "wl_mbgl",
            ])
            .description("During-monsoon groundwater depth measurements (mbgl).")
            .name_field("district_name")
            .parent_field("state")
            .state_field("State")
            .district_field("district_name")
            .value_field("wl_mbgl"),
        );
        indicators.insert(
            "groundwater_post_monsoon".to_string(),
            Layer::new(
                "groundwater_post_monsoon",
                "https://livingatlas.esri.in/server1/rest/services/Water/Pre_Post_Monsoon_Water_Level_Depth/FeatureServer/3",
            )
            .fields(&[
                "objectid", "State", "district_name", "block_", "village_name", "lat",
                "long", "date_", "wl_mbgl",
            ])
            .description("Post-monsoon groundwater depth measurements (mbgl).")
            .name_field("district_name")
            .parent_field("state")
            .state_field("State")
            .district_field("district_name")
            .value_field("wl_mbgl"),
        );
        indicators.insert(
            "aquifer".to_string(),
            Layer::new(
                "aquifer",
                "https://livingatlas.esri.in/server1/rest/services/Water/Major_Aquifers/MapServer/0",
            )
            .fields(&[
                "objectid", "state_name", "new_code_14", "aquifer", "newcode43", "aquifer_0",
                "systems", "zone_m", "mbgl", "avg_mbgl", "yield_gw", "m3_per_day", "per_cm",
                "pa_order",
            ])
            .description("Major aquifer polygons with lithology and recharge attributes.")
            .name_field("state_name")
            .code_field("new_code_14")
            .state_field("state_name")
            .value_field("aquifer"),
        );
        indicators.insert(
            "rural_facilities".to_string(),
            Layer::new(
                "rural_facilities",
                "https://livingatlas.esri.in/server1/rest/services/PMGSY/IN_PMGSY_RuralFacilities_2021/MapServer/0",
            )
            .fields(&[
                "objectid", "facility_id", "facilityname", "facilitycat", "hab_id", "habname",
                "block_id", "block", "dist_id", "District", "state_id", "State", "geometry",
            ])
            .description("Rural facilities (Agro, Education, Medical, Transport/Admin).")
            .name_field("facilityname")
            .state_field("State")
            .district_field("District"),
        );
        indicators.insert(
            "mgnrega_workers".to_string(),
            Layer::new(
                "mgnrega_workers",
                "https://livingatlas.esri.in/server1/rest/services/MGNREGA/IN_DT_CategoryWiseHHWorkers/MapServer/0",
            )
            .fields(&[
                "objectid", "district_name", "state_name", "lgd_district_code",
                "census_code_2011", "number_of_jobcards_applied_for",
                "number_of_jobcards_issued", "registered_workers_sc", "registered_workers_st",
                "registered_workers_oth", "registered_workers_total",
                "registered_workers_women", "number_of_active_job_cards", "active_workers_sc",
                "active_workers_st", "active_workers_oth", "active_workers_total_workers",
                "active_workers_women", "shape", "st_area(shape)", "st_perimeter(shape)",
            ])
            .description("MGNREGA district-wise job card and worker statistics.")
            .name_field("district_name")
            .state_field("state_name")
            .district_field("district_name"),
        );

        Self::new(aoi, indicators)
    }
}

/// Fixed mapping between full administrative names and two-letter codes.
const STATE_NAMES: [(&str, &str); 36] = [
    ("Andaman and Nicobar Islands", "AN"),
    ("Andhra Pradesh", "AP"),
    ("Arunachal Pradesh", "AR"),
    ("Assam", "AS"),
    ("Bihar", "BR"),
    ("Chandigarh", "CH"),
    ("Chhattisgarh", "CT"),
    ("Dadra and Nagar Haveli and Daman and Diu", "DN"),
    ("Delhi", "DL"),
    ("Goa", "GA"),
    ("Gujarat", "GJ"),
    ("Haryana", "HR"),
    ("Himachal Pradesh", "HP"),
    ("Jammu and Kashmir", "JK"),
    ("Jharkhand", "JH"),
    ("Karnataka", "KA"),
    ("Kerala", "KL"),
    ("Ladakh", "LA"),
    ("Lakshadweep", "LD"),
    ("Madhya Pradesh", "MP"),
    ("Maharashtra", "MH"),
    ("Manipur", "MN"),
    ("Meghalaya", "ML"),
    ("Mizoram", "MZ"),
    ("Nagaland", "NL"),
    ("Odisha", "OR"),
    ("Puducherry", "PY"),
    ("Punjab", "PB"),
    ("Rajasthan", "RJ"),
    ("Sikkim", "SK"),
    ("Tamil Nadu", "TN"),
    ("Telangana", "TG"),
    ("Tripura", "TR"),
    ("Uttar Pradesh", "UP"),
    ("Uttarakhand", "UT"),
    ("West Bengal", "WB"),
];

/// Converts a full state name to its two-letter abbreviation.
///
/// Case-sensitive on the full name, matching the published datasets.
pub fn state_abbreviation(full_name: &str) -> Option<&'static str> {
    STATE_NAMES
        .iter()
        .find(|(name, _)| *name == full_name)
        .map(|(_, abbrev)| *abbrev)
}

/// Converts a two-letter abbreviation to the full state name.
pub fn state_full_name(abbreviation: &str) -> Option<&'static str> {
    let normalized = abbreviation.to_uppercase();
    STATE_NAMES
        .iter()
        .find(|(_, abbrev)| *abbrev == normalized)
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_name_mapping_roundtrip() {
        assert_eq!(state_abbreviation("Tripura"), Some("TR"));
        assert_eq!(state_full_name("TR"), Some("Tripura"));
        assert_eq!(state_full_name("tr"), Some("Tripura"));

        // Full-name lookup is case-sensitive.
        assert_eq!(state_abbreviation("tripura"), None);
        assert_eq!(state_abbreviation("Atlantis"), None);
    }

    #[test]
    fn test_default_registry_has_hierarchy_without_block() {
        let registry = LayerRegistry::default();
        assert!(registry.aoi_layer(AdminLevel::State).is_some());
        assert!(registry.aoi_layer(AdminLevel::District).is_some());
        assert!(registry.aoi_layer(AdminLevel::Block).is_none());
        assert!(registry.aoi_layer(AdminLevel::Village).is_some());
    }

    #[test]
    fn test_default_registry_indicator_layers() {
        let registry = LayerRegistry::default();
        for key in [
            "groundwater_pre_monsoon",
            "groundwater_during_monsoon",
            "groundwater_post_monsoon",
            "aquifer",
            "rural_facilities",
            "mgnrega_workers",
        ] {
            assert!(registry.indicator_layer(key).is_some(), "missing {key}");
        }
        assert!(registry.indicator_layer("unknown").is_none());

        let post = registry.indicator_layer("groundwater_post_monsoon").unwrap();
        assert_eq!(post.value_field.as_deref(), Some("wl_mbgl"));
    }

    #[test]
    fn test_entries_enumerate_aoi_layers_first() {
        let registry = LayerRegistry::default();
        let keys: Vec<String> = registry.entries().map(|(key, _)| key).collect();
        assert_eq!(keys[0], "state");
        assert_eq!(keys[1], "district");
        assert_eq!(keys[2], "village");
        assert_eq!(keys.len(), 9);
    }
}
