//! Runtime configuration
//!
//! Settings are read from the environment with sensible defaults; an
//! unparseable value falls back to the default with a warning rather
//! than aborting startup.

use std::env;
use std::str::FromStr;

use tracing::warn;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.6;
pub const DEFAULT_GW_STRESS_THRESHOLD_M: f64 = 10.0;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Optional ArcGIS access token appended to every request.
    pub arcgis_token: Option<String>,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_factor: f64,
    /// Groundwater depth (metres below ground level) at or beyond which
    /// an AOI is flagged as water stressed.
    pub gw_stress_threshold_m: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            arcgis_token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            gw_stress_threshold_m: DEFAULT_GW_STRESS_THRESHOLD_M,
        }
    }
}

impl Settings {
    /// Builds settings from the process environment.
    ///
    /// Recognized variables: `ARCGIS_TOKEN`, `ARCGIS_TIMEOUT_SECS`,
    /// `ARCGIS_MAX_RETRIES`, `ARCGIS_BACKOFF_FACTOR`,
    /// `GW_STRESS_THRESHOLD_M`.
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Self {
            arcgis_token: env::var("ARCGIS_TOKEN").ok().filter(|t| !t.is_empty()),
            request_timeout_secs: parse_or_default(
                "ARCGIS_TIMEOUT_SECS",
                env::var("ARCGIS_TIMEOUT_SECS").ok(),
                defaults.request_timeout_secs,
            ),
            max_retries: parse_or_default(
                "ARCGIS_MAX_RETRIES",
                env::var("ARCGIS_MAX_RETRIES").ok(),
                defaults.max_retries,
            ),
            backoff_factor: parse_or_default(
                "ARCGIS_BACKOFF_FACTOR",
                env::var("ARCGIS_BACKOFF_FACTOR").ok(),
                defaults.backoff_factor,
            ),
            gw_stress_threshold_m: parse_or_default(
                "GW_STRESS_THRESHOLD_M",
                env::var("GW_STRESS_THRESHOLD_M").ok(),
                defaults.gw_stress_threshold_m,
            ),
        }
    }
}

/// Parses an optional environment value, warning and falling back on
/// failure.
fn parse_or_default<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key, value, "invalid configuration value, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.backoff_factor, 0.6);
        assert_eq!(settings.gw_stress_threshold_m, 10.0);
        assert!(settings.arcgis_token.is_none());
    }

    #[test]
    fn test_parse_or_default_accepts_valid_values() {
        assert_eq!(parse_or_default("K", Some("12".to_string()), 5u32), 12);
        assert_eq!(parse_or_default("K", Some("0.25".to_string()), 0.6f64), 0.25);
    }

    #[test]
    fn test_parse_or_default_falls_back_on_garbage() {
        assert_eq!(parse_or_default("K", Some("fast".to_string()), 5u32), 5);
        assert_eq!(parse_or_default::<u64>("K", None, 30), 30);
    }
}
