//! Paginated, retrying feature-layer query client.

use super::filter::Predicate;
use super::http::HttpClient;
use super::types::{ArcGisError, Feature, QueryParams, QueryResponse};
use rand::Rng;
use serde_json::json;
use std::time::Duration;
use tracing::{error, warn};

/// Default page size for paginated queries.
pub const DEFAULT_PAGE_SIZE: u32 = 2000;

/// Default maximum number of retries for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default exponential backoff factor, in seconds.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.6;

/// Feature-layer query client with pagination and retry logic.
///
/// Pages transparently through offset-based result cursors and retries
/// rate-limited or transiently failing requests with exponential backoff
/// and jitter. Holds no per-request state, so one instance serves a whole
/// process.
///
/// # Example
///
/// ```ignore
/// use aoiatlas::arcgis::{ArcGisClient, Predicate, ReqwestClient};
///
/// let client = ArcGisClient::new(ReqwestClient::new()?);
/// let features = client
///     .query_where(layer_url, &Predicate::eq_fold("State", "Tripura"))
///     .await?;
/// ```
pub struct ArcGisClient<C: HttpClient> {
    http: C,
    token: Option<String>,
    max_retries: u32,
    backoff_factor: f64,
}

impl<C: HttpClient> ArcGisClient<C> {
    /// Creates a new client with default retry settings and no token.
    pub fn new(http: C) -> Self {
        Self {
            http,
            token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }

    /// Sets the bearer token attached to every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Overrides the retry budget and backoff factor.
    pub fn with_retry(mut self, max_retries: u32, backoff_factor: f64) -> Self {
        self.max_retries = max_retries;
        self.backoff_factor = backoff_factor;
        self
    }

    /// Exposes the underlying transport so tests can inspect recorded
    /// requests.
    #[cfg(test)]
    pub(crate) fn http(&self) -> &C {
        &self.http
    }

    /// Executes a paginated query against a feature layer.
    ///
    /// The endpoint is normalized to the `/query` action, so callers may
    /// pass the layer root URL. Features are returned in request order
    /// across pages.
    pub async fn query(&self, url: &str, params: QueryParams) -> Result<Vec<Feature>, ArcGisError> {
        let request_url = normalize_query_url(url);
        let base = self.base_form(&params);

        let mut features: Vec<Feature> = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut form = base.clone();
            form.push(("resultOffset".to_string(), offset.to_string()));

            let page = self.request(&request_url, &form).await?;
            let count = page.features.len();
            features.extend(page.features);

            // A page that is not truncated, or an empty page, ends the
            // cursor walk. Never loop on a successful empty response.
            if !page.exceeded_transfer_limit || count == 0 {
                break;
            }
            offset += count as u64;
        }

        Ok(features)
    }

    /// Queries a layer with an attribute predicate only.
    pub async fn query_where(
        &self,
        url: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Feature>, ArcGisError> {
        self.query_where_with(url, predicate, QueryParams::default())
            .await
    }

    /// Queries a layer with an attribute predicate and extra parameters.
    pub async fn query_where_with(
        &self,
        url: &str,
        predicate: &Predicate,
        mut params: QueryParams,
    ) -> Result<Vec<Feature>, ArcGisError> {
        params.where_clause = Some(predicate.to_sql());
        self.query(url, params).await
    }

    /// Queries features intersecting a polygon.
    pub async fn query_intersect_polygon(
        &self,
        url: &str,
        polygon: &geo::Polygon<f64>,
        mut params: QueryParams,
    ) -> Result<Vec<Feature>, ArcGisError> {
        let rings = polygon_rings(polygon);
        params.extra.push((
            "geometryType".to_string(),
            "esriGeometryPolygon".to_string(),
        ));
        params.extra.push((
            "spatialRel".to_string(),
            "esriSpatialRelIntersects".to_string(),
        ));
        params.extra.push((
            "geometry".to_string(),
            json!({"rings": rings, "spatialReference": {"wkid": 4326}}).to_string(),
        ));
        self.query(url, params).await
    }

    /// Queries features within a radius (meters) of a point.
    pub async fn query_near_point(
        &self,
        url: &str,
        lat: f64,
        lon: f64,
        radius_m: f64,
        order_by: Option<&str>,
        limit: Option<u32>,
        mut params: QueryParams,
    ) -> Result<Vec<Feature>, ArcGisError> {
        params
            .extra
            .push(("geometryType".to_string(), "esriGeometryPoint".to_string()));
        params
            .extra
            .push(("distance".to_string(), radius_m.to_string()));
        params
            .extra
            .push(("units".to_string(), "esriMeters".to_string()));
        params.extra.push((
            "spatialRel".to_string(),
            "esriSpatialRelIntersects".to_string(),
        ));
        params.extra.push((
            "geometry".to_string(),
            json!({"x": lon, "y": lat, "spatialReference": {"wkid": 4326}}).to_string(),
        ));
        if let Some(fields) = order_by {
            params
                .extra
                .push(("orderByFields".to_string(), fields.to_string()));
        }
        if let Some(limit) = limit {
            // The row cap rides the page-size parameter, so a capped query
            // never pages past the cap.
            params.page_size = Some(limit);
        }
        self.query(url, params).await
    }

    /// Builds the form parameters shared by every page of a query.
    fn base_form(&self, params: &QueryParams) -> Vec<(String, String)> {
        let mut form = vec![
            (
                "where".to_string(),
                params.where_clause.clone().unwrap_or_else(|| "1=1".into()),
            ),
            (
                "outFields".to_string(),
                params.out_fields.clone().unwrap_or_else(|| "*".into()),
            ),
            (
                "resultRecordCount".to_string(),
                params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).to_string(),
            ),
            (
                "returnGeometry".to_string(),
                params.return_geometry.unwrap_or(true).to_string(),
            ),
            ("outSR".to_string(), "4326".to_string()),
            ("f".to_string(), "json".to_string()),
        ];
        form.extend(params.extra.iter().cloned());
        if let Some(token) = &self.token {
            form.push(("token".to_string(), token.clone()));
        }
        form
    }

    /// Sends one request, retrying transient transport failures.
    async fn request(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<QueryResponse, ArcGisError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.http.post_form(url, form).await {
                Ok(body) => {
                    let response: QueryResponse = serde_json::from_slice(&body)
                        .map_err(|e| ArcGisError::InvalidResponse(e.to_string()))?;
                    if let Some(payload) = response.error {
                        // Embedded error payload: malformed query, not a
                        // transient condition.
                        return Err(ArcGisError::Service(payload.to_string()));
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retriable() && attempt <= self.max_retries => {
                    let delay = backoff_delay(attempt, self.backoff_factor);
                    warn!(
                        url = url,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient query failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retriable() {
                        error!(url = url, "Max retries exceeded");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Backoff delay before re-attempting request `attempt` (1-based):
/// `factor * 2^(attempt-1)` plus a jitter in `[0, half the base)`.
fn backoff_delay(attempt: u32, factor: f64) -> Duration {
    let base = factor * 2f64.powi(attempt as i32 - 1);
    let half = base / 2.0;
    let jitter = if half > 0.0 {
        rand::thread_rng().gen_range(0.0..half)
    } else {
        0.0
    };
    Duration::from_secs_f64(base + jitter)
}

/// Ensures queries hit the `/query` action even when the caller passed
/// the layer root URL.
fn normalize_query_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/query") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/query")
    }
}

/// Serializes polygon rings (exterior first) as coordinate arrays.
fn polygon_rings(polygon: &geo::Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}
