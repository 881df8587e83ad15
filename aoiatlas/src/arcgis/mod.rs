//! Feature-service query client
//!
//! This module provides the resilient query layer used by the resolver and
//! the indicator aggregator: a paginated, retrying client over the ArcGIS
//! REST query protocol, an HTTP seam for dependency injection, and a small
//! predicate builder that keeps escaping rules in one place.

mod client;
mod filter;
mod http;
mod types;

pub use client::{ArcGisClient, DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE};
pub use filter::Predicate;
pub use http::{HttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS};
pub use types::{ArcGisError, Feature, QueryParams};

#[cfg(test)]
pub use http::tests::{MockHttpClient, RecordedRequest};
