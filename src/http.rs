//! Overpass API client for administrative boundaries.
//!
//! One POST per lookup, no retry and no timeout beyond the transport's own.
//! An empty answer is reported as [`InsightsError::BoundaryNotFound`].

use crate::boundary::{boundary_query, parse_overpass_response, BoundaryTable};
use crate::error::{InsightsError, Result};
use log::{debug, info, warn};
use reqwest::Client;
use std::time::Instant;

/// Public Overpass interpreter.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Overpass connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassConfig {
    /// Interpreter URL the query is POSTed to
    pub endpoint: String,
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: format!("track-insights/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Boundary fetcher bound to one endpoint.
pub struct OverpassClient {
    client: Client,
    config: OverpassConfig,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| InsightsError::Http {
                message: format!("failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OverpassConfig {
        &self.config
    }

    /// Fetch the administrative boundary of `place`.
    pub async fn fetch_boundary(&self, place: &str) -> Result<BoundaryTable> {
        info!("Getting boundaries for {}", place);
        let start = Instant::now();

        let query = boundary_query(place);
        debug!("[Overpass] POST {} ({} bytes of query)", self.config.endpoint, query.len());

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("[Overpass] {} answered {}", self.config.endpoint, status);
            return Err(InsightsError::Http {
                message: format!("Overpass request for {} failed", place),
                status_code: Some(status.as_u16()),
            });
        }

        let body = response.bytes().await?;
        let table = parse_overpass_response(place, &body)?;

        info!(
            "Extracted boundaries for {}. Time elapsed: {:.2} s",
            place,
            start.elapsed().as_secs_f64()
        );
        Ok(table)
    }
}

/// Blocking boundary lookup against a configured endpoint.
///
/// Runs its own single-threaded runtime, so it must not be called from
/// inside an async context.
pub fn get_boundary_with(config: OverpassConfig, place: &str) -> Result<BoundaryTable> {
    use tokio::runtime::Builder;

    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| InsightsError::Http {
            message: format!("failed to create runtime: {}", e),
            status_code: None,
        })?;

    let client = OverpassClient::new(config)?;
    rt.block_on(client.fetch_boundary(place))
}

/// Blocking boundary lookup against the public Overpass endpoint.
pub fn get_boundary(place: &str) -> Result<BoundaryTable> {
    get_boundary_with(OverpassConfig::default(), place)
}
