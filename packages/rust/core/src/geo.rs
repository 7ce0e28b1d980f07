//! Best-effort operator geolocation used to bias maps grounding.
//!
//! Every failure here is soft: [`acquire_bias`] turns errors and timeouts
//! into `None` and the scan proceeds without a location hint.

use std::future::Future;
use std::time::Duration;

use leadmatrix_shared::{GeoBias, GeolocationConfig, GeolocationMode, LeadMatrixError, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

/// User-Agent string for position lookups.
const USER_AGENT: &str = concat!("LeadMatrix/", env!("CARGO_PKG_VERSION"));

/// One "get current position" capability.
pub trait GeolocationProvider: Send + Sync {
    fn current_position(&self) -> impl Future<Output = Result<GeoBias>> + Send;
}

// ---------------------------------------------------------------------------
// IP lookup
// ---------------------------------------------------------------------------

/// Resolves the caller's approximate position from a JSON IP-lookup service.
pub struct IpLocator {
    http: Client,
    lookup_url: Url,
}

/// Accepts both `lat`/`lon` (ip-api.com) and `latitude`/`longitude` shapes.
#[derive(Debug, Deserialize)]
struct LookupBody {
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
}

impl IpLocator {
    pub fn new(lookup_url: &str) -> Result<Self> {
        let lookup_url = Url::parse(lookup_url).map_err(|e| {
            LeadMatrixError::config(format!("invalid geolocation.lookup_url '{lookup_url}': {e}"))
        })?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LeadMatrixError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, lookup_url })
    }
}

impl GeolocationProvider for IpLocator {
    async fn current_position(&self) -> Result<GeoBias> {
        let response = self
            .http
            .get(self.lookup_url.clone())
            .send()
            .await
            .map_err(|e| LeadMatrixError::Network(format!("position lookup failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadMatrixError::Network(format!(
                "position lookup returned HTTP {status}"
            )));
        }

        let body: LookupBody = response
            .json()
            .await
            .map_err(|e| LeadMatrixError::Network(format!("invalid position payload: {e}")))?;

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => {
                let bias = GeoBias::new(lat, lon);
                if bias.is_valid() {
                    Ok(bias)
                } else {
                    Err(LeadMatrixError::validation(format!(
                        "position out of range: {lat}, {lon}"
                    )))
                }
            }
            _ => Err(LeadMatrixError::Network(
                "position payload has no coordinates".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Geolocator
// ---------------------------------------------------------------------------

/// The provider selected by `[geolocation] mode` or CLI overrides.
pub enum Geolocator {
    /// No capability; every lookup fails.
    Off,
    Fixed(GeoBias),
    Ip(IpLocator),
}

impl Geolocator {
    pub fn from_config(config: &GeolocationConfig) -> Result<Self> {
        match config.mode {
            GeolocationMode::Off => Ok(Self::Off),
            GeolocationMode::Fixed => config
                .fixed
                .filter(GeoBias::is_valid)
                .map(Self::Fixed)
                .ok_or_else(|| {
                    LeadMatrixError::config(
                        "geolocation.mode = \"fixed\" requires latitude and longitude \
                         within ±90 / ±180",
                    )
                }),
            GeolocationMode::Ip => Ok(Self::Ip(IpLocator::new(&config.lookup_url)?)),
        }
    }
}

impl GeolocationProvider for Geolocator {
    async fn current_position(&self) -> Result<GeoBias> {
        match self {
            Self::Off => Err(LeadMatrixError::validation("geolocation disabled")),
            Self::Fixed(bias) => Ok(*bias),
            Self::Ip(locator) => locator.current_position().await,
        }
    }
}

/// Make one bounded attempt to obtain a position.
pub async fn acquire_bias<G: GeolocationProvider>(provider: &G, timeout: Duration) -> Option<GeoBias> {
    match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Ok(bias)) => {
            debug!(lat = bias.latitude, lng = bias.longitude, "position acquired");
            Some(bias)
        }
        Ok(Err(e)) => {
            debug!(error = %e, "geolocation bypassed");
            None
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "geolocation timed out");
            None
        }
    }
}
