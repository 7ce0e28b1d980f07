//! End-to-end scan: position → query → engine → parse.

use std::time::{Duration, Instant};

use leadmatrix_extraction::{ExtractionEngine, build_request, parse_response};
use leadmatrix_shared::{Business, GeoBias, LeadMatrixError, Result, ScanQuery};
use tracing::{info, instrument};

use crate::fidelity::fidelity_score;
use crate::geo::{GeolocationProvider, acquire_bias};

/// Outcome of one successful scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// The query that produced the leads.
    pub query: ScanQuery,
    /// Parsed leads in engine order.
    pub leads: Vec<Business>,
    /// Grounding citations reported by the engine. Advisory only.
    pub source_count: usize,
    /// The position hint sent with the request, if any.
    pub geo_bias: Option<GeoBias>,
    pub elapsed: Duration,
}

impl ScanReport {
    /// True when the engine returned no usable lead blocks.
    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// Each lead paired with its fidelity score.
    pub fn scored(&self) -> impl Iterator<Item = (&Business, u8)> {
        self.leads.iter().map(|biz| (biz, fidelity_score(biz)))
    }
}

/// Progress callback for reporting scan status.
pub trait ScanProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the position lookup has settled.
    fn located(&self, bias: Option<GeoBias>);
    /// Called when the scan completes successfully.
    fn done(&self, report: &ScanReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ScanProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn located(&self, _bias: Option<GeoBias>) {}
    fn done(&self, _report: &ScanReport) {}
}

fn validate_query(query: &ScanQuery) -> Result<()> {
    if query.category.trim().is_empty() {
        return Err(LeadMatrixError::validation("category must not be empty"));
    }
    if query.location.trim().is_empty() {
        return Err(LeadMatrixError::validation("location must not be empty"));
    }
    Ok(())
}

/// Run one scan.
///
/// 1. Acquire a position hint (bounded by `geo_timeout`, soft failure)
/// 2. Build the grounded request
/// 3. Call the engine once
/// 4. Parse the response into leads
///
/// An engine failure ends the scan with an `Extraction` error. A response
/// without usable blocks is a successful, empty report.
#[instrument(skip_all, fields(category = %query.category, location = %query.location))]
pub async fn execute_scan<E, G>(
    query: ScanQuery,
    engine: &E,
    geolocator: &G,
    geo_timeout: Duration,
    progress: &dyn ScanProgress,
) -> Result<ScanReport>
where
    E: ExtractionEngine,
    G: GeolocationProvider,
{
    validate_query(&query)?;
    let start = Instant::now();

    progress.phase("Acquiring position");
    let geo_bias = acquire_bias(geolocator, geo_timeout).await;
    progress.located(geo_bias);

    progress.phase("Querying extraction engine");
    let request = build_request(&query, geo_bias);
    let raw = engine.generate(&request).await?;

    progress.phase("Parsing response");
    let leads = parse_response(&raw.text, raw.source_count);

    let report = ScanReport {
        query,
        leads,
        source_count: raw.source_count,
        geo_bias,
        elapsed: start.elapsed(),
    };

    info!(
        leads = report.leads.len(),
        sources = report.source_count,
        biased = report.geo_bias.is_some(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "scan complete"
    );

    progress.done(&report);
    Ok(report)
}
