//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use leadmatrix_core::export::write_csv;
use leadmatrix_core::fidelity::{fidelity_score, is_high_fidelity, mean_fidelity};
use leadmatrix_core::geo::Geolocator;
use leadmatrix_core::pipeline::{ScanProgress, ScanReport, execute_scan};
use leadmatrix_extraction::GeminiClient;
use leadmatrix_shared::{
    AppConfig, Business, EngineConfig, GeoBias, GeolocationConfig, LeadMatrixError, ScanQuery,
    expand_home, init_config, load_config, validate_api_key,
};
use leadmatrix_storage::Storage;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadMatrix: grounded business lead extraction.
#[derive(Parser)]
#[command(
    name = "leadmatrix",
    version,
    about = "Extract structured business leads for a market from a grounded generation engine.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scan a market and print the extracted leads.
    Scan {
        /// Business category (e.g. "dental clinics").
        #[arg(short, long)]
        category: String,

        /// Geographic zone (e.g. "Lagos, Nigeria").
        #[arg(short, long)]
        location: String,

        /// Boolean refinement forwarded to the engine (e.g. "HAS email AND NOT chain").
        #[arg(short, long)]
        boolean: Option<String>,

        /// Latitude to bias grounding with (overrides [geolocation]).
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude to bias grounding with (overrides [geolocation]).
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,

        /// Send no position hint at all.
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        no_geo: bool,

        /// Also write the leads to a CSV file.
        #[arg(long)]
        export: bool,
    },

    /// Inspect or purge the saved session.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Export the saved session as CSV.
    Export {
        /// Output directory (defaults to [export] output_dir).
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Session subcommands.
#[derive(Subcommand)]
pub(crate) enum SessionAction {
    /// Print the last saved scan.
    Show,
    /// Purge the saved scan.
    Clear,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadmatrix=info",
        1 => "leadmatrix=debug",
        _ => "leadmatrix=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scan {
            category,
            location,
            boolean,
            lat,
            lng,
            no_geo,
            export,
        } => {
            let mut query = ScanQuery::new(category, location);
            query.boolean_logic = boolean;
            let position = match (no_geo, lat, lng) {
                (true, _, _) => PositionOverride::Disabled,
                (false, Some(lat), Some(lng)) => PositionOverride::Fixed(GeoBias::new(lat, lng)),
                _ => PositionOverride::FromConfig,
            };
            cmd_scan(query, position, export).await
        }
        Command::Session { action } => match action {
            SessionAction::Show => cmd_session_show().await,
            SessionAction::Clear => cmd_session_clear().await,
        },
        Command::Export { out } => cmd_export(out.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Where the position hint for a scan comes from.
enum PositionOverride {
    FromConfig,
    Fixed(GeoBias),
    Disabled,
}

fn session_db_path(config: &AppConfig) -> PathBuf {
    expand_home(&config.session.db_path)
}

async fn cmd_scan(query: ScanQuery, position: PositionOverride, export: bool) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;

    let engine = GeminiClient::new(&EngineConfig::from(&config))?;

    let geo_config = GeolocationConfig::from(&config);
    let geolocator = match position {
        PositionOverride::Disabled => Geolocator::Off,
        PositionOverride::Fixed(bias) => {
            if !bias.is_valid() {
                return Err(eyre!(
                    "invalid coordinates {}, {}: latitude must be within ±90 and longitude within ±180",
                    bias.latitude,
                    bias.longitude
                ));
            }
            Geolocator::Fixed(bias)
        }
        PositionOverride::FromConfig => Geolocator::from_config(&geo_config)?,
    };
    let geo_timeout = Duration::from_millis(geo_config.timeout_ms);

    info!(
        category = %query.category,
        location = %query.location,
        "starting scan"
    );

    let reporter = CliProgress::new();
    let outcome = execute_scan(query, &engine, &geolocator, geo_timeout, &reporter).await;
    reporter.finish();

    let report = outcome.map_err(scan_failure)?;

    let storage = Storage::open(&session_db_path(&config)).await?;
    if !persist_report(&storage, &report).await? {
        println!();
        println!("  Manifest empty: no leads matched this market.");
        println!(
            "  Category: {}  Location: {}",
            report.query.category, report.query.location
        );
        println!();
        return Ok(());
    }

    print_leads(&report.leads);
    println!(
        "  {} leads · {} grounding sources · {:.1}s",
        report.leads.len(),
        report.source_count,
        report.elapsed.as_secs_f64()
    );

    if export {
        let dir = expand_home(&config.export.output_dir);
        export_report(&dir, &report)?;
    }
    println!();

    Ok(())
}

/// Map a failed scan to the message the operator sees.
fn scan_failure(error: LeadMatrixError) -> Report {
    if error.is_extraction() {
        Report::new(error).wrap_err("node synchronization lost")
    } else {
        error.into()
    }
}

/// Save the report into the session slot. An empty report leaves the
/// previous session in place; returns whether anything was saved.
async fn persist_report(storage: &Storage, report: &ScanReport) -> leadmatrix_shared::Result<bool> {
    if report.is_empty() {
        return Ok(false);
    }
    storage.save_session(&report.query, &report.leads).await?;
    Ok(true)
}

fn export_report(dir: &Path, report: &ScanReport) -> Result<()> {
    let path = write_csv(dir, &report.query, &report.leads)?;
    println!("  CSV:  {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Lead table
// ---------------------------------------------------------------------------

/// Shorten `value` to at most `width` characters.
fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut clipped: String = value.chars().take(width.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }
}

fn print_leads(leads: &[Business]) {
    println!();
    println!(
        "  {:<19} {:>5}  {:<30} {:<22} {:<18} {:<28}",
        "ID", "SCORE", "NAME", "LEADER", "PHONE", "EMAIL"
    );
    for biz in leads {
        let score = fidelity_score(biz);
        let marker = if is_high_fidelity(score) { "*" } else { " " };
        println!(
            "  {:<19} {:>4}{marker}  {:<30} {:<22} {:<18} {:<28}",
            biz.id.as_str(),
            score,
            clip(&biz.name, 30),
            clip(&biz.leader_name, 22),
            clip(&biz.phone, 18),
            clip(&biz.email, 28),
        );
    }
    println!();
    println!("  mean fidelity {:.1} (* = high fidelity)", mean_fidelity(leads));
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ScanProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn located(&self, bias: Option<GeoBias>) {
        if let Some(bias) = bias {
            self.spinner.set_message(format!(
                "Position locked at {:.4}, {:.4}",
                bias.latitude, bias.longitude
            ));
        }
    }

    fn done(&self, _report: &ScanReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Session / export
// ---------------------------------------------------------------------------

async fn cmd_session_show() -> Result<()> {
    let config = load_config()?;
    let db_path = session_db_path(&config);
    if !db_path.exists() {
        println!("No saved session.");
        return Ok(());
    }

    // Read-write so a corrupted slot is purged on load
    let storage = Storage::open(&db_path).await?;
    let Some(session) = storage.load_session().await? else {
        println!("No saved session.");
        return Ok(());
    };

    println!();
    println!("  Category: {}", session.query.category);
    println!("  Location: {}", session.query.location);
    if let Some(logic) = &session.query.boolean_logic {
        println!("  Boolean:  {logic}");
    }
    println!("  Saved:    {}", session.saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    print_leads(&session.leads);
    println!();

    Ok(())
}

async fn cmd_session_clear() -> Result<()> {
    let config = load_config()?;
    let db_path = session_db_path(&config);
    if !db_path.exists() {
        println!("No saved session.");
        return Ok(());
    }

    let storage = Storage::open(&db_path).await?;
    let Some(count) = storage.saved_lead_count().await? else {
        println!("No saved session.");
        return Ok(());
    };
    storage.clear_session().await?;
    info!(leads = count, "session purged");
    println!("Session cleared ({count} leads purged).");
    Ok(())
}

async fn cmd_export(out: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let db_path = session_db_path(&config);
    if !db_path.exists() {
        return Err(eyre!("no saved session to export; run `leadmatrix scan` first"));
    }

    let storage = Storage::open_readonly(&db_path).await?;
    let session = match storage.load_session().await? {
        Some(session) => session,
        None => {
            warn!("session slot empty or unreadable");
            return Err(eyre!("no saved session to export; run `leadmatrix scan` first"));
        }
    };

    let dir = expand_home(out.unwrap_or(&config.export.output_dir));
    let path = write_csv(&dir, &session.query, &session.leads)?;
    println!("Exported {} leads to {}", session.leads.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("lm_cli_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn report(query: ScanQuery, leads: Vec<Business>) -> ScanReport {
        ScanReport {
            query,
            leads,
            source_count: 0,
            geo_bias: None,
            elapsed: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn empty_report_keeps_previous_session() {
        let storage = test_storage().await;
        storage
            .save_session(
                &ScanQuery::new("dentists", "Lagos"),
                &[Business::named("Smile Bright Dental")],
            )
            .await
            .unwrap();

        let empty = report(ScanQuery::new("yurt makers", "Reykjavik"), Vec::new());
        assert!(!persist_report(&storage, &empty).await.unwrap());

        let session = storage.load_session().await.unwrap().unwrap();
        assert_eq!(session.query.category, "dentists");
        assert_eq!(session.leads.len(), 1);
        assert_eq!(session.leads[0].name, "Smile Bright Dental");
    }

    #[tokio::test]
    async fn non_empty_report_replaces_session() {
        let storage = test_storage().await;
        storage
            .save_session(
                &ScanQuery::new("dentists", "Lagos"),
                &[Business::named("Smile Bright Dental")],
            )
            .await
            .unwrap();

        let fresh = report(
            ScanQuery::new("bakeries", "Accra"),
            vec![Business::named("Accra Bakehouse"), Business::named("Golden Crust")],
        );
        assert!(persist_report(&storage, &fresh).await.unwrap());

        let session = storage.load_session().await.unwrap().unwrap();
        assert_eq!(session.query.category, "bakeries");
        assert_eq!(session.leads.len(), 2);
    }

    #[test]
    fn extraction_failure_reads_node_synchronization_lost() {
        let err = scan_failure(LeadMatrixError::extraction("HTTP 503: overloaded"));
        assert_eq!(err.to_string(), "node synchronization lost");
        assert!(err.chain().any(|cause| cause.to_string().contains("HTTP 503: overloaded")));
    }

    #[test]
    fn other_failures_pass_through() {
        let err = scan_failure(LeadMatrixError::validation("category must not be empty"));
        assert!(err.to_string().contains("category must not be empty"));
        assert!(!err.chain().any(|cause| cause.to_string().contains("node synchronization")));
    }

    #[test]
    fn clip_keeps_short_values() {
        assert_eq!(clip("Acme", 10), "Acme");
        assert_eq!(clip("N/A", 3), "N/A");
    }

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("Smile Bright Dental Clinic", 10), "Smile Bri…");
        assert_eq!(clip("Smile Bright Dental Clinic", 10).chars().count(), 10);
    }

    #[test]
    fn scan_args_parse() {
        let cli = Cli::try_parse_from([
            "leadmatrix",
            "scan",
            "--category",
            "dental clinics",
            "--location",
            "Accra",
            "--lat",
            "5.6037",
            "--lng",
            "-0.187",
        ])
        .unwrap();
        match cli.command {
            Command::Scan { lat, lng, no_geo, .. } => {
                assert_eq!(lat, Some(5.6037));
                assert_eq!(lng, Some(-0.187));
                assert!(!no_geo);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn lat_requires_lng() {
        let result = Cli::try_parse_from([
            "leadmatrix", "scan", "-c", "gyms", "-l", "Nairobi", "--lat", "1.0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn no_geo_conflicts_with_coordinates() {
        let result = Cli::try_parse_from([
            "leadmatrix", "scan", "-c", "gyms", "-l", "Nairobi", "--no-geo", "--lat", "1.0",
            "--lng", "2.0",
        ]);
        assert!(result.is_err());
    }
}
