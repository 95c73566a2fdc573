//! Voucher Insights - voucher usage analytics for clinic tenants
//!
//! A CLI tool that takes a snapshot of voucher templates and issued
//! vouchers, either from a JSON file or from the clinic's list API, and
//! writes a usage report with redemption rates, type breakdowns, popular
//! vouchers, customer behavior and an ROI estimate.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, unreadable snapshot, etc.)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod source;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Report, ReportMetadata, Snapshot};
use source::{SnapshotSource, TenantContext};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Settings decide the log level, so they come first
    let config = match prepare_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("Voucher Insights v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    if let Err(e) = run_report(args, config).await {
        error!("Report failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .voucher-insights.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the API URL, organization, limits and ROI assumptions.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete report workflow.
async fn run_report(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Get the snapshot
    let source = resolve_source(&args, &config)?;
    println!("📥 Loading vouchers from: {}", source.describe());

    let snapshot = load_snapshot(&source, args.quiet).await?;

    // Step 2: Restrict to the requested range
    let window = config.analytics.window;
    let instances = analysis::filter_by_window(&snapshot.instances, window, Utc::now());
    if instances.len() != snapshot.instances.len() {
        info!(
            "{} of {} vouchers fall within {}",
            instances.len(),
            snapshot.instances.len(),
            window.label()
        );
    }

    // Step 3: Aggregate
    println!("🔬 Aggregating voucher usage...");
    let options = config.analytics_options();
    let summary = analysis::summarize(&snapshot.templates, &instances, &options);

    if summary.by_type.is_empty() && !instances.is_empty() {
        warn!("Vouchers found but no templates; type statistics will be empty");
    }

    let report = Report {
        metadata: ReportMetadata {
            organization_id: source.tenant().map(|t| t.organization_id),
            source: source.describe(),
            window,
            generated_at: Utc::now(),
            templates_count: snapshot.templates.len(),
            instances_count: instances.len(),
            avg_consumption_per_voucher: options.avg_consumption_per_voucher,
        },
        summary,
    };

    // Step 4: Generate and save the report
    println!("📝 Generating report...");

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Csv => report::generate_csv_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = output_path(&config, args.format);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    let overall = &report.summary.overall;
    println!("\n📊 Voucher Summary ({}):", window.label());
    println!("   Total sent: {}", overall.total);
    println!(
        "   Redemption rate: {:.1}% | Expiry rate: {:.1}% | Estimated ROI: {}%",
        overall.redemption_rate, overall.expired_rate, report.summary.roi
    );
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!(
        "\n✅ Report complete! Saved to: {}",
        output_path.display()
    );

    Ok(())
}

/// Load, merge and check the configuration.
fn prepare_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems are reported on stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", CONFIG_FILE_NAME, e);
            Ok(Config::default())
        }
    }
}

/// Pick the snapshot source. A local file wins over the API.
fn resolve_source(args: &Args, config: &Config) -> Result<SnapshotSource> {
    if let Some(ref input) = args.input {
        return Ok(SnapshotSource::File(input.clone()));
    }

    match config.api_options(args.api_token.clone()) {
        Some(options) => Ok(SnapshotSource::Api {
            options,
            tenant: TenantContext::new(config.source.organization_id),
        }),
        None => bail!("No snapshot source: pass --input FILE or --api-url URL"),
    }
}

/// Load the snapshot, with a spinner while the API is queried.
async fn load_snapshot(source: &SnapshotSource, quiet: bool) -> Result<Snapshot> {
    let spinner = match source {
        SnapshotSource::Api { .. } if !quiet => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Fetching voucher templates and instances...");
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        }
        _ => None,
    };

    let result = source.load().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let snapshot = result.with_context(|| format!("Failed to load {}", source.describe()))?;
    info!(
        "Snapshot has {} templates and {} vouchers",
        snapshot.templates.len(),
        snapshot.instances.len()
    );

    Ok(snapshot)
}

/// Output path from CLI/config, or a default named after the format.
fn output_path(config: &Config, format: OutputFormat) -> PathBuf {
    match config.general.output {
        Some(ref output) => PathBuf::from(output),
        None => PathBuf::from(format!("voucher_report.{}", format.extension())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resolve_source_prefers_input() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().display().to_string();
        let args = Args::try_parse_from([
            "voucher-insights",
            "--input",
            path.as_str(),
            "--api-url",
            "https://clinic.example.com/api",
        ])
        .unwrap();
        let mut config = Config::default();
        config.merge_with_args(&args);

        let source = resolve_source(&args, &config).unwrap();

        assert!(matches!(source, SnapshotSource::File(_)));
    }

    #[test]
    fn test_resolve_source_uses_tenant() {
        let args = Args::try_parse_from([
            "voucher-insights",
            "--api-url",
            "https://clinic.example.com/api",
            "--organization-id",
            "33",
        ])
        .unwrap();
        let mut config = Config::default();
        config.merge_with_args(&args);

        let source = resolve_source(&args, &config).unwrap();

        assert_eq!(source.tenant(), Some(TenantContext::new(33)));
    }

    fn bare_args() -> Args {
        Args {
            input: None,
            api_url: None,
            organization_id: None,
            api_token: None,
            output: None,
            format: OutputFormat::Markdown,
            range: None,
            top: None,
            avg_consumption: None,
            timeout: None,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_resolve_source_requires_something() {
        let args = bare_args();
        let mut config = Config::default();
        config.merge_with_args(&args);

        let err = resolve_source(&args, &config).unwrap_err();

        assert!(err.to_string().contains("No snapshot source"));
    }

    #[test]
    fn test_prepare_config_rejects_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[analytics]\ntop_limit = 0\navg_consumption_per_voucher = nan\n").unwrap();
        let mut args = bare_args();
        args.config = Some(file.path().to_path_buf());

        assert!(prepare_config(&args).is_err());

        args.top = Some(5);
        args.avg_consumption = Some(2000.0);
        let config = prepare_config(&args).unwrap();
        assert_eq!(config.analytics.top_limit, 5);
    }

    #[test]
    fn test_prepare_config_verbose_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[general]\nverbose = true\n").unwrap();
        let mut args = bare_args();
        args.config = Some(file.path().to_path_buf());

        let config = prepare_config(&args).unwrap();
        assert_eq!(config.log_level(args.quiet), tracing::Level::DEBUG);

        args.quiet = true;
        let config = prepare_config(&args).unwrap();
        assert_eq!(config.log_level(args.quiet), tracing::Level::ERROR);
    }

    #[test]
    fn test_output_path_defaults_by_format() {
        let mut config = Config::default();
        assert_eq!(
            output_path(&config, OutputFormat::Json),
            PathBuf::from("voucher_report.json")
        );

        config.general.output = Some("custom.md".to_string());
        assert_eq!(
            output_path(&config, OutputFormat::Json),
            PathBuf::from("custom.md")
        );
    }

    #[test]
    fn test_load_snapshot_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"templates": [{{"id": 1, "type": "gift", "value": 500}}], "instances": []}}"#
        )
        .unwrap();
        let source = SnapshotSource::File(file.path().to_path_buf());

        let snapshot = tokio_test::block_on(load_snapshot(&source, true)).unwrap();

        assert_eq!(snapshot.templates.len(), 1);
        assert!(snapshot.instances.is_empty());
    }
}
