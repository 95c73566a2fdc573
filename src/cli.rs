//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::TimeWindow;
use clap::Parser;
use std::path::PathBuf;

/// Voucher Insights - voucher usage analytics for clinic tenants
///
/// Computes redemption and expiry rates, per-type statistics, popular
/// vouchers, customer behavior and an ROI estimate from a voucher snapshot,
/// and writes a Markdown, JSON or CSV report.
///
/// Examples:
///   voucher-insights --input snapshot.json
///   voucher-insights --api-url https://clinic.example.com/api --organization-id 12
///   voucher-insights --input snapshot.json --range 30d --format json
///   voucher-insights --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Snapshot JSON file with `templates` and `instances`
    ///
    /// Takes precedence over any configured API URL.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Base URL of the voucher list API
    #[arg(long, value_name = "URL", env = "VOUCHER_INSIGHTS_API_URL")]
    pub api_url: Option<String>,

    /// Organization (tenant) id to query
    #[arg(long, value_name = "ID", env = "VOUCHER_INSIGHTS_ORG_ID")]
    pub organization_id: Option<i64>,

    /// Bearer token for the voucher list API
    #[arg(
        long,
        value_name = "TOKEN",
        env = "VOUCHER_INSIGHTS_API_TOKEN",
        hide_env_values = true
    )]
    pub api_token: Option<String>,

    /// Output file path for the report
    ///
    /// Defaults to voucher_report.<md|json|csv> depending on --format.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json, csv)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Only include vouchers issued within this range
    #[arg(long, value_name = "RANGE")]
    pub range: Option<TimeWindow>,

    /// Number of popular vouchers and top customers to list
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Assumed average spend per redeemed voucher, for the ROI estimate
    #[arg(long, value_name = "AMOUNT")]
    pub avg_consumption: Option<f64>,

    /// API request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .voucher-insights.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .voucher-insights.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// CSV export of the ranking tables
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
        }

        if self.top == Some(0) {
            return Err("Top count must be at least 1".to_string());
        }

        if let Some(avg) = self.avg_consumption {
            if !avg.is_finite() || avg < 0.0 {
                return Err("Average consumption must be a non-negative number".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            api_url: Some("https://clinic.example.com/api".to_string()),
            organization_id: Some(1),
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
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.api_url = Some("clinic.example.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/nonexistent/snapshot.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_limits() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.avg_consumption = Some(-1.0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_range_and_format() {
        let args = Args::try_parse_from([
            "voucher-insights",
            "--range",
            "365d",
            "--format",
            "csv",
        ])
        .unwrap();

        assert_eq!(args.range, Some(TimeWindow::Last365Days));
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.format.extension(), "csv");
    }
}
