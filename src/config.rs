//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.voucher-insights.toml` files.

use crate::analysis::{AnalyticsOptions, DEFAULT_AVG_CONSUMPTION_PER_VOUCHER, DEFAULT_LIMIT};
use crate::models::TimeWindow;
use crate::source::ApiOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".voucher-insights.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Voucher API settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path. When unset the name follows the format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Voucher list API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the list API. Empty means not configured.
    #[serde(default)]
    pub api_url: String,

    /// Tenant to query.
    #[serde(default = "default_organization_id")]
    pub organization_id: i64,

    /// Page size for the template listing.
    #[serde(default = "default_template_page_size")]
    pub page_size_templates: u32,

    /// Page size for the instance listing.
    #[serde(default = "default_instance_page_size")]
    pub page_size_instances: u32,

    /// Maximum pages fetched per listing.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            organization_id: default_organization_id(),
            page_size_templates: default_template_page_size(),
            page_size_instances: default_instance_page_size(),
            max_pages: default_max_pages(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_organization_id() -> i64 {
    1
}

fn default_template_page_size() -> u32 {
    100
}

fn default_instance_page_size() -> u32 {
    1000
}

fn default_max_pages() -> u32 {
    50
}

fn default_timeout() -> u64 {
    30
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Length of the popular voucher and top customer lists.
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,

    /// Assumed spend per redeemed voucher for the ROI estimate.
    #[serde(default = "default_avg_consumption")]
    pub avg_consumption_per_voucher: f64,

    /// Time range of instances to include.
    #[serde(default)]
    pub window: TimeWindow,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_limit: default_top_limit(),
            avg_consumption_per_voucher: default_avg_consumption(),
            window: TimeWindow::default(),
        }
    }
}

fn default_top_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_avg_consumption() -> f64 {
    DEFAULT_AVG_CONSUMPTION_PER_VOUCHER
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the popular voucher ranking.
    #[serde(default = "default_true")]
    pub include_popular: bool,

    /// Include the customer behavior table.
    #[serde(default = "default_true")]
    pub include_customers: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_popular: true,
            include_customers: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref api_url) = args.api_url {
            self.source.api_url = api_url.clone();
        }
        if let Some(organization_id) = args.organization_id {
            self.source.organization_id = organization_id;
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        if let Some(top) = args.top {
            self.analytics.top_limit = top;
        }
        if let Some(avg) = args.avg_consumption {
            self.analytics.avg_consumption_per_voucher = avg;
        }
        if let Some(window) = args.range {
            self.analytics.window = window;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check merged settings against the same limits the CLI enforces.
    pub fn validate(&self) -> Result<()> {
        if self.analytics.top_limit == 0 {
            bail!("[analytics] top_limit must be at least 1");
        }

        let avg = self.analytics.avg_consumption_per_voucher;
        if !avg.is_finite() || avg < 0.0 {
            bail!(
                "[analytics] avg_consumption_per_voucher must be a non-negative number, got {}",
                avg
            );
        }

        if self.source.timeout_seconds == 0 {
            bail!("[source] timeout_seconds must be at least 1");
        }
        if self.source.page_size_templates == 0 || self.source.page_size_instances == 0 {
            bail!("[source] page sizes must be at least 1");
        }
        if self.source.max_pages == 0 {
            bail!("[source] max_pages must be at least 1");
        }

        let url = &self.source.api_url;
        if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("[source] api_url must start with 'http://' or 'https://'");
        }

        Ok(())
    }

    /// Log level for the merged settings. `--quiet` beats a verbose config.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// API options for the configured source, `None` if no URL is set.
    pub fn api_options(&self, api_token: Option<String>) -> Option<ApiOptions> {
        if self.source.api_url.is_empty() {
            return None;
        }

        Some(ApiOptions {
            base_url: self.source.api_url.clone(),
            api_token,
            timeout_seconds: self.source.timeout_seconds,
            template_page_size: self.source.page_size_templates,
            instance_page_size: self.source.page_size_instances,
            max_pages: self.source.max_pages,
        })
    }

    /// Aggregation options derived from the analytics section.
    pub fn analytics_options(&self) -> AnalyticsOptions {
        AnalyticsOptions {
            popular_limit: self.analytics.top_limit,
            customer_limit: self.analytics.top_limit,
            avg_consumption_per_voucher: self.analytics.avg_consumption_per_voucher,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
