//! Snapshot sources.
//!
//! A snapshot is either read from a JSON file exported earlier or pulled
//! from the clinic's voucher list API for one tenant.

pub mod api;
pub mod file;

pub use api::{ApiOptions, VoucherApiClient};
pub use file::read_snapshot;

use crate::models::Snapshot;
use std::path::PathBuf;
use thiserror::Error;

/// Tenant every API query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub organization_id: i64,
}

impl TenantContext {
    pub fn new(organization_id: i64) -> Self {
        Self { organization_id }
    }
}

/// Errors raised while obtaining a snapshot.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read snapshot {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("Cannot connect to voucher API at {url}")]
    Connect { url: String },

    #[error("Voucher API error {status} from {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to decode {resource} page {page}: {source}")]
    Decode {
        resource: &'static str,
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Where a snapshot comes from.
#[derive(Debug, Clone)]
pub enum SnapshotSource {
    File(PathBuf),
    Api {
        options: ApiOptions,
        tenant: TenantContext,
    },
}

impl SnapshotSource {
    /// Short description for logs and report metadata.
    pub fn describe(&self) -> String {
        match self {
            SnapshotSource::File(path) => path.display().to_string(),
            SnapshotSource::Api { options, .. } => options.base_url.clone(),
        }
    }

    /// Tenant of the snapshot, when known.
    pub fn tenant(&self) -> Option<TenantContext> {
        match self {
            SnapshotSource::File(_) => None,
            SnapshotSource::Api { tenant, .. } => Some(*tenant),
        }
    }

    /// Load the snapshot.
    pub async fn load(&self) -> Result<Snapshot, SourceError> {
        match self {
            SnapshotSource::File(path) => read_snapshot(path),
            SnapshotSource::Api { options, tenant } => {
                let client = VoucherApiClient::new(options.clone())?;
                client.fetch_snapshot(*tenant).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_and_tenant() {
        let file = SnapshotSource::File(PathBuf::from("snapshot.json"));
        assert_eq!(file.describe(), "snapshot.json");
        assert_eq!(file.tenant(), None);

        let api = SnapshotSource::Api {
            options: ApiOptions {
                base_url: "https://clinic.example.com/api".to_string(),
                ..ApiOptions::default()
            },
            tenant: TenantContext::new(12),
        };
        assert_eq!(api.describe(), "https://clinic.example.com/api");
        assert_eq!(api.tenant(), Some(TenantContext::new(12)));
    }

    #[test]
    fn test_error_messages() {
        let err = SourceError::Timeout {
            url: "http://localhost/vouchers/instances".to_string(),
            seconds: 30,
        };
        assert_eq!(
            err.to_string(),
            "Request to http://localhost/vouchers/instances timed out after 30s"
        );
    }
}
