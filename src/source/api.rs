//! Client for the clinic's voucher list API.
//!
//! Both listings are paginated `GET` endpoints scoped by `organizationId`
//! that answer with a `{ "data": [...] }` page. Pages are requested in
//! order until one comes back short or the page cap is hit.

use super::{SourceError, TenantContext};
use crate::models::{Snapshot, VoucherInstance, VoucherTemplate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const TEMPLATES: &str = "templates";
const INSTANCES: &str = "instances";

/// Connection and paging settings for the list API.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Base URL, e.g. `https://clinic.example.com/api`.
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub api_token: Option<String>,
    pub timeout_seconds: u64,
    pub template_page_size: u32,
    pub instance_page_size: u32,
    /// Upper bound on pages per listing.
    pub max_pages: u32,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: None,
            timeout_seconds: 30,
            template_page_size: 100,
            instance_page_size: 1000,
            max_pages: 50,
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Deserialize)]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Voucher list API client.
pub struct VoucherApiClient {
    options: ApiOptions,
    http_client: reqwest::Client,
}

impl VoucherApiClient {
    pub fn new(options: ApiOptions) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            options,
            http_client,
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/vouchers/{}",
            self.options.base_url.trim_end_matches('/'),
            resource
        )
    }

    /// Fetch templates and instances for one tenant.
    pub async fn fetch_snapshot(&self, tenant: TenantContext) -> Result<Snapshot, SourceError> {
        info!(
            "Fetching voucher snapshot for organization {} from {}",
            tenant.organization_id, self.options.base_url
        );

        let (templates, instances) = futures::try_join!(
            self.fetch_all::<VoucherTemplate>(TEMPLATES, self.options.template_page_size, tenant),
            self.fetch_all::<VoucherInstance>(INSTANCES, self.options.instance_page_size, tenant),
        )?;

        info!(
            "Fetched {} templates and {} instances",
            templates.len(),
            instances.len()
        );

        Ok(Snapshot {
            templates,
            instances,
        })
    }

    /// Walk every page of one listing.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        page_size: u32,
        tenant: TenantContext,
    ) -> Result<Vec<T>, SourceError> {
        let mut records = Vec::new();
        let page_size = page_size.max(1);

        for page in 1..=self.options.max_pages {
            let batch: Vec<T> = self.fetch_page(resource, page, page_size, tenant).await?;
            let received = batch.len();
            records.extend(batch);

            debug!("{} page {}: {} records", resource, page, received);

            if received < page_size as usize {
                return Ok(records);
            }
        }

        warn!(
            "Stopped fetching {} after {} pages; results may be incomplete",
            resource, self.options.max_pages
        );
        Ok(records)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        page: u32,
        limit: u32,
        tenant: TenantContext,
    ) -> Result<Vec<T>, SourceError> {
        let url = self.endpoint(resource);

        let mut request = self.http_client.get(&url).query(&[
            ("organizationId", tenant.organization_id.to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ]);
        if let Some(ref token) = self.options.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout {
                    url: url.clone(),
                    seconds: self.options.timeout_seconds,
                }
            } else if e.is_connect() {
                SourceError::Connect { url: url.clone() }
            } else {
                SourceError::Request(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { url, status, body });
        }

        let page_body: ListPage<T> = response
            .json()
            .await
            .map_err(|source| SourceError::Decode {
                resource,
                page,
                source,
            })?;

        Ok(page_body.data)
    }
}
