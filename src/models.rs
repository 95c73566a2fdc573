//! Data models for voucher analytics.
//!
//! This module contains the voucher records consumed from the clinic API
//! and the summary structures produced by the aggregator.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Identifier of a record as it comes off the wire.
///
/// The list API is not consistent about numeric versus string ids, so both
/// are accepted. Equality is strict: `1` and `"1"` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

/// Kind of promotional instrument a template defines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VoucherType {
    Treatment,
    Discount,
    Gift,
    StoredValue,
    Unknown,
    /// Any other type name, kept verbatim.
    Other(String),
}

impl VoucherType {
    /// Bucket key used in by-type statistics.
    pub fn key(&self) -> &str {
        match self {
            VoucherType::Treatment => "treatment",
            VoucherType::Discount => "discount",
            VoucherType::Gift => "gift",
            VoucherType::StoredValue => "stored_value",
            VoucherType::Unknown => "unknown",
            VoucherType::Other(name) => name.as_str(),
        }
    }

    /// Human-readable label for report tables.
    pub fn label(&self) -> &str {
        match self {
            VoucherType::Treatment => "Treatment voucher",
            VoucherType::Discount => "Discount voucher",
            VoucherType::Gift => "Gift card",
            VoucherType::StoredValue => "Stored value card",
            other => other.key(),
        }
    }
}

impl fmt::Display for VoucherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl From<&str> for VoucherType {
    fn from(s: &str) -> Self {
        match s {
            "treatment" => VoucherType::Treatment,
            "discount" => VoucherType::Discount,
            "gift" => VoucherType::Gift,
            "stored_value" => VoucherType::StoredValue,
            "unknown" => VoucherType::Unknown,
            other => VoucherType::Other(other.to_string()),
        }
    }
}

impl From<String> for VoucherType {
    fn from(s: String) -> Self {
        VoucherType::from(s.as_str())
    }
}

impl From<VoucherType> for String {
    fn from(t: VoucherType) -> Self {
        t.key().to_string()
    }
}

/// Lifecycle status of an issued voucher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VoucherStatus {
    Issued,
    Redeemed,
    Expired,
    /// Any other status (cancelled, transferred, ...), kept verbatim.
    Other(String),
}

impl Default for VoucherStatus {
    fn default() -> Self {
        VoucherStatus::Other(String::new())
    }
}

impl From<&str> for VoucherStatus {
    fn from(s: &str) -> Self {
        match s {
            "issued" => VoucherStatus::Issued,
            "redeemed" => VoucherStatus::Redeemed,
            "expired" => VoucherStatus::Expired,
            other => VoucherStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for VoucherStatus {
    fn from(s: String) -> Self {
        VoucherStatus::from(s.as_str())
    }
}

impl From<VoucherStatus> for String {
    fn from(status: VoucherStatus) -> Self {
        match status {
            VoucherStatus::Issued => "issued".to_string(),
            VoucherStatus::Redeemed => "redeemed".to_string(),
            VoucherStatus::Expired => "expired".to_string(),
            VoucherStatus::Other(s) => s,
        }
    }
}

/// A reusable voucher definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherTemplate {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    /// Missing, null and empty types all read as `None`.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "deserialize_optional_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub voucher_type: Option<VoucherType>,
    /// Face value or percentage; anything non-numeric reads as zero.
    #[serde(default, deserialize_with = "deserialize_lenient_number")]
    pub value: f64,
}

impl VoucherTemplate {
    /// The type bucket this template falls into.
    pub fn type_or_unknown(&self) -> VoucherType {
        self.voucher_type.clone().unwrap_or(VoucherType::Unknown)
    }
}

/// One issued copy of a template, bound to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherInstance {
    pub id: RecordId,
    #[serde(default)]
    pub template_id: Option<RecordId>,
    #[serde(default)]
    pub customer_id: Option<RecordId>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: VoucherStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl VoucherInstance {
    pub fn is_redeemed(&self) -> bool {
        self.status == VoucherStatus::Redeemed
    }

    pub fn is_expired(&self) -> bool {
        self.status == VoucherStatus::Expired
    }
}

/// A point-in-time view of a tenant's vouchers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub templates: Vec<VoucherTemplate>,
    #[serde(default)]
    pub instances: Vec<VoucherInstance>,
}

fn deserialize_optional_type<'de, D>(deserializer: D) -> Result<Option<VoucherType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(VoucherType::from))
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<VoucherStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(VoucherStatus::from).unwrap_or_default())
}

fn deserialize_lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let number = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };

    Ok(number.filter(|n| n.is_finite()).unwrap_or(0.0))
}

/// Time range selector for the instances included in a report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum TimeWindow {
    #[serde(rename = "7d")]
    #[value(name = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    #[value(name = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    #[value(name = "90d")]
    Last90Days,
    #[serde(rename = "365d")]
    #[value(name = "365d")]
    Last365Days,
    #[default]
    #[serde(rename = "all")]
    #[value(name = "all")]
    All,
}

impl TimeWindow {
    /// Length of the window, `None` for all time.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            TimeWindow::Last7Days => Some(Duration::days(7)),
            TimeWindow::Last30Days => Some(Duration::days(30)),
            TimeWindow::Last90Days => Some(Duration::days(90)),
            TimeWindow::Last365Days => Some(Duration::days(365)),
            TimeWindow::All => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::Last7Days => "Last 7 days",
            TimeWindow::Last30Days => "Last 30 days",
            TimeWindow::Last90Days => "Last 90 days",
            TimeWindow::Last365Days => "Last 365 days",
            TimeWindow::All => "All time",
        }
    }
}

/// A display percentage with one decimal place.
///
/// `None` means the denominator was zero and renders as a bare `"0"`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rate(pub Option<f64>);

impl Rate {
    /// Numeric value, zero when undefined.
    pub fn value(&self) -> f64 {
        self.0.unwrap_or(0.0)
    }

    pub fn tier(&self) -> RateTier {
        RateTier::from_percent(self.value())
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(pct) => write!(f, "{:.1}", round_to_tenth(pct)),
            None => write!(f, "0"),
        }
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Round to one decimal place, halves away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Coarse classification of a redemption rate for highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RateTier {
    Low,
    Medium,
    High,
}

impl RateTier {
    pub fn from_percent(pct: f64) -> Self {
        if pct >= 70.0 {
            RateTier::High
        } else if pct >= 40.0 {
            RateTier::Medium
        } else {
            RateTier::Low
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RateTier::High => "🟢",
            RateTier::Medium => "🟡",
            RateTier::Low => "🔴",
        }
    }
}

/// Redemption and expiry rates across all instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallRates {
    pub total: usize,
    pub redeemed: usize,
    pub expired: usize,
    /// Percentage rounded to one decimal.
    pub redemption_rate: f64,
    /// Percentage rounded to one decimal.
    pub expired_rate: f64,
}

/// Counts and exposure for one voucher type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeStats {
    pub total: usize,
    pub redeemed: usize,
    /// Template face value summed once per issued instance.
    pub value: f64,
}

impl TypeStats {
    /// Whole-number redemption percentage for type tiles.
    pub fn redeemed_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.redeemed as f64 / self.total as f64 * 100.0).round() as u32
    }
}

/// By-type statistics keyed by type, in first-seen order.
pub type TypeBreakdown = IndexMap<String, TypeStats>;

/// A template with its issue and redemption counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularVoucher {
    #[serde(flatten)]
    pub template: VoucherTemplate,
    pub sent_count: usize,
    pub redeemed_count: usize,
    pub redemption_rate: Rate,
}

/// Voucher usage of one customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    /// `None` groups the instances that carry no customer id.
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub total_vouchers: usize,
    pub redeemed_vouchers: usize,
    pub redemption_rate: Rate,
    /// Distinct template types in first-seen order, joined with ", ".
    pub preferred_types: String,
}

/// Everything the aggregator derives from one snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherSummary {
    pub overall: OverallRates,
    pub by_type: TypeBreakdown,
    pub popular: Vec<PopularVoucher>,
    pub top_customers: Vec<CustomerProfile>,
    pub roi: Rate,
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Tenant the snapshot was taken for, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,
    /// Where the snapshot came from (file path or API URL).
    pub source: String,
    pub window: TimeWindow,
    pub generated_at: DateTime<Utc>,
    pub templates_count: usize,
    /// Instances inside the window.
    pub instances_count: usize,
    pub avg_consumption_per_voucher: f64,
}

/// The complete voucher usage report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: VoucherSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_strict_equality() {
        let int: RecordId = serde_json::from_str("1").unwrap();
        let text: RecordId = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(int, RecordId::Int(1));
        assert_eq!(text, RecordId::Text("1".to_string()));
        assert_ne!(int, text);
        assert_eq!(int.to_string(), text.to_string());
    }

    #[test]
    fn test_template_lenient_fields() {
        let json = r#"[
            {"id": 1, "name": "Peel", "type": "treatment", "value": "1500.00"},
            {"id": 2, "name": "Ten off", "type": "", "value": null},
            {"id": 3, "name": "Mystery", "value": "abc"},
            {"id": 4, "name": "Card", "type": "gift_card", "value": 250}
        ]"#;

        let templates: Vec<VoucherTemplate> = serde_json::from_str(json).unwrap();

        assert_eq!(templates[0].voucher_type, Some(VoucherType::Treatment));
        assert_eq!(templates[0].value, 1500.0);
        assert_eq!(templates[1].voucher_type, None);
        assert_eq!(templates[1].value, 0.0);
        assert_eq!(templates[2].type_or_unknown(), VoucherType::Unknown);
        assert_eq!(templates[2].value, 0.0);
        assert_eq!(
            templates[3].voucher_type,
            Some(VoucherType::Other("gift_card".to_string()))
        );
        assert_eq!(templates[3].value, 250.0);
    }

    #[test]
    fn test_instance_from_camel_case() {
        let json = r#"{
            "id": 7,
            "templateId": 1,
            "customerId": "A",
            "customerName": "Alice",
            "status": "cancelled",
            "createdAt": "2026-10-01T08:00:00Z"
        }"#;

        let instance: VoucherInstance = serde_json::from_str(json).unwrap();

        assert_eq!(instance.template_id, Some(RecordId::Int(1)));
        assert_eq!(instance.customer_id, Some(RecordId::from("A")));
        assert_eq!(
            instance.status,
            VoucherStatus::Other("cancelled".to_string())
        );
        assert!(instance.created_at.is_some());
        assert!(!instance.is_redeemed());
        assert!(!instance.is_expired());
    }

    #[test]
    fn test_instance_minimal_fields() {
        let instance: VoucherInstance =
            serde_json::from_str(r#"{"id": "v-1", "status": null}"#).unwrap();

        assert_eq!(instance.template_id, None);
        assert_eq!(instance.customer_id, None);
        assert_eq!(instance.status, VoucherStatus::default());
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(Rate(None).to_string(), "0");
        assert_eq!(Rate(Some(0.0)).to_string(), "0.0");
        assert_eq!(Rate(Some(50.0)).to_string(), "50.0");
        assert_eq!(Rate(Some(100.0 / 3.0)).to_string(), "33.3");
        assert_eq!(Rate(Some(56.25)).to_string(), "56.3");
    }

    #[test]
    fn test_rate_serializes_as_string() {
        let json = serde_json::to_string(&Rate(Some(12.34))).unwrap();
        assert_eq!(json, "\"12.3\"");
    }

    #[test]
    fn test_rate_tier() {
        assert_eq!(Rate(Some(70.0)).tier(), RateTier::High);
        assert_eq!(Rate(Some(40.0)).tier(), RateTier::Medium);
        assert_eq!(Rate(Some(39.9)).tier(), RateTier::Low);
        assert_eq!(Rate(None).tier(), RateTier::Low);
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(VoucherType::from("stored_value").label(), "Stored value card");
        assert_eq!(VoucherType::from("free_item").label(), "free_item");
        assert_eq!(String::from(VoucherType::Gift), "gift");
    }

    #[test]
    fn test_type_stats_percent() {
        let stats = TypeStats {
            total: 3,
            redeemed: 2,
            value: 0.0,
        };
        assert_eq!(stats.redeemed_percent(), 67);
        assert_eq!(TypeStats::default().redeemed_percent(), 0);
    }

    #[test]
    fn test_time_window_parse() {
        let window: TimeWindow = serde_json::from_str("\"30d\"").unwrap();
        assert_eq!(window, TimeWindow::Last30Days);
        assert_eq!(window.duration(), Some(Duration::days(30)));
        assert_eq!(TimeWindow::All.duration(), None);
    }
}
