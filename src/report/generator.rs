//! Report generation.
//!
//! This module renders a voucher usage report as Markdown, JSON or CSV.

use crate::config::ReportConfig;
use crate::models::{
    CustomerProfile, OverallRates, PopularVoucher, Rate, Report, ReportMetadata, TypeBreakdown,
    VoucherType,
};
use anyhow::{Context, Result};
use serde::Serialize;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, sections: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Voucher Usage Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_metrics_section(
        &report.summary.overall,
        &report.summary.roi,
        &report.metadata,
    ));
    output.push_str(&generate_type_section(&report.summary.by_type));

    if sections.include_popular {
        output.push_str(&generate_popular_section(&report.summary.popular));
    }
    if sections.include_customers {
        output.push_str(&generate_customer_section(&report.summary.top_customers));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    if let Some(organization_id) = metadata.organization_id {
        section.push_str(&format!("- **Organization:** {}\n", organization_id));
    }
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!("- **Range:** {}\n", metadata.window.label()));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Templates:** {}\n", metadata.templates_count));
    section.push_str(&format!("- **Vouchers:** {}\n", metadata.instances_count));
    section.push('\n');

    section
}

/// Generate the key metrics table.
fn generate_metrics_section(overall: &OverallRates, roi: &Rate, metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Key Metrics\n\n");
    section.push_str("| Total Sent | Redemption Rate | Expiry Rate | Estimated ROI |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {:.1}% | {:.1}% | {}% |\n\n",
        overall.total, overall.redemption_rate, overall.expired_rate, roi
    ));
    section.push_str(&format!(
        "*ROI assumes an average spend of {} per redeemed voucher.*\n\n",
        format_amount(metadata.avg_consumption_per_voucher)
    ));

    section
}

/// Generate the by-type breakdown.
fn generate_type_section(by_type: &TypeBreakdown) -> String {
    let mut section = String::new();

    section.push_str("## Vouchers by Type\n\n");

    if by_type.is_empty() {
        section.push_str("No voucher data yet.\n\n");
        return section;
    }

    section.push_str("| Type | Sent | Redeemed | Redeemed % | Total Value |\n");
    section.push_str("|:---|:---:|:---:|:---:|---:|\n");

    for (key, stats) in by_type {
        section.push_str(&format!(
            "| {} | {} | {} | {}% | {} |\n",
            VoucherType::from(key.as_str()).label(),
            stats.total,
            stats.redeemed,
            stats.redeemed_percent(),
            format_amount(stats.value)
        ));
    }
    section.push('\n');

    section
}

/// Generate the popular voucher ranking.
fn generate_popular_section(popular: &[PopularVoucher]) -> String {
    let mut section = String::new();

    section.push_str("## Popular Vouchers\n\n");

    if popular.is_empty() {
        section.push_str("No voucher templates found.\n\n");
        return section;
    }

    section.push_str("| # | Voucher | Type | Sent | Redeemed | Redemption Rate |\n");
    section.push_str("|:---:|:---|:---|:---:|:---:|:---:|\n");

    for (i, voucher) in popular.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} {}% |\n",
            i + 1,
            escape_cell(&voucher.template.name),
            voucher.template.type_or_unknown().label(),
            voucher.sent_count,
            voucher.redeemed_count,
            voucher.redemption_rate.tier().emoji(),
            voucher.redemption_rate
        ));
    }
    section.push('\n');

    section
}

/// Generate the customer behavior table.
fn generate_customer_section(customers: &[CustomerProfile]) -> String {
    let mut section = String::new();

    section.push_str("## Customer Behavior\n\n");

    if customers.is_empty() {
        section.push_str("No customer data yet.\n\n");
        return section;
    }

    section.push_str("| Customer | Vouchers | Redeemed | Redemption Rate | Preferred Types |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---|\n");

    for customer in customers {
        let preferred = customer
            .preferred_types
            .split(", ")
            .filter(|t| !t.is_empty())
            .map(|t| VoucherType::from(t).label().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        section.push_str(&format!(
            "| {} | {} | {} | {} {}% | {} |\n",
            escape_cell(&customer.customer_name),
            customer.total_vouchers,
            customer.redeemed_vouchers,
            customer.redemption_rate.tier().emoji(),
            customer.redemption_rate,
            preferred
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by Voucher Insights*\n");

    footer
}

/// Make free text safe inside a Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

/// Format a monetary amount with thousands separators.
fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{}", rounded.abs() as u64);

    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// One row of the CSV export.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    section: &'static str,
    rank: usize,
    id: String,
    name: &'a str,
    voucher_type: String,
    total: usize,
    redeemed: usize,
    redemption_rate: String,
    preferred_types: &'a str,
}

/// Generate a CSV export of the popular voucher and customer tables.
pub fn generate_csv_report(report: &Report) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for (i, voucher) in report.summary.popular.iter().enumerate() {
        writer.serialize(CsvRow {
            section: "popular",
            rank: i + 1,
            id: voucher.template.id.to_string(),
            name: &voucher.template.name,
            voucher_type: voucher.template.type_or_unknown().to_string(),
            total: voucher.sent_count,
            redeemed: voucher.redeemed_count,
            redemption_rate: voucher.redemption_rate.to_string(),
            preferred_types: "",
        })?;
    }

    for (i, customer) in report.summary.top_customers.iter().enumerate() {
        writer.serialize(CsvRow {
            section: "customer",
            rank: i + 1,
            id: customer.customer_id.clone().unwrap_or_default(),
            name: &customer.customer_name,
            voucher_type: String::new(),
            total: customer.total_vouchers,
            redeemed: customer.redeemed_vouchers,
            redemption_rate: customer.redemption_rate.to_string(),
            preferred_types: &customer.preferred_types,
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
