//! Voucher usage aggregation and statistics.
//!
//! Every function here is a pure computation over a snapshot of templates
//! and instances. None of them fail: empty inputs, zero denominators and
//! unresolved template references all degrade to zero-valued results.

use crate::models::{
    round_to_tenth, CustomerProfile, OverallRates, PopularVoucher, Rate, RecordId, TimeWindow,
    TypeBreakdown, TypeStats, VoucherInstance, VoucherSummary, VoucherTemplate,
};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Default length of the popular and top-customer lists.
pub const DEFAULT_LIMIT: usize = 10;

/// Assumed spend per redeemed voucher when estimating ROI.
pub const DEFAULT_AVG_CONSUMPTION_PER_VOUCHER: f64 = 3500.0;

/// Display name for instances without a customer name.
pub const UNKNOWN_CUSTOMER: &str = "Unknown customer";

/// Knobs for [`summarize`].
#[derive(Debug, Clone)]
pub struct AnalyticsOptions {
    pub popular_limit: usize,
    pub customer_limit: usize,
    pub avg_consumption_per_voucher: f64,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self {
            popular_limit: DEFAULT_LIMIT,
            customer_limit: DEFAULT_LIMIT,
            avg_consumption_per_voucher: DEFAULT_AVG_CONSUMPTION_PER_VOUCHER,
        }
    }
}

/// Issued and redeemed counts for one template id.
#[derive(Debug, Clone, Copy, Default)]
struct UsageCount {
    sent: usize,
    redeemed: usize,
}

/// Count instances per referenced template id in a single pass.
fn usage_by_template(instances: &[VoucherInstance]) -> HashMap<&RecordId, UsageCount> {
    let mut usage: HashMap<&RecordId, UsageCount> = HashMap::new();

    for instance in instances {
        if let Some(ref template_id) = instance.template_id {
            let count = usage.entry(template_id).or_default();
            count.sent += 1;
            if instance.is_redeemed() {
                count.redeemed += 1;
            }
        }
    }

    usage
}

/// Index templates by id. The first template wins when ids repeat.
fn index_templates(templates: &[VoucherTemplate]) -> HashMap<&RecordId, &VoucherTemplate> {
    let mut index = HashMap::new();

    for template in templates {
        index.entry(&template.id).or_insert(template);
    }

    index
}

/// `part / whole * 100`, or `None` when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

/// Compute the overall redemption and expiry rates.
pub fn compute_overall_rates(instances: &[VoucherInstance]) -> OverallRates {
    let total = instances.len();
    let redeemed = instances.iter().filter(|i| i.is_redeemed()).count();
    let expired = instances.iter().filter(|i| i.is_expired()).count();

    let rate = |count| percentage(count, total).map(round_to_tenth).unwrap_or(0.0);

    OverallRates {
        total,
        redeemed,
        expired,
        redemption_rate: rate(redeemed),
        expired_rate: rate(expired),
    }
}

/// Compute issue counts, redemptions and face value per voucher type.
///
/// `value` accumulates the template's face value once per matched instance,
/// so it reports total issued exposure rather than distinct template value.
pub fn compute_by_type(
    templates: &[VoucherTemplate],
    instances: &[VoucherInstance],
) -> TypeBreakdown {
    let usage = usage_by_template(instances);
    let index = index_templates(templates);
    let mut breakdown = TypeBreakdown::new();

    for template in templates {
        let count = usage.get(&template.id).copied().unwrap_or_default();
        // Value comes from the first template registered under this id.
        let unit_value = index.get(&template.id).map(|t| t.value).unwrap_or(0.0);

        let stats = breakdown
            .entry(template.type_or_unknown().key().to_string())
            .or_insert_with(TypeStats::default);

        stats.total += count.sent;
        stats.redeemed += count.redeemed;
        stats.value += unit_value * count.sent as f64;
    }

    breakdown
}

/// Rank templates by how many instances were issued.
///
/// Ties keep template list order.
pub fn rank_popular(
    templates: &[VoucherTemplate],
    instances: &[VoucherInstance],
    limit: usize,
) -> Vec<PopularVoucher> {
    let usage = usage_by_template(instances);

    let mut ranked: Vec<PopularVoucher> = templates
        .iter()
        .map(|template| {
            let count = usage.get(&template.id).copied().unwrap_or_default();
            PopularVoucher {
                template: template.clone(),
                sent_count: count.sent,
                redeemed_count: count.redeemed,
                redemption_rate: Rate(percentage(count.redeemed, count.sent)),
            }
        })
        .collect();

    ranked.sort_by_key(|p| Reverse(p.sent_count));
    ranked.truncate(limit);

    ranked
}

#[derive(Debug)]
struct CustomerTally<'a> {
    name: String,
    total: usize,
    redeemed: usize,
    types: IndexSet<&'a str>,
}

/// Build per-customer usage profiles, busiest customers first.
pub fn profile_customers(
    templates: &[VoucherTemplate],
    instances: &[VoucherInstance],
    limit: usize,
) -> Vec<CustomerProfile> {
    let index = index_templates(templates);
    let mut tallies: IndexMap<Option<String>, CustomerTally<'_>> = IndexMap::new();

    for instance in instances {
        let key = instance.customer_id.as_ref().map(|id| id.to_string());

        let tally = tallies.entry(key).or_insert_with(|| CustomerTally {
            name: instance
                .customer_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string()),
            total: 0,
            redeemed: 0,
            types: IndexSet::new(),
        });

        tally.total += 1;
        if instance.is_redeemed() {
            tally.redeemed += 1;
        }

        let voucher_type = instance
            .template_id
            .as_ref()
            .and_then(|id| index.get(id))
            .and_then(|template| template.voucher_type.as_ref());
        if let Some(voucher_type) = voucher_type {
            tally.types.insert(voucher_type.key());
        }
    }

    let mut profiles: Vec<CustomerProfile> = tallies
        .into_iter()
        .map(|(customer_id, tally)| CustomerProfile {
            customer_id,
            customer_name: tally.name,
            total_vouchers: tally.total,
            redeemed_vouchers: tally.redeemed,
            redemption_rate: Rate(percentage(tally.redeemed, tally.total)),
            preferred_types: tally.types.into_iter().collect::<Vec<_>>().join(", "),
        })
        .collect();

    profiles.sort_by_key(|p| Reverse(p.total_vouchers));
    profiles.truncate(limit);

    profiles
}

/// Estimate voucher ROI from redemptions and a fixed spend per voucher.
///
/// This is a heuristic, not a measurement: revenue is assumed, never read
/// from sales data.
pub fn estimate_roi(
    type_stats: &TypeBreakdown,
    total_redeemed: usize,
    avg_consumption_per_voucher: f64,
) -> Rate {
    let total_voucher_value: f64 = type_stats.values().map(|s| s.value).sum();

    if total_voucher_value == 0.0 {
        return Rate(None);
    }

    let estimated_revenue = total_redeemed as f64 * avg_consumption_per_voucher;
    Rate(Some(
        (estimated_revenue - total_voucher_value) / total_voucher_value * 100.0,
    ))
}

/// Keep instances issued inside the window ending at `now`.
///
/// Instances without an issue timestamp are always kept.
pub fn filter_by_window(
    instances: &[VoucherInstance],
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Vec<VoucherInstance> {
    let Some(span) = window.duration() else {
        return instances.to_vec();
    };
    let start = now - span;

    instances
        .iter()
        .filter(|i| match i.created_at {
            Some(created) => created >= start && created <= now,
            None => true,
        })
        .cloned()
        .collect()
}

/// Run every aggregation over one snapshot.
pub fn summarize(
    templates: &[VoucherTemplate],
    instances: &[VoucherInstance],
    options: &AnalyticsOptions,
) -> VoucherSummary {
    let overall = compute_overall_rates(instances);
    let by_type = compute_by_type(templates, instances);
    let roi = estimate_roi(
        &by_type,
        overall.redeemed,
        options.avg_consumption_per_voucher,
    );

    VoucherSummary {
        popular: rank_popular(templates, instances, options.popular_limit),
        top_customers: profile_customers(templates, instances, options.customer_limit),
        overall,
        by_type,
        roi,
    }
}
