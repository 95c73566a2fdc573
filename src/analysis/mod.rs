//! Voucher analytics.
//!
//! The aggregator turns a snapshot of templates and instances into the
//! figures shown on the voucher usage report.

pub mod aggregator;

pub use aggregator::*;
