// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;

use super::analyze::load_and_run;
use crate::engine::{AnalysisReport, MissingInput, RateSource};
use crate::models::{Fulfillment, Marketplace};
use crate::utils::{maybe_print_json, pretty_table};

/// Stored rates older than this are reported as stale.
pub const STALE_RATE_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
}

impl Issue {
    fn new(kind: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

fn missing_kind(m: &MissingInput) -> &'static str {
    match m {
        MissingInput::UnitCost => "missing_cost",
        MissingInput::Size => "missing_size",
        MissingInput::ShippingRoute { .. } => "missing_shipping_route",
        MissingInput::ShippingBracket { .. } => "size_beyond_bracket",
        MissingInput::UnknownFulfillment => "unknown_fulfillment",
    }
}

/// Data-quality problems in a finished report. `configured` lists the
/// marketplaces that have a country config.
pub fn diagnose(report: &AnalysisReport, configured: &[Marketplace], today: NaiveDate) -> Vec<Issue> {
    let mut issues = Vec::new();

    for m in &report.marketplaces {
        if !configured.contains(m) {
            issues.push(Issue::new(
                "no_country_config",
                format!("{} has transactions but no cost configuration", m),
            ));
        }
    }

    for sku in &report.skus {
        for missing in sku.outcome.missing() {
            issues.push(Issue::new(
                missing_kind(missing),
                format!("{} {}: {}", sku.marketplace, sku.sku, missing),
            ));
        }
        if sku.fulfillment == Fulfillment::Mixed {
            issues.push(Issue::new(
                "mixed_fulfillment",
                format!("{} {} sold through both FBA and FBM", sku.marketplace, sku.sku),
            ));
        }
    }

    match report.rate_source {
        RateSource::Fallback => issues.push(Issue::new(
            "stale_fx",
            "no stored FX rates; pinned fallback rates in use",
        )),
        RateSource::Stored { as_of } if (today - as_of).num_days() > STALE_RATE_DAYS => {
            issues.push(Issue::new(
                "stale_fx",
                format!("stored FX rates are from {}", as_of),
            ))
        }
        RateSource::Stored { .. } => {}
    }
    issues
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let (input, report) = load_and_run(conn, m)?;
    let configured: Vec<Marketplace> = input.countries.marketplaces().collect();
    let issues = diagnose(&report, &configured, Utc::now().date_naive());

    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &issues)? {
        return Ok(());
    }
    if issues.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        let rows = issues
            .into_iter()
            .map(|i| vec![i.kind.to_string(), i.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
