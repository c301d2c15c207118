// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::RateSource;
use crate::models::{COST_CURRENCY, Currency};
use crate::utils::{
    http_client, load_rate_table, maybe_print_json, parse_currency, parse_decimal, pretty_table,
    set_reporting_currency, store_rate,
};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set-base", sub)) => {
            let ccy = parse_currency(sub.get_one::<String>("currency").unwrap())?;
            set_reporting_currency(conn, ccy)?;
            println!("Reporting currency set to {}", ccy);
        }
        Some(("fetch", _)) => fetch_rates(conn)?,
        Some(("list", sub)) => list_rates(conn, sub)?,
        Some(("convert", sub)) => convert_amount(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Frankfurter `latest` payload: 1 base = rate quote.
#[derive(Debug, Deserialize)]
pub struct Latest {
    pub base: String,
    pub date: NaiveDate,
    pub rates: HashMap<String, f64>,
}

/// Persist the supported currencies of a `latest` payload. Returns how
/// many rates were stored.
pub fn store_latest(conn: &Connection, latest: &Latest) -> Result<usize> {
    let base = parse_currency(&latest.base)?;
    if base != COST_CURRENCY {
        anyhow::bail!("Expected {}-based rates, got {}", COST_CURRENCY, base);
    }
    let mut stored = 0;
    for (quote, rate) in &latest.rates {
        let Ok(ccy) = quote.parse::<Currency>() else {
            continue;
        };
        let rate = parse_decimal(&rate.to_string())
            .with_context(|| format!("Rate for {} is not representable", quote))?;
        store_rate(conn, latest.date, ccy, rate)?;
        stored += 1;
    }
    Ok(stored)
}

fn fetch_rates(conn: &Connection) -> Result<()> {
    let url = format!("https://api.frankfurter.dev/v1/latest?base={}", COST_CURRENCY);
    let client = http_client()?;
    let resp = client
        .get(&url)
        .send()
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?;
    let latest: Latest = resp.json().context("Decode Frankfurter response")?;
    let stored = store_latest(conn, &latest)?;
    let missing: Vec<&str> = Currency::ALL
        .iter()
        .filter(|c| **c != COST_CURRENCY && !latest.rates.contains_key(c.code()))
        .map(|c| c.code())
        .collect();
    println!(
        "Stored {} FX rates as of {} via Frankfurter (ECB).",
        stored, latest.date
    );
    if !missing.is_empty() {
        println!("Pinned rates remain in use for: {}", missing.join(", "));
    }
    Ok(())
}

#[derive(Serialize)]
struct RateRow {
    currency: Currency,
    per_usd: Decimal,
}

fn describe(source: RateSource) -> String {
    match source {
        RateSource::Fallback => "pinned fallback rates".to_string(),
        RateSource::Stored { as_of } => format!("stored rates as of {}", as_of),
    }
}

fn list_rates(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let table = load_rate_table(conn);
    let data: Vec<RateRow> = table
        .rates()
        .map(|(currency, per_usd)| RateRow { currency, per_usd })
        .collect();
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = data
        .iter()
        .map(|r| vec![r.currency.to_string(), r.per_usd.to_string()])
        .collect();
    println!("{}", pretty_table(&["Currency", "Per USD"], rows));
    println!("Source: {}", describe(table.source()));
    Ok(())
}

fn convert_amount(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let from = parse_currency(sub.get_one::<String>("from").unwrap())?;
    let to = parse_currency(sub.get_one::<String>("to").unwrap())?;
    let table = load_rate_table(conn);
    let res = table.convert(amount, from, to);
    println!("{} {} -> {:.4} {} ({})", amount, from, res, to, describe(table.source()));
    Ok(())
}
