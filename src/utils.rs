// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::engine::{DateRange, RateTable};
use crate::models::{COST_CURRENCY, Currency};

const UA: &str = concat!(
    "marginlens/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/marginlens)"
);

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn parse_currency(s: &str) -> Result<Currency> {
    s.parse::<Currency>().map_err(anyhow::Error::msg)
}

/// Build an inclusive range from optional bounds. An open end defaults to
/// the widest representable date.
pub fn parse_date_range(from: Option<&str>, to: Option<&str>) -> Result<Option<DateRange>> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let start = from.map(parse_date).transpose()?.unwrap_or(NaiveDate::MIN);
    let end = to.map(parse_date).transpose()?.unwrap_or(NaiveDate::MAX);
    if start > end {
        anyhow::bail!("--from {} is after --to {}", start, end);
    }
    Ok(Some(DateRange { start, end }))
}

pub fn fmt_money(d: &Decimal, ccy: Currency) -> String {
    format!("{} {}", ccy, d.round_dp(2))
}

pub fn fmt_pct(d: &Decimal) -> String {
    format!("{}%", d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // Arrays stream one element per line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

// Reporting currency settings
pub fn get_reporting_currency(conn: &Connection) -> Result<Currency> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='reporting_currency'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    match v {
        Some(code) => parse_currency(&code)
            .with_context(|| format!("Stored reporting currency '{}' is invalid", code)),
        None => Ok(COST_CURRENCY),
    }
}

pub fn set_reporting_currency(conn: &Connection, ccy: Currency) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('reporting_currency', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![ccy.code()],
    )?;
    Ok(())
}

/// Store one USD-based rate for `date`. Re-fetching the same day replaces it.
pub fn store_rate(conn: &Connection, date: NaiveDate, quote: Currency, rate: Decimal) -> Result<()> {
    conn.execute(
        "INSERT INTO fx_rates(date, base, quote, rate) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(date, base, quote) DO UPDATE SET rate=excluded.rate",
        params![date.to_string(), COST_CURRENCY.code(), quote.code(), rate.to_string()],
    )
    .with_context(|| format!("Store rate {}/{} on {}", COST_CURRENCY, quote, date))?;
    Ok(())
}

/// Most recent stored USD-based rate per currency, with the newest date seen.
pub fn latest_rates(conn: &Connection) -> Result<(Vec<(Currency, Decimal)>, Option<NaiveDate>)> {
    let mut stmt = conn.prepare(
        "SELECT f.quote, f.rate, f.date FROM fx_rates f
         WHERE f.base=?1 AND f.date = (
             SELECT MAX(g.date) FROM fx_rates g WHERE g.base=f.base AND g.quote=f.quote
         )
         ORDER BY f.quote",
    )?;
    let rows = stmt.query_map(params![COST_CURRENCY.code()], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut out = Vec::new();
    let mut newest: Option<NaiveDate> = None;
    for row in rows {
        let (quote, rate, date) = row?;
        let Ok(ccy) = quote.parse::<Currency>() else {
            tracing::warn!(%quote, "skipping stored rate for unsupported currency");
            continue;
        };
        let rate = parse_decimal(&rate)
            .with_context(|| format!("Invalid stored rate for {}", quote))?;
        let date = parse_date(&date)?;
        newest = newest.max(Some(date));
        out.push((ccy, rate));
    }
    Ok((out, newest))
}

/// Rates for the engine: stored rates over the pinned table, or the pinned
/// table alone when nothing usable is stored.
pub fn load_rate_table(conn: &Connection) -> RateTable {
    match latest_rates(conn) {
        Ok((rates, Some(as_of))) => RateTable::with_rates(rates, as_of),
        Ok((_, None)) => RateTable::fallback(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read stored FX rates; using pinned rates");
            RateTable::fallback()
        }
    }
}
