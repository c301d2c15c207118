// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::analyze::{ProfitRow, ReportLevel, report_from_matches, rows};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let fmt = m.get_one::<String>("format").unwrap().to_lowercase();
    let out = m.get_one::<String>("out").unwrap();
    let level: ReportLevel = m.get_one::<String>("level").unwrap().parse()?;
    // Reject the format before doing any work.
    if !matches!(fmt.as_str(), "csv" | "json") {
        anyhow::bail!("Unknown format: {} (use csv|json)", fmt);
    }

    let report = report_from_matches(conn, m)?;
    let data = rows(&report, level);
    write_rows(&data, &fmt, Path::new(out))?;
    println!("Exported {} {} rows to {}", data.len(), level_name(level), out);
    Ok(())
}

fn level_name(level: ReportLevel) -> &'static str {
    match level {
        ReportLevel::Sku => "SKU",
        ReportLevel::Product => "product",
        ReportLevel::Parent => "parent",
        ReportLevel::Category => "category",
    }
}

pub fn write_rows(data: &[ProfitRow], fmt: &str, out: &Path) -> Result<()> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)
                .with_context(|| format!("Create {}", out.display()))?;
            for row in data {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(data)?)
                .with_context(|| format!("Write {}", out.display()))?;
        }
        other => anyhow::bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(())
}
