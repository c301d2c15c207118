// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Typed loaders for the files the engine consumes.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::engine::{AllCountryConfigs, AnalysisInput, RateTable, ShippingRateTable};
use crate::models::{ProductCostData, ProductOverride, TransactionRecord};

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Read a list of records from a `.json` array or a headed CSV file.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if is_json(path) {
        return load_json(path);
    }
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path.display()))?;
    let mut out = Vec::new();
    for (i, rec) in rdr.deserialize().enumerate() {
        // +2: header line and 1-based numbering
        let row: T = rec.with_context(|| format!("{}: bad row {}", path.display(), i + 2))?;
        out.push(row);
    }
    Ok(out)
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("Open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("Parse JSON {}", path.display()))
}

pub fn load_transactions(path: &Path) -> Result<Vec<TransactionRecord>> {
    load_records(path)
}

pub fn load_costs(path: &Path) -> Result<Vec<ProductCostData>> {
    load_records(path)
}

pub fn load_overrides(path: &Path) -> Result<Vec<ProductOverride>> {
    load_records(path)
}

/// Shipping routes; bracket ordering is validated while parsing.
pub fn load_shipping(path: &Path) -> Result<ShippingRateTable> {
    load_json(path)
}

pub fn load_countries(path: &Path) -> Result<AllCountryConfigs> {
    load_json(path)
}

/// File locations for one analysis run. Only transactions are required.
#[derive(Debug, Clone, Default)]
pub struct InputPaths {
    pub transactions: PathBuf,
    pub costs: Option<PathBuf>,
    pub overrides: Option<PathBuf>,
    pub shipping: Option<PathBuf>,
    pub countries: Option<PathBuf>,
}

impl InputPaths {
    pub fn from_matches(m: &clap::ArgMatches) -> Result<Self> {
        let path = |id: &str| m.get_one::<String>(id).map(PathBuf::from);
        Ok(Self {
            transactions: path("transactions").context("--transactions is required")?,
            costs: path("costs"),
            overrides: path("overrides"),
            shipping: path("shipping"),
            countries: path("countries"),
        })
    }

    pub fn load(&self, rates: RateTable) -> Result<AnalysisInput> {
        let transactions = load_transactions(&self.transactions)?;
        let costs = self.costs.as_deref().map(load_costs).transpose()?;
        let overrides = self.overrides.as_deref().map(load_overrides).transpose()?;
        let shipping = self.shipping.as_deref().map(load_shipping).transpose()?;
        let countries = self.countries.as_deref().map(load_countries).transpose()?;
        tracing::info!(
            transactions = transactions.len(),
            costs = costs.as_ref().map_or(0, Vec::len),
            "inputs loaded"
        );
        Ok(AnalysisInput {
            transactions,
            costs: costs.unwrap_or_default(),
            overrides: overrides.unwrap_or_default(),
            shipping: shipping.unwrap_or_default(),
            countries: countries.unwrap_or_default(),
            rates,
        })
    }
}
