// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency every cost table, shipping surcharge and country fee is entered in.
pub const COST_CURRENCY: Currency = Currency::Usd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    Usd,
    Cad,
    Mxn,
    Gbp,
    Eur,
    Sek,
    Pln,
    Aed,
    Sar,
    Aud,
    Jpy,
    Try,
}

impl Currency {
    pub const ALL: [Currency; 12] = [
        Currency::Usd,
        Currency::Cad,
        Currency::Mxn,
        Currency::Gbp,
        Currency::Eur,
        Currency::Sek,
        Currency::Pln,
        Currency::Aed,
        Currency::Sar,
        Currency::Aud,
        Currency::Jpy,
        Currency::Try,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cad => "CAD",
            Currency::Mxn => "MXN",
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Sek => "SEK",
            Currency::Pln => "PLN",
            Currency::Aed => "AED",
            Currency::Sar => "SAR",
            Currency::Aud => "AUD",
            Currency::Jpy => "JPY",
            Currency::Try => "TRY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| format!("Unknown currency '{}'", s.trim()))
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}

/// A marketplace storefront. Each one settles in exactly one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Marketplace {
    Us,
    Ca,
    Mx,
    Uk,
    De,
    Fr,
    It,
    Es,
    Nl,
    Se,
    Pl,
    Ae,
    Sa,
    Au,
    Jp,
    Tr,
}

impl Marketplace {
    pub const ALL: [Marketplace; 16] = [
        Marketplace::Us,
        Marketplace::Ca,
        Marketplace::Mx,
        Marketplace::Uk,
        Marketplace::De,
        Marketplace::Fr,
        Marketplace::It,
        Marketplace::Es,
        Marketplace::Nl,
        Marketplace::Se,
        Marketplace::Pl,
        Marketplace::Ae,
        Marketplace::Sa,
        Marketplace::Au,
        Marketplace::Jp,
        Marketplace::Tr,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Marketplace::Us => "US",
            Marketplace::Ca => "CA",
            Marketplace::Mx => "MX",
            Marketplace::Uk => "UK",
            Marketplace::De => "DE",
            Marketplace::Fr => "FR",
            Marketplace::It => "IT",
            Marketplace::Es => "ES",
            Marketplace::Nl => "NL",
            Marketplace::Se => "SE",
            Marketplace::Pl => "PL",
            Marketplace::Ae => "AE",
            Marketplace::Sa => "SA",
            Marketplace::Au => "AU",
            Marketplace::Jp => "JP",
            Marketplace::Tr => "TR",
        }
    }

    pub fn currency(self) -> Currency {
        match self {
            Marketplace::Us => Currency::Usd,
            Marketplace::Ca => Currency::Cad,
            Marketplace::Mx => Currency::Mxn,
            Marketplace::Uk => Currency::Gbp,
            Marketplace::De
            | Marketplace::Fr
            | Marketplace::It
            | Marketplace::Es
            | Marketplace::Nl => Currency::Eur,
            Marketplace::Se => Currency::Sek,
            Marketplace::Pl => Currency::Pln,
            Marketplace::Ae => Currency::Aed,
            Marketplace::Sa => Currency::Sar,
            Marketplace::Au => Currency::Aud,
            Marketplace::Jp => Currency::Jpy,
            Marketplace::Tr => Currency::Try,
        }
    }

    /// The one storefront backed by a local warehouse, where FBM orders can
    /// ship from Turkey, from local stock, or a blend of both.
    pub fn has_split_sourcing(self) -> bool {
        matches!(self, Marketplace::Us)
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Marketplace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = match s.trim().to_uppercase().as_str() {
            "GB" => "UK".to_string(),
            other => other.to_string(),
        };
        Marketplace::ALL
            .into_iter()
            .find(|m| m.code() == code)
            .ok_or_else(|| format!("Unknown marketplace '{}'", s.trim()))
    }
}

impl TryFrom<String> for Marketplace {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Marketplace> for String {
    fn from(m: Marketplace) -> Self {
        m.code().to_string()
    }
}

/// A currency-tagged amount. Values crossing a table boundary travel as
/// `Money` so an unconverted amount cannot be mixed in silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// An amount denominated in the cost currency.
    pub fn cost(amount: Decimal) -> Self {
        Self::new(amount, COST_CURRENCY)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency, self.amount)
    }
}

/// Fulfillment channel as it appears on a single ledger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Channel {
    Fba,
    Fbm,
    #[default]
    Unknown,
}

impl From<String> for Channel {
    fn from(s: String) -> Self {
        match s.trim().to_uppercase().as_str() {
            "FBA" | "AMAZON" | "AFN" => Channel::Fba,
            "FBM" | "MERCHANT" | "MFN" | "SELLER" => Channel::Fbm,
            _ => Channel::Unknown,
        }
    }
}

impl From<Channel> for String {
    fn from(c: Channel) -> Self {
        match c {
            Channel::Fba => "FBA",
            Channel::Fbm => "FBM",
            Channel::Unknown => "UNKNOWN",
        }
        .to_string()
    }
}

/// Fulfillment classification of a SKU or rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Fulfillment {
    Fba,
    Fbm,
    Mixed,
    Unknown,
}

impl Fulfillment {
    pub fn touches_fba(self) -> bool {
        matches!(self, Fulfillment::Fba | Fulfillment::Mixed)
    }

    pub fn touches_fbm(self) -> bool {
        matches!(self, Fulfillment::Fbm | Fulfillment::Mixed)
    }
}

impl fmt::Display for Fulfillment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Fulfillment::Fba => "FBA",
            Fulfillment::Fbm => "FBM",
            Fulfillment::Mixed => "Mixed",
            Fulfillment::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Ledger line type. Unrecognised labels land in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryType {
    Order,
    Refund,
    ServiceFee,
    Adjustment,
    FbaInventoryFee,
    FbaCustomerReturnFee,
    FbaTransactionFee,
    ShippingServices,
    Liquidations,
    Transfer,
    Other,
}

impl From<String> for CategoryType {
    fn from(s: String) -> Self {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "order" => CategoryType::Order,
            "refund" => CategoryType::Refund,
            "servicefee" => CategoryType::ServiceFee,
            "adjustment" => CategoryType::Adjustment,
            "fbainventoryfee" => CategoryType::FbaInventoryFee,
            "fbacustomerreturnfee" => CategoryType::FbaCustomerReturnFee,
            "fbatransactionfee" => CategoryType::FbaTransactionFee,
            "shippingservices" => CategoryType::ShippingServices,
            "liquidations" => CategoryType::Liquidations,
            "transfer" => CategoryType::Transfer,
            _ => CategoryType::Other,
        }
    }
}

impl From<CategoryType> for String {
    fn from(c: CategoryType) -> Self {
        match c {
            CategoryType::Order => "Order",
            CategoryType::Refund => "Refund",
            CategoryType::ServiceFee => "Service Fee",
            CategoryType::Adjustment => "Adjustment",
            CategoryType::FbaInventoryFee => "FBA Inventory Fee",
            CategoryType::FbaCustomerReturnFee => "FBA Customer Return Fee",
            CategoryType::FbaTransactionFee => "FBA Transaction Fee",
            CategoryType::ShippingServices => "Shipping Services",
            CategoryType::Liquidations => "Liquidations",
            CategoryType::Transfer => "Transfer",
            CategoryType::Other => "Other",
        }
        .to_string()
    }
}

/// Where FBM orders ship from on the split-sourcing marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FbmShippingMode {
    /// Shipped directly from Turkey; duty and border fee apply in full.
    #[default]
    Tr,
    /// Shipped from stock already cleared into the local warehouse.
    #[serde(alias = "US", alias = "local")]
    Local,
    /// Half of the volume from each source.
    #[serde(alias = "BOTH", alias = "blended")]
    Blended,
}

impl fmt::Display for FbmShippingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FbmShippingMode::Tr => "TR",
            FbmShippingMode::Local => "LOCAL",
            FbmShippingMode::Blended => "BLENDED",
        };
        f.write_str(s)
    }
}

/// One settlement ledger line, as produced by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub marketplace: Marketplace,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub fulfillment: Channel,
    pub category_type: CategoryType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub product_sales: Decimal,
    #[serde(default)]
    pub selling_fee: Decimal,
    #[serde(default)]
    pub fba_fee: Decimal,
    #[serde(default)]
    pub vat: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub quantity: i64,
}

/// Per-SKU landed-cost attributes. `unit_cost` and `custom_shipping` are in
/// [`COST_CURRENCY`]; `size` is in desi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCostData {
    pub sku: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub size: Option<Decimal>,
    #[serde(default)]
    pub custom_shipping: Option<Decimal>,
    #[serde(default)]
    pub fbm_source: Option<FbmShippingMode>,
}

impl ProductCostData {
    pub fn unit_cost_money(&self) -> Option<Money> {
        self.unit_cost.map(Money::cost)
    }

    pub fn custom_shipping_money(&self) -> Option<Money> {
        self.custom_shipping.map(Money::cost)
    }
}

/// A manual, product-name scoped override entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOverride {
    pub name: String,
    #[serde(default)]
    pub custom_shipping: Option<Decimal>,
    #[serde(default)]
    pub fbm_source: Option<FbmShippingMode>,
}
