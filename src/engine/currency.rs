// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Currency, Money};

/// Where the rates in a [`RateTable`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateSource {
    /// Only the pinned table compiled into the binary.
    Fallback,
    /// Stored rates as of a given day, overlaid on the pinned table.
    Stored { as_of: NaiveDate },
}

/// Units of each currency per one USD. USD is the pivot: every conversion
/// goes `from -> USD -> to`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    per_usd: BTreeMap<Currency, Decimal>,
    source: RateSource,
}

impl RateTable {
    /// The pinned table used whenever a refreshed one is unavailable.
    pub fn fallback() -> Self {
        let per_usd = [
            (Currency::Usd, Decimal::ONE),
            (Currency::Cad, Decimal::new(136, 2)),
            (Currency::Mxn, Decimal::new(1710, 2)),
            (Currency::Gbp, Decimal::new(79, 2)),
            (Currency::Eur, Decimal::new(92, 2)),
            (Currency::Sek, Decimal::new(1050, 2)),
            (Currency::Pln, Decimal::new(400, 2)),
            (Currency::Aed, Decimal::new(36725, 4)),
            (Currency::Sar, Decimal::new(375, 2)),
            (Currency::Aud, Decimal::new(152, 2)),
            (Currency::Jpy, Decimal::new(150, 0)),
            (Currency::Try, Decimal::new(3250, 2)),
        ]
        .into_iter()
        .collect();
        Self {
            per_usd,
            source: RateSource::Fallback,
        }
    }

    /// Overlay refreshed rates on the pinned table. Non-positive rates are
    /// ignored so a bad row can never zero out a currency.
    pub fn with_rates<I>(rates: I, as_of: NaiveDate) -> Self
    where
        I: IntoIterator<Item = (Currency, Decimal)>,
    {
        let mut table = Self::fallback();
        let mut applied = 0usize;
        for (ccy, rate) in rates {
            if ccy == Currency::Usd {
                continue;
            }
            if rate <= Decimal::ZERO {
                tracing::warn!(currency = %ccy, %rate, "ignoring non-positive FX rate");
                continue;
            }
            table.per_usd.insert(ccy, rate);
            applied += 1;
        }
        if applied > 0 {
            table.source = RateSource::Stored { as_of };
        }
        table
    }

    pub fn source(&self) -> RateSource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == RateSource::Fallback
    }

    /// Units of `ccy` per USD.
    pub fn rate(&self, ccy: Currency) -> Decimal {
        self.per_usd.get(&ccy).copied().unwrap_or(Decimal::ONE)
    }

    pub fn rates(&self) -> impl Iterator<Item = (Currency, Decimal)> + '_ {
        self.per_usd.iter().map(|(c, r)| (*c, *r))
    }

    pub fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Decimal {
        if from == to {
            return amount;
        }
        let from_rate = self.rate(from);
        if from_rate.is_zero() {
            return amount;
        }
        let usd = amount / from_rate;
        usd * self.rate(to)
    }

    /// Multiplier that turns an amount in `from` into `to`.
    pub fn factor(&self, from: Currency, to: Currency) -> Decimal {
        self.convert(Decimal::ONE, from, to)
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::fallback()
    }
}

impl Money {
    pub fn convert(self, rates: &RateTable, to: Currency) -> Money {
        Money::new(rates.convert(self.amount, self.currency, to), to)
    }

    pub fn scale(self, factor: Decimal) -> Money {
        Money::new(self.amount * factor, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_conversion_is_exact() {
        let t = RateTable::fallback();
        let amt = Decimal::new(12345, 2);
        assert_eq!(t.convert(amt, Currency::Try, Currency::Try), amt);
    }

    #[test]
    fn cross_rate_goes_through_usd() {
        let t = RateTable::with_rates(
            [(Currency::Eur, Decimal::new(90, 2)), (Currency::Gbp, Decimal::new(75, 2))],
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
        );
        // 90 EUR = 100 USD = 75 GBP
        let gbp = t.convert(Decimal::new(90, 0), Currency::Eur, Currency::Gbp);
        assert_eq!(gbp.round_dp(4), Decimal::new(75, 0));
        assert!(!t.is_fallback());
    }

    #[test]
    fn bad_rates_keep_fallback_source() {
        let t = RateTable::with_rates(
            [(Currency::Eur, Decimal::ZERO)],
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
        );
        assert!(t.is_fallback());
        assert_eq!(t.rate(Currency::Eur), Decimal::new(92, 2));
    }
}
