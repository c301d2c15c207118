// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;

/// Recovery rate assumed for marketplaces with none configured (30%).
pub fn default_recovery_rate() -> Decimal {
    Decimal::new(30, 2)
}

/// Net loss on refunded sales: the part not recovered through fee reversal.
/// The rate is clamped to `[0, 1]`.
pub fn refund_loss(gross_refund: Decimal, recovery_rate: Decimal) -> Decimal {
    let rate = recovery_rate.clamp(Decimal::ZERO, Decimal::ONE);
    gross_refund.abs() * (Decimal::ONE - rate)
}
