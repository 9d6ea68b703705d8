//! Local currency to stablecoin conversion.
//!
//! The converted amount is recomputed on every keystroke, so bad input
//! degrades to `0` instead of an error. Rounding to the token's minor unit
//! only happens in [`to_minor_units`], right before the amount goes on-chain.

use alloy_primitives::U256;
use airtime_sdk::objects::Stablecoin;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Convert `local_amount` into stablecoin units at `exchange_rate` local
/// units per stablecoin.
///
/// Returns `0.0` when the amount is not a positive finite number or the rate
/// is not a positive finite number.
pub fn to_stable_amount(local_amount: f64, exchange_rate: f64) -> f64 {
    if !local_amount.is_finite() || local_amount <= 0.0 {
        return 0.0;
    }
    if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
        return 0.0;
    }
    local_amount / exchange_rate
}

/// Parse a user-typed amount. Anything that isn't a number parses as `NaN`.
pub fn parse_amount(input: &str) -> f64 {
    input.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Round a stablecoin amount to 6 decimals and express it in minor units.
///
/// Returns `None` for amounts that are not positive, not finite, or round to
/// zero.
pub fn to_minor_units(amount: f64) -> Option<U256> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    let decimals = Stablecoin::Usdc.decimals();
    let scaled = Decimal::from_f64(amount)?
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::from(10u64.pow(decimals)))?
        .to_u128()?;
    (scaled > 0).then(|| U256::from(scaled))
}

/// Render minor units as a decimal token amount, e.g. `2000000` → `2.000000`.
pub fn format_minor_units(amount: U256) -> String {
    let decimals = Stablecoin::Usdc.decimals();
    match u128::try_from(amount).ok().and_then(|v| i128::try_from(v).ok()) {
        Some(v) => Decimal::from_i128_with_scale(v, decimals).to_string(),
        None => format!("{amount} (minor units)"),
    }
}

/// Dollar display used in the form and the confirmation summary.
///
/// Returns `None` when there is nothing sensible to show yet.
pub fn format_usd(amount: f64) -> Option<String> {
    (amount.is_finite() && amount > 0.0).then(|| format!("${amount:.2}"))
}
