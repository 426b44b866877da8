//! Fixed-point nutrient arithmetic.
//!
//! Every stored quantity is a decimal with one fractional digit and at most
//! six digits overall. Scaling is done in exact decimal arithmetic and rounded
//! half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Maximum number of digits (integer + fractional) a stored value may carry.
pub const MAX_DIGITS: u32 = 6;

/// Round to one decimal place, halves away from zero. The result always has
/// scale 1 so `26` comes back as `26.0`.
pub fn round1(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(1);
    rounded
}

/// Digits `value` occupies once stored at one decimal place.
pub fn digits_at_1dp(value: Decimal) -> u32 {
    count_digits(round1(value).mantissa().unsigned_abs())
}

/// Digits of `value` as submitted, ignoring trailing fractional zeros.
/// `0.05` counts two digits, like a leading-zero-padded fraction would.
pub fn significant_digits(value: Decimal) -> u32 {
    let normalized = value.normalize();
    let digits = count_digits(normalized.mantissa().unsigned_abs());
    digits.max(normalized.scale())
}

fn count_digits(mut n: u128) -> u32 {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Calories, macros and micronutrients for one amount of a food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Nutrients {
    #[serde(with = "rust_decimal::serde::float")]
    pub calories: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub carbohydrates: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub protein: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fat: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fat_saturated: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sodium: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub potassium: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cholesterol: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fiber: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sugar: Decimal,
}

impl Nutrients {
    fn try_map(self, f: impl Fn(Decimal) -> Option<Decimal>) -> Option<Self> {
        Some(Self {
            calories: f(self.calories)?,
            carbohydrates: f(self.carbohydrates)?,
            protein: f(self.protein)?,
            fat: f(self.fat)?,
            fat_saturated: f(self.fat_saturated)?,
            sodium: f(self.sodium)?,
            potassium: f(self.potassium)?,
            cholesterol: f(self.cholesterol)?,
            fiber: f(self.fiber)?,
            sugar: f(self.sugar)?,
        })
    }

    /// Multiply every field by `factor`, rounding each to one decimal place.
    /// `None` when a product does not fit in a decimal.
    pub fn scaled(self, factor: Decimal) -> Option<Self> {
        self.try_map(|v| v.checked_mul(factor).map(round1))
    }

    /// All fields zero, at one decimal place.
    pub fn zero() -> Self {
        let zero = round1(Decimal::ZERO);
        Self {
            calories: zero,
            carbohydrates: zero,
            protein: zero,
            fat: zero,
            fat_saturated: zero,
            sodium: zero,
            potassium: zero,
            cholesterol: zero,
            fiber: zero,
            sugar: zero,
        }
    }
}
