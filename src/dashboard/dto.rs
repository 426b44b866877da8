use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::intake::model::Snapshot;
use crate::weights::model::WeightEntry;

#[derive(Debug, Serialize)]
pub struct DailyTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub calories: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub carbohydrates: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub protein: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fat: Decimal,
}

impl From<Snapshot> for DailyTotals {
    fn from(s: Snapshot) -> Self {
        Self {
            calories: s.calories,
            carbohydrates: s.carbohydrates,
            protein: s.protein,
            fat: s.fat,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(with = "crate::clock::iso_date")]
    pub date: Date,
    pub totals: DailyTotals,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub last_weight: Option<Decimal>,
    #[serde(with = "crate::clock::iso_date::option")]
    pub last_weight_date: Option<Date>,
}

impl DashboardResponse {
    pub fn new(date: Date, totals: Snapshot, last: Option<WeightEntry>) -> Self {
        Self {
            date,
            totals: totals.into(),
            last_weight: last.as_ref().map(|w| w.weight),
            last_weight_date: last.map(|w| w.entry_date),
        }
    }
}
