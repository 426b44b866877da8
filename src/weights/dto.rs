use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;
use uuid::Uuid;

use super::model::WeightEntry;

#[derive(Debug, Serialize)]
pub struct WeightResponse {
    pub id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    #[serde(with = "crate::clock::iso_date")]
    pub entry_date: Date,
}

impl From<WeightEntry> for WeightResponse {
    fn from(e: WeightEntry) -> Self {
        Self {
            id: e.id,
            weight: e.weight,
            entry_date: e.entry_date,
        }
    }
}
