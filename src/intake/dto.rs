use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::model::DailyIntake;

/// Body of `POST /intakes`. Nutrient fields a client may send are ignored;
/// they are always derived from the food.
#[derive(Debug, Deserialize)]
pub struct CreateIntakeRequest {
    pub food_id: Uuid,
    pub food_quantity: Option<Decimal>,
    pub entry_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateIntakeRequest {
    pub food_id: Option<Uuid>,
    pub food_quantity: Option<Decimal>,
    pub entry_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub id: Uuid,
    pub food_id: Uuid,
    pub food_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub food_quantity: Decimal,
    #[serde(with = "crate::clock::iso_date")]
    pub entry_date: Date,
    #[serde(with = "rust_decimal::serde::float")]
    pub calories: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub carbohydrates: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub protein: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fat: Decimal,
}

impl From<DailyIntake> for IntakeResponse {
    fn from(i: DailyIntake) -> Self {
        Self {
            id: i.id,
            food_id: i.food_id,
            food_name: i.food_name,
            food_quantity: i.food_quantity,
            entry_date: i.entry_date,
            calories: i.calories,
            carbohydrates: i.carbohydrates,
            protein: i.protein,
            fat: i.fat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn response_uses_numbers_and_iso_dates() {
        let res = IntakeResponse {
            id: Uuid::nil(),
            food_id: Uuid::nil(),
            food_name: "Apple".into(),
            food_quantity: dec!(50.0),
            entry_date: date!(2024 - 03 - 07),
            calories: dec!(26.0),
            carbohydrates: dec!(7.0),
            protein: dec!(0.2),
            fat: dec!(0.1),
        };
        let json = serde_json::to_value(res).unwrap();
        assert_eq!(json["entry_date"], "2024-03-07");
        assert_eq!(json["calories"], json!(26.0));
        assert_eq!(json["food_quantity"], json!(50.0));
    }

    #[test]
    fn client_nutrients_are_not_part_of_the_request() {
        let req: CreateIntakeRequest = serde_json::from_value(json!({
            "food_id": Uuid::nil(),
            "food_quantity": 50,
            "calories": 9999
        }))
        .unwrap();
        assert_eq!(req.food_quantity, Some(dec!(50)));
        assert_eq!(req.entry_date, None);
    }
}
