use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::clock::parse_date;
use crate::error::FieldErrors;
use crate::foods::model::Food;
use crate::nutrition::round1;

pub const DEFAULT_FOOD_QUANTITY: Decimal = dec!(100.0);
pub const MIN_FOOD_QUANTITY: Decimal = dec!(1.0);
pub const MAX_FOOD_QUANTITY: Decimal = dec!(1000.0);

/// One logged portion of a food, with the nutrients it contributed frozen at
/// save time.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DailyIntake {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub food_name: String,
    pub food_quantity: Decimal,
    pub entry_date: Date,
    pub calories: Decimal,
    pub carbohydrates: Decimal,
    pub protein: Decimal,
    pub fat: Decimal,
    pub created_at: OffsetDateTime,
}

/// Check a consumed amount against its bounds, then round it for storage.
pub fn validate_quantity(raw: Decimal) -> Result<Decimal, String> {
    if raw < MIN_FOOD_QUANTITY {
        return Err(format!(
            "Ensure this value is greater than or equal to {MIN_FOOD_QUANTITY}."
        ));
    }
    if raw > MAX_FOOD_QUANTITY {
        return Err(format!(
            "Ensure this value is less than or equal to {MAX_FOOD_QUANTITY}."
        ));
    }
    Ok(round1(raw))
}

/// Validated input for an intake row, before the food is read.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeDraft {
    pub food_id: Uuid,
    pub food_quantity: Decimal,
    pub entry_date: Date,
}

impl IntakeDraft {
    /// Validate raw fields; a missing date means `today`.
    pub fn parse(
        food_id: Uuid,
        food_quantity: Option<Decimal>,
        entry_date: Option<&str>,
        today: Date,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let quantity = validate_quantity(food_quantity.unwrap_or(DEFAULT_FOOD_QUANTITY))
            .map_err(|msg| errors.add("food_quantity", msg))
            .ok();
        let date = match entry_date {
            None => Some(today),
            Some(raw) => parse_date(raw)
                .map_err(|e| errors.add("entry_date", e.to_string()))
                .ok(),
        };

        match (quantity, date) {
            (Some(food_quantity), Some(entry_date)) if errors.is_empty() => Ok(Self {
                food_id,
                food_quantity,
                entry_date,
            }),
            _ => Err(errors),
        }
    }
}

/// Nutrients contributed by one intake row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub calories: Decimal,
    pub carbohydrates: Decimal,
    pub protein: Decimal,
    pub fat: Decimal,
}

impl Snapshot {
    pub fn of(food: &Food, quantity: Decimal) -> Result<Self, FieldErrors> {
        let n = food.nutrition_for_quantity(quantity).ok_or_else(|| {
            FieldErrors::single("food_quantity", "Ensure this value is a smaller amount.")
        })?;
        Ok(Self {
            calories: n.calories,
            carbohydrates: n.carbohydrates,
            protein: n.protein,
            fat: n.fat,
        })
    }
}
