use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{Food, FoodDraft};
use crate::nutrition::Nutrients;

/// Row of the paginated food list.
#[derive(Debug, Serialize)]
pub struct FoodSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub calories: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub carbohydrates: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub protein: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fat: Decimal,
}

impl From<&Food> for FoodSummary {
    fn from(f: &Food) -> Self {
        Self {
            id: f.id,
            name: f.name.clone(),
            calories: f.calories,
            carbohydrates: f.carbohydrates,
            protein: f.protein,
            fat: f.fat,
        }
    }
}

/// Per-serving nutrients; every field is `null` when the food has no serving
/// size.
#[derive(Debug, Default, Serialize)]
pub struct ServingNutrients {
    #[serde(with = "rust_decimal::serde::float_option")]
    pub calories: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub carbohydrates: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub protein: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub fat: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub fat_saturated: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub sodium: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub potassium: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub cholesterol: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub fiber: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub sugar: Option<Decimal>,
}

impl From<Option<Nutrients>> for ServingNutrients {
    fn from(n: Option<Nutrients>) -> Self {
        let Some(n) = n else {
            return Self::default();
        };
        Self {
            calories: Some(n.calories),
            carbohydrates: Some(n.carbohydrates),
            protein: Some(n.protein),
            fat: Some(n.fat),
            fat_saturated: Some(n.fat_saturated),
            sodium: Some(n.sodium),
            potassium: Some(n.potassium),
            cholesterol: Some(n.cholesterol),
            fiber: Some(n.fiber),
            sugar: Some(n.sugar),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FoodDetails {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub calories: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub carbohydrates: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub protein: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fat: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub serving_size: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub fat_saturated: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub sodium: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub potassium: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub cholesterol: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub fiber: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub sugar: Option<Decimal>,
    pub per_serving: ServingNutrients,
    /// Present when the caller asked for a specific gram amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_quantity: Option<Nutrients>,
}

impl FoodDetails {
    pub fn new(food: &Food, per_quantity: Option<Nutrients>) -> Self {
        Self {
            id: food.id,
            name: food.name.clone(),
            quantity: food.quantity,
            calories: food.calories,
            carbohydrates: food.carbohydrates,
            protein: food.protein,
            fat: food.fat,
            serving_size: food.serving_size,
            fat_saturated: food.fat_saturated,
            sodium: food.sodium,
            potassium: food.potassium,
            cholesterol: food.cholesterol,
            fiber: food.fiber,
            sugar: food.sugar,
            per_serving: food.nutrition_for_serving().into(),
            per_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FoodDetailsQuery {
    pub quantity: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFoodRequest {
    pub name: String,
    pub quantity: Option<Decimal>,
    pub calories: Option<Decimal>,
    pub carbohydrates: Option<Decimal>,
    pub protein: Option<Decimal>,
    pub fat: Option<Decimal>,
    pub serving_size: Option<Decimal>,
    pub fat_saturated: Option<Decimal>,
    pub sodium: Option<Decimal>,
    pub potassium: Option<Decimal>,
    pub cholesterol: Option<Decimal>,
    pub fiber: Option<Decimal>,
    pub sugar: Option<Decimal>,
}

impl From<CreateFoodRequest> for FoodDraft {
    fn from(r: CreateFoodRequest) -> Self {
        let defaults = FoodDraft::default();
        Self {
            name: r.name,
            quantity: r.quantity.unwrap_or(defaults.quantity),
            calories: r.calories.unwrap_or(defaults.calories),
            carbohydrates: r.carbohydrates.unwrap_or(defaults.carbohydrates),
            protein: r.protein.unwrap_or(defaults.protein),
            fat: r.fat.unwrap_or(defaults.fat),
            serving_size: r.serving_size,
            fat_saturated: r.fat_saturated,
            sodium: r.sodium,
            potassium: r.potassium,
            cholesterol: r.cholesterol,
            fiber: r.fiber,
            sugar: r.sugar,
        }
    }
}

/// Partial edit; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFoodRequest {
    pub name: Option<String>,
    pub quantity: Option<Decimal>,
    pub calories: Option<Decimal>,
    pub carbohydrates: Option<Decimal>,
    pub protein: Option<Decimal>,
    pub fat: Option<Decimal>,
    pub serving_size: Option<Decimal>,
    pub fat_saturated: Option<Decimal>,
    pub sodium: Option<Decimal>,
    pub potassium: Option<Decimal>,
    pub cholesterol: Option<Decimal>,
    pub fiber: Option<Decimal>,
    pub sugar: Option<Decimal>,
}

impl UpdateFoodRequest {
    pub fn apply(self, draft: &mut FoodDraft) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        let required = [
            (self.quantity, &mut draft.quantity),
            (self.calories, &mut draft.calories),
            (self.carbohydrates, &mut draft.carbohydrates),
            (self.protein, &mut draft.protein),
            (self.fat, &mut draft.fat),
        ];
        for (value, slot) in required {
            if let Some(v) = value {
                *slot = v;
            }
        }
        let optional = [
            (self.serving_size, &mut draft.serving_size),
            (self.fat_saturated, &mut draft.fat_saturated),
            (self.sodium, &mut draft.sodium),
            (self.potassium, &mut draft.potassium),
            (self.cholesterol, &mut draft.cholesterol),
            (self.fiber, &mut draft.fiber),
            (self.sugar, &mut draft.sugar),
        ];
        for (value, slot) in optional {
            if value.is_some() {
                *slot = value;
            }
        }
    }
}

/// Body of `POST /foods/lookup`.
#[derive(Debug, Deserialize)]
pub struct LookupFoodRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ImportedFoodsResponse {
    pub foods: Vec<FoodSummary>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NutritionQuery {
    pub food: Option<String>,
}
