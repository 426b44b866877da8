use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::FieldErrors;
use crate::lookup::NutritionItem;
use crate::nutrition::{digits_at_1dp, round1, Nutrients, MAX_DIGITS};

pub const NAME_MAX_LEN: usize = 75;
pub const DEFAULT_QUANTITY: Decimal = dec!(100.0);

pub const NAME_TAKEN: &str = "A food item with this name already exists.";
const NAME_BLANK: &str = "This field may not be blank.";
const NEGATIVE: &str = "Ensure this value is greater than or equal to 0.0.";

/// A stored food. Nutrient values describe `quantity` grams of it.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Food {
    pub id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub calories: Decimal,
    pub carbohydrates: Decimal,
    pub protein: Decimal,
    pub fat: Decimal,
    pub serving_size: Option<Decimal>,
    pub fat_saturated: Option<Decimal>,
    pub sodium: Option<Decimal>,
    pub potassium: Option<Decimal>,
    pub cholesterol: Option<Decimal>,
    pub fiber: Option<Decimal>,
    pub sugar: Option<Decimal>,
    pub created_at: OffsetDateTime,
}

impl Food {
    fn reference_nutrients(&self) -> Nutrients {
        Nutrients {
            calories: self.calories,
            carbohydrates: self.carbohydrates,
            protein: self.protein,
            fat: self.fat,
            fat_saturated: self.fat_saturated.unwrap_or_default(),
            sodium: self.sodium.unwrap_or_default(),
            potassium: self.potassium.unwrap_or_default(),
            cholesterol: self.cholesterol.unwrap_or_default(),
            fiber: self.fiber.unwrap_or_default(),
            sugar: self.sugar.unwrap_or_default(),
        }
    }

    /// Nutrients in `quantity` grams. A food with a zero reference quantity
    /// yields zeros rather than dividing by zero. `None` when the amount is
    /// too large to scale.
    pub fn nutrition_for_quantity(&self, quantity: Decimal) -> Option<Nutrients> {
        if self.quantity.is_zero() {
            return Some(Nutrients::zero());
        }
        self.reference_nutrients()
            .scaled(quantity.checked_div(self.quantity)?)
    }

    /// Nutrients in one labelled serving, or `None` when the food has no
    /// serving size (or a zero reference quantity).
    pub fn nutrition_for_serving(&self) -> Option<Nutrients> {
        let serving = self.serving_size.filter(|s| !s.is_zero())?;
        if self.quantity.is_zero() {
            return None;
        }
        self.reference_nutrients().scaled(serving / dec!(100))
    }
}

/// Field values for a food about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodDraft {
    pub name: String,
    pub quantity: Decimal,
    pub calories: Decimal,
    pub carbohydrates: Decimal,
    pub protein: Decimal,
    pub fat: Decimal,
    pub serving_size: Option<Decimal>,
    pub fat_saturated: Option<Decimal>,
    pub sodium: Option<Decimal>,
    pub potassium: Option<Decimal>,
    pub cholesterol: Option<Decimal>,
    pub fiber: Option<Decimal>,
    pub sugar: Option<Decimal>,
}

impl Default for FoodDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            quantity: DEFAULT_QUANTITY,
            calories: Decimal::ZERO,
            carbohydrates: Decimal::ZERO,
            protein: Decimal::ZERO,
            fat: Decimal::ZERO,
            serving_size: None,
            fat_saturated: None,
            sodium: None,
            potassium: None,
            cholesterol: None,
            fiber: None,
            sugar: None,
        }
    }
}

impl From<&Food> for FoodDraft {
    fn from(food: &Food) -> Self {
        Self {
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
        }
    }
}

impl From<NutritionItem> for FoodDraft {
    fn from(item: NutritionItem) -> Self {
        Self {
            name: item.name,
            quantity: DEFAULT_QUANTITY,
            calories: item.calories,
            carbohydrates: item.carbohydrates_total_g,
            protein: item.protein_g,
            fat: item.fat_total_g,
            serving_size: item.serving_size_g,
            fat_saturated: item.fat_saturated_g,
            sodium: item.sodium_mg,
            potassium: item.potassium_mg,
            cholesterol: item.cholesterol_mg,
            fiber: item.fiber_g,
            sugar: item.sugar_g,
        }
    }
}

impl FoodDraft {
    /// Trim and title-case the name, round every number to one decimal place.
    pub fn normalize(&mut self) {
        self.name = title_case(self.name.trim());
        for value in self.required_mut() {
            *value = round1(*value);
        }
        for value in self.optional_mut().into_iter().flatten() {
            *value = round1(*value);
        }
    }

    /// Every violation in one pass. Call after [`FoodDraft::normalize`];
    /// `name_taken` says whether another food already uses this name.
    pub fn check(&self, name_taken: bool) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self.name.is_empty() {
            errors.add("name", NAME_BLANK);
        } else if self.name.chars().count() > NAME_MAX_LEN {
            errors.add(
                "name",
                format!("Ensure this field has no more than {NAME_MAX_LEN} characters."),
            );
        }
        if name_taken {
            errors.add("name", NAME_TAKEN);
        }

        for (field, value) in self.numeric_fields() {
            let Some(value) = value else { continue };
            if value.is_sign_negative() && !value.is_zero() {
                errors.add(field, NEGATIVE);
            }
            if digits_at_1dp(value) > MAX_DIGITS {
                errors.add(
                    field,
                    format!("Ensure that there are no more than {MAX_DIGITS} digits in total."),
                );
            }
        }

        errors
    }

    fn numeric_fields(&self) -> [(&'static str, Option<Decimal>); 12] {
        [
            ("quantity", Some(self.quantity)),
            ("calories", Some(self.calories)),
            ("carbohydrates", Some(self.carbohydrates)),
            ("protein", Some(self.protein)),
            ("fat", Some(self.fat)),
            ("serving_size", self.serving_size),
            ("fat_saturated", self.fat_saturated),
            ("sodium", self.sodium),
            ("potassium", self.potassium),
            ("cholesterol", self.cholesterol),
            ("fiber", self.fiber),
            ("sugar", self.sugar),
        ]
    }

    fn required_mut(&mut self) -> [&mut Decimal; 5] {
        [
            &mut self.quantity,
            &mut self.calories,
            &mut self.carbohydrates,
            &mut self.protein,
            &mut self.fat,
        ]
    }

    fn optional_mut(&mut self) -> [Option<&mut Decimal>; 7] {
        [
            self.serving_size.as_mut(),
            self.fat_saturated.as_mut(),
            self.sodium.as_mut(),
            self.potassium.as_mut(),
            self.cholesterol.as_mut(),
            self.fiber.as_mut(),
            self.sugar.as_mut(),
        ]
    }
}

/// Upper-case the first letter of every word and lower-case the rest, where a
/// word is a run of letters (`o'neil's` → `O'Neil'S`).
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
