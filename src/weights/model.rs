use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use sqlx::FromRow;
use time::{macros::date, Date, OffsetDateTime};
use uuid::Uuid;

use crate::clock::{parse_date, DateError};
use crate::error::{AppError, FieldErrors};
use crate::nutrition::{round1, significant_digits, MAX_DIGITS};

pub const MIN_WEIGHT: Decimal = dec!(1.0);
pub const MAX_WEIGHT: Decimal = dec!(500.0);
pub const EARLIEST_DATE: Date = date!(2000 - 01 - 01);

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct WeightEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub weight: Decimal,
    pub entry_date: Date,
    pub created_at: OffsetDateTime,
}

/// First rule a weight submission broke. Checks run in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid weight format.")]
    InvalidFormat,
    #[error(transparent)]
    Date(#[from] DateError),
    #[error("Date must be between 2000-01-01 and {today}.")]
    DateOutOfRange { today: Date },
    #[error("Weight is required.")]
    Required,
    #[error("Ensure this value is greater than or equal to 1.0.")]
    BelowMinimum,
    #[error("Ensure this value is less than or equal to 500.0.")]
    AboveMaximum,
    #[error("Ensure that there are no more than 6 digits in total.")]
    TooManyDigits,
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Date(_) | ValidationError::DateOutOfRange { .. } => "entry_date",
            _ => "weight",
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        FieldErrors::single(e.field(), e.to_string()).into()
    }
}

/// A weight and date ready to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightDraft {
    pub weight: Decimal,
    pub entry_date: Date,
}

/// Accept a JSON number or a numeric string. `null` and absence both mean
/// "not given".
fn coerce_weight(raw: Option<&Value>) -> Result<Option<Decimal>, ValidationError> {
    let text = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(ValidationError::InvalidFormat),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|_| ValidationError::InvalidFormat)
}

fn coerce_date(raw: Option<&Value>, today: Date) -> Result<Date, ValidationError> {
    match raw {
        None | Some(Value::Null) => Ok(today),
        Some(Value::String(s)) => Ok(parse_date(s)?),
        Some(_) => Err(DateError::Malformed.into()),
    }
}

/// Validate a raw submission. The first failing rule is reported.
pub fn validate_entry(
    weight: Option<&Value>,
    entry_date: Option<&Value>,
    today: Date,
) -> Result<WeightDraft, ValidationError> {
    let weight = coerce_weight(weight)?;

    let entry_date = coerce_date(entry_date, today)?;
    if entry_date < EARLIEST_DATE || entry_date > today {
        return Err(ValidationError::DateOutOfRange { today });
    }

    let weight = weight.ok_or(ValidationError::Required)?;
    if weight < MIN_WEIGHT {
        return Err(ValidationError::BelowMinimum);
    }
    if weight > MAX_WEIGHT {
        return Err(ValidationError::AboveMaximum);
    }
    if significant_digits(weight) > MAX_DIGITS {
        return Err(ValidationError::TooManyDigits);
    }

    Ok(WeightDraft {
        weight: round1(weight),
        entry_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TODAY: Date = date!(2024 - 06 - 15);

    fn check(weight: Value, entry_date: Value) -> Result<WeightDraft, ValidationError> {
        validate_entry(Some(&weight), Some(&entry_date), TODAY)
    }

    #[test]
    fn valid_entry_is_rounded() {
        let draft = check(json!(75.678), json!("2024-06-01")).unwrap();
        assert_eq!(draft.weight, dec!(75.7));
        assert_eq!(draft.entry_date, date!(2024 - 06 - 01));
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let draft = check(json!(" 80.25 "), json!("2024-06-15")).unwrap();
        assert_eq!(draft.weight, dec!(80.3));
    }

    #[test]
    fn nonexistent_date_is_a_date_error_not_a_bound_error() {
        let err = check(json!(600.0), json!("2023-02-30")).unwrap_err();
        assert_eq!(err, ValidationError::Date(DateError::Nonexistent));
        assert_eq!(err.field(), "entry_date");

        let err = check(json!(600.0), json!("2023-02-28")).unwrap_err();
        assert_eq!(err, ValidationError::AboveMaximum);
        assert_eq!(err.field(), "weight");
    }

    #[test]
    fn malformed_date_is_reported() {
        let err = check(json!(70), json!("15/06/2024")).unwrap_err();
        assert_eq!(err, ValidationError::Date(DateError::Malformed));
        assert_eq!(
            err.to_string(),
            "Invalid date format. Use the format YYYY-MM-DD."
        );
        let err = check(json!(70), json!(20240615)).unwrap_err();
        assert_eq!(err, ValidationError::Date(DateError::Malformed));
    }

    #[test]
    fn format_error_wins_over_everything() {
        let err = check(json!("heavy"), json!("2023-02-30")).unwrap_err();
        assert_eq!(err, ValidationError::InvalidFormat);
        let err = check(json!([70]), json!("2024-01-01")).unwrap_err();
        assert_eq!(err, ValidationError::InvalidFormat);
    }

    #[test]
    fn date_window_is_inclusive() {
        assert!(check(json!(70), json!("2000-01-01")).is_ok());
        assert!(check(json!(70), json!("2024-06-15")).is_ok());

        let err = check(json!(70), json!("1999-12-31")).unwrap_err();
        assert_eq!(err, ValidationError::DateOutOfRange { today: TODAY });
        assert_eq!(
            err.to_string(),
            "Date must be between 2000-01-01 and 2024-06-15."
        );
        assert!(check(json!(70), json!("2024-06-16")).is_err());
    }

    #[test]
    fn range_error_precedes_missing_weight() {
        let err = validate_entry(None, Some(&json!("1999-01-01")), TODAY).unwrap_err();
        assert!(matches!(err, ValidationError::DateOutOfRange { .. }));

        let err = validate_entry(Some(&Value::Null), None, TODAY).unwrap_err();
        assert_eq!(err, ValidationError::Required);
    }

    #[test]
    fn weight_bounds() {
        assert_eq!(check(json!(0.9), json!("2024-01-01")).unwrap_err(), ValidationError::BelowMinimum);
        assert_eq!(check(json!(500.1), json!("2024-01-01")).unwrap_err(), ValidationError::AboveMaximum);
        assert_eq!(check(json!(1), json!("2024-01-01")).unwrap().weight, dec!(1.0));
        assert_eq!(check(json!(500), json!("2024-01-01")).unwrap().weight, dec!(500.0));
    }

    #[test]
    fn too_many_digits_before_rounding() {
        let err = check(json!("158.26735"), json!("2024-01-01")).unwrap_err();
        assert_eq!(err, ValidationError::TooManyDigits);
        assert!(check(json!("158.2600"), json!("2024-01-01")).is_ok());
    }

    #[test]
    fn missing_date_defaults_to_today() {
        let draft = validate_entry(Some(&json!(72.4)), None, TODAY).unwrap();
        assert_eq!(draft.entry_date, TODAY);
    }

    #[test]
    fn errors_map_to_field_scoped_validation() {
        let err: AppError = ValidationError::Required.into();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields.get("weight").unwrap()[0], "Weight is required.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
