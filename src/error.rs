//! Error types shared by every handler, with their HTTP mapping.

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::filters::FilterError;

/// Validation failures keyed by field name. One field may collect several
/// messages; a whole record is checked before the error is raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(anyhow::Error::new(e))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, fields) = match &self {
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(errors.clone()))
            }
            AppError::Filter(_) => (StatusCode::BAD_REQUEST, "invalid_filter", None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict", None),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "upstream dependency failed");
                (StatusCode::BAD_GATEWAY, "fetch_failed", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let message = match &self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                message,
                fields,
            }),
        )
            .into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Whether `err` is a unique violation raised by the named constraint or index.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation() && db.constraint() == Some(constraint))
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::to_bytes;
    use sqlx::error::{DatabaseError, ErrorKind};

    #[derive(Debug)]
    struct FakeUniqueViolation(&'static str);

    impl fmt::Display for FakeUniqueViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
        }
    }

    impl std::error::Error for FakeUniqueViolation {}

    impl DatabaseError for FakeUniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    /// A database error as Postgres reports a violated unique constraint.
    pub(crate) fn unique_violation(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeUniqueViolation(constraint)))
    }

    #[test]
    fn unique_violation_matches_only_its_constraint() {
        let err = unique_violation("foods_name_lower_key");
        assert!(is_unique_violation(&err, "foods_name_lower_key"));
        assert!(!is_unique_violation(&err, "weight_entries_user_date_key"));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound, "foods_name_lower_key"));
    }

    #[test]
    fn field_errors_aggregate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("name", "A food item with this name already exists.");
        errors.add("calories", "Ensure this value is greater than or equal to 0.0.");
        errors.add("calories", "Ensure that there are no more than 6 digits in total.");

        assert_eq!(errors.get("calories").map(|m| m.len()), Some(2));
        assert_eq!(errors.get("name").map(|m| m.len()), Some(1));
        assert!(errors.get("fat").is_none());
        assert!(errors.clone().into_result().is_err());
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn field_errors_display_lists_every_message() {
        let mut errors = FieldErrors::single("weight", "Weight is required.");
        errors.add("date", "Invalid date format. Use the format YYYY-MM-DD.");
        let text = errors.to_string();
        assert!(text.contains("weight: Weight is required."));
        assert!(text.contains("date: Invalid date format"));
    }

    #[tokio::test]
    async fn validation_error_renders_fields() {
        let err = AppError::from(FieldErrors::single("name", "This field may not be blank."));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["fields"]["name"][0], "This field may not be blank.");
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("10.0.0.3"));
    }

    #[test]
    fn status_codes_follow_the_error_kind() {
        let cases = [
            (AppError::NotFound("Food item not found".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("duplicate".into()), StatusCode::CONFLICT),
            (AppError::Unauthorized("nope".into()), StatusCode::UNAUTHORIZED),
            (AppError::Upstream("timeout".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
