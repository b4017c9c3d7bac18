use crate::error::AppError;
use once_cell::sync::Lazy;
use regex::Regex;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;
use validator::{Validate, ValidationError};

pub static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_.-]{3,32}$").expect("username regex is valid"));

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ValidationResponse {
    pub status: String,
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationResponse {
    pub fn new(errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            status: "error".to_string(),
            errors,
        }
    }

    pub fn with_error(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(errors)
    }
}

pub type ApiError = Custom<Json<ValidationResponse>>;

pub trait ToValidationResponse {
    fn to_validation_response(self) -> ApiError;
}

impl ToValidationResponse for AppError {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        self.log_and_record("API Validation Error");
        let status = self.status_code();

        let (field, message) = match &self {
            AppError::Database(_) => ("database", "A database error occurred".to_string()),
            AppError::Authentication(msg) => ("authentication", msg.clone()),
            AppError::Authorization(msg) => ("permission", msg.clone()),
            AppError::NotFound(msg) => ("resource", format!("Not found: {}", msg)),
            AppError::Validation(msg) => ("request", msg.clone()),
            AppError::Conflict(msg) => ("resource", msg.clone()),
            AppError::Internal(_) => ("server", "Internal server error".to_string()),
        };

        Custom(status, Json(ValidationResponse::with_error(field, &message)))
    }
}

impl ToValidationResponse for Status {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        let (field, message) = match self.code {
            403 => (
                "permission",
                "You don't have permission to perform this action",
            ),
            401 => ("authentication", "Authentication required"),
            404 => ("resource", "Resource not found"),
            409 => ("resource", "Resource already exists"),
            400 => ("request", "Bad request"),
            422 => ("validation", "Validation failed"),
            500 => ("server", "Internal server error"),
            503 => ("service", "Service unavailable"),
            _ => ("error", "An error occurred"),
        };

        Custom(self, Json(ValidationResponse::with_error(field, message)))
    }
}

fn field_errors_to_response(errors: &validator::ValidationErrors) -> ApiError {
    let mut error_map = HashMap::new();

    for (field, field_errors) in errors.field_errors() {
        let error_messages: Vec<String> = field_errors
            .iter()
            .map(|error| {
                error
                    .message
                    .clone()
                    .unwrap_or_else(|| "Invalid value".into())
                    .to_string()
            })
            .collect();

        error_map.insert(field.to_string(), error_messages);
    }

    // Nested structs (assessment scores) report under their parent field.
    for (field, kind) in errors.errors() {
        if let validator::ValidationErrorsKind::Struct(nested) = kind {
            for (nested_field, nested_errors) in nested.field_errors() {
                let messages = nested_errors
                    .iter()
                    .map(|error| {
                        error
                            .message
                            .clone()
                            .unwrap_or_else(|| "Invalid value".into())
                            .to_string()
                    })
                    .collect();
                error_map.insert(format!("{}.{}", field, nested_field), messages);
            }
        }
    }

    Custom(
        Status::UnprocessableEntity,
        Json(ValidationResponse::new(error_map)),
    )
}

/// Validates a JSON request body, turning field errors into a 422 response.
pub trait JsonValidateExt<T> {
    fn validate_custom(self) -> Result<T, ApiError>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    fn validate_custom(self) -> Result<T, ApiError> {
        let inner = self.into_inner();
        match inner.validate() {
            Ok(()) => Ok(inner),
            Err(errors) => Err(field_errors_to_response(&errors)),
        }
    }
}

pub trait AppErrorExt<T> {
    fn validate_custom(self) -> Result<T, ApiError>;
}

impl<T> AppErrorExt<T> for Result<T, AppError> {
    fn validate_custom(self) -> Result<T, ApiError> {
        self.map_err(|e| e.to_validation_response())
    }
}

pub trait PermissionCheckExt {
    fn validate_custom(self) -> Result<(), ApiError>;
}

impl PermissionCheckExt for Result<(), Status> {
    fn validate_custom(self) -> Result<(), ApiError> {
        self.map_err(|status| status.to_validation_response())
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        let mut error = ValidationError::new("username");
        error.message = Some(
            "Username must be 3-32 characters of lowercase letters, digits, '_', '.' or '-'"
                .into(),
        );
        Err(error)
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Must not be blank".into());
        return Err(error);
    }
    Ok(())
}

pub fn validate_hand(hand: &str) -> Result<(), ValidationError> {
    match hand {
        "left" | "right" => Ok(()),
        _ => {
            let mut error = ValidationError::new("dominant_hand");
            error.message = Some("Dominant hand must be 'left' or 'right'".into());
            Err(error)
        }
    }
}

pub fn validate_side(side: &str) -> Result<(), ValidationError> {
    match side {
        "left" | "right" | "both" => Ok(()),
        _ => {
            let mut error = ValidationError::new("preferred_side");
            error.message = Some("Preferred side must be 'left', 'right' or 'both'".into());
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, Validate)]
    struct SignupForm {
        #[validate(
            length(min = 1, message = "Name is required"),
            custom(function = "validate_not_blank")
        )]
        name: String,
        #[validate(custom(function = "validate_username"))]
        username: String,
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("coach.maria").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("Has Space").is_err());
    }

    #[test]
    fn test_json_validation_collects_field_messages() {
        let form = Json(SignupForm {
            name: String::new(),
            username: "X".to_string(),
        });

        let Custom(status, Json(body)) = form.validate_custom().err().unwrap();
        assert_eq!(status, Status::UnprocessableEntity);
        assert!(body.errors["name"].contains(&"Name is required".to_string()));
        assert!(body.errors.contains_key("username"));
    }

    #[test]
    fn test_app_error_to_response() {
        let result: Result<(), AppError> = Err(AppError::Conflict("Session is full".into()));
        let Custom(status, Json(body)) = result.validate_custom().unwrap_err();
        assert_eq!(status, Status::Conflict);
        assert_eq!(body.errors["resource"], vec!["Session is full".to_string()]);
    }

    #[test]
    fn test_blank_values_are_rejected() {
        let form = Json(SignupForm {
            name: "   ".to_string(),
            username: "coach.maria".to_string(),
        });

        let Custom(status, Json(body)) = form.validate_custom().err().unwrap();
        assert_eq!(status, Status::UnprocessableEntity);
        assert_eq!(body.errors["name"], vec!["Must not be blank".to_string()]);
        assert!(!body.errors.contains_key("username"));
    }

    #[test]
    fn test_status_to_response() {
        let Custom(status, Json(body)) = Status::Forbidden.to_validation_response();
        assert_eq!(status, Status::Forbidden);
        assert!(body.errors.contains_key("permission"));

        let Custom(status, Json(body)) = Status::Unauthorized.to_validation_response();
        assert_eq!(status, Status::Unauthorized);
        assert!(body.errors.contains_key("authentication"));

        let Custom(_, Json(body)) = Status::ImATeapot.to_validation_response();
        assert_eq!(body.errors["error"], vec!["An error occurred".to_string()]);
    }
}
