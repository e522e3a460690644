//! Custom extractors for request validation

use aide::operation::OperationInput;
use aide::OperationOutput;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use schemars::JsonSchema;
use validator::{Validate, ValidationErrors};

use crate::types::error::AppError;

/// Custom JSON extractor that validates the payload
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // First extract JSON
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_content_type",
                    "Missing Content-Type: application/json header",
                    false,
                ),
                _ => AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_json",
                    "Invalid JSON payload",
                    false,
                ),
            })?;

        // Then validate
        payload
            .validate()
            .map_err(|errors| AppError::validation(error_code(&errors)))?;

        Ok(Self(payload))
    }
}

/// Picks the error code reported for a failed validation
///
/// Uses the first failing field in name order: its custom message if one is set,
/// otherwise `invalid_<field>` with the field name in snake case.
fn error_code(errors: &ValidationErrors) -> String {
    let mut field_errors: Vec<_> = errors.field_errors().into_iter().collect();
    field_errors.sort_by(|a, b| a.0.cmp(&b.0));

    field_errors
        .into_iter()
        .find_map(|(field, errors)| {
            errors.first().map(|error| {
                error
                    .message
                    .as_ref()
                    .map_or_else(|| format!("invalid_{}", snake_case(&field)), ToString::to_string)
            })
        })
        .unwrap_or_else(|| "validation_error".to_string())
}

fn snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(ctx: &mut aide::generate::GenContext, operation: &mut aide::openapi::Operation) {
        // Delegate to Json<T>'s implementation since ValidatedJson has the same structure
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        // Document validation error responses
        AppError::inferred_responses(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, JsonSchema, Validate)]
    struct Payload {
        #[validate(length(min = 1, max = 5))]
        name: String,
        #[validate(email(message = "bad_email"))]
        email: String,
    }

    #[test]
    fn test_error_code_uses_field_name() {
        let payload = Payload {
            name: String::new(),
            email: "a@x.com".to_string(),
        };
        let errors = payload.validate().unwrap_err();

        assert_eq!(error_code(&errors), "invalid_name");
    }

    #[test]
    fn test_error_code_prefers_custom_message_and_field_order() {
        let payload = Payload {
            name: "much too long".to_string(),
            email: "not-an-email".to_string(),
        };
        let errors = payload.validate().unwrap_err();

        // "email" sorts before "name"
        assert_eq!(error_code(&errors), "bad_email");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("userId"), "user_id");
        assert_eq!(snake_case("user_id"), "user_id");
        assert_eq!(snake_case("name"), "name");
    }
}
