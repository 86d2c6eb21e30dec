use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use sqlx::error::ErrorKind;
use tracing::error;

use crate::engine::fees::FeeError;

/// Errors surfaced to API callers as `{"message": ...}` bodies.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    /// 404 with a message of its own instead of "<entity> not found".
    #[display(fmt = "{}", _0)]
    NoMatch(&'static str),
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(&'static str),
    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::NoMatch(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    return ApiError::Conflict("Record already exists".to_string());
                }
                ErrorKind::ForeignKeyViolation => {
                    return ApiError::bad_request("Referenced record does not exist");
                }
                ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    return ApiError::bad_request(db_err.message().to_string());
                }
                _ => {}
            }
        }

        error!(error = %e, "Database error");
        ApiError::Internal
    }
}

impl From<FeeError> for ApiError {
    fn from(e: FeeError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn not_found_renders_message_body() {
        let resp = ApiError::NotFound("Student").error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Student not found");
    }

    #[test]
    fn no_match_keeps_its_own_message() {
        let err = ApiError::NoMatch("No scores found for the specified criteria");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "No scores found for the specified criteria");
    }

    #[test]
    fn missing_fee_structure_is_a_bad_request() {
        let err: ApiError = FeeError::NoFeeStructure { class_id: 4 }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Fee structure not found for the student's class."
        );
    }

    #[test]
    fn unrelated_sqlx_errors_are_internal() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
