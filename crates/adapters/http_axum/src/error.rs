//! HTTP error response mapping.

use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use smartcode_domain::error::{SmartHomeError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// No user could be identified from the request.
    Unauthenticated,
    /// The identified account is deactivated.
    Inactive,
    /// The request body is not valid JSON for the endpoint.
    InvalidBody(String),
    Domain(SmartHomeError),
}

impl From<SmartHomeError> for ApiError {
    fn from(err: SmartHomeError) -> Self {
        Self::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Domain(err.into())
    }
}

impl ApiError {
    /// Status code and client-facing message.
    pub(crate) fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_string(),
            ),
            Self::Inactive => (StatusCode::FORBIDDEN, "account is inactive".to_string()),
            Self::InvalidBody(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Domain(err) => domain_status(err),
        }
    }
}

fn domain_status(err: &SmartHomeError) -> (StatusCode, String) {
    match err {
        SmartHomeError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
        SmartHomeError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
        SmartHomeError::Conflict(err) => (StatusCode::CONFLICT, err.to_string()),
        SmartHomeError::Device(err) => (StatusCode::CONFLICT, err.to_string()),
        SmartHomeError::Access(err) => (StatusCode::FORBIDDEN, err.to_string()),
        SmartHomeError::Storage(err) => {
            tracing::error!(error = %err, "storage error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// JSON request body whose rejections are reported as [`ApiError`].
///
/// Unknown enum values such as a device kind or power state are validation
/// errors, so they answer 400 with the usual error envelope.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Parse an identifier taken from the URL path.
pub(crate) fn parse_id<T: FromStr>(value: &str) -> Result<T, ValidationError> {
    T::from_str(value.trim()).map_err(|_| ValidationError::InvalidId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcode_domain::error::{AccessError, ConflictError, DeviceError, NotFoundError};
    use smartcode_domain::id::DeviceId;

    fn status_of(err: impl Into<SmartHomeError>) -> StatusCode {
        ApiError::from(err.into()).status_and_message().0
    }

    #[test]
    fn should_map_domain_errors_to_status_codes() {
        assert_eq!(status_of(ValidationError::EmptyName), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(NotFoundError {
                entity: "Device",
                id: "x".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ConflictError {
                entity: "User",
                key: "ada".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DeviceError::NotConnected {
                device_id: "x".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AccessError {
                user_id: "u".to_string(),
                device_id: "d".to_string()
            }),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn should_hide_storage_details() {
        let err = SmartHomeError::Storage(Box::new(std::io::Error::other("disk on fire")));
        let (status, message) = ApiError::from(err).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "internal server error");
    }

    #[test]
    fn should_map_session_errors() {
        assert_eq!(
            ApiError::Unauthenticated.status_and_message().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Inactive.status_and_message().0,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn should_answer_bad_request_for_unreadable_body() {
        #[derive(Debug, serde::Deserialize)]
        struct PowerBody {
            #[allow(dead_code)]
            power: smartcode_domain::device::Power,
        }

        let request = Request::builder()
            .method("POST")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"power": "maybe"}"#))
            .unwrap();
        let Err(err) = JsonBody::<PowerBody>::from_request(request, &()).await else {
            panic!("body should be rejected");
        };
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("power"));
    }

    #[test]
    fn should_reject_malformed_ids() {
        assert_eq!(
            parse_id::<DeviceId>("not-a-uuid"),
            Err(ValidationError::InvalidId)
        );
        let id = DeviceId::new();
        assert_eq!(parse_id::<DeviceId>(&id.to_string()), Ok(id));
    }
}
