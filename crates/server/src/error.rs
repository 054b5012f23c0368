use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hookrelay_core::InterfaceError;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: &'a str,
    reason: &'a str,
    correlation_id: &'a str,
}

/// HTTP rendering of an `InterfaceError`.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let reason = match &self.0 {
            InterfaceError::Forbidden { message, .. }
            | InterfaceError::BadRequest { message, .. }
            | InterfaceError::NotFound { message, .. }
            | InterfaceError::Internal { message, .. } => message.as_str(),
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            reason,
            correlation_id: self.0.correlation_id(),
        };
        (status, Json(body)).into_response()
    }
}
