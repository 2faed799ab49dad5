use crate::dto::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hrc_core::{ConsoleError, FlowError, GENERIC_ERROR_MESSAGE};
use hrc_gateway::GatewayError;

/// A failed console request: an HTTP status and the message shown to the user.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorRes {
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Remote failures are logged and reported with the generic message.
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        tracing::warn!(service = ?err.service(), "remote call failed: {err}");
        Self::new(StatusCode::BAD_GATEWAY, GENERIC_ERROR_MESSAGE)
    }
}

impl From<ConsoleError> for ApiError {
    fn from(err: ConsoleError) -> Self {
        match err {
            ConsoleError::InvalidInput(message) => Self::new(StatusCode::BAD_REQUEST, message),
            ConsoleError::Flow(flow) => flow.into(),
            other => {
                tracing::error!("console error: {other}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE)
            }
        }
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
