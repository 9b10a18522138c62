use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::circulation::CirculationError;

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(CirculationError);

impl From<CirculationError> for ApiError {
    fn from(err: CirculationError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self.0 {
            // 404 Not Found - リクエストされたリソースが存在しない
            CirculationError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Referenced entity not found".to_string(),
            ),

            // 403 Forbidden - 権限がない
            CirculationError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
                "Permission denied".to_string(),
            ),

            // 422 Unprocessable Entity - ビジネスルール違反
            CirculationError::CopyUnavailable => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "COPY_UNAVAILABLE",
                "Book copy is not available".to_string(),
            ),
            CirculationError::LimitExceeded => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "LIMIT_EXCEEDED",
                "Active issue limit exceeded".to_string(),
            ),
            CirculationError::AlreadyReturned => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ALREADY_RETURNED",
                "Issue has already been returned".to_string(),
            ),
            CirculationError::DuplicateReservation => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DUPLICATE_RESERVATION",
                "A non-cancelled reservation already exists for this user and book".to_string(),
            ),
            CirculationError::InvalidReservationState(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_RESERVATION_STATE",
                msg,
            ),

            // 503 Service Unavailable - ストレージ競合の再試行上限超過。
            // 呼び出し側が安全に再試行できる唯一の種別
            CirculationError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                "Temporarily unavailable, retry later".to_string(),
            ),

            // 500 Internal Server Error - システム障害。
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            CirculationError::Store(ref e) => {
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Storage error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
