use axum::{
    Json, async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::domain::{Requester, UserId};

use super::types::ErrorResponse;

/// 識別情報が取り出せなかった場合のリジェクション
#[derive(Debug)]
pub struct IdentityRejection;

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(
            "UNAUTHENTICATED",
            "Missing or invalid identity headers",
        ));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// リクエストヘッダから操作要求者を取り出すエクストラクタ
///
/// 認証そのものはアイデンティティコラボレータ（上流のゲートウェイ）の
/// 責務で、ここでは検証済みの`X-User-Id`と`X-User-Role`を信頼して
/// 読み取るだけ。`X-User-Role: staff`のとき昇格済みとみなす。
#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(IdentityRejection)?;

        let elevated = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.eq_ignore_ascii_case("staff"));

        Ok(Requester {
            user_id: UserId::from_uuid(user_id),
            elevated,
        })
    }
}
