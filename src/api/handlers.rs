use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::circulation::{
    self as circulation, ServiceDependencies,
};
use crate::domain::commands::{CancelReservation, FulfillReservation, ReturnIssue};
use crate::domain::{BookId, IssueId, Requester, ReservationId, UserId};

use super::{
    error::ApiError,
    types::{
        CreateIssueRequest, CreateReservationRequest, IssueResponse, OverdueQuery,
        ReservationResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub deps: ServiceDependencies,
}

// ============================================================================
// Command handlers (POST)
// ============================================================================

/// POST /issues - 新しい貸出を作成（職員限定）
///
/// 強制されるビジネスルール:
/// - 要求者が職員であること
/// - 利用者のActiveな貸出数が上限未満であること
/// - 蔵書が貸出可能であること
///
/// 上限確認・蔵書の確保・レコード作成は1つのアトミックな
/// ユニットオブワークとして実行される。
pub async fn create_issue(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Json(req): Json<CreateIssueRequest>,
) -> Result<(StatusCode, Json<IssueResponse>), ApiError> {
    let cmd = req.to_command(requester);
    let issue = circulation::create_issue(&state.deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(IssueResponse::from(issue))))
}

/// POST /issues/:id/return - 蔵書を返却（職員限定）
///
/// 強制されるビジネスルール:
/// - 要求者が職員であること
/// - 貸出が存在すること
/// - 既に返却済みでないこと（二重送信は拒否される）
///
/// 延滞料金は返却時に一度だけ計算され、蔵書は同一ユニットオブワーク内で
/// 貸出可能に戻る。
pub async fn return_issue(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(issue_id): Path<Uuid>,
) -> Result<Json<IssueResponse>, ApiError> {
    let cmd = ReturnIssue {
        issue_id: IssueId::from_uuid(issue_id),
        return_date: Utc::now().date_naive(),
        requester,
    };

    let issue = circulation::return_issue(&state.deps, cmd).await?;

    Ok(Json(IssueResponse::from(issue)))
}

/// POST /reservations - 新しい予約を作成
///
/// 強制されるビジネスルール:
/// - 同一の(利用者, 書籍)にキャンセルされていない予約がないこと
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let cmd = req.to_command();
    let reservation = circulation::create_reservation(&state.deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(ReservationResponse::from(reservation))))
}

/// POST /reservations/:id/cancel - 予約をキャンセル
///
/// 強制されるビジネスルール:
/// - 要求者が予約の所有者本人か職員であること
/// - 既にキャンセル済みなら何もしない成功（冪等）
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let cmd = CancelReservation {
        reservation_id: ReservationId::from_uuid(reservation_id),
        requester,
    };

    let reservation = circulation::cancel_reservation(&state.deps, cmd).await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

/// POST /reservations/:id/fulfill - 予約を履行（職員限定）
///
/// 外部の割り当てプロセスが、貸出可能になった蔵書を予約に
/// 割り当てたときに呼び出す。
pub async fn fulfill_reservation(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let cmd = FulfillReservation {
        reservation_id: ReservationId::from_uuid(reservation_id),
        requester,
    };

    let reservation = circulation::fulfill_reservation(&state.deps, cmd).await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /issues/:id - 貸出詳細をIDで取得
pub async fn get_issue(
    State(state): State<Arc<AppState>>,
    Path(issue_id): Path<Uuid>,
) -> Result<Json<IssueResponse>, ApiError> {
    let issue = circulation::get_issue(&state.deps, IssueId::from_uuid(issue_id)).await?;

    Ok(Json(IssueResponse::from(issue)))
}

/// GET /issues/overdue - 延滞中の貸出一覧（職員限定）
///
/// クエリパラメータ:
/// - as_of: 基準日（デフォルトは今日）
pub async fn list_overdue_issues(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Query(query): Query<OverdueQuery>,
) -> Result<Json<Vec<IssueResponse>>, ApiError> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let issues = circulation::overdue_issues(&state.deps, requester, as_of).await?;

    Ok(Json(issues.into_iter().map(IssueResponse::from).collect()))
}

/// GET /users/:id/issues - 利用者のActiveな貸出一覧
pub async fn list_active_issues(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<IssueResponse>>, ApiError> {
    let issues =
        circulation::active_issues_for(&state.deps, UserId::from_uuid(user_id)).await?;

    Ok(Json(issues.into_iter().map(IssueResponse::from).collect()))
}

/// GET /users/:id/reservations - 利用者の予約一覧
pub async fn list_user_reservations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let reservations =
        circulation::reservations_for(&state.deps, UserId::from_uuid(user_id)).await?;

    Ok(Json(
        reservations
            .into_iter()
            .map(ReservationResponse::from)
            .collect(),
    ))
}

/// GET /books/:id/reservations/pending - 書籍のPendingな予約一覧（先着順）
///
/// 外部の割り当てプロセスが需要の把握と割り当て先の決定に使用する。
pub async fn list_pending_reservations(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let reservations =
        circulation::pending_reservations_for(&state.deps, BookId::from_uuid(book_id)).await?;

    Ok(Json(
        reservations
            .into_iter()
            .map(ReservationResponse::from)
            .collect(),
    ))
}
