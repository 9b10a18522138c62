use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::commands::{CreateIssue, CreateReservation};
use crate::domain::issue::Issue;
use crate::domain::reservation::Reservation;
use crate::domain::{BookId, CopyId, Requester, UserId};

/// 貸出作成リクエスト（POST /issues、職員限定）
#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    /// 借りる利用者
    pub user_id: Uuid,
    pub copy_id: Uuid,
    /// 指定がなければ貸出期間のデフォルトが適用される
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl CreateIssueRequest {
    pub fn to_command(&self, requester: Requester) -> CreateIssue {
        CreateIssue {
            user_id: UserId::from_uuid(self.user_id),
            copy_id: CopyId::from_uuid(self.copy_id),
            issue_date: Utc::now().date_naive(),
            requested_due_date: self.due_date,
            notes: self.notes.clone().unwrap_or_default(),
            requester,
        }
    }
}

/// 貸出レスポンス
#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub copy_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub returned: bool,
    pub fine_amount: i64,
    pub notes: String,
}

impl From<Issue> for IssueResponse {
    fn from(issue: Issue) -> Self {
        Self {
            issue_id: issue.issue_id.value(),
            user_id: issue.user_id.value(),
            copy_id: issue.copy_id.value(),
            issue_date: issue.issue_date,
            due_date: issue.due_date,
            return_date: issue.return_date,
            returned: issue.returned,
            fine_amount: issue.fine_amount,
            notes: issue.notes,
        }
    }
}

/// 延滞一覧のクエリパラメータ（GET /issues/overdue）
#[derive(Debug, Deserialize)]
pub struct OverdueQuery {
    /// 基準日。指定がなければ今日
    pub as_of: Option<NaiveDate>,
}

/// 予約作成リクエスト（POST /reservations）
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl CreateReservationRequest {
    pub fn to_command(&self) -> CreateReservation {
        CreateReservation {
            user_id: UserId::from_uuid(self.user_id),
            book_id: BookId::from_uuid(self.book_id),
            created_at: Utc::now(),
            expiry_date: self.expiry_date,
        }
    }
}

/// 予約レスポンス
#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        Self {
            reservation_id: reservation.reservation_id.value(),
            user_id: reservation.user_id.value(),
            book_id: reservation.book_id.value(),
            created_at: reservation.created_at,
            status: reservation.status.as_str().to_string(),
            expiry_date: reservation.expiry_date,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
