use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, CopyId, IssueId, Requester, ReservationId, UserId};

/// コマンド：蔵書を貸し出す（職員が発行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIssue {
    /// 借りる利用者
    pub user_id: UserId,
    pub copy_id: CopyId,
    pub issue_date: NaiveDate,
    /// 指定がなければ貸出期間のデフォルトが適用される
    pub requested_due_date: Option<NaiveDate>,
    pub notes: String,
    pub requester: Requester,
}

/// コマンド：蔵書を返却する（職員が発行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnIssue {
    pub issue_id: IssueId,
    pub return_date: NaiveDate,
    pub requester: Requester,
}

/// コマンド：予約を作成する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReservation {
    pub user_id: UserId,
    pub book_id: BookId,
    pub created_at: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// コマンド：予約をキャンセルする
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReservation {
    pub reservation_id: ReservationId,
    pub requester: Requester,
}

/// コマンド：予約を履行する（外部の割り当てプロセスが発行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillReservation {
    pub reservation_id: ReservationId,
    pub requester: Requester,
}
