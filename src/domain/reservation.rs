use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, CancelReservationError, FulfillReservationError, ReservationId, UserId};

/// 予約ステータス
///
/// Pendingで作成され、FulfilledまたはCancelledに遷移する。
/// どちらも終端状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// 待機中
    Pending,
    /// 履行済み（蔵書が割り当てられた）
    Fulfilled,
    /// キャンセル済み
    Cancelled,
}

impl ReservationStatus {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "fulfilled" => Ok(ReservationStatus::Fulfilled),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

/// Reservation集約 - タイトル（Book）に対する予約
///
/// 特定の蔵書ではなくタイトルに紐づく。不変条件：同一の(利用者, 書籍)の
/// 組に対してキャンセルされていない予約は高々1件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    // 識別子
    pub reservation_id: ReservationId,

    // 他の集約への参照（IDのみ）
    pub user_id: UserId,
    pub book_id: BookId,

    pub created_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub expiry_date: Option<DateTime<Utc>>,
}

/// 純粋関数：予約を作成する
///
/// ビジネスルール：
/// - 作成時はPending状態
///
/// 副作用なし。(利用者, 書籍)の一意性は永続化側で検証される。
pub fn open_reservation(
    user_id: UserId,
    book_id: BookId,
    created_at: DateTime<Utc>,
    expiry_date: Option<DateTime<Utc>>,
) -> Reservation {
    Reservation {
        reservation_id: ReservationId::new(),
        user_id,
        book_id,
        created_at,
        status: ReservationStatus::Pending,
        expiry_date,
    }
}

/// 純粋関数：予約をキャンセルする
///
/// ビジネスルール：
/// - Pending → Cancelled
/// - 既にCancelledの場合は何もしない成功（冪等）
/// - Fulfilledは終端状態のためキャンセル不可
///
/// 副作用なし。新しいReservationを返す。
pub fn cancel_reservation(
    reservation: &Reservation,
) -> Result<Reservation, CancelReservationError> {
    match reservation.status {
        ReservationStatus::Fulfilled => Err(CancelReservationError::AlreadyFulfilled),
        ReservationStatus::Cancelled => Ok(reservation.clone()),
        ReservationStatus::Pending => Ok(Reservation {
            status: ReservationStatus::Cancelled,
            ..reservation.clone()
        }),
    }
}

/// 純粋関数：予約を履行する
///
/// ビジネスルール：
/// - Pending → Fulfilled
/// - 蔵書の割り当てポリシーは外部の割り当てプロセスの責務で、
///   このエンジンは状態遷移のみを提供する
///
/// 副作用なし。新しいReservationを返す。
pub fn fulfill_reservation(
    reservation: &Reservation,
) -> Result<Reservation, FulfillReservationError> {
    match reservation.status {
        ReservationStatus::Fulfilled => Err(FulfillReservationError::AlreadyFulfilled),
        ReservationStatus::Cancelled => Err(FulfillReservationError::Cancelled),
        ReservationStatus::Pending => Ok(Reservation {
            status: ReservationStatus::Fulfilled,
            ..reservation.clone()
        }),
    }
}
