use async_trait::async_trait;

use super::Result;
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::{BookId, ReservationId, UserId};

/// `insert`の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertReservationOutcome {
    /// 予約が作成された
    Inserted,
    /// 同一の(利用者, 書籍)にキャンセルされていない予約が既にある
    Duplicate,
}

/// `transition`の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// 遷移が適用された
    Applied(Reservation),
    /// 期待した状態と一致しなかった（現在のレコードを返す）
    StateMismatch(Reservation),
    /// 予約が存在しない
    NotFound,
}

/// 予約ストアポート
///
/// (利用者, 書籍)の一意性制約（キャンセル済みを除く）はストアが
/// 強制する。状態遷移は期待状態付きのcompare-and-swapで、並行する
/// キャンセルと履行が両方成功することはない。
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// 予約を挿入する
    ///
    /// キャンセルされていない同一(利用者, 書籍)の予約が存在する場合は
    /// `Duplicate`を返し、何も書き込まない。
    async fn insert(&self, reservation: &Reservation) -> Result<InsertReservationOutcome>;

    /// IDで予約を取得する
    async fn get(&self, reservation_id: ReservationId) -> Result<Option<Reservation>>;

    /// ステータスを遷移させる（`status = expected`の行だけを更新するCAS）
    async fn transition(
        &self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
        next: ReservationStatus,
    ) -> Result<TransitionOutcome>;

    /// 書籍のPendingな予約を`created_at`の昇順で取得する
    ///
    /// 先着順の割り当てのために外部の割り当てプロセスが参照する。
    async fn pending_for_book(&self, book_id: BookId) -> Result<Vec<Reservation>>;

    /// 利用者の全予約を取得する
    async fn for_user(&self, user_id: UserId) -> Result<Vec<Reservation>>;
}
