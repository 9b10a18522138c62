use thiserror::Error;

use crate::ports::StoreError;

/// 循環エンジンアプリケーション層のエラー
///
/// 前提条件違反はすべて同期的に特定の種別で呼び出し側へ報告される。
/// ビジネスルール違反は内部で再試行されず、状態も変更されない。
#[derive(Debug, Error)]
pub enum CirculationError {
    /// 参照されたエンティティが存在しない
    #[error("Referenced entity not found")]
    NotFound,

    /// 台帳の確保に失敗した（蔵書が貸出中）
    #[error("Book copy is not available")]
    CopyUnavailable,

    /// 貸出上限に達している
    #[error("Active issue limit exceeded")]
    LimitExceeded,

    /// 既に返却済み（終端状態の違反）
    #[error("Issue has already been returned")]
    AlreadyReturned,

    /// (利用者, 書籍)の一意性違反
    #[error("A non-cancelled reservation already exists for this user and book")]
    DuplicateReservation,

    /// 権限がない
    #[error("Permission denied")]
    PermissionDenied,

    /// 予約の状態が不正（例: Fulfilledな予約のキャンセル）
    #[error("Invalid reservation state: {0}")]
    InvalidReservationState(String),

    /// ストレージ競合の再試行上限超過。呼び出し側が安全に
    /// 再試行できる唯一の種別
    #[error("Temporarily unavailable, retry later")]
    Unavailable,

    /// ストアのエラー
    #[error("Store error")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<StoreError> for CirculationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Contention => CirculationError::Unavailable,
            StoreError::Backend(e) => CirculationError::Store(e),
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CirculationError>;
