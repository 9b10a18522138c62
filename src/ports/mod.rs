pub mod copy_ledger;
pub mod issue_store;
pub mod reservation_store;

pub use copy_ledger::*;
pub use issue_store::*;
pub use reservation_store::*;

use thiserror::Error;

/// ポート層の共通エラー
///
/// ビジネスルール違反はここには現れない（各操作のOutcome型で表現される）。
/// Contentionはトランザクションの再試行回数を使い切った場合のみで、
/// 呼び出し側が安全に再試行できる唯一の種別。
#[derive(Debug, Error)]
pub enum StoreError {
    /// ストレージ競合（直列化失敗の再試行上限超過）
    #[error("storage contention, retry later")]
    Contention,

    /// ストレージ基盤のエラー
    #[error("storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
