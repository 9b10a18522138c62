pub mod copy_ledger;
pub mod issue_store;
pub mod reservation_store;

// パブリックに型を再エクスポート
pub use copy_ledger::CopyLedger as PostgresCopyLedger;
pub use issue_store::IssueStore as PostgresIssueStore;
pub use reservation_store::ReservationStore as PostgresReservationStore;

/// 直列化失敗とみなすトランザクションの再試行上限
///
/// 上限を超えた競合はStoreError::Contentionとして表面化し、
/// 呼び出し側だけが再試行を判断する。
pub(crate) const MAX_TX_RETRIES: u32 = 3;

/// PostgreSQLの直列化失敗（40001）またはデッドロック検出（40P01）か
///
/// SERIALIZABLE分離レベルでは正常系でも発生しうる一時的な競合で、
/// トランザクション全体を再実行すれば解決する。
pub(crate) fn is_serialization_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

/// PostgreSQLの一意性制約違反（23505）か
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
