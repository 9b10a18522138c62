use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use std::str::FromStr;

use crate::domain::{BookCopy, BookId, CopyCondition, CopyId};
use crate::ports::copy_ledger::{AcquireOutcome, CopyLedger as CopyLedgerTrait};
use crate::ports::{Result, StoreError};

/// PostgreSQLの行データをBookCopyに変換する
fn map_row_to_copy(row: &PgRow) -> Result<BookCopy> {
    let condition_str: &str = row.get("condition");
    let condition = CopyCondition::from_str(condition_str).map_err(|e| {
        StoreError::Backend(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        )))
    })?;

    Ok(BookCopy {
        copy_id: CopyId::from_uuid(row.get("copy_id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        available: row.get("available"),
        condition,
        shelf_location: row.get("shelf_location"),
    })
}

/// 蔵書を確保する（単一のアトミックなread-modify-write）
///
/// `available = TRUE`の行だけを条件付きUPDATEで倒すcompare-and-swap。
/// 読み取りと書き込みを分離しないため、同一蔵書への並行呼び出しでは
/// ちょうど1つだけが行を更新できる。IssueStoreの貸出トランザクション
/// からも同じコネクション上で呼ばれる。
pub(super) async fn acquire(
    conn: &mut PgConnection,
    copy_id: CopyId,
) -> std::result::Result<AcquireOutcome, sqlx::Error> {
    let updated = sqlx::query(
        r#"
        UPDATE book_copies
        SET available = FALSE
        WHERE copy_id = $1 AND available = TRUE
        "#,
    )
    .bind(copy_id.value())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 1 {
        return Ok(AcquireOutcome::Acquired);
    }

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_copies WHERE copy_id = $1)")
            .bind(copy_id.value())
            .fetch_one(&mut *conn)
            .await?;

    if exists {
        Ok(AcquireOutcome::AlreadyOnLoan)
    } else {
        Ok(AcquireOutcome::NotFound)
    }
}

/// 蔵書を無条件に解放する（冪等）
pub(super) async fn release(
    conn: &mut PgConnection,
    copy_id: CopyId,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("UPDATE book_copies SET available = TRUE WHERE copy_id = $1")
        .bind(copy_id.value())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// CopyLedgerのPostgreSQL実装
///
/// `available`フラグが貸出状態の唯一の外部から見える痕跡。
/// このアダプタ以外が書き込んではならない。
pub struct CopyLedger {
    pool: PgPool,
}

impl CopyLedger {
    /// PostgreSQLコネクションプールから新しいCopyLedgerを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CopyLedgerTrait for CopyLedger {
    async fn try_acquire(&self, copy_id: CopyId) -> Result<AcquireOutcome> {
        let mut conn = self.pool.acquire().await?;
        Ok(acquire(&mut conn, copy_id).await?)
    }

    async fn release(&self, copy_id: CopyId) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Ok(release(&mut conn, copy_id).await?)
    }

    async fn get(&self, copy_id: CopyId) -> Result<Option<BookCopy>> {
        let row = sqlx::query(
            r#"
            SELECT copy_id, book_id, available, condition, shelf_location
            FROM book_copies
            WHERE copy_id = $1
            "#,
        )
        .bind(copy_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_copy).transpose()
    }
}
