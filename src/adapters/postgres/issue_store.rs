use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::issue::Issue;
use crate::domain::{CopyId, IssueId, UserId};
use crate::ports::copy_ledger::AcquireOutcome;
use crate::ports::issue_store::{
    FinalizeReturnOutcome, InsertIssueOutcome, IssueStore as IssueStoreTrait,
};
use crate::ports::{Result, StoreError};

use super::{MAX_TX_RETRIES, copy_ledger, is_serialization_failure};

/// PostgreSQLの行データをIssueに変換する
fn map_row_to_issue(row: &PgRow) -> Issue {
    Issue {
        issue_id: IssueId::from_uuid(row.get("issue_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        copy_id: CopyId::from_uuid(row.get("copy_id")),
        issue_date: row.get("issue_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        returned: row.get("returned"),
        fine_amount: row.get("fine_amount"),
        notes: row.get("notes"),
    }
}

const SELECT_ISSUE_COLUMNS: &str = r#"
    SELECT issue_id, user_id, copy_id, issue_date, due_date,
           return_date, returned, fine_amount, notes
    FROM issues
"#;

/// IssueStoreのPostgreSQL実装
///
/// 変更系の操作はSERIALIZABLE分離のトランザクションで実行され、
/// 直列化失敗は上限回数まで自動で再実行される。部分的な書き込みが
/// 残ることはない（コミットするか全ロールバックか）。
pub struct IssueStore {
    pool: PgPool,
}

impl IssueStore {
    /// PostgreSQLコネクションプールから新しいIssueStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 貸出トランザクションの本体（1回分の試行）
    ///
    /// 上限確認・台帳の確保・挿入を1つのSERIALIZABLEトランザクションで
    /// 行う。並行する同一利用者の挿入同士は直列化失敗となり、
    /// 呼び出し側のループで再実行される。
    async fn insert_tx(
        &self,
        issue: &Issue,
        max_active_issues: usize,
    ) -> std::result::Result<InsertIssueOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        // 1. 貸出上限の確認
        let active_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM issues WHERE user_id = $1 AND returned = FALSE")
                .bind(issue.user_id.value())
                .fetch_one(&mut *tx)
                .await?;

        if active_count >= max_active_issues as i64 {
            return Ok(InsertIssueOutcome::LimitExceeded);
        }

        // 2. 台帳の確保（条件付きUPDATEによるcompare-and-swap）
        match copy_ledger::acquire(&mut *tx, issue.copy_id).await? {
            AcquireOutcome::Acquired => {}
            AcquireOutcome::AlreadyOnLoan => return Ok(InsertIssueOutcome::CopyUnavailable),
            AcquireOutcome::NotFound => return Ok(InsertIssueOutcome::CopyNotFound),
        }

        // 3. レコード挿入
        sqlx::query(
            r#"
            INSERT INTO issues (
                issue_id, user_id, copy_id, issue_date, due_date,
                return_date, returned, fine_amount, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(issue.issue_id.value())
        .bind(issue.user_id.value())
        .bind(issue.copy_id.value())
        .bind(issue.issue_date)
        .bind(issue.due_date)
        .bind(issue.return_date)
        .bind(issue.returned)
        .bind(issue.fine_amount)
        .bind(&issue.notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(InsertIssueOutcome::Inserted)
    }

    /// 返却トランザクションの本体（1回分の試行）
    async fn finalize_return_tx(
        &self,
        issue_id: IssueId,
        return_date: NaiveDate,
        fine_amount: i64,
    ) -> std::result::Result<FinalizeReturnOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // `returned = FALSE`の行だけを更新するCAS。二重送信の2回目は
        // ここで0行更新となり、再実行されずに拒否される。
        let row = sqlx::query(
            r#"
            UPDATE issues
            SET returned = TRUE, return_date = $2, fine_amount = $3
            WHERE issue_id = $1 AND returned = FALSE
            RETURNING issue_id, user_id, copy_id, issue_date, due_date,
                      return_date, returned, fine_amount, notes
            "#,
        )
        .bind(issue_id.value())
        .bind(return_date)
        .bind(fine_amount)
        .fetch_optional(&mut *tx)
        .await?;

        let issue = match row {
            Some(row) => map_row_to_issue(&row),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM issues WHERE issue_id = $1)")
                        .bind(issue_id.value())
                        .fetch_one(&mut *tx)
                        .await?;

                return Ok(if exists {
                    FinalizeReturnOutcome::AlreadyReturned
                } else {
                    FinalizeReturnOutcome::NotFound
                });
            }
        };

        // 同一ユニットオブワーク内で蔵書を解放
        copy_ledger::release(&mut *tx, issue.copy_id).await?;

        tx.commit().await?;
        Ok(FinalizeReturnOutcome::Returned(issue))
    }
}

#[async_trait]
impl IssueStoreTrait for IssueStore {
    async fn insert(&self, issue: &Issue, max_active_issues: usize) -> Result<InsertIssueOutcome> {
        let mut attempt = 0;
        loop {
            match self.insert_tx(issue, max_active_issues).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if is_serialization_failure(&e) => {
                    attempt += 1;
                    if attempt >= MAX_TX_RETRIES {
                        return Err(StoreError::Contention);
                    }
                    tracing::debug!(attempt, "serialization conflict on issue insert, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn get(&self, issue_id: IssueId) -> Result<Option<Issue>> {
        let row = sqlx::query(&format!("{SELECT_ISSUE_COLUMNS} WHERE issue_id = $1"))
            .bind(issue_id.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_row_to_issue))
    }

    async fn finalize_return(
        &self,
        issue_id: IssueId,
        return_date: NaiveDate,
        fine_amount: i64,
    ) -> Result<FinalizeReturnOutcome> {
        let mut attempt = 0;
        loop {
            match self
                .finalize_return_tx(issue_id, return_date, fine_amount)
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(e) if is_serialization_failure(&e) => {
                    attempt += 1;
                    if attempt >= MAX_TX_RETRIES {
                        return Err(StoreError::Contention);
                    }
                    tracing::debug!(attempt, "serialization conflict on return, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn active_for_user(&self, user_id: UserId) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ISSUE_COLUMNS} WHERE user_id = $1 AND returned = FALSE ORDER BY issue_date DESC"
        ))
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_row_to_issue).collect())
    }

    async fn overdue(&self, as_of: NaiveDate) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ISSUE_COLUMNS} WHERE returned = FALSE AND due_date < $1 ORDER BY due_date ASC"
        ))
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_row_to_issue).collect())
    }
}
