use async_trait::async_trait;
use chrono::NaiveDate;

use super::Result;
use crate::domain::issue::Issue;
use crate::domain::{IssueId, UserId};

/// `insert`の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertIssueOutcome {
    /// 貸出レコードが作成され、蔵書が確保された
    Inserted,
    /// 利用者の貸出上限に達している
    LimitExceeded,
    /// 蔵書が既に貸出中
    CopyUnavailable,
    /// 蔵書が存在しない
    CopyNotFound,
}

/// `finalize_return`の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeReturnOutcome {
    /// 返却が確定し、蔵書が解放された
    Returned(Issue),
    /// 既に返却済みだった（二重送信は再実行されない）
    AlreadyReturned,
    /// 貸出が存在しない
    NotFound,
}

/// 貸出ストアポート
///
/// 変更系メソッドはそれぞれ1つのアトミックかつ直列化可能な
/// ユニットオブワークとして実行される。前提条件の確認と書き込みが
/// 別々のステップとして他の並行操作から観測されることはない。
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// 貸出レコードを挿入する（アトミックなユニットオブワーク）
    ///
    /// 同一トランザクション内で順に：
    /// 1. 利用者のActiveな貸出数が`max_active_issues`未満であること
    /// 2. 台帳のtry_acquireが成功すること
    /// を確認してから挿入する。いずれかが失敗した場合は
    /// 何も書き込まれない。上限確認と挿入を分離すると
    /// check-then-act競合が起きるため、分離してはならない。
    async fn insert(&self, issue: &Issue, max_active_issues: usize) -> Result<InsertIssueOutcome>;

    /// IDで貸出を取得する
    async fn get(&self, issue_id: IssueId) -> Result<Option<Issue>>;

    /// 返却を確定する（`returned = false`の行だけを更新するCAS）
    ///
    /// 同一ユニットオブワーク内で`return_date`・`returned`・
    /// `fine_amount`を設定し、蔵書を解放する。既に返却済みの行には
    /// 何も書き込まず`AlreadyReturned`を返す。
    async fn finalize_return(
        &self,
        issue_id: IssueId,
        return_date: NaiveDate,
        fine_amount: i64,
    ) -> Result<FinalizeReturnOutcome>;

    /// 利用者のActiveな貸出を取得する（コミット済みの状態のみ）
    async fn active_for_user(&self, user_id: UserId) -> Result<Vec<Issue>>;

    /// 延滞中の貸出を検索する
    ///
    /// `returned = false`かつ`due_date < as_of`の貸出を
    /// due_dateの昇順で返す。
    async fn overdue(&self, as_of: NaiveDate) -> Result<Vec<Issue>>;
}
