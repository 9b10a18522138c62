use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::commands::{CreateIssue, ReturnIssue};
use crate::domain::issue::{self, Issue};
use crate::domain::{Requester, UserId};
use crate::ports::{
    CopyLedger, FinalizeReturnOutcome, InsertIssueOutcome, IssueStore, ReservationStore,
};

use super::config::CirculationConfig;
use super::errors::{CirculationError, Result};

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub issue_store: Arc<dyn IssueStore>,
    pub reservation_store: Arc<dyn ReservationStore>,
    pub copy_ledger: Arc<dyn CopyLedger>,
    pub config: CirculationConfig,
}

/// 蔵書を貸し出す（職員限定）
///
/// ビジネスルール：
/// - 要求者が職員であること（貸出の作成は貸出カウンターの操作）
/// - 利用者のActiveな貸出数が上限（デフォルト5冊）未満であること
/// - 蔵書が貸出可能であること
///
/// # 一貫性保証
///
/// 上限確認・台帳の確保・レコード挿入はストアの1つのアトミックな
/// ユニットオブワーク内で行われる。2つの並行リクエストが両方とも
/// 上限確認を通過することはない（check-then-act競合の防止）。
pub async fn create_issue(deps: &ServiceDependencies, cmd: CreateIssue) -> Result<Issue> {
    // 1. 権限確認
    if !cmd.requester.elevated {
        return Err(CirculationError::PermissionDenied);
    }

    // 2. ドメイン層の純粋関数でレコードを構築（due_dateのデフォルト適用）
    let issue = issue::open_issue(
        cmd.user_id,
        cmd.copy_id,
        cmd.issue_date,
        cmd.requested_due_date,
        deps.config.loan_period_days,
        cmd.notes,
    );

    // 3. アトミックなユニットオブワークとして永続化
    match deps
        .issue_store
        .insert(&issue, deps.config.max_active_issues)
        .await?
    {
        InsertIssueOutcome::Inserted => Ok(issue),
        InsertIssueOutcome::LimitExceeded => Err(CirculationError::LimitExceeded),
        InsertIssueOutcome::CopyUnavailable => Err(CirculationError::CopyUnavailable),
        InsertIssueOutcome::CopyNotFound => Err(CirculationError::NotFound),
    }
}

/// 蔵書を返却する（職員限定）
///
/// ビジネスルール：
/// - 要求者が職員であること（返却の受付は貸出カウンターの操作）
/// - 貸出が存在すること
/// - 既に返却済みでないこと（二重送信は拒否され、再実行されない）
/// - 延滞料金は返却時に一度だけ計算される
///
/// # 一貫性保証
///
/// 返却の確定は`returned = false`の行だけを更新するCASで、
/// 蔵書の解放も同一ユニットオブワーク内で行われる。due_dateは
/// 作成後不変なので、読み取りと確定の間に料金が変わることはない。
pub async fn return_issue(deps: &ServiceDependencies, cmd: ReturnIssue) -> Result<Issue> {
    // 1. 権限確認
    if !cmd.requester.elevated {
        return Err(CirculationError::PermissionDenied);
    }

    // 2. 貸出を取得
    let issue = deps
        .issue_store
        .get(cmd.issue_id)
        .await?
        .ok_or(CirculationError::NotFound)?;

    // 3. ドメイン層の純粋関数で返却後の状態と料金を計算
    let closed = issue::close_issue(&issue, cmd.return_date, deps.config.fine_rate_per_day)
        .map_err(|_| CirculationError::AlreadyReturned)?;

    // 4. CASで確定（競合した二重返却はここで正確に1回だけ成功する）
    match deps
        .issue_store
        .finalize_return(cmd.issue_id, cmd.return_date, closed.fine_amount)
        .await?
    {
        FinalizeReturnOutcome::Returned(issue) => Ok(issue),
        FinalizeReturnOutcome::AlreadyReturned => Err(CirculationError::AlreadyReturned),
        FinalizeReturnOutcome::NotFound => Err(CirculationError::NotFound),
    }
}

/// IDで貸出を取得する
pub async fn get_issue(
    deps: &ServiceDependencies,
    issue_id: crate::domain::IssueId,
) -> Result<Issue> {
    deps.issue_store
        .get(issue_id)
        .await?
        .ok_or(CirculationError::NotFound)
}

/// 利用者のActiveな貸出を取得する
pub async fn active_issues_for(deps: &ServiceDependencies, user_id: UserId) -> Result<Vec<Issue>> {
    Ok(deps.issue_store.active_for_user(user_id).await?)
}

/// 延滞中の貸出を取得する（職員限定）
///
/// `returned = false`かつ`due_date < as_of`の貸出をdue_dateの昇順で返す。
pub async fn overdue_issues(
    deps: &ServiceDependencies,
    requester: Requester,
    as_of: NaiveDate,
) -> Result<Vec<Issue>> {
    if !requester.elevated {
        return Err(CirculationError::PermissionDenied);
    }

    Ok(deps.issue_store.overdue(as_of).await?)
}
