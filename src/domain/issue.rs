use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{CloseIssueError, CopyId, IssueId, UserId, fine};

/// Issue集約 - 1冊の蔵書の1回の貸出
///
/// ライフサイクル：Active（`returned = false`）で作成され、
/// 一度だけReturned（`returned = true`）に遷移する。Returnedは終端状態で、
/// `returned`・`return_date`・`fine_amount`の以降の変更は許されない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    // 識別子
    pub issue_id: IssueId,

    // 他の集約への参照（IDのみ）
    pub user_id: UserId,
    pub copy_id: CopyId,

    // 貸出管理の責務（日付は暦日単位）
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub returned: bool,

    /// 返却時に一度だけ計算される延滞料金（通貨単位）
    pub fine_amount: i64,

    /// 自由記述メモ
    pub notes: String,
}

/// 純粋関数：貸出を開始する
///
/// ビジネスルール：
/// - `due_date`が指定されなければ`issue_date + loan_period_days`
/// - 作成時はActive状態（`returned = false`、料金0）
///
/// 副作用なし。新しいIssueを返す。貸出上限と蔵書の確保は
/// 永続化時のアトミックなユニットオブワーク内で検証される。
pub fn open_issue(
    user_id: UserId,
    copy_id: CopyId,
    issue_date: NaiveDate,
    requested_due_date: Option<NaiveDate>,
    loan_period_days: u64,
    notes: String,
) -> Issue {
    let due_date = requested_due_date
        .unwrap_or_else(|| issue_date + Days::new(loan_period_days));

    Issue {
        issue_id: IssueId::new(),
        user_id,
        copy_id,
        issue_date,
        due_date,
        return_date: None,
        returned: false,
        fine_amount: 0,
        notes,
    }
}

/// 純粋関数：貸出を返却する
///
/// ビジネスルール：
/// - 返却済みのIssueは再返却不可（終端状態）
/// - 延滞料金は`due_date`と`return_date`から一度だけ計算される
///
/// 副作用なし。新しいIssueを返す。蔵書の解放は永続化側で
/// 同一ユニットオブワーク内に行われる。
pub fn close_issue(
    issue: &Issue,
    return_date: NaiveDate,
    fine_rate_per_day: i64,
) -> Result<Issue, CloseIssueError> {
    if issue.returned {
        return Err(CloseIssueError::AlreadyReturned);
    }

    let fine_amount = fine::overdue_fine(issue.due_date, return_date, fine_rate_per_day);

    Ok(Issue {
        return_date: Some(return_date),
        returned: true,
        fine_amount,
        ..issue.clone()
    })
}

/// 純粋関数：延滞判定
///
/// 未返却かつ`due_date < as_of`のとき延滞とみなす。
pub fn is_overdue(issue: &Issue, as_of: NaiveDate) -> bool {
    !issue.returned && issue.due_date < as_of
}
