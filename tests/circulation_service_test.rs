use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use circulation_engine::adapters::memory::MemoryStore;
use circulation_engine::application::circulation::{
    CirculationConfig, CirculationError, ServiceDependencies, active_issues_for, cancel_reservation,
    create_issue, create_reservation, fulfill_reservation, overdue_issues,
    pending_reservations_for, return_issue,
};
use circulation_engine::domain::commands::*;
use circulation_engine::domain::reservation::ReservationStatus;
use circulation_engine::domain::value_objects::*;
use circulation_engine::ports::copy_ledger::{AcquireOutcome, CopyLedger};

// ============================================================================
// テストセットアップ
// ============================================================================

/// インメモリストアでサービスの依存関係を組み立てる
fn setup(config: CirculationConfig) -> (ServiceDependencies, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let deps = ServiceDependencies {
        issue_store: store.clone(),
        reservation_store: store.clone(),
        copy_ledger: store.clone(),
        config,
    };
    (deps, store)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 貸出カウンターの職員
fn staff() -> Requester {
    Requester::staff(UserId::new())
}

fn issue_cmd(user_id: UserId, copy_id: CopyId) -> CreateIssue {
    CreateIssue {
        user_id,
        copy_id,
        issue_date: date(2024, 1, 1),
        requested_due_date: None,
        notes: String::new(),
        requester: staff(),
    }
}

fn return_cmd(issue_id: IssueId, return_date: NaiveDate) -> ReturnIssue {
    ReturnIssue {
        issue_id,
        return_date,
        requester: staff(),
    }
}

// ============================================================================
// 貸出ライフサイクル
// ============================================================================

#[tokio::test]
async fn test_create_issue_defaults_due_date() {
    let (deps, store) = setup(CirculationConfig::default());
    let user_id = UserId::new();
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());

    let issue = create_issue(&deps, issue_cmd(user_id, copy_id)).await.unwrap();

    assert_eq!(issue.due_date, date(2024, 1, 15));
    assert!(!issue.returned);

    // 蔵書は貸出中になっている
    let copy = store.get(copy_id).await.unwrap().unwrap();
    assert!(!copy.available);
}

#[tokio::test]
async fn test_create_issue_fails_for_unknown_copy() {
    let (deps, _store) = setup(CirculationConfig::default());

    let result = create_issue(&deps, issue_cmd(UserId::new(), CopyId::new())).await;

    assert!(matches!(result, Err(CirculationError::NotFound)));
}

#[tokio::test]
async fn test_create_issue_requires_staff() {
    let (deps, store) = setup(CirculationConfig::default());
    let user_id = UserId::new();
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());

    // 一般利用者（借りる本人でも）は貸出を作成できない
    let cmd = CreateIssue {
        requester: Requester::user(user_id),
        ..issue_cmd(user_id, copy_id)
    };
    let result = create_issue(&deps, cmd).await;

    assert!(matches!(result, Err(CirculationError::PermissionDenied)));

    // 拒否された貸出は蔵書を確保しない
    let copy = store.get(copy_id).await.unwrap().unwrap();
    assert!(copy.available);
    assert!(active_issues_for(&deps, user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_return_issue_requires_staff() {
    let (deps, store) = setup(CirculationConfig::default());
    let user_id = UserId::new();
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());
    let issue = create_issue(&deps, issue_cmd(user_id, copy_id)).await.unwrap();

    // 一般利用者（借りた本人でも）は返却を確定できない
    let cmd = ReturnIssue {
        issue_id: issue.issue_id,
        return_date: date(2024, 1, 10),
        requester: Requester::user(user_id),
    };
    let result = return_issue(&deps, cmd).await;

    assert!(matches!(result, Err(CirculationError::PermissionDenied)));

    // 貸出はActiveのまま
    let active = active_issues_for(&deps, user_id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert!(!active[0].returned);
}

#[tokio::test]
async fn test_sixth_issue_exceeds_limit() {
    let (deps, store) = setup(CirculationConfig::default());
    let user_id = UserId::new();

    // 5冊まで貸出可能
    for _ in 0..5 {
        let copy_id = CopyId::new();
        store.add_available_copy(copy_id, BookId::new());
        create_issue(&deps, issue_cmd(user_id, copy_id)).await.unwrap();
    }

    // 6冊目は上限超過
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());
    let result = create_issue(&deps, issue_cmd(user_id, copy_id)).await;

    assert!(matches!(result, Err(CirculationError::LimitExceeded)));

    // 拒否された貸出は蔵書を確保しない
    let copy = store.get(copy_id).await.unwrap().unwrap();
    assert!(copy.available);
    assert_eq!(active_issues_for(&deps, user_id).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_limit_is_configurable() {
    let (deps, store) = setup(CirculationConfig {
        max_active_issues: 1,
        ..CirculationConfig::default()
    });
    let user_id = UserId::new();

    let first = CopyId::new();
    store.add_available_copy(first, BookId::new());
    create_issue(&deps, issue_cmd(user_id, first)).await.unwrap();

    let second = CopyId::new();
    store.add_available_copy(second, BookId::new());
    let result = create_issue(&deps, issue_cmd(user_id, second)).await;

    assert!(matches!(result, Err(CirculationError::LimitExceeded)));
}

#[tokio::test]
async fn test_return_restores_availability_and_is_terminal() {
    let (deps, store) = setup(CirculationConfig::default());
    let user_id = UserId::new();
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());

    let issue = create_issue(&deps, issue_cmd(user_id, copy_id)).await.unwrap();

    let returned = return_issue(&deps, return_cmd(issue.issue_id, date(2024, 1, 10)))
        .await
        .unwrap();

    assert!(returned.returned);
    assert_eq!(returned.return_date, Some(date(2024, 1, 10)));
    assert_eq!(returned.fine_amount, 0);

    // 蔵書は貸出可能に戻る
    let copy = CopyLedger::get(store.as_ref(), copy_id)
        .await
        .unwrap()
        .unwrap();
    assert!(copy.available);

    // Activeな貸出は残っていない
    assert!(active_issues_for(&deps, user_id).await.unwrap().is_empty());

    // 2回目の返却は拒否され、状態は変化しない
    let result = return_issue(&deps, return_cmd(issue.issue_id, date(2024, 2, 1))).await;
    assert!(matches!(result, Err(CirculationError::AlreadyReturned)));

    use circulation_engine::ports::issue_store::IssueStore;
    let stored = IssueStore::get(store.as_ref(), issue.issue_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.return_date, Some(date(2024, 1, 10)));
}

#[tokio::test]
async fn test_overdue_return_accrues_fine() {
    let (deps, store) = setup(CirculationConfig::default());
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());

    let cmd = CreateIssue {
        user_id: UserId::new(),
        copy_id,
        issue_date: date(2023, 12, 20),
        requested_due_date: Some(date(2024, 1, 1)),
        notes: String::new(),
        requester: staff(),
    };
    let issue = create_issue(&deps, cmd).await.unwrap();

    // 3日延滞、レート5/日 → 15
    let returned = return_issue(&deps, return_cmd(issue.issue_id, date(2024, 1, 4)))
        .await
        .unwrap();

    assert_eq!(returned.fine_amount, 15);
}

#[tokio::test]
async fn test_return_of_unknown_issue_fails() {
    let (deps, _store) = setup(CirculationConfig::default());

    let result = return_issue(&deps, return_cmd(IssueId::new(), date(2024, 1, 1))).await;

    assert!(matches!(result, Err(CirculationError::NotFound)));
}

#[tokio::test]
async fn test_copy_can_be_reissued_after_return() {
    let (deps, store) = setup(CirculationConfig::default());
    let u1 = UserId::new();
    let u2 = UserId::new();
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());

    // u1が借りている間、u2は借りられない
    let issue = create_issue(&deps, issue_cmd(u1, copy_id)).await.unwrap();
    let result = create_issue(&deps, issue_cmd(u2, copy_id)).await;
    assert!(matches!(result, Err(CirculationError::CopyUnavailable)));

    // u1が返却するとu2が借りられる
    return_issue(&deps, return_cmd(issue.issue_id, date(2024, 1, 5)))
        .await
        .unwrap();

    let reissued = create_issue(&deps, issue_cmd(u2, copy_id)).await.unwrap();
    assert_eq!(reissued.user_id, u2);
}

// ============================================================================
// 並行性
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_issues_for_same_copy_exactly_one_succeeds() {
    let (deps, store) = setup(CirculationConfig::default());
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());

    let deps1 = deps.clone();
    let deps2 = deps.clone();
    let t1 = tokio::spawn(async move { create_issue(&deps1, issue_cmd(UserId::new(), copy_id)).await });
    let t2 = tokio::spawn(async move { create_issue(&deps2, issue_cmd(UserId::new(), copy_id)).await });

    let r1 = t1.await.unwrap();
    let r2 = t2.await.unwrap();

    // ちょうど1つだけ成功する
    let successes = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let failure = if r1.is_err() { r1 } else { r2 };
    assert!(matches!(failure, Err(CirculationError::CopyUnavailable)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_try_acquire_exactly_one_acquires() {
    let store = Arc::new(MemoryStore::new());
    let copy_id = CopyId::new();
    store.add_available_copy(copy_id, BookId::new());

    let s1 = store.clone();
    let s2 = store.clone();
    let t1 = tokio::spawn(async move { s1.try_acquire(copy_id).await.unwrap() });
    let t2 = tokio::spawn(async move { s2.try_acquire(copy_id).await.unwrap() });

    let outcomes = [t1.await.unwrap(), t2.await.unwrap()];

    let acquired = outcomes
        .iter()
        .filter(|o| **o == AcquireOutcome::Acquired)
        .count();
    let on_loan = outcomes
        .iter()
        .filter(|o| **o == AcquireOutcome::AlreadyOnLoan)
        .count();
    assert_eq!(acquired, 1);
    assert_eq!(on_loan, 1);
}

#[tokio::test]
async fn test_try_acquire_unknown_copy_not_found() {
    let store = MemoryStore::new();
    let outcome = store.try_acquire(CopyId::new()).await.unwrap();
    assert_eq!(outcome, AcquireOutcome::NotFound);
}

// ============================================================================
// 延滞クエリ
// ============================================================================

#[tokio::test]
async fn test_overdue_issues_requires_staff() {
    let (deps, _store) = setup(CirculationConfig::default());

    let result = overdue_issues(&deps, Requester::user(UserId::new()), date(2024, 2, 1)).await;

    assert!(matches!(result, Err(CirculationError::PermissionDenied)));
}

#[tokio::test]
async fn test_overdue_issues_sorted_by_due_date() {
    let (deps, store) = setup(CirculationConfig::default());
    let staff = Requester::staff(UserId::new());

    // 期限の異なる2件の貸出
    let late = CopyId::new();
    store.add_available_copy(late, BookId::new());
    let earlier = CopyId::new();
    store.add_available_copy(earlier, BookId::new());

    create_issue(
        &deps,
        CreateIssue {
            user_id: UserId::new(),
            copy_id: late,
            issue_date: date(2024, 1, 1),
            requested_due_date: Some(date(2024, 1, 20)),
            notes: String::new(),
            requester: staff,
        },
    )
    .await
    .unwrap();
    create_issue(
        &deps,
        CreateIssue {
            user_id: UserId::new(),
            copy_id: earlier,
            issue_date: date(2024, 1, 1),
            requested_due_date: Some(date(2024, 1, 10)),
            notes: String::new(),
            requester: staff,
        },
    )
    .await
    .unwrap();

    let overdue = overdue_issues(&deps, staff, date(2024, 2, 1)).await.unwrap();

    assert_eq!(overdue.len(), 2);
    assert_eq!(overdue[0].due_date, date(2024, 1, 10));
    assert_eq!(overdue[1].due_date, date(2024, 1, 20));

    // 期限当日の貸出は含まれない
    let at_due = overdue_issues(&deps, staff, date(2024, 1, 10)).await.unwrap();
    assert!(at_due.is_empty());
}

// ============================================================================
// 予約
// ============================================================================

fn reservation_cmd(user_id: UserId, book_id: BookId) -> CreateReservation {
    CreateReservation {
        user_id,
        book_id,
        created_at: Utc::now(),
        expiry_date: None,
    }
}

#[tokio::test]
async fn test_duplicate_reservation_rejected_until_cancelled() {
    let (deps, _store) = setup(CirculationConfig::default());
    let user_id = UserId::new();
    let book_id = BookId::new();

    let first = create_reservation(&deps, reservation_cmd(user_id, book_id))
        .await
        .unwrap();

    // 同じ(利用者, 書籍)の2件目は拒否される
    let result = create_reservation(&deps, reservation_cmd(user_id, book_id)).await;
    assert!(matches!(result, Err(CirculationError::DuplicateReservation)));

    // キャンセル後は新しい予約が作成できる
    cancel_reservation(
        &deps,
        CancelReservation {
            reservation_id: first.reservation_id,
            requester: Requester::user(user_id),
        },
    )
    .await
    .unwrap();

    let second = create_reservation(&deps, reservation_cmd(user_id, book_id))
        .await
        .unwrap();
    assert_eq!(second.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn test_cancel_requires_owner_or_staff() {
    let (deps, _store) = setup(CirculationConfig::default());
    let owner = UserId::new();
    let reservation = create_reservation(&deps, reservation_cmd(owner, BookId::new()))
        .await
        .unwrap();

    // 他人はキャンセルできない
    let result = cancel_reservation(
        &deps,
        CancelReservation {
            reservation_id: reservation.reservation_id,
            requester: Requester::user(UserId::new()),
        },
    )
    .await;
    assert!(matches!(result, Err(CirculationError::PermissionDenied)));

    // 職員はキャンセルできる
    let cancelled = cancel_reservation(
        &deps,
        CancelReservation {
            reservation_id: reservation.reservation_id,
            requester: Requester::staff(UserId::new()),
        },
    )
    .await
    .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let (deps, _store) = setup(CirculationConfig::default());
    let owner = UserId::new();
    let reservation = create_reservation(&deps, reservation_cmd(owner, BookId::new()))
        .await
        .unwrap();

    let cmd = CancelReservation {
        reservation_id: reservation.reservation_id,
        requester: Requester::user(owner),
    };

    cancel_reservation(&deps, cmd.clone()).await.unwrap();

    // 2回目のキャンセルは何もしない成功
    let again = cancel_reservation(&deps, cmd).await.unwrap();
    assert_eq!(again.status, ReservationStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_unknown_reservation_fails() {
    let (deps, _store) = setup(CirculationConfig::default());

    let result = cancel_reservation(
        &deps,
        CancelReservation {
            reservation_id: ReservationId::new(),
            requester: Requester::staff(UserId::new()),
        },
    )
    .await;

    assert!(matches!(result, Err(CirculationError::NotFound)));
}

#[tokio::test]
async fn test_fulfill_requires_staff_and_is_terminal() {
    let (deps, _store) = setup(CirculationConfig::default());
    let owner = UserId::new();
    let reservation = create_reservation(&deps, reservation_cmd(owner, BookId::new()))
        .await
        .unwrap();

    // 一般利用者は履行できない
    let result = fulfill_reservation(
        &deps,
        FulfillReservation {
            reservation_id: reservation.reservation_id,
            requester: Requester::user(owner),
        },
    )
    .await;
    assert!(matches!(result, Err(CirculationError::PermissionDenied)));

    // 職員（外部の割り当てプロセス）は履行できる
    let fulfilled = fulfill_reservation(
        &deps,
        FulfillReservation {
            reservation_id: reservation.reservation_id,
            requester: Requester::staff(UserId::new()),
        },
    )
    .await
    .unwrap();
    assert_eq!(fulfilled.status, ReservationStatus::Fulfilled);

    // 履行済みはキャンセル不可
    let result = cancel_reservation(
        &deps,
        CancelReservation {
            reservation_id: reservation.reservation_id,
            requester: Requester::staff(UserId::new()),
        },
    )
    .await;
    assert!(matches!(
        result,
        Err(CirculationError::InvalidReservationState(_))
    ));
}

#[tokio::test]
async fn test_pending_reservations_are_fifo() {
    let (deps, _store) = setup(CirculationConfig::default());
    let book_id = BookId::new();

    let first_user = UserId::new();
    let second_user = UserId::new();

    let t0 = Utc::now();
    let r1 = create_reservation(
        &deps,
        CreateReservation {
            user_id: first_user,
            book_id,
            created_at: t0,
            expiry_date: None,
        },
    )
    .await
    .unwrap();
    let r2 = create_reservation(
        &deps,
        CreateReservation {
            user_id: second_user,
            book_id,
            created_at: t0 + chrono::Duration::seconds(10),
            expiry_date: None,
        },
    )
    .await
    .unwrap();

    // 先着順（created_at昇順）
    let pending = pending_reservations_for(&deps, book_id).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].reservation_id, r1.reservation_id);
    assert_eq!(pending[1].reservation_id, r2.reservation_id);

    // キャンセルされた予約はPending一覧から消える
    cancel_reservation(
        &deps,
        CancelReservation {
            reservation_id: r1.reservation_id,
            requester: Requester::user(first_user),
        },
    )
    .await
    .unwrap();

    let pending = pending_reservations_for(&deps, book_id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].reservation_id, r2.reservation_id);
}
