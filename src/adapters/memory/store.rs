use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::issue::Issue;
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::{BookCopy, BookId, CopyCondition, CopyId, IssueId, ReservationId, UserId};
use crate::ports::copy_ledger::{AcquireOutcome, CopyLedger};
use crate::ports::issue_store::{FinalizeReturnOutcome, InsertIssueOutcome, IssueStore};
use crate::ports::reservation_store::{
    InsertReservationOutcome, ReservationStore, TransitionOutcome,
};
use crate::ports::Result;

#[derive(Default)]
struct State {
    copies: HashMap<CopyId, BookCopy>,
    issues: HashMap<IssueId, Issue>,
    reservations: HashMap<ReservationId, Reservation>,
}

/// インメモリのストア実装
///
/// 3つのポートすべてを1つのMutexの内側で実装する。各操作は
/// ロック保持中に前提条件の確認と書き込みを行うため、PostgreSQL実装の
/// トランザクションと同じアトミック性を持つ。統合テストと
/// ローカル実行をサポートする。
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// 蔵書を登録する
    pub fn add_copy(&self, copy: BookCopy) {
        self.state
            .lock()
            .unwrap()
            .copies
            .insert(copy.copy_id, copy);
    }

    /// テスト用に貸出可能な蔵書を登録する
    pub fn add_available_copy(&self, copy_id: CopyId, book_id: BookId) {
        self.add_copy(BookCopy {
            copy_id,
            book_id,
            available: true,
            condition: CopyCondition::Good,
            shelf_location: String::new(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CopyLedger for MemoryStore {
    /// ロック保持中の単一のread-modify-write
    async fn try_acquire(&self, copy_id: CopyId) -> Result<AcquireOutcome> {
        let mut state = self.state.lock().unwrap();
        match state.copies.get_mut(&copy_id) {
            Some(copy) if copy.available => {
                copy.available = false;
                Ok(AcquireOutcome::Acquired)
            }
            Some(_) => Ok(AcquireOutcome::AlreadyOnLoan),
            None => Ok(AcquireOutcome::NotFound),
        }
    }

    async fn release(&self, copy_id: CopyId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(copy) = state.copies.get_mut(&copy_id) {
            copy.available = true;
        }
        Ok(())
    }

    async fn get(&self, copy_id: CopyId) -> Result<Option<BookCopy>> {
        let state = self.state.lock().unwrap();
        Ok(state.copies.get(&copy_id).cloned())
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn insert(&self, issue: &Issue, max_active_issues: usize) -> Result<InsertIssueOutcome> {
        let mut state = self.state.lock().unwrap();

        // 1. 貸出上限の確認
        let active_count = state
            .issues
            .values()
            .filter(|i| i.user_id == issue.user_id && !i.returned)
            .count();

        if active_count >= max_active_issues {
            return Ok(InsertIssueOutcome::LimitExceeded);
        }

        // 2. 台帳の確保
        match state.copies.get_mut(&issue.copy_id) {
            Some(copy) if copy.available => copy.available = false,
            Some(_) => return Ok(InsertIssueOutcome::CopyUnavailable),
            None => return Ok(InsertIssueOutcome::CopyNotFound),
        }

        // 3. レコード挿入
        state.issues.insert(issue.issue_id, issue.clone());
        Ok(InsertIssueOutcome::Inserted)
    }

    async fn get(&self, issue_id: IssueId) -> Result<Option<Issue>> {
        let state = self.state.lock().unwrap();
        Ok(state.issues.get(&issue_id).cloned())
    }

    async fn finalize_return(
        &self,
        issue_id: IssueId,
        return_date: NaiveDate,
        fine_amount: i64,
    ) -> Result<FinalizeReturnOutcome> {
        let mut state = self.state.lock().unwrap();

        let copy_id = match state.issues.get_mut(&issue_id) {
            None => return Ok(FinalizeReturnOutcome::NotFound),
            Some(issue) if issue.returned => return Ok(FinalizeReturnOutcome::AlreadyReturned),
            Some(issue) => {
                issue.returned = true;
                issue.return_date = Some(return_date);
                issue.fine_amount = fine_amount;
                issue.copy_id
            }
        };

        // 同一ロック内で蔵書を解放
        if let Some(copy) = state.copies.get_mut(&copy_id) {
            copy.available = true;
        }

        Ok(FinalizeReturnOutcome::Returned(
            state.issues[&issue_id].clone(),
        ))
    }

    async fn active_for_user(&self, user_id: UserId) -> Result<Vec<Issue>> {
        let state = self.state.lock().unwrap();
        let mut issues: Vec<Issue> = state
            .issues
            .values()
            .filter(|i| i.user_id == user_id && !i.returned)
            .cloned()
            .collect();
        issues.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
        Ok(issues)
    }

    async fn overdue(&self, as_of: NaiveDate) -> Result<Vec<Issue>> {
        let state = self.state.lock().unwrap();
        let mut issues: Vec<Issue> = state
            .issues
            .values()
            .filter(|i| !i.returned && i.due_date < as_of)
            .cloned()
            .collect();
        issues.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(issues)
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn insert(&self, reservation: &Reservation) -> Result<InsertReservationOutcome> {
        let mut state = self.state.lock().unwrap();

        // キャンセル済みを除く(利用者, 書籍)の一意性確認
        let duplicate = state.reservations.values().any(|r| {
            r.user_id == reservation.user_id
                && r.book_id == reservation.book_id
                && r.status != ReservationStatus::Cancelled
        });

        if duplicate {
            return Ok(InsertReservationOutcome::Duplicate);
        }

        state
            .reservations
            .insert(reservation.reservation_id, reservation.clone());
        Ok(InsertReservationOutcome::Inserted)
    }

    async fn get(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let state = self.state.lock().unwrap();
        Ok(state.reservations.get(&reservation_id).cloned())
    }

    async fn transition(
        &self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
        next: ReservationStatus,
    ) -> Result<TransitionOutcome> {
        let mut state = self.state.lock().unwrap();
        match state.reservations.get_mut(&reservation_id) {
            None => Ok(TransitionOutcome::NotFound),
            Some(r) if r.status == expected => {
                r.status = next;
                Ok(TransitionOutcome::Applied(r.clone()))
            }
            Some(r) => Ok(TransitionOutcome::StateMismatch(r.clone())),
        }
    }

    async fn pending_for_book(&self, book_id: BookId) -> Result<Vec<Reservation>> {
        let state = self.state.lock().unwrap();
        let mut reservations: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.book_id == book_id && r.status == ReservationStatus::Pending)
            .cloned()
            .collect();
        reservations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(reservations)
    }

    async fn for_user(&self, user_id: UserId) -> Result<Vec<Reservation>> {
        let state = self.state.lock().unwrap();
        let mut reservations: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reservations)
    }
}
