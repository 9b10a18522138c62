use crate::domain::commands::{CancelReservation, CreateReservation, FulfillReservation};
use crate::domain::reservation::{self, Reservation, ReservationStatus};
use crate::domain::{BookId, CancelReservationError, FulfillReservationError, UserId};
use crate::ports::{InsertReservationOutcome, TransitionOutcome};

use super::errors::{CirculationError, Result};
use super::issue_service::ServiceDependencies;

/// 予約を作成する
///
/// ビジネスルール：
/// - 同一の(利用者, 書籍)にキャンセルされていない予約がないこと
///
/// 一意性はストアが挿入と同一ユニットオブワーク内で強制する。
pub async fn create_reservation(
    deps: &ServiceDependencies,
    cmd: CreateReservation,
) -> Result<Reservation> {
    let reservation =
        reservation::open_reservation(cmd.user_id, cmd.book_id, cmd.created_at, cmd.expiry_date);

    match deps.reservation_store.insert(&reservation).await? {
        InsertReservationOutcome::Inserted => Ok(reservation),
        InsertReservationOutcome::Duplicate => Err(CirculationError::DuplicateReservation),
    }
}

/// 予約をキャンセルする
///
/// ビジネスルール：
/// - 要求者が予約の所有者本人か職員であること
/// - 既にキャンセル済みなら何もしない成功（冪等）
/// - Fulfilledな予約はキャンセル不可
pub async fn cancel_reservation(
    deps: &ServiceDependencies,
    cmd: CancelReservation,
) -> Result<Reservation> {
    // 1. 予約を取得
    let current = deps
        .reservation_store
        .get(cmd.reservation_id)
        .await?
        .ok_or(CirculationError::NotFound)?;

    // 2. 権限確認
    if !cmd.requester.may_act_for(current.user_id) {
        return Err(CirculationError::PermissionDenied);
    }

    // 3. ドメイン層の純粋関数で遷移を判定
    let cancelled = reservation::cancel_reservation(&current).map_err(|e| match e {
        CancelReservationError::AlreadyFulfilled => CirculationError::InvalidReservationState(
            "cannot cancel a fulfilled reservation".to_string(),
        ),
    })?;

    // 既にキャンセル済み：何もしない成功
    if current.status == ReservationStatus::Cancelled {
        return Ok(cancelled);
    }

    // 4. CASで確定（並行する履行と両方成功することはない）
    match deps
        .reservation_store
        .transition(
            cmd.reservation_id,
            ReservationStatus::Pending,
            ReservationStatus::Cancelled,
        )
        .await?
    {
        TransitionOutcome::Applied(reservation) => Ok(reservation),
        TransitionOutcome::StateMismatch(observed) => match observed.status {
            // 並行するキャンセルに先を越された：冪等な成功
            ReservationStatus::Cancelled => Ok(observed),
            _ => Err(CirculationError::InvalidReservationState(
                "cannot cancel a fulfilled reservation".to_string(),
            )),
        },
        TransitionOutcome::NotFound => Err(CirculationError::NotFound),
    }
}

/// 予約を履行する（外部の割り当てプロセスが発行、職員限定）
///
/// 蔵書の割り当てポリシーはこのエンジンの責務外。ここでは
/// Pending → Fulfilledの状態遷移のみを提供する。
pub async fn fulfill_reservation(
    deps: &ServiceDependencies,
    cmd: FulfillReservation,
) -> Result<Reservation> {
    if !cmd.requester.elevated {
        return Err(CirculationError::PermissionDenied);
    }

    let current = deps
        .reservation_store
        .get(cmd.reservation_id)
        .await?
        .ok_or(CirculationError::NotFound)?;

    reservation::fulfill_reservation(&current).map_err(|e| match e {
        FulfillReservationError::AlreadyFulfilled => CirculationError::InvalidReservationState(
            "reservation is already fulfilled".to_string(),
        ),
        FulfillReservationError::Cancelled => CirculationError::InvalidReservationState(
            "cannot fulfill a cancelled reservation".to_string(),
        ),
    })?;

    match deps
        .reservation_store
        .transition(
            cmd.reservation_id,
            ReservationStatus::Pending,
            ReservationStatus::Fulfilled,
        )
        .await?
    {
        TransitionOutcome::Applied(reservation) => Ok(reservation),
        TransitionOutcome::StateMismatch(observed) => Err(CirculationError::InvalidReservationState(
            format!("reservation is {}", observed.status.as_str()),
        )),
        TransitionOutcome::NotFound => Err(CirculationError::NotFound),
    }
}

/// 書籍のPendingな予約を先着順で取得する
///
/// 外部の割り当てプロセスが、貸出可能になった蔵書の割り当て先を
/// 決めるために参照する。
pub async fn pending_reservations_for(
    deps: &ServiceDependencies,
    book_id: BookId,
) -> Result<Vec<Reservation>> {
    Ok(deps.reservation_store.pending_for_book(book_id).await?)
}

/// 利用者の全予約を取得する
pub async fn reservations_for(
    deps: &ServiceDependencies,
    user_id: UserId,
) -> Result<Vec<Reservation>> {
    Ok(deps.reservation_store.for_user(user_id).await?)
}
