use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::{BookId, ReservationId, UserId};
use crate::ports::reservation_store::{
    InsertReservationOutcome, ReservationStore as ReservationStoreTrait, TransitionOutcome,
};
use crate::ports::{Result, StoreError};

use super::is_unique_violation;

/// PostgreSQLの行データをReservationに変換する
fn map_row_to_reservation(row: &PgRow) -> Result<Reservation> {
    let status_str: &str = row.get("status");
    let status = ReservationStatus::from_str(status_str).map_err(|e| {
        StoreError::Backend(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        )))
    })?;

    Ok(Reservation {
        reservation_id: ReservationId::from_uuid(row.get("reservation_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        book_id: BookId::from_uuid(row.get("book_id")),
        created_at: row.get("created_at"),
        status,
        expiry_date: row.get("expiry_date"),
    })
}

const SELECT_RESERVATION_COLUMNS: &str = r#"
    SELECT reservation_id, user_id, book_id, created_at, status, expiry_date
    FROM reservations
"#;

/// ReservationStoreのPostgreSQL実装
///
/// (利用者, 書籍)の一意性はキャンセル済みを除外した部分一意
/// インデックスで強制される。挿入と一意性確認が分離しないため、
/// 並行する重複予約はちょうど1件だけ成功する。
pub struct ReservationStore {
    pool: PgPool,
}

impl ReservationStore {
    /// PostgreSQLコネクションプールから新しいReservationStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStoreTrait for ReservationStore {
    async fn insert(&self, reservation: &Reservation) -> Result<InsertReservationOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO reservations (
                reservation_id, user_id, book_id, created_at, status, expiry_date
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.user_id.value())
        .bind(reservation.book_id.value())
        .bind(reservation.created_at)
        .bind(reservation.status.as_str())
        .bind(reservation.expiry_date)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertReservationOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertReservationOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query(&format!(
            "{SELECT_RESERVATION_COLUMNS} WHERE reservation_id = $1"
        ))
        .bind(reservation_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_reservation).transpose()
    }

    async fn transition(
        &self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
        next: ReservationStatus,
    ) -> Result<TransitionOutcome> {
        // `status = expected`の行だけを更新するCAS。並行する
        // キャンセルと履行はここでちょうど1件だけ成功する。
        let row = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $3
            WHERE reservation_id = $1 AND status = $2
            RETURNING reservation_id, user_id, book_id, created_at, status, expiry_date
            "#,
        )
        .bind(reservation_id.value())
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(TransitionOutcome::Applied(map_row_to_reservation(&row)?));
        }

        let current = sqlx::query(&format!(
            "{SELECT_RESERVATION_COLUMNS} WHERE reservation_id = $1"
        ))
        .bind(reservation_id.value())
        .fetch_optional(&self.pool)
        .await?;

        match current {
            Some(row) => Ok(TransitionOutcome::StateMismatch(map_row_to_reservation(
                &row,
            )?)),
            None => Ok(TransitionOutcome::NotFound),
        }
    }

    async fn pending_for_book(&self, book_id: BookId) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "{SELECT_RESERVATION_COLUMNS} WHERE book_id = $1 AND status = 'pending' ORDER BY created_at ASC"
        ))
        .bind(book_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }

    async fn for_user(&self, user_id: UserId) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "{SELECT_RESERVATION_COLUMNS} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }
}
