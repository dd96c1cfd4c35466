use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::ApiError,
    models::{BookingRequest, BookingRow, PaymentInput},
};

const SELECT_BOOKING: &str = r#"SELECT id, treatment_name, date, slot, patient, patient_name,
       phone, paid, transaction_id, created_at
   FROM bookings"#;

/// Admission verdict. `success: false` is a soft rejection carrying the
/// booking that already holds the admission key; callers branch on the flag.
#[derive(Debug, Serialize)]
pub struct AdmissionOutcome {
    pub success: bool,
    pub booking: BookingRow,
}

/// Idempotent admission keyed by `(treatment_name, date, patient)`. The slot
/// is not part of the key: a patient re-submitting the same treatment and
/// date is turned away even if they picked a different slot. Slot occupancy
/// is advisory, resolved by consulting availability first.
pub async fn submit_booking(
    db: &SqlitePool,
    candidate: BookingRequest,
) -> Result<AdmissionOutcome, ApiError> {
    if let Some(existing) = find_by_admission_key(db, &candidate).await? {
        return Ok(AdmissionOutcome {
            success: false,
            booking: existing,
        });
    }

    let id = new_id();
    let inserted = sqlx::query(
        r#"INSERT INTO bookings
           (id, treatment_name, date, slot, patient, patient_name, phone, paid, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)"#,
    )
    .bind(&id)
    .bind(&candidate.treatment_name)
    .bind(&candidate.date)
    .bind(&candidate.slot)
    .bind(&candidate.patient)
    .bind(&candidate.patient_name)
    .bind(&candidate.phone)
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await;

    match inserted {
        Ok(_) => {
            let booking = fetch_booking(db, &id).await?;
            Ok(AdmissionOutcome {
                success: true,
                booking,
            })
        }
        // A concurrent identical request won the insert; the unique index on
        // the admission key converts the race into the soft-rejection path.
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            let existing = find_by_admission_key(db, &candidate)
                .await?
                .ok_or(ApiError::Unavailable)?;
            Ok(AdmissionOutcome {
                success: false,
                booking: existing,
            })
        }
        Err(err) => Err(err.into()),
    }
}

async fn find_by_admission_key(
    db: &SqlitePool,
    candidate: &BookingRequest,
) -> Result<Option<BookingRow>, ApiError> {
    let query = format!("{SELECT_BOOKING} WHERE treatment_name = ? AND date = ? AND patient = ? LIMIT 1");
    let row = sqlx::query_as::<_, BookingRow>(&query)
        .bind(&candidate.treatment_name)
        .bind(&candidate.date)
        .bind(&candidate.patient)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn fetch_booking(db: &SqlitePool, id: &str) -> Result<BookingRow, ApiError> {
    let query = format!("{SELECT_BOOKING} WHERE id = ? LIMIT 1");
    sqlx::query_as::<_, BookingRow>(&query)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound)
}

pub async fn fetch_patient_bookings(
    db: &SqlitePool,
    patient: &str,
) -> Result<Vec<BookingRow>, ApiError> {
    let query = format!("{SELECT_BOOKING} WHERE patient = ? ORDER BY created_at");
    let rows = sqlx::query_as::<_, BookingRow>(&query)
        .bind(patient)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Records the payment and marks the booking paid in one transaction, so a
/// crash cannot leave a logged payment with an unpaid booking.
pub async fn attach_payment(
    db: &SqlitePool,
    booking_id: &str,
    payment: PaymentInput,
) -> Result<BookingRow, ApiError> {
    let mut tx = db.begin().await?;

    sqlx::query(
        r#"INSERT INTO payments (id, transaction_id, amount, booking_id, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&payment.transaction_id)
    .bind(payment.amount)
    .bind(booking_id)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    let updated = sqlx::query(
        "UPDATE bookings SET paid = 1, transaction_id = ? WHERE id = ?",
    )
    .bind(&payment.transaction_id)
    .bind(booking_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    tx.commit().await?;
    fetch_booking(db, booking_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        // One connection: every handle must see the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn request(slot: &str) -> BookingRequest {
        BookingRequest {
            treatment_name: "Teeth Cleaning".to_string(),
            date: "2024-01-01".to_string(),
            slot: slot.to_string(),
            patient: "a@x.com".to_string(),
            patient_name: Some("Ada".to_string()),
            phone: None,
        }
    }

    #[actix_web::test]
    async fn first_admission_succeeds() {
        let pool = test_pool().await;
        let outcome = submit_booking(&pool, request("10am")).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.booking.slot, "10am");
        assert_eq!(outcome.booking.paid, 0);
    }

    #[actix_web::test]
    async fn resubmission_is_turned_away_even_with_a_different_slot() {
        let pool = test_pool().await;
        let first = submit_booking(&pool, request("10am")).await.unwrap();
        assert!(first.success);

        let second = submit_booking(&pool, request("9am")).await.unwrap();
        assert!(!second.success);
        assert_eq!(second.booking.id, first.booking.id);
        assert_eq!(second.booking.slot, "10am");
    }

    #[actix_web::test]
    async fn different_patients_may_book_the_same_treatment_and_date() {
        let pool = test_pool().await;
        let first = submit_booking(&pool, request("10am")).await.unwrap();
        assert!(first.success);

        let mut other = request("11am");
        other.patient = "b@x.com".to_string();
        let second = submit_booking(&pool, other).await.unwrap();
        assert!(second.success);
        assert_ne!(second.booking.id, first.booking.id);
    }

    #[actix_web::test]
    async fn attach_payment_marks_the_booking_paid() {
        let pool = test_pool().await;
        let admitted = submit_booking(&pool, request("10am")).await.unwrap();

        let payment = PaymentInput {
            transaction_id: "txn_123".to_string(),
            amount: 30.0,
        };
        let booking = attach_payment(&pool, &admitted.booking.id, payment)
            .await
            .unwrap();
        assert_eq!(booking.paid, 1);
        assert_eq!(booking.transaction_id.as_deref(), Some("txn_123"));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[actix_web::test]
    async fn attach_payment_to_an_unknown_booking_is_not_found() {
        let pool = test_pool().await;
        let payment = PaymentInput {
            transaction_id: "txn_123".to_string(),
            amount: 30.0,
        };
        let result = attach_payment(&pool, "missing", payment).await;
        assert!(matches!(result, Err(ApiError::NotFound)));

        // The rejected attachment must not leave a payment log entry behind.
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[actix_web::test]
    async fn fetch_booking_for_an_unknown_id_is_not_found() {
        let pool = test_pool().await;
        let result = fetch_booking(&pool, "missing").await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }
}
