//! # Payment Repository
//!
//! Payments recorded against quotations, and the resulting balance.

use chrono::{DateTime, NaiveDate, Utc};
use quoter_core::validation::validate_payment_amount;
use quoter_core::{CoreError, Payment, PaymentMethod, PaymentSummary};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::stored_decimal;
use crate::error::{DbError, DbResult};

/// Fields for a new payment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_on: NaiveDate,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl NewPayment {
    pub fn new(amount: Decimal, method: PaymentMethod, paid_on: NaiveDate) -> Self {
        NewPayment {
            amount,
            method,
            paid_on,
            reference: None,
            notes: None,
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: String,
    quotation_id: String,
    amount: String,
    method: PaymentMethod,
    paid_on: NaiveDate,
    reference: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> DbResult<Self> {
        Ok(Payment {
            amount: stored_decimal("payment", "amount", &row.amount)?,
            id: row.id,
            quotation_id: row.quotation_id,
            method: row.method,
            paid_on: row.paid_on,
            reference: row.reference,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a payment against a live quotation.
    ///
    /// ## Errors
    /// - [`DbError::Core`] when the amount is not positive
    /// - [`DbError::NotFound`] for an unknown or soft-deleted quotation
    /// - [`DbError::Busy`] when another writer changed the database between
    ///   the check and the insert
    pub async fn add(&self, quotation_id: &str, new: NewPayment) -> DbResult<Payment> {
        validate_payment_amount(new.amount).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let live: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM quotations WHERE id = ?1 AND deleted_at IS NULL")
                .bind(quotation_id)
                .fetch_optional(&mut *tx)
                .await?;
        if live.is_none() {
            return Err(DbError::not_found("Quotation", quotation_id));
        }

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            quotation_id: quotation_id.to_string(),
            amount: new.amount,
            method: new.method,
            paid_on: new.paid_on,
            reference: new.reference,
            notes: new.notes,
            created_at: Utc::now(),
        };

        debug!(
            quotation_id = %quotation_id,
            amount = %payment.amount,
            method = %payment.method,
            "Recording payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, quotation_id, amount, method,
                paid_on, reference, notes, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8
            )
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.quotation_id)
        .bind(payment.amount.to_string())
        .bind(payment.method)
        .bind(payment.paid_on)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(payment)
    }

    /// Gets all payments for a quotation, oldest first.
    pub async fn for_quotation(&self, quotation_id: &str) -> DbResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, quotation_id, amount, method, paid_on, reference, notes, created_at
            FROM payments
            WHERE quotation_id = ?1
            ORDER BY paid_on, created_at
            "#,
        )
        .bind(quotation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    /// Grand total, amount paid and balance for a quotation.
    ///
    /// Works for soft-deleted quotations too, so their history stays
    /// readable.
    pub async fn summary(&self, quotation_id: &str) -> DbResult<PaymentSummary> {
        let grand_total: Option<String> =
            sqlx::query_scalar("SELECT grand_total FROM quotations WHERE id = ?1")
                .bind(quotation_id)
                .fetch_optional(&self.pool)
                .await?;
        let grand_total = grand_total.ok_or_else(|| DbError::not_found("Quotation", quotation_id))?;
        let grand_total = stored_decimal("quotation", "grand_total", &grand_total)?;

        let payments = self.for_quotation(quotation_id).await?;

        Ok(PaymentSummary::from_payments(grand_total, &payments)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
