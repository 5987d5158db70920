//! # Quotation Repository
//!
//! Database operations for quotations and their items.
//!
//! ## Quotation Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Quotation Lifecycle                               │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → Quotation { serial: Q-2025-000008, status: Draft }  │
//! │                                                                         │
//! │  2. ADD / REMOVE ITEMS                                                 │
//! │     └── add_item()    → price line, store, recompute totals            │
//! │     └── remove_item() → delete line, recompute totals                  │
//! │     └── set_header_discount() → recompute totals                       │
//! │                                                                         │
//! │  3. LABEL                                                              │
//! │     └── update_status() → Sent / Accepted / Lost                       │
//! │                                                                         │
//! │  4. (OPTIONAL) SOFT DELETE                                             │
//! │     └── soft_delete() → hidden from list(), serial stays reserved      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serial Uniqueness
//! ```text
//! create()
//!   │  lock serial_lock (shared by every repository of one Database)
//!   ▼
//! ┌─ attempt n ─────────────────────────────────────────────┐
//! │ BEGIN                                                    │
//! │ SELECT serial_number ... LIKE 'Q-2025-%'  (incl. deleted)│
//! │ next_serial(2025, issued)                                │
//! │ INSERT ... serial_number UNIQUE                          │
//! │ COMMIT                                                   │
//! └──────────────┬───────────────────────────────────────────┘
//!                │ UniqueViolation / Busy (another process won)
//!                ▼
//!        sleep n × backoff, recompute ── after N attempts ──► SerialConflict
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use quoter_core::serial::SERIAL_PREFIX;
use quoter_core::validation::{validate_customer_name, validate_description, validate_tax_rate};
use quoter_core::{
    compute_line, compute_quotation_totals, next_serial, CoreError, Discount, DiscountType,
    LineInput, LineResult, Quotation, QuotationLine, QuotationStatus, QuotationTotals, QuoteItem,
    Serial, UnitType,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{stored_decimal, stored_optional_decimal};
use crate::error::{DbError, DbResult};

const QUOTATION_COLUMNS: &str = "id, serial_number, customer_name, status, \
    header_discount_type, header_discount_value, tax_rate, \
    items_subtotal, total_item_discounts, header_discount_amount, \
    discounted_subtotal, tax_amount, grand_total, \
    notes, created_at, updated_at, deleted_at";

const ITEM_COLUMNS: &str = "id, quotation_id, description, \
    width, height, quantity, unit_type, base_unit_price, price_override, \
    discount_type, discount_value, tax_rate, \
    area, total_area, billable_quantity, unit_price, pre_discount_amount, \
    discount_amount, line_total_ex_tax, tax_amount, line_total_inc_tax, created_at";

// =============================================================================
// Inputs
// =============================================================================

/// Fields for a new quotation.
///
/// ## Example
/// ```rust
/// use quoter_db::NewQuotation;
/// use quoter_core::Discount;
/// use rust_decimal::Decimal;
///
/// let new = NewQuotation::new("Al Noor Interiors")
///     .header_discount(Discount::percent(Decimal::from(10)))
///     .notes("Measure again before cutting");
/// assert!(new.tax_rate.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuotation {
    pub customer_name: String,
    pub header_discount: Discount,
    /// `None` uses the database's default rate.
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
    /// Year the serial is minted in. `None` uses the current UTC year.
    pub serial_year: Option<i32>,
}

impl NewQuotation {
    pub fn new(customer_name: impl Into<String>) -> Self {
        NewQuotation {
            customer_name: customer_name.into(),
            header_discount: Discount::none(),
            tax_rate: None,
            notes: None,
            serial_year: None,
        }
    }

    pub fn header_discount(mut self, discount: Discount) -> Self {
        self.header_discount = discount;
        self
    }

    pub fn tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = Some(rate);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn serial_year(mut self, year: i32) -> Self {
        self.serial_year = Some(year);
        self
    }
}

/// A line to add to a quotation.
///
/// The line is priced at the quotation's tax rate; `input.tax_rate` is
/// overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuoteItem {
    /// Product, color and other free text.
    pub description: String,
    pub input: LineInput,
}

impl NewQuoteItem {
    pub fn new(description: impl Into<String>, input: LineInput) -> Self {
        NewQuoteItem {
            description: description.into(),
            input,
        }
    }
}

/// Retry policy for serial minting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialPolicy {
    /// Total attempts, at least 1.
    pub attempts: u32,
    /// Attempt `n` waits `n × backoff` before recomputing.
    pub backoff: Duration,
}

/// Optional criteria for [`QuotationRepository::search`]. Unset fields match
/// everything.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use quoter_core::QuotationStatus;
/// use quoter_db::QuotationFilter;
///
/// let march = QuotationFilter::new()
///     .status(QuotationStatus::Sent)
///     .created_from(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
///     .created_to(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
/// assert!(march.customer.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotationFilter {
    pub status: Option<QuotationStatus>,
    /// First creation day included (UTC).
    pub created_from: Option<NaiveDate>,
    /// Last creation day included (UTC).
    pub created_to: Option<NaiveDate>,
    /// Case-insensitive substring of the customer name.
    pub customer: Option<String>,
}

impl QuotationFilter {
    pub fn new() -> Self {
        QuotationFilter::default()
    }

    pub fn status(mut self, status: QuotationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_from(mut self, day: NaiveDate) -> Self {
        self.created_from = Some(day);
        self
    }

    pub fn created_to(mut self, day: NaiveDate) -> Self {
        self.created_to = Some(day);
        self
    }

    pub fn customer(mut self, fragment: impl Into<String>) -> Self {
        self.customer = Some(fragment.into());
        self
    }
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct QuotationRow {
    id: String,
    serial_number: String,
    customer_name: String,
    status: QuotationStatus,
    header_discount_type: DiscountType,
    header_discount_value: String,
    tax_rate: String,
    items_subtotal: String,
    total_item_discounts: String,
    header_discount_amount: String,
    discounted_subtotal: String,
    tax_amount: String,
    grand_total: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<QuotationRow> for Quotation {
    type Error = DbError;

    fn try_from(row: QuotationRow) -> DbResult<Self> {
        const E: &str = "quotation";

        let serial = Serial::parse(&row.serial_number).map_err(|_| DbError::Corrupt {
            entity: E,
            field: "serial_number",
            value: row.serial_number.clone(),
        })?;

        Ok(Quotation {
            id: row.id,
            serial,
            customer_name: row.customer_name,
            status: row.status,
            header_discount: Discount {
                kind: row.header_discount_type,
                value: stored_decimal(E, "header_discount_value", &row.header_discount_value)?,
            },
            tax_rate: stored_decimal(E, "tax_rate", &row.tax_rate)?,
            totals: QuotationTotals {
                items_subtotal: stored_decimal(E, "items_subtotal", &row.items_subtotal)?,
                total_item_discounts: stored_decimal(
                    E,
                    "total_item_discounts",
                    &row.total_item_discounts,
                )?,
                header_discount_amount: stored_decimal(
                    E,
                    "header_discount_amount",
                    &row.header_discount_amount,
                )?,
                discounted_subtotal: stored_decimal(
                    E,
                    "discounted_subtotal",
                    &row.discounted_subtotal,
                )?,
                tax_amount: stored_decimal(E, "tax_amount", &row.tax_amount)?,
                grand_total: stored_decimal(E, "grand_total", &row.grand_total)?,
            },
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    quotation_id: String,
    description: String,
    width: Option<String>,
    height: Option<String>,
    quantity: i64,
    unit_type: UnitType,
    base_unit_price: String,
    price_override: Option<String>,
    discount_type: DiscountType,
    discount_value: String,
    tax_rate: String,
    area: String,
    total_area: String,
    billable_quantity: String,
    unit_price: String,
    pre_discount_amount: String,
    discount_amount: String,
    line_total_ex_tax: String,
    tax_amount: String,
    line_total_inc_tax: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for QuoteItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> DbResult<Self> {
        const E: &str = "quote_item";

        let input = LineInput {
            width: stored_optional_decimal(E, "width", row.width.as_deref())?,
            height: stored_optional_decimal(E, "height", row.height.as_deref())?,
            quantity: row.quantity,
            unit_type: row.unit_type,
            base_unit_price: stored_decimal(E, "base_unit_price", &row.base_unit_price)?,
            price_override: stored_optional_decimal(
                E,
                "price_override",
                row.price_override.as_deref(),
            )?,
            discount: Discount {
                kind: row.discount_type,
                value: stored_decimal(E, "discount_value", &row.discount_value)?,
            },
            tax_rate: stored_decimal(E, "tax_rate", &row.tax_rate)?,
        };

        let result = LineResult {
            area: stored_decimal(E, "area", &row.area)?,
            total_area: stored_decimal(E, "total_area", &row.total_area)?,
            billable_quantity: stored_decimal(E, "billable_quantity", &row.billable_quantity)?,
            unit_price: stored_decimal(E, "unit_price", &row.unit_price)?,
            pre_discount_amount: stored_decimal(
                E,
                "pre_discount_amount",
                &row.pre_discount_amount,
            )?,
            discount_amount: stored_decimal(E, "discount_amount", &row.discount_amount)?,
            line_total_ex_tax: stored_decimal(E, "line_total_ex_tax", &row.line_total_ex_tax)?,
            tax_amount: stored_decimal(E, "tax_amount", &row.tax_amount)?,
            line_total_inc_tax: stored_decimal(E, "line_total_inc_tax", &row.line_total_inc_tax)?,
        };

        Ok(QuoteItem {
            id: row.id,
            quotation_id: row.quotation_id,
            description: row.description,
            input,
            result,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PricingHeaderRow {
    header_discount_type: DiscountType,
    header_discount_value: String,
    tax_rate: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for quotation database operations.
///
/// Serial uniqueness is this repository's job: the `UNIQUE` index on
/// `quotations.serial_number`, the in-process lock shared by every
/// repository of one [`crate::Database`], and a bounded retry for writers in
/// other processes.
#[derive(Debug, Clone)]
pub struct QuotationRepository {
    pool: SqlitePool,
    serial_lock: Arc<Mutex<()>>,
    serial_policy: SerialPolicy,
    default_tax_rate: Decimal,
}

impl QuotationRepository {
    /// Creates a new QuotationRepository.
    ///
    /// Prefer [`crate::Database::quotations`], which shares the serial lock.
    pub fn new(
        pool: SqlitePool,
        serial_lock: Arc<Mutex<()>>,
        serial_policy: SerialPolicy,
        default_tax_rate: Decimal,
    ) -> Self {
        QuotationRepository {
            pool,
            serial_lock,
            serial_policy,
            default_tax_rate,
        }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Creates a draft quotation with a freshly minted serial.
    ///
    /// ## Errors
    /// - [`DbError::Core`] for an invalid customer name, header discount,
    ///   tax rate or serial year, or when the year's serials are exhausted
    /// - [`DbError::SerialConflict`] when every attempt collided
    pub async fn create(&self, new: NewQuotation) -> DbResult<Quotation> {
        validate_customer_name(&new.customer_name).map_err(CoreError::from)?;
        new.header_discount.validate()?;
        let tax_rate = new.tax_rate.unwrap_or(self.default_tax_rate);
        validate_tax_rate(tax_rate)?;
        let year = new.serial_year.unwrap_or_else(|| Utc::now().year());

        let _guard = self.serial_lock.lock().await;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            match self.insert_with_next_serial(&new, tax_rate, year).await {
                Ok(quotation) => {
                    info!(
                        id = %quotation.id,
                        serial = %quotation.serial,
                        attempt,
                        "Quotation created"
                    );
                    return Ok(quotation);
                }
                Err(err) if err.is_serial_retryable() => {
                    if attempt >= self.serial_policy.attempts {
                        warn!(year, attempts = attempt, error = %err, "Giving up on serial allocation");
                        return Err(DbError::SerialConflict {
                            year,
                            attempts: attempt,
                        });
                    }
                    warn!(year, attempt, error = %err, "Serial collision, recomputing");
                    tokio::time::sleep(self.serial_policy.backoff * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn insert_with_next_serial(
        &self,
        new: &NewQuotation,
        tax_rate: Decimal,
        year: i32,
    ) -> DbResult<Quotation> {
        let mut tx = self.pool.begin().await?;

        let issued = issued_serials_in(&mut tx, year).await?;
        let allocation = next_serial(year, issued.iter().map(String::as_str))?;
        for anomaly in &allocation.anomalies {
            warn!(
                serial = %anomaly.serial,
                kind = ?anomaly.kind,
                "Malformed serial ranked during allocation"
            );
        }

        let now = Utc::now();
        let quotation = Quotation {
            id: Uuid::new_v4().to_string(),
            serial: allocation.serial,
            customer_name: new.customer_name.trim().to_string(),
            status: QuotationStatus::Draft,
            header_discount: new.header_discount,
            tax_rate,
            totals: compute_quotation_totals(&[], &new.header_discount, tax_rate)?,
            notes: new.notes.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        debug!(id = %quotation.id, serial = %quotation.serial, "Inserting quotation");

        let totals = &quotation.totals;
        sqlx::query(
            r#"
            INSERT INTO quotations (
                id, serial_number, customer_name, status,
                header_discount_type, header_discount_value, tax_rate,
                items_subtotal, total_item_discounts, header_discount_amount,
                discounted_subtotal, tax_amount, grand_total,
                notes, created_at, updated_at, deleted_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16, NULL
            )
            "#,
        )
        .bind(&quotation.id)
        .bind(quotation.serial.to_string())
        .bind(&quotation.customer_name)
        .bind(quotation.status)
        .bind(quotation.header_discount.kind)
        .bind(quotation.header_discount.value.to_string())
        .bind(quotation.tax_rate.to_string())
        .bind(totals.items_subtotal.to_string())
        .bind(totals.total_item_discounts.to_string())
        .bind(totals.header_discount_amount.to_string())
        .bind(totals.discounted_subtotal.to_string())
        .bind(totals.tax_amount.to_string())
        .bind(totals.grand_total.to_string())
        .bind(&quotation.notes)
        .bind(quotation.created_at)
        .bind(quotation.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(quotation)
    }

    // -------------------------------------------------------------------------
    // Read
    // -------------------------------------------------------------------------

    /// Gets a quotation by ID, including soft-deleted ones.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Quotation>> {
        let row: Option<QuotationRow> = sqlx::query_as(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotations WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Quotation::try_from).transpose()
    }

    /// Gets a quotation by serial, including soft-deleted ones.
    pub async fn get_by_serial(&self, serial: &Serial) -> DbResult<Option<Quotation>> {
        let row: Option<QuotationRow> = sqlx::query_as(&format!(
            "SELECT {QUOTATION_COLUMNS} FROM quotations WHERE serial_number = ?1"
        ))
        .bind(serial.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Quotation::try_from).transpose()
    }

    /// Lists live quotations, newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Quotation>> {
        let rows: Vec<QuotationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {QUOTATION_COLUMNS}
            FROM quotations
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC, serial_number DESC
            LIMIT ?1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Quotation::try_from).collect()
    }

    /// Lists live quotations matching `filter`, newest first.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let accepted = repo.search(&QuotationFilter::new().status(QuotationStatus::Accepted), 50).await?;
    /// ```
    pub async fn search(&self, filter: &QuotationFilter, limit: i64) -> DbResult<Vec<Quotation>> {
        let customer = filter
            .customer
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        debug!(?filter, limit, "Searching quotations");

        let rows: Vec<QuotationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {QUOTATION_COLUMNS}
            FROM quotations
            WHERE deleted_at IS NULL
            AND (?1 IS NULL OR status = ?1)
            AND (?2 IS NULL OR date(created_at) >= ?2)
            AND (?3 IS NULL OR date(created_at) <= ?3)
            AND (?4 IS NULL OR instr(lower(customer_name), lower(?4)) > 0)
            ORDER BY created_at DESC, serial_number DESC
            LIMIT ?5
            "#
        ))
        .bind(filter.status)
        .bind(filter.created_from)
        .bind(filter.created_to)
        .bind(customer)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Quotation::try_from).collect()
    }

    /// Counts live quotations.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quotations WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Every serial issued for `year`, soft-deleted quotations included, as
    /// stored (possibly malformed).
    pub async fn issued_serials(&self, year: i32) -> DbResult<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        issued_serials_in(&mut conn, year).await
    }

    /// Gets all items of a quotation, in insertion order.
    pub async fn items(&self, quotation_id: &str) -> DbResult<Vec<QuoteItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM quote_items WHERE quotation_id = ?1 ORDER BY position"
        ))
        .bind(quotation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuoteItem::try_from).collect()
    }

    // -------------------------------------------------------------------------
    // Update
    // -------------------------------------------------------------------------

    /// Prices a line, stores it and refreshes the quotation totals.
    ///
    /// ## Errors
    /// - [`DbError::NotFound`] for an unknown or soft-deleted quotation
    /// - [`DbError::Core`] when the line cannot be priced
    pub async fn add_item(&self, quotation_id: &str, item: NewQuoteItem) -> DbResult<QuoteItem> {
        validate_description(&item.description).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let header = pricing_header_in(&mut tx, quotation_id).await?;
        let tax_rate = stored_decimal("quotation", "tax_rate", &header.tax_rate)?;

        let input = LineInput {
            tax_rate,
            ..item.input
        };
        let result = compute_line(&input)?;

        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM quote_items WHERE quotation_id = ?1",
        )
        .bind(quotation_id)
        .fetch_one(&mut *tx)
        .await?;

        let quote_item = QuoteItem {
            id: Uuid::new_v4().to_string(),
            quotation_id: quotation_id.to_string(),
            description: item.description,
            input,
            result,
            created_at: Utc::now(),
        };

        debug!(
            quotation_id = %quotation_id,
            item_id = %quote_item.id,
            line_total = %quote_item.result.line_total_ex_tax,
            "Adding quote item"
        );

        let (input, result) = (&quote_item.input, &quote_item.result);
        sqlx::query(
            r#"
            INSERT INTO quote_items (
                id, quotation_id, position, description,
                width, height, quantity, unit_type, base_unit_price, price_override,
                discount_type, discount_value, tax_rate,
                area, total_area, billable_quantity, unit_price, pre_discount_amount,
                discount_amount, line_total_ex_tax, tax_amount, line_total_inc_tax,
                created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18,
                ?19, ?20, ?21, ?22,
                ?23
            )
            "#,
        )
        .bind(&quote_item.id)
        .bind(&quote_item.quotation_id)
        .bind(position)
        .bind(&quote_item.description)
        .bind(input.width.map(|d| d.to_string()))
        .bind(input.height.map(|d| d.to_string()))
        .bind(input.quantity)
        .bind(input.unit_type)
        .bind(input.base_unit_price.to_string())
        .bind(input.price_override.map(|d| d.to_string()))
        .bind(input.discount.kind)
        .bind(input.discount.value.to_string())
        .bind(input.tax_rate.to_string())
        .bind(result.area.to_string())
        .bind(result.total_area.to_string())
        .bind(result.billable_quantity.to_string())
        .bind(result.unit_price.to_string())
        .bind(result.pre_discount_amount.to_string())
        .bind(result.discount_amount.to_string())
        .bind(result.line_total_ex_tax.to_string())
        .bind(result.tax_amount.to_string())
        .bind(result.line_total_inc_tax.to_string())
        .bind(quote_item.created_at)
        .execute(&mut *tx)
        .await?;

        recompute_totals_in(&mut tx, quotation_id).await?;
        tx.commit().await?;

        Ok(quote_item)
    }

    /// Removes an item and refreshes the quotation totals.
    pub async fn remove_item(&self, item_id: &str) -> DbResult<QuotationTotals> {
        let mut tx = self.pool.begin().await?;

        let quotation_id: Option<String> =
            sqlx::query_scalar("SELECT quotation_id FROM quote_items WHERE id = ?1")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;
        let quotation_id = quotation_id.ok_or_else(|| DbError::not_found("QuoteItem", item_id))?;

        debug!(item_id = %item_id, quotation_id = %quotation_id, "Removing quote item");

        sqlx::query("DELETE FROM quote_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        let totals = recompute_totals_in(&mut tx, &quotation_id).await?;
        tx.commit().await?;

        Ok(totals)
    }

    /// Replaces the header discount and refreshes the totals.
    pub async fn set_header_discount(
        &self,
        id: &str,
        discount: Discount,
    ) -> DbResult<QuotationTotals> {
        discount.validate()?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE quotations SET
                header_discount_type = ?2,
                header_discount_value = ?3
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(discount.kind)
        .bind(discount.value.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Quotation", id));
        }

        let totals = recompute_totals_in(&mut tx, id).await?;
        tx.commit().await?;

        Ok(totals)
    }

    /// Recomputes the totals from the stored items and stores them.
    pub async fn recalculate_totals(&self, id: &str) -> DbResult<QuotationTotals> {
        let mut tx = self.pool.begin().await?;
        let totals = recompute_totals_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(totals)
    }

    /// Records a status label. No transitions are enforced.
    pub async fn update_status(&self, id: &str, status: QuotationStatus) -> DbResult<()> {
        debug!(id = %id, status = %status, "Updating quotation status");

        let result = sqlx::query(
            "UPDATE quotations SET status = ?2, updated_at = ?3 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Quotation", id));
        }

        Ok(())
    }

    /// Hides a quotation from [`list`](Self::list). Its serial is never
    /// reissued.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE quotations SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Quotation", id));
        }

        info!(id = %id, "Quotation soft-deleted");
        Ok(())
    }
}

// =============================================================================
// Connection-level helpers (run inside a caller's transaction)
// =============================================================================

async fn issued_serials_in(conn: &mut SqliteConnection, year: i32) -> DbResult<Vec<String>> {
    let serials: Vec<String> =
        sqlx::query_scalar("SELECT serial_number FROM quotations WHERE serial_number LIKE ?1")
            .bind(format!("{SERIAL_PREFIX}-{year}-%"))
            .fetch_all(&mut *conn)
            .await?;

    Ok(serials)
}

async fn pricing_header_in(
    conn: &mut SqliteConnection,
    quotation_id: &str,
) -> DbResult<PricingHeaderRow> {
    let header: Option<PricingHeaderRow> = sqlx::query_as(
        r#"
        SELECT header_discount_type, header_discount_value, tax_rate
        FROM quotations
        WHERE id = ?1 AND deleted_at IS NULL
        "#,
    )
    .bind(quotation_id)
    .fetch_optional(&mut *conn)
    .await?;

    header.ok_or_else(|| DbError::not_found("Quotation", quotation_id))
}

async fn recompute_totals_in(
    conn: &mut SqliteConnection,
    quotation_id: &str,
) -> DbResult<QuotationTotals> {
    let header = pricing_header_in(conn, quotation_id).await?;
    let discount = Discount {
        kind: header.header_discount_type,
        value: stored_decimal("quotation", "header_discount_value", &header.header_discount_value)?,
    };
    let tax_rate = stored_decimal("quotation", "tax_rate", &header.tax_rate)?;

    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT line_total_ex_tax, discount_amount FROM quote_items WHERE quotation_id = ?1",
    )
    .bind(quotation_id)
    .fetch_all(&mut *conn)
    .await?;

    let lines = rows
        .iter()
        .map(|(ex_tax, discount)| {
            Ok(QuotationLine::new(
                stored_decimal("quote_item", "line_total_ex_tax", ex_tax)?,
                stored_decimal("quote_item", "discount_amount", discount)?,
            ))
        })
        .collect::<DbResult<Vec<_>>>()?;

    let totals = compute_quotation_totals(&lines, &discount, tax_rate)?;

    sqlx::query(
        r#"
        UPDATE quotations SET
            items_subtotal = ?2,
            total_item_discounts = ?3,
            header_discount_amount = ?4,
            discounted_subtotal = ?5,
            tax_amount = ?6,
            grand_total = ?7,
            updated_at = ?8
        WHERE id = ?1
        "#,
    )
    .bind(quotation_id)
    .bind(totals.items_subtotal.to_string())
    .bind(totals.total_item_discounts.to_string())
    .bind(totals.header_discount_amount.to_string())
    .bind(totals.discounted_subtotal.to_string())
    .bind(totals.tax_amount.to_string())
    .bind(totals.grand_total.to_string())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    debug!(
        quotation_id = %quotation_id,
        lines = lines.len(),
        grand_total = %totals.grand_total,
        "Quotation totals recomputed"
    );

    Ok(totals)
}

// =============================================================================
// Unit Tests
// =============================================================================
