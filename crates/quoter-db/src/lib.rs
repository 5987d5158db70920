//! # quoter-db: Database Layer for Curtain Quoter
//!
//! This crate provides database access for Curtain Quoter.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Curtain Quoter Data Flow                           │
//! │                                                                         │
//! │  Caller (quote form, seed tool)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    quoter-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ QuotationRepo  │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ PaymentRepo    │    │              │  │   │
//! │  │   │ serial_lock   │    │                │    │              │  │   │
//! │  │   └───────────────┘    └───────┬────────┘    └──────────────┘  │   │
//! │  │                                │ pricing, totals, next_serial  │   │
//! │  │                                ▼                                │   │
//! │  │                         quoter-core                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                 $QUOTER_DB_PATH (./quoter.db)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment-driven configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (quotation, payment)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quoter_db::{Database, NewQuotation, NewQuoteItem, QuoterConfig};
//!
//! let db = Database::new(QuoterConfig::from_env()?.db_config()).await?;
//!
//! let quote = db.quotations().create(NewQuotation::new("Al Noor Interiors")).await?;
//! db.quotations().add_item(&quote.id, NewQuoteItem::new("Blackout", input)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, QuoterConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::payment::{NewPayment, PaymentRepository};
pub use repository::quotation::{
    NewQuotation, NewQuoteItem, QuotationFilter, QuotationRepository, SerialPolicy,
};
