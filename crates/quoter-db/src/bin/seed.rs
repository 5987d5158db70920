//! # Seed Data Generator
//!
//! Populates the database with demo quotations for development.
//!
//! ## Usage
//! ```bash
//! # Generate 25 quotations (default) in $QUOTER_DB_PATH
//! cargo run -p quoter-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p quoter-db --bin seed -- --count 200
//!
//! # Specify database path and serial year
//! cargo run -p quoter-db --bin seed -- --db ./data/quoter.db --year 2025
//! ```
//!
//! ## Generated Quotations
//! Each quotation gets 1-4 lines drawn from a small curtain catalog
//! covering every unit-pricing mode, an occasional header discount, a
//! rotating status and, for accepted ones, a deposit payment.

use std::env;

use chrono::{Datelike, NaiveDate, Utc};
use quoter_core::rounding::round_money;
use quoter_core::{Discount, LineInput, PaymentMethod, QuotationStatus, UnitType};
use quoter_db::{Database, NewPayment, NewQuotation, NewQuoteItem, QuoterConfig};
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (description, unit type, base price in halalas)
const CATALOG: &[(&str, UnitType, i64)] = &[
    ("Blackout curtain, beige", UnitType::Area, 15000),
    ("Sheer voile, white", UnitType::Area, 8500),
    ("Roller blind, grey", UnitType::Area, 12000),
    ("Aluminium rail", UnitType::Width, 4500),
    ("Wave track, motorized", UnitType::Width, 32000),
    ("Pleated drop", UnitType::Length, 6000),
    ("Tie-back hooks", UnitType::Pieces, 2500),
    ("Installation visit", UnitType::Pieces, 15000),
];

const CUSTOMERS: &[&str] = &[
    "Al Noor Interiors",
    "Hotel Rawdah",
    "Sara Al-Qahtani",
    "Green Valley Clinic",
    "Omar Haddad",
    "Desert Rose Apartments",
    "Lina Farouk",
    "Blue Palm Offices",
];

const STATUSES: &[QuotationStatus] = &[
    QuotationStatus::Draft,
    QuotationStatus::Sent,
    QuotationStatus::Accepted,
    QuotationStatus::Lost,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = QuoterConfig::from_env()?;

    let args: Vec<String> = env::args().collect();
    let mut count: usize = 25;
    let mut db_path = config.database_path.clone();
    let mut year = Utc::now().year();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--year" | "-y" => {
                if i + 1 < args.len() {
                    year = args[i + 1].parse().unwrap_or(year);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Curtain Quoter Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of quotations to generate (default: 25)");
                println!("  -d, --db <PATH>      Database file path (default: $QUOTER_DB_PATH or ./quoter.db)");
                println!("  -y, --year <YYYY>    Serial year (default: current year)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(db = %db_path.display(), count, year, "Seeding quotations");

    let db = Database::new(QuoterConfig {
        database_path: db_path,
        ..config
    }
    .db_config())
    .await?;

    let existing = db.quotations().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has quotations; new ones get the next serials");
    }

    let start = std::time::Instant::now();
    let mut created = 0;

    for n in 0..count {
        match seed_quotation(&db, n, year).await {
            Ok(serial) => {
                created += 1;
                if created % 10 == 0 {
                    info!(created, last = %serial, "Progress");
                }
            }
            Err(e) => warn!(index = n, error = %e, "Failed to seed quotation"),
        }
    }

    info!(created, elapsed = ?start.elapsed(), "Seed complete");

    let recent = db.quotations().list(5).await?;
    for quote in recent {
        info!(
            serial = %quote.serial,
            customer = %quote.customer_name,
            status = %quote.status,
            grand_total = %quote.totals.grand_total,
            "Recent quotation"
        );
    }

    db.close().await;
    Ok(())
}

/// Creates one quotation with lines, status and payments. Deterministic in `n`.
async fn seed_quotation(
    db: &Database,
    n: usize,
    year: i32,
) -> Result<String, Box<dyn std::error::Error>> {
    let header_discount = if n % 4 == 3 {
        Discount::percent(Decimal::from(5 + (n % 3) as i64 * 5))
    } else {
        Discount::none()
    };

    let quote = db
        .quotations()
        .create(
            NewQuotation::new(CUSTOMERS[n % CUSTOMERS.len()])
                .header_discount(header_discount)
                .serial_year(year),
        )
        .await?;

    let lines = 1 + n % 4;
    for k in 0..lines {
        let (description, unit_type, price) = CATALOG[(n * 3 + k) % CATALOG.len()];
        let seed = (n * 7 + k * 13) as i64;

        // 1.20 m - 3.19 m wide, 2.10 m - 2.89 m drop
        let width = Decimal::new(120 + seed % 200, 2);
        let height = Decimal::new(210 + seed % 80, 2);

        let mut input = LineInput::new(unit_type, Decimal::new(price, 2))
            .dimensions(width, height)
            .quantity(1 + seed % 3);
        if k == 1 {
            input = input.discount(Discount::fixed(Decimal::new(2500, 2)));
        }

        db.quotations()
            .add_item(&quote.id, NewQuoteItem::new(description, input))
            .await?;
    }

    let status = STATUSES[n % STATUSES.len()];
    if status != QuotationStatus::Draft {
        db.quotations().update_status(&quote.id, status).await?;
    }

    if status == QuotationStatus::Accepted {
        let summary = db.payments().summary(&quote.id).await?;
        let deposit = round_money(summary.grand_total / Decimal::from(2));
        if deposit > Decimal::ZERO {
            let paid_on = NaiveDate::from_ymd_opt(year, 1 + (n % 12) as u32, 1 + (n % 28) as u32)
                .unwrap_or_else(|| Utc::now().date_naive());
            db.payments()
                .add(
                    &quote.id,
                    NewPayment::new(deposit, PaymentMethod::Transfer, paid_on)
                        .reference(format!("DEP-{}", quote.serial)),
                )
                .await?;
        }
    }

    Ok(quote.serial.to_string())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=quoter_db=trace` - Show trace for the database crate only
/// - Default: INFO, DEBUG for quoter crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,quoter=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
