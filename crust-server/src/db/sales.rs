//! Sale write path
//!
//! Sales are created-and-committed atomically; no edit, only void. Receipt
//! numbers are `R` + `YYYYMMDD` + a 6-digit per-day sequence allocated from
//! an upserted counter; the unique constraint on `receipt_number` is the
//! final arbiter, with a bounded retry on collision.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::sale::{SaleCreate, SaleReceipt};
use shared::models::{MovementType, Sale, SaleItem, StockSource};
use sqlx::{PgPool, Postgres, Transaction};

use super::ledger::{self, Movement};
use crate::error::ServiceResult;

/// Attempts at inserting a sale before a receipt collision surfaces.
const RECEIPT_MAX_ATTEMPTS: u32 = 3;

/// Format a receipt number: `R` + `YYYYMMDD` + zero-padded 6-digit sequence.
pub fn format_receipt_number(day: NaiveDate, seq: i32) -> String {
    format!("R{}{:06}", day.format("%Y%m%d"), seq)
}

/// Allocate the next per-day sequence. The upsert-increment is atomic under
/// concurrent sales; the row lock it takes is released at commit.
async fn next_receipt_seq(tx: &mut Transaction<'_, Postgres>, day: NaiveDate) -> ServiceResult<i32> {
    let (seq,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO receipt_counters (day, last_seq)
        VALUES ($1, 1)
        ON CONFLICT (day)
        DO UPDATE SET last_seq = receipt_counters.last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(day)
    .fetch_one(&mut **tx)
    .await?;
    Ok(seq)
}

fn is_receipt_collision(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.constraint() == Some("sales_receipt_number_key")
    )
}

/// Resolved catalog line for one sale item
struct PricedLine {
    product_id: i64,
    quantity: i32,
    unit_price: Decimal,
    source: StockSource,
}

/// Commit a sale: resolve prices, deduct stock through the ledger, insert
/// the sale and its items. KPI events and alert evaluation happen in the
/// handler, inside the same transaction.
pub async fn create(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    cashier_actor_id: i64,
    payload: &SaleCreate,
    is_offline: bool,
) -> ServiceResult<SaleReceipt> {
    if payload.items.is_empty() {
        return Err(AppError::validation("Sale needs at least one item").into());
    }

    // 1. Resolve each product's current price; reject unknown or inactive.
    let mut lines = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        if item.quantity < 1 {
            return Err(AppError::validation("Sale item quantity must be at least 1")
                .with_detail("product_id", item.product_id)
                .into());
        }
        let row: Option<(Decimal, bool, StockSource)> = sqlx::query_as(
            r#"
            SELECT p.price, p.is_active, COALESCE(s.source, 'baked')
            FROM products p
            LEFT JOIN stock_levels s
                ON s.product_id = p.id AND s.branch_id = $2
            WHERE p.id = $1
            "#,
        )
        .bind(item.product_id)
        .bind(branch_id)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some((price, true, source)) => lines.push(PricedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: price,
                source,
            }),
            _ => {
                return Err(AppError::new(ErrorCode::ProductUnavailable)
                    .with_detail("product_id", item.product_id)
                    .into());
            }
        }
    }

    // 2. Total at currency precision.
    let total_amount: Decimal = lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum::<Decimal>()
        .round_dp(2);

    // 3. Insert the sale under a fresh receipt number, retrying collisions.
    // A stock failure below rolls the header (and the consumed sequence)
    // back with everything else.
    let day = Utc::now().date_naive();
    let mut attempt = 0u32;
    let sale: Sale = loop {
        let seq = next_receipt_seq(tx, day).await?;
        let receipt_number = format_receipt_number(day, seq);
        let inserted: Result<Sale, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO sales
                (branch_id, cashier_actor_id, total_amount, payment_method,
                 is_offline, receipt_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(branch_id)
        .bind(cashier_actor_id)
        .bind(total_amount)
        .bind(payload.payment_method)
        .bind(is_offline)
        .bind(&receipt_number)
        .fetch_one(&mut **tx)
        .await;

        match inserted {
            Ok(sale) => break sale,
            Err(e) if is_receipt_collision(&e) && attempt + 1 < RECEIPT_MAX_ATTEMPTS => {
                attempt += 1;
                tracing::warn!(%receipt_number, attempt, "Receipt number collision, retrying");
            }
            Err(e) if is_receipt_collision(&e) => {
                return Err(AppError::new(ErrorCode::ReceiptCollision).into());
            }
            Err(e) => return Err(e.into()),
        }
    };

    // 4. Deduct stock; the ledger enforces non-negative results.
    let movements: Vec<Movement> = lines
        .iter()
        .map(|line| Movement {
            branch_id,
            product_id: line.product_id,
            movement_type: MovementType::SaleOut,
            quantity_change: -line.quantity,
            source: line.source,
            reference_type: "sale",
            reference_id: Some(sale.id),
            actor_id: cashier_actor_id,
            metadata: None,
        })
        .collect();
    ledger::apply_movements(tx, &movements).await?;

    // 5. Insert the sale items.
    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let subtotal = (line.unit_price * Decimal::from(line.quantity)).round_dp(2);
        let item: SaleItem = sqlx::query_as(
            r#"
            INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(sale.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(subtotal)
        .fetch_one(&mut **tx)
        .await?;
        items.push(item);
    }

    Ok(SaleReceipt {
        id: sale.id,
        receipt_number: sale.receipt_number,
        total_amount: sale.total_amount,
        items,
    })
}

/// Load a sale, locking the row against a concurrent void.
pub async fn get_for_update(
    tx: &mut Transaction<'_, Postgres>,
    sale_id: i64,
) -> ServiceResult<Sale> {
    let sale: Option<Sale> = sqlx::query_as("SELECT * FROM sales WHERE id = $1 FOR UPDATE")
        .bind(sale_id)
        .fetch_optional(&mut **tx)
        .await?;
    sale.ok_or_else(|| AppError::not_found("Sale").into())
}

/// Void a sale: restore every line's stock with a compensating movement.
pub async fn void(
    tx: &mut Transaction<'_, Postgres>,
    sale: &Sale,
    actor_id: i64,
) -> ServiceResult<Sale> {
    if sale.is_voided {
        return Err(AppError::new(ErrorCode::SaleAlreadyVoided).into());
    }

    // Compensate the sale's own ledger rows exactly, source included.
    let originals: Vec<(i64, i32, StockSource)> = sqlx::query_as(
        r#"
        SELECT product_id, quantity_change, source FROM inventory_movements
        WHERE reference_type = 'sale' AND reference_id = $1 AND movement_type = 'sale_out'
        "#,
    )
    .bind(sale.id)
    .fetch_all(&mut **tx)
    .await?;

    let movements: Vec<Movement> = originals
        .iter()
        .map(|&(product_id, quantity_change, source)| Movement {
            branch_id: sale.branch_id,
            product_id,
            movement_type: MovementType::VoidOut,
            quantity_change: -quantity_change,
            source,
            reference_type: "sale",
            reference_id: Some(sale.id),
            actor_id,
            metadata: None,
        })
        .collect();
    ledger::apply_movements(tx, &movements).await?;

    let voided: Sale =
        sqlx::query_as("UPDATE sales SET is_voided = TRUE WHERE id = $1 RETURNING *")
            .bind(sale.id)
            .fetch_one(&mut **tx)
            .await?;
    Ok(voided)
}

pub async fn get(pool: &PgPool, sale_id: i64) -> ServiceResult<Sale> {
    let sale: Option<Sale> = sqlx::query_as("SELECT * FROM sales WHERE id = $1")
        .bind(sale_id)
        .fetch_optional(pool)
        .await?;
    sale.ok_or_else(|| AppError::not_found("Sale").into())
}

/// Items of one sale.
pub async fn items(pool: &PgPool, sale_id: i64) -> ServiceResult<Vec<SaleItem>> {
    Ok(
        sqlx::query_as("SELECT * FROM sale_items WHERE sale_id = $1 ORDER BY id")
            .bind(sale_id)
            .fetch_all(pool)
            .await?,
    )
}

/// List sales for a branch, newest first.
pub async fn list(pool: &PgPool, branch_id: i64, limit: i64) -> ServiceResult<Vec<Sale>> {
    Ok(sqlx::query_as(
        "SELECT * FROM sales WHERE branch_id = $1 ORDER BY sale_date DESC LIMIT $2",
    )
    .bind(branch_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_format() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(format_receipt_number(day, 1), "R20240101000001");
        assert_eq!(format_receipt_number(day, 999999), "R20240101999999");
    }

    #[test]
    fn test_receipt_format_pads_month_and_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(format_receipt_number(day, 42), "R20260307000042");
    }
}
