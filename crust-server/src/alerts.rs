//! Rule-triggered notifications from domain events
//!
//! Evaluation is synchronous and in-transaction: it runs right after the
//! domain event inside the handler's transaction, and a failed notification
//! insert fails the event with it.

use rust_decimal::Decimal;
use shared::models::kpi::event_types;
use sqlx::{Postgres, Transaction};

use crate::db::{actors, ledger, notifications};
use crate::error::ServiceResult;

/// Evaluate `high_sale` rules against a committed sale total.
pub async fn evaluate_high_sale(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    total_amount: Decimal,
    receipt_number: &str,
) -> ServiceResult<()> {
    let rules = notifications::matching_rules(tx, branch_id, event_types::HIGH_SALE).await?;
    let Some(rule) = rules.iter().find(|r| total_amount >= r.threshold) else {
        return Ok(());
    };

    let recipients = actors::branch_admins_and_managers(tx, branch_id).await?;
    let message = format!(
        "Sale {receipt_number} totalled {total_amount}, at or above the {} threshold",
        rule.threshold
    );
    for recipient in recipients {
        notifications::insert(&mut **tx, recipient, branch_id, "High sale", &message, "high_sale")
            .await?;
    }
    Ok(())
}

/// Evaluate `low_stock` rules against post-movement stock for the given
/// products.
pub async fn evaluate_low_stock(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    product_ids: &[i64],
) -> ServiceResult<()> {
    let rules = notifications::matching_rules(tx, branch_id, event_types::LOW_STOCK).await?;
    if rules.is_empty() {
        return Ok(());
    }

    let mut recipients: Option<Vec<i64>> = None;
    for &product_id in product_ids {
        let quantity = ledger::stock_quantity(tx, branch_id, product_id).await?;
        let Some(rule) = rules
            .iter()
            .find(|r| Decimal::from(quantity) <= r.threshold)
        else {
            continue;
        };

        let name: Option<(String,)> = sqlx::query_as("SELECT name FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut **tx)
            .await?;
        let name = name.map(|(n,)| n).unwrap_or_else(|| format!("#{product_id}"));

        let message = format!(
            "Stock for {name} is down to {quantity} (threshold {})",
            rule.threshold
        );
        let to = match &recipients {
            Some(r) => r.clone(),
            None => {
                let r = actors::branch_admins_and_managers(tx, branch_id).await?;
                recipients = Some(r.clone());
                r
            }
        };
        for recipient in to {
            notifications::insert(&mut **tx, recipient, branch_id, "Low stock", &message, "low_stock")
                .await?;
        }
    }
    Ok(())
}
