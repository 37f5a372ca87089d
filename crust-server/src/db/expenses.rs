//! Branch expenses

use shared::error::AppError;
use shared::models::Expense;
use shared::models::finance::{ExpenseCreate, ExpenseUpdate};
use sqlx::PgPool;

use crate::error::ServiceResult;

pub async fn list(pool: &PgPool, branch_id: i64, limit: i64) -> ServiceResult<Vec<Expense>> {
    Ok(sqlx::query_as(
        "SELECT * FROM expenses WHERE branch_id = $1 ORDER BY expense_date DESC, id DESC LIMIT $2",
    )
    .bind(branch_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn create(
    pool: &PgPool,
    branch_id: i64,
    actor_id: i64,
    data: &ExpenseCreate,
) -> ServiceResult<Expense> {
    Ok(sqlx::query_as(
        r#"
        INSERT INTO expenses (branch_id, amount, expense_date, category, description, created_by_actor_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(branch_id)
    .bind(data.amount)
    .bind(data.expense_date)
    .bind(&data.category)
    .bind(&data.description)
    .bind(actor_id)
    .fetch_one(pool)
    .await?)
}

pub async fn update(
    pool: &PgPool,
    branch_id: i64,
    expense_id: i64,
    data: &ExpenseUpdate,
) -> ServiceResult<Expense> {
    let expense: Option<Expense> = sqlx::query_as(
        r#"
        UPDATE expenses SET
            amount = COALESCE($3, amount),
            expense_date = COALESCE($4, expense_date),
            category = COALESCE($5, category),
            description = COALESCE($6, description)
        WHERE id = $1 AND branch_id = $2
        RETURNING *
        "#,
    )
    .bind(expense_id)
    .bind(branch_id)
    .bind(data.amount)
    .bind(data.expense_date)
    .bind(&data.category)
    .bind(&data.description)
    .fetch_optional(pool)
    .await?;
    expense.ok_or_else(|| AppError::not_found("Expense").into())
}

pub async fn delete(pool: &PgPool, branch_id: i64, expense_id: i64) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND branch_id = $2")
        .bind(expense_id)
        .bind(branch_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Expense").into());
    }
    Ok(())
}
