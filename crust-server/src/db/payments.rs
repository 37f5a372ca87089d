//! Staff payroll payments

use shared::error::AppError;
use shared::models::StaffPayment;
use shared::models::finance::StaffPaymentCreate;
use sqlx::PgPool;

use crate::error::ServiceResult;

pub async fn list(pool: &PgPool, branch_id: i64, limit: i64) -> ServiceResult<Vec<StaffPayment>> {
    Ok(sqlx::query_as(
        "SELECT * FROM staff_payments WHERE branch_id = $1 ORDER BY payment_date DESC, id DESC LIMIT $2",
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
    data: &StaffPaymentCreate,
) -> ServiceResult<StaffPayment> {
    Ok(sqlx::query_as(
        r#"
        INSERT INTO staff_payments
            (branch_id, staff_profile_id, amount, payment_date, payment_type, notes, created_by_actor_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(branch_id)
    .bind(data.staff_profile_id)
    .bind(data.amount)
    .bind(data.payment_date)
    .bind(&data.payment_type)
    .bind(&data.notes)
    .bind(actor_id)
    .fetch_one(pool)
    .await?)
}

pub async fn delete(pool: &PgPool, branch_id: i64, payment_id: i64) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM staff_payments WHERE id = $1 AND branch_id = $2")
        .bind(payment_id)
        .bind(branch_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Staff payment").into());
    }
    Ok(())
}
