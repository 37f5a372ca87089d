//! Staff profile lifecycle
//!
//! HR records live independently of login accounts. The create-account path
//! reuses dormant accounts when the identity matches, keeping the
//! one-profile-one-actor invariant intact.

use shared::error::{AppError, ErrorCode};
use shared::models::staff::{StaffAccountCreate, StaffProfileCreate, StaffProfileUpdate};
use shared::models::{Actor, RolePreference, StaffProfile};
use sqlx::{PgPool, Postgres, Transaction};

use super::actors;
use crate::error::ServiceResult;

/// Email derived from a profile's phone number when no real address exists.
pub fn derived_email(phone_number: &str) -> String {
    let digits: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{digits}@phone.local")
}

pub async fn list(pool: &PgPool, branch_id: i64) -> ServiceResult<Vec<StaffProfile>> {
    Ok(
        sqlx::query_as("SELECT * FROM staff_profiles WHERE branch_id = $1 ORDER BY full_name")
            .bind(branch_id)
            .fetch_all(pool)
            .await?,
    )
}

pub async fn create(pool: &PgPool, data: &StaffProfileCreate) -> ServiceResult<StaffProfile> {
    Ok(sqlx::query_as(
        r#"
        INSERT INTO staff_profiles
            (full_name, phone_number, national_id, age, monthly_salary,
             role_preference, job_title, branch_id, hire_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, CURRENT_DATE))
        RETURNING *
        "#,
    )
    .bind(&data.full_name)
    .bind(&data.phone_number)
    .bind(&data.national_id)
    .bind(data.age)
    .bind(data.monthly_salary)
    .bind(data.role_preference)
    .bind(&data.job_title)
    .bind(data.branch_id)
    .bind(data.hire_date)
    .fetch_one(pool)
    .await?)
}

pub async fn update(
    pool: &PgPool,
    profile_id: i64,
    data: &StaffProfileUpdate,
) -> ServiceResult<StaffProfile> {
    let profile: Option<StaffProfile> = sqlx::query_as(
        r#"
        UPDATE staff_profiles SET
            full_name = COALESCE($2, full_name),
            phone_number = COALESCE($3, phone_number),
            national_id = COALESCE($4, national_id),
            age = COALESCE($5, age),
            monthly_salary = COALESCE($6, monthly_salary),
            role_preference = COALESCE($7, role_preference),
            job_title = COALESCE($8, job_title)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(profile_id)
    .bind(&data.full_name)
    .bind(&data.phone_number)
    .bind(&data.national_id)
    .bind(data.age)
    .bind(data.monthly_salary)
    .bind(data.role_preference)
    .bind(&data.job_title)
    .fetch_optional(pool)
    .await?;
    profile.ok_or_else(|| AppError::not_found("Staff profile").into())
}

/// Create (or reuse) a login account for a staff profile.
///
/// In one transaction: load the active profile, reject if already linked or
/// marked `role_preference = other`; search for a duplicate account by
/// username or phone-derived email. An active duplicate fails with
/// `ACCOUNT_ALREADY_EXISTS`; a dormant one not linked elsewhere is
/// reactivated in place with the new password hash; otherwise a fresh actor
/// is created. Branch access is granted and the profile linked.
pub async fn create_account(
    tx: &mut Transaction<'_, Postgres>,
    data: &StaffAccountCreate,
    password_hash: &str,
) -> ServiceResult<Actor> {
    let profile: Option<StaffProfile> =
        sqlx::query_as("SELECT * FROM staff_profiles WHERE id = $1 AND is_active FOR UPDATE")
            .bind(data.staff_profile_id)
            .fetch_optional(&mut **tx)
            .await?;
    let profile = profile.ok_or_else(|| AppError::not_found("Staff profile"))?;

    if profile.linked_actor_id.is_some() {
        return Err(AppError::new(ErrorCode::StaffAlreadyLinked)
            .with_detail("staff_profile_id", profile.id)
            .into());
    }
    if profile.role_preference == RolePreference::Other {
        return Err(AppError::validation(
            "Profile is not eligible for a login account",
        )
        .into());
    }

    let email = derived_email(&profile.phone_number);
    let duplicate = actors::find_duplicate(tx, &data.username, &email).await?;

    let actor = match duplicate {
        Some(existing) if existing.is_active => {
            return Err(AppError::new(ErrorCode::AccountAlreadyExists)
                .with_detail("username", existing.username)
                .into());
        }
        Some(existing) => {
            // Dormant duplicate: reusable only if no other profile claims it
            let linked_elsewhere: Option<(i64,)> = sqlx::query_as(
                "SELECT id FROM staff_profiles WHERE linked_actor_id = $1 AND id <> $2",
            )
            .bind(existing.id)
            .bind(profile.id)
            .fetch_optional(&mut **tx)
            .await?;

            if linked_elsewhere.is_some() {
                actors::create(
                    tx,
                    &data.username,
                    &email,
                    password_hash,
                    data.role,
                    data.branch_id,
                )
                .await?
            } else {
                actors::reactivate(
                    tx,
                    existing.id,
                    &data.username,
                    password_hash,
                    data.role,
                    data.branch_id,
                )
                .await?
            }
        }
        None => {
            actors::create(
                tx,
                &data.username,
                &email,
                password_hash,
                data.role,
                data.branch_id,
            )
            .await?
        }
    };

    actors::upsert_branch_access(tx, actor.id, data.branch_id).await?;

    sqlx::query("UPDATE staff_profiles SET linked_actor_id = $2 WHERE id = $1")
        .bind(profile.id)
        .bind(actor.id)
        .execute(&mut **tx)
        .await?;

    Ok(actor)
}

/// Unlink whatever profile points at this actor (account archival path).
pub async fn unlink_actor(
    tx: &mut Transaction<'_, Postgres>,
    actor_id: i64,
) -> ServiceResult<()> {
    sqlx::query("UPDATE staff_profiles SET linked_actor_id = NULL WHERE linked_actor_id = $1")
        .bind(actor_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Archive a profile. Fails while the profile is linked to an active
/// actor — the account must be archived first.
pub async fn archive_profile(
    tx: &mut Transaction<'_, Postgres>,
    profile_id: i64,
) -> ServiceResult<StaffProfile> {
    let linked_active: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT a.id FROM staff_profiles p
        JOIN actors a ON a.id = p.linked_actor_id
        WHERE p.id = $1 AND a.is_active
        "#,
    )
    .bind(profile_id)
    .fetch_optional(&mut **tx)
    .await?;
    if linked_active.is_some() {
        return Err(AppError::with_message(
            ErrorCode::StaffAlreadyLinked,
            "Archive the linked account before archiving the profile",
        )
        .into());
    }

    let profile: Option<StaffProfile> = sqlx::query_as(
        r#"
        UPDATE staff_profiles
        SET is_active = FALSE, termination_date = CURRENT_DATE, linked_actor_id = NULL
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(profile_id)
    .fetch_optional(&mut **tx)
    .await?;
    profile.ok_or_else(|| AppError::not_found("Staff profile").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_email_strips_non_digits() {
        assert_eq!(derived_email("+251 911-223344"), "251911223344@phone.local");
        assert_eq!(derived_email("0911 22 33 44"), "0911223344@phone.local");
    }
}
