use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::middleware::auth::AuthContext;
use crate::error::{AppError, Result};
use crate::models::customer::Customer;
use crate::models::membership::{
    Membership, MembershipTier, NewMembership, UpdateMembershipData,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMembershipData {
    pub customer_id: Uuid,
    pub tier: MembershipTier,
    /// Assigned automatically when absent.
    pub membership_number: Option<String>,
    /// Defaults to today.
    pub signed_up_on: Option<NaiveDate>,
    /// Defaults to one year after the signup date.
    pub expires_on: Option<NaiveDate>,
    pub locker_number: Option<i32>,
    pub board_slot_number: Option<i32>,
    /// Defaults from the tier price table.
    pub annual_price: Option<Decimal>,
}

/// Next membership number: previous maximum plus one, zero-padded to four
/// digits. Falls back to "0001" when there is no prior record or the previous
/// value is not numeric.
pub fn next_membership_number(latest: Option<&str>) -> String {
    match latest.and_then(|n| n.parse::<u32>().ok()) {
        Some(n) => format!("{:04}", n + 1),
        None => "0001".to_string(),
    }
}

/// Signs a customer up as a member. Number assignment, price defaulting and
/// the uniqueness checks all run inside one transaction; the schema's unique
/// constraints backstop concurrent creations.
pub async fn create_membership(
    pool: &PgPool,
    ctx: &AuthContext,
    data: CreateMembershipData,
) -> Result<Membership> {
    ctx.require_staff()?;

    if !data.tier.allows_board_storage() && data.board_slot_number.is_some() {
        return Err(AppError::InvalidTierConstraint);
    }

    Customer::find_by_id(pool, data.customer_id)
        .await?
        .ok_or(AppError::NotFound("customer"))?;

    let mut tx = pool.begin().await?;

    let membership_number = match data.membership_number {
        Some(number) => {
            if Membership::number_in_use(&mut tx, &number, None).await? {
                return Err(AppError::Duplicate {
                    field: "membership_number",
                });
            }
            number
        }
        None => {
            let latest = Membership::latest_number(&mut tx).await?;
            next_membership_number(latest.as_deref())
        }
    };

    if let Some(locker) = data.locker_number {
        if Membership::locker_in_use(&mut tx, locker, None).await? {
            return Err(AppError::Duplicate {
                field: "locker_number",
            });
        }
    }
    if let Some(slot) = data.board_slot_number {
        if Membership::board_slot_in_use(&mut tx, slot, None).await? {
            return Err(AppError::Duplicate {
                field: "board_slot_number",
            });
        }
    }

    let signed_up_on = data.signed_up_on.unwrap_or_else(|| Utc::now().date_naive());
    let expires_on = data
        .expires_on
        .unwrap_or_else(|| Membership::renewed_expiry(signed_up_on));
    let annual_price = data.annual_price.unwrap_or_else(|| data.tier.annual_price());

    let membership = Membership::insert(
        &mut tx,
        NewMembership {
            customer_id: data.customer_id,
            tier: data.tier,
            membership_number,
            signed_up_on,
            expires_on,
            locker_number: data.locker_number,
            board_slot_number: data.board_slot_number,
            annual_price,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        membership_id = %membership.id,
        membership_number = %membership.membership_number,
        tier = ?membership.tier,
        "membership created"
    );

    Ok(membership)
}

/// Staff edit of an existing membership. Runs the same validation set as
/// creation, excluding the record under edit from the uniqueness checks.
pub async fn update_membership(
    pool: &PgPool,
    ctx: &AuthContext,
    id: Uuid,
    data: UpdateMembershipData,
) -> Result<Membership> {
    ctx.require_staff()?;

    if !data.tier.allows_board_storage() && data.board_slot_number.is_some() {
        return Err(AppError::InvalidTierConstraint);
    }

    let mut conn = pool.acquire().await?;

    if Membership::number_in_use(&mut conn, &data.membership_number, Some(id)).await? {
        return Err(AppError::Duplicate {
            field: "membership_number",
        });
    }
    if let Some(locker) = data.locker_number {
        if Membership::locker_in_use(&mut conn, locker, Some(id)).await? {
            return Err(AppError::Duplicate {
                field: "locker_number",
            });
        }
    }
    if let Some(slot) = data.board_slot_number {
        if Membership::board_slot_in_use(&mut conn, slot, Some(id)).await? {
            return Err(AppError::Duplicate {
                field: "board_slot_number",
            });
        }
    }
    drop(conn);

    let membership = Membership::update(pool, id, &data)
        .await?
        .ok_or(AppError::NotFound("membership"))?;

    tracing::info!(membership_id = %membership.id, "membership updated");

    Ok(membership)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_number_is_0001() {
        assert_eq!(next_membership_number(None), "0001");
    }

    #[test]
    fn test_numbers_increment_from_the_maximum() {
        assert_eq!(next_membership_number(Some("0003")), "0004");
        assert_eq!(next_membership_number(Some("0009")), "0010");
        assert_eq!(next_membership_number(Some("0099")), "0100");
    }

    #[test]
    fn test_non_numeric_previous_number_falls_back() {
        assert_eq!(next_membership_number(Some("A-17")), "0001");
        assert_eq!(next_membership_number(Some("")), "0001");
    }

    #[test]
    fn test_numbers_past_four_digits_keep_growing() {
        assert_eq!(next_membership_number(Some("9999")), "10000");
    }
}
