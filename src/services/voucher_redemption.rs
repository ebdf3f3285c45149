use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::middleware::auth::AuthContext;
use crate::error::{AppError, Result};
use crate::models::usage_event::UsageEvent;
use crate::models::voucher::Voucher;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordUsageData {
    /// Defaults to today.
    pub used_on: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoucherUsage {
    pub voucher: Voucher,
    pub event: UsageEvent,
}

/// Redeems one credit and records the usage event in the same transaction.
/// A credit consumed without its event, or the reverse, is an invariant
/// violation, so any failure rolls both back.
///
/// The voucher row is locked for the duration and the decrement itself is
/// guarded on remaining credits, so concurrent redemptions of the same
/// voucher serialize and the loser gets `NoCreditsRemaining`.
pub async fn record_usage(
    pool: &PgPool,
    ctx: &AuthContext,
    voucher_id: Uuid,
    data: RecordUsageData,
) -> Result<VoucherUsage> {
    ctx.require_staff()?;

    let mut tx = pool.begin().await?;

    let voucher = Voucher::lock_by_id(&mut tx, voucher_id)
        .await?
        .ok_or(AppError::NotFound("voucher"))?;

    if voucher.remaining_credits <= 0 {
        return Err(AppError::NoCreditsRemaining);
    }
    if !voucher.is_active {
        return Err(AppError::VoucherInactive);
    }

    let voucher = Voucher::consume_credit(&mut tx, voucher_id)
        .await?
        .ok_or(AppError::NoCreditsRemaining)?;

    let event = UsageEvent::create(&mut *tx, voucher_id, data.used_on, data.description).await?;

    tx.commit().await?;

    tracing::info!(
        voucher_id = %voucher.id,
        remaining_credits = voucher.remaining_credits,
        "voucher credit redeemed"
    );

    Ok(VoucherUsage { voucher, event })
}

/// Front-desk quick use: one credit, today's date, a canned description.
pub async fn redeem(pool: &PgPool, ctx: &AuthContext, voucher_id: Uuid) -> Result<VoucherUsage> {
    record_usage(
        pool,
        ctx,
        voucher_id,
        RecordUsageData {
            used_on: None,
            description: Some("Quick use".to_string()),
        },
    )
    .await
}
