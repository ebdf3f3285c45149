use sqlx::PgPool;

use crate::models::voucher::Voucher;

/// Nightly sweep that deactivates vouchers past their expiry timestamp.
/// Credits are not touched; the voucher just stops being redeemable.
pub async fn expire_overdue_vouchers(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let expired = Voucher::deactivate_expired(pool).await?;

    if expired > 0 {
        tracing::info!(expired, "deactivated expired vouchers");
    } else {
        tracing::debug!("no vouchers due for expiry");
    }

    Ok(expired)
}
