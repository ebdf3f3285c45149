use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// The credit bundles sold at the front desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
#[serde(try_from = "i32", into = "i32")]
pub enum VoucherKind {
    Ten = 10,
    Twenty = 20,
    Thirty = 30,
}

impl VoucherKind {
    pub fn credits(self) -> i32 {
        self as i32
    }
}

impl From<VoucherKind> for i32 {
    fn from(kind: VoucherKind) -> i32 {
        kind as i32
    }
}

impl TryFrom<i32> for VoucherKind {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(VoucherKind::Ten),
            20 => Ok(VoucherKind::Twenty),
            30 => Ok(VoucherKind::Thirty),
            other => Err(format!("unknown voucher kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Voucher {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub kind: VoucherKind,
    pub total_credits: i32,
    pub remaining_credits: i32,
    pub is_active: bool,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVoucherData {
    pub customer_id: Uuid,
    pub kind: VoucherKind,
    pub price: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVoucherData {
    pub price: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Voucher {
    pub fn used_count(&self) -> i32 {
        self.total_credits - self.remaining_credits
    }

    pub fn usage_percentage(&self) -> f64 {
        if self.total_credits > 0 {
            f64::from(self.used_count()) / f64::from(self.total_credits) * 100.0
        } else {
            0.0
        }
    }

    /// Creates a voucher with both credit counters set from the chosen kind.
    /// total_credits never changes after this point.
    pub async fn create(pool: &PgPool, data: CreateVoucherData) -> Result<Self, sqlx::Error> {
        let voucher = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO vouchers (customer_id, kind, total_credits, remaining_credits, price, expires_at)
            VALUES ($1, $2, $3, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.customer_id)
        .bind(data.kind)
        .bind(data.kind.credits())
        .bind(data.price)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(voucher)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let voucher = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM vouchers WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(voucher)
    }

    /// Fetches a voucher with a row lock, for use inside a redemption
    /// transaction.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let voucher = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM vouchers WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(voucher)
    }

    /// Consumes one credit, deactivating the voucher when the last credit
    /// goes. The remaining-credits guard in the WHERE clause means a
    /// concurrent redemption can never push the counter below zero; callers
    /// get `None` when they lose that race.
    pub async fn consume_credit(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let voucher = sqlx::query_as::<_, Self>(
            r#"
            UPDATE vouchers
            SET remaining_credits = remaining_credits - 1,
                is_active = remaining_credits - 1 > 0
            WHERE id = $1 AND remaining_credits > 0
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(voucher)
    }

    /// Lists all vouchers, most recent purchase first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let vouchers = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM vouchers
            ORDER BY purchased_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(vouchers)
    }

    pub async fn list_by_customer(
        pool: &PgPool,
        customer_id: Uuid,
        active: Option<bool>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let vouchers = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM vouchers
            WHERE customer_id = $1 AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY purchased_at DESC
            "#,
        )
        .bind(customer_id)
        .bind(active)
        .fetch_all(pool)
        .await?;

        Ok(vouchers)
    }

    /// Updates the staff-editable fields (price, expiry). Credit counters are
    /// only ever touched through `consume_credit`.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateVoucherData,
    ) -> Result<Option<Self>, sqlx::Error> {
        let voucher = sqlx::query_as::<_, Self>(
            r#"
            UPDATE vouchers
            SET price = $2, expires_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.price)
        .bind(data.expires_at)
        .fetch_optional(pool)
        .await?;

        Ok(voucher)
    }

    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM vouchers WHERE is_active = TRUE
            "#,
        )
        .fetch_one(pool)
        .await
    }

    pub async fn count_exhausted(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM vouchers WHERE is_active = FALSE
            "#,
        )
        .fetch_one(pool)
        .await
    }

    pub async fn count_by_customer(
        pool: &PgPool,
        customer_id: Uuid,
        active: bool,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM vouchers WHERE customer_id = $1 AND is_active = $2
            "#,
        )
        .bind(customer_id)
        .bind(active)
        .fetch_one(pool)
        .await
    }

    /// Deactivates vouchers whose expiry timestamp has passed. Run by the
    /// nightly sweep job.
    pub async fn deactivate_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE vouchers
            SET is_active = FALSE
            WHERE is_active = TRUE
              AND expires_at IS NOT NULL
              AND expires_at < NOW()
            "#,
        )
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voucher(total: i32, remaining: i32) -> Voucher {
        Voucher {
            id: Uuid::nil(),
            customer_id: Uuid::nil(),
            kind: VoucherKind::Ten,
            total_credits: total,
            remaining_credits: remaining,
            is_active: remaining > 0,
            purchased_at: Utc::now(),
            expires_at: None,
            price: None,
        }
    }

    #[test]
    fn test_kind_credits() {
        assert_eq!(VoucherKind::Ten.credits(), 10);
        assert_eq!(VoucherKind::Twenty.credits(), 20);
        assert_eq!(VoucherKind::Thirty.credits(), 30);
    }

    #[test]
    fn test_kind_rejects_unknown_values() {
        assert!(VoucherKind::try_from(10).is_ok());
        assert!(VoucherKind::try_from(15).is_err());
        assert!(VoucherKind::try_from(0).is_err());
    }

    #[test]
    fn test_used_count() {
        assert_eq!(voucher(10, 10).used_count(), 0);
        assert_eq!(voucher(10, 3).used_count(), 7);
        assert_eq!(voucher(20, 0).used_count(), 20);
    }

    #[test]
    fn test_usage_percentage() {
        assert_eq!(voucher(10, 10).usage_percentage(), 0.0);
        assert_eq!(voucher(10, 5).usage_percentage(), 50.0);
        assert_eq!(voucher(20, 0).usage_percentage(), 100.0);
        assert_eq!(voucher(0, 0).usage_percentage(), 0.0);
    }
}
