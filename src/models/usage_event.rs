use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageEvent {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub used_on: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Staff correction of a recorded use.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUsageEventData {
    pub used_on: Option<NaiveDate>,
    pub description: Option<String>,
}

/// A usage event joined with the owning customer, for the recent-activity
/// feed on the voucher dashboard.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UsageEventWithCustomer {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub used_on: NaiveDate,
    pub description: Option<String>,
    pub customer_name: String,
}

impl UsageEvent {
    /// Appends a usage event. The date defaults to today when not supplied.
    /// Runs on any executor so redemption can insert it in the same
    /// transaction as the credit decrement.
    pub async fn create<'e, E>(
        executor: E,
        voucher_id: Uuid,
        used_on: Option<NaiveDate>,
        description: Option<String>,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let used_on = used_on.unwrap_or_else(|| Utc::now().date_naive());

        let event = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO usage_events (voucher_id, used_on, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(voucher_id)
        .bind(used_on)
        .bind(description)
        .fetch_one(executor)
        .await?;

        Ok(event)
    }

    pub async fn list_by_voucher(
        pool: &PgPool,
        voucher_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM usage_events
            WHERE voucher_id = $1
            ORDER BY used_on DESC, created_at DESC
            "#,
        )
        .bind(voucher_id)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    /// Most recent uses of a voucher, for the customer panel.
    pub async fn list_recent_for_voucher(
        pool: &PgPool,
        voucher_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let events = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM usage_events
            WHERE voucher_id = $1
            ORDER BY used_on DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(voucher_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    /// Staff correction of date or description after the fact.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUsageEventData,
    ) -> Result<Option<Self>, sqlx::Error> {
        let event = sqlx::query_as::<_, Self>(
            r#"
            UPDATE usage_events
            SET
                used_on = COALESCE($2, used_on),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.used_on)
        .bind(data.description)
        .fetch_optional(pool)
        .await?;

        Ok(event)
    }

    /// Recent usage across all vouchers, joined with the customer it belongs
    /// to, for the staff dashboard.
    pub async fn recent(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<UsageEventWithCustomer>, sqlx::Error> {
        let events = sqlx::query_as::<_, UsageEventWithCustomer>(
            r#"
            SELECT ue.id, ue.voucher_id, ue.used_on, ue.description,
                   c.first_name || ' ' || c.last_name AS customer_name
            FROM usage_events ue
            JOIN vouchers v ON v.id = ue.voucher_id
            JOIN customers c ON c.id = v.customer_id
            ORDER BY ue.used_on DESC, ue.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }
}
