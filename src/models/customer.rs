use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub is_active: bool,
    pub account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[serde(skip)]
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCustomerData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Creates a new customer record
    pub async fn create<'e, E>(executor: E, data: CreateCustomerData) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let customer = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO customers (first_name, last_name, email, phone, birth_date, account_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(data.birth_date)
        .bind(data.account_id)
        .fetch_one(executor)
        .await?;

        Ok(customer)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let customer = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM customers WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(customer)
    }

    /// Finds the customer linked to a login account
    pub async fn find_by_account_id(
        pool: &PgPool,
        account_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let customer = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM customers WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

        Ok(customer)
    }

    /// Lists active customers ordered by name
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let customers = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM customers
            WHERE is_active = TRUE
            ORDER BY last_name, first_name
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(customers)
    }

    /// Updates customer details. Absent fields keep their current value.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCustomerData,
    ) -> Result<Option<Self>, sqlx::Error> {
        let customer = sqlx::query_as::<_, Self>(
            r#"
            UPDATE customers
            SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                birth_date = COALESCE($6, birth_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.birth_date)
        .fetch_optional(pool)
        .await?;

        Ok(customer)
    }

    /// Soft delete: the record is kept so vouchers and memberships stay
    /// attached to their owner.
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM customers WHERE is_active = TRUE
            "#,
        )
        .fetch_one(pool)
        .await
    }
}
