use chrono::NaiveDate;
use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::account::{Account, AccountRole, CreateAccountData};
use crate::models::customer::{CreateCustomerData, Customer};
use crate::services::password;

#[derive(Debug, Clone)]
pub struct RegisterCustomerData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Self-service sign-up: creates the login account and the linked customer
/// record as one atomic unit.
pub async fn register_customer(
    pool: &PgPool,
    data: RegisterCustomerData,
) -> Result<(Account, Customer)> {
    let credentials = password::hash_password(&data.password).map_err(anyhow::Error::new)?;

    let mut tx = pool.begin().await?;

    let account = Account::create(
        &mut *tx,
        CreateAccountData {
            email: data.email.clone(),
            password_hash: credentials.hash,
            password_salt: credentials.salt,
            role: AccountRole::Customer,
        },
    )
    .await?;

    let customer = Customer::create(
        &mut *tx,
        CreateCustomerData {
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            phone: data.phone,
            birth_date: data.birth_date,
            account_id: Some(account.id),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(customer_id = %customer.id, "customer self-registered");

    Ok((account, customer))
}

/// Verifies login credentials. The caller gets the same error for an unknown
/// email and a wrong password.
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> Result<Account> {
    let account = Account::find_by_email(pool, email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let matches = password::verify_password(password, &account.password_salt, &account.password_hash)
        .map_err(anyhow::Error::new)?;

    if !matches {
        return Err(AppError::Unauthorized);
    }

    Ok(account)
}

/// Creates the configured staff account at startup if it does not exist yet.
pub async fn ensure_bootstrap_staff(pool: &PgPool, config: &Config) -> Result<()> {
    let (Some(email), Some(bootstrap_password)) = (
        &config.bootstrap_staff_email,
        &config.bootstrap_staff_password,
    ) else {
        return Ok(());
    };

    if Account::find_by_email(pool, email).await?.is_some() {
        return Ok(());
    }

    let credentials =
        password::hash_password(bootstrap_password.expose_secret()).map_err(anyhow::Error::new)?;

    Account::create(
        pool,
        CreateAccountData {
            email: email.clone(),
            password_hash: credentials.hash,
            password_salt: credentials.salt,
            role: AccountRole::Staff,
        },
    )
    .await?;

    tracing::info!(email = %email, "bootstrap staff account created");

    Ok(())
}
