use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::session::{
    AppState, SESSION_KEY_ACCOUNT_ID, SESSION_KEY_ACCOUNT_ROLE,
};
use crate::error::{AppError, Result};
use crate::models::{AccountRole, Customer};
use crate::services::accounts::{self, RegisterCustomerData};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Self-service sign-up. The new customer is logged in right away.
async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Customer>)> {
    let (account, customer) = accounts::register_customer(
        &state.pool,
        RegisterCustomerData {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
            phone: req.phone,
            birth_date: req.birth_date,
        },
    )
    .await?;

    start_session(&session, account.id, account.role).await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub account_id: Uuid,
    pub role: AccountRole,
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let account = accounts::authenticate(&state.pool, &req.email, &req.password).await?;

    start_session(&session, account.id, account.role).await?;

    tracing::info!(account_id = %account.id, "login");

    Ok(Json(LoginResponse {
        account_id: account.id,
        role: account.role,
    }))
}

async fn logout(session: Session) -> Result<StatusCode> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn start_session(session: &Session, account_id: Uuid, role: AccountRole) -> Result<()> {
    // Fresh session id on privilege change
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;

    session
        .insert(SESSION_KEY_ACCOUNT_ID, account_id)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;

    session
        .insert(SESSION_KEY_ACCOUNT_ROLE, role)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;

    Ok(())
}
