use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::auth::auth_context;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::customer::{CreateCustomerData, Customer, UpdateCustomerData};
use crate::models::membership::Membership;
use crate::models::voucher::Voucher;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Customer detail with the records hanging off it, as shown on the staff
/// detail screen.
#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    pub customer: Customer,
    pub membership: Option<Membership>,
    pub vouchers: Vec<Voucher>,
}

async fn list_customers(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Customer>>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let customers = Customer::list_active(&state.pool).await?;

    Ok(Json(customers))
}

async fn create_customer(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>)> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let customer = Customer::create(
        &state.pool,
        CreateCustomerData {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            birth_date: req.birth_date,
            account_id: None,
        },
    )
    .await?;

    tracing::info!(customer_id = %customer.id, "customer created");

    Ok((StatusCode::CREATED, Json(customer)))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> Result<Json<CustomerDetail>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let customer = Customer::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("customer"))?;

    let membership = Membership::find_by_customer_id(&state.pool, id).await?;
    let vouchers = Voucher::list_by_customer(&state.pool, id, None).await?;

    Ok(Json(CustomerDetail {
        customer,
        membership,
        vouchers,
    }))
}

async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
    Json(req): Json<UpdateCustomerData>,
) -> Result<Json<Customer>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let customer = Customer::update(&state.pool, id, req)
        .await?
        .ok_or(AppError::NotFound("customer"))?;

    Ok(Json(customer))
}

/// Soft delete: the customer is deactivated, never removed, so voucher and
/// membership history survives.
async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> Result<StatusCode> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    if !Customer::deactivate(&state.pool, id).await? {
        return Err(AppError::NotFound("customer"));
    }

    tracing::info!(customer_id = %id, "customer deactivated");

    Ok(StatusCode::NO_CONTENT)
}
