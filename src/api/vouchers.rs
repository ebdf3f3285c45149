use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::auth::auth_context;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::customer::Customer;
use crate::models::usage_event::{UpdateUsageEventData, UsageEvent, UsageEventWithCustomer};
use crate::models::voucher::{CreateVoucherData, UpdateVoucherData, Voucher};
use crate::services::voucher_redemption::{self, RecordUsageData, VoucherUsage};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vouchers", get(list_vouchers).post(create_voucher))
        .route("/vouchers/dashboard", get(dashboard))
        .route("/vouchers/:id", get(get_voucher).put(update_voucher))
        .route("/vouchers/:id/redeem", post(redeem_voucher))
        .route(
            "/vouchers/:id/usages",
            get(list_usage_events).post(record_usage),
        )
        .route("/usage-events/:id", put(correct_usage_event))
}

/// Voucher plus its derived consumption figures.
#[derive(Debug, Serialize)]
pub struct VoucherResponse {
    #[serde(flatten)]
    pub voucher: Voucher,
    pub used_count: i32,
    pub usage_percentage: f64,
}

impl From<Voucher> for VoucherResponse {
    fn from(voucher: Voucher) -> Self {
        let used_count = voucher.used_count();
        let usage_percentage = voucher.usage_percentage();
        Self {
            voucher,
            used_count,
            usage_percentage,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoucherDetail {
    #[serde(flatten)]
    pub voucher: VoucherResponse,
    pub usages: Vec<UsageEvent>,
}

#[derive(Debug, Deserialize)]
pub struct ListVouchersQuery {
    pub customer_id: Option<Uuid>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct VoucherDashboard {
    pub active_vouchers: i64,
    pub exhausted_vouchers: i64,
    pub active_customers: i64,
    pub recent_usage: Vec<UsageEventWithCustomer>,
}

async fn list_vouchers(
    State(state): State<AppState>,
    Query(params): Query<ListVouchersQuery>,
    session: Session,
) -> Result<Json<Vec<VoucherResponse>>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let vouchers = match params.customer_id {
        Some(customer_id) => {
            Voucher::list_by_customer(&state.pool, customer_id, params.active).await?
        }
        None => Voucher::list(&state.pool).await?,
    };

    Ok(Json(vouchers.into_iter().map(VoucherResponse::from).collect()))
}

async fn create_voucher(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateVoucherData>,
) -> Result<(StatusCode, Json<VoucherResponse>)> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    Customer::find_by_id(&state.pool, req.customer_id)
        .await?
        .ok_or(AppError::NotFound("customer"))?;

    let voucher = Voucher::create(&state.pool, req).await?;

    tracing::info!(
        voucher_id = %voucher.id,
        customer_id = %voucher.customer_id,
        total_credits = voucher.total_credits,
        "voucher sold"
    );

    Ok((StatusCode::CREATED, Json(voucher.into())))
}

async fn get_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> Result<Json<VoucherDetail>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let voucher = Voucher::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("voucher"))?;

    let usages = UsageEvent::list_by_voucher(&state.pool, id).await?;

    Ok(Json(VoucherDetail {
        voucher: voucher.into(),
        usages,
    }))
}

async fn update_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
    Json(req): Json<UpdateVoucherData>,
) -> Result<Json<VoucherResponse>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let voucher = Voucher::update(&state.pool, id, req)
        .await?
        .ok_or(AppError::NotFound("voucher"))?;

    Ok(Json(voucher.into()))
}

/// Front-desk quick use: consumes one credit and logs it with today's date.
async fn redeem_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> Result<Json<VoucherUsage>> {
    let ctx = auth_context(&session).await?;

    let usage = voucher_redemption::redeem(&state.pool, &ctx, id).await?;

    Ok(Json(usage))
}

/// Records a use with an explicit date or description.
async fn record_usage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
    Json(req): Json<RecordUsageData>,
) -> Result<(StatusCode, Json<VoucherUsage>)> {
    let ctx = auth_context(&session).await?;

    let usage = voucher_redemption::record_usage(&state.pool, &ctx, id, req).await?;

    Ok((StatusCode::CREATED, Json(usage)))
}

async fn list_usage_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> Result<Json<Vec<UsageEvent>>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    Voucher::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("voucher"))?;

    let usages = UsageEvent::list_by_voucher(&state.pool, id).await?;

    Ok(Json(usages))
}

/// Staff correction of a recorded use (wrong date, missing description).
async fn correct_usage_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
    Json(req): Json<UpdateUsageEventData>,
) -> Result<Json<UsageEvent>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let event = UsageEvent::update(&state.pool, id, req)
        .await?
        .ok_or(AppError::NotFound("usage event"))?;

    tracing::info!(usage_event_id = %event.id, "usage event corrected");

    Ok(Json(event))
}

async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<VoucherDashboard>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let active_vouchers = Voucher::count_active(&state.pool).await?;
    let exhausted_vouchers = Voucher::count_exhausted(&state.pool).await?;
    let active_customers = Customer::count_active(&state.pool).await?;
    let recent_usage = UsageEvent::recent(&state.pool, 10).await?;

    Ok(Json(VoucherDashboard {
        active_vouchers,
        exhausted_vouchers,
        active_customers,
        recent_usage,
    }))
}
