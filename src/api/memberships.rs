use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::middleware::auth::auth_context;
use crate::api::middleware::session::AppState;
use crate::error::{AppError, Result};
use crate::models::membership::{
    Membership, MembershipFilter, MembershipTier, UpdateMembershipData,
};
use crate::services::membership_enrollment::{self, CreateMembershipData};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/memberships", get(list_memberships).post(create_membership))
        .route("/memberships/dashboard", get(dashboard))
        .route(
            "/memberships/:id",
            get(get_membership)
                .put(update_membership)
                .delete(delete_membership),
        )
        .route("/memberships/:id/renew", post(renew_membership))
}

/// Membership plus its derived validity fields.
#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    #[serde(flatten)]
    pub membership: Membership,
    pub is_currently_valid: bool,
    pub days_until_expiry: i64,
}

impl From<Membership> for MembershipResponse {
    fn from(membership: Membership) -> Self {
        let today = Utc::now().date_naive();
        let is_currently_valid = membership.is_valid_on(today);
        let days_until_expiry = membership.days_until_expiry(today);
        Self {
            membership,
            is_currently_valid,
            days_until_expiry,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct TierCounts {
    pub basic: i64,
    pub premium: i64,
    pub vip: i64,
}

#[derive(Debug, Serialize)]
pub struct MembershipDashboard {
    pub total_active: i64,
    pub currently_valid: i64,
    pub expired: i64,
    pub by_tier: TierCounts,
    pub expiring_soon: Vec<MembershipResponse>,
}

async fn list_memberships(
    State(state): State<AppState>,
    Query(filter): Query<MembershipFilter>,
    session: Session,
) -> Result<Json<Vec<MembershipResponse>>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let memberships = Membership::list(&state.pool, &filter).await?;

    Ok(Json(
        memberships.into_iter().map(MembershipResponse::from).collect(),
    ))
}

async fn create_membership(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<CreateMembershipData>,
) -> Result<(StatusCode, Json<MembershipResponse>)> {
    let ctx = auth_context(&session).await?;

    let membership = membership_enrollment::create_membership(&state.pool, &ctx, req).await?;

    Ok((StatusCode::CREATED, Json(membership.into())))
}

async fn get_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> Result<Json<MembershipResponse>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let membership = Membership::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("membership"))?;

    Ok(Json(membership.into()))
}

async fn update_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
    Json(req): Json<UpdateMembershipData>,
) -> Result<Json<MembershipResponse>> {
    let ctx = auth_context(&session).await?;

    let membership =
        membership_enrollment::update_membership(&state.pool, &ctx, id, req).await?;

    Ok(Json(membership.into()))
}

/// Extends the membership one year past its current expiry date and
/// reactivates it.
async fn renew_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> Result<Json<MembershipResponse>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let membership = Membership::renew(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("membership"))?;

    tracing::info!(
        membership_id = %membership.id,
        expires_on = %membership.expires_on,
        "membership renewed"
    );

    Ok(Json(membership.into()))
}

async fn delete_membership(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    session: Session,
) -> Result<StatusCode> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    if !Membership::deactivate(&state.pool, id).await? {
        return Err(AppError::NotFound("membership"));
    }

    tracing::info!(membership_id = %id, "membership deactivated");

    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<MembershipDashboard>> {
    let ctx = auth_context(&session).await?;
    ctx.require_staff()?;

    let total_active = Membership::count_active(&state.pool).await?;
    let currently_valid = Membership::count_valid(&state.pool).await?;
    let expired = Membership::count_expired(&state.pool).await?;

    let mut by_tier = TierCounts::default();
    for (tier, count) in Membership::count_active_by_tier(&state.pool).await? {
        match tier {
            MembershipTier::Basic => by_tier.basic = count,
            MembershipTier::Premium => by_tier.premium = count,
            MembershipTier::Vip => by_tier.vip = count,
        }
    }

    let expiring_soon = Membership::expiring_within(&state.pool, 30, 10)
        .await?
        .into_iter()
        .map(MembershipResponse::from)
        .collect();

    Ok(Json(MembershipDashboard {
        total_active,
        currently_valid,
        expired,
        by_tier,
        expiring_soon,
    }))
}
