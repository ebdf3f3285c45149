use axum::{extract::State, routing::get, Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tower_sessions::Session;

use crate::api::middleware::auth::auth_context;
use crate::api::middleware::session::AppState;
use crate::api::vouchers::VoucherResponse;
use crate::error::{AppError, Result};
use crate::models::customer::Customer;
use crate::models::membership::{Membership, MembershipTier};
use crate::models::usage_event::UsageEvent;
use crate::models::voucher::Voucher;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/panel", get(panel_overview))
        .route("/panel/vouchers", get(panel_vouchers))
}

/// Membership summary as shown to the customer, derived fields included.
#[derive(Debug, Serialize)]
pub struct PanelMembership {
    pub membership_number: String,
    pub tier: MembershipTier,
    pub is_currently_valid: bool,
    pub expires_on: NaiveDate,
    pub days_until_expiry: i64,
    pub locker_number: Option<i32>,
    pub board_slot_number: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct PanelOverview {
    pub customer: Customer,
    pub membership: Option<PanelMembership>,
    pub active_vouchers: i64,
    pub exhausted_vouchers: i64,
}

#[derive(Debug, Serialize)]
pub struct PanelVoucher {
    #[serde(flatten)]
    pub voucher: VoucherResponse,
    pub recent_usages: Vec<UsageEvent>,
}

/// Resolves the customer record linked to the logged-in account.
async fn current_customer(state: &AppState, session: &Session) -> Result<Customer> {
    let ctx = auth_context(session).await?;

    Customer::find_by_account_id(&state.pool, ctx.account_id)
        .await?
        .ok_or(AppError::NotFound("customer profile"))
}

/// Read-only aggregation for the customer self-service panel.
async fn panel_overview(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PanelOverview>> {
    let customer = current_customer(&state, &session).await?;

    let today = Utc::now().date_naive();
    let membership = Membership::find_by_customer_id(&state.pool, customer.id)
        .await?
        .map(|m| PanelMembership {
            is_currently_valid: m.is_valid_on(today),
            days_until_expiry: m.days_until_expiry(today),
            membership_number: m.membership_number,
            tier: m.tier,
            expires_on: m.expires_on,
            locker_number: m.locker_number,
            board_slot_number: m.board_slot_number,
        });

    let active_vouchers = Voucher::count_by_customer(&state.pool, customer.id, true).await?;
    let exhausted_vouchers = Voucher::count_by_customer(&state.pool, customer.id, false).await?;

    Ok(Json(PanelOverview {
        customer,
        membership,
        active_vouchers,
        exhausted_vouchers,
    }))
}

/// The customer's vouchers with their five most recent uses each.
async fn panel_vouchers(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<PanelVoucher>>> {
    let customer = current_customer(&state, &session).await?;

    let vouchers = Voucher::list_by_customer(&state.pool, customer.id, None).await?;

    let mut result = Vec::with_capacity(vouchers.len());
    for voucher in vouchers {
        let recent_usages =
            UsageEvent::list_recent_for_voucher(&state.pool, voucher.id, 5).await?;
        result.push(PanelVoucher {
            voucher: voucher.into(),
            recent_usages,
        });
    }

    Ok(Json(result))
}
