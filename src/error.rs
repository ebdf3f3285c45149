use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{field} is already in use")]
    Duplicate { field: &'static str },

    #[error("voucher has no remaining credits")]
    NoCreditsRemaining,

    #[error("voucher is not active")]
    VoucherInactive,

    #[error("basic tier memberships do not include board storage")]
    InvalidTierConstraint,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthorized,

    #[error("staff access required")]
    Forbidden,

    #[error("session error: {0}")]
    Session(String),

    #[error("database error")]
    Database(sqlx::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("record"),
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Duplicate {
                field: duplicate_field(db.constraint()),
            },
            _ => AppError::Database(err),
        }
    }
}

/// Maps a unique-constraint name from the schema to the user-facing field it
/// guards. Unknown constraints fall back to a generic label.
fn duplicate_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("customers_email_key") | Some("accounts_email_key") => "email",
        Some("memberships_membership_number_key") => "membership_number",
        Some("memberships_locker_number_key") => "locker_number",
        Some("memberships_board_slot_number_key") => "board_slot_number",
        Some("memberships_customer_id_key") => "customer",
        _ => "value",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Duplicate { .. } => StatusCode::CONFLICT,
            AppError::NoCreditsRemaining
            | AppError::VoucherInactive
            | AppError::InvalidTierConstraint => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Session(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = match &self {
            AppError::Database(_) => "database error".to_string(),
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({ "error": message }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_field_maps_known_constraints() {
        assert_eq!(duplicate_field(Some("customers_email_key")), "email");
        assert_eq!(
            duplicate_field(Some("memberships_locker_number_key")),
            "locker_number"
        );
        assert_eq!(
            duplicate_field(Some("memberships_board_slot_number_key")),
            "board_slot_number"
        );
    }

    #[test]
    fn test_duplicate_field_falls_back_for_unknown_constraint() {
        assert_eq!(duplicate_field(Some("something_else")), "value");
        assert_eq!(duplicate_field(None), "value");
    }
}
