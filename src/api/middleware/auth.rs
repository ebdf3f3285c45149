use tower_sessions::Session;
use uuid::Uuid;

use super::session::{SESSION_KEY_ACCOUNT_ID, SESSION_KEY_ACCOUNT_ROLE};
use crate::error::{AppError, Result};
use crate::models::AccountRole;

/// Authorization context resolved from the session. Mutating operations take
/// this explicitly and check it before touching any record, instead of
/// relying on route-level wrappers.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub role: AccountRole,
}

impl AuthContext {
    pub fn is_staff(&self) -> bool {
        self.role == AccountRole::Staff
    }

    pub fn require_staff(&self) -> Result<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Resolves the authorization context of the logged-in account, or
/// `Unauthorized` when there is no session.
pub async fn auth_context(session: &Session) -> Result<AuthContext> {
    let account_id: Option<Uuid> = session
        .get(SESSION_KEY_ACCOUNT_ID)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;

    let role: Option<AccountRole> = session
        .get(SESSION_KEY_ACCOUNT_ROLE)
        .await
        .map_err(|e| AppError::Session(e.to_string()))?;

    match (account_id, role) {
        (Some(account_id), Some(role)) => Ok(AuthContext { account_id, role }),
        _ => Err(AppError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_context_passes_staff_check() {
        let ctx = AuthContext {
            account_id: Uuid::nil(),
            role: AccountRole::Staff,
        };
        assert!(ctx.require_staff().is_ok());
    }

    #[test]
    fn test_customer_context_is_forbidden() {
        let ctx = AuthContext {
            account_id: Uuid::nil(),
            role: AccountRole::Customer,
        };
        assert!(matches!(ctx.require_staff(), Err(AppError::Forbidden)));
    }
}
