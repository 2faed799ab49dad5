//! Login: credentials in, session identity and landing route out.

use crate::Gateway;
use hrc_core::forms::Credentials;
use hrc_core::mapper::decode_account;
use hrc_core::{
    GENERIC_ERROR_MESSAGE, INVALID_CREDENTIALS_MESSAGE, INVALID_ROLE_MESSAGE, SessionIdentity,
    SessionStore,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The session now holds `identity`; the caller should navigate to `home_route`.
    Authenticated {
        identity: SessionIdentity,
        home_route: &'static str,
    },
    /// Nothing was stored.
    Rejected(LoginRejection),
}

/// Why a login did not produce a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginRejection {
    /// The accounts service did not accept the email and password.
    InvalidCredentials,
    /// The account exists but its role has no console.
    InvalidRole,
    /// The accounts service could not be used, or the session could not be stored.
    Failed,
}

impl LoginRejection {
    /// The text shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            LoginRejection::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE,
            LoginRejection::InvalidRole => INVALID_ROLE_MESSAGE,
            LoginRejection::Failed => GENERIC_ERROR_MESSAGE,
        }
    }
}

impl std::fmt::Display for LoginRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.message())
    }
}

/// Authenticates against the accounts service and records the session.
///
/// Only doctors and admins get a session; any other role is rejected before anything is
/// persisted.
pub async fn login(
    gateway: &Gateway,
    session: &SessionStore,
    credentials: &Credentials,
) -> LoginOutcome {
    let response = match gateway.login(credentials).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("login request failed: {e}");
            return LoginOutcome::Rejected(LoginRejection::Failed);
        }
    };

    let row = match response.account {
        Some(row) if response.success => row,
        _ => return LoginOutcome::Rejected(LoginRejection::InvalidCredentials),
    };

    let account = match decode_account(&row) {
        Ok(account) => account,
        Err(e) => {
            tracing::warn!("login returned an unusable account: {e}");
            return LoginOutcome::Rejected(LoginRejection::Failed);
        }
    };

    let Some(home_route) = account.role.home_route() else {
        tracing::info!("login refused for account {} with role {}", account.id, account.role.code());
        return LoginOutcome::Rejected(LoginRejection::InvalidRole);
    };

    let identity = SessionIdentity::from(&account);
    if let Err(e) = session.set_user(identity.clone()) {
        tracing::warn!("failed to persist session: {e}");
        if let Err(e) = session.logout() {
            tracing::warn!("failed to clear session: {e}");
        }
        return LoginOutcome::Rejected(LoginRejection::Failed);
    }

    LoginOutcome::Authenticated {
        identity,
        home_route,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{endpoints_for, spawn_stub, unused_base_url};
    use axum::routing::post;
    use axum::{Json, Router};
    use hrc_core::{MemoryStorage, Role, Service};
    use serde_json::{Value, json};
    use std::sync::Arc;

    /// Accounts stub: the password selects the canned response.
    fn accounts_stub() -> Router {
        Router::new().route(
            "/login",
            post(|Json(body): Json<Value>| async move {
                match body["password"].as_str().unwrap_or_default() {
                    "doctor" => Json(json!({"success": true, "account": [3, "d@x.org", "Dr D", "doctor", 1]})),
                    "admin" => Json(json!({"success": true, "account": [4, "a@x.org", "Ada", "admin", 2]})),
                    "nurse" => Json(json!({"success": true, "account": [5, "n@x.org", "Nia", "nurse", 3]})),
                    "short" => Json(json!({"success": true, "account": [6, "s@x.org"]})),
                    _ => Json(json!({"success": false})),
                }
            }),
        )
    }

    async fn setup() -> (Gateway, SessionStore) {
        let base = spawn_stub(accounts_stub()).await;
        let gateway = Gateway::new(endpoints_for(&[(Service::Accounts, &base)])).unwrap();
        let session = SessionStore::open(Arc::new(MemoryStorage::new()));
        (gateway, session)
    }

    fn credentials(password: &str) -> Credentials {
        Credentials {
            email: "x@x.org".into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn doctor_lands_on_patients() {
        let (gateway, session) = setup().await;

        let outcome = login(&gateway, &session, &credentials("doctor")).await;

        assert_eq!(
            outcome,
            LoginOutcome::Authenticated {
                identity: SessionIdentity {
                    id: 3,
                    name: "Dr D".into(),
                    role: Role::Doctor,
                },
                home_route: "/patients",
            }
        );
        assert_eq!(session.id(), Some(3));
    }

    #[tokio::test]
    async fn admin_lands_on_dashboard() {
        let (gateway, session) = setup().await;

        match login(&gateway, &session, &credentials("admin")).await {
            LoginOutcome::Authenticated { home_route, .. } => assert_eq!(home_route, "/dashboard"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(session.role(), 2);
    }

    #[tokio::test]
    async fn other_roles_are_not_stored() {
        let (gateway, session) = setup().await;

        let outcome = login(&gateway, &session, &credentials("nurse")).await;

        assert_eq!(outcome, LoginOutcome::Rejected(LoginRejection::InvalidRole));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (gateway, session) = setup().await;

        let outcome = login(&gateway, &session, &credentials("nope")).await;

        assert_eq!(outcome, LoginOutcome::Rejected(LoginRejection::InvalidCredentials));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn malformed_account_row_is_generic_error() {
        let (gateway, session) = setup().await;

        let outcome = login(&gateway, &session, &credentials("short")).await;

        assert_eq!(outcome, LoginOutcome::Rejected(LoginRejection::Failed));
    }

    #[tokio::test]
    async fn unreachable_accounts_service_is_generic_error() {
        let base = unused_base_url().await;
        let gateway = Gateway::new(endpoints_for(&[(Service::Accounts, &base)])).unwrap();
        let session = SessionStore::open(Arc::new(MemoryStorage::new()));

        let outcome = login(&gateway, &session, &credentials("doctor")).await;

        assert_eq!(outcome, LoginOutcome::Rejected(LoginRejection::Failed));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn rejection_messages_match_user_facing_text() {
        assert_eq!(LoginRejection::InvalidCredentials.message(), "Invalid credentials");
        assert_eq!(LoginRejection::InvalidRole.to_string(), "Invalid role");
        assert_eq!(
            LoginRejection::Failed.message(),
            "An error occurred while processing your request."
        );
    }
}
