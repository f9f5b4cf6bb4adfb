//! Per-request identity and credential context
//!
//! The resolver builds a [`RequestContext`] for every request; CORS
//! negotiation and the gate consume it and never re-parse headers. The
//! context is a plain value threaded through the call chain, not ambient
//! request state.

use crate::cors::CorsDecision;
use crate::jwt::AccessClaims;
use crate::store::{ApiToken, User};

/// Scheme carried by the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Basic,
    Jwt,
}

/// Resolved credential, one per request.
#[derive(Debug, Clone, Default)]
pub enum Credential {
    #[default]
    None,
    /// API token presented via the bearer or basic scheme.
    ApiKey { token: ApiToken, scheme: AuthScheme },
    /// Verified dashboard JWT.
    Jwt(AccessClaims),
}

impl Credential {
    pub fn token(&self) -> Option<&ApiToken> {
        match self {
            Self::ApiKey { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_jwt(&self) -> bool {
        matches!(self, Self::Jwt(_))
    }
}

/// Immutable per-request authorization context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Resolved principal. `None` means the request is unauthenticated;
    /// whether that is acceptable is the gate's call.
    pub user: Option<User>,
    pub credential: Credential,
    /// Admin authenticated through the dashboard JWT flow. API-key admins
    /// never get UI-admin status.
    pub is_ui_admin: bool,
    /// Origin policy the CORS negotiator approved for this request.
    pub cors: Option<CorsDecision>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            credential: Credential::None,
            is_ui_admin: false,
            cors: None,
        }
    }

    pub fn authenticated(user: User, credential: Credential) -> Self {
        let is_ui_admin = user.admin && credential.is_jwt();
        Self {
            user: Some(user),
            credential,
            is_ui_admin,
            cors: None,
        }
    }

    /// Attach the negotiated CORS decision.
    pub fn with_cors(mut self, decision: CorsDecision) -> Self {
        self.cors = Some(decision);
        self
    }

    pub fn token(&self) -> Option<&ApiToken> {
        self.credential.token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn user(admin: bool) -> User {
        User {
            id: "user-1".to_string(),
            email: "u@example.com".to_string(),
            admin,
            suspended: false,
            email_valid: true,
        }
    }

    fn api_token() -> ApiToken {
        ApiToken {
            id: "tok-1".to_string(),
            user_id: "user-1".to_string(),
            access: None,
        }
    }

    #[test]
    fn test_ui_admin_requires_jwt() {
        let claims = AccessClaims::new("user-1", None, TimeDelta::hours(1));
        let ctx = RequestContext::authenticated(user(true), Credential::Jwt(claims));
        assert!(ctx.is_ui_admin);
    }

    #[test]
    fn test_api_key_admin_is_not_ui_admin() {
        let ctx = RequestContext::authenticated(
            user(true),
            Credential::ApiKey {
                token: api_token(),
                scheme: AuthScheme::Bearer,
            },
        );
        assert!(!ctx.is_ui_admin);
        assert!(ctx.token().is_some());
    }

    #[test]
    fn test_non_admin_jwt_is_not_ui_admin() {
        let claims = AccessClaims::new("user-1", None, TimeDelta::hours(1));
        let ctx = RequestContext::authenticated(user(false), Credential::Jwt(claims));
        assert!(!ctx.is_ui_admin);
        assert!(ctx.token().is_none());
    }
}
