//! Authentication resolution
//!
//! State machine over the `Authorization` header:
//! * `Bearer <token>` — API key lookup by the raw token (external apps);
//! * `Basic <base64 user:pass>` — the password is an API key, the username
//!   must be the key owner's user id (clients that can only express
//!   credentials inside a URL);
//! * `JWT <token>` — verified dashboard session, `sub` is the user id.
//!
//! Requests without a (parseable) header pass through anonymous; whether
//! that is acceptable is decided later by the gate. Responses should vary on
//! `Authorization` (the HTTP layer owns the `Vary` header).

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::{HeaderMap, header};
use subtle::ConstantTimeEq as _;

use crate::config::AuthConfig;
use crate::context::{AuthScheme, Credential, RequestContext};
use crate::error::AuthError;
use crate::jwt::verify_access_token;
use crate::store::{StoreError, TokenStore, UserStore};

/// Parsed `Authorization` header value.
#[derive(Debug, PartialEq)]
struct ParsedAuthHeader<'a> {
    raw_scheme: &'a str,
    token: &'a str,
}

/// Split scheme and credential. Mirrors a permissive `\w+` scheme token;
/// anything that does not parse is treated as no credential at all.
fn parse_auth_header(value: &str) -> Option<ParsedAuthHeader<'_>> {
    let (scheme, rest) = value.trim_start().split_once(char::is_whitespace)?;
    let token = rest.trim();
    if token.is_empty()
        || scheme.is_empty()
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    Some(ParsedAuthHeader {
        raw_scheme: scheme,
        token,
    })
}

fn parse_basic_credentials(token: &str) -> Option<(String, String)> {
    let decoded = BASE64.decode(token).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, pass) = decoded.split_once(':')?;
    Some((name.to_string(), pass.to_string()))
}

fn store_failure(e: StoreError) -> AuthError {
    tracing::error!(error = %e, "store lookup failed during authentication");
    AuthError::internal("credential store unavailable")
}

/// Resolves the identity and credential for each request.
pub struct Authenticator {
    config: Arc<AuthConfig>,
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
}

impl Authenticator {
    pub fn new(
        config: Arc<AuthConfig>,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            config,
            users,
            tokens,
        }
    }

    /// Resolve the request identity from its headers and populate the
    /// context consumed by CORS negotiation and the gate.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<RequestContext, AuthError> {
        let Some(value) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(RequestContext::anonymous());
        };
        let Some(parsed) = parse_auth_header(value) else {
            return Ok(RequestContext::anonymous());
        };

        let (user_id, credential) = match parsed.raw_scheme.to_ascii_lowercase().as_str() {
            "bearer" => self.resolve_api_key(parsed.token, None).await?,
            "basic" => {
                let Some((name, pass)) = parse_basic_credentials(parsed.token) else {
                    return Err(AuthError::unauthorized("no authorization token provided"));
                };
                self.resolve_api_key(&pass, Some(&name)).await?
            }
            "jwt" => self.resolve_jwt(parsed.token)?,
            _ => {
                return Err(AuthError::unauthorized(format!(
                    "unsupported authorization header scheme: {}",
                    parsed.raw_scheme
                )));
            }
        };

        let user = self
            .users
            .get(&user_id)
            .await
            .map_err(store_failure)?
            .ok_or_else(|| AuthError::unauthorized("no user found from authorization header"))?;
        if user.suspended {
            return Err(AuthError::forbidden("user is suspended"));
        }

        Ok(RequestContext::authenticated(user, credential))
    }

    async fn resolve_api_key(
        &self,
        token_id: &str,
        basic_user: Option<&str>,
    ) -> Result<(String, Credential), AuthError> {
        if token_id.is_empty() {
            return Err(AuthError::unauthorized("no authorization token provided"));
        }
        let token = self.tokens.get(token_id).await.map_err(store_failure)?;
        // the same message for a missing token and a basic-auth owner
        // mismatch, to not leak which one failed
        let not_found = || AuthError::unauthorized(format!("no token {token_id} found"));
        let Some(token) = token else {
            return Err(not_found());
        };
        if let Some(name) = basic_user
            && !bool::from(token.user_id.as_bytes().ct_eq(name.as_bytes()))
        {
            return Err(not_found());
        }

        self.spawn_token_seen(&token.id);
        let scheme = if basic_user.is_some() {
            AuthScheme::Basic
        } else {
            AuthScheme::Bearer
        };
        Ok((token.user_id.clone(), Credential::ApiKey { token, scheme }))
    }

    fn resolve_jwt(&self, token: &str) -> Result<(String, Credential), AuthError> {
        let claims = verify_access_token(
            token,
            &self.config.jwt_secret,
            self.config.jwt_audience.as_deref(),
        )
        .map_err(|e| AuthError::unauthorized(e.to_string()))?;
        self.spawn_user_seen(claims.user_id());
        Ok((claims.sub.clone(), Credential::Jwt(claims)))
    }

    /// Fire-and-forget last-seen telemetry; must never block or fail the
    /// request path.
    fn spawn_token_seen(&self, token_id: &str) {
        let tokens = self.tokens.clone();
        let id = token_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = tokens.record_seen(&id).await {
                tracing::warn!(token_id = %id, error = %e, "failed to record token last-seen");
            }
        });
    }

    fn spawn_user_seen(&self, user_id: &str) {
        let users = self.users.clone();
        let id = user_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = users.record_seen(&id).await {
                tracing::warn!(user_id = %id, error = %e, "failed to record user last-seen");
            }
        });
    }
}
