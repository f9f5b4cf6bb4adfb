//! Authorization gate
//!
//! Final approve/reject for protected routes. Strictly depends on the
//! resolver having populated the [`RequestContext`] and on the CORS
//! negotiator's decision being attached to it: the gate re-checks the
//! `Origin` header of the actual request because preflights pass through
//! permissively without credentials.

use std::sync::Arc;

use http::{HeaderMap, Method, header};
use url::Url;

use crate::config::AuthConfig;
use crate::context::RequestContext;
use crate::error::AuthError;
use crate::path::trim_path_prefix;
use crate::policy::{AuthPolicy, AuthRule};
use crate::store::ApiToken;

/// Per-route authorization requirements. The default requires nothing
/// beyond an authenticated caller.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    /// Skip the global email-verification check for this route.
    pub allow_unverified: bool,
    /// Require a UI admin (admin authenticated via dashboard JWT).
    pub admin: bool,
    /// Require the admin flag, accepting API-key admins too.
    pub any_admin: bool,
    /// Reject API-token credentials outright.
    pub no_api_token: bool,
    /// Trusted reverse-proxy header carrying the original request URI; when
    /// set, policy evaluation uses its path instead of the routed one.
    pub original_uri_header: Option<String>,
}

pub struct Gate {
    config: Arc<AuthConfig>,
}

impl Gate {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self { config }
    }

    /// Run every check in order; the first violation rejects the request.
    pub fn authorize(
        &self,
        ctx: &RequestContext,
        requirements: &Requirements,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<(), AuthError> {
        let Some(user) = &ctx.user else {
            return Err(AuthError::unauthorized("request is not authenticated"));
        };
        let token = ctx.token();

        if token.is_some() && requirements.no_api_token {
            return Err(AuthError::forbidden("access forbidden for API keys"));
        }

        // The preflight passed permissively; the actual request must carry
        // an origin the negotiated decision approves.
        if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
            let permitted = ctx.cors.as_ref().is_some_and(|d| d.permits(origin));
            if !permitted {
                return Err(AuthError::forbidden(format!(
                    "credential disallows CORS access from origin {origin}"
                )));
            }
        }

        let verify_email =
            self.config.require_email_verification && !requirements.allow_unverified;
        if verify_email && !user.email_valid {
            return Err(AuthError::forbidden(format!(
                "user {} has not been verified. please check your inbox for the verification email.",
                user.email
            )));
        }

        if (requirements.admin && !ctx.is_ui_admin) || (requirements.any_admin && !user.admin) {
            return Err(AuthError::forbidden("user does not have admin privileges"));
        }

        // privilege and cross-origin access never combine
        if user.admin && token.is_some_and(|t| t.cors().is_some()) {
            return Err(AuthError::forbidden("cors access is not available to admins"));
        }

        if let Some(token) = token
            && let Some(rules) = self.effective_rules(token)
        {
            let full_path = self.effective_path(path, requirements, headers);
            if !self.is_authorized(method, &full_path, rules) {
                return Err(AuthError::forbidden(if token.is_restricted_cors() {
                    "access forbidden for CORS-enabled API key with restricted access"
                } else {
                    "credential has insufficient privileges"
                }));
            }
        }
        // no rules and no CORS restriction: implicit full access
        Ok(())
    }

    /// The token's explicit rules, or the configured restricted-access rule
    /// set when its CORS config is restricted and it has no rules of its own.
    fn effective_rules<'a>(&'a self, token: &'a ApiToken) -> Option<&'a [AuthRule]> {
        if token.is_restricted_cors() {
            Some(&self.config.cors_api_key_rules)
        } else {
            token.rules()
        }
    }

    /// Path to evaluate: the trusted original-URI header when configured
    /// (reverse-proxied deployments), the routed path otherwise.
    fn effective_path(
        &self,
        path: &str,
        requirements: &Requirements,
        headers: &HeaderMap,
    ) -> String {
        if let Some(name) = &requirements.original_uri_header
            && let Some(value) = headers.get(name.as_str()).and_then(|v| v.to_str().ok())
        {
            match Url::parse(value) {
                Ok(url) => return url.path().to_string(),
                Err(e) => {
                    tracing::debug!(header = %name, error = %e, "unparseable original URI header");
                }
            }
        }
        path.to_string()
    }

    /// Fail closed: a policy that cannot be built denies rather than erring.
    fn is_authorized(&self, method: &Method, path: &str, rules: &[AuthRule]) -> bool {
        let path = trim_path_prefix(&self.config.http_prefix, path);
        match AuthPolicy::new(rules) {
            Ok(policy) => policy.allows(method.as_str(), path),
            Err(e) => {
                tracing::error!(method = %method, path = %path, error = %e, "error authorizing request");
                false
            }
        }
    }
}
