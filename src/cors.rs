//! Dynamic CORS origin negotiation
//!
//! The origin policy for a request is computed before authorization: browser
//! preflight `OPTIONS` requests never carry the `Authorization` header, so
//! the policy must be derivable without it. Preflights therefore pass
//! permissively and the gate re-checks the `Origin` header of the actual
//! request against the decision made here.

use std::sync::Arc;

use http::Method;
use regex::Regex;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::context::Credential;

#[derive(Debug, Error)]
pub enum OriginRuleError {
    #[error("invalid origin pattern {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One entry of an origin allowlist: a literal origin, or a regex when the
/// configured entry is wrapped in `/`.
#[derive(Debug, Clone)]
pub enum OriginRule {
    Literal(String),
    Pattern(Regex),
}

impl OriginRule {
    pub fn parse(entry: &str) -> Result<Self, OriginRuleError> {
        if entry.len() >= 2 && entry.starts_with('/') && entry.ends_with('/') {
            let pattern = &entry[1..entry.len() - 1];
            let regex = Regex::new(pattern).map_err(|source| OriginRuleError::Regex {
                pattern: pattern.to_string(),
                source,
            })?;
            Ok(Self::Pattern(regex))
        } else {
            Ok(Self::Literal(entry.to_string()))
        }
    }

    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Literal(allowed) => allowed == origin,
            Self::Pattern(regex) => regex.is_match(origin),
        }
    }
}

/// Origin policy for one request.
#[derive(Debug, Clone)]
pub enum CorsDecision {
    /// Reflect any request origin.
    Any,
    /// Echo the request origin only when the allowlist matches. An empty
    /// list denies every cross-origin caller.
    AllowList(Vec<OriginRule>),
}

impl CorsDecision {
    pub fn permits(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::AllowList(rules) => rules.iter().any(|r| r.matches(origin)),
        }
    }

    /// Value for the `Access-Control-Allow-Origin` response header, if any.
    /// The HTTP layer writes this verbatim (and should vary on `Origin`).
    pub fn allow_origin_header(&self, request_origin: Option<&str>) -> Option<String> {
        let origin = request_origin?;
        self.permits(origin).then(|| origin.to_string())
    }
}

/// Computes the origin policy for each request from the resolved credential,
/// the request path and the configured allowlists.
pub struct CorsNegotiator {
    config: Arc<AuthConfig>,
    jwt_origins: Vec<OriginRule>,
}

impl CorsNegotiator {
    /// Compiles the configured JWT origin allowlist up front; a malformed
    /// regex entry fails construction rather than a request.
    pub fn new(config: Arc<AuthConfig>) -> Result<Self, OriginRuleError> {
        let jwt_origins = config
            .jwt_origins
            .iter()
            .map(|entry| OriginRule::parse(entry))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            config,
            jwt_origins,
        })
    }

    pub fn negotiate(&self, credential: &Credential, method: &Method, path: &str) -> CorsDecision {
        let allow_any = self
            .config
            .any_origin_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
            || (credential.is_none() && *method == Method::OPTIONS);
        if allow_any {
            return CorsDecision::Any;
        }

        let Some(token) = credential.token() else {
            // no API token: the dashboard/JWT allowlist applies
            return CorsDecision::AllowList(self.jwt_origins.clone());
        };

        let allowed = token
            .cors()
            .map(|cors| cors.allowed_origins.as_slice())
            .unwrap_or_default();
        if allowed.iter().any(|origin| origin == "*") {
            CorsDecision::Any
        } else {
            CorsDecision::AllowList(
                allowed
                    .iter()
                    .map(|origin| OriginRule::Literal(origin.clone()))
                    .collect(),
            )
        }
    }
}
