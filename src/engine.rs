//! Pipeline facade
//!
//! Wires the three stages in their required order: authenticate, negotiate
//! CORS, authorize. The HTTP layer calls
//! [`AuthEngine::authenticate_with_cors`] for every request, applies the
//! returned decision to the response headers, and calls
//! [`AuthEngine::authorize`] for protected routes.

use std::sync::Arc;

use http::{HeaderMap, Method};

use crate::config::AuthConfig;
use crate::context::{Credential, RequestContext};
use crate::cors::{CorsDecision, CorsNegotiator, OriginRuleError};
use crate::error::AuthError;
use crate::gate::{Gate, Requirements};
use crate::resolver::Authenticator;
use crate::store::{TokenStore, UserStore};

pub struct AuthEngine {
    authenticator: Authenticator,
    negotiator: CorsNegotiator,
    gate: Gate,
}

impl AuthEngine {
    pub fn new(
        config: Arc<AuthConfig>,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, OriginRuleError> {
        Ok(Self {
            authenticator: Authenticator::new(config.clone(), users, tokens),
            negotiator: CorsNegotiator::new(config.clone())?,
            gate: Gate::new(config),
        })
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<RequestContext, AuthError> {
        self.authenticator.authenticate(headers).await
    }

    pub fn negotiate_cors(
        &self,
        credential: &Credential,
        method: &Method,
        path: &str,
    ) -> CorsDecision {
        self.negotiator.negotiate(credential, method, path)
    }

    /// Authenticate and negotiate CORS in one step. A decision is produced
    /// even when authentication fails, so error responses still carry the
    /// right origin headers.
    pub async fn authenticate_with_cors(
        &self,
        headers: &HeaderMap,
        method: &Method,
        path: &str,
    ) -> (Result<RequestContext, AuthError>, CorsDecision) {
        match self.authenticator.authenticate(headers).await {
            Ok(ctx) => {
                let decision = self.negotiator.negotiate(&ctx.credential, method, path);
                (Ok(ctx.with_cors(decision.clone())), decision)
            }
            Err(err) => {
                let decision = self.negotiator.negotiate(&Credential::None, method, path);
                (Err(err), decision)
            }
        }
    }

    pub fn authorize(
        &self,
        ctx: &RequestContext,
        requirements: &Requirements,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<(), AuthError> {
        self.gate.authorize(ctx, requirements, method, path, headers)
    }
}
