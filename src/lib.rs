//! Request authorization engine for a streaming-video API.
//!
//! Three components gate every inbound request, in order:
//!
//! 1. [`Authenticator`] parses the `Authorization` header (bearer API key,
//!    basic, or dashboard JWT) and resolves the caller into a
//!    [`RequestContext`].
//! 2. [`CorsNegotiator`] computes the origin policy for the response. This
//!    happens before authorization because browser preflights never carry
//!    credentials; the gate later re-checks the actual request's `Origin`
//!    against the decision.
//! 3. [`Gate`] approves or rejects the request against the route's
//!    [`Requirements`] and the resolved token's access rules.
//!
//! [`AuthEngine`] bundles the three for callers that want the whole
//! pipeline. Users and API tokens come from external stores behind the
//! [`UserStore`] and [`TokenStore`] traits; everything else is
//! request-scoped and immutable.

pub mod config;
pub mod context;
pub mod cors;
pub mod engine;
pub mod error;
pub mod gate;
pub mod jwt;
pub mod path;
pub mod policy;
pub mod resolver;
pub mod store;

pub use config::{AuthConfig, default_cors_api_key_rules};
pub use context::{AuthScheme, Credential, RequestContext};
pub use cors::{CorsDecision, CorsNegotiator, OriginRule, OriginRuleError};
pub use engine::AuthEngine;
pub use error::AuthError;
pub use gate::{Gate, Requirements};
pub use jwt::{AccessClaims, JwtError, sign_access_token, verify_access_token};
pub use path::{PathPattern, PatternError, path_join2, trim_path_prefix};
pub use policy::{AuthPolicy, AuthRule, PolicyError};
pub use resolver::Authenticator;
pub use store::{
    AccessPolicy, ApiToken, CorsSettings, StoreError, TokenStore, User, UserStore,
};
