//! External store contracts and the records they serve
//!
//! Users and API tokens live in an external document store; this crate only
//! reads them and issues one best-effort "last seen" write. Field names on
//! the wire are camelCase, matching the stored documents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::AuthRule;

/// User record owned by the external user store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub email_valid: bool,
}

/// CORS settings attached to an API token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsSettings {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub full_access: bool,
}

/// Access policy attached to an API token: CORS settings plus allow rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors: Option<CorsSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<AuthRule>>,
}

/// API token record owned by the external token store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessPolicy>,
}

impl ApiToken {
    /// CORS settings configured on this token, if any.
    pub fn cors(&self) -> Option<&CorsSettings> {
        self.access.as_ref().and_then(|a| a.cors.as_ref())
    }

    /// Explicit access rules configured on this token, if any.
    pub fn rules(&self) -> Option<&[AuthRule]> {
        self.access.as_ref().and_then(|a| a.rules.as_deref())
    }

    /// A token is CORS-restricted when it carries an origin allowlist
    /// without full access. Explicit rules override the default restriction.
    pub fn is_restricted_cors(&self) -> bool {
        if self.rules().is_some() {
            return false;
        }
        match self.cors() {
            Some(cors) => !cors.allowed_origins.is_empty() && !cors.full_access,
            None => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Read access to the external user store, safe for concurrent use.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Best-effort "last seen" telemetry. Failures are logged, never
    /// surfaced to the request path.
    async fn record_seen(&self, user_id: &str) -> Result<(), StoreError>;
}

/// Read access to the external API-token store, safe for concurrent use.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, token_id: &str) -> Result<Option<ApiToken>, StoreError>;

    /// Best-effort "last seen" telemetry.
    async fn record_seen(&self, token_id: &str) -> Result<(), StoreError>;
}

pub mod memory {
    //! In-memory store implementations, for tests and embedded setups.

    use chrono::{DateTime, Utc};
    use dashmap::DashMap;

    use super::*;

    #[derive(Debug, Default)]
    pub struct MemoryUserStore {
        users: DashMap<String, User>,
        last_seen: DashMap<String, DateTime<Utc>>,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, user: User) {
            self.users.insert(user.id.clone(), user);
        }

        pub fn last_seen(&self, user_id: &str) -> Option<DateTime<Utc>> {
            self.last_seen.get(user_id).map(|e| *e.value())
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn get(&self, user_id: &str) -> Result<Option<User>, StoreError> {
            Ok(self.users.get(user_id).map(|e| e.value().clone()))
        }

        async fn record_seen(&self, user_id: &str) -> Result<(), StoreError> {
            self.last_seen.insert(user_id.to_string(), Utc::now());
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct MemoryTokenStore {
        tokens: DashMap<String, ApiToken>,
        last_seen: DashMap<String, DateTime<Utc>>,
    }

    impl MemoryTokenStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, token: ApiToken) {
            self.tokens.insert(token.id.clone(), token);
        }

        pub fn last_seen(&self, token_id: &str) -> Option<DateTime<Utc>> {
            self.last_seen.get(token_id).map(|e| *e.value())
        }
    }

    #[async_trait]
    impl TokenStore for MemoryTokenStore {
        async fn get(&self, token_id: &str) -> Result<Option<ApiToken>, StoreError> {
            Ok(self.tokens.get(token_id).map(|e| e.value().clone()))
        }

        async fn record_seen(&self, token_id: &str) -> Result<(), StoreError> {
            self.last_seen.insert(token_id.to_string(), Utc::now());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(access: Option<AccessPolicy>) -> ApiToken {
        ApiToken {
            id: "tok".to_string(),
            user_id: "user".to_string(),
            access,
        }
    }

    #[test]
    fn test_restricted_cors_requires_origins_without_full_access() {
        let restricted = token(Some(AccessPolicy {
            cors: Some(CorsSettings {
                allowed_origins: vec!["https://a.com".to_string()],
                full_access: false,
            }),
            rules: None,
        }));
        assert!(restricted.is_restricted_cors());

        let full_access = token(Some(AccessPolicy {
            cors: Some(CorsSettings {
                allowed_origins: vec!["https://a.com".to_string()],
                full_access: true,
            }),
            rules: None,
        }));
        assert!(!full_access.is_restricted_cors());

        let no_origins = token(Some(AccessPolicy {
            cors: Some(CorsSettings::default()),
            rules: None,
        }));
        assert!(!no_origins.is_restricted_cors());

        assert!(!token(None).is_restricted_cors());
    }

    #[test]
    fn test_explicit_rules_override_restriction() {
        let t = token(Some(AccessPolicy {
            cors: Some(CorsSettings {
                allowed_origins: vec!["https://a.com".to_string()],
                full_access: false,
            }),
            rules: Some(vec![AuthRule::new(&["get"], &["/stream/:id"])]),
        }));
        assert!(!t.is_restricted_cors());
    }

    #[test]
    fn test_token_document_round_trip() {
        let json = r#"{
            "id": "tok-1",
            "userId": "user-1",
            "access": {
                "cors": {"allowedOrigins": ["https://x.io"], "fullAccess": false},
                "rules": [{"methods": ["get"], "resources": ["/stream/:id"]}]
            }
        }"#;
        let t: ApiToken = serde_json::from_str(json).unwrap();
        assert_eq!(t.user_id, "user-1");
        assert_eq!(
            t.cors().unwrap().allowed_origins,
            vec!["https://x.io".to_string()]
        );
        assert_eq!(t.rules().unwrap().len(), 1);
    }
}
