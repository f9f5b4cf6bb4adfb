//! Authorization engine configuration

use serde::Deserialize;

use crate::policy::AuthRule;

/// Configuration consumed by the authorization engine. Every field has a
/// default so a partial document deserializes cleanly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// Phrase used to sign and verify dashboard JWTs.
    pub jwt_secret: String,
    /// Expected JWT `aud` claim. Unset disables audience validation.
    pub jwt_audience: Option<String>,
    /// Mount prefix stripped from paths before policy evaluation.
    pub http_prefix: String,
    /// Globally require a verified email address. Routes can opt out via
    /// `Requirements::allow_unverified`.
    pub require_email_verification: bool,
    /// Path prefixes that always allow any origin.
    pub any_origin_path_prefixes: Vec<String>,
    /// Origins allowed for requests without an API token (dashboard/JWT
    /// callers). Entries wrapped in `/` are parsed as regex.
    pub jwt_origins: Vec<String>,
    /// Rule set substituted for tokens whose CORS config is restricted and
    /// that carry no explicit rules of their own.
    pub cors_api_key_rules: Vec<AuthRule>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_audience: None,
            http_prefix: "/api".to_string(),
            require_email_verification: false,
            any_origin_path_prefixes: Vec::new(),
            jwt_origins: Vec::new(),
            cors_api_key_rules: default_cors_api_key_rules(),
        }
    }
}

/// Operations a CORS-restricted API key may call when its token carries no
/// explicit rules: the surface needed by in-browser playback and upload
/// widgets.
pub fn default_cors_api_key_rules() -> Vec<AuthRule> {
    vec![
        // Live streaming
        AuthRule::new(
            &["get"],
            &[
                "/stream/:id/sessions",
                "/stream/sessions/:parentId",
                "/session/:id",
            ],
        ),
        AuthRule::new(&["get", "patch"], &["/stream/:id", "/multistream/target/:id"]),
        AuthRule::new(&["post"], &["/stream", "/multistream/target"]),
        // VOD
        AuthRule::new(&["get"], &["/task/:id"]),
        AuthRule::new(&["get", "patch"], &["/asset/:id"]),
        AuthRule::new(
            &["post"],
            &[
                "/asset/upload/url",
                "/asset/request-upload",
                "/asset/:id/transcode",
                "/asset/:id/export",
            ],
        ),
        // Viewership data
        AuthRule::new(
            &["get"],
            &[
                "/data/views/:id/total",
                "/data/views/query/total/:id",
                "/data/views/query/creator",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AuthPolicy;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.http_prefix, "/api");
        assert!(!config.require_email_verification);
        assert!(!config.cors_api_key_rules.is_empty());
    }

    #[test]
    fn test_partial_document_deserializes() {
        let config: AuthConfig = serde_json::from_str(
            r#"{"jwtSecret": "s3cret", "jwtAudience": "streamgate-api", "requireEmailVerification": true}"#,
        )
        .unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.jwt_audience.as_deref(), Some("streamgate-api"));
        assert!(config.require_email_verification);
        assert_eq!(config.http_prefix, "/api");
    }

    #[test]
    fn test_default_restricted_rules_compile() {
        let policy = AuthPolicy::new(&default_cors_api_key_rules()).unwrap();
        assert!(policy.allows("post", "/stream"));
        assert!(policy.allows("get", "/stream/abc"));
        assert!(policy.allows("patch", "/asset/abc"));
        assert!(!policy.allows("post", "/room"));
        assert!(!policy.allows("delete", "/stream/abc"));
    }
}
