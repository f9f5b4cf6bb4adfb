//! Access-rule policy evaluation
//!
//! A policy is an ordered list of allow rules. Evaluation is a pure OR: any
//! rule that covers the request method and matches one of its resource
//! patterns allows the call. There are no deny rules and no precedence, so
//! adding a rule can never turn an allowed call into a denied one; the only
//! denial is "no rule matched".

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::{PathPattern, PatternError};

/// One allow rule: a set of HTTP verbs over a set of path patterns.
///
/// Methods are stored lowercase; resources use `:name` parameter segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRule {
    pub methods: Vec<String>,
    pub resources: Vec<String>,
}

impl AuthRule {
    pub fn new(methods: &[&str], resources: &[&str]) -> Self {
        Self {
            methods: methods.iter().map(|m| m.to_lowercase()).collect(),
            resources: resources.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("rule has an empty method list")]
    NoMethods,
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

#[derive(Debug)]
struct CompiledRule {
    methods: Vec<String>,
    resources: Vec<PathPattern>,
}

/// A compiled allow-list policy.
#[derive(Debug)]
pub struct AuthPolicy {
    rules: Vec<CompiledRule>,
}

impl AuthPolicy {
    /// Compile every resource pattern up front. Any malformed rule fails
    /// construction; callers on the request path treat that as a denial.
    pub fn new(rules: &[AuthRule]) -> Result<Self, PolicyError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.methods.is_empty() {
                return Err(PolicyError::NoMethods);
            }
            let resources: Vec<PathPattern> = rule
                .resources
                .iter()
                .map(|r| PathPattern::new(r))
                .collect::<Result<_, PatternError>>()?;
            compiled.push(CompiledRule {
                methods: rule.methods.iter().map(|m| m.to_lowercase()).collect(),
                resources,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Whether any rule allows the method (case-insensitive) on the path.
    pub fn allows(&self, method: &str, path: &str) -> bool {
        let method = method.to_lowercase();
        self.rules.iter().any(|rule| {
            rule.methods.contains(&method)
                && rule.resources.iter().any(|p| p.matches(path).is_some())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(rules: &[AuthRule]) -> AuthPolicy {
        AuthPolicy::new(rules).unwrap()
    }

    #[test]
    fn test_allows_matching_method_and_resource() {
        let p = policy(&[AuthRule::new(&["get", "patch"], &["/stream/:id"])]);
        assert!(p.allows("get", "/stream/abc"));
        assert!(p.allows("patch", "/stream/abc"));
        assert!(!p.allows("delete", "/stream/abc"));
        assert!(!p.allows("get", "/asset/abc"));
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let p = policy(&[AuthRule::new(&["get"], &["/stream"])]);
        assert!(p.allows("GET", "/stream"));
        assert!(p.allows("Get", "/stream"));
    }

    #[test]
    fn test_no_rule_matched_denies() {
        let p = policy(&[]);
        assert!(!p.allows("get", "/stream"));
    }

    #[test]
    fn test_or_across_rules() {
        let p = policy(&[
            AuthRule::new(&["get"], &["/stream/:id"]),
            AuthRule::new(&["post"], &["/stream"]),
        ]);
        assert!(p.allows("get", "/stream/abc"));
        assert!(p.allows("post", "/stream"));
        assert!(!p.allows("post", "/stream/abc"));
    }

    #[test]
    fn test_adding_a_rule_never_denies() {
        // monotonic OR semantics: an unrelated rule cannot shadow an allow
        let base = vec![AuthRule::new(&["get"], &["/stream/:id"])];
        let mut extended = base.clone();
        extended.push(AuthRule::new(&["delete"], &["/unrelated/:x"]));

        let before = policy(&base);
        let after = policy(&extended);
        for (method, path) in [("get", "/stream/abc"), ("get", "/stream/xyz")] {
            assert!(before.allows(method, path));
            assert!(after.allows(method, path));
        }
    }

    #[test]
    fn test_empty_methods_fails_construction() {
        let rules = vec![AuthRule {
            methods: vec![],
            resources: vec!["/stream".to_string()],
        }];
        assert!(matches!(
            AuthPolicy::new(&rules),
            Err(PolicyError::NoMethods)
        ));
    }

    #[test]
    fn test_malformed_resource_fails_construction() {
        let rules = vec![AuthRule::new(&["get"], &["stream/:id"])];
        assert!(matches!(
            AuthPolicy::new(&rules),
            Err(PolicyError::Pattern(_))
        ));
    }

    #[test]
    fn test_rule_serde_camel_case() {
        let rule: AuthRule =
            serde_json::from_str(r#"{"methods":["get"],"resources":["/stream/:id"]}"#).unwrap();
        assert_eq!(rule, AuthRule::new(&["get"], &["/stream/:id"]));
    }
}
