//! Per-tool access policies evaluated against the caller identity

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

use serde::Deserialize;
use tracing::info;

use crate::{auth::Identity, config::ConfigError};

/// Attribute sets of one rule category. A present but empty set still counts
/// as specified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default)]
    pub dids: Option<BTreeSet<String>>,
    #[serde(default)]
    pub roles: Option<BTreeSet<String>>,
    #[serde(default)]
    pub providers: Option<BTreeSet<String>>,
    #[serde(default)]
    pub methods: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessPolicy {
    #[serde(default)]
    pub allow: Option<RuleSet>,
    #[serde(default)]
    pub deny: Option<RuleSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl RuleSet {
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: Some(roles.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    fn is_unspecified(&self) -> bool {
        self.dids.is_none()
            && self.roles.is_none()
            && self.providers.is_none()
            && self.methods.is_none()
    }

    fn matches(&self, identity: &Identity) -> bool {
        contains(&self.dids, &identity.did)
            || contains(&self.roles, &identity.role)
            || contains(&self.providers, &identity.provider)
            || identity
                .method
                .as_deref()
                .is_some_and(|method| contains(&self.methods, method))
    }
}

fn contains(set: &Option<BTreeSet<String>>, value: &str) -> bool {
    set.as_ref().is_some_and(|set| set.contains(value))
}

pub fn evaluate(identity: Option<&Identity>, policy: Option<&AccessPolicy>) -> Decision {
    let Some(policy) = policy else {
        return Decision::Allow;
    };

    let Some(identity) = identity else {
        return Decision::Deny;
    };

    if policy.deny.as_ref().is_some_and(|deny| deny.matches(identity)) {
        return Decision::Deny;
    }

    match policy.allow.as_ref() {
        Some(allow) if allow.is_unspecified() || allow.matches(identity) => Decision::Allow,
        Some(_) => Decision::Deny,
        None => Decision::Allow,
    }
}

/// Policies keyed by tool name. Tools without an entry are open to everyone.
#[derive(Debug, Clone, Default)]
pub struct ToolPolicies {
    policies: HashMap<String, AccessPolicy>,
}

impl ToolPolicies {
    pub fn builtin() -> Self {
        let mut policies = HashMap::new();
        policies.insert(
            "db-query".to_string(),
            AccessPolicy {
                allow: Some(RuleSet::roles(["admin", "owner"])),
                deny: None,
            },
        );
        policies.insert(
            "storytelling".to_string(),
            AccessPolicy {
                allow: Some(RuleSet::roles(["admin", "member", "owner"])),
                deny: None,
            },
        );
        Self { policies }
    }

    /// Builtin policies with the overrides from a JSON file applied on top.
    /// A `null` entry removes the policy of that tool.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut policies = Self::builtin();
        let Some(path) = path else {
            return Ok(policies);
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::PolicyFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let overrides: HashMap<String, Option<AccessPolicy>> = serde_json::from_str(&raw)
            .map_err(|source| ConfigError::PolicyFileParse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), tools = overrides.len(), "tool policy overrides loaded");
        for (tool, policy) in overrides {
            policies.set(tool, policy);
        }
        Ok(policies)
    }

    pub fn set(&mut self, tool: impl Into<String>, policy: Option<AccessPolicy>) {
        let tool = tool.into();
        match policy {
            Some(policy) => {
                self.policies.insert(tool, policy);
            }
            None => {
                self.policies.remove(&tool);
            }
        }
    }

    pub fn get(&self, tool: &str) -> Option<&AccessPolicy> {
        self.policies.get(tool)
    }

    pub fn check(&self, tool: &str, identity: Option<&Identity>) -> Decision {
        evaluate(identity, self.get(tool))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;

    fn user(did: &str, role: &str, provider: &str, method: Option<&str>) -> Identity {
        Identity {
            did: did.to_string(),
            role: role.to_string(),
            full_name: String::new(),
            provider: provider.to_string(),
            wallet_os: String::new(),
            method: method.map(str::to_string),
        }
    }

    fn set(values: &[&str]) -> Option<BTreeSet<String>> {
        Some(values.iter().map(|value| value.to_string()).collect())
    }

    #[test]
    fn no_policy_allows_anyone() {
        assert_eq!(evaluate(None, None), Decision::Allow);
        let alice = user("z1alice", "guest", "wallet", None);
        assert_eq!(evaluate(Some(&alice), None), Decision::Allow);
    }

    #[test]
    fn unauthenticated_caller_is_denied_when_any_policy_exists() {
        assert_eq!(evaluate(None, Some(&AccessPolicy::default())), Decision::Deny);
        let policy = AccessPolicy {
            allow: Some(RuleSet::default()),
            deny: None,
        };
        assert_eq!(evaluate(None, Some(&policy)), Decision::Deny);
    }

    #[test]
    fn allow_without_attributes_allows() {
        let alice = user("z1alice", "guest", "wallet", None);
        let policy = AccessPolicy {
            allow: Some(RuleSet::default()),
            deny: None,
        };
        assert_eq!(evaluate(Some(&alice), Some(&policy)), Decision::Allow);
    }

    #[test]
    fn deny_match_wins_over_allow_on_every_attribute() {
        let alice = user("z1alice", "admin", "github", Some("passkey"));
        let allow_everything = RuleSet {
            dids: set(&["z1alice"]),
            roles: set(&["admin"]),
            providers: set(&["github"]),
            methods: set(&["passkey"]),
        };

        let denials = [
            RuleSet {
                dids: set(&["z1alice"]),
                ..RuleSet::default()
            },
            RuleSet {
                roles: set(&["admin"]),
                ..RuleSet::default()
            },
            RuleSet {
                providers: set(&["github"]),
                ..RuleSet::default()
            },
            RuleSet {
                methods: set(&["passkey"]),
                ..RuleSet::default()
            },
        ];

        for deny in denials {
            let policy = AccessPolicy {
                allow: Some(allow_everything.clone()),
                deny: Some(deny),
            };
            assert_eq!(evaluate(Some(&alice), Some(&policy)), Decision::Deny);
        }
    }

    #[test]
    fn method_rules_ignore_callers_without_method() {
        let alice = user("z1alice", "admin", "wallet", None);
        let policy = AccessPolicy {
            allow: Some(RuleSet {
                methods: set(&["passkey"]),
                ..RuleSet::default()
            }),
            deny: Some(RuleSet {
                methods: set(&["passkey"]),
                ..RuleSet::default()
            }),
        };
        assert_eq!(evaluate(Some(&alice), Some(&policy)), Decision::Deny);

        let deny_only = AccessPolicy {
            allow: None,
            deny: policy.deny.clone(),
        };
        assert_eq!(evaluate(Some(&alice), Some(&deny_only)), Decision::Allow);
    }

    #[test]
    fn allow_requires_one_matching_attribute() {
        let policy = AccessPolicy {
            allow: Some(RuleSet::roles(["admin", "owner"])),
            deny: None,
        };
        let admin = user("z1a", "admin", "wallet", None);
        let guest = user("z1b", "guest", "wallet", None);

        assert_eq!(evaluate(Some(&admin), Some(&policy)), Decision::Allow);
        assert_eq!(evaluate(Some(&guest), Some(&policy)), Decision::Deny);
    }

    #[test]
    fn empty_allow_set_counts_as_specified() {
        let policy = AccessPolicy {
            allow: Some(RuleSet {
                dids: set(&[]),
                ..RuleSet::default()
            }),
            deny: None,
        };
        let alice = user("z1alice", "admin", "wallet", None);
        assert_eq!(evaluate(Some(&alice), Some(&policy)), Decision::Deny);
    }

    #[test]
    fn policies_deserialize_from_json() {
        let policy: AccessPolicy = serde_json::from_value(json!({
            "allow": { "roles": ["admin"] },
            "deny": { "dids": ["z1mallory"] }
        }))
        .expect("valid policy");

        assert_eq!(policy.allow, Some(RuleSet::roles(["admin"])));
        assert_eq!(
            policy.deny.and_then(|deny| deny.dids),
            set(&["z1mallory"])
        );

        let unknown = serde_json::from_value::<AccessPolicy>(json!({ "permit": {} }));
        assert!(unknown.is_err());
    }

    #[test]
    fn builtin_policies_protect_query_and_story_tools() {
        let policies = ToolPolicies::builtin();
        let member = user("z1m", "member", "wallet", None);
        let owner = user("z1o", "owner", "wallet", None);

        assert_eq!(policies.check("db-query", Some(&member)), Decision::Deny);
        assert_eq!(policies.check("db-query", Some(&owner)), Decision::Allow);
        assert_eq!(policies.check("storytelling", Some(&member)), Decision::Allow);
        assert_eq!(policies.check("calculator", None), Decision::Allow);
    }

    #[test]
    fn overrides_replace_and_remove_policies() {
        let mut policies = ToolPolicies::builtin();
        policies.set("db-query", None);
        policies.set(
            "calculator",
            Some(AccessPolicy {
                allow: None,
                deny: Some(RuleSet::roles(["guest"])),
            }),
        );

        let guest = user("z1g", "guest", "wallet", None);
        assert_eq!(policies.check("db-query", None), Decision::Allow);
        assert_eq!(policies.check("calculator", Some(&guest)), Decision::Deny);
    }

    #[test]
    fn load_without_path_returns_builtin() {
        let policies = ToolPolicies::load(None).expect("builtin policies");
        assert!(policies.get("db-query").is_some());
        assert!(policies.get("echo").is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ToolPolicies::load(Some(Path::new("/nonexistent/policies.json")))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::PolicyFileRead { .. }));
    }
}
