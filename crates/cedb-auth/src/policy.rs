use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Salt used for users that do not carry their own.
pub const DEFAULT_SALT: &str = "coreenginedb";

/// PBKDF2 iteration count for users that do not carry their own.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// A password-holding user as stored in `auth.users[]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// Hex-encoded PBKDF2-HMAC-SHA256 output. Empty means no password set.
    #[serde(rename = "hash", default)]
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

impl UserRecord {
    /// The user's own salt, or the policy default when unset or empty.
    pub fn effective_salt<'a>(&'a self, default: &'a str) -> &'a str {
        self.salt.as_deref().filter(|s| !s.is_empty()).unwrap_or(default)
    }

    /// The user's iteration count; zero or unset means the default.
    pub fn effective_iterations(&self) -> u32 {
        match self.iterations {
            Some(n) if n > 0 => n,
            _ => DEFAULT_ITERATIONS,
        }
    }
}

/// Authentication policy extracted from the config document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthPolicy {
    /// When false every request is granted as `disabled`.
    pub enabled: bool,
    pub api_keys: Vec<String>,
    pub users: Vec<UserRecord>,
    pub default_salt: String,
}

impl Default for AuthPolicy {
    /// Enabled, with no keys and no users: nothing is granted.
    fn default() -> Self {
        Self {
            enabled: true,
            api_keys: Vec::new(),
            users: Vec::new(),
            default_salt: DEFAULT_SALT.to_string(),
        }
    }
}

impl AuthPolicy {
    /// Extract the policy from raw config bytes.
    ///
    /// Bytes that are not a JSON object yield [`AuthPolicy::default`], so a
    /// corrupt config locks writes instead of opening them.
    pub fn from_config_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_config_value(&value),
            Err(e) => {
                warn!(error = %e, "config document is not JSON; using locked-down auth policy");
                Self::default()
            }
        }
    }

    /// Extract the policy from a decoded config document.
    ///
    /// Each field is read on its own. A malformed API key or user entry is
    /// skipped with a warning and never voids the rest of the policy.
    pub fn from_config_value(value: &Value) -> Self {
        let Some(config) = value.as_object() else {
            warn!("config document is not an object; using locked-down auth policy");
            return Self::default();
        };
        let auth = config.get("auth").and_then(Value::as_object);
        let auth_field = |name: &str| auth.and_then(|a| a.get(name));

        let api_keys = config
            .get("apiKeys")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .enumerate()
                    .filter_map(|(index, key)| match key.as_str() {
                        Some(key) => Some(key.to_string()),
                        None => {
                            warn!(index, "ignoring non-string entry in apiKeys");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let users = auth_field("users")
            .and_then(Value::as_array)
            .map(|users| {
                users
                    .iter()
                    .enumerate()
                    .filter_map(|(index, user)| match UserRecord::deserialize(user) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            warn!(index, error = %e, "ignoring malformed entry in auth.users");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let default_salt = auth_field("salt")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SALT)
            .to_string();

        Self {
            // Only an explicit `false` turns auth off.
            enabled: auth_field("enabled") != Some(&Value::Bool(false)),
            api_keys,
            users,
            default_salt,
        }
    }

    /// Exact-match lookup of an API key.
    pub fn has_api_key(&self, key: &str) -> bool {
        !key.is_empty() && self.api_keys.iter().any(|k| k == key)
    }

    pub fn find_user(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let cfg = br#"{
            "auth": {
                "enabled": true,
                "salt": "pepper",
                "users": [
                    {"username": "alice", "hash": "ab", "salt": "s1", "iterations": 1000},
                    {"username": "bob", "hash": "cd"}
                ]
            },
            "apiKeys": ["k1", "k2"],
            "unrelated": {"x": 1}
        }"#;
        let p = AuthPolicy::from_config_bytes(cfg);
        assert!(p.enabled);
        assert_eq!(p.default_salt, "pepper");
        assert_eq!(p.api_keys, vec!["k1", "k2"]);
        assert_eq!(p.users.len(), 2);

        let alice = p.find_user("alice").unwrap();
        assert_eq!(alice.effective_salt(&p.default_salt), "s1");
        assert_eq!(alice.effective_iterations(), 1000);

        let bob = p.find_user("bob").unwrap();
        assert_eq!(bob.effective_salt(&p.default_salt), "pepper");
        assert_eq!(bob.effective_iterations(), DEFAULT_ITERATIONS);
        assert!(p.find_user("carol").is_none());
    }

    #[test]
    fn only_explicit_false_disables() {
        assert!(!AuthPolicy::from_config_bytes(br#"{"auth":{"enabled":false}}"#).enabled);
        assert!(AuthPolicy::from_config_bytes(br#"{"auth":{}}"#).enabled);
        assert!(AuthPolicy::from_config_bytes(br#"{}"#).enabled);
        assert!(AuthPolicy::from_config_bytes(br#"{"auth":{"enabled":null}}"#).enabled);
    }

    #[test]
    fn garbage_config_is_locked_down() {
        assert_eq!(AuthPolicy::from_config_bytes(b"not json"), AuthPolicy::default());
        assert_eq!(AuthPolicy::from_config_bytes(b"[1,2]"), AuthPolicy::default());
        assert_eq!(
            AuthPolicy::from_config_bytes(br#"{"auth":{"enabled":"false"}}"#),
            AuthPolicy::default()
        );
    }

    #[test]
    fn malformed_entries_do_not_void_the_policy() {
        let p = AuthPolicy::from_config_bytes(
            br#"{"auth":{"enabled":false,"users":[{"name":"x"}]},"apiKeys":["k1"]}"#,
        );
        assert!(!p.enabled);
        assert!(p.users.is_empty());
        assert!(p.has_api_key("k1"));
    }

    #[test]
    fn bad_entries_are_skipped_one_by_one() {
        let p = AuthPolicy::from_config_bytes(
            br#"{
                "auth": {
                    "users": [
                        {"hash": "no-username"},
                        {"username": "carol", "hash": "ab", "iterations": "1000"},
                        {"username": "dave", "hash": "cd"}
                    ],
                    "salt": 42
                },
                "apiKeys": [7, "k2", null]
            }"#,
        );
        assert!(p.enabled);
        assert_eq!(p.api_keys, vec!["k2"]);
        assert_eq!(p.users.len(), 1);
        assert!(p.find_user("dave").is_some());
        assert_eq!(p.default_salt, DEFAULT_SALT);
    }

    #[test]
    fn nulls_are_tolerated() {
        let p = AuthPolicy::from_config_bytes(
            br#"{"auth":{"users":null,"salt":null},"apiKeys":null}"#,
        );
        assert!(p.users.is_empty());
        assert!(p.api_keys.is_empty());
        assert_eq!(p.default_salt, DEFAULT_SALT);
    }

    #[test]
    fn empty_api_key_never_matches() {
        let p = AuthPolicy::from_config_bytes(br#"{"apiKeys":[""]}"#);
        assert!(!p.has_api_key(""));
    }

    #[test]
    fn zero_iterations_means_default() {
        let u = UserRecord { username: "z".into(), iterations: Some(0), ..Default::default() };
        assert_eq!(u.effective_iterations(), DEFAULT_ITERATIONS);
    }

    #[test]
    fn user_record_serializes_with_hash_key() {
        let u = UserRecord {
            username: "alice".into(),
            password_hash: "00ff".into(),
            salt: Some("s".into()),
            iterations: None,
        };
        let v = serde_json::to_value(&u).unwrap();
        assert_eq!(v["hash"], "00ff");
        assert!(v.get("iterations").is_none());
    }
}
