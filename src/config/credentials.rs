//! Per-target database credentials.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, expand_env_vars};

/// Key of the fallback credentials entry.
pub const DEFAULT_TARGET: &str = "default";

/// User/password pair for one database target.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,

    #[serde(rename = "pass", default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credential lookup keyed by exact target name, falling back to `default`.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: BTreeMap<String, Credentials>,
}

impl CredentialStore {
    /// Build a store from configured entries, expanding `${VAR}` references.
    pub fn new(entries: &BTreeMap<String, Credentials>) -> Self {
        let entries = entries
            .iter()
            .map(|(target, creds)| {
                (
                    target.clone(),
                    Credentials {
                        user: expand_env_vars(&creds.user),
                        password: expand_env_vars(&creds.password),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Credentials for `target`, or the `default` entry.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownTarget` if neither entry exists.
    pub fn credentials_for(&self, target: &str) -> Result<Credentials, ConfigError> {
        self.entries
            .get(target)
            .or_else(|| self.entries.get(DEFAULT_TARGET))
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTarget(target.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(user: &str, password: &str) -> Credentials {
        Credentials {
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_exact_target_wins_over_default() {
        let mut entries = BTreeMap::new();
        entries.insert("hana01:30015".to_string(), creds("MONITOR", "a"));
        entries.insert(DEFAULT_TARGET.to_string(), creds("SYSTEM", "b"));
        let store = CredentialStore::new(&entries);

        assert_eq!(store.credentials_for("hana01:30015").unwrap().user, "MONITOR");
        assert_eq!(store.credentials_for("hana02:30015").unwrap().user, "SYSTEM");
    }

    #[test]
    fn test_unknown_target_without_default() {
        let mut entries = BTreeMap::new();
        entries.insert("hana01:30015".to_string(), creds("MONITOR", "a"));
        let store = CredentialStore::new(&entries);

        let err = store.credentials_for("hana02:30015").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTarget(ref t) if t == "hana02:30015"));
    }

    #[test]
    fn test_password_env_expansion() {
        let mut entries = BTreeMap::new();
        entries.insert(
            DEFAULT_TARGET.to_string(),
            creds("SYSTEM", "${NONEXISTENT_HANA_PASS_98765:-fallback}"),
        );
        let store = CredentialStore::new(&entries);
        assert_eq!(store.credentials_for("any").unwrap().password, "fallback");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", creds("SYSTEM", "hunter2"));
        assert!(rendered.contains("SYSTEM"));
        assert!(!rendered.contains("hunter2"));
    }
}
