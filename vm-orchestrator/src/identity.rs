use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;
use vm_core::LEAST_PRIVILEGED_ROLE;

use crate::error::OrchestratorError;

/// Resolves an authenticated principal to a role name.
///
/// Implementations return [`LEAST_PRIVILEGED_ROLE`] when the principal has no
/// role they can determine.
pub trait RoleResolver: Send + Sync {
    fn resolve_role(&self, principal: &str) -> String;
}

/// Fixed principal-to-role mapping, typically loaded from configuration.
///
/// Principals match case-insensitively; roles are stored upper-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDirectory {
    roles: HashMap<String, String>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, principal: &str, role: &str) -> Self {
        self.insert(principal, role);
        self
    }

    pub fn insert(&mut self, principal: &str, role: &str) {
        self.roles.insert(
            principal.trim().to_lowercase(),
            role.trim().to_uppercase(),
        );
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl RoleResolver for RoleDirectory {
    fn resolve_role(&self, principal: &str) -> String {
        match self.roles.get(&principal.trim().to_lowercase()) {
            Some(role) => role.clone(),
            None => {
                debug!(principal, "No role on record, using least privilege");
                LEAST_PRIVILEGED_ROLE.to_string()
            }
        }
    }
}

/// Parses `principal=ROLE` pairs separated by commas, e.g. `alice=ADMIN,bob=DEV`.
impl FromStr for RoleDirectory {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut directory = RoleDirectory::new();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (principal, role) = entry
                .split_once('=')
                .map(|(p, r)| (p.trim(), r.trim()))
                .filter(|(p, r)| !p.is_empty() && !r.is_empty())
                .ok_or_else(|| {
                    OrchestratorError::InvalidInput(format!(
                        "Invalid role directory entry '{}', expected principal=ROLE",
                        entry
                    ))
                })?;
            directory.insert(principal, role);
        }

        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_principal_resolves_role() {
        let directory = RoleDirectory::new().with_role("Alice", "admin");
        assert_eq!(directory.resolve_role("alice"), "ADMIN");
        assert_eq!(directory.resolve_role(" ALICE "), "ADMIN");
    }

    #[test]
    fn test_unknown_principal_is_trainee() {
        let directory = RoleDirectory::new().with_role("alice", "ADMIN");
        assert_eq!(directory.resolve_role("mallory"), "TRAINEE");
        assert_eq!(directory.resolve_role(""), "TRAINEE");
    }

    #[test]
    fn test_parse_directory() {
        let directory: RoleDirectory = "alice=ADMIN, bob = dev,,".parse().unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.resolve_role("bob"), "DEV");
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        for input in ["alice", "alice=", "=ADMIN"] {
            assert!(
                matches!(
                    input.parse::<RoleDirectory>(),
                    Err(OrchestratorError::InvalidInput(_))
                ),
                "input {:?}",
                input
            );
        }
    }
}
