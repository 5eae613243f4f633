//! Account and group resolution.

use crate::types::Subject;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A user account known to the security subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Account name.
    pub name: String,
    /// Primary group name.
    pub primary_group: String,
}

/// A group known to the security subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group name.
    pub name: String,
}

/// Resolves account and group names.
pub trait SecurityManager: Send + Sync {
    /// Looks up an account by name.
    fn account(&self, name: &str) -> Option<Account>;

    /// Looks up a group by name.
    fn group(&self, name: &str) -> Option<Group>;
}

/// An in-memory account and group registry.
///
/// Seeded with the [`Subject::SYSTEM_ACCOUNT`] account and the
/// [`Subject::DBA_GROUP`] group.
#[derive(Debug)]
pub struct MemorySecurityManager {
    accounts: RwLock<HashMap<String, Account>>,
    groups: RwLock<HashMap<String, Group>>,
}

impl MemorySecurityManager {
    /// Creates a registry holding only the built-in account and group.
    #[must_use]
    pub fn new() -> Self {
        let manager = Self {
            accounts: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
        };
        manager.add_group(Subject::DBA_GROUP);
        manager.add_account(Subject::SYSTEM_ACCOUNT, Subject::DBA_GROUP);
        manager
    }

    /// Registers a group.
    pub fn add_group(&self, name: &str) {
        self.groups.write().insert(
            name.to_string(),
            Group {
                name: name.to_string(),
            },
        );
    }

    /// Registers an account, creating its primary group if needed.
    pub fn add_account(&self, name: &str, primary_group: &str) {
        if self.group(primary_group).is_none() {
            self.add_group(primary_group);
        }
        self.accounts.write().insert(
            name.to_string(),
            Account {
                name: name.to_string(),
                primary_group: primary_group.to_string(),
            },
        );
    }

    /// Builds the subject for a registered account.
    #[must_use]
    pub fn subject(&self, name: &str) -> Option<Subject> {
        self.account(name)
            .map(|account| Subject::new(account.name, account.primary_group))
    }
}

impl Default for MemorySecurityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityManager for MemorySecurityManager {
    fn account(&self, name: &str) -> Option<Account> {
        self.accounts.read().get(name).cloned()
    }

    fn group(&self, name: &str) -> Option<Group> {
        self.groups.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_with_system_account() {
        let security = MemorySecurityManager::new();
        assert!(security.account("SYSTEM").is_some());
        assert!(security.group("dba").is_some());
        assert!(security.account("nobody").is_none());
    }

    #[test]
    fn account_creates_primary_group() {
        let security = MemorySecurityManager::new();
        security.add_account("alice", "editors");

        assert_eq!(security.account("alice").unwrap().primary_group, "editors");
        assert!(security.group("editors").is_some());

        let subject = security.subject("alice").unwrap();
        assert_eq!(subject.primary_group(), Some("editors"));
    }
}
