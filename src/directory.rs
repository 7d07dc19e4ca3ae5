use std::collections::HashMap;

use async_trait::async_trait;
use ulid::Ulid;

/// A platform user, as much of one as the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Ulid,
    pub name: Option<String>,
}

/// Lookup into the platform's user store. Registration, login, and profile
/// data live upstream; the engine only checks existence when a guest books.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Ulid) -> Option<UserRecord>;
}

/// Accepts every well-formed id. The server default: the platform in front
/// of this engine has already authenticated its users.
pub struct OpenDirectory;

#[async_trait]
impl UserDirectory for OpenDirectory {
    async fn find_user(&self, id: Ulid) -> Option<UserRecord> {
        Some(UserRecord { id, name: None })
    }
}

/// Fixed membership. Used by tests to exercise unknown-guest rejection.
#[derive(Default)]
pub struct StaticDirectory {
    users: HashMap<Ulid, UserRecord>,
}

impl StaticDirectory {
    pub fn new(ids: impl IntoIterator<Item = Ulid>) -> Self {
        Self {
            users: ids
                .into_iter()
                .map(|id| (id, UserRecord { id, name: None }))
                .collect(),
        }
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn find_user(&self, id: Ulid) -> Option<UserRecord> {
        self.users.get(&id).cloned()
    }
}
