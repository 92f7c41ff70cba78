use std::collections::BTreeSet;

use crate::error::{JobPlaneError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Stop,
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Read => write!(f, "read"),
            Action::Update => write!(f, "update"),
            Action::Stop => write!(f, "stop"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// Decides whether `subject` may perform `action` on `resource`.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, subject: &str, action: Action, resource: &str) -> Result<()>;
}

/// Permits everything.
#[derive(Debug, Default, Clone)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _subject: &str, _action: Action, _resource: &str) -> Result<()> {
        Ok(())
    }
}

/// Permits only the listed subjects. An empty list permits everyone.
#[derive(Debug, Default, Clone)]
pub struct UserAllowList {
    users: BTreeSet<String>,
}

impl UserAllowList {
    pub fn new(users: impl IntoIterator<Item = String>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }
}

impl Authorizer for UserAllowList {
    fn authorize(&self, subject: &str, action: Action, resource: &str) -> Result<()> {
        if self.users.is_empty() || self.users.contains(subject) {
            return Ok(());
        }
        tracing::warn!(subject, %action, resource, "Permission denied");
        Err(JobPlaneError::PermissionDenied {
            subject: subject.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
        })
    }
}
