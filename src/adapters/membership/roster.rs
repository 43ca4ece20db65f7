//! Static membership from the configuration roster (group id -> member ids).

use crate::domain::DomainError;
use crate::ports::MembershipProvider;
use std::collections::HashMap;
use tracing::warn;

pub struct RosterMembership {
    groups: HashMap<String, Vec<String>>,
}

impl RosterMembership {
    pub fn new(groups: HashMap<String, Vec<String>>) -> Self {
        Self { groups }
    }
}

#[async_trait::async_trait]
impl MembershipProvider for RosterMembership {
    async fn list_members(&self, group_id: &str) -> Result<Vec<String>, DomainError> {
        match self.groups.get(group_id) {
            Some(members) => Ok(members
                .iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect()),
            None => {
                warn!(group_id, "group not in roster");
                Err(DomainError::membership(format!(
                    "group {} is not in the roster",
                    group_id
                )))
            }
        }
    }
}
