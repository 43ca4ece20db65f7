//! Membership from `GET /api/groups/{group_id}/members`.

use crate::adapters::rest::envelope::ApiClient;
use crate::domain::DomainError;
use crate::ports::MembershipProvider;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct GroupMember {
    user: MemberUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberUser {
    email_address: String,
}

pub struct RestMembership {
    api: ApiClient,
}

impl RestMembership {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

fn member_ids(members: Vec<GroupMember>) -> Vec<String> {
    members
        .into_iter()
        .map(|m| m.user.email_address.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

#[async_trait::async_trait]
impl MembershipProvider for RestMembership {
    async fn list_members(&self, group_id: &str) -> Result<Vec<String>, DomainError> {
        let members: Vec<GroupMember> = self
            .api
            .get(&["api", "groups", group_id, "members"])
            .await
            .map_err(DomainError::membership)?;
        let ids = member_ids(members);
        info!(group_id, members = ids.len(), "fetched group members");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rest::envelope::parse_envelope;

    #[test]
    fn test_member_ids_from_envelope() {
        let body = r#"{
            "success": true,
            "data": [
                {"user": {"emailAddress": "ann@example.com", "displayName": "Ann"}, "role": "OWNER"},
                {"user": {"emailAddress": " bo@example.com "}},
                {"user": {"emailAddress": ""}}
            ],
            "message": null
        }"#;
        let members: Vec<GroupMember> = parse_envelope(body).unwrap();
        assert_eq!(
            member_ids(members),
            vec!["ann@example.com".to_string(), "bo@example.com".to_string()]
        );
    }
}
