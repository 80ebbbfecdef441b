// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! C8: the read-only admin query surface - "what can this principal see"
//! and "who holds bindings on this resource".

use crate::action::Action;
use crate::db::models::RoleBindingRow;
use crate::db::role_store;
use crate::engine::{BindingSource, PolicyEngine};
use crate::error::Result;
use crate::resource::{ResourcePath, ResourceType};
use crate::role::Role;
use kavach_database::DbConnection;
use uuid::Uuid;

/// One resource a principal can reach, with the role and hierarchy level
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibleResource {
    pub path: ResourcePath,
    pub role: Role,
    pub source: BindingSource,
}

fn accessible_among(
    engine: &PolicyEngine,
    user_id: Uuid,
    candidates: Vec<ResourcePath>,
) -> Vec<AccessibleResource> {
    let mut out: Vec<AccessibleResource> = candidates
        .into_iter()
        .filter_map(|path| {
            let decision = engine.check_with_reason(user_id, Action::Read, &path);
            decision
                .allow
                .then(|| AccessibleResource {
                    role: decision.role.expect("allow implies a winning role"),
                    source: decision.source.expect("allow implies a winning source"),
                    path,
                })
        })
        .collect();

    // Resource names are resolved by an external collaborator (see
    // `SubjectResolver`); this crate only knows the canonical path, so
    // ordering falls back to it. Stable and deterministic either way.
    out.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
    out
}

pub fn list_accessible_organizations(engine: &PolicyEngine, user_id: Uuid) -> Vec<AccessibleResource> {
    accessible_among(engine, user_id, engine.known_resources(ResourceType::Organization))
}

pub fn list_accessible_secret_groups(
    engine: &PolicyEngine,
    user_id: Uuid,
    organization_id: Uuid,
) -> Vec<AccessibleResource> {
    let org_path = ResourcePath::organization(organization_id);
    let candidates = engine
        .snapshot_descendants(&org_path)
        .into_iter()
        .filter(|p| p.resource_type() == Some(ResourceType::SecretGroup))
        .collect();
    accessible_among(engine, user_id, candidates)
}

pub fn list_accessible_environments(
    engine: &PolicyEngine,
    user_id: Uuid,
    organization_id: Uuid,
    secret_group_id: Uuid,
) -> Vec<AccessibleResource> {
    let sg_path = ResourcePath::secret_group(organization_id, secret_group_id);
    let candidates = engine
        .snapshot_descendants(&sg_path)
        .into_iter()
        .filter(|p| p.resource_type() == Some(ResourceType::Environment))
        .collect();
    accessible_among(engine, user_id, candidates)
}

/// Every binding held on a single resource, for its settings/sharing page.
pub fn list_bindings(
    conn: &mut DbConnection,
    resource_type: ResourceType,
    resource_id: Uuid,
) -> Result<Vec<RoleBindingRow>> {
    role_store::list_bindings_for_resource(conn, &resource_type.to_string(), resource_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::RoleBindingRow as Row;
    use crate::index::PolicyIndex;
    use chrono::Utc;

    fn binding(user_id: Uuid, role: Role, resource_type: &str, resource_id: Uuid, org: Uuid) -> Row {
        Row {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            group_id: None,
            role,
            resource_type: resource_type.to_string(),
            resource_id,
            organization_id: org,
            secret_group_id: None,
            environment_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn lists_only_accessible_organizations() {
        let user = Uuid::new_v4();
        let visible = Uuid::new_v4();
        let hidden = Uuid::new_v4();

        // seed a second, inaccessible organization via an unrelated owner
        let other_user = Uuid::new_v4();
        let engine = PolicyEngine::new(PolicyIndex::build(
            vec![
                binding(user, Role::Viewer, "organization", visible, visible),
                binding(other_user, Role::Owner, "organization", hidden, hidden),
            ],
            vec![],
        ));

        let accessible = list_accessible_organizations(&engine, user);
        assert_eq!(accessible.len(), 1);
        assert_eq!(accessible[0].path, ResourcePath::organization(visible));
        assert_eq!(accessible[0].role, Role::Viewer);
        assert_eq!(accessible[0].source, BindingSource::Direct);
    }
}
