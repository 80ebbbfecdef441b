// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! The derived, in-memory projections C4 decides against.
//!
//! Two projections are maintained, per the data model: subject -> bindings,
//! and a path set supporting bounded descendant-prefix scans. Both are
//! rebuilt from C1/C2 on startup and on every autoload tick, then published
//! as one immutable snapshot (see [`crate::engine::PolicyEngine`]).

use crate::db::models::RoleBindingRow;
use crate::resource::{ResourcePath, ResourceType};
use crate::role::Role;
use crate::subject::Subject;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// An immutable, point-in-time snapshot of the policy store.
#[derive(Debug, Default)]
pub struct PolicyIndex {
    bindings_by_subject: HashMap<Subject, Vec<(ResourcePath, Role)>>,
    groups_of_user: HashMap<Uuid, Vec<Uuid>>,
    known_paths: BTreeSet<String>,
    owners: HashMap<(ResourceType, Uuid), Subject>,
}

impl PolicyIndex {
    /// Rebuilds the index from the raw rows of the role and membership
    /// stores. Malformed rows (those whose denormalized ids cannot be
    /// reassembled into a canonical path) are logged and skipped rather than
    /// aborting the whole rebuild.
    pub fn build(bindings: Vec<RoleBindingRow>, memberships: Vec<(Uuid, Uuid)>) -> Self {
        let mut bindings_by_subject: HashMap<Subject, Vec<(ResourcePath, Role)>> = HashMap::new();
        let mut known_paths = BTreeSet::new();
        let mut owners = HashMap::new();

        for row in bindings {
            let path = match reconstruct_path(&row) {
                Some(path) => path,
                None => {
                    log::warn!(
                        "skipping malformed role binding {} during index rebuild",
                        row.id
                    );
                    continue;
                }
            };

            let subject = match (row.user_id, row.group_id) {
                (Some(uid), None) => Subject::User(uid),
                (None, Some(gid)) => Subject::Group(gid),
                _ => {
                    log::warn!(
                        "skipping role binding {} with invalid subject tagging",
                        row.id
                    );
                    continue;
                }
            };

            let resource_type = match row.resource_type.parse::<ResourceType>() {
                Ok(rt) => rt,
                Err(_) => {
                    log::warn!(
                        "skipping role binding {} with unknown resource type {}",
                        row.id,
                        row.resource_type
                    );
                    continue;
                }
            };

            known_paths.insert(path.as_str().to_string());

            if row.role == Role::Owner {
                owners.insert((resource_type, row.resource_id), subject);
            }

            bindings_by_subject
                .entry(subject)
                .or_default()
                .push((path, row.role));
        }

        let mut groups_of_user: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (group_id, user_id) in memberships {
            groups_of_user.entry(user_id).or_default().push(group_id);
        }

        Self {
            bindings_by_subject,
            groups_of_user,
            known_paths,
            owners,
        }
    }

    /// The subject set S = `{User(uid)}` union the groups `uid` belongs to.
    pub fn subjects_for_user(&self, user_id: Uuid) -> Vec<Subject> {
        let mut subjects = vec![Subject::User(user_id)];
        if let Some(groups) = self.groups_of_user.get(&user_id) {
            subjects.extend(groups.iter().map(|g| Subject::Group(*g)));
        }
        subjects
    }

    /// Direct (non-inherited) roles granted to `subject` on exactly `path`.
    pub fn direct_roles(&self, subject: Subject, path: &ResourcePath) -> Vec<Role> {
        self.bindings_by_subject
            .get(&subject)
            .map(|bindings| {
                bindings
                    .iter()
                    .filter(|(p, _)| p == path)
                    .map(|(_, role)| *role)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every path strictly below `path` that appears in at least one
    /// binding, used by the by-name descendant scan.
    pub fn descendants_by_prefix(&self, path: &ResourcePath) -> Vec<ResourcePath> {
        let prefix = format!("{}/", path.as_str());
        self.known_paths
            .iter()
            .filter(|p| p.starts_with(&prefix))
            .map(|p| ResourcePath::from(p.clone()))
            .collect()
    }

    pub fn owner(&self, resource_type: ResourceType, resource_id: Uuid) -> Option<Subject> {
        self.owners.get(&(resource_type, resource_id)).copied()
    }

    pub fn groups_of(&self, user_id: Uuid) -> &[Uuid] {
        self.groups_of_user
            .get(&user_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True if `subjects` holds at least one binding anywhere. Used by the
    /// organization-level by-name route, which has no narrower ancestor
    /// scope to check against.
    pub fn has_any_binding(&self, subjects: &[Subject]) -> bool {
        subjects
            .iter()
            .any(|s| self.bindings_by_subject.get(s).is_some_and(|b| !b.is_empty()))
    }

    /// Every known path whose terminal segment denotes `resource_type`,
    /// used by the admin query surface to enumerate candidates before
    /// filtering by decision.
    pub fn known_of_type(&self, resource_type: ResourceType) -> Vec<ResourcePath> {
        self.known_paths
            .iter()
            .map(|p| ResourcePath::from(p.clone()))
            .filter(|p| p.resource_type() == Some(resource_type))
            .collect()
    }
}

fn reconstruct_path(row: &RoleBindingRow) -> Option<ResourcePath> {
    match row.resource_type.as_str() {
        "organization" => Some(ResourcePath::organization(row.organization_id)),
        "secret_group" => Some(ResourcePath::secret_group(
            row.organization_id,
            row.secret_group_id?,
        )),
        "environment" => Some(ResourcePath::environment(
            row.organization_id,
            row.secret_group_id?,
            row.environment_id?,
        )),
        "user_group" => Some(ResourcePath::user_group(row.organization_id, row.resource_id)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(
        id: Uuid,
        user_id: Option<Uuid>,
        group_id: Option<Uuid>,
        role: Role,
        resource_type: &str,
        resource_id: Uuid,
        organization_id: Uuid,
        secret_group_id: Option<Uuid>,
        environment_id: Option<Uuid>,
    ) -> RoleBindingRow {
        RoleBindingRow {
            id,
            user_id,
            group_id,
            role,
            resource_type: resource_type.to_string(),
            resource_id,
            organization_id,
            secret_group_id,
            environment_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rebuild_skips_malformed_rows() {
        let org = Uuid::new_v4();
        let bad = row(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            None,
            Role::Viewer,
            "secret_group",
            Uuid::new_v4(),
            org,
            None, // missing secret_group_id makes this malformed
            None,
        );
        let index = PolicyIndex::build(vec![bad], vec![]);
        assert!(index.known_paths.is_empty());
    }

    #[test]
    fn direct_roles_and_descendants() {
        let org = Uuid::new_v4();
        let sg = Uuid::new_v4();
        let user = Uuid::new_v4();

        let org_binding = row(
            Uuid::new_v4(),
            Some(user),
            None,
            Role::Editor,
            "organization",
            org,
            org,
            None,
            None,
        );
        let sg_binding = row(
            Uuid::new_v4(),
            Some(user),
            None,
            Role::Viewer,
            "secret_group",
            sg,
            org,
            Some(sg),
            None,
        );

        let index = PolicyIndex::build(vec![org_binding, sg_binding], vec![]);

        let org_path = ResourcePath::organization(org);
        assert_eq!(
            index.direct_roles(Subject::User(user), &org_path),
            vec![Role::Editor]
        );

        let descendants = index.descendants_by_prefix(&org_path);
        assert_eq!(descendants, vec![ResourcePath::secret_group(org, sg)]);
    }
}
