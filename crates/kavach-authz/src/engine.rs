// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! C4: the policy engine. Deterministic decisions over an immutable,
//! atomically-swapped index snapshot; no I/O on the decide path.

use crate::action::Action;
use crate::db::{membership_store, role_store};
use crate::error::Result;
use crate::index::PolicyIndex;
use crate::metrics::AuthzMetrics;
use crate::resource::{ResourcePath, ResourceType};
use crate::role::Role;
use crate::subject::Subject;
use arc_swap::ArcSwap;
use kavach_database::Db;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Which level of the hierarchy contributed the winning binding, surfaced
/// to the admin query surface (C8) for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    Direct,
    Group,
    SecretGroup,
    Organization,
}

/// The winning binding behind an allow/deny decision, for audit and debug.
#[derive(Debug, Clone)]
pub struct Decision {
    pub allow: bool,
    pub subject: Subject,
    pub resource: ResourcePath,
    pub role: Option<Role>,
    pub source: Option<BindingSource>,
}

/// A process-owned value; no global singleton. Handlers receive it via
/// explicit construction (see [`crate::lib`]'s `PolicyEngine` wiring).
#[derive(Clone)]
pub struct PolicyEngine {
    index: Arc<ArcSwap<PolicyIndex>>,
    metrics: Option<Arc<AuthzMetrics>>,
}

impl PolicyEngine {
    pub fn new(index: PolicyIndex) -> Self {
        Self {
            index: Arc::new(ArcSwap::new(Arc::new(index))),
            metrics: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(PolicyIndex::default())
    }

    /// Attaches the metrics instrumentation recorded around [`Self::reload`]
    /// and [`Self::check_with_reason`] from this point on.
    pub fn set_metrics(&mut self, metrics: Arc<AuthzMetrics>) {
        self.metrics = Some(metrics);
    }

    /// Rebuilds the index from the role and membership stores and
    /// atomically publishes the new snapshot. On failure the previous
    /// snapshot remains authoritative.
    #[tracing::instrument(skip(self, db))]
    pub fn reload(&self, db: &Db) -> Result<()> {
        let result = self.reload_inner(db);
        if let Some(metrics) = &self.metrics {
            metrics.record_reload(&result);
        }
        result
    }

    fn reload_inner(&self, db: &Db) -> Result<()> {
        let mut conn = db.get_conn()?;
        let bindings = role_store::list_all(&mut conn)?;
        let memberships = membership_store::list_all(&mut conn)?;
        let index = PolicyIndex::build(bindings, memberships);
        self.index.store(Arc::new(index));
        Ok(())
    }

    /// Spawns the background autoload task, rebuilding the index every
    /// `interval` until `shutdown` fires.
    pub fn spawn_autoload(
        self,
        db: Arc<Db>,
        interval: Duration,
        mut shutdown: Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.reload(&db) {
                            log::error!("policy index reload failed, serving stale snapshot: {e}");
                        }
                    }
                    _ = shutdown.recv() => {
                        log::debug!("stopping policy engine autoload");
                        break;
                    }
                }
            }
        })
    }

    /// `Allow(principal, action, resource) -> {allow, deny}`.
    pub fn decide(&self, user_id: Uuid, action: Action, resource: &ResourcePath) -> bool {
        self.check_with_reason(user_id, action, resource).allow
    }

    /// Same as [`decide`](Self::decide) but also returns the winning
    /// binding, for audit/debug.
    pub fn check_with_reason(
        &self,
        user_id: Uuid,
        action: Action,
        resource: &ResourcePath,
    ) -> Decision {
        let started_at = Instant::now();
        let decision = self.decide_inner(user_id, action, resource);
        if let Some(metrics) = &self.metrics {
            metrics.record_decision(started_at, decision.allow);
        }
        decision
    }

    fn decide_inner(&self, user_id: Uuid, action: Action, resource: &ResourcePath) -> Decision {
        let index = self.index.load();
        let subjects = index.subjects_for_user(user_id);
        let ancestors = resource.ancestors();

        let mut winner: Option<(Role, Subject, ResourcePath)> = None;

        for ancestor in &ancestors {
            for subject in &subjects {
                for role in index.direct_roles(*subject, ancestor) {
                    let better = match &winner {
                        None => true,
                        Some((best_role, _, _)) => role > *best_role,
                    };
                    if better {
                        winner = Some((role, *subject, ancestor.clone()));
                    }
                }
            }
        }

        match winner {
            None => Decision {
                allow: false,
                subject: Subject::User(user_id),
                resource: resource.clone(),
                role: None,
                source: None,
            },
            Some((role, subject, winning_path)) => {
                let allow = role.allows(action);
                let source = binding_source(resource, &winning_path, subject);
                Decision {
                    allow,
                    subject,
                    resource: resource.clone(),
                    role: Some(role),
                    source: Some(source),
                }
            }
        }
    }

    /// By-name lookup routes grant read access if the principal has at
    /// least viewer on any ancestor *or* any descendant of the named
    /// resource.
    pub fn decide_by_name(&self, user_id: Uuid, resource: &ResourcePath) -> bool {
        let index = self.index.load();
        let subjects = index.subjects_for_user(user_id);

        let ancestor_hit = resource
            .ancestors()
            .iter()
            .any(|a| subjects.iter().any(|s| !index.direct_roles(*s, a).is_empty()));

        if ancestor_hit {
            return true;
        }

        index
            .descendants_by_prefix(resource)
            .iter()
            .any(|d| subjects.iter().any(|s| !index.direct_roles(*s, d).is_empty()))
    }

    /// Every known path strictly below `path`, read from the current
    /// snapshot. Used by cascade revoke to bound its descendant scan.
    pub fn snapshot_descendants(&self, path: &ResourcePath) -> Vec<ResourcePath> {
        self.index.load().descendants_by_prefix(path)
    }

    /// Organization-level by-name route: allowed if the principal holds
    /// any binding at all, direct or via group membership. There is no
    /// narrower ancestor scope to check - the name has not been resolved
    /// to an organization id yet.
    pub fn decide_by_name_global(&self, user_id: Uuid) -> bool {
        let index = self.index.load();
        index.has_any_binding(&index.subjects_for_user(user_id))
    }

    /// Every known path of `resource_type`, for the admin query surface.
    pub fn known_resources(&self, resource_type: ResourceType) -> Vec<ResourcePath> {
        self.index.load().known_of_type(resource_type)
    }

    pub fn owner(&self, resource_type: ResourceType, resource_id: Uuid) -> Option<Subject> {
        self.index.load().owner(resource_type, resource_id)
    }

    pub fn groups_of(&self, user_id: Uuid) -> Vec<Uuid> {
        self.index.load().groups_of(user_id).to_vec()
    }
}

fn binding_source(queried: &ResourcePath, winning: &ResourcePath, subject: Subject) -> BindingSource {
    if winning == queried {
        match subject {
            Subject::User(_) => BindingSource::Direct,
            Subject::Group(_) => BindingSource::Group,
        }
    } else {
        match winning.resource_type() {
            Some(ResourceType::SecretGroup) => BindingSource::SecretGroup,
            _ => BindingSource::Organization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::RoleBindingRow;
    use chrono::Utc;

    fn binding(
        user_id: Uuid,
        role: Role,
        resource_type: &str,
        resource_id: Uuid,
        organization_id: Uuid,
        secret_group_id: Option<Uuid>,
        environment_id: Option<Uuid>,
    ) -> RoleBindingRow {
        RoleBindingRow {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            group_id: None,
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

    // S1: direct grant / read.
    #[test]
    fn direct_grant_allows_read_denies_create() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();

        let index = PolicyIndex::build(
            vec![binding(user, Role::Viewer, "organization", org, org, None, None)],
            vec![],
        );
        let engine = PolicyEngine::new(index);
        let path = ResourcePath::organization(org);

        assert!(engine.decide(user, Action::Read, &path));
        assert!(!engine.decide(user, Action::Create, &path));
    }

    // S2: inheritance.
    #[test]
    fn editor_on_org_inherits_to_secret_group() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let sg = Uuid::new_v4();

        let index = PolicyIndex::build(
            vec![binding(user, Role::Editor, "organization", org, org, None, None)],
            vec![],
        );
        let engine = PolicyEngine::new(index);
        let sg_path = ResourcePath::secret_group(org, sg);

        assert!(engine.decide(user, Action::Update, &sg_path));
        assert!(!engine.decide(user, Action::Delete, &sg_path));
    }

    fn group_binding(
        group_id: Uuid,
        role: Role,
        resource_type: &str,
        resource_id: Uuid,
        organization_id: Uuid,
        secret_group_id: Option<Uuid>,
        environment_id: Option<Uuid>,
    ) -> RoleBindingRow {
        let mut row = binding(
            Uuid::nil(),
            role,
            resource_type,
            resource_id,
            organization_id,
            secret_group_id,
            environment_id,
        );
        row.user_id = None;
        row.group_id = Some(group_id);
        row
    }

    // S3: group membership.
    #[test]
    fn group_binding_grants_then_revokes_on_membership_removal() {
        let user = Uuid::new_v4();
        let group = Uuid::new_v4();
        let org = Uuid::new_v4();
        let sg = Uuid::new_v4();

        let row = group_binding(group, Role::Admin, "secret_group", sg, org, Some(sg), None);
        let sg_path = ResourcePath::secret_group(org, sg);

        let engine = PolicyEngine::new(PolicyIndex::build(vec![row.clone()], vec![(group, user)]));
        assert!(engine.decide(user, Action::Grant, &sg_path));

        let engine = PolicyEngine::new(PolicyIndex::build(vec![row], vec![]));
        assert!(!engine.decide(user, Action::Grant, &sg_path));
    }

    // S6: by-name.
    #[test]
    fn by_name_allows_on_descendant_match() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let sg = Uuid::new_v4();
        let env = Uuid::new_v4();

        let index = PolicyIndex::build(
            vec![binding(
                user,
                Role::Viewer,
                "environment",
                env,
                org,
                Some(sg),
                Some(env),
            )],
            vec![],
        );
        let engine = PolicyEngine::new(index);

        let sg_path = ResourcePath::secret_group(org, sg);
        assert!(engine.decide_by_name(user, &sg_path));

        let other_org = Uuid::new_v4();
        let other_path = ResourcePath::organization(other_org);
        assert!(!engine.decide_by_name(user, &other_path));
    }

    #[test]
    fn global_by_name_requires_some_binding() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();

        let engine = PolicyEngine::new(PolicyIndex::build(
            vec![binding(user, Role::Viewer, "organization", org, org, None, None)],
            vec![],
        ));
        assert!(engine.decide_by_name_global(user));
        assert!(!engine.decide_by_name_global(Uuid::new_v4()));
    }
}
