// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! C5: grant/revoke orchestration, cascade, ownership transfer, and the
//! resource-lifecycle hooks published by collaborating services.

use crate::db::models::NewRoleBinding;
use crate::db::{hierarchy_store, role_store};
use crate::engine::PolicyEngine;
use crate::error::{Error, Result};
use crate::resource::{ResourcePath, ResourceType};
use crate::role::Role;
use crate::subject::Subject;
use kavach_database::Db;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Resolves the external names carried in admin-route request bodies into
/// the opaque ids the store keys on. Authentication and identity are out of
/// scope for the authorization core; this is the named interface to those
/// collaborators.
pub trait SubjectResolver: Send + Sync {
    fn resolve_user(&self, name: &str) -> Result<Uuid>;
    fn resolve_group(&self, name: &str) -> Result<Uuid>;
}

/// The typed body of `/permissions/grant` and `/permissions/revoke`.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionRequest {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    pub role: Role,
    pub resource_type: ResourceType,
    pub resource_id: Uuid,
    pub organization_id: Uuid,
    #[serde(default)]
    pub secret_group_id: Option<Uuid>,
    #[serde(default)]
    pub environment_id: Option<Uuid>,
}

impl PermissionRequest {
    fn resolve_subject(&self, resolver: &dyn SubjectResolver) -> Result<Subject> {
        match (&self.user_name, &self.group_name) {
            (Some(_), Some(_)) => Err(Error::AmbiguousSubject),
            (None, None) => Err(Error::MissingSubject),
            (Some(name), None) => Ok(Subject::User(resolver.resolve_user(name)?)),
            (None, Some(name)) => Ok(Subject::Group(resolver.resolve_group(name)?)),
        }
    }

    pub(crate) fn resource_path(&self) -> Result<ResourcePath> {
        build_resource_path(
            self.resource_type,
            self.organization_id,
            self.secret_group_id,
            self.environment_id,
            self.resource_id,
        )
    }
}

fn build_resource_path(
    resource_type: ResourceType,
    organization_id: Uuid,
    secret_group_id: Option<Uuid>,
    _environment_id: Option<Uuid>,
    resource_id: Uuid,
) -> Result<ResourcePath> {
    match resource_type {
        ResourceType::Organization => Ok(ResourcePath::organization(organization_id)),
        ResourceType::SecretGroup => Ok(ResourcePath::secret_group(organization_id, resource_id)),
        ResourceType::Environment => {
            let secret_group_id = secret_group_id.ok_or_else(|| {
                Error::InvalidBody("environment resources require secret_group_id".into())
            })?;
            Ok(ResourcePath::environment(
                organization_id,
                secret_group_id,
                resource_id,
            ))
        }
        ResourceType::UserGroup => Ok(ResourcePath::user_group(organization_id, resource_id)),
    }
}

/// Orchestrates all policy mutations. Owns the database pool and the
/// engine whose index it republishes after every committed change.
pub struct AuthzService {
    db: Arc<Db>,
    engine: PolicyEngine,
}

impl AuthzService {
    pub fn new(db: Arc<Db>, engine: PolicyEngine) -> Self {
        Self { db, engine }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// Grant(subject, role, resource). Idempotent on retry only insofar as
    /// a second call against the same `(subject, resource)` surfaces
    /// [`Error::DuplicateBinding`] rather than silently upserting - callers
    /// that want idempotent retries should treat that error as success.
    ///
    /// `acting_user` must already hold `Action::Grant` on the target
    /// resource (checked here, not left to the caller) - this is the same
    /// check the enforcement middleware runs for path-parameterized
    /// routes, applied to the body-driven `/permissions/grant` route.
    #[tracing::instrument(skip(self, resolver, request))]
    pub fn grant(
        &self,
        acting_user: Uuid,
        resolver: &dyn SubjectResolver,
        request: &PermissionRequest,
    ) -> Result<()> {
        let subject = request.resolve_subject(resolver)?;
        let resource_path = request.resource_path()?;

        if !self.engine.decide(acting_user, crate::action::Action::Grant, &resource_path) {
            return Err(Error::AccessDenied);
        }

        let (user_id, group_id) = match subject {
            Subject::User(id) => (Some(id), None),
            Subject::Group(id) => (None, Some(id)),
        };

        let new_binding = NewRoleBinding {
            id: Uuid::new_v4(),
            user_id,
            group_id,
            role: request.role,
            resource_type: request.resource_type.to_string(),
            resource_id: request.resource_id,
            organization_id: request.organization_id,
            secret_group_id: request.secret_group_id,
            environment_id: request.environment_id,
        };

        let mut conn = self.db.get_conn()?;
        role_store::insert(&mut conn, new_binding)?;
        drop(conn);

        self.engine.reload(&self.db)
    }

    /// Revoke(subject, role, resource): delete the exact binding, cascade
    /// to descendants of the same subject, transfer ownership of any child
    /// resources the subject owned, then republish the index.
    ///
    /// `acting_user` must already hold `Action::Revoke` on the target
    /// resource, checked before any mutation runs - see [`Self::grant`].
    ///
    /// The primary revoke commits unconditionally; cascade and
    /// ownership-transfer failures are reported but do not roll it back
    /// (see the error-handling recovery policy: the only invariant
    /// preserved is that policy becomes more restrictive, never less).
    #[tracing::instrument(skip(self, resolver, request))]
    pub fn revoke(
        &self,
        acting_user: Uuid,
        resolver: &dyn SubjectResolver,
        request: &PermissionRequest,
    ) -> Result<()> {
        let subject = request.resolve_subject(resolver)?;
        let resource_path = request.resource_path()?;

        if !self.engine.decide(acting_user, crate::action::Action::Revoke, &resource_path) {
            return Err(Error::AccessDenied);
        }

        let mut conn = self.db.get_conn()?;

        role_store::delete_exact(
            &mut conn,
            subject,
            request.role,
            &request.resource_type.to_string(),
            request.resource_id,
        )?;

        let descendants = self.engine.snapshot_descendants(&resource_path);
        let descendant_ids: Vec<Uuid> = descendants
            .iter()
            .filter_map(|p| resource_id_of(p))
            .collect();
        if !descendant_ids.is_empty() {
            role_store::delete_for_subject_in_resources(&mut conn, subject, &descendant_ids)?;
        }

        let transfer_result = transfer_ownership_if_needed(&mut conn, request, subject);

        drop(conn);

        self.engine.reload(&self.db)?;

        transfer_result
    }

    /// Resource-create lifecycle hook: insert the owner binding and link
    /// the hierarchy edge to the parent.
    #[tracing::instrument(skip(self))]
    pub fn on_resource_create(
        &self,
        owner: Uuid,
        resource_type: ResourceType,
        resource_id: Uuid,
        organization_id: Uuid,
        secret_group_id: Option<Uuid>,
        environment_id: Option<Uuid>,
        parent_path: Option<&ResourcePath>,
    ) -> Result<()> {
        let path = build_resource_path(
            resource_type,
            organization_id,
            secret_group_id,
            environment_id,
            resource_id,
        )?;

        let mut conn = self.db.get_conn()?;
        role_store::insert(
            &mut conn,
            NewRoleBinding {
                id: Uuid::new_v4(),
                user_id: Some(owner),
                group_id: None,
                role: Role::Owner,
                resource_type: resource_type.to_string(),
                resource_id,
                organization_id,
                secret_group_id,
                environment_id,
            },
        )?;

        if let Some(parent) = parent_path {
            hierarchy_store::add_edge(&mut conn, parent.as_str(), path.as_str())?;
        }
        drop(conn);

        self.engine.reload(&self.db)
    }

    /// Resource-delete lifecycle hook: remove every binding and hierarchy
    /// edge rooted at the deleted resource's path.
    #[tracing::instrument(skip(self))]
    pub fn on_resource_delete(
        &self,
        resource_type: ResourceType,
        resource_id: Uuid,
        path: &ResourcePath,
    ) -> Result<()> {
        let mut conn = self.db.get_conn()?;
        role_store::delete_by_resource(&mut conn, &resource_type.to_string(), resource_id)?;
        hierarchy_store::remove_edges_rooted_at(&mut conn, path.as_str())?;
        drop(conn);

        self.engine.reload(&self.db)
    }

    /// Group-delete lifecycle hook: memberships and bindings whose subject
    /// is the group are removed transactionally by the membership store.
    #[tracing::instrument(skip(self))]
    pub fn on_group_delete(&self, group_id: Uuid) -> Result<()> {
        let mut conn = self.db.get_conn()?;
        crate::db::membership_store::delete_group(&mut conn, group_id)?;
        drop(conn);

        self.engine.reload(&self.db)
    }

    pub fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut conn = self.db.get_conn()?;
        crate::db::membership_store::add_member(&mut conn, group_id, user_id)?;
        drop(conn);
        self.engine.reload(&self.db)
    }

    pub fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut conn = self.db.get_conn()?;
        let removed = crate::db::membership_store::remove_member(&mut conn, group_id, user_id)?;
        drop(conn);
        self.engine.reload(&self.db)?;
        Ok(removed)
    }
}

/// For organization and secret_group revocations, reassigns ownership of
/// every descendant resource whose owner was the revoked subject to the
/// resource's remaining owner. An organization revoke reassigns both its
/// secret groups and their environments, since the cascade it follows
/// spans the whole subtree, not just direct children.
fn transfer_ownership_if_needed(
    conn: &mut kavach_database::DbConnection,
    request: &PermissionRequest,
    revoked_subject: Subject,
) -> Result<()> {
    match request.resource_type {
        ResourceType::Organization => {
            let parent_owner = role_store::get_owner(
                conn,
                &ResourceType::Organization.to_string(),
                request.organization_id,
            )?
            .and_then(|row| match (row.user_id, row.group_id) {
                (Some(uid), _) => Some(Subject::User(uid)),
                (_, Some(gid)) => Some(Subject::Group(gid)),
                _ => None,
            });

            let Some(new_owner) = parent_owner else {
                return Err(Error::OwnershipTransferFailed(format!(
                    "organization {} has no owner to transfer to",
                    request.organization_id
                )));
            };

            reassign_children_owned_by(
                conn,
                &ResourceType::SecretGroup,
                request.organization_id,
                None,
                revoked_subject,
                new_owner,
            )?;
            reassign_children_owned_by(
                conn,
                &ResourceType::Environment,
                request.organization_id,
                None,
                revoked_subject,
                new_owner,
            )
        }
        ResourceType::SecretGroup => {
            let parent_owner = role_store::get_owner(
                conn,
                &ResourceType::SecretGroup.to_string(),
                request.resource_id,
            )?
            .and_then(|row| match (row.user_id, row.group_id) {
                (Some(uid), _) => Some(Subject::User(uid)),
                (_, Some(gid)) => Some(Subject::Group(gid)),
                _ => None,
            });

            let Some(new_owner) = parent_owner else {
                return Err(Error::OwnershipTransferFailed(format!(
                    "secret group {} has no owner to transfer to",
                    request.resource_id
                )));
            };

            reassign_children_owned_by(
                conn,
                &ResourceType::Environment,
                request.organization_id,
                Some(request.resource_id),
                revoked_subject,
                new_owner,
            )
        }
        _ => Ok(()),
    }
}

fn reassign_children_owned_by(
    conn: &mut kavach_database::DbConnection,
    child_type: &ResourceType,
    organization_id: Uuid,
    secret_group_id: Option<Uuid>,
    revoked_subject: Subject,
    new_owner: Subject,
) -> Result<()> {
    // Scans every owner binding of the child type within this organization
    // (and, for environments under a secret_group revoke, within that
    // secret_group) and reassigns the ones whose current owner is the
    // revoked subject. Scoping is required: without it, a same-typed
    // resource under an unrelated organization would be reassigned too.
    let children =
        role_store::list_owners_of_type(conn, &child_type.to_string(), organization_id, secret_group_id)?;
    for child in children {
        let current_owner = match (child.user_id, child.group_id) {
            (Some(uid), _) => Subject::User(uid),
            (_, Some(gid)) => Subject::Group(gid),
            _ => continue,
        };
        if current_owner == revoked_subject {
            role_store::reassign_owner(
                conn,
                &child.resource_type,
                child.resource_id,
                new_owner,
            )?;
        }
    }
    Ok(())
}

fn resource_id_of(path: &ResourcePath) -> Option<Uuid> {
    let s = path.as_str();
    s.rsplit('/').next().and_then(|id| Uuid::parse_str(id).ok())
}
