// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! C1: the persistent store of role bindings.

use crate::db::models::{NewRoleBinding, RoleBindingRow};
use crate::db::schema::role_bindings::dsl;
use crate::error::{Error, Result};
use crate::role::Role;
use crate::subject::Subject;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::result::Error as DieselError;
use kavach_database::DbConnection;
use uuid::Uuid;

/// Inserts a binding. Fails with [`Error::DuplicateBinding`] if a binding
/// for the same `(subject, resource_type, resource_id)` already exists.
#[tracing::instrument(skip(conn))]
pub fn insert(conn: &mut DbConnection, binding: NewRoleBinding) -> Result<RoleBindingRow> {
    diesel::insert_into(dsl::role_bindings)
        .values(&binding)
        .get_result(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                Error::DuplicateBinding
            }
            e => Error::Database(e.into()),
        })
}

/// Deletes the exact binding for `(subject, role, resource_type, resource_id)`.
/// Returns [`Error::BindingNotFound`] if no row matched.
#[tracing::instrument(skip(conn))]
pub fn delete_exact(
    conn: &mut DbConnection,
    subject: Subject,
    role: Role,
    resource_type: &str,
    resource_id: Uuid,
) -> Result<RoleBindingRow> {
    let target = dsl::role_bindings
        .filter(dsl::resource_type.eq(resource_type))
        .filter(dsl::resource_id.eq(resource_id))
        .filter(dsl::role.eq(role))
        .into_boxed();

    let target = match subject {
        Subject::User(id) => target.filter(dsl::user_id.eq(id)),
        Subject::Group(id) => target.filter(dsl::group_id.eq(id)),
    };

    let deleted: Vec<RoleBindingRow> =
        diesel::delete(target).get_results(conn).map_err(|e| Error::Database(e.into()))?;

    deleted.into_iter().next().ok_or(Error::BindingNotFound)
}

/// Deletes every binding rooted at `resource_type`/`resource_id` (used by
/// resource-delete lifecycle hooks, not the cascade-on-revoke path, which
/// operates on resource *paths* instead - see [`crate::service::revoke`]).
#[tracing::instrument(skip(conn))]
pub fn delete_by_resource(
    conn: &mut DbConnection,
    resource_type: &str,
    resource_id: Uuid,
) -> Result<usize> {
    diesel::delete(
        dsl::role_bindings
            .filter(dsl::resource_type.eq(resource_type))
            .filter(dsl::resource_id.eq(resource_id)),
    )
    .execute(conn)
    .map_err(|e| Error::Database(e.into()))
}

/// Deletes every binding for `subject` whose `resource_id` is in `resource_ids`.
/// Used by cascade revoke, which pre-computes the set of descendant resource
/// ids from the hierarchy index.
///
/// Owner bindings are excluded: an owner binding on a descendant is
/// reassigned by ownership transfer (a row update), never deleted by
/// cascade - deleting it here first would leave the descendant with no
/// owner at all, breaking the single-owner invariant.
#[tracing::instrument(skip(conn, resource_ids))]
pub fn delete_for_subject_in_resources(
    conn: &mut DbConnection,
    subject: Subject,
    resource_ids: &[Uuid],
) -> Result<usize> {
    let target = dsl::role_bindings
        .filter(dsl::resource_id.eq_any(resource_ids))
        .filter(dsl::role.ne(Role::Owner))
        .into_boxed();

    let target = match subject {
        Subject::User(id) => target.filter(dsl::user_id.eq(id)),
        Subject::Group(id) => target.filter(dsl::group_id.eq(id)),
    };

    diesel::delete(target).execute(conn).map_err(|e| Error::Database(e.into()))
}

/// Deletes every binding whose subject is the given group (used when the
/// group itself is deleted).
#[tracing::instrument(skip(conn))]
pub fn delete_by_group_subject(conn: &mut DbConnection, group_id: Uuid) -> Result<usize> {
    diesel::delete(dsl::role_bindings.filter(dsl::group_id.eq(group_id)))
        .execute(conn)
        .map_err(|e| Error::Database(e.into()))
}

/// The single owner binding of a resource, if any.
#[tracing::instrument(skip(conn))]
pub fn get_owner(
    conn: &mut DbConnection,
    resource_type: &str,
    resource_id: Uuid,
) -> Result<Option<RoleBindingRow>> {
    dsl::role_bindings
        .filter(dsl::resource_type.eq(resource_type))
        .filter(dsl::resource_id.eq(resource_id))
        .filter(dsl::role.eq(Role::Owner))
        .first(conn)
        .optional()
        .map_err(|e| Error::Database(e.into()))
}

/// Reassigns the owner binding of a resource to `new_owner`. Performed as a
/// row update so the single-owner invariant (testable property 3) is never
/// broken by an intermediate state with zero or two owners.
#[tracing::instrument(skip(conn))]
pub fn reassign_owner(
    conn: &mut DbConnection,
    resource_type: &str,
    resource_id: Uuid,
    new_owner: Subject,
) -> Result<()> {
    let (user_id, group_id) = match new_owner {
        Subject::User(id) => (Some(id), None),
        Subject::Group(id) => (None, Some(id)),
    };

    let updated = diesel::update(
        dsl::role_bindings
            .filter(dsl::resource_type.eq(resource_type))
            .filter(dsl::resource_id.eq(resource_id))
            .filter(dsl::role.eq(Role::Owner)),
    )
    .set((dsl::user_id.eq(user_id), dsl::group_id.eq(group_id)))
    .execute(conn)
    .map_err(|e| Error::Database(e.into()))?;

    if updated == 0 {
        return Err(Error::OwnershipTransferFailed(format!(
            "no owner binding found for {resource_type}/{resource_id}"
        )));
    }
    Ok(())
}

/// Every owner binding for a given resource type, scoped to one
/// organization (and, when reassigning environment owners, one secret
/// group within it). Used by ownership transfer to find the children of a
/// revoked organization or secret group - unscoped, this would reassign
/// same-named resources belonging to unrelated organizations.
#[tracing::instrument(skip(conn))]
pub fn list_owners_of_type(
    conn: &mut DbConnection,
    resource_type: &str,
    organization_id: Uuid,
    secret_group_id: Option<Uuid>,
) -> Result<Vec<RoleBindingRow>> {
    let query = dsl::role_bindings
        .filter(dsl::resource_type.eq(resource_type))
        .filter(dsl::role.eq(Role::Owner))
        .filter(dsl::organization_id.eq(organization_id))
        .into_boxed();

    let query = match secret_group_id {
        Some(sg) => query.filter(dsl::secret_group_id.eq(sg)),
        None => query,
    };

    query.load(conn).map_err(|e| Error::Database(e.into()))
}

/// All bindings for a resource, for the admin query surface (C8).
#[tracing::instrument(skip(conn))]
pub fn list_bindings_for_resource(
    conn: &mut DbConnection,
    resource_type: &str,
    resource_id: Uuid,
) -> Result<Vec<RoleBindingRow>> {
    dsl::role_bindings
        .filter(dsl::resource_type.eq(resource_type))
        .filter(dsl::resource_id.eq(resource_id))
        .load(conn)
        .map_err(|e| Error::Database(e.into()))
}

/// All bindings currently in the store, used to rebuild the in-memory
/// index (C4) on startup and on each autoload tick.
#[tracing::instrument(skip(conn))]
pub fn list_all(conn: &mut DbConnection) -> Result<Vec<RoleBindingRow>> {
    dsl::role_bindings.load(conn).map_err(|e| Error::Database(e.into()))
}
