// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! C2: user <-> group membership edges and group lifecycle.

use crate::db::models::NewGroupMembership;
use crate::db::role_store;
use crate::db::schema::group_memberships::dsl;
use crate::error::{Error, Result};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::result::Error as DieselError;
use kavach_database::DbConnection;
use uuid::Uuid;

#[tracing::instrument(skip(conn))]
pub fn add_member(conn: &mut DbConnection, group_id: Uuid, user_id: Uuid) -> Result<()> {
    diesel::insert_into(dsl::group_memberships)
        .values(NewGroupMembership {
            id: Uuid::new_v4(),
            group_id,
            user_id,
        })
        .execute(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                Error::DuplicateMembership
            }
            e => Error::Database(e.into()),
        })?;
    Ok(())
}

/// Removes the membership, returning `false` without error if it did not
/// exist.
#[tracing::instrument(skip(conn))]
pub fn remove_member(conn: &mut DbConnection, group_id: Uuid, user_id: Uuid) -> Result<bool> {
    let deleted = diesel::delete(
        dsl::group_memberships
            .filter(dsl::group_id.eq(group_id))
            .filter(dsl::user_id.eq(user_id)),
    )
    .execute(conn)
    .map_err(|e| Error::Database(e.into()))?;

    Ok(deleted > 0)
}

#[tracing::instrument(skip(conn))]
pub fn list_groups_of(conn: &mut DbConnection, user_id: Uuid) -> Result<Vec<Uuid>> {
    dsl::group_memberships
        .filter(dsl::user_id.eq(user_id))
        .select(dsl::group_id)
        .load(conn)
        .map_err(|e| Error::Database(e.into()))
}

#[tracing::instrument(skip(conn))]
pub fn list_members(conn: &mut DbConnection, group_id: Uuid) -> Result<Vec<Uuid>> {
    dsl::group_memberships
        .filter(dsl::group_id.eq(group_id))
        .select(dsl::user_id)
        .load(conn)
        .map_err(|e| Error::Database(e.into()))
}

/// All `(group_id, user_id)` pairs, for the index rebuild.
#[tracing::instrument(skip(conn))]
pub fn list_all(conn: &mut DbConnection) -> Result<Vec<(Uuid, Uuid)>> {
    dsl::group_memberships
        .select((dsl::group_id, dsl::user_id))
        .load(conn)
        .map_err(|e| Error::Database(e.into()))
}

/// Removes the group entirely: its memberships and every binding whose
/// subject is this group. Transactional - either both disappear or neither
/// does.
#[tracing::instrument(skip(conn))]
pub fn delete_group(conn: &mut DbConnection, group_id: Uuid) -> Result<()> {
    conn.transaction(|conn| {
        diesel::delete(dsl::group_memberships.filter(dsl::group_id.eq(group_id)))
            .execute(conn)?;
        role_store::delete_by_group_subject(conn, group_id)
            .map_err(|_| DieselError::RollbackTransaction)?;
        Ok::<_, DieselError>(())
    })
    .map_err(|e| Error::Database(e.into()))
}
