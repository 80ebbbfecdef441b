// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! C3: parent -> child resource-path edges.
//!
//! Edges are derived from canonical paths and stored explicitly for
//! auditability; `Ancestors` itself is computed by pure string-prefix
//! decomposition on [`crate::resource::ResourcePath`] and needs no query
//! against this store.

use crate::db::models::NewHierarchyEdge;
use crate::db::schema::hierarchy_edges::dsl;
use crate::error::{Error, Result};
use diesel::prelude::*;
use kavach_database::DbConnection;
use uuid::Uuid;

#[tracing::instrument(skip(conn))]
pub fn add_edge(conn: &mut DbConnection, parent_path: &str, child_path: &str) -> Result<()> {
    diesel::insert_into(dsl::hierarchy_edges)
        .values(NewHierarchyEdge {
            id: Uuid::new_v4(),
            parent_path: parent_path.to_string(),
            child_path: child_path.to_string(),
        })
        .on_conflict_do_nothing()
        .execute(conn)
        .map_err(|e| Error::Database(e.into()))?;
    Ok(())
}

/// Removes every edge rooted at or below `path` (resource-delete lifecycle
/// hook).
#[tracing::instrument(skip(conn))]
pub fn remove_edges_rooted_at(conn: &mut DbConnection, path: &str) -> Result<usize> {
    let prefix = format!("{path}%");
    diesel::delete(
        dsl::hierarchy_edges
            .filter(dsl::parent_path.eq(path).or(dsl::child_path.like(prefix))),
    )
    .execute(conn)
    .map_err(|e| Error::Database(e.into()))
}

/// All `(parent_path, child_path)` edges, for the index rebuild.
#[tracing::instrument(skip(conn))]
pub fn list_all(conn: &mut DbConnection) -> Result<Vec<(String, String)>> {
    dsl::hierarchy_edges
        .select((dsl::parent_path, dsl::child_path))
        .load(conn)
        .map_err(|e| Error::Database(e.into()))
}
