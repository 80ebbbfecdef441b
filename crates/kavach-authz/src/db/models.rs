// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Row types persisted by the role, membership, and hierarchy stores (C1-C3).

use crate::db::schema::{group_memberships, hierarchy_edges, role_bindings};
use crate::role::Role;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = role_bindings)]
pub struct RoleBindingRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub role: Role,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub organization_id: Uuid,
    pub secret_group_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = role_bindings)]
pub struct NewRoleBinding {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub role: Role,
    pub resource_type: String,
    pub resource_id: Uuid,
    pub organization_id: Uuid,
    pub secret_group_id: Option<Uuid>,
    pub environment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = group_memberships)]
pub struct GroupMembershipRow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = group_memberships)]
pub struct NewGroupMembership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = hierarchy_edges)]
pub struct HierarchyEdgeRow {
    pub id: Uuid,
    pub parent_path: String,
    pub child_path: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = hierarchy_edges)]
pub struct NewHierarchyEdge {
    pub id: Uuid,
    pub parent_path: String,
    pub child_path: String,
}
