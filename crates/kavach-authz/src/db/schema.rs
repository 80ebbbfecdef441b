// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

table! {
    role_bindings (id) {
        id -> Uuid,
        user_id -> Nullable<Uuid>,
        group_id -> Nullable<Uuid>,
        role -> Text,
        resource_type -> Text,
        resource_id -> Uuid,
        organization_id -> Uuid,
        secret_group_id -> Nullable<Uuid>,
        environment_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    group_memberships (id) {
        id -> Uuid,
        group_id -> Uuid,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

table! {
    hierarchy_edges (id) {
        id -> Uuid,
        parent_path -> Text,
        child_path -> Text,
    }
}
