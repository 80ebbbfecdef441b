// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Creates the three tables backing the role, membership, and hierarchy
//! stores (C1-C3).
use barrel::backend::Pg;
use barrel::{types, Migration};

pub fn migration() -> String {
    let mut migr = Migration::new();
    barrel_migration(&mut migr);
    migr.make::<Pg>()
}

pub fn barrel_migration(migr: &mut Migration) {
    migr.create_table("role_bindings", |table| {
        table.add_column("id", types::uuid().primary(true));
        table.add_column("user_id", types::uuid().nullable(true));
        table.add_column("group_id", types::uuid().nullable(true));
        table.add_column("role", types::text().nullable(false));
        table.add_column("resource_type", types::text().nullable(false));
        table.add_column("resource_id", types::uuid().nullable(false));
        table.add_column("organization_id", types::uuid().nullable(false));
        table.add_column("secret_group_id", types::uuid().nullable(true));
        table.add_column("environment_id", types::uuid().nullable(true));
        table.add_column(
            "created_at",
            types::custom("TIMESTAMPTZ").default("now()").nullable(false),
        );
        table.add_column(
            "updated_at",
            types::custom("TIMESTAMPTZ").default("now()").nullable(false),
        );

        table.inject_custom(
            "CONSTRAINT role_bindings_subject_xor CHECK (
                (user_id IS NOT NULL AND group_id IS NULL) OR
                (user_id IS NULL AND group_id IS NOT NULL)
            )",
        );
        table.inject_custom(
            "CONSTRAINT role_bindings_unique_user_per_resource
                UNIQUE (user_id, resource_type, resource_id)",
        );
        table.inject_custom(
            "CONSTRAINT role_bindings_unique_group_per_resource
                UNIQUE (group_id, resource_type, resource_id)",
        );
    });

    migr.create_table("group_memberships", |table| {
        table.add_column("id", types::uuid().primary(true));
        table.add_column("group_id", types::uuid().nullable(false));
        table.add_column("user_id", types::uuid().nullable(false));
        table.add_column(
            "created_at",
            types::custom("TIMESTAMPTZ").default("now()").nullable(false),
        );

        table.inject_custom(
            "CONSTRAINT group_memberships_unique UNIQUE (group_id, user_id)",
        );
    });

    migr.create_table("hierarchy_edges", |table| {
        table.add_column("id", types::uuid().primary(true));
        table.add_column("parent_path", types::text().nullable(false));
        table.add_column("child_path", types::text().nullable(false));

        table.inject_custom(
            "CONSTRAINT hierarchy_edges_unique UNIQUE (parent_path, child_path)",
        );
    });
}
