// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

pub mod hierarchy_store;
pub mod membership_store;
pub mod migrations;
pub mod models;
pub mod role_store;
pub mod schema;
