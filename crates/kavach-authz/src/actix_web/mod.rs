// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! C7: the actix-web enforcement middleware.

pub mod middleware;

pub use middleware::KavachAuthz;

use uuid::Uuid;

/// The authenticated principal, inserted into the request extensions by an
/// upstream authentication collaborator. This crate never authenticates
/// anyone; it only reads this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);
