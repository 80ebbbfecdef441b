// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Re-exports for the common entry points into the authorization core.

pub use crate::action::Action;
pub use crate::actix_web::{AuthenticatedUser, KavachAuthz};
pub use crate::admin::{self, AccessibleResource};
pub use crate::engine::{BindingSource, Decision, PolicyEngine};
pub use crate::error::{Error, Result};
pub use crate::resource::{ResourcePath, ResourceType};
pub use crate::role::Role;
pub use crate::service::{AuthzService, PermissionRequest, SubjectResolver};
pub use crate::subject::Subject;
pub use crate::Authz;
