// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Principals: a subject is exactly one of a user or a user-group.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The acting party in a decision.
///
/// Exactly one tag is ever populated; this is enforced structurally here and
/// redundantly at the storage layer via a check constraint (see the
/// `role_bindings` schema and invariant 1 in the testable-properties list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    User(Uuid),
    Group(Uuid),
}

impl Subject {
    pub fn user_id(self) -> Option<Uuid> {
        match self {
            Subject::User(id) => Some(id),
            Subject::Group(_) => None,
        }
    }

    pub fn group_id(self) -> Option<Uuid> {
        match self {
            Subject::User(_) => None,
            Subject::Group(id) => Some(id),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::User(id) => write!(f, "user:{id}"),
            Subject::Group(id) => write!(f, "group:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_is_xor_tagged() {
        let user = Subject::User(Uuid::nil());
        assert_eq!(user.user_id(), Some(Uuid::nil()));
        assert_eq!(user.group_id(), None);

        let group = Subject::Group(Uuid::nil());
        assert_eq!(group.user_id(), None);
        assert_eq!(group.group_id(), Some(Uuid::nil()));
    }
}
