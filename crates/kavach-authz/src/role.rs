// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! The role ladder and the fixed mapping from role to the actions it grants.

use crate::action::Action;
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// A totally ordered ladder: `viewer < editor < admin < owner`.
///
/// The derived [`Ord`] follows declaration order, which is why variants must
/// stay sorted from least to most privileged.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    FromSqlRow,
    AsExpression,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
    Owner,
}

impl Role {
    /// The actions this role (and implicitly every lower role) grants.
    pub fn actions(self) -> &'static [Action] {
        use Action::*;
        match self {
            Role::Viewer => &[Read],
            Role::Editor => &[Read, Create, Update, Sync, ViewProviderConfig],
            Role::Admin => &[
                Read,
                Create,
                Update,
                Sync,
                ViewProviderConfig,
                Grant,
                Revoke,
                ManageProviderConfig,
            ],
            Role::Owner => &[
                Read,
                Create,
                Update,
                Sync,
                ViewProviderConfig,
                Grant,
                Revoke,
                ManageProviderConfig,
                Delete,
            ],
        }
    }

    pub fn allows(self, action: Action) -> bool {
        self.actions().contains(&action)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
            Role::Owner => "owner",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(crate::error::Error::InvalidBody(format!(
                "unknown role `{other}`"
            ))),
        }
    }
}

impl ToSql<Text, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        write!(out, "{self}")?;
        Ok(IsNull::No)
    }
}

impl<DB> FromSql<Text, DB> for Role
where
    DB: Backend,
    String: FromSql<Text, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        let s = String::from_sql(bytes)?;
        Ok(s.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_totally_ordered() {
        assert!(Role::Viewer < Role::Editor);
        assert!(Role::Editor < Role::Admin);
        assert!(Role::Admin < Role::Owner);
    }

    #[test]
    fn actions_are_cumulative() {
        for action in Role::Viewer.actions() {
            assert!(Role::Editor.allows(*action));
            assert!(Role::Admin.allows(*action));
            assert!(Role::Owner.allows(*action));
        }
        assert!(!Role::Admin.allows(Action::Delete));
        assert!(Role::Owner.allows(Action::Delete));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for role in [Role::Viewer, Role::Editor, Role::Admin, Role::Owner] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }
}
