// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! The closed action set and the HTTP verb mapping onto it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An action a principal may attempt against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Grant,
    Revoke,
    Sync,
    ViewProviderConfig,
    ManageProviderConfig,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Grant => "grant",
            Action::Revoke => "revoke",
            Action::Sync => "sync",
            Action::ViewProviderConfig => "view_provider_config",
            Action::ManageProviderConfig => "manage_provider_config",
        };
        f.write_str(s)
    }
}

impl FromStr for Action {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "grant" => Ok(Action::Grant),
            "revoke" => Ok(Action::Revoke),
            "sync" => Ok(Action::Sync),
            "view_provider_config" => Ok(Action::ViewProviderConfig),
            "manage_provider_config" => Ok(Action::ManageProviderConfig),
            other => Err(crate::error::Error::InvalidBody(format!(
                "unknown action `{other}`"
            ))),
        }
    }
}

/// Maps an HTTP verb onto the request-level default action.
///
/// Admin routes whose resource identity lives in the request body
/// (`/permissions/grant`, `/permissions/revoke`) override this at the
/// resolver rather than relying on the verb table.
impl Action {
    pub fn from_http_method(method: &str) -> Option<Action> {
        match method {
            "GET" | "HEAD" => Some(Action::Read),
            "POST" => Some(Action::Create),
            "PUT" | "PATCH" => Some(Action::Update),
            "DELETE" => Some(Action::Delete),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_verb_mapping() {
        assert_eq!(Action::from_http_method("GET"), Some(Action::Read));
        assert_eq!(Action::from_http_method("POST"), Some(Action::Create));
        assert_eq!(Action::from_http_method("PUT"), Some(Action::Update));
        assert_eq!(Action::from_http_method("PATCH"), Some(Action::Update));
        assert_eq!(Action::from_http_method("DELETE"), Some(Action::Delete));
        assert_eq!(Action::from_http_method("OPTIONS"), None);
    }
}
