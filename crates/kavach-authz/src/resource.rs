// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Resource identity: the closed set of resource types and the canonical
//! path form used as the matching key throughout the authorization core.
//!
//! An organization owns secret_groups and user_groups; a secret_group owns
//! environments; user_groups are leaves attached directly to an
//! organization. The canonical path encodes this hierarchy, and a prefix
//! relation on paths defines ancestry.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Organization,
    SecretGroup,
    Environment,
    UserGroup,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceType::Organization => "organization",
            ResourceType::SecretGroup => "secret_group",
            ResourceType::Environment => "environment",
            ResourceType::UserGroup => "user_group",
        };
        f.write_str(s)
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" => Ok(ResourceType::Organization),
            "secret_group" => Ok(ResourceType::SecretGroup),
            "environment" => Ok(ResourceType::Environment),
            "user_group" => Ok(ResourceType::UserGroup),
            other => Err(Error::MalformedPath(format!(
                "unknown resource type `{other}`"
            ))),
        }
    }
}

/// The canonical, hierarchy-encoding path of a protected resource.
///
/// ```text
/// /organizations/{orgId}
/// /organizations/{orgId}/secret-groups/{sgId}
/// /organizations/{orgId}/secret-groups/{sgId}/environments/{envId}
/// /organizations/{orgId}/user-groups/{ugId}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn organization(org_id: Uuid) -> Self {
        Self(format!("/organizations/{org_id}"))
    }

    pub fn secret_group(org_id: Uuid, sg_id: Uuid) -> Self {
        Self(format!("/organizations/{org_id}/secret-groups/{sg_id}"))
    }

    pub fn environment(org_id: Uuid, sg_id: Uuid, env_id: Uuid) -> Self {
        Self(format!(
            "/organizations/{org_id}/secret-groups/{sg_id}/environments/{env_id}"
        ))
    }

    pub fn user_group(org_id: Uuid, ug_id: Uuid) -> Self {
        Self(format!("/organizations/{org_id}/user-groups/{ug_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// The resource type this path's terminal segment denotes.
    pub fn resource_type(&self) -> Option<ResourceType> {
        let segments: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["organizations", _] => Some(ResourceType::Organization),
            ["organizations", _, "secret-groups", _] => Some(ResourceType::SecretGroup),
            ["organizations", _, "secret-groups", _, "environments", _] => {
                Some(ResourceType::Environment)
            }
            ["organizations", _, "user-groups", _] => Some(ResourceType::UserGroup),
            _ => None,
        }
    }

    /// The direct parent path, or `None` for an organization (a root).
    pub fn parent(&self) -> Option<ResourcePath> {
        let segments: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["organizations", _] => None,
            ["organizations", org, "secret-groups", _] => {
                Some(ResourcePath(format!("/organizations/{org}")))
            }
            ["organizations", org, "secret-groups", sg, "environments", _] => Some(ResourcePath(
                format!("/organizations/{org}/secret-groups/{sg}"),
            )),
            ["organizations", org, "user-groups", _] => {
                Some(ResourcePath(format!("/organizations/{org}")))
            }
            _ => None,
        }
    }

    /// The ancestor chain, most-specific first, ending in the owning
    /// organization. Includes `self` as the first element.
    pub fn ancestors(&self) -> Vec<ResourcePath> {
        let mut chain = vec![self.clone()];
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// True if `self` is a strict prefix-ancestor of `other`.
    pub fn is_strict_ancestor_of(&self, other: &ResourcePath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(self.0.as_str())
            && other.0.as_bytes()[self.0.len()] == b'/'
    }

    /// True if `self` lies strictly below `other` in the hierarchy.
    pub fn is_strict_descendant_of(&self, other: &ResourcePath) -> bool {
        other.is_strict_ancestor_of(self)
    }

    /// The id of the owning organization, present on every path.
    pub fn organization_id(&self) -> Result<Uuid, Error> {
        let segments: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["organizations", org, ..] => {
                Uuid::parse_str(org).map_err(|e| Error::MalformedPath(e.to_string()))
            }
            _ => Err(Error::MalformedPath(self.0.clone())),
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ResourcePath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourcePath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_walk_to_the_root() {
        let org = Uuid::nil();
        let sg = Uuid::from_u128(1);
        let env = Uuid::from_u128(2);

        let path = ResourcePath::environment(org, sg, env);
        let chain = path.ancestors();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0], ResourcePath::environment(org, sg, env));
        assert_eq!(chain[1], ResourcePath::secret_group(org, sg));
        assert_eq!(chain[2], ResourcePath::organization(org));
    }

    #[test]
    fn prefix_ancestry() {
        let org = Uuid::nil();
        let sg = Uuid::from_u128(1);

        let org_path = ResourcePath::organization(org);
        let sg_path = ResourcePath::secret_group(org, sg);

        assert!(org_path.is_strict_ancestor_of(&sg_path));
        assert!(sg_path.is_strict_descendant_of(&org_path));
        assert!(!sg_path.is_strict_ancestor_of(&org_path));
    }

    #[test]
    fn resource_type_from_path() {
        let org = Uuid::nil();
        let ug = Uuid::from_u128(7);
        let path = ResourcePath::user_group(org, ug);
        assert_eq!(path.resource_type(), Some(ResourceType::UserGroup));
    }
}
