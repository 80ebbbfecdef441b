// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! C6: maps an HTTP request onto `(resource object, action)`.
//!
//! The resolver never consults the policy store; it is pure path and body
//! inspection. Subject extraction (the authenticated user id) is the
//! caller's concern - see [`crate::actix_web::middleware`] - since it
//! depends on an upstream authentication collaborator, not on anything the
//! resolver can derive from the request shape alone.

use crate::action::Action;
use crate::error::{Error, Result};
use crate::resource::ResourcePath;
use crate::service::PermissionRequest;
use uuid::Uuid;

/// What the resolver extracted, ready to be handed to [`crate::engine::PolicyEngine`].
#[derive(Debug, Clone)]
pub enum Object {
    /// A concrete, fully-identified resource.
    Resource(ResourcePath),
    /// A by-name lookup route: the nearest ancestor scope whose id is known
    /// from the URL. The engine checks viewer-on-ancestor-or-descendant of
    /// this scope (see [`crate::engine::PolicyEngine::decide_by_name`]).
    ByName(ResourcePath),
    /// `/organizations/by-name/{name}`: no ancestor scope is known at all.
    /// See [`crate::engine::PolicyEngine::decide_by_name_global`].
    GlobalByName,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub action: Action,
    pub object: Object,
}

/// Paths that never reach the decision path in the generic path-based
/// middleware.
///
/// `/permissions/grant` and `/permissions/revoke` are skipped here because
/// their resource identity lives in the request body, which the blanket
/// enforcement middleware never buffers. This does not leave them
/// unenforced: [`crate::service::AuthzService::grant`]/`revoke` take the
/// acting user as a required argument and call
/// [`crate::engine::PolicyEngine::decide`] themselves, before any
/// mutation, so the check happens regardless of which handler calls them.
/// [`resolve_permission_body`] is available to a handler that wants the
/// resolved `(action, object)` pair ahead of time (for logging or a
/// pre-check), but is not load-bearing for enforcement.
pub fn is_skipped(path: &str, method: &str) -> bool {
    path.starts_with("/auth/")
        || path.starts_with("/permissions/")
        || (path == "/organizations" && method == "POST")
}

/// Resolves a path-parameterized or by-name route. Returns `Ok(None)` for
/// paths the resolver does not recognize (callers should treat this the
/// same as a resolve failure, surfaced as 500 `authorization_error`).
pub fn resolve_path(path: &str, method: &str) -> Result<Option<Resolved>> {
    let action = Action::from_http_method(method)
        .ok_or_else(|| Error::Internal(format!("unsupported HTTP method `{method}`")))?;

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resolved = match segments.as_slice() {
        ["organizations", org] => resource(ResourcePath::organization(parse_id(org)?)),

        ["organizations", "by-name", _name] => Object::GlobalByName,

        ["organizations", org, "secret-groups", sg] => resource(ResourcePath::secret_group(
            parse_id(org)?,
            parse_id(sg)?,
        )),

        ["organizations", org, "secret-groups", "by-name", _name] => {
            by_name(ResourcePath::organization(parse_id(org)?))
        }

        ["organizations", org, "secret-groups", sg, "environments", env] => resource(
            ResourcePath::environment(parse_id(org)?, parse_id(sg)?, parse_id(env)?),
        ),

        ["organizations", org, "secret-groups", sg, "environments", "by-name", _name] => {
            by_name(ResourcePath::secret_group(parse_id(org)?, parse_id(sg)?))
        }

        ["organizations", org, "user-groups", ug] => {
            resource(ResourcePath::user_group(parse_id(org)?, parse_id(ug)?))
        }

        // Query-param form: `…/user-groups/by-name?name=…`, not a path segment.
        ["organizations", org, "user-groups", "by-name"] => {
            by_name(ResourcePath::organization(parse_id(org)?))
        }

        _ => return Ok(None),
    };

    Ok(Some(Resolved {
        action,
        object: resolved,
    }))
}

fn resource(path: ResourcePath) -> Object {
    Object::Resource(path)
}

fn by_name(scope: ResourcePath) -> Object {
    Object::ByName(scope)
}

fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::MalformedPath(e.to_string()))
}

/// Resolves `/permissions/grant` (POST) and `/permissions/revoke` (DELETE),
/// whose resource identity lives in the request body rather than the URL.
pub fn resolve_permission_body(method: &str, body: &PermissionRequest) -> Result<Resolved> {
    let action = match method {
        "POST" => Action::Grant,
        "DELETE" => Action::Revoke,
        other => {
            return Err(Error::Internal(format!(
                "unsupported method `{other}` for a permissions route"
            )))
        }
    };

    let path = body.resource_path()?;

    Ok(Resolved {
        action,
        object: Object::Resource(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_organization_path() {
        let org = Uuid::new_v4();
        let resolved = resolve_path(&format!("/organizations/{org}"), "GET")
            .unwrap()
            .unwrap();
        assert_eq!(resolved.action, Action::Read);
        match resolved.object {
            Object::Resource(path) => assert_eq!(path, ResourcePath::organization(org)),
            _ => panic!("expected a concrete resource"),
        }
    }

    #[test]
    fn skips_organization_creation() {
        assert!(is_skipped("/organizations", "POST"));
        assert!(!is_skipped("/organizations", "GET"));
    }

    #[test]
    fn skips_auth_routes() {
        assert!(is_skipped("/auth/login", "POST"));
    }

    #[test]
    fn skips_permission_routes() {
        assert!(is_skipped("/permissions/grant", "POST"));
        assert!(is_skipped("/permissions/revoke", "DELETE"));
    }

    #[test]
    fn by_name_resolves_to_ancestor_scope() {
        let org = Uuid::new_v4();
        let resolved = resolve_path(
            &format!("/organizations/{org}/secret-groups/by-name/prod"),
            "GET",
        )
        .unwrap()
        .unwrap();
        match resolved.object {
            Object::ByName(scope) => assert_eq!(scope, ResourcePath::organization(org)),
            _ => panic!("expected a by-name scope"),
        }
    }

    #[test]
    fn organization_by_name_has_no_ancestor_scope() {
        let resolved = resolve_path("/organizations/by-name/acme", "GET").unwrap().unwrap();
        assert!(matches!(resolved.object, Object::GlobalByName));
    }

    #[test]
    fn user_group_by_name_uses_query_param_form() {
        let org = Uuid::new_v4();
        let resolved = resolve_path(&format!("/organizations/{org}/user-groups/by-name"), "GET")
            .unwrap()
            .unwrap();
        match resolved.object {
            Object::ByName(scope) => assert_eq!(scope, ResourcePath::organization(org)),
            _ => panic!("expected a by-name scope"),
        }
    }
}
