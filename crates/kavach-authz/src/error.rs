// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// The error taxonomy of the authorization core.
///
/// Every variant carries an explicit HTTP mapping, applied at exactly one
/// point by the enforcement middleware (see [`crate::actix_web::middleware`]).
#[derive(Debug, Error)]
pub enum Error {
    #[error("no authenticated subject on the request")]
    Unauthorized,

    #[error("decision is deny")]
    AccessDenied,

    #[error("user `{0}` could not be resolved")]
    UserNotFound(String),

    #[error("group `{0}` could not be resolved")]
    GroupNotFound(String),

    #[error("binding does not exist")]
    BindingNotFound,

    #[error("binding already exists")]
    DuplicateBinding,

    #[error("membership already exists")]
    DuplicateMembership,

    #[error("membership does not exist")]
    MembershipNotFound,

    #[error("exactly one of user_name/group_name must be set, both were")]
    AmbiguousSubject,

    #[error("exactly one of user_name/group_name must be set, neither was")]
    MissingSubject,

    #[error("could not parse admin route body: {0}")]
    InvalidBody(String),

    #[error("ownership transfer failed: {0}")]
    OwnershipTransferFailed(String),

    #[error("resource path `{0}` is not well-formed")]
    MalformedPath(String),

    #[error(transparent)]
    Database(#[from] kavach_database::DatabaseError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The HTTP status this error is surfaced as by the enforcement
    /// middleware and by direct callers of the service API.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Unauthorized => 401,
            Error::AccessDenied => 403,
            Error::UserNotFound(_)
            | Error::GroupNotFound(_)
            | Error::BindingNotFound
            | Error::DuplicateBinding
            | Error::DuplicateMembership
            | Error::MembershipNotFound
            | Error::MissingSubject => 400,
            Error::AmbiguousSubject => 409,
            Error::InvalidBody(_) => 422,
            Error::MalformedPath(_) => 422,
            Error::OwnershipTransferFailed(_) | Error::Database(_) | Error::Internal(_) => 500,
        }
    }

    /// A short machine-readable code, mirrored in the HTTP response body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthorized => "unauthorized",
            Error::AccessDenied => "access_denied",
            Error::UserNotFound(_) => "user_not_found",
            Error::GroupNotFound(_) => "group_not_found",
            Error::BindingNotFound => "binding_not_found",
            Error::DuplicateBinding => "duplicate_binding",
            Error::DuplicateMembership => "duplicate_membership",
            Error::MembershipNotFound => "membership_not_found",
            Error::AmbiguousSubject => "ambiguous_subject",
            Error::MissingSubject => "missing_subject",
            Error::InvalidBody(_) => "invalid_body",
            Error::OwnershipTransferFailed(_) => "ownership_transfer_failed",
            Error::MalformedPath(_) => "malformed_path",
            Error::Database(_) => "internal",
            Error::Internal(_) => "authorization_error",
        }
    }
}

/// A default specialized Result type for the authorization core.
pub type Result<T, E = Error> = std::result::Result<T, E>;
