// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! The `enter -> skip? -> resolve -> decide -> allow?` state machine,
//! applied to every request that isn't in the skip-set.

use crate::actix_web::AuthenticatedUser;
use crate::engine::PolicyEngine;
use crate::error::Error;
use crate::resolver;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::HttpResponse;
use futures::future::{ready, Ready};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

/// Installs the enforcement middleware on an actix-web `App`/`Scope`.
///
/// ```ignore
/// App::new().wrap(KavachAuthz::new(engine))
/// ```
#[derive(Clone)]
pub struct KavachAuthz {
    engine: PolicyEngine,
}

impl KavachAuthz {
    pub fn new(engine: PolicyEngine) -> Self {
        Self { engine }
    }
}

impl<S, B> Transform<S, ServiceRequest> for KavachAuthz
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = KavachAuthzMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(KavachAuthzMiddleware {
            service: Rc::new(service),
            engine: self.engine.clone(),
        }))
    }
}

pub struct KavachAuthzMiddleware<S> {
    service: Rc<S>,
    engine: PolicyEngine,
}

impl<S, B> Service<ServiceRequest> for KavachAuthzMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    #[tracing::instrument(skip_all, fields(path = %req.path(), method = %req.method()))]
    fn call(&self, req: ServiceRequest) -> Self::Future {
        let engine = self.engine.clone();
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let path = req.path().to_string();
            let method = req.method().as_str().to_string();

            if resolver::is_skipped(&path, &method) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let resolved = match resolver::resolve_path(&path, &method) {
                Ok(Some(resolved)) => resolved,
                Ok(None) => {
                    return Ok(deny(req, Error::Internal(format!("unrecognized route {method} {path}"))));
                }
                Err(e) => return Ok(deny(req, e)),
            };

            let user_id = match req.extensions().get::<AuthenticatedUser>() {
                Some(user) => user.0,
                None => return Ok(deny(req, Error::Unauthorized)),
            };

            let allow = match &resolved.object {
                resolver::Object::Resource(path) => {
                    engine.decide(user_id, resolved.action, path)
                }
                resolver::Object::ByName(scope) => engine.decide_by_name(user_id, scope),
                resolver::Object::GlobalByName => engine.decide_by_name_global(user_id),
            };

            if allow {
                let res = service.call(req).await?;
                Ok(res.map_into_left_body())
            } else {
                Ok(deny(req, Error::AccessDenied))
            }
        })
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

fn deny<B>(req: ServiceRequest, error: Error) -> ServiceResponse<EitherBody<B>> {
    let status = actix_web::http::StatusCode::from_u16(error.status_code())
        .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

    log::warn!("denying {} {}: {error}", req.method(), req.path());

    let body = ErrorBody {
        code: error.code(),
        message: error.to_string(),
    };
    let response = HttpResponse::build(status).json(body);
    req.into_response(response).map_into_right_body()
}
