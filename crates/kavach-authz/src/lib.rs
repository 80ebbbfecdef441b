// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Hierarchical role-based authorization core.
//!
//! An [`Authz`] ties together the policy store (C1-C3), the lock-free
//! decision engine (C4), and the grant/revoke orchestration layer (C5).
//! Everything else - the resolver (C6), the actix-web middleware (C7) and
//! the admin query surface (C8) - is built against those three.

pub mod action;
pub mod actix_web;
pub mod admin;
pub mod db;
pub mod engine;
pub mod error;
pub mod index;
pub mod metrics;
pub mod resolver;
pub mod resource;
pub mod role;
pub mod service;
pub mod subject;

pub mod prelude;

use engine::PolicyEngine;
use error::Result;
use kavach_database::{Db, DatabaseMetrics};
use metrics::AuthzMetrics;
use opentelemetry::global;
use service::AuthzService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// The authorization core, wired up and ready to serve decisions.
///
/// Construction runs migrations and an initial index load; callers that
/// want the background autoloader should call
/// [`Authz::spawn_autoload`](Authz::spawn_autoload) once, at startup.
pub struct Authz {
    db: Arc<Db>,
    service: AuthzService,
}

impl Authz {
    /// Runs pending migrations against `db_settings.url`, loads the initial
    /// index, and returns a ready-to-use core.
    pub async fn new(db_settings: &kavach_settings::settings::Database) -> Result<Self> {
        db::migrations::migrate_from_url(&db_settings.url)
            .await
            .map_err(|e| error::Error::Internal(format!("migration failed: {e}")))?;

        let meter = global::meter("kavach-authz");

        let mut db = Db::connect(db_settings)?;
        db.set_metrics(Arc::new(DatabaseMetrics {
            sql_execution_time: meter.f64_value_recorder("sql.execution_time_seconds").init(),
            sql_error: meter.u64_counter("sql.errors_total").init(),
            dbpool_connections: meter.u64_value_recorder("sql.dbpool_connections").init(),
            dbpool_connections_idle: meter.u64_value_recorder("sql.dbpool_connections_idle").init(),
        }));
        let db = Arc::new(db);

        let mut engine = PolicyEngine::empty();
        engine.set_metrics(Arc::new(AuthzMetrics {
            decision_time: meter.f64_value_recorder("authz.decision_time_seconds").init(),
            decisions: meter.u64_counter("authz.decisions_total").init(),
            index_reloads: meter.u64_counter("authz.index_reloads_total").init(),
            index_reload_errors: meter.u64_counter("authz.index_reload_errors_total").init(),
        }));
        engine.reload(&db)?;

        Ok(Self {
            service: AuthzService::new(Arc::clone(&db), engine),
            db,
        })
    }

    pub fn engine(&self) -> &PolicyEngine {
        self.service.engine()
    }

    pub fn service(&self) -> &AuthzService {
        &self.service
    }

    /// Spawns the background task that rebuilds and republishes the index
    /// every `interval` until `shutdown` fires. Mirrors
    /// [`kavach_settings::settings::Authz::reload_interval`].
    pub fn spawn_autoload(&self, interval: Duration, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        self.service.engine().clone().spawn_autoload(Arc::clone(&self.db), interval, shutdown)
    }

    /// Installs the enforcement middleware on an actix-web `App`/`Scope`.
    pub fn actix_middleware(&self) -> actix_web::KavachAuthz {
        actix_web::KavachAuthz::new(self.service.engine().clone())
    }
}
