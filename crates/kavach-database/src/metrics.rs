// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

use diesel::connection::{Instrumentation, InstrumentationEvent};
use opentelemetry::metrics::{Counter, ValueRecorder};
use opentelemetry::Key;
use std::sync::Arc;
use std::time::Instant;

const ERROR_KEY: Key = Key::from_static_str("error");

pub struct DatabaseMetrics {
    pub sql_execution_time: ValueRecorder<f64>,
    pub sql_error: Counter<u64>,
    pub dbpool_connections: ValueRecorder<u64>,
    pub dbpool_connections_idle: ValueRecorder<u64>,
}

/// Diesel connection instrumentation that feeds query latency and error
/// counts into [`DatabaseMetrics`].
///
/// Installed per-connection in [`crate::Db::connect_url`] via
/// [`diesel::connection::Connection::set_instrumentation`].
pub struct MetricsInstrumentation {
    metrics: Arc<DatabaseMetrics>,
    query_started_at: Option<Instant>,
}

impl MetricsInstrumentation {
    pub fn new(metrics: Arc<DatabaseMetrics>) -> Self {
        Self {
            metrics,
            query_started_at: None,
        }
    }
}

impl Instrumentation for MetricsInstrumentation {
    fn on_connection_event(&mut self, event: InstrumentationEvent<'_>) {
        match event {
            InstrumentationEvent::StartQuery { .. } => {
                self.query_started_at = Some(Instant::now());
            }
            InstrumentationEvent::FinishQuery { error, .. } => {
                if let Some(started_at) = self.query_started_at.take() {
                    self.metrics
                        .sql_execution_time
                        .record(started_at.elapsed().as_secs_f64(), &[]);
                }

                if let Some(error) = error {
                    let label = get_metrics_label_for_error(error);
                    self.metrics.sql_error.add(1, &[ERROR_KEY.string(label)]);
                }
            }
            _ => {}
        }
    }
}

fn get_metrics_label_for_error(error: &diesel::result::Error) -> &'static str {
    match error {
        diesel::result::Error::InvalidCString(_) => "invalid_c_string",
        diesel::result::Error::DatabaseError(e, _) => match e {
            diesel::result::DatabaseErrorKind::UniqueViolation => "unique_violation",
            diesel::result::DatabaseErrorKind::ForeignKeyViolation => "foreign_key_violation",
            diesel::result::DatabaseErrorKind::UnableToSendCommand => "unable_to_send_command",
            diesel::result::DatabaseErrorKind::SerializationFailure => "serialization_failure",
            _ => "unknown",
        },
        diesel::result::Error::NotFound => "not_found",
        diesel::result::Error::QueryBuilderError(_) => "query_builder_error",
        diesel::result::Error::DeserializationError(_) => "deserialization_error",
        diesel::result::Error::SerializationError(_) => "serialization_error",
        diesel::result::Error::RollbackTransaction => "rollback_transaction",
        diesel::result::Error::AlreadyInTransaction => "already_in_transaction",
        _ => "unknown",
    }
}
