// SPDX-FileCopyrightText: Kavach Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Decision latency and outcome counts, recorded around every
//! [`crate::engine::PolicyEngine::check_with_reason`] call.

use opentelemetry::metrics::{Counter, ValueRecorder};
use opentelemetry::Key;
use std::time::Instant;

const ALLOW_KEY: Key = Key::from_static_str("allow");

pub struct AuthzMetrics {
    pub decision_time: ValueRecorder<f64>,
    pub decisions: Counter<u64>,
    pub index_reloads: Counter<u64>,
    pub index_reload_errors: Counter<u64>,
}

impl AuthzMetrics {
    /// Records a decision's latency, measured from `started_at`, and its
    /// allow/deny outcome.
    pub fn record_decision(&self, started_at: Instant, allow: bool) {
        self.decision_time.record(started_at.elapsed().as_secs_f64(), &[]);
        self.decisions.add(1, &[ALLOW_KEY.bool(allow)]);
    }

    pub fn record_reload(&self, result: &crate::error::Result<()>) {
        self.index_reloads.add(1, &[]);
        if result.is_err() {
            self.index_reload_errors.add(1, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::metrics::noop::NoopMeterProvider;
    use opentelemetry::metrics::MeterProvider;

    fn test_metrics() -> AuthzMetrics {
        let meter = NoopMeterProvider::new().meter("kavach-authz-test");

        AuthzMetrics {
            decision_time: meter.f64_value_recorder("authz.decision_time").init(),
            decisions: meter.u64_counter("authz.decisions").init(),
            index_reloads: meter.u64_counter("authz.index_reloads").init(),
            index_reload_errors: meter.u64_counter("authz.index_reload_errors").init(),
        }
    }

    #[test]
    fn records_allow_and_deny() {
        let metrics = test_metrics();
        metrics.record_decision(Instant::now(), true);
        metrics.record_decision(Instant::now(), false);
    }

    #[test]
    fn records_reload_outcome() {
        let metrics = test_metrics();
        metrics.record_reload(&Ok(()));
        metrics.record_reload(&Err(crate::error::Error::AccessDenied));
    }
}
