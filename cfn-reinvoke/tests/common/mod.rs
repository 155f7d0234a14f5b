//! Shared test utilities for integration tests.
//!
//! This module provides a recording scheduling service, a tracing capture
//! layer and proptest strategies used across integration tests.

#![allow(dead_code)] // These utilities are used by other integration test files

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cfn_reinvoke::{RuleState, SchedulingService, ServiceError, ServiceOperation};
use proptest::prelude::*;
use tracing::field::Visit;
use tracing::span::Attributes;
use tracing::{Event, Subscriber};

pub const TEST_FUNCTION_ARN: &str = "arn:aws:lambda:us-east-2:123456789:function:myproject";
pub const TEST_PAYLOAD: &str = r#"{"callbackContext":{"stabilizing":true},"action":"CREATE"}"#;

// =============================================================================
// Recording Service for Integration Tests
// =============================================================================

/// Record of a call made to [`RecordingService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PutRule {
        name: String,
        schedule_expression: String,
        state: RuleState,
    },
    PutTarget {
        rule_name: String,
        target_id: String,
        destination: String,
        payload: String,
    },
    RemoveTarget {
        rule_name: String,
        target_id: String,
    },
    DeleteRule {
        name: String,
    },
}

/// A scheduling service that records calls and fails on demand.
pub struct RecordingService {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<ServiceOperation, Vec<ServiceError>>>,
}

impl RecordingService {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(self, operation: ServiceOperation, error: ServiceError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push(error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn put_rule_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::PutRule { .. }))
            .collect()
    }

    pub fn put_target_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::PutTarget { .. }))
            .collect()
    }

    fn record(&self, operation: ServiceOperation, call: Call) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(call);
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&operation) {
            Some(queue) if !queue.is_empty() => Err(queue.remove(0)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SchedulingService for RecordingService {
    async fn put_rule(
        &self,
        name: &str,
        schedule_expression: &str,
        state: RuleState,
    ) -> Result<(), ServiceError> {
        self.record(
            ServiceOperation::PutRule,
            Call::PutRule {
                name: name.to_string(),
                schedule_expression: schedule_expression.to_string(),
                state,
            },
        )
    }

    async fn put_target(
        &self,
        rule_name: &str,
        target_id: &str,
        destination: &str,
        payload: &str,
    ) -> Result<(), ServiceError> {
        self.record(
            ServiceOperation::PutTargets,
            Call::PutTarget {
                rule_name: rule_name.to_string(),
                target_id: target_id.to_string(),
                destination: destination.to_string(),
                payload: payload.to_string(),
            },
        )
    }

    async fn remove_target(&self, rule_name: &str, target_id: &str) -> Result<(), ServiceError> {
        self.record(
            ServiceOperation::RemoveTargets,
            Call::RemoveTarget {
                rule_name: rule_name.to_string(),
                target_id: target_id.to_string(),
            },
        )
    }

    async fn delete_rule(&self, name: &str) -> Result<(), ServiceError> {
        self.record(
            ServiceOperation::DeleteRule,
            Call::DeleteRule {
                name: name.to_string(),
            },
        )
    }
}

// =============================================================================
// Identifier Grammar
// =============================================================================

/// Returns true if `value` is `<prefix>` followed by an 8-4-4-4-12 hex UUID.
pub fn matches_prefixed_uuid(value: &str, prefix: &str) -> bool {
    value
        .strip_prefix(prefix)
        .map(is_uuid_grammar)
        .unwrap_or(false)
}

/// Checks the 8-4-4-4-12 hexadecimal grouping independently of the crate.
pub fn is_uuid_grammar(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8usize, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

// =============================================================================
// Tracing Capture
// =============================================================================

/// A visitor that captures span and event fields as strings.
#[derive(Debug, Default)]
pub struct FieldCapture {
    pub fields: HashMap<String, String>,
}

impl Visit for FieldCapture {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

/// A layer that captures the fields of every new span and every event.
#[derive(Clone, Default)]
pub struct CaptureLayer {
    pub span_fields: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub event_fields: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_new_span(
        &self,
        attrs: &Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut capture = FieldCapture::default();
        attrs.record(&mut capture);
        self.span_fields.lock().unwrap().push(capture.fields);
    }

    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut capture = FieldCapture::default();
        event.record(&mut capture);
        self.event_fields.lock().unwrap().push(capture.fields);
    }
}

// =============================================================================
// Proptest Strategies
// =============================================================================

/// Strategy for non-empty target addresses.
pub fn target_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "arn:aws:lambda:[a-z]{2}-[a-z]{4,7}-[1-3]:[0-9]{12}:function:[a-zA-Z0-9_-]{1,32}",
        "[a-zA-Z0-9:/_.-]{1,64}",
    ]
}

/// Strategy for opaque payloads, including ones that are not JSON.
pub fn payload_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just(TEST_PAYLOAD.to_string()), Just(String::new()), ".{0,256}",]
}

/// Strategy for delays spanning negative, zero and multi-day values.
pub fn delay_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![-10_000i64..=0, 0i64..=60, 60i64..=100_000,]
}
