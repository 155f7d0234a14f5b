//! Mock implementation of SchedulingService for testing.
//!
//! This module provides a call-recording scheduling service that can be used
//! to unit test reinvocation logic without any AWS infrastructure.
//!
//! # Examples
//!
//! ```
//! use cfn_reinvoke_testing::MockSchedulingService;
//! use cfn_reinvoke::{ServiceError, ServiceOperation};
//!
//! // Every call succeeds
//! let service = MockSchedulingService::new();
//!
//! // The first PutTargets call fails, later ones succeed
//! let service = MockSchedulingService::new()
//!     .with_response(ServiceOperation::PutTargets, Err(ServiceError::retriable("throttled")));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{RuleState, SchedulingService, ServiceError, ServiceOperation};

/// Record of one call made to the mock service.
///
/// # Examples
///
/// ```
/// use cfn_reinvoke_testing::{MockSchedulingService, SchedulingService, ServiceCall};
///
/// # tokio_test::block_on(async {
/// let service = MockSchedulingService::new();
/// service.delete_rule("reinvoke-handler-1").await.unwrap();
///
/// assert_eq!(
///     service.calls(),
///     vec![ServiceCall::DeleteRule { name: "reinvoke-handler-1".to_string() }]
/// );
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// A `put_rule` call
    PutRule {
        /// Rule name
        name: String,
        /// Schedule expression
        schedule_expression: String,
        /// Requested rule state
        state: RuleState,
    },
    /// A `put_target` call
    PutTarget {
        /// Rule the target is attached to
        rule_name: String,
        /// Target id
        target_id: String,
        /// Address the target invokes
        destination: String,
        /// Input delivered to the destination
        payload: String,
    },
    /// A `remove_target` call
    RemoveTarget {
        /// Rule the target is removed from
        rule_name: String,
        /// Target id
        target_id: String,
    },
    /// A `delete_rule` call
    DeleteRule {
        /// Rule name
        name: String,
    },
}

impl ServiceCall {
    /// Returns the service operation this call corresponds to.
    pub fn operation(&self) -> ServiceOperation {
        match self {
            Self::PutRule { .. } => ServiceOperation::PutRule,
            Self::PutTarget { .. } => ServiceOperation::PutTargets,
            Self::RemoveTarget { .. } => ServiceOperation::RemoveTargets,
            Self::DeleteRule { .. } => ServiceOperation::DeleteRule,
        }
    }
}

/// Mock implementation of SchedulingService for testing.
///
/// This mock service allows you to:
/// - Queue per-operation responses to simulate failures
/// - Record all calls made, in order, for verification
/// - Inspect which rules and targets would currently exist
///
/// # Thread Safety
///
/// The mock uses internal mutexes so it can be shared across tasks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use cfn_reinvoke::{ReinvocationScheduler, ScheduleRequest};
/// use cfn_reinvoke_testing::MockSchedulingService;
///
/// # tokio_test::block_on(async {
/// let service = Arc::new(MockSchedulingService::new());
/// let scheduler = ReinvocationScheduler::new(service.clone());
///
/// let request = ScheduleRequest::new("arn:aws:lambda:us-east-1:1:function:f", 5, "{}", "abc");
/// scheduler.schedule_reinvocation(&request).await.unwrap();
///
/// assert_eq!(service.call_count(), 2);
/// assert!(service.has_rule("reinvoke-handler-abc"));
/// # });
/// ```
pub struct MockSchedulingService {
    /// Queued responses per operation
    responses: Mutex<HashMap<ServiceOperation, VecDeque<Result<(), ServiceError>>>>,
    /// Record of all calls made
    calls: Mutex<Vec<ServiceCall>>,
    /// Rules currently present, with their schedule expressions
    rules: Mutex<HashMap<String, String>>,
    /// Targets currently attached, keyed by (rule, target id)
    targets: Mutex<HashMap<(String, String), String>>,
}

impl MockSchedulingService {
    /// Creates a new mock service with no pre-configured responses.
    ///
    /// When no responses are queued, every call succeeds.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            rules: Mutex::new(HashMap::new()),
            targets: Mutex::new(HashMap::new()),
        }
    }

    /// Queues a response for the next call of `operation`.
    ///
    /// Responses are returned in the order they were added (FIFO). Once the
    /// queue for an operation is drained, calls succeed again.
    pub fn with_response(
        self,
        operation: ServiceOperation,
        response: Result<(), ServiceError>,
    ) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(response);
        self
    }

    /// Queues `count` failures for `operation`.
    pub fn with_failures(
        self,
        operation: ServiceOperation,
        error: ServiceError,
        count: usize,
    ) -> Self {
        let mut this = self;
        for _ in 0..count {
            this = this.with_response(operation, Err(error.clone()));
        }
        this
    }

    /// Returns all calls made to this mock, in order.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the calls of one operation, in order.
    pub fn calls_for(&self, operation: ServiceOperation) -> Vec<ServiceCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    /// Returns the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Clears all recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Returns true if a rule named `name` currently exists.
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.lock().unwrap().contains_key(name)
    }

    /// Returns the schedule expression of rule `name`, if it exists.
    pub fn rule_schedule(&self, name: &str) -> Option<String> {
        self.rules.lock().unwrap().get(name).cloned()
    }

    /// Returns the payload of target `target_id` on rule `rule_name`, if attached.
    pub fn target_payload(&self, rule_name: &str, target_id: &str) -> Option<String> {
        self.targets
            .lock()
            .unwrap()
            .get(&(rule_name.to_string(), target_id.to_string()))
            .cloned()
    }

    /// Returns the number of rules currently present.
    pub fn rule_count(&self) -> usize {
        self.rules.lock().unwrap().len()
    }

    fn record(&self, call: ServiceCall) -> Result<(), ServiceError> {
        let operation = call.operation();
        self.calls.lock().unwrap().push(call);
        self.responses
            .lock()
            .unwrap()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }
}

impl Default for MockSchedulingService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockSchedulingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSchedulingService")
            .field("call_count", &self.call_count())
            .field("rule_count", &self.rule_count())
            .finish()
    }
}

#[async_trait]
impl SchedulingService for MockSchedulingService {
    async fn put_rule(
        &self,
        name: &str,
        schedule_expression: &str,
        state: RuleState,
    ) -> Result<(), ServiceError> {
        self.record(ServiceCall::PutRule {
            name: name.to_string(),
            schedule_expression: schedule_expression.to_string(),
            state,
        })?;
        self.rules
            .lock()
            .unwrap()
            .insert(name.to_string(), schedule_expression.to_string());
        Ok(())
    }

    async fn put_target(
        &self,
        rule_name: &str,
        target_id: &str,
        destination: &str,
        payload: &str,
    ) -> Result<(), ServiceError> {
        self.record(ServiceCall::PutTarget {
            rule_name: rule_name.to_string(),
            target_id: target_id.to_string(),
            destination: destination.to_string(),
            payload: payload.to_string(),
        })?;
        self.targets.lock().unwrap().insert(
            (rule_name.to_string(), target_id.to_string()),
            payload.to_string(),
        );
        Ok(())
    }

    async fn remove_target(&self, rule_name: &str, target_id: &str) -> Result<(), ServiceError> {
        self.record(ServiceCall::RemoveTarget {
            rule_name: rule_name.to_string(),
            target_id: target_id.to_string(),
        })?;
        self.targets
            .lock()
            .unwrap()
            .remove(&(rule_name.to_string(), target_id.to_string()));
        Ok(())
    }

    async fn delete_rule(&self, name: &str) -> Result<(), ServiceError> {
        self.record(ServiceCall::DeleteRule {
            name: name.to_string(),
        })?;
        self.rules.lock().unwrap().remove(name);
        Ok(())
    }
}
