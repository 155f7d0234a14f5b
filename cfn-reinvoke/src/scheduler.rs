//! The reinvocation scheduler.
//!
//! [`ReinvocationScheduler`] turns "invoke me again in N minutes with this
//! payload" into a one-shot trigger rule plus a single target, and tears that
//! pair down once it is obsolete.
//!
//! Each operation is a short sequence of awaited service calls. There are no
//! retries, no rollback and no in-process state: a failure is returned to the
//! caller, who owns the retry policy. Rule and target names derive from the
//! request token, so retrying with the same token replaces the existing pair
//! instead of creating a second one.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cfn_reinvoke::{NoopSchedulingService, ReinvocationScheduler, ScheduleRequest};
//!
//! # tokio_test::block_on(async {
//! let scheduler = ReinvocationScheduler::new(Arc::new(NoopSchedulingService));
//!
//! let request = ScheduleRequest::new(
//!     "arn:aws:lambda:us-east-2:123456789:function:myproject",
//!     5,
//!     r#"{"callbackContext":{}}"#,
//!     "123e4567-e89b-12d3-a456-426614174000",
//! );
//! let pair = scheduler.schedule_reinvocation(&request).await.unwrap();
//! assert_eq!(
//!     pair.ids.rule_name.as_str(),
//!     "reinvoke-handler-123e4567-e89b-12d3-a456-426614174000"
//! );
//!
//! scheduler.cleanup(&pair.ids).await.unwrap();
//! # });
//! ```

use std::sync::Arc;

use tracing::Instrument;

use crate::client::SharedSchedulingService;
use crate::config::SchedulerConfig;
use crate::error::{ReinvokeError, ServiceOperation};
use crate::identifier::{IdentifierGenerator, RandomIdentifierGenerator};
use crate::types::{RequestToken, ScheduleRequest, TriggerIds, TriggerPair};

/// Creates the span wrapping one scheduler operation.
///
/// `status` starts empty and is recorded when the operation finishes.
pub(crate) fn create_reinvocation_span(
    operation: &'static str,
    rule_name: &str,
    target_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "reinvocation",
        operation = operation,
        rule_name = rule_name,
        target_id = target_id,
        status = tracing::field::Empty,
    )
}

/// Creates and removes one-shot reinvocation triggers.
pub struct ReinvocationScheduler {
    service: SharedSchedulingService,
    config: SchedulerConfig,
    generator: Arc<dyn IdentifierGenerator>,
}

impl ReinvocationScheduler {
    /// Creates a scheduler with default configuration and random identifiers.
    pub fn new(service: SharedSchedulingService) -> Self {
        Self::with_config(service, SchedulerConfig::default())
    }

    /// Creates a scheduler with custom configuration.
    pub fn with_config(service: SharedSchedulingService, config: SchedulerConfig) -> Self {
        Self {
            service,
            config,
            generator: Arc::new(RandomIdentifierGenerator),
        }
    }

    /// Replaces the source of fresh identifiers.
    pub fn with_identifier_generator(mut self, generator: Arc<dyn IdentifierGenerator>) -> Self {
        self.generator = generator;
        self
    }

    /// Returns the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Draws a fresh request token.
    ///
    /// Callers keep the token for the lifetime of one logical retry so every
    /// attempt maps onto the same trigger pair.
    pub fn new_request_token(&self) -> Result<RequestToken, ReinvokeError> {
        RequestToken::generate(self.generator.as_ref())
    }

    /// Draws fresh trigger ids from a new token.
    pub fn new_trigger_ids(&self) -> Result<TriggerIds, ReinvokeError> {
        TriggerIds::generate(self.generator.as_ref())
    }

    /// Resolves the names a request's trigger pair is created under.
    ///
    /// Overrides win over derived names. An empty request token has nothing
    /// to derive from, so a fresh token is drawn from the generator; such a
    /// request is not idempotent across retries.
    fn resolve_trigger_ids(&self, request: &ScheduleRequest) -> Result<TriggerIds, ReinvokeError> {
        let fully_overridden = request.rule_name.is_some() && request.target_id.is_some();
        if !request.request_token.is_empty() || fully_overridden {
            return Ok(request.trigger_ids());
        }

        let fresh = self.new_trigger_ids()?;
        tracing::debug!(
            rule_name = %fresh.rule_name,
            "Empty request token; drew fresh trigger ids"
        );
        Ok(TriggerIds {
            rule_name: request.rule_name.clone().unwrap_or(fresh.rule_name),
            target_id: request.target_id.clone().unwrap_or(fresh.target_id),
        })
    }

    /// Arranges one future invocation of `request.target`.
    ///
    /// Creates (or replaces) the rule first, then attaches the target. If the
    /// target attachment fails the rule stays in place; repeating the call
    /// with the same token heals it.
    ///
    /// # Errors
    ///
    /// - [`ReinvokeError::Validation`] when the target is empty, before any
    ///   service call
    /// - [`ReinvokeError::Identifier`] when the token is empty and no fresh
    ///   identifier can be drawn
    /// - [`ReinvokeError::Service`] naming the failed call otherwise
    pub async fn schedule_reinvocation(
        &self,
        request: &ScheduleRequest,
    ) -> Result<TriggerPair, ReinvokeError> {
        if request.target.is_empty() {
            return Err(ReinvokeError::validation("target cannot be empty"));
        }

        let ids = self.resolve_trigger_ids(request)?;
        if ids.rule_name.is_empty() || ids.target_id.is_empty() {
            return Err(ReinvokeError::validation(
                "rule name and target id cannot be empty",
            ));
        }
        let schedule = request.schedule();

        let span = create_reinvocation_span("schedule", &ids.rule_name, &ids.target_id);
        let result = async {
            let expression = schedule.expression();
            tracing::debug!(
                schedule = %expression,
                delay_minutes = request.delay_minutes,
                "Putting reinvocation rule"
            );

            self.service
                .put_rule(&ids.rule_name, &expression, self.config.rule_state)
                .await
                .map_err(|e| ReinvokeError::service(ServiceOperation::PutRule, e))?;

            self.service
                .put_target(
                    &ids.rule_name,
                    &ids.target_id,
                    &request.target,
                    &request.payload,
                )
                .await
                .map_err(|e| {
                    tracing::warn!(
                        error = %e,
                        "Target attachment failed; rule left in place"
                    );
                    ReinvokeError::service(ServiceOperation::PutTargets, e)
                })?;

            tracing::info!(schedule = %expression, "Scheduled reinvocation");
            Ok::<_, ReinvokeError>(TriggerPair {
                ids: ids.clone(),
                schedule,
                destination: request.target.clone(),
                payload: request.payload.clone(),
            })
        }
        .instrument(span.clone())
        .await;

        span.record("status", status_of(&result));
        result
    }

    /// Removes the target `target_id` and then deletes rule `rule_name`.
    ///
    /// Both calls are attempted once, in that order. The first error is
    /// returned; a failed target removal stops before the rule is deleted.
    ///
    /// # Errors
    ///
    /// - [`ReinvokeError::Validation`] when either name is empty, before any
    ///   service call
    /// - [`ReinvokeError::Service`] naming the failed call otherwise
    pub async fn cleanup_reinvocation(
        &self,
        rule_name: &str,
        target_id: &str,
    ) -> Result<(), ReinvokeError> {
        if rule_name.is_empty() {
            return Err(ReinvokeError::validation("rule name cannot be empty"));
        }
        if target_id.is_empty() {
            return Err(ReinvokeError::validation("target id cannot be empty"));
        }

        let span = create_reinvocation_span("cleanup", rule_name, target_id);
        let result = async {
            self.service
                .remove_target(rule_name, target_id)
                .await
                .map_err(|e| ReinvokeError::service(ServiceOperation::RemoveTargets, e))?;
            tracing::debug!("Removed reinvocation target");

            self.service.delete_rule(rule_name).await.map_err(|e| {
                tracing::warn!(error = %e, "Rule deletion failed; rule left without target");
                ReinvokeError::service(ServiceOperation::DeleteRule, e)
            })?;

            tracing::info!("Cleaned up reinvocation");
            Ok::<_, ReinvokeError>(())
        }
        .instrument(span.clone())
        .await;

        span.record("status", status_of(&result));
        result
    }

    /// Tears down the pair identified by `ids`.
    pub async fn cleanup(&self, ids: &TriggerIds) -> Result<(), ReinvokeError> {
        self.cleanup_reinvocation(&ids.rule_name, &ids.target_id)
            .await
    }
}

fn status_of<T>(result: &Result<T, ReinvokeError>) -> &'static str {
    if result.is_ok() {
        "succeeded"
    } else {
        "failed"
    }
}
