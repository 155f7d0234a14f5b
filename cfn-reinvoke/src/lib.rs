//! # Reinvocation scheduling for long-running resource handlers
//!
//! A resource handler that cannot finish inside one invocation reports
//! "in progress, call me again later". This crate turns that request into a
//! durable one-shot trigger in a rule-based scheduling service (CloudWatch
//! Events / EventBridge), and removes the trigger once it is obsolete.
//!
//! ## Overview
//!
//! - **One-shot schedules**: [`OneShotSchedule`] pins a single UTC minute and
//!   renders it as `cron(MM HH DD MO ? YYYY)`.
//! - **Identifiers**: [`new_identifier`] draws canonical UUID strings; rule and
//!   target names derive from a caller-held [`RequestToken`].
//! - **Scheduling**: [`ReinvocationScheduler`] creates a rule plus one target,
//!   or removes both, through the narrow [`SchedulingService`] capability.
//! - **Planning**: [`plan_reschedule`] decides whether a short delay is better
//!   waited out in-process.
//!
//! ## Idempotent retries
//!
//! Rule and target names are `reinvoke-handler-<token>` and
//! `reinvoke-target-<token>`. The scheduling service upserts rules by name, so
//! calling [`ReinvocationScheduler::schedule_reinvocation`] again with the same
//! token replaces the pending trigger instead of leaking a second one.
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cfn_reinvoke::{
//!     EventBridgeSchedulingService, ReinvocationScheduler, ReinvokeError, ScheduleRequest,
//! };
//!
//! # async fn run() -> Result<(), ReinvokeError> {
//! let service = EventBridgeSchedulingService::from_env().await?;
//! let scheduler = ReinvocationScheduler::new(Arc::new(service));
//!
//! let token = scheduler.new_request_token()?;
//! let request = ScheduleRequest::new(
//!     "arn:aws:lambda:us-east-1:123456789012:function:handler",
//!     5,
//!     r#"{"callbackContext":{"stabilizing":true}}"#,
//!     token,
//! );
//! let pair = scheduler.schedule_reinvocation(&request).await?;
//!
//! // ...later, once the handler reaches a terminal state
//! scheduler.cleanup(&pair.ids).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure model
//!
//! Nothing is retried or rolled back internally. A failed target attachment
//! leaves the rule in place; a failed rule deletion leaves an inert rule with
//! no target. Both are healed by the caller retrying with the same ids. See
//! [`ReinvokeError`] for the taxonomy.
//!
//! ## Module Organization
//!
//! - [`client`]: the [`SchedulingService`] trait and its EventBridge and no-op implementations
//! - [`config`]: client and scheduler configuration
//! - [`cron`]: one-shot schedule expressions
//! - [`error`]: error types
//! - [`identifier`]: identifier generation
//! - [`planner`]: local-versus-remote reschedule planning
//! - [`scheduler`]: the reinvocation scheduler
//! - [`types`]: request, identity and value types

pub mod client;
pub mod config;
pub mod cron;
pub mod error;
pub mod identifier;
pub mod planner;
pub mod scheduler;
pub mod types;

// Re-export main types at crate root
pub use client::{
    EventBridgeSchedulingService, NoopSchedulingService, SchedulingService,
    SharedSchedulingService,
};
pub use config::{EventBridgeClientConfig, SchedulerConfig, DEFAULT_REGION};
pub use cron::{one_time_cron_expression, OneShotSchedule};
pub use error::{AwsError, ErrorObject, ReinvokeError, ServiceError, ServiceOperation};
pub use identifier::{
    identifier_from_key, is_canonical_identifier, new_identifier, IdentifierGenerator,
    RandomIdentifierGenerator,
};
pub use planner::{plan_reschedule, ReschedulePlan};
pub use scheduler::ReinvocationScheduler;
pub use types::{
    ContinuationPayload, RequestToken, RuleName, RuleState, ScheduleRequest, TargetId,
    TriggerIds, TriggerPair, RULE_NAME_PREFIX, TARGET_ID_PREFIX,
};
