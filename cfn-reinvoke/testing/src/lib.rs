//! Testing utilities for cfn-reinvoke
//!
//! This crate provides a call-recording [`MockSchedulingService`] so code
//! built on the reinvocation scheduler can be tested without AWS
//! infrastructure.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cfn_reinvoke_testing::{
//!     MockSchedulingService, ReinvocationScheduler, ServiceCall, ServiceError, ServiceOperation,
//! };
//!
//! # tokio_test::block_on(async {
//! let service = Arc::new(
//!     MockSchedulingService::new()
//!         .with_response(ServiceOperation::DeleteRule, Err(ServiceError::retriable("busy"))),
//! );
//! let scheduler = ReinvocationScheduler::new(service.clone());
//!
//! let err = scheduler.cleanup_reinvocation("rule", "target").await.unwrap_err();
//! assert_eq!(err.operation(), Some(ServiceOperation::DeleteRule));
//! assert!(matches!(service.calls()[0], ServiceCall::RemoveTarget { .. }));
//! # });
//! ```

pub mod mock_service;

pub use mock_service::{MockSchedulingService, ServiceCall};

// Re-export key types from the core crate for convenience
pub use cfn_reinvoke::{
    ReinvocationScheduler, ReinvokeError, RuleState, ScheduleRequest, SchedulingService,
    ServiceError, ServiceOperation, TriggerIds, TriggerPair,
};
