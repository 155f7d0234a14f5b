//! Request and value types for reinvocation scheduling.
//!
//! String identifiers are wrapped in newtypes so a rule name cannot be passed
//! where a target id is expected. Each newtype offers:
//!
//! - `new`, which rejects empty values
//! - `new_unchecked` and `From<String>` / `From<&str>`, which do not validate
//! - `Deref<Target = str>`, `AsRef<str>` and `Display` for string access
//!
//! # Example
//!
//! ```rust
//! use cfn_reinvoke::types::{RequestToken, TriggerIds};
//!
//! let token = RequestToken::new("123e4567-e89b-12d3-a456-426614174000").unwrap();
//! let ids = TriggerIds::from_token(&token);
//! assert_eq!(ids.rule_name.as_str(), "reinvoke-handler-123e4567-e89b-12d3-a456-426614174000");
//! assert_eq!(ids.target_id.as_str(), "reinvoke-target-123e4567-e89b-12d3-a456-426614174000");
//!
//! assert!(RequestToken::new("").is_err());
//! ```

use std::fmt;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cron::OneShotSchedule;
use crate::error::ReinvokeError;
use crate::identifier::IdentifierGenerator;

/// Prefix of rule names derived from a request token.
pub const RULE_NAME_PREFIX: &str = "reinvoke-handler-";

/// Prefix of target ids derived from a request token.
pub const TARGET_ID_PREFIX: &str = "reinvoke-target-";

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "`, rejecting empty values.")]
            pub fn new(value: impl Into<String>) -> Result<Self, ReinvokeError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(ReinvokeError::validation(concat!(
                        stringify!($name),
                        " cannot be empty"
                    )));
                }
                Ok(Self(value))
            }

            #[doc = concat!("Creates a new `", stringify!($name), "` without validation.")]
            #[inline]
            pub fn new_unchecked(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the inner string value.
            #[inline]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Returns a reference to the inner string.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_newtype!(
    /// Name of a trigger rule in the scheduling service.
    RuleName
);

string_newtype!(
    /// Id of a trigger target, unique within its rule.
    TargetId
);

string_newtype!(
    /// Caller-supplied token correlating repeated attempts of the same retry.
    ///
    /// Rule and target names derive from it, so rescheduling with the same
    /// token replaces the existing trigger pair instead of adding another.
    RequestToken
);

string_newtype!(
    /// Caller-defined continuation state, forwarded to the target untouched.
    ///
    /// Nothing in this crate parses, validates or rewrites the payload.
    ContinuationPayload
);

impl RequestToken {
    /// Draws a fresh token from `generator`.
    pub fn generate(generator: &dyn IdentifierGenerator) -> Result<Self, ReinvokeError> {
        generator.new_identifier().map(Self)
    }
}

/// Whether a rule is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleState {
    #[default]
    Enabled,
    Disabled,
}

impl RuleState {
    /// Returns the wire value used by the scheduling service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a trigger rule and its single target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerIds {
    /// Name of the rule holding the schedule
    pub rule_name: RuleName,
    /// Id of the target attached to the rule
    pub target_id: TargetId,
}

impl TriggerIds {
    /// Creates ids from explicit names.
    pub fn new(rule_name: impl Into<RuleName>, target_id: impl Into<TargetId>) -> Self {
        Self {
            rule_name: rule_name.into(),
            target_id: target_id.into(),
        }
    }

    /// Derives both names from a single request token.
    pub fn from_token(token: &RequestToken) -> Self {
        Self {
            rule_name: RuleName(format!("{RULE_NAME_PREFIX}{token}")),
            target_id: TargetId(format!("{TARGET_ID_PREFIX}{token}")),
        }
    }

    /// Derives ids from a freshly generated token.
    pub fn generate(generator: &dyn IdentifierGenerator) -> Result<Self, ReinvokeError> {
        RequestToken::generate(generator).map(|token| Self::from_token(&token))
    }
}

/// Input to a reschedule operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Address to invoke when the trigger fires (e.g. a function ARN)
    pub target: String,
    /// Minutes from `base_time`; non-positive values fire at `base_time`
    pub delay_minutes: i64,
    /// Opaque continuation state delivered to the target
    pub payload: ContinuationPayload,
    /// Instant the delay is measured from
    pub base_time: DateTime<Utc>,
    /// Token the rule and target names derive from
    pub request_token: RequestToken,
    /// Explicit rule name, overriding the derived one
    pub rule_name: Option<RuleName>,
    /// Explicit target id, overriding the derived one
    pub target_id: Option<TargetId>,
}

impl ScheduleRequest {
    /// Creates a request measured from the current time.
    pub fn new(
        target: impl Into<String>,
        delay_minutes: i64,
        payload: impl Into<ContinuationPayload>,
        request_token: impl Into<RequestToken>,
    ) -> Self {
        Self {
            target: target.into(),
            delay_minutes,
            payload: payload.into(),
            base_time: Utc::now(),
            request_token: request_token.into(),
            rule_name: None,
            target_id: None,
        }
    }

    /// Sets the instant the delay is measured from.
    pub fn with_base_time(mut self, base_time: DateTime<Utc>) -> Self {
        self.base_time = base_time;
        self
    }

    /// Overrides the derived rule name.
    pub fn with_rule_name(mut self, rule_name: impl Into<RuleName>) -> Self {
        self.rule_name = Some(rule_name.into());
        self
    }

    /// Overrides the derived target id.
    pub fn with_target_id(mut self, target_id: impl Into<TargetId>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// Resolves the rule and target names, applying any overrides.
    pub fn trigger_ids(&self) -> TriggerIds {
        let derived = TriggerIds::from_token(&self.request_token);
        TriggerIds {
            rule_name: self.rule_name.clone().unwrap_or(derived.rule_name),
            target_id: self.target_id.clone().unwrap_or(derived.target_id),
        }
    }

    /// Computes the one-shot schedule this request asks for.
    pub fn schedule(&self) -> OneShotSchedule {
        OneShotSchedule::build(self.base_time, self.delay_minutes)
    }
}

/// A trigger rule and target created in the scheduling service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPair {
    /// Identity of the pair
    pub ids: TriggerIds,
    /// When the rule fires
    pub schedule: OneShotSchedule,
    /// Address the target invokes
    pub destination: String,
    /// Payload the target delivers
    pub payload: ContinuationPayload,
}
