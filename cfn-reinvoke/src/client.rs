//! Scheduling service client.
//!
//! This module defines the `SchedulingService` trait, the narrow capability
//! the reinvocation scheduler needs from a rule-based scheduling backend, and
//! provides:
//!
//! - [`EventBridgeSchedulingService`], which talks to the CloudWatch Events /
//!   EventBridge JSON API over SigV4-signed HTTP requests
//! - [`NoopSchedulingService`], which accepts and logs every call (for local
//!   runs where no trigger should actually be created)

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use serde::{Deserialize, Serialize};

use crate::config::EventBridgeClientConfig;
use crate::error::{AwsError, ReinvokeError, ServiceError, ServiceOperation};
use crate::types::RuleState;

/// Capability interface over the scheduling service.
///
/// Implementations must make `put_rule` a create-or-replace operation and
/// should treat identical repeated mutations as idempotent. The scheduler
/// relies on this to collapse retries onto one trigger pair.
#[async_trait]
pub trait SchedulingService: Send + Sync {
    /// Creates or replaces the rule `name` with a schedule and state.
    async fn put_rule(
        &self,
        name: &str,
        schedule_expression: &str,
        state: RuleState,
    ) -> Result<(), ServiceError>;

    /// Attaches target `target_id` to `rule_name`.
    ///
    /// When the rule fires, `destination` is invoked with `payload` as its
    /// input, byte for byte.
    async fn put_target(
        &self,
        rule_name: &str,
        target_id: &str,
        destination: &str,
        payload: &str,
    ) -> Result<(), ServiceError>;

    /// Detaches target `target_id` from `rule_name`.
    async fn remove_target(&self, rule_name: &str, target_id: &str) -> Result<(), ServiceError>;

    /// Deletes the rule `name`.
    async fn delete_rule(&self, name: &str) -> Result<(), ServiceError>;
}

/// Type alias for a shared SchedulingService.
pub type SharedSchedulingService = Arc<dyn SchedulingService>;

/// Error codes the events service reports for transient conditions.
const RETRIABLE_CODES: &[&str] = &[
    "ThrottlingException",
    "TooManyRequestsException",
    "ConcurrentModificationException",
    "InternalException",
    "ServiceUnavailableException",
];

/// EventBridge-backed implementation of the SchedulingService.
///
/// Uses the `AWSEvents` JSON 1.1 protocol (`PutRule`, `PutTargets`,
/// `RemoveTargets`, `DeleteRule`) directly over HTTP.
pub struct EventBridgeSchedulingService {
    /// HTTP client for making requests
    http_client: reqwest::Client,
    /// AWS credentials provider
    credentials_provider: Arc<dyn ProvideCredentials>,
    /// Configuration for the client
    config: EventBridgeClientConfig,
}

impl EventBridgeSchedulingService {
    /// Creates a new client from the environment's shared AWS config.
    pub async fn from_env() -> Result<Self, ReinvokeError> {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::from_aws_config(&aws_config)
    }

    /// Creates a new client from AWS SDK config.
    pub fn from_aws_config(aws_config: &aws_config::SdkConfig) -> Result<Self, ReinvokeError> {
        let credentials_provider = aws_config
            .credentials_provider()
            .ok_or_else(|| ReinvokeError::configuration("No credentials provider configured"))?;

        Ok(Self {
            http_client: reqwest::Client::new(),
            credentials_provider: Arc::new(credentials_provider),
            config: EventBridgeClientConfig::from_aws_config(aws_config),
        })
    }

    /// Creates a new client with custom configuration.
    pub fn with_config(
        credentials_provider: Arc<dyn ProvideCredentials>,
        config: EventBridgeClientConfig,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            credentials_provider,
            config,
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &EventBridgeClientConfig {
        &self.config
    }

    /// Signs an HTTP request using AWS SigV4 and returns the signing headers.
    async fn sign_request(
        &self,
        uri: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Vec<(String, String)>, ServiceError> {
        let credentials = self
            .credentials_provider
            .provide_credentials()
            .await
            .map_err(|e| ServiceError::retriable(format!("Failed to get AWS credentials: {}", e)))?;

        let identity = credentials.into();
        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.config.region)
            .name("events")
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| {
                ServiceError::non_retriable(format!("Failed to build signing params: {}", e))
            })?;

        let signable_request = SignableRequest::new(
            "POST",
            uri,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| {
            ServiceError::non_retriable(format!("Failed to create signable request: {}", e))
        })?;

        let (signing_instructions, _signature) = sign(signable_request, &signing_params.into())
            .map_err(|e| ServiceError::non_retriable(format!("Failed to sign request: {}", e)))?
            .into_parts();

        // Apply the instructions to a scratch request to read the headers back.
        let mut temp_request = http::Request::builder()
            .method("POST")
            .uri(uri)
            .body(())
            .map_err(|e| {
                ServiceError::non_retriable(format!("Failed to build temp request: {}", e))
            })?;

        signing_instructions.apply_to_request_http1x(&mut temp_request);

        Ok(temp_request
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect())
    }

    /// Sends one `AWSEvents` action and returns the raw response body.
    async fn call<B: Serialize + Sync>(
        &self,
        operation: ServiceOperation,
        request_body: &B,
    ) -> Result<Vec<u8>, ServiceError> {
        let body = serde_json::to_vec(request_body).map_err(|e| {
            ServiceError::non_retriable(format!(
                "Failed to serialize {} request: {}",
                operation, e
            ))
        })?;

        let uri = format!("{}/", self.config.endpoint());
        let target = format!("AWSEvents.{}", operation.as_str());
        let headers = [
            ("content-type", "application/x-amz-json-1.1"),
            ("x-amz-target", target.as_str()),
        ];

        let signed_headers = self.sign_request(&uri, &headers, &body).await?;

        let mut request = self.http_client.post(&uri).body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        for (name, value) in signed_headers {
            request = request.header(&name, &value);
        }

        tracing::debug!(operation = %operation, endpoint = %uri, "Sending scheduling service request");

        let response = request.send().await.map_err(|e| ServiceError {
            message: format!("HTTP request failed: {}", e),
            is_retriable: e.is_timeout() || e.is_connect(),
            aws_error: None,
        })?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-amzn-requestid")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let response_body = response.bytes().await.map_err(|e| {
            ServiceError::retriable(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(classify_error(
                operation,
                status.as_u16(),
                &response_body,
                request_id,
            ));
        }

        Ok(response_body.to_vec())
    }
}

/// Request payload for PutRule.
#[derive(Debug, Clone, Serialize)]
struct PutRuleRequestBody<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "ScheduleExpression")]
    schedule_expression: &'a str,
    #[serde(rename = "State")]
    state: RuleState,
}

/// A single target entry in a PutTargets request.
#[derive(Debug, Clone, Serialize)]
struct TargetEntry<'a> {
    #[serde(rename = "Id")]
    id: &'a str,
    #[serde(rename = "Arn")]
    arn: &'a str,
    #[serde(rename = "Input")]
    input: &'a str,
}

/// Request payload for PutTargets.
#[derive(Debug, Clone, Serialize)]
struct PutTargetsRequestBody<'a> {
    #[serde(rename = "Rule")]
    rule: &'a str,
    #[serde(rename = "Targets")]
    targets: Vec<TargetEntry<'a>>,
}

/// Request payload for RemoveTargets.
#[derive(Debug, Clone, Serialize)]
struct RemoveTargetsRequestBody<'a> {
    #[serde(rename = "Rule")]
    rule: &'a str,
    #[serde(rename = "Ids")]
    ids: Vec<&'a str>,
}

/// Request payload for DeleteRule.
#[derive(Debug, Clone, Serialize)]
struct DeleteRuleRequestBody<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
}

/// Per-entry outcome of PutTargets / RemoveTargets.
#[derive(Debug, Clone, Default, Deserialize)]
struct TargetsResponse {
    #[serde(rename = "FailedEntryCount", default)]
    failed_entry_count: u32,
    #[serde(rename = "FailedEntries", default)]
    failed_entries: Vec<FailedEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct FailedEntry {
    #[serde(rename = "TargetId", default)]
    target_id: Option<String>,
    #[serde(rename = "ErrorCode", default)]
    error_code: Option<String>,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<String>,
}

/// Error body of the JSON 1.1 protocol.
#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorResponseBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// Maps a non-success HTTP response to a ServiceError.
fn classify_error(
    operation: ServiceOperation,
    status: u16,
    body: &[u8],
    request_id: Option<String>,
) -> ServiceError {
    let parsed: ErrorResponseBody = serde_json::from_slice(body).unwrap_or_default();
    let raw = String::from_utf8_lossy(body);

    // `__type` may be namespaced, e.g. "com.amazonaws.events#ResourceNotFoundException".
    let code = parsed
        .error_type
        .as_deref()
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .unwrap_or_else(|| match status {
            404 => "ResourceNotFoundException".to_string(),
            429 => "ThrottlingException".to_string(),
            _ => status.to_string(),
        });
    let message = parsed.message.unwrap_or_else(|| raw.to_string());

    let is_retriable =
        status == 429 || (500..600).contains(&status) || RETRIABLE_CODES.contains(&code.as_str());

    ServiceError {
        message: format!("{} returned {}: {}", operation, status, message),
        is_retriable,
        aws_error: Some(AwsError {
            code,
            message,
            request_id,
        }),
    }
}

/// Turns a PutTargets / RemoveTargets body with failed entries into an error.
fn check_failed_entries(operation: ServiceOperation, body: &[u8]) -> Result<(), ServiceError> {
    let response: TargetsResponse = if body.is_empty() {
        TargetsResponse::default()
    } else {
        serde_json::from_slice(body).map_err(|e| {
            ServiceError::non_retriable(format!(
                "Failed to deserialize {} response: {}",
                operation, e
            ))
        })?
    };

    if response.failed_entry_count == 0 && response.failed_entries.is_empty() {
        return Ok(());
    }

    let entry = response.failed_entries.first();
    let code = entry
        .and_then(|e| e.error_code.clone())
        .unwrap_or_else(|| "FailedEntry".to_string());
    let message = entry
        .and_then(|e| e.error_message.clone())
        .unwrap_or_else(|| "target entry was not applied".to_string());
    let target_id = entry.and_then(|e| e.target_id.clone()).unwrap_or_default();

    Err(ServiceError {
        message: format!(
            "{} failed for {} entr{} (targetId={}): {}",
            operation,
            response.failed_entry_count.max(1),
            if response.failed_entry_count > 1 { "ies" } else { "y" },
            target_id,
            message
        ),
        is_retriable: RETRIABLE_CODES.contains(&code.as_str()),
        aws_error: Some(AwsError::new(code, message)),
    })
}

#[async_trait]
impl SchedulingService for EventBridgeSchedulingService {
    async fn put_rule(
        &self,
        name: &str,
        schedule_expression: &str,
        state: RuleState,
    ) -> Result<(), ServiceError> {
        let body = PutRuleRequestBody {
            name,
            schedule_expression,
            state,
        };
        self.call(ServiceOperation::PutRule, &body).await?;
        Ok(())
    }

    async fn put_target(
        &self,
        rule_name: &str,
        target_id: &str,
        destination: &str,
        payload: &str,
    ) -> Result<(), ServiceError> {
        let body = PutTargetsRequestBody {
            rule: rule_name,
            targets: vec![TargetEntry {
                id: target_id,
                arn: destination,
                input: payload,
            }],
        };
        let response = self.call(ServiceOperation::PutTargets, &body).await?;
        check_failed_entries(ServiceOperation::PutTargets, &response)
    }

    async fn remove_target(&self, rule_name: &str, target_id: &str) -> Result<(), ServiceError> {
        let body = RemoveTargetsRequestBody {
            rule: rule_name,
            ids: vec![target_id],
        };
        let response = self.call(ServiceOperation::RemoveTargets, &body).await?;
        check_failed_entries(ServiceOperation::RemoveTargets, &response)
    }

    async fn delete_rule(&self, name: &str) -> Result<(), ServiceError> {
        let body = DeleteRuleRequestBody { name };
        self.call(ServiceOperation::DeleteRule, &body).await?;
        Ok(())
    }
}

/// A SchedulingService that accepts every call without side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSchedulingService;

#[async_trait]
impl SchedulingService for NoopSchedulingService {
    async fn put_rule(
        &self,
        name: &str,
        schedule_expression: &str,
        state: RuleState,
    ) -> Result<(), ServiceError> {
        tracing::info!(rule_name = name, schedule = schedule_expression, state = %state, "noop PutRule");
        Ok(())
    }

    async fn put_target(
        &self,
        rule_name: &str,
        target_id: &str,
        destination: &str,
        _payload: &str,
    ) -> Result<(), ServiceError> {
        tracing::info!(rule_name, target_id, destination, "noop PutTargets");
        Ok(())
    }

    async fn remove_target(&self, rule_name: &str, target_id: &str) -> Result<(), ServiceError> {
        tracing::info!(rule_name, target_id, "noop RemoveTargets");
        Ok(())
    }

    async fn delete_rule(&self, name: &str) -> Result<(), ServiceError> {
        tracing::info!(rule_name = name, "noop DeleteRule");
        Ok(())
    }
}

/// A call recorded by [`RecordingSchedulingService`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordedCall {
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

/// A recording SchedulingService for unit tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSchedulingService {
    calls: std::sync::Mutex<Vec<RecordedCall>>,
    failures: std::sync::Mutex<std::collections::HashMap<ServiceOperation, ServiceError>>,
}

#[cfg(test)]
impl RecordingSchedulingService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes every call of `operation` fail with `error`.
    pub(crate) fn failing(self, operation: ServiceOperation, error: ServiceError) -> Self {
        self.failures.lock().unwrap().insert(operation, error);
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: ServiceOperation, call: RecordedCall) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl SchedulingService for RecordingSchedulingService {
    async fn put_rule(
        &self,
        name: &str,
        schedule_expression: &str,
        state: RuleState,
    ) -> Result<(), ServiceError> {
        self.record(
            ServiceOperation::PutRule,
            RecordedCall::PutRule {
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
            RecordedCall::PutTarget {
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
            RecordedCall::RemoveTarget {
                rule_name: rule_name.to_string(),
                target_id: target_id.to_string(),
            },
        )
    }

    async fn delete_rule(&self, name: &str) -> Result<(), ServiceError> {
        self.record(
            ServiceOperation::DeleteRule,
            RecordedCall::DeleteRule {
                name: name.to_string(),
            },
        )
    }
}
