//! Configuration for the reinvocation scheduler and its service client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::RuleState;

/// Default region when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration for the EventBridge scheduling service client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBridgeClientConfig {
    /// AWS region for the events service
    pub region: String,
    /// Optional custom endpoint URL (for testing)
    pub endpoint_url: Option<String>,
}

impl Default for EventBridgeClientConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
        }
    }
}

impl EventBridgeClientConfig {
    /// Creates a new config for the specified region.
    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint_url: None,
        }
    }

    /// Points the client at a custom endpoint.
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Creates a new config from AWS SDK config.
    pub fn from_aws_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            region: config
                .region()
                .map(|r| r.to_string())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: config.endpoint_url().map(str::to_string),
        }
    }

    /// Returns the events service endpoint URL.
    pub fn endpoint(&self) -> String {
        self.endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://events.{}.amazonaws.com", self.region))
    }
}

/// Tuning for how the scheduler arms rules and plans reschedules.
///
/// ## Defaults
///
/// | field | default |
/// |---|---|
/// | `rule_state` | `ENABLED` |
/// | `local_wait_threshold` | 60 seconds |
/// | `deadline_buffer_ratio` | 1.2 |
/// | `minimum_remote_delay_minutes` | 1 |
///
/// The scheduling service fires at one-minute granularity. Delays shorter
/// than `local_wait_threshold` are better served by waiting in-process,
/// provided the remaining invocation time exceeds the delay by
/// `deadline_buffer_ratio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// State rules are created in
    pub rule_state: RuleState,
    /// Delays below this may be waited out locally
    pub local_wait_threshold: Duration,
    /// Required headroom of remaining time over a local wait
    pub deadline_buffer_ratio: f64,
    /// Floor for remotely scheduled delays
    pub minimum_remote_delay_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rule_state: RuleState::Enabled,
            local_wait_threshold: Duration::from_secs(60),
            deadline_buffer_ratio: 1.2,
            minimum_remote_delay_minutes: 1,
        }
    }
}

impl SchedulerConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the state new rules are created in.
    pub fn with_rule_state(mut self, rule_state: RuleState) -> Self {
        self.rule_state = rule_state;
        self
    }

    /// Sets the local wait threshold.
    pub fn with_local_wait_threshold(mut self, threshold: Duration) -> Self {
        self.local_wait_threshold = threshold;
        self
    }

    /// Sets the deadline buffer ratio.
    pub fn with_deadline_buffer_ratio(mut self, ratio: f64) -> Self {
        self.deadline_buffer_ratio = ratio;
        self
    }

    /// Sets the minimum remote delay in minutes.
    pub fn with_minimum_remote_delay_minutes(mut self, minutes: i64) -> Self {
        self.minimum_remote_delay_minutes = minutes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = EventBridgeClientConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.endpoint_url.is_none());
        assert_eq!(config.endpoint(), "https://events.us-east-1.amazonaws.com");
    }

    #[test]
    fn test_client_config_with_region() {
        let config = EventBridgeClientConfig::with_region("us-west-2");
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.endpoint(), "https://events.us-west-2.amazonaws.com");
    }

    #[test]
    fn test_client_config_with_endpoint_url() {
        let config = EventBridgeClientConfig::with_region("eu-west-1")
            .with_endpoint_url("http://localhost:4566");
        assert_eq!(config.endpoint(), "http://localhost:4566");
    }

    #[test]
    fn test_client_config_from_aws_config() {
        let sdk_config = aws_config::SdkConfig::builder()
            .region(aws_config::Region::new("ap-southeast-2"))
            .build();
        let config = EventBridgeClientConfig::from_aws_config(&sdk_config);
        assert_eq!(config.region, "ap-southeast-2");
        assert!(config.endpoint_url.is_none());

        let sdk_config = aws_config::SdkConfig::builder().build();
        let config = EventBridgeClientConfig::from_aws_config(&sdk_config);
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn test_scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.rule_state, RuleState::Enabled);
        assert_eq!(config.local_wait_threshold, Duration::from_secs(60));
        assert_eq!(config.deadline_buffer_ratio, 1.2);
        assert_eq!(config.minimum_remote_delay_minutes, 1);
        assert_eq!(SchedulerConfig::new(), config);
    }

    #[test]
    fn test_scheduler_config_builders() {
        let config = SchedulerConfig::new()
            .with_rule_state(RuleState::Disabled)
            .with_local_wait_threshold(Duration::from_secs(30))
            .with_deadline_buffer_ratio(1.5)
            .with_minimum_remote_delay_minutes(2);
        assert_eq!(config.rule_state, RuleState::Disabled);
        assert_eq!(config.local_wait_threshold, Duration::from_secs(30));
        assert_eq!(config.deadline_buffer_ratio, 1.5);
        assert_eq!(config.minimum_remote_delay_minutes, 2);
    }
}
