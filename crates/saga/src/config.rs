//! Saga configuration loaded from environment variables.

use std::time::Duration;

/// Saga configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `ONB_CALL_TIMEOUT_MS` — deadline for each collaborator call (default: `10000`)
/// - `ONB_BEST_EFFORT_MAX_ATTEMPTS` — tries per best-effort stage (default: `1`)
/// - `ONB_TEMPLATE_PATH` — template directory for documents (default: `"templates/onboarding"`)
/// - `ONB_CONTRACT_TEMPLATE` — contract template name (default: `"contract"`)
/// - `ONB_BILLING_TEMPLATE` — billing template name (default: `"billing"`)
/// - `ONB_OTP_DEVICE_NAME` — device name sent with OTP requests (default: `"onboarding-web"`)
/// - `ONB_NOTIFICATION_SUBJECT` — subject of the completion email
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `ONB_LOG_JSON` — emit JSON logs when `true` (default: `false`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaConfig {
    pub call_timeout: Duration,
    pub best_effort_max_attempts: u32,
    pub template_path: String,
    pub contract_template: String,
    pub billing_template: String,
    pub otp_device_name: String,
    pub notification_subject: String,
    pub log_level: String,
    pub log_json: bool,
}

impl SagaConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            call_timeout: lookup("ONB_CALL_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.call_timeout),
            best_effort_max_attempts: lookup("ONB_BEST_EFFORT_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .filter(|n: &u32| *n >= 1)
                .unwrap_or(defaults.best_effort_max_attempts),
            template_path: string("ONB_TEMPLATE_PATH", defaults.template_path),
            contract_template: string("ONB_CONTRACT_TEMPLATE", defaults.contract_template),
            billing_template: string("ONB_BILLING_TEMPLATE", defaults.billing_template),
            otp_device_name: string("ONB_OTP_DEVICE_NAME", defaults.otp_device_name),
            notification_subject: string(
                "ONB_NOTIFICATION_SUBJECT",
                defaults.notification_subject,
            ),
            log_level: string("RUST_LOG", defaults.log_level),
            log_json: lookup("ONB_LOG_JSON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_json),
        }
    }

    /// Sets the collaborator call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets how many times a best-effort stage is tried.
    pub fn with_best_effort_max_attempts(mut self, attempts: u32) -> Self {
        self.best_effort_max_attempts = attempts.max(1);
        self
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(10_000),
            best_effort_max_attempts: 1,
            template_path: "templates/onboarding".to_string(),
            contract_template: "contract".to_string(),
            billing_template: "billing".to_string(),
            otp_device_name: "onboarding-web".to_string(),
            notification_subject: "Your onboarding documents".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = SagaConfig::default();
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert_eq!(config.best_effort_max_attempts, 1);
        assert_eq!(config.contract_template, "contract");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
    }

    #[test]
    fn test_empty_lookup_yields_defaults() {
        assert_eq!(SagaConfig::from_lookup(|_| None), SagaConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = SagaConfig::from_lookup(lookup_from(&[
            ("ONB_CALL_TIMEOUT_MS", "250"),
            ("ONB_BEST_EFFORT_MAX_ATTEMPTS", "3"),
            ("ONB_TEMPLATE_PATH", "/srv/templates"),
            ("ONB_LOG_JSON", "true"),
            ("RUST_LOG", "debug"),
        ]));
        assert_eq!(config.call_timeout, Duration::from_millis(250));
        assert_eq!(config.best_effort_max_attempts, 3);
        assert_eq!(config.template_path, "/srv/templates");
        assert!(config.log_json);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = SagaConfig::from_lookup(lookup_from(&[
            ("ONB_CALL_TIMEOUT_MS", "soon"),
            ("ONB_BEST_EFFORT_MAX_ATTEMPTS", "0"),
        ]));
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert_eq!(config.best_effort_max_attempts, 1);
    }

    #[test]
    fn test_builder_clamps_attempts() {
        let config = SagaConfig::default().with_best_effort_max_attempts(0);
        assert_eq!(config.best_effort_max_attempts, 1);
    }
}
