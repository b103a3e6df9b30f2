//! Per-provider response classification
//!
//! Each downstream provider describes its own retriable status set, the
//! header carrying a server-specified retry delay, and the shape of its
//! quota-exhaustion signal. Nothing here is hard-coded to one provider.

use serde::{Deserialize, Serialize};

/// How a provider announces quota exhaustion, as opposed to generic rate
/// limiting: a specific status plus (optionally) an error code or type
/// embedded in the JSON failure body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaSignal {
    /// Status code the signal arrives with
    pub status: u16,

    /// Error codes (body `error.code`) that mark exhaustion; empty matches any
    #[serde(rename = "error-codes")]
    pub error_codes: Vec<String>,

    /// Error types (body `error.type`) that mark exhaustion; empty matches any
    #[serde(rename = "error-types")]
    pub error_types: Vec<String>,
}

impl Default for QuotaSignal {
    fn default() -> Self {
        Self {
            status: 429,
            error_codes: vec!["insufficient_quota".to_string()],
            error_types: vec!["insufficient_quota".to_string()],
        }
    }
}

impl QuotaSignal {
    /// Check whether a response matches this signal
    pub fn matches(&self, status: u16, body: &str) -> bool {
        if status != self.status {
            return false;
        }
        if self.error_codes.is_empty() && self.error_types.is_empty() {
            return true;
        }
        let Ok(data) = serde_json::from_str::<serde_json::Value>(body) else {
            return false;
        };
        let err = &data["error"];
        let code = err["code"].as_str().unwrap_or("");
        let typ = err["type"].as_str().unwrap_or("");
        self.error_codes.iter().any(|c| c == code) || self.error_types.iter().any(|t| t == typ)
    }
}

/// Classification rules for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderProfile {
    /// Provider name used in logs
    pub name: String,

    /// Statuses retried by the executor; everything else non-2xx is terminal
    #[serde(rename = "retriable-statuses")]
    pub retriable_statuses: Vec<u16>,

    /// Header carrying the server-specified retry delay in seconds
    #[serde(rename = "retry-after-header")]
    pub retry_after_header: String,

    /// Quota-exhaustion signal, if the provider has one
    pub quota: Option<QuotaSignal>,
}

impl Default for ProviderProfile {
    fn default() -> Self {
        Self {
            name: "provider".to_string(),
            retriable_statuses: vec![429, 500, 502, 503, 504],
            retry_after_header: "retry-after".to_string(),
            quota: None,
        }
    }
}

impl ProviderProfile {
    /// Profile with a name and the default retriable set
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Attach a quota signal
    pub fn with_quota(mut self, quota: QuotaSignal) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Check whether a status is in the retriable set
    pub fn is_retriable(&self, status: u16) -> bool {
        self.retriable_statuses.contains(&status)
    }

    /// Check whether a response is the quota-exhaustion signal
    pub fn is_quota(&self, status: u16, body: &str) -> bool {
        self.quota.as_ref().is_some_and(|q| q.matches(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retriable_set() {
        let profile = ProviderProfile::default();
        assert!(profile.is_retriable(429));
        assert!(profile.is_retriable(503));
        assert!(!profile.is_retriable(400));
        assert!(!profile.is_retriable(401));
    }

    #[test]
    fn test_quota_match_on_code() {
        let profile = ProviderProfile::named("assistant").with_quota(QuotaSignal::default());
        let body = r#"{"error": {"message": "You exceeded your quota", "type": "insufficient_quota", "code": "insufficient_quota"}}"#;

        assert!(profile.is_quota(429, body));
        // Same body on a different status is not the signal
        assert!(!profile.is_quota(503, body));
        // Generic rate limiting is not quota exhaustion
        assert!(!profile.is_quota(429, r#"{"error": {"type": "rate_limit_exceeded"}}"#));
    }

    #[test]
    fn test_quota_status_only() {
        let signal = QuotaSignal {
            status: 429,
            error_codes: vec![],
            error_types: vec![],
        };
        assert!(signal.matches(429, "anything"));
        assert!(!signal.matches(500, "anything"));
    }

    #[test]
    fn test_no_quota_configured() {
        let profile = ProviderProfile::named("marketplace");
        assert!(!profile.is_quota(429, "{}"));
    }
}
