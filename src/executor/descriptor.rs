//! Request and response shapes for the executor

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Default per-call timeout when a descriptor does not override it
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// One outbound call, immutable per attempt
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method
    pub method: Method,
    /// Full target URL
    pub url: String,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// JSON body, if any
    pub body: Option<serde_json::Value>,
    /// Per-call timeout
    pub timeout: Duration,
    /// Short label used in logs
    pub label: String,
}

impl RequestDescriptor {
    /// Create a descriptor with the given method and URL
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            timeout: DEFAULT_CALL_TIMEOUT,
            label: "request".to_string(),
        }
    }

    /// GET shorthand
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST shorthand
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// PATCH shorthand
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the per-call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the log label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A response as seen by the executor, before classification
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: String,
}

impl RawResponse {
    /// Look up a header by (lowercase) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A successful response payload
#[derive(Debug, Clone)]
pub struct Payload {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl Payload {
    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ProviderError> {
        serde_json::from_str(&self.body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

/// Outcome of one `execute` call
#[derive(Debug)]
pub enum RequestOutcome {
    /// The provider answered with a success status
    Success(Payload),
    /// A retriable failure; `retry_after` carries the server hint if present,
    /// `quota` marks the quota-exhaustion subtype
    Retriable {
        status: Option<u16>,
        retry_after: Option<Duration>,
        quota: bool,
        detail: String,
    },
    /// A failure that will not succeed on retry
    Terminal { status: u16, detail: String },
    /// No response was obtained
    Transport { cause: String },
}

impl RequestOutcome {
    /// Check if this outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    /// Convert into the error taxonomy, surfacing the payload on success
    pub fn into_result(self) -> Result<Payload, ProviderError> {
        match self {
            RequestOutcome::Success(payload) => Ok(payload),
            RequestOutcome::Retriable {
                quota: true,
                retry_after,
                ..
            } => Err(ProviderError::QuotaExhausted {
                retry_after: retry_after.unwrap_or(Duration::ZERO),
            }),
            RequestOutcome::Retriable { status, detail, .. } => Err(ProviderError::Retriable { status, detail }),
            RequestOutcome::Terminal { status, detail } => Err(ProviderError::Terminal { status, detail }),
            RequestOutcome::Transport { cause } => Err(ProviderError::Transport(cause)),
        }
    }
}

/// Extract a short error description from a failure body.
///
/// Understands the OpenAI-style `{"error": {"message", "type", "code"}}`
/// shape; anything else is truncated raw.
pub fn error_summary(body: &str) -> String {
    const MAX_LEN: usize = 200;

    if let Ok(data) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(err) = data.get("error") {
            let mut parts = Vec::new();
            if let Some(typ) = err.get("type").and_then(|v| v.as_str())
                && !typ.is_empty()
            {
                parts.push(format!("type={typ}"));
            }
            if let Some(code) = err.get("code").and_then(|v| v.as_str())
                && !code.is_empty()
            {
                parts.push(format!("code={code}"));
            }
            if let Some(msg) = err.get("message").and_then(|v| v.as_str())
                && !msg.is_empty()
            {
                parts.push(format!("msg={msg}"));
            }
            if !parts.is_empty() {
                return parts.join("; ");
            }
        }
        let rendered = data.to_string();
        return rendered.chars().take(MAX_LEN).collect();
    }

    body.chars().take(MAX_LEN).collect()
}
