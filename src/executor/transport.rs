//! Transport seam between the executor and the network
//!
//! The executor never talks to `reqwest` directly; it dispatches through the
//! `Transport` trait so retry and cooldown behavior can be tested against
//! scripted responses.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::descriptor::{RawResponse, RequestDescriptor};

/// A transport-level failure: no usable response was obtained
#[derive(Debug, Clone)]
pub struct TransportFault {
    /// Human-readable cause
    pub cause: String,
    /// Whether the failure was a timeout (vs connection-level)
    pub timed_out: bool,
}

/// Dispatch a single call attempt
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request once, returning whatever response arrived
    async fn send(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, TransportFault>;
}

/// Production transport backed by a shared `reqwest::Client`
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build the transport with a shared connection pool
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, descriptor: &RequestDescriptor) -> Result<RawResponse, TransportFault> {
        debug!(label = %descriptor.label, method = %descriptor.method, url = %descriptor.url, "HttpTransport::send: dispatching");

        let mut request = self
            .http
            .request(descriptor.method.clone(), &descriptor.url)
            .timeout(descriptor.timeout);

        for (name, value) in &descriptor.headers {
            request = request.header(name, value);
        }
        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| TransportFault {
            cause: e.to_string(),
            timed_out: e.is_timeout(),
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        // Body read failures after a received status line still count as
        // transport faults; the attempt produced no usable response.
        let body = response.text().await.map_err(|e| TransportFault {
            cause: format!("failed to read body: {e}"),
            timed_out: e.is_timeout(),
        })?;

        debug!(label = %descriptor.label, status, "HttpTransport::send: response received");
        Ok(RawResponse { status, headers, body })
    }
}
