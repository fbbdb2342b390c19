//! HTTP transport for SOAP requests.

use crate::config::HttpConfig;
use crate::error::{IseeError, Result};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::debug;

/// One SOAP POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapRequest {
    /// Full endpoint URL
    pub url: String,
    /// SOAPAction header value, quotes included
    pub soap_action: &'static str,
    /// Serialized envelope
    pub body: String,
}

/// Raw HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapResponse {
    pub status: u16,
    pub body: String,
}

impl SoapResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a request and blocks until the reply body has been read.
pub trait Transport {
    fn post(&self, request: &SoapRequest) -> Result<SoapResponse>;
}

/// Blocking reqwest transport. No retries and no timeouts: reqwest's default
/// request timeout is switched off, so a server that never answers blocks the
/// caller.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    user_agent: String,
    content_type: String,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| IseeError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            content_type: config.content_type.clone(),
        })
    }
}

impl Transport for HttpTransport {
    fn post(&self, request: &SoapRequest) -> Result<SoapResponse> {
        debug!(
            url = %request.url,
            soap_action = %request.soap_action,
            body_size = request.body.len(),
            "Sending SOAP request"
        );

        let response = self
            .client
            .post(&request.url)
            .header(USER_AGENT, &self.user_agent)
            .header("SOAPAction", request.soap_action)
            .header(CONTENT_TYPE, &self.content_type)
            .body(request.body.clone())
            .send()
            .map_err(|e| IseeError::Transport(format!("POST {} failed: {}", request.url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| IseeError::Transport(format!("Failed to read response from {}: {}", request.url, e)))?;

        debug!(url = %request.url, status, body_size = body.len(), "Received SOAP response");
        Ok(SoapResponse { status, body })
    }
}
