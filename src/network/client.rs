// Chat-completion client: one request/response cycle per instance
// Author: kelexine (https://github.com/kelexine)

use super::endpoint::Endpoint;
use super::streaming::StreamingResponse;
use crate::config::NetworkConfig;
use crate::error::{CompletionError, Result};
use crate::models::AssistantSettings;
use crate::utils::logging::sanitize;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Proxy;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a [`NetworkClient`] is in its single request/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    RequestSent,
    ResponseReceived,
    Closed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::Idle => "idle",
            ClientState::RequestSent => "request sent",
            ClientState::ResponseReceived => "response received",
            ClientState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Blocking client for the completion endpoint.
///
/// Calls must follow `send` → `receive` → `close`. Anything else is
/// rejected with [`CompletionError::InvalidState`]; a closed client is never
/// reused, build a new one for the next request.
pub struct NetworkClient {
    http_client: Client,
    endpoint: Endpoint,
    state: ClientState,
    pending: Option<Response>,
    stream: Option<StreamingResponse>,
}

impl NetworkClient {
    /// Resolve token, URL and proxy, and configure the transport.
    ///
    /// No connection is opened until [`NetworkClient::send`].
    pub fn new(network: &NetworkConfig, assistant: &AssistantSettings) -> Result<Self> {
        let endpoint = Endpoint::resolve(network, assistant)?;

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(network.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .use_rustls_tls();

        builder = match &endpoint.proxy {
            Some(route) => {
                let mut proxy = Proxy::all(&route.url)?;
                if let Some((username, password)) = &route.credentials {
                    proxy = proxy.basic_auth(username, password.expose());
                }
                debug!("Routing through proxy {}", route.url);
                builder.proxy(proxy)
            }
            // Direct connection; ignore proxies from the environment
            None => builder.no_proxy(),
        };

        let http_client = builder.build()?;

        debug!(
            "Created {} client for {}",
            if endpoint.is_tls() { "TLS" } else { "plain" },
            endpoint.url
        );

        Ok(Self {
            http_client,
            endpoint,
            state: ClientState::Idle,
            pending: None,
            stream: None,
        })
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// POST `body` to the completion endpoint.
    ///
    /// Transport failures (DNS, TLS, proxy) close the client and propagate.
    pub fn send(&mut self, body: impl Into<String>) -> Result<()> {
        self.expect_state(ClientState::Idle, "send")?;

        info!("Sending completion request to {}", self.endpoint.url);
        let result = self
            .http_client
            .post(self.endpoint.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(self.endpoint.token.expose())
            .header(CACHE_CONTROL, "no-cache")
            .body(body.into())
            .send();

        match result {
            Ok(response) => {
                self.pending = Some(response);
                self.state = ClientState::RequestSent;
                Ok(())
            }
            Err(e) => {
                self.state = ClientState::Closed;
                Err(e.into())
            }
        }
    }

    /// Take delivery of the response.
    ///
    /// A 4xx/5xx status is turned into a typed error and closes the client.
    /// Otherwise the live stream is returned; it stays owned by the client
    /// until [`NetworkClient::close`].
    pub fn receive(&mut self) -> Result<&mut StreamingResponse> {
        self.expect_state(ClientState::RequestSent, "receive")?;

        let response = match self.pending.take() {
            Some(response) => response,
            None => {
                self.state = ClientState::Closed;
                return Err(CompletionError::InvalidState(
                    "request sent but no response pending".to_string(),
                ));
            }
        };

        let status = response.status();
        debug!("Completion response status: {}", status);

        if status.is_client_error() || status.is_server_error() {
            self.state = ClientState::Closed;
            let body = response.text()?;
            let error = classify_error(status.as_u16(), &body);
            warn!("Provider rejected request: {}", sanitize(&error.to_string()));
            return Err(error);
        }

        self.state = ClientState::ResponseReceived;
        Ok(self.stream.insert(StreamingResponse::new(response)))
    }

    /// Release the response body and the connection. Safe in any state.
    pub fn close(&mut self) {
        if self.pending.take().is_some() || self.stream.take().is_some() {
            debug!("Closed completion response");
        }
        self.state = ClientState::Closed;
    }

    fn expect_state(&self, expected: ClientState, operation: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CompletionError::InvalidState(format!(
                "{} called while client is {} (expected {})",
                operation, self.state, expected
            )))
        }
    }
}

impl fmt::Debug for NetworkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkClient")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .finish()
    }
}

/// Map a 4xx/5xx body onto the error a caller can act on.
///
/// `{"error": {"code": "context_length_exceeded"}}` and
/// `{"error": {"type": "invalid_request_error", "param": "max_tokens"}}` mean
/// the prompt is too long; everything else is `Unknown`. Bodies without an
/// `error.message` report the status and raw body instead.
pub fn classify_error(status: u16, body: &str) -> CompletionError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let message = error_field(error, "message")
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body.trim()));

    let context_exceeded = error_field(error, "code") == Some("context_length_exceeded")
        || (error_field(error, "type") == Some("invalid_request_error")
            && error_field(error, "param") == Some("max_tokens"));

    if context_exceeded {
        CompletionError::ContextLengthExceeded(message)
    } else {
        CompletionError::Unknown(message)
    }
}

fn error_field<'a>(error: Option<&'a Value>, name: &str) -> Option<&'a str> {
    error.and_then(|e| e.get(name)).and_then(Value::as_str)
}
