// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core primitives – requests, responses, stages & dispatch outcomes.
//!
//! Everything that physically moves through a filter chain is defined in
//! this module.  Matching logic lives in `matcher`, selection and execution
//! in `dispatch`.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::warn_fmt;

/// Errors that can occur while building or driving a dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Matcher construction or evaluation error
    #[error("matcher error: {0}")]
    MatcherError(String),

    /// Stage execution error
    #[error("stage error: {0}")]
    StageError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<crate::config::ConfigError> for DispatchError {
    fn from(err: crate::config::ConfigError) -> Self {
        DispatchError::ConfigError(err.to_string())
    }
}

impl From<regex::Error> for DispatchError {
    fn from(e: regex::Error) -> Self {
        DispatchError::MatcherError(e.to_string())
    }
}

/// HTTP methods understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
    Connect,
}

impl HttpMethod {
    /// Parse a method token, ignoring case.  Returns `None` for tokens that
    /// are not one of the nine standard methods.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Head,
            HttpMethod::Options,
            HttpMethod::Patch,
            HttpMethod::Trace,
            HttpMethod::Connect,
        ]
        .into_iter()
        .find(|m| m.to_string().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Delete => write!(f, "DELETE"),
            HttpMethod::Head => write!(f, "HEAD"),
            HttpMethod::Options => write!(f, "OPTIONS"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Trace => write!(f, "TRACE"),
            HttpMethod::Connect => write!(f, "CONNECT"),
        }
    }
}

/// Represents an inbound HTTP request as seen by the dispatcher.
///
/// Clones share the same context; the body is cheap to clone.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: HttpMethod,
    /// Full request path, including any mount prefix.
    pub path: String,
    /// Leading path segment(s) the host environment strips before
    /// application-level routing.  Empty when the application is mounted
    /// at the root.
    pub mount_prefix: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub context: Arc<RwLock<RequestContext>>,
}

impl DispatchRequest {
    /// Create a request mounted at the root with no headers or body.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            mount_prefix: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            context: Arc::new(RwLock::new(RequestContext::default())),
        }
    }

    /// Set the mount prefix the host strips before routing.
    pub fn with_mount_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.mount_prefix = prefix.into();
        self
    }

    /// The path with the mount prefix removed.  Syntactic matching always
    /// runs against this, never against the raw path.
    pub fn route_path(&self) -> &str {
        if self.mount_prefix.is_empty() {
            return &self.path;
        }
        match self.path.strip_prefix(&self.mount_prefix) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => &self.path,
        }
    }
}

/// Represents an HTTP response produced by a chain stage.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl DispatchResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Attach a header.  Invalid names or values are logged and skipped so
    /// that a stage can never panic while answering a request.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => {
                warn_fmt!(
                    "DispatchResponse",
                    "Skipping invalid header '{}: {}'",
                    name,
                    value
                );
            }
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Context data that can be attached to a request and accessed by stages.
#[derive(Debug, Default, Clone)]
pub struct RequestContext {
    /// The original client's IP address
    pub client_ip: Option<String>,
    /// Custom attributes that can be set by stages
    pub attributes: HashMap<String, serde_json::Value>,
}

/// Outcome of a single stage.
#[derive(Debug)]
pub enum StageFlow {
    /// Hand the (possibly modified) request to the next stage.
    Continue(DispatchRequest),
    /// Stop the chain and answer the client directly.
    Halt(DispatchResponse),
}

/// A unit of request processing inside a chain – e.g. an access-control
/// decision, a header rewrite, an audit log entry.
#[async_trait::async_trait]
pub trait ChainStage: fmt::Debug + Send + Sync {
    /// Name shown in logs / error messages.
    fn name(&self) -> &str;

    /// Process the request.  Returning [`StageFlow::Halt`] short-circuits
    /// the rest of the chain.
    async fn apply(&self, request: DispatchRequest) -> Result<StageFlow, DispatchError> {
        Ok(StageFlow::Continue(request))
    }
}

/// What a dispatch call did with a request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A chain was selected and one of its stages produced a response.
    Handled {
        chain: String,
        response: DispatchResponse,
    },
    /// A chain was selected and every stage passed the request through.
    Forwarded(DispatchRequest),
    /// No registered chain matched; the request passes through untouched.
    Unmatched(DispatchRequest),
}

impl DispatchOutcome {
    pub fn is_unmatched(&self) -> bool {
        matches!(self, DispatchOutcome::Unmatched(_))
    }

    /// The response, when a stage produced one.
    pub fn response(&self) -> Option<&DispatchResponse> {
        match self {
            DispatchOutcome::Handled { response, .. } => Some(response),
            _ => None,
        }
    }

    /// The id of the chain that handled the request, if any.
    pub fn chain(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Handled { chain, .. } => Some(chain),
            _ => None,
        }
    }
}
