// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in chain stages
//!
//! Stages are **opt-in** – you must reference them in the `stages` array of
//! a chain for them to execute.  Each stage is documented below together
//! with its configuration schema.


use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use http::StatusCode;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::{
    ChainStage, DispatchError, DispatchRequest, DispatchResponse, StageFlow,
};
use crate::{debug_fmt, error_fmt, info_fmt, trace_fmt, warn_fmt};

/// Constructor signature every dynamic stage must implement
pub type StageConstructor = fn(serde_json::Value) -> Result<Arc<dyn ChainStage>, DispatchError>;

/// Global registry – `register_stage()` writes to it,
/// `StageFactory::create_stage()` reads from it.
static STAGE_REGISTRY: Lazy<RwLock<HashMap<String, StageConstructor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a stage under a unique name.
/// Call this **before** you build a dispatcher:
///
/// ```rust
/// use warden::{stages::register_stage, ChainStage};
///
/// #[derive(Debug)]
/// struct AuditStage;
///
/// #[async_trait::async_trait]
/// impl ChainStage for AuditStage {
///     fn name(&self) -> &str { "audit" }
/// }
///
/// register_stage("audit", |_cfg| Ok(std::sync::Arc::new(AuditStage)));
/// ```
pub fn register_stage(name: &str, ctor: StageConstructor) {
    STAGE_REGISTRY
        .write()
        .expect("STAGE_REGISTRY poisoned")
        .insert(name.to_string(), ctor);
}

/// Internal helper – fetch a constructor if somebody registered one.
fn get_registered_stage(name: &str) -> Option<StageConstructor> {
    STAGE_REGISTRY
        .read()
        .expect("STAGE_REGISTRY poisoned")
        .get(name)
        .copied()
}

/// A stage that lets every request continue unchanged.
///
/// Useful as the explicit body of a permit-all chain: the chain still
/// claims the request, nothing blocks it.
#[derive(Debug, Default)]
pub struct PermitAllStage;

#[async_trait]
impl ChainStage for PermitAllStage {
    fn name(&self) -> &str {
        "permit_all"
    }

    async fn apply(&self, request: DispatchRequest) -> Result<StageFlow, DispatchError> {
        trace_fmt!(
            "PermitAllStage",
            "Permitting {} {}",
            request.method,
            request.path
        );
        Ok(StageFlow::Continue(request))
    }
}

/// Configuration for a deny-all stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyAllConfig {
    /// Status code to answer with
    #[serde(default = "default_deny_status")]
    pub status: u16,
    /// Realm advertised in the 401 challenge
    #[serde(default = "default_realm")]
    pub realm: String,
}

fn default_deny_status() -> u16 {
    401
}

fn default_realm() -> String {
    "warden".to_string()
}

impl Default for DenyAllConfig {
    fn default() -> Self {
        Self {
            status: default_deny_status(),
            realm: default_realm(),
        }
    }
}

/// A stage that halts every request with a refusal.
///
/// With the default 401 status the response carries a Basic challenge so
/// that clients know an authenticator guards the path; the crate itself
/// never validates credentials.
#[derive(Debug)]
pub struct DenyAllStage {
    config: DenyAllConfig,
    status: StatusCode,
}

impl DenyAllStage {
    pub fn new(config: DenyAllConfig) -> Result<Self, DispatchError> {
        let status = StatusCode::from_u16(config.status).map_err(|e| {
            DispatchError::ConfigError(format!("invalid deny_all status {}: {}", config.status, e))
        })?;
        Ok(Self { config, status })
    }
}

impl Default for DenyAllStage {
    fn default() -> Self {
        Self {
            config: DenyAllConfig::default(),
            status: StatusCode::UNAUTHORIZED,
        }
    }
}

#[async_trait]
impl ChainStage for DenyAllStage {
    fn name(&self) -> &str {
        "deny_all"
    }

    async fn apply(&self, request: DispatchRequest) -> Result<StageFlow, DispatchError> {
        debug_fmt!(
            "DenyAllStage",
            "Denying {} {} with status {}",
            request.method,
            request.path,
            self.status
        );

        let mut response = DispatchResponse::new(self.status);
        if self.status == StatusCode::UNAUTHORIZED {
            response = response.with_header(
                "www-authenticate",
                &format!("Basic realm=\"{}\"", self.config.realm),
            );
        }
        Ok(StageFlow::Halt(response))
    }
}

/// Configuration for a logging stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingStageConfig {
    /// Log level to use
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to log the mount prefix alongside the path
    #[serde(default)]
    pub log_mount_prefix: bool,
}

fn default_log_level() -> String {
    "trace".to_string()
}

impl Default for LoggingStageConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_mount_prefix: false,
        }
    }
}

/// A stage that logs the request line and passes the request through.
#[derive(Debug, Default)]
pub struct LoggingStage {
    config: LoggingStageConfig,
}

impl LoggingStage {
    pub fn new(config: LoggingStageConfig) -> Self {
        Self { config }
    }

    fn log(&self, message: &str) {
        match self.config.log_level.to_lowercase().as_str() {
            "error" => error_fmt!("LoggingStage", "{}", message),
            "warn" => warn_fmt!("LoggingStage", "{}", message),
            "info" => info_fmt!("LoggingStage", "{}", message),
            "debug" => debug_fmt!("LoggingStage", "{}", message),
            _ => trace_fmt!("LoggingStage", "{}", message),
        }
    }
}

#[async_trait]
impl ChainStage for LoggingStage {
    fn name(&self) -> &str {
        "logging"
    }

    async fn apply(&self, request: DispatchRequest) -> Result<StageFlow, DispatchError> {
        if self.config.log_mount_prefix && !request.mount_prefix.is_empty() {
            self.log(&format!(
                "{} {} (mounted at {})",
                request.method, request.path, request.mount_prefix
            ));
        } else {
            self.log(&format!("{} {}", request.method, request.path));
        }
        Ok(StageFlow::Continue(request))
    }
}

/// Configuration for a header stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderStageConfig {
    /// Headers to add to the request
    #[serde(default)]
    pub add: HashMap<String, String>,
    /// Header names to remove from the request
    #[serde(default)]
    pub remove: Vec<String>,
}

/// A stage that adds or removes request headers before later stages see
/// the request.
#[derive(Debug, Default)]
pub struct HeaderStage {
    config: HeaderStageConfig,
}

impl HeaderStage {
    pub fn new(config: HeaderStageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChainStage for HeaderStage {
    fn name(&self) -> &str {
        "header"
    }

    async fn apply(&self, mut request: DispatchRequest) -> Result<StageFlow, DispatchError> {
        for name in &self.config.remove {
            if let Ok(name) = http::HeaderName::try_from(name.as_str()) {
                request.headers.remove(&name);
            }
        }

        for (name, value) in &self.config.add {
            match (
                http::HeaderName::try_from(name.as_str()),
                http::HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    request.headers.insert(name, value);
                }
                _ => {
                    warn_fmt!(
                        "HeaderStage",
                        "Skipping invalid header '{}: {}'",
                        name,
                        value
                    );
                }
            }
        }

        Ok(StageFlow::Continue(request))
    }
}

/// Factory for creating stages based on configuration.
#[derive(Debug)]
pub struct StageFactory;

impl StageFactory {
    /// Create a stage based on the stage type and configuration.
    pub fn create_stage(
        stage_type: &str,
        config: serde_json::Value,
    ) -> Result<Arc<dyn ChainStage>, DispatchError> {
        debug_fmt!(
            "StageFactory",
            "Creating stage of type '{}' with config: {}",
            stage_type,
            config
        );

        match stage_type {
            "permit_all" => Ok(Arc::new(PermitAllStage)),
            "deny_all" => {
                let deny_config: DenyAllConfig = if config.is_null() {
                    DenyAllConfig::default()
                } else {
                    serde_json::from_value(config).map_err(|e| {
                        DispatchError::ConfigError(format!("invalid deny_all config: {e}"))
                    })?
                };
                Ok(Arc::new(DenyAllStage::new(deny_config)?))
            }
            "logging" => {
                let logging_config: LoggingStageConfig = if config.is_null() {
                    LoggingStageConfig::default()
                } else {
                    serde_json::from_value(config).map_err(|e| {
                        DispatchError::ConfigError(format!("invalid logging config: {e}"))
                    })?
                };
                Ok(Arc::new(LoggingStage::new(logging_config)))
            }
            "header" => {
                let header_config: HeaderStageConfig = if config.is_null() {
                    HeaderStageConfig::default()
                } else {
                    serde_json::from_value(config).map_err(|e| {
                        DispatchError::ConfigError(format!("invalid header config: {e}"))
                    })?
                };
                Ok(Arc::new(HeaderStage::new(header_config)))
            }
            other => match get_registered_stage(other) {
                Some(ctor) => ctor(config),
                None => {
                    let err =
                        DispatchError::ConfigError(format!("unknown stage type: {other}"));
                    error_fmt!("StageFactory", "{}", err);
                    Err(err)
                }
            },
        }
    }
}
