// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Route-table-aware path patterns.
//!
//! A [`RoutePattern`] does not interpret its pattern string itself; it asks
//! an injected [`RouteResolver`] whether the framework's own route table
//! would dispatch the request to the handler registered under that pattern.
//! This keeps chain selection consistent with application routing,
//! independent of trailing-slash and suffix conventions.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::core::{DispatchError, DispatchRequest, HttpMethod};
use crate::warn_fmt;

/// Route-resolution capability supplied by the surrounding framework.
pub trait RouteResolver: fmt::Debug + Send + Sync {
    /// Whether `path`, served under `mount_prefix`, resolves to the handler
    /// registered for `pattern`.  `path` is the raw request path, mount
    /// prefix included.
    ///
    /// An `Err` means the resolver cannot decide (unknown handler,
    /// ambiguous mapping).  Callers must treat that as no-match.
    fn resolves(
        &self,
        path: &str,
        mount_prefix: &str,
        pattern: &str,
    ) -> Result<bool, DispatchError>;
}

/// Configuration for a route-table pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePatternConfig {
    /// The logical handler pattern to resolve against the route table.
    pub pattern: String,
    /// Restrict the pattern to one HTTP method.  `None` matches any method.
    #[serde(default)]
    pub method: Option<HttpMethod>,
    /// When set, the request's mount prefix must equal this value for the
    /// pattern to apply; otherwise the request's own mount prefix is used.
    #[serde(default)]
    pub mount_prefix: Option<String>,
}

impl RoutePatternConfig {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            method: None,
            mount_prefix: None,
        }
    }
}

/// A matcher that resolves requests through the framework route table.
#[derive(Debug)]
pub struct RoutePattern {
    config: RoutePatternConfig,
    resolver: Arc<dyn RouteResolver>,
    // Resolver failures are reported once per pattern, not once per request.
    failure_reported: AtomicBool,
}

impl RoutePattern {
    pub fn new(config: RoutePatternConfig, resolver: Arc<dyn RouteResolver>) -> Self {
        Self {
            config,
            resolver,
            failure_reported: AtomicBool::new(false),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.config.pattern
    }

    /// Check the request against the route table, failing closed on
    /// resolver errors.
    pub fn matches(&self, request: &DispatchRequest) -> bool {
        if let Some(required) = self.config.method {
            if required != request.method {
                return false;
            }
        }

        if let Some(mount) = &self.config.mount_prefix {
            if request.mount_prefix != *mount {
                return false;
            }
        }

        let mount = self
            .config
            .mount_prefix
            .as_deref()
            .unwrap_or(&request.mount_prefix);

        match self
            .resolver
            .resolves(&request.path, mount, &self.config.pattern)
        {
            Ok(matched) => matched,
            Err(e) => {
                if !self.failure_reported.swap(true, Ordering::Relaxed) {
                    warn_fmt!(
                        "RoutePattern",
                        "Route resolution failed for pattern '{}', treating as no-match: {}",
                        self.config.pattern,
                        e
                    );
                }
                false
            }
        }
    }
}

/// A [`RouteResolver`] backed by an explicitly registered route set.
///
/// Resolution mirrors how a framework route table dispatches: the mount
/// prefix is stripped, then one trailing `/` and any `.extension` on the
/// final segment are normalized away before comparing against the
/// registered pattern.  Patterns that were never registered yield an error,
/// which matchers treat as no-match.
#[derive(Debug, Default)]
pub struct StaticRouteTable {
    routes: RwLock<HashSet<String>>,
}

impl StaticRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler pattern.  Called by the surrounding framework
    /// while it builds its own routing; the dispatcher only reads.
    pub fn register(&self, pattern: &str) {
        if let Ok(mut routes) = self.routes.write() {
            routes.insert(pattern.to_string());
        }
    }

    fn normalize(path: &str) -> String {
        let path = match path.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest,
            _ => path,
        };
        match path.rsplit_once('/') {
            Some((head, last)) => match last.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => format!("{head}/{stem}"),
                _ => path.to_string(),
            },
            None => path.to_string(),
        }
    }
}

impl RouteResolver for StaticRouteTable {
    fn resolves(
        &self,
        path: &str,
        mount_prefix: &str,
        pattern: &str,
    ) -> Result<bool, DispatchError> {
        let routes = self
            .routes
            .read()
            .map_err(|_| DispatchError::Other("route table lock poisoned".to_string()))?;

        if !routes.contains(pattern) {
            return Err(DispatchError::MatcherError(format!(
                "no handler registered for pattern '{pattern}'"
            )));
        }

        let local = if mount_prefix.is_empty() {
            path
        } else {
            match path.strip_prefix(mount_prefix) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => return Ok(false),
            }
        };

        Ok(Self::normalize(local) == Self::normalize(pattern))
    }
}
