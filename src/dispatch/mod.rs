// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chain selection and execution.
//!
//! A [`ChainDispatcher`] owns an ordered list of [`ChainRegistration`]s.
//! Per request, the first registration whose matcher set matches wins and
//! its stages run; at most one chain ever processes a request.  Requests
//! matching no registration pass through untouched.
//!
//! Registrations are evaluated by ascending priority; equal priorities keep
//! their declaration order.  The dispatcher is built once at configuration
//! time and is read-only afterwards, so [`ChainDispatcher::resolve`] is
//! safe to call concurrently from any number of request-handling tasks.


use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{
    ChainStage, DispatchError, DispatchOutcome, DispatchRequest, HttpMethod, StageFlow,
};
use crate::matcher::{
    MatcherSet, PathPattern, RoutePattern, RoutePatternConfig, RouteResolver, SyntacticPattern,
    SyntacticPatternConfig,
};
use crate::stages::StageFactory;
use crate::{debug_fmt, error_fmt, trace_fmt};

/// Configuration for one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The ID of the chain (for logging and reference)
    pub id: String,
    /// Priority of the chain (lower means evaluated earlier)
    #[serde(default)]
    pub priority: i32,
    /// Patterns guarding this chain; empty means the chain matches
    /// every request
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
    /// Stages to run once the chain is selected
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// Configuration for a single pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternConfig {
    /// Segment-glob matching
    Syntactic(SyntacticPatternConfig),
    /// Framework-route-table matching
    RouteTable(RoutePatternConfig),
}

/// Configuration for a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// The type of stage
    #[serde(rename = "type")]
    pub type_: String,
    /// The configuration for the stage
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Binds a matcher set to an ordered stage sequence and a priority.
/// Immutable once constructed.
#[derive(Debug)]
pub struct ChainRegistration {
    id: String,
    priority: i32,
    matcher: MatcherSet,
    stages: Vec<Arc<dyn ChainStage>>,
}

impl ChainRegistration {
    /// Create a registration.  An empty stage sequence is legal: the chain
    /// still claims matching requests but performs no work.
    pub fn new(
        id: impl Into<String>,
        priority: i32,
        matcher: MatcherSet,
        stages: Vec<Arc<dyn ChainStage>>,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            matcher,
            stages,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn matcher(&self) -> &MatcherSet {
        &self.matcher
    }

    pub fn stages(&self) -> &[Arc<dyn ChainStage>] {
        &self.stages
    }
}

/// A selected chain, ready to run against the request that selected it.
#[derive(Debug)]
pub struct ChainHandle<'a> {
    registration: &'a ChainRegistration,
}

impl ChainHandle<'_> {
    pub fn id(&self) -> &str {
        self.registration.id()
    }

    pub fn priority(&self) -> i32 {
        self.registration.priority()
    }

    /// Run the chain's stages in order.  The first stage to halt produces
    /// the response; a stage error aborts the chain.
    pub async fn run(&self, mut request: DispatchRequest) -> Result<DispatchOutcome, DispatchError> {
        trace_fmt!(
            "ChainDispatcher",
            "Running chain '{}' with {} stages",
            self.registration.id(),
            self.registration.stages().len()
        );

        for stage in self.registration.stages() {
            match stage.apply(request).await {
                Ok(StageFlow::Continue(next)) => request = next,
                Ok(StageFlow::Halt(response)) => {
                    debug_fmt!(
                        "ChainDispatcher",
                        "Chain '{}' halted by stage '{}' with status {}",
                        self.registration.id(),
                        stage.name(),
                        response.status
                    );
                    return Ok(DispatchOutcome::Handled {
                        chain: self.registration.id().to_string(),
                        response,
                    });
                }
                Err(e) => {
                    let err = DispatchError::StageError(format!("{}: {}", stage.name(), e));
                    error_fmt!("ChainDispatcher", "{}", err);
                    return Err(err);
                }
            }
        }

        Ok(DispatchOutcome::Forwarded(request))
    }
}

/// Selects, per request, the single chain that applies.
#[derive(Debug)]
pub struct ChainDispatcher {
    registrations: Vec<ChainRegistration>,
}

impl ChainDispatcher {
    /// Build a dispatcher from declared registrations.  The sort is stable:
    /// ascending priority, with equal priorities keeping declaration order.
    pub fn build(mut registrations: Vec<ChainRegistration>) -> Self {
        registrations.sort_by_key(|r| r.priority);

        debug_fmt!(
            "ChainDispatcher",
            "Built dispatcher with {} chains: [{}]",
            registrations.len(),
            registrations
                .iter()
                .map(|r| format!("{}({})", r.id(), r.priority()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self { registrations }
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Find the first registration whose matcher set matches.  Matcher
    /// evaluation failures count as no-match for that registration and
    /// never abort the sweep.
    pub fn resolve(&self, request: &DispatchRequest) -> Option<ChainHandle<'_>> {
        trace_fmt!(
            "ChainDispatcher",
            "Resolving {} {} against {} chains",
            request.method,
            request.path,
            self.registrations.len()
        );

        for registration in &self.registrations {
            if registration.matcher.matches(request) {
                debug_fmt!(
                    "ChainDispatcher",
                    "Chain '{}' matched {} {}",
                    registration.id(),
                    request.method,
                    request.path
                );
                return Some(ChainHandle { registration });
            }
        }

        trace_fmt!(
            "ChainDispatcher",
            "No chain matched {} {}",
            request.method,
            request.path
        );
        None
    }

    /// Convenience entry point: resolve a bare path and optional method.
    /// An absent method defaults to `GET`.
    pub fn resolve_path(&self, path: &str, method: Option<HttpMethod>) -> Option<ChainHandle<'_>> {
        let request = DispatchRequest::new(method.unwrap_or(HttpMethod::Get), path);
        self.resolve(&request)
    }

    /// Resolve and execute in one step: run the selected chain's stages, or
    /// return [`DispatchOutcome::Unmatched`] when no chain claims the
    /// request.
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        match self.resolve(&request) {
            Some(handle) => handle.run(request).await,
            None => Ok(DispatchOutcome::Unmatched(request)),
        }
    }

    /// The registered chains in evaluation order.
    pub fn chains(&self) -> &[ChainRegistration] {
        &self.registrations
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }
}

/// Assembles a [`ChainDispatcher`] from code, configuration, or both.
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    registrations: Vec<ChainRegistration>,
    resolver: Option<Arc<dyn RouteResolver>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply the route-resolution capability used by `route_table`
    /// patterns.  Required before any such pattern is declared through
    /// configuration.
    pub fn with_route_resolver(mut self, resolver: Arc<dyn RouteResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Declare a chain.  Declaration order breaks priority ties.
    pub fn chain(mut self, registration: ChainRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    /// Declare every chain found under the `chains` configuration key.
    pub fn with_config(mut self, config: &Config) -> Result<Self, DispatchError> {
        let chain_configs: Option<Vec<ChainConfig>> = config.get("chains")?;

        if let Some(chain_configs) = chain_configs {
            for chain_config in chain_configs {
                let registration = self.build_registration(&chain_config)?;
                self.registrations.push(registration);
            }
        }

        Ok(self)
    }

    fn build_registration(
        &self,
        chain_config: &ChainConfig,
    ) -> Result<ChainRegistration, DispatchError> {
        let mut matcher = MatcherSet::new();
        for pattern_config in &chain_config.patterns {
            matcher.add(self.build_pattern(&chain_config.id, pattern_config)?);
        }

        let mut stages = Vec::with_capacity(chain_config.stages.len());
        for stage_config in &chain_config.stages {
            let stage = StageFactory::create_stage(&stage_config.type_, stage_config.config.clone())?;
            stages.push(stage);
        }

        Ok(ChainRegistration::new(
            chain_config.id.clone(),
            chain_config.priority,
            matcher,
            stages,
        ))
    }

    fn build_pattern(
        &self,
        chain_id: &str,
        pattern_config: &PatternConfig,
    ) -> Result<PathPattern, DispatchError> {
        match pattern_config {
            PatternConfig::Syntactic(config) => Ok(PathPattern::Syntactic(SyntacticPattern::new(
                config.clone(),
            )?)),
            PatternConfig::RouteTable(config) => {
                let resolver = self.resolver.clone().ok_or_else(|| {
                    DispatchError::ConfigError(format!(
                        "chain '{}' declares a route_table pattern but no route resolver was supplied",
                        chain_id
                    ))
                })?;
                Ok(PathPattern::RouteTable(RoutePattern::new(
                    config.clone(),
                    resolver,
                )))
            }
        }
    }

    /// Finalize the dispatcher.
    pub fn build(self) -> Result<ChainDispatcher, DispatchError> {
        Ok(ChainDispatcher::build(self.registrations))
    }
}
