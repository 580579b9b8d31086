// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Warden - a configuration-driven, extensible security filter-chain
//! dispatch library for HTTP services.
//!
//! Warden answers one question per request: *which* of several
//! independently configured filter chains applies, and runs exactly that
//! one.  Chains are guarded by path matchers that are either purely
//! syntactic (segment globbing) or route-table-aware (consistent with how
//! the surrounding framework itself dispatches the request), evaluated in
//! ascending priority order with first-match-wins semantics.  Requests no
//! chain claims pass through untouched.
//!
//! # Core Principles
//!
//! - **Single selection**: at most one chain ever processes a request
//! - **Fail closed**: matcher evaluation failures count as no-match,
//!   never as a match
//! - **Extensibility**: design around traits for user extensions
//! - **Configuration**: drive chain declarations via configuration or code
//!
//! # Building a dispatcher
//!
//! ```rust
//! use std::sync::Arc;
//! use warden::{
//!     ChainDispatcher, ChainRegistration, DenyAllStage, MatcherSet, PathPattern,
//!     SyntacticPattern,
//! };
//!
//! # fn main() -> Result<(), warden::DispatchError> {
//! let admin = MatcherSet::new()
//!     .with(PathPattern::Syntactic(SyntacticPattern::literal("/admin/**")?));
//!
//! let dispatcher = ChainDispatcher::builder()
//!     .chain(ChainRegistration::new(
//!         "admin",
//!         0,
//!         admin,
//!         vec![Arc::new(DenyAllStage::default())],
//!     ))
//!     .build()?;
//!
//! assert!(dispatcher.resolve_path("/admin/users", None).is_some());
//! assert!(dispatcher.resolve_path("/public", None).is_none());
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Stages
//!
//! You can implement custom stages by implementing the `ChainStage` trait:
//!
//! ```rust
//! use async_trait::async_trait;
//! use warden::{ChainStage, DispatchError, DispatchRequest, StageFlow};
//!
//! #[derive(Debug)]
//! struct MyCustomStage;
//!
//! #[async_trait]
//! impl ChainStage for MyCustomStage {
//!     fn name(&self) -> &str {
//!         "my_custom_stage"
//!     }
//!
//!     async fn apply(&self, request: DispatchRequest) -> Result<StageFlow, DispatchError> {
//!         // Inspect or modify the request
//!         Ok(StageFlow::Continue(request))
//!     }
//! }
//! ```

// Module declarations
pub mod config;
pub mod core;
pub mod dispatch;
pub mod logging;
pub mod matcher;
pub mod stages;

// Re-export key types at the crate root for convenience
pub use crate::config::{
    Config, ConfigError, ConfigProvider, ConfigProviderExt, EnvConfigProvider, FileConfigProvider,
};
pub use crate::core::{
    ChainStage, DispatchError, DispatchOutcome, DispatchRequest, DispatchResponse, HttpMethod,
    RequestContext, StageFlow,
};
pub use crate::dispatch::{
    ChainConfig, ChainDispatcher, ChainHandle, ChainRegistration, DispatcherBuilder,
    PatternConfig, StageConfig,
};
pub use crate::matcher::{
    MatcherSet, PathPattern, RoutePattern, RoutePatternConfig, RouteResolver, StaticRouteTable,
    SyntacticPattern, SyntacticPatternConfig,
};
pub use crate::stages::{
    DenyAllConfig, DenyAllStage, HeaderStage, HeaderStageConfig, LoggingStage, LoggingStageConfig,
    PermitAllStage, StageFactory, register_stage,
};
