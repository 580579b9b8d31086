// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request matchers – the predicates that decide which chain applies.
//!
//! A [`PathPattern`] is a single compiled matcher in one of two flavours:
//!
//! | variant      | semantics                                              |
//! |--------------|--------------------------------------------------------|
//! | `Syntactic`  | segment globbing against the mount-stripped path       |
//! | `RouteTable` | resolution through the framework's own route table     |
//!
//! A [`MatcherSet`] ORs any number of patterns together and guards one
//! chain.  The empty set matches **everything**: a chain configured without
//! matchers covers all traffic, it does not silently cover none.

mod routes;
mod syntactic;


pub use routes::{RoutePattern, RoutePatternConfig, RouteResolver, StaticRouteTable};
pub use syntactic::{SyntacticPattern, SyntacticPatternConfig};

use crate::core::DispatchRequest;

/// A single compiled request matcher.
#[derive(Debug)]
pub enum PathPattern {
    /// Purely syntactic segment-glob matching.
    Syntactic(SyntacticPattern),
    /// Framework-route-table matching.
    RouteTable(RoutePattern),
}

impl PathPattern {
    /// Check the request against this pattern.  Evaluation failures inside
    /// a variant are absorbed as no-match; this call never errors.
    pub fn matches(&self, request: &DispatchRequest) -> bool {
        match self {
            PathPattern::Syntactic(p) => p.matches(request.route_path(), request.method),
            PathPattern::RouteTable(p) => p.matches(request),
        }
    }

    /// The configured pattern string, for diagnostics.
    pub fn pattern(&self) -> &str {
        match self {
            PathPattern::Syntactic(p) => p.pattern(),
            PathPattern::RouteTable(p) => p.pattern(),
        }
    }
}

/// Ordered OR-combination of patterns guarding one chain.
#[derive(Debug, Default)]
pub struct MatcherSet {
    patterns: Vec<PathPattern>,
}

impl MatcherSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An explicit match-everything set.
    pub fn any() -> Self {
        Self::new()
    }

    /// Append a pattern.  Construction is append-only; patterns are never
    /// removed once added.
    pub fn add(&mut self, pattern: PathPattern) {
        self.patterns.push(pattern);
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, pattern: PathPattern) -> Self {
        self.add(pattern);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// The contained patterns, in insertion order.
    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// True iff at least one contained pattern matches.  The empty set
    /// matches every request.
    pub fn matches(&self, request: &DispatchRequest) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns.iter().any(|p| p.matches(request))
    }
}

impl From<PathPattern> for MatcherSet {
    fn from(pattern: PathPattern) -> Self {
        MatcherSet::new().with(pattern)
    }
}
