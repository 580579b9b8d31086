// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Syntactic path patterns – segment globbing with no framework knowledge.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{DispatchError, HttpMethod};

/// Configuration for a syntactic pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntacticPatternConfig {
    /// The path pattern to match.  `*` matches exactly one segment, `**`
    /// matches zero or more trailing segments and is only valid as the
    /// final segment.
    pub pattern: String,
    /// Restrict the pattern to one HTTP method.  `None` matches any method.
    #[serde(default)]
    pub method: Option<HttpMethod>,
    /// Also match the same path with exactly one trailing `/` appended.
    #[serde(default)]
    pub match_trailing_slash: bool,
    /// When the final segment is a literal, also match it with an arbitrary
    /// `.extension` suffix appended.
    #[serde(default)]
    pub match_file_extension_suffix: bool,
}

impl SyntacticPatternConfig {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            method: None,
            match_trailing_slash: false,
            match_file_extension_suffix: false,
        }
    }
}

/// A compiled syntactic matcher.
///
/// The pattern is translated into a regex once at construction; matching is
/// a single regex test plus a method comparison.  Path segments compare
/// case-sensitively, the method token does not.
#[derive(Debug)]
pub struct SyntacticPattern {
    config: SyntacticPatternConfig,
    regex: Regex,
}

impl SyntacticPattern {
    /// Compile a pattern with the given configuration.
    pub fn new(config: SyntacticPatternConfig) -> Result<Self, DispatchError> {
        let regex_pattern = Self::pattern_to_regex(&config)?;
        let regex = Regex::new(&regex_pattern).map_err(|e| {
            DispatchError::MatcherError(format!(
                "invalid pattern '{}': {}",
                config.pattern, e
            ))
        })?;
        Ok(Self { config, regex })
    }

    /// Compile a bare pattern string with default flags and no method.
    pub fn literal(pattern: &str) -> Result<Self, DispatchError> {
        Self::new(SyntacticPatternConfig::new(pattern))
    }

    pub fn pattern(&self) -> &str {
        &self.config.pattern
    }

    /// Check the given mount-stripped path and method against the pattern.
    pub fn matches(&self, path: &str, method: HttpMethod) -> bool {
        if let Some(required) = self.config.method {
            if required != method {
                return false;
            }
        }
        self.regex.is_match(path)
    }

    /// Translate the configured pattern into an anchored regex.
    fn pattern_to_regex(config: &SyntacticPatternConfig) -> Result<String, DispatchError> {
        let segments: Vec<&str> = if config.pattern.is_empty() {
            Vec::new()
        } else {
            config.pattern.split('/').collect()
        };

        if let Some(pos) = segments.iter().position(|s| *s == "**") {
            if pos != segments.len() - 1 {
                return Err(DispatchError::MatcherError(format!(
                    "invalid pattern '{}': '**' is only valid as the final segment",
                    config.pattern
                )));
            }
        }

        let mut regex_pattern = "^".to_string();
        let mut tail_wildcard = false;

        for (index, segment) in segments.iter().enumerate() {
            match *segment {
                "**" => {
                    // Matches the prefix alone, or the prefix plus any
                    // number of further segments.
                    regex_pattern.push_str("(?:/.*)?");
                    tail_wildcard = true;
                }
                "*" => {
                    if index > 0 {
                        regex_pattern.push('/');
                    }
                    regex_pattern.push_str("[^/]+");
                }
                literal => {
                    if index > 0 {
                        regex_pattern.push('/');
                    }
                    regex_pattern.push_str(&regex::escape(literal));
                    let is_final = index == segments.len() - 1;
                    if is_final && config.match_file_extension_suffix && !literal.is_empty() {
                        regex_pattern.push_str(r"(?:\.[^/]+)?");
                    }
                }
            }
        }

        if segments.is_empty() {
            // An empty pattern matches only the empty or root path.
            regex_pattern.push_str("/?");
        } else if config.match_trailing_slash && !tail_wildcard {
            regex_pattern.push_str("/?");
        }

        regex_pattern.push('$');
        Ok(regex_pattern)
    }
}
