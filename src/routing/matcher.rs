//! Route pattern compilation.
//!
//! # Responsibilities
//! - Turn `/users/:id` style patterns into anchored matchers
//! - Record parameter names in declaration order
//!
//! # Design Decisions
//! - Only whole segments starting with `:` are parameters
//! - Literal segments are regex-escaped
//! - Always anchored: a pattern never matches a prefix of a longer path

use regex::Regex;

/// Matcher produced from a route pattern.
///
/// `param_keys[i]` names the i-th capture group of the regex.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    param_keys: Vec<String>,
}

impl CompiledPattern {
    /// Compile a declared path pattern.
    pub fn compile(pattern: &str) -> Self {
        let mut param_keys = Vec::new();

        let segments: Vec<String> = pattern
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => {
                    param_keys.push(name.to_string());
                    "([^/]+)".to_string()
                }
                _ => regex::escape(segment),
            })
            .collect();

        let source = format!("^{}$", segments.join("/"));
        let regex = Regex::new(&source).expect("escaped route pattern is a valid regex");

        Self { regex, param_keys }
    }

    /// Returns true if the whole path matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Parameter names, in the order they appear in the pattern.
    pub fn param_keys(&self) -> &[String] {
        &self.param_keys
    }

    /// Anchored regex source, mostly useful for diagnostics.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
