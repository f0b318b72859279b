//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse route patterns into static, parameter and catch-all segments
//! - Store routes in one segment trie per HTTP method
//! - Resolve (method, path) to a route plus captured parameters
//! - Report which methods would match when the requested one does not
//!
//! # Pattern Syntax
//! ```text
//! /users            static segments
//! /users/:id        `:id` matches exactly one non-empty segment
//! /files/*rest      `*rest` matches the non-empty remainder, must be last
//! ```
//!
//! # Design Decisions
//! - A node holds any number of static children and at most one dynamic
//!   child (a parameter or a catch-all)
//! - Static children win; on a dead end lookup backtracks to the parameter
//!   branch, then the catch-all
//! - Duplicate (method, pattern) pairs are rejected, never overwritten
//! - `/a` and `/a/` are distinct patterns (trailing slash is an empty segment)

use std::collections::HashMap;

use axum::http::Method;
use thiserror::Error;

use crate::routing::handler::Params;

/// Errors raised while registering a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern is malformed.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    /// The exact (method, pattern) pair is already registered.
    #[error("route {method} {pattern} is already registered")]
    Duplicate { method: Method, pattern: String },

    /// The pattern is ambiguous with an existing pattern for the same method.
    #[error("route {method} {pattern} conflicts with existing wildcard '{existing}'")]
    Conflict {
        method: Method,
        pattern: String,
        existing: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WildcardKind {
    Param,
    CatchAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Static(&'a str),
    Wildcard(WildcardKind, &'a str),
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    let invalid = |reason| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    let rest = pattern
        .strip_prefix('/')
        .ok_or_else(|| invalid("must begin with '/'"))?;

    let raw: Vec<&str> = rest.split('/').collect();
    let mut segments = Vec::with_capacity(raw.len());

    for (i, seg) in raw.iter().enumerate() {
        let (kind, name) = if let Some(name) = seg.strip_prefix(':') {
            (WildcardKind::Param, name)
        } else if let Some(name) = seg.strip_prefix('*') {
            if i + 1 != raw.len() {
                return Err(invalid("catch-all must be the final segment"));
            }
            (WildcardKind::CatchAll, name)
        } else {
            if seg.contains([':', '*']) {
                return Err(invalid("wildcards must start a segment"));
            }
            segments.push(Segment::Static(seg));
            continue;
        };

        if name.is_empty() {
            return Err(invalid("wildcard name must not be empty"));
        }
        if name.contains([':', '*']) {
            return Err(invalid("only one wildcard per segment"));
        }
        segments.push(Segment::Wildcard(kind, name));
    }

    Ok(segments)
}

/// Split a request path into segments. `None` if it is not absolute.
fn split_path(path: &str) -> Option<Vec<&str>> {
    path.strip_prefix('/').map(|rest| rest.split('/').collect())
}

#[derive(Debug)]
struct Wildcard<T> {
    kind: WildcardKind,
    name: String,
    node: Box<Node<T>>,
}

impl<T> Wildcard<T> {
    fn syntax(&self) -> String {
        match self.kind {
            WildcardKind::Param => format!(":{}", self.name),
            WildcardKind::CatchAll => format!("*{}", self.name),
        }
    }
}

#[derive(Debug)]
struct Node<T> {
    statics: HashMap<String, Node<T>>,
    wildcard: Option<Wildcard<T>>,
    value: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            statics: HashMap::new(),
            wildcard: None,
            value: None,
        }
    }
}

impl<T> Node<T> {
    /// The wildcard child for `kind`/`name`, created if the slot is free.
    /// Returns the existing wildcard's syntax when it differs.
    fn wildcard_child(&mut self, kind: WildcardKind, name: &str) -> Result<&mut Node<T>, String> {
        let wildcard = self.wildcard.get_or_insert_with(|| Wildcard {
            kind,
            name: name.to_string(),
            node: Box::default(),
        });
        if wildcard.kind == kind && wildcard.name == name {
            Ok(wildcard.node.as_mut())
        } else {
            Err(wildcard.syntax())
        }
    }

    fn find<'n>(&'n self, segments: &[&str], params: &mut Params) -> Option<&'n T> {
        let Some((head, rest)) = segments.split_first() else {
            return self.value.as_ref();
        };

        if let Some(found) = self
            .statics
            .get(*head)
            .and_then(|child| child.find(rest, params))
        {
            return Some(found);
        }

        let wildcard = self.wildcard.as_ref()?;
        match wildcard.kind {
            WildcardKind::Param if !head.is_empty() => {
                params.push(wildcard.name.as_str(), *head);
                if let Some(found) = wildcard.node.find(rest, params) {
                    return Some(found);
                }
                params.pop();
                None
            }
            WildcardKind::Param => None,
            WildcardKind::CatchAll => {
                let remainder = segments.join("/");
                let value = wildcard.node.value.as_ref()?;
                if remainder.is_empty() {
                    return None;
                }
                params.push(wildcard.name.as_str(), remainder);
                Some(value)
            }
        }
    }

    /// Case-insensitive `find`. On success `fixed` holds the path segments
    /// spelled as registered.
    fn find_fixed(&self, segments: &[&str], fixed: &mut Vec<String>) -> bool {
        let Some((head, rest)) = segments.split_first() else {
            return self.value.is_some();
        };

        if let Some(child) = self.statics.get(*head) {
            fixed.push(head.to_string());
            if child.find_fixed(rest, fixed) {
                return true;
            }
            fixed.pop();
        }

        let lower = head.to_lowercase();
        for (key, child) in &self.statics {
            if key.as_str() != *head && key.to_lowercase() == lower {
                fixed.push(key.clone());
                if child.find_fixed(rest, fixed) {
                    return true;
                }
                fixed.pop();
            }
        }

        let Some(wildcard) = &self.wildcard else {
            return false;
        };
        match wildcard.kind {
            WildcardKind::Param if !head.is_empty() => {
                fixed.push(head.to_string());
                if wildcard.node.find_fixed(rest, fixed) {
                    return true;
                }
                fixed.pop();
                false
            }
            WildcardKind::Param => false,
            WildcardKind::CatchAll => {
                let remainder = segments.join("/");
                if remainder.is_empty() || wildcard.node.value.is_none() {
                    return false;
                }
                fixed.push(remainder);
                true
            }
        }
    }
}

/// Result of resolving a request against the route table.
#[derive(Debug)]
pub enum Lookup<'a, T> {
    Found { value: &'a T, params: Params },
    /// The path matches only under these other methods (sorted).
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Routes keyed by method, each method backed by its own segment trie.
///
/// Built during a single-threaded registration phase and read-only afterwards.
#[derive(Debug)]
pub struct RouteTable<T> {
    trees: HashMap<Method, Node<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under (method, pattern).
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouteError> {
        self.insert_with(method, pattern, || value).map(|_| ())
    }

    /// Register the value built by `make` under (method, pattern).
    ///
    /// `make` runs only once the route is known to be accepted. On error the
    /// table is left unchanged.
    pub fn insert_with<F>(&mut self, method: Method, pattern: &str, make: F) -> Result<&mut T, RouteError>
    where
        F: FnOnce() -> T,
    {
        let segments = parse_pattern(pattern)?;

        // Conflicts and duplicates are only found on nodes that already
        // exist. Everything created below a fresh node is fresh, so once a
        // node is created the insert cannot fail.
        let mut node = self.trees.entry(method.clone()).or_default();
        for segment in segments {
            node = match segment {
                Segment::Static(seg) => node.statics.entry(seg.to_string()).or_default(),
                Segment::Wildcard(kind, name) => {
                    node.wildcard_child(kind, name)
                        .map_err(|existing| RouteError::Conflict {
                            method: method.clone(),
                            pattern: pattern.to_string(),
                            existing,
                        })?
                }
            };
        }

        if node.value.is_some() {
            return Err(RouteError::Duplicate {
                method,
                pattern: pattern.to_string(),
            });
        }
        Ok(node.value.insert(make()))
    }

    /// Resolve a request path under `method`.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, T> {
        let Some(segments) = split_path(path) else {
            return Lookup::NotFound;
        };

        if let Some(tree) = self.trees.get(method) {
            let mut params = Params::new();
            if let Some(value) = tree.find(&segments, &mut params) {
                return Lookup::Found { value, params };
            }
        }

        let mut allowed: Vec<Method> = self
            .trees
            .iter()
            .filter(|(m, _)| *m != method)
            .filter(|(_, tree)| tree.find(&segments, &mut Params::new()).is_some())
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Lookup::MethodNotAllowed(allowed)
        }
    }

    /// Case-insensitive lookup under `method`, returning the path with each
    /// static segment spelled as registered. Captured values keep their case.
    pub fn fixed_path(&self, method: &Method, path: &str) -> Option<String> {
        let tree = self.trees.get(method)?;
        let segments = split_path(path)?;
        let mut fixed = Vec::with_capacity(segments.len());
        tree.find_fixed(&segments, &mut fixed)
            .then(|| format!("/{}", fixed.join("/")))
    }

    /// Every method with at least one route, sorted.
    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.trees.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    /// True if `path` resolves to a route under `method`.
    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        match (self.trees.get(method), split_path(path)) {
            (Some(tree), Some(segments)) => tree.find(&segments, &mut Params::new()).is_some(),
            _ => false,
        }
    }
}
