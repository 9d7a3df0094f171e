// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path+method → function name matching.
//!
//! Patterns are literal segments plus single-segment wildcards
//! (`/api/users/{id}`). The most-literal match wins; a known path with the
//! wrong method is 405, an unknown path 404. Lookups clone an `Arc` under a
//! read lock; reload swaps the whole table atomically.

use esb_core::{FunctionName, FunctionTable, HttpMethod};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no route matched")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    segments: Vec<Segment>,
    method: HttpMethod,
    function: FunctionName,
    literal_count: usize,
}

#[derive(Debug, Default)]
struct RouteTable {
    routes: Vec<CompiledRoute>,
}

/// Read-mostly route matcher shared across request handlers.
pub struct RouteMatcher {
    table: RwLock<Arc<RouteTable>>,
}

impl RouteMatcher {
    /// Compile the matcher from the declared function routes.
    pub fn from_table(functions: &FunctionTable) -> Self {
        let matcher = Self { table: RwLock::new(Arc::new(RouteTable::default())) };
        matcher.reload(functions);
        matcher
    }

    /// Atomically replace the compiled table (config reload).
    pub fn reload(&self, functions: &FunctionTable) {
        let mut routes = Vec::new();
        for fun in functions.iter() {
            for route in &fun.routes {
                let segments = compile(&route.path);
                let literal_count =
                    segments.iter().filter(|s| matches!(s, Segment::Literal(_))).count();
                routes.push(CompiledRoute {
                    segments,
                    method: route.method,
                    function: fun.name.clone(),
                    literal_count,
                });
            }
        }
        *self.table.write() = Arc::new(RouteTable { routes });
    }

    /// Resolve a request to a function name.
    pub fn lookup(&self, method: HttpMethod, path: &str) -> Result<FunctionName, MatchError> {
        let table = self.table.read().clone();
        let segments: Vec<&str> = split_path(path);

        let mut best: Option<&CompiledRoute> = None;
        let mut path_matched = false;

        for route in &table.routes {
            if !segments_match(&route.segments, &segments) {
                continue;
            }
            path_matched = true;
            if !route.method.accepts(method) {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => {
                    (route.literal_count, route.segments.len())
                        > (current.literal_count, current.segments.len())
                }
            };
            if better {
                best = Some(route);
            }
        }

        match best {
            Some(route) => Ok(route.function.clone()),
            None if path_matched => Err(MatchError::MethodNotAllowed),
            None => Err(MatchError::NotFound),
        }
    }
}

fn compile(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with('{') && s.ends_with('}') {
                Segment::Wildcard
            } else {
                Segment::Literal(s.to_string())
            }
        })
        .collect()
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('?').next().unwrap_or(path).split('/').filter(|s| !s.is_empty()).collect()
}

fn segments_match(pattern: &[Segment], path: &[&str]) -> bool {
    if pattern.len() != path.len() {
        return false;
    }
    pattern.iter().zip(path).all(|(seg, part)| match seg {
        Segment::Literal(lit) => lit == part,
        Segment::Wildcard => true,
    })
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
