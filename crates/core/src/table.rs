// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing-table loading.
//!
//! The table is a TOML file with one `[[function]]` block per declared
//! function. Both services load it: the gateway derives its route matcher
//! from it, the orchestrator its image/env/capacity knowledge.

use crate::function::{FunctionDescriptor, HttpMethod, RouteSpec};
use crate::id::FunctionName;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors from loading or validating a routing table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read routing table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse routing table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate function name: {0}")]
    DuplicateFunction(FunctionName),

    #[error("function {function}: {reason}")]
    Invalid { function: FunctionName, reason: String },
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default, rename = "function")]
    functions: Vec<RawFunction>,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    name: String,
    image: String,
    handler: String,
    #[serde(default)]
    routes: Vec<RawRoute>,
    #[serde(default)]
    env: HashMap<String, String>,
    max_capacity: Option<u32>,
    invoke_timeout_ms: Option<u64>,
    idle_timeout_s: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    path: String,
    method: String,
}

/// Immutable set of declared functions, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<FunctionName, Arc<FunctionDescriptor>>,
}

impl FunctionTable {
    /// Load and validate a routing table from disk.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate a routing table from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, TableError> {
        let file: TableFile = toml::from_str(raw)?;
        let mut functions = HashMap::new();

        for raw_fun in file.functions {
            let name = FunctionName::new(&raw_fun.name);
            if raw_fun.name.is_empty() {
                return Err(TableError::Invalid {
                    function: name,
                    reason: "empty function name".to_string(),
                });
            }
            if raw_fun.image.is_empty() {
                return Err(TableError::Invalid {
                    function: name,
                    reason: "empty image reference".to_string(),
                });
            }

            let mut routes = Vec::with_capacity(raw_fun.routes.len());
            for raw_route in &raw_fun.routes {
                let method: HttpMethod =
                    raw_route.method.parse().map_err(|reason| TableError::Invalid {
                        function: name.clone(),
                        reason,
                    })?;
                if !raw_route.path.starts_with('/') {
                    return Err(TableError::Invalid {
                        function: name.clone(),
                        reason: format!("route path must start with '/': {}", raw_route.path),
                    });
                }
                routes.push(RouteSpec { path: raw_route.path.clone(), method });
            }

            let descriptor = FunctionDescriptor {
                name: name.clone(),
                image_ref: raw_fun.image,
                handler: raw_fun.handler,
                routes,
                env: raw_fun.env,
                max_capacity: raw_fun.max_capacity.unwrap_or(crate::function::DEFAULT_MAX_CAPACITY),
                invoke_timeout_ms: raw_fun.invoke_timeout_ms,
                idle_timeout_s: raw_fun.idle_timeout_s,
            };

            if functions.insert(name.clone(), Arc::new(descriptor)).is_some() {
                return Err(TableError::DuplicateFunction(name));
            }
        }

        Ok(Self { functions })
    }

    /// Build a table directly from descriptors (tests, embedded setups).
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = FunctionDescriptor>) -> Self {
        let functions = descriptors
            .into_iter()
            .map(|fun| (fun.name.clone(), Arc::new(fun)))
            .collect();
        Self { functions }
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionDescriptor>> {
        self.functions.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FunctionDescriptor>> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
