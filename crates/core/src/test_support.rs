// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and helpers shared by other crates' tests.

use crate::function::{FunctionDescriptor, HttpMethod, RouteSpec};
use crate::id::FunctionName;
use std::collections::HashMap;

/// Build a minimal function descriptor for tests.
pub fn descriptor(name: &str) -> FunctionDescriptor {
    FunctionDescriptor {
        name: FunctionName::new(name),
        image_ref: format!("registry.local/{}:test", name),
        handler: "app.handler".to_string(),
        routes: vec![RouteSpec { path: format!("/api/{}", name), method: HttpMethod::Any }],
        env: HashMap::new(),
        max_capacity: 2,
        invoke_timeout_ms: None,
        idle_timeout_s: None,
    }
}

/// Build a descriptor with explicit capacity.
pub fn descriptor_with_capacity(name: &str, max_capacity: u32) -> FunctionDescriptor {
    FunctionDescriptor { max_capacity, ..descriptor(name) }
}
