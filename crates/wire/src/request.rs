// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use esb_core::{ContainerId, FunctionName};
use serde::{Deserialize, Serialize};

/// Body of `POST /containers/ensure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureRequest {
    pub function_name: FunctionName,
}

/// Body of `POST /containers/heartbeat`.
///
/// `ids` is the set of containers the gateway currently has checked out or
/// cached — both count as "in use" for reaping purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub ids: Vec<ContainerId>,
}

/// Body of `POST /containers/evict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictRequest {
    pub container_id: ContainerId,
}
