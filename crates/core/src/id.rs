// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifiers shared across the control plane.
//!
//! Both ids are plain strings on the wire (routing table, container labels,
//! RPC bodies); the newtypes keep function names and runtime container ids
//! from crossing paths inside the services.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Derive a string id: construction, `&str` access, display, conversions,
/// and `Borrow<str>` so maps keyed by the id accept `&str` lookups.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Name of a declared function, as spelled in the routing table and the
    /// `esb_function` container label.
    FunctionName
}

string_id! {
    /// Runtime-assigned container identifier: unique, stable for the
    /// container's whole life, and the key the heartbeat/evict RPCs speak.
    ContainerId
}

impl ContainerId {
    /// Short prefix for log lines (runtime ids are long hex strings).
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
