// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request authentication.
//!
//! Two gates with distinct 401 semantics: the login endpoint checks the
//! shared api key first (failure carries NO marker header), then the user
//! credentials (failure carries the marker header, proving the key cleared).
//! Successful logins mint an HS256 IdToken that invocation requests present
//! as a bearer token. Token timestamps are the one wall-clock read in the
//! gateway; everything else runs on monotonic time.

use crate::error::GatewayError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header present on a 401 iff the api-key gate was cleared
/// (`PADMA_USER_AUTHORIZED`; lowercase because header names normalize).
pub const AUTH_MARKER_HEADER: &str = "padma_user_authorized";

/// Minted token lifetime.
const TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: u64,
    exp: u64,
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

pub struct Authenticator {
    api_key: Option<String>,
    users: HashMap<String, String>,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Authenticator {
    pub fn new(api_key: Option<String>, jwt_secret: &str, users: Vec<(String, String)>) -> Self {
        Self {
            api_key,
            users: users.into_iter().collect(),
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    /// Gate on the shared api key. No configured key accepts everything.
    pub fn check_api_key(&self, provided: Option<&str>) -> Result<(), GatewayError> {
        match &self.api_key {
            None => Ok(()),
            Some(expected) if provided == Some(expected.as_str()) => Ok(()),
            Some(_) => Err(GatewayError::BadApiKey),
        }
    }

    /// Validate credentials and mint an IdToken.
    pub fn login(&self, username: &str, password: &str) -> Result<String, GatewayError> {
        let valid = self.users.get(username).is_some_and(|stored| stored == password);
        if !valid {
            return Err(GatewayError::BadCredentials);
        }

        let iat = unix_now();
        let claims = Claims { sub: username.to_string(), iat, exp: iat + TOKEN_TTL_SECS };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| GatewayError::BadCredentials)
    }

    /// Verify an `Authorization: Bearer <jwt>` header; returns the subject.
    pub fn verify_bearer(&self, authorization: Option<&str>) -> Result<String, GatewayError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(GatewayError::Unauthorized)?;

        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| GatewayError::Unauthorized)?;
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
