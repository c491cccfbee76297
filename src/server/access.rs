//! Admin access gate.
//!
//! Authorization proper lives outside this service; the gate is a boolean
//! check of a shared secret. Passing it yields the `AdminKey` capability
//! that every mutating engine operation requires, so privilege is carried
//! explicitly instead of read from ambient request state.

use super::state::ServerState;
use crate::engine::AdminKey;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use sha2::{Digest, Sha256};
use tracing::debug;

pub const HEADER_ADMIN_KEY: &str = "x-admin-key";

pub struct AdminAccess {
    pub key: AdminKey,
}

pub struct AccessDenied;

impl IntoResponse for AccessDenied {
    fn into_response(self) -> axum::response::Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Compare via fixed-length digests so the comparison does not leak the
/// position of the first mismatching byte.
fn keys_match(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

impl FromRequestParts<ServerState> for AdminAccess {
    type Rejection = AccessDenied;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(HEADER_ADMIN_KEY)
            .and_then(|v| v.to_str().ok());

        match presented {
            Some(presented) if keys_match(presented, &ctx.config.admin_key) => Ok(AdminAccess {
                key: AdminKey::new(),
            }),
            _ => {
                debug!("admin gate rejected request");
                Err(AccessDenied)
            }
        }
    }
}
