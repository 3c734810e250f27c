//! Production request guards.
//!
//! Origin and Host validation plus optional bearer-token auth. All of it is
//! gated behind `--production`; a local development server accepts anything.

use axum::http::header::{AUTHORIZATION, HOST, ORIGIN};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use super::SESSION_ID_HEADER;
use crate::config::Config;

/// Check a request against the production protections.
///
/// Outside production mode every request passes. In production, the Origin
/// and Host headers must resolve to an allowed domain, and when a token is
/// configured the request must present it as a bearer credential.
pub fn guard(config: &Config, headers: &HeaderMap) -> Result<(), Response> {
    if !config.production {
        return Ok(());
    }

    check_domains(config, headers)?;
    check_bearer(config, headers)?;
    Ok(())
}

/// CORS layer for browser clients.
///
/// The session header must be exposed or browsers cannot read the id
/// assigned during the handshake.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_ID_HEADER)])
}

/// DNS-rebinding protection: Origin and Host must name an allowed domain.
fn check_domains(config: &Config, headers: &HeaderMap) -> Result<(), Response> {
    if let Some(origin) = header_str(headers, &ORIGIN) {
        if !origin_allowed(config, origin) {
            warn!(origin, "rejected request from disallowed origin");
            return Err(forbidden("Forbidden: origin not allowed"));
        }
    }

    if let Some(host) = header_str(headers, &HOST) {
        if !config.allowed_domains.iter().any(|domain| domain == host) {
            warn!(host, "rejected request for unknown host");
            return Err(forbidden("Forbidden: host not allowed"));
        }
    }

    Ok(())
}

fn check_bearer(config: &Config, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = config.auth_token.as_deref() else {
        return Ok(());
    };

    let provided = header_str(headers, &AUTHORIZATION)
        .and_then(|value| value.strip_prefix("Bearer "));

    if provided != Some(expected) {
        warn!("rejected request with missing or invalid bearer token");
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized").into_response());
    }

    Ok(())
}

fn origin_allowed(config: &Config, origin: &str) -> bool {
    let host = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))
        .unwrap_or(origin);

    config.allowed_domains.iter().any(|domain| domain == host)
}

fn forbidden(message: &'static str) -> Response {
    (StatusCode::FORBIDDEN, message).into_response()
}

fn header_str<'h>(headers: &'h HeaderMap, name: &HeaderName) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
