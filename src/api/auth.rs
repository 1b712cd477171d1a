// src/api/auth.rs

use crate::api::types::ErrorResponse;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;

/// Verify the bearer token if one is configured. `None` means the API
/// runs open (the default for local use).
pub fn check_auth(
    expected: Option<&str>,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Missing or invalid bearer token".into(),
            }),
        ));
    }
    Ok(())
}

/// Comparison time must not depend on where the first mismatch sits.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ───────────────────────────── tests ─────────────────────────────
