use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::app::errors;
use crate::context::AdminContext;

pub const UNAUTHORIZED_MESSAGE: &str = "you are unauthorized";

#[derive(Clone)]
pub struct AdminAuthState {
    pub password: Arc<str>,
}

/// Basic-auth gate for `/admin` routes.
///
/// Only the password half of the credential is compared against the configured
/// secret.
pub async fn admin_auth_middleware(
    State(state): State<AdminAuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some((username, password)) = extract_basic(req.headers()) else {
        return unauthorized();
    };
    if !secrets_match(password.as_bytes(), state.password.as_bytes()) {
        tracing::warn!(username = %username, "admin request with wrong password");
        return unauthorized();
    }

    req.extensions_mut().insert(AdminContext::new(username));
    next.run(req).await
}

/// Compare a presented secret with the configured one. Runs over every byte of
/// `expected` regardless of where the first difference is.
fn secrets_match(given: &[u8], expected: &[u8]) -> bool {
    let mut diff = given.len() ^ expected.len();
    for (i, byte) in expected.iter().enumerate() {
        let other = given.get(i).copied().unwrap_or(0);
        diff |= usize::from(other ^ byte);
    }
    diff == 0
}

fn unauthorized() -> Response {
    let mut res = errors::json_error(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE);
    res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(r#"Basic realm="Restricted""#),
    );
    res
}

/// Decode `Authorization: Basic <base64(user:pass)>` into `(user, pass)`.
fn extract_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
