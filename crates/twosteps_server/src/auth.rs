//! Session tokens and the cookie that carries them.
//!
//! Tokens are opaque: 128 random bits from the OS RNG, hex-encoded to 32
//! lowercase characters. They are bearer credentials with no expiry; the
//! only way to invalidate one is sign-out.
//!
//! ## Cookie Format
//!
//! ```text
//! session_token=<32 hex chars>; Path=/; HttpOnly; SameSite=Lax[; Secure]
//! ```

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use rand::rngs::OsRng;
use rand::RngCore;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_token";

/// Number of random bytes in a session token.
pub const TOKEN_BYTES: usize = 16;

/// Generates a fresh session token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Builds the `Set-Cookie` value storing `token`.
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Extracts the session token from the request's `Cookie` headers.
///
/// Returns `None` if the cookie is absent or empty.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
