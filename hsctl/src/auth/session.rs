//! Session cookie reading and clearing.
//!
//! Sessions are issued by the auth provider at login and stored in a cookie by the frontend.
//! Three encodings of the cookie value are accepted:
//!
//! - a bare access token (`eyJ...`)
//! - a JSON session, either an object with an `access_token` field or the legacy array form
//!   whose first element is the access token, optionally percent-encoded
//! - the same JSON prefixed with `base64-` and base64url encoded

use axum::http::{HeaderMap, header};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use tracing::trace;

use crate::config::SessionConfig;

const BASE64_PREFIX: &str = "base64-";

/// Find the session cookie among all `Cookie` headers and return its access token
pub fn access_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| decode_cookie_value(value))
}

/// Decode a session cookie value into an access token
fn decode_cookie_value(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_matches('"');
    if raw.is_empty() {
        return None;
    }

    if let Some(encoded) = raw.strip_prefix(BASE64_PREFIX) {
        let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?;
        let json = String::from_utf8(bytes).ok()?;
        return access_token_from_json(&json);
    }

    let decoded = urlencoding::decode(raw).map(|s| s.into_owned()).unwrap_or_else(|_| raw.to_string());
    if decoded.starts_with('{') || decoded.starts_with('[') {
        return access_token_from_json(&decoded);
    }

    Some(decoded)
}

fn access_token_from_json(json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    let token = match &value {
        serde_json::Value::Object(fields) => fields.get("access_token"),
        serde_json::Value::Array(items) => items.first(),
        _ => None,
    };

    match token {
        Some(serde_json::Value::String(token)) if !token.is_empty() => Some(token.clone()),
        _ => {
            trace!("Session cookie JSON carries no access token");
            None
        }
    }
}

/// `Set-Cookie` value that removes the session cookie
pub fn expired_session_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", config.cookie_name);
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn test_bare_token() {
        let h = headers(&["theme=dark; sb-access-token=eyJhbGciOi.payload.sig"]);
        assert_eq!(
            access_token_from_headers(&h, "sb-access-token").as_deref(),
            Some("eyJhbGciOi.payload.sig")
        );
    }

    #[test]
    fn test_cookie_in_second_header() {
        let h = headers(&["theme=dark", "sb-access-token=tok"]);
        assert_eq!(access_token_from_headers(&h, "sb-access-token").as_deref(), Some("tok"));
    }

    #[test]
    fn test_missing_cookie() {
        let h = headers(&["theme=dark"]);
        assert!(access_token_from_headers(&h, "sb-access-token").is_none());
        assert!(access_token_from_headers(&HeaderMap::new(), "sb-access-token").is_none());
    }

    #[test]
    fn test_empty_cookie_value() {
        let h = headers(&["sb-access-token="]);
        assert!(access_token_from_headers(&h, "sb-access-token").is_none());
    }

    #[test]
    fn test_percent_encoded_legacy_array() {
        let h = headers(&["sb-access-token=%5B%22access-123%22%2C%22refresh-456%22%2Cnull%5D"]);
        assert_eq!(access_token_from_headers(&h, "sb-access-token").as_deref(), Some("access-123"));
    }

    #[test]
    fn test_json_object_session() {
        let json = r#"{"access_token":"access-abc","refresh_token":"r","expires_in":3600}"#;
        let encoded = urlencoding::encode(json).into_owned();
        let h = headers(&[&format!("sb-access-token={encoded}")]);
        assert_eq!(access_token_from_headers(&h, "sb-access-token").as_deref(), Some("access-abc"));
    }

    #[test]
    fn test_base64_session() {
        let json = r#"{"access_token":"access-b64","token_type":"bearer"}"#;
        let cookie = format!("sb-access-token=base64-{}", URL_SAFE_NO_PAD.encode(json));
        let h = headers(&[&cookie]);
        assert_eq!(access_token_from_headers(&h, "sb-access-token").as_deref(), Some("access-b64"));
    }

    #[test]
    fn test_json_without_token() {
        let h = headers(&["sb-access-token=%7B%22user%22%3A1%7D"]);
        assert!(access_token_from_headers(&h, "sb-access-token").is_none());
    }

    #[test]
    fn test_expired_cookie() {
        let config = SessionConfig {
            cookie_name: "sb-access-token".to_string(),
            secure: true,
        };
        assert_eq!(
            expired_session_cookie(&config),
            "sb-access-token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure"
        );

        let insecure = SessionConfig {
            secure: false,
            ..config
        };
        assert!(!expired_session_cookie(&insecure).contains("Secure"));
    }
}
