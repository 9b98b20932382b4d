//! Token carriers: session cookies and the Bearer header.

use axum::http::{HeaderMap, header};
use cookie::{Cookie, SameSite};

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Value of cookie `name` from any `Cookie` header, if present and non-empty
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn token_cookie(name: &str, value: &str, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_string(), value.to_string());
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie.set_max_age(cookie::time::Duration::seconds(max_age_secs.max(0)));
    cookie
}

/// `Set-Cookie` value for a token. HttpOnly and Secure: never readable from scripts.
pub fn session_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    token_cookie(name, value, max_age_secs).to_string()
}

/// `Set-Cookie` value that removes the cookie
pub fn clear_cookie(name: &str) -> String {
    token_cookie(name, "", 0).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=abc.def.ghi; refreshToken="),
        );
        assert_eq!(
            get_cookie(&headers, ACCESS_COOKIE_NAME).as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), None);
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_get_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("refreshToken=r1"));
        assert_eq!(
            get_cookie(&headers, REFRESH_COOKIE_NAME).as_deref(),
            Some("r1")
        );
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(bearer_token(&headers), Some("tok"));
    }

    #[test]
    fn test_cookie_attributes() {
        let set = session_cookie(ACCESS_COOKIE_NAME, "tok", 900);
        let parsed = Cookie::parse(set.as_str()).unwrap();
        assert_eq!(parsed.name(), "accessToken");
        assert_eq!(parsed.value(), "tok");
        assert_eq!(parsed.http_only(), Some(true));
        assert_eq!(parsed.secure(), Some(true));
        assert_eq!(parsed.same_site(), Some(SameSite::Strict));
        assert_eq!(parsed.path(), Some("/"));
        assert_eq!(parsed.max_age(), Some(cookie::time::Duration::seconds(900)));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cleared = Cookie::parse(clear_cookie(REFRESH_COOKIE_NAME)).unwrap();
        assert_eq!(cleared.name(), "refreshToken");
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(cookie::time::Duration::ZERO));
    }
}
