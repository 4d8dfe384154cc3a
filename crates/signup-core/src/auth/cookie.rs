//! Browser-style cookie encoding.
//!
//! Cookies are serialized the way `document.cookie` assignments look:
//! `name=<percent-encoded value>; expires=<UTC date>; path=/`.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Format used for the `expires` attribute (e.g. `Tue, 20 Oct 2026 09:30:00 GMT`)
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Default cookie path
pub const ROOT_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    /// Decoded value
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
    pub path: String,
}

impl Cookie {
    /// Create a cookie at the root path that expires after `days`
    pub fn with_days(name: &str, value: &str, days: i64) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            expires: Some(Utc::now() + Duration::days(days)),
            path: ROOT_PATH.to_string(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires.map(|at| Utc::now() >= at).unwrap_or(false)
    }

    /// The `name=value` pair as it appears in a cookie string
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, urlencoding::encode(&self.value))
    }

    /// Full serialized form including attributes
    pub fn to_header_string(&self) -> String {
        let mut out = self.pair();
        if let Some(expires) = self.expires {
            out.push_str("; expires=");
            out.push_str(&expires.format(EXPIRES_FORMAT).to_string());
        }
        out.push_str("; path=");
        out.push_str(&self.path);
        out
    }

    /// Parse a serialized cookie. Returns `None` for a missing name or a
    /// value that does not decode to UTF-8.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(';');
        let (name, raw_value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = urlencoding::decode(raw_value.trim()).ok()?.into_owned();

        let mut cookie = Self {
            name: name.to_string(),
            value,
            expires: None,
            path: ROOT_PATH.to_string(),
        };

        for attr in parts {
            let Some((key, val)) = attr.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "expires" => {
                    cookie.expires = NaiveDateTime::parse_from_str(val.trim(), EXPIRES_FORMAT)
                        .ok()
                        .map(|dt| dt.and_utc());
                }
                "path" => cookie.path = val.trim().to_string(),
                _ => {}
            }
        }

        Some(cookie)
    }
}

/// Look up a cookie by name in a `a=b; c=d` cookie string and return its
/// decoded value.
pub fn get_cookie(cookie_string: &str, name: &str) -> Option<String> {
    cookie_string
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .and_then(|(_, value)| urlencoding::decode(value.trim()).ok())
        .map(|value| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_string_encodes_value() {
        let cookie = Cookie {
            name: "auth_token".to_string(),
            value: "a;b=c d".to_string(),
            expires: None,
            path: "/".to_string(),
        };
        assert_eq!(cookie.to_header_string(), "auth_token=a%3Bb%3Dc%20d; path=/");
    }

    #[test]
    fn test_parse_round_trip_with_separators() {
        let original = Cookie::with_days("auth_token", "eyJ;x=1;y==", 1);
        let parsed = Cookie::parse(&original.to_header_string()).expect("cookie should parse");

        assert_eq!(parsed.name, "auth_token");
        assert_eq!(parsed.value, "eyJ;x=1;y==");
        assert_eq!(parsed.path, "/");
        // expires is serialized with second precision
        let drift = (original.expires.unwrap() - parsed.expires.unwrap()).num_seconds();
        assert_eq!(drift, 0);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Cookie::parse("").is_none());
        assert!(Cookie::parse("novalue").is_none());
        assert!(Cookie::parse("=orphan").is_none());
        assert!(Cookie::parse("bad=%FF%FE").is_none());
    }

    #[test]
    fn test_is_expired() {
        let mut cookie = Cookie::with_days("a", "b", 1);
        assert!(!cookie.is_expired());

        cookie.expires = Some(Utc::now() - Duration::seconds(1));
        assert!(cookie.is_expired());

        cookie.expires = None;
        assert!(!cookie.is_expired());
    }

    #[test]
    fn test_get_cookie() {
        let jar = "theme=dark; auth_token=abc%3D%3D; lang=en";
        assert_eq!(get_cookie(jar, "auth_token").as_deref(), Some("abc=="));
        assert_eq!(get_cookie(jar, "theme").as_deref(), Some("dark"));
        assert_eq!(get_cookie(jar, "missing"), None);
        assert_eq!(get_cookie("", "auth_token"), None);
    }

    #[test]
    fn test_get_cookie_keeps_raw_equals() {
        // Only the first '=' separates name from value
        assert_eq!(get_cookie("k=a=b", "k").as_deref(), Some("a=b"));
    }
}
