//! CORS and security response headers.
//!
//! # Responsibilities
//! - Build the CORS header set from configuration
//! - Provide the fixed security header table
//!
//! # Design Decisions
//! - Headers are static per process; computed once at startup
//! - Applied to every response, including errors and preflight

use axum::http::{HeaderName, HeaderValue};

use crate::config::CorsConfig;

/// Security headers added to every response.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
    ),
    ("cross-origin-embedder-policy", "require-corp"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// CORS headers for `config`. Values that are not valid header text are
/// skipped with a warning.
pub fn cors_headers(config: &CorsConfig) -> Vec<(HeaderName, HeaderValue)> {
    let entries = [
        ("access-control-allow-origin", config.client_base_url.clone()),
        ("access-control-allow-methods", config.allowed_methods.clone()),
        ("access-control-allow-headers", config.allowed_headers.clone()),
        (
            "access-control-allow-credentials",
            config.allow_credentials.to_string(),
        ),
    ];

    entries
        .into_iter()
        .filter_map(|(name, value)| match HeaderValue::from_str(&value) {
            Ok(v) => Some((HeaderName::from_static(name), v)),
            Err(_) => {
                tracing::warn!(header = name, value = %value, "Skipping invalid CORS header value");
                None
            }
        })
        .collect()
}

/// The fixed security header table as typed headers.
pub fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    SECURITY_HEADERS
        .iter()
        .map(|&(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_headers_from_config() {
        let config = CorsConfig {
            client_base_url: "https://app.example.com".into(),
            ..CorsConfig::default()
        };
        let headers = cors_headers(&config);

        assert_eq!(headers.len(), 4);
        assert_eq!(headers[0].0, "access-control-allow-origin");
        assert_eq!(headers[0].1, "https://app.example.com");
        assert_eq!(headers[3].1, "true");
    }

    #[test]
    fn test_invalid_origin_is_skipped() {
        let config = CorsConfig {
            client_base_url: "bad\nvalue".into(),
            ..CorsConfig::default()
        };
        assert_eq!(cors_headers(&config).len(), 3);
    }

    #[test]
    fn test_security_headers_are_valid() {
        let headers = security_headers();
        assert_eq!(headers.len(), SECURITY_HEADERS.len());
        assert!(headers.iter().any(|(n, v)| n == "x-frame-options" && v == "SAMEORIGIN"));
    }
}
