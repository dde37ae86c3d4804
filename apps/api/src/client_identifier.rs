use axum::http::{HeaderMap, HeaderName};
use tracing::debug;
use vaultgate_domain::{ClientIdentifier, FORWARDED_FOR_HEADER};

/// Resolves the caller identifier from the trusted edge header, then the
/// first forwarded-for hop.
pub fn resolve_identifier(headers: &HeaderMap, trusted_header: &HeaderName) -> ClientIdentifier {
    let trusted = header_value(headers, trusted_header.as_str());
    let forwarded_for = header_value(headers, FORWARDED_FOR_HEADER);

    let identifier = ClientIdentifier::resolve(trusted, forwarded_for);
    if identifier.is_unknown() {
        // Every such caller shares one bucket.
        debug!("request carries no client address headers; using shared identifier");
    }

    identifier
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderName, HeaderValue};

    use super::resolve_identifier;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    fn cloudflare() -> HeaderName {
        HeaderName::from_static("cf-connecting-ip")
    }

    #[test]
    fn trusted_header_takes_precedence() {
        let identifier = resolve_identifier(
            &headers(&[
                ("cf-connecting-ip", "9.9.9.9"),
                ("x-forwarded-for", "1.1.1.1, 2.2.2.2"),
            ]),
            &cloudflare(),
        );
        assert_eq!(identifier.as_str(), "9.9.9.9");
    }

    #[test]
    fn first_forwarded_hop_is_used_without_trusted_header() {
        let identifier = resolve_identifier(
            &headers(&[("x-forwarded-for", " 1.1.1.1 , 2.2.2.2")]),
            &cloudflare(),
        );
        assert_eq!(identifier.as_str(), "1.1.1.1");
    }

    #[test]
    fn missing_headers_collapse_into_unknown() {
        let identifier = resolve_identifier(&HeaderMap::new(), &cloudflare());
        assert!(identifier.is_unknown());
    }

    #[test]
    fn configured_header_replaces_default() {
        let identifier = resolve_identifier(
            &headers(&[("cf-connecting-ip", "9.9.9.9"), ("x-real-ip", "8.8.8.8")]),
            &HeaderName::from_static("x-real-ip"),
        );
        assert_eq!(identifier.as_str(), "8.8.8.8");
    }
}
