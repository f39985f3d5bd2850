use widerow::{Endpoint, ErrorCode, ParsedEndpoint, Protocol};

#[test]
fn https_without_port_defaults_to_443() {
    let parsed = ParsedEndpoint::parse("https://h").unwrap();
    assert_eq!(parsed.protocol, Protocol::Https);
    assert_eq!(parsed.host, "h");
    assert_eq!(parsed.port, "443");
}

#[test]
fn http_with_explicit_port() {
    let parsed = ParsedEndpoint::parse("http://h:81").unwrap();
    assert_eq!(parsed.protocol, Protocol::Http);
    assert_eq!(parsed.host, "h");
    assert_eq!(parsed.port, "81");
}

#[test]
fn http_without_port_defaults_to_80() {
    let parsed = ParsedEndpoint::parse("http://example.com").unwrap();
    assert_eq!(parsed.port, "80");
}

#[test]
fn root_slash_is_tolerated() {
    let parsed = ParsedEndpoint::parse("https://h/").unwrap();
    assert_eq!(parsed.host, "h");
}

#[test]
fn unsupported_protocol_is_rejected() {
    let err = ParsedEndpoint::parse("ftp://h").unwrap_err();
    assert_eq!(err.code, ErrorCode::OtsParameterInvalid);
    assert_eq!(err.message, "unsupported protocol");
}

#[test]
fn non_root_path_is_rejected() {
    let err = ParsedEndpoint::parse("http://h/x").unwrap_err();
    assert_eq!(err.code, ErrorCode::OtsParameterInvalid);
    assert_eq!(err.message, "invalid syntax of endpoint.");
}

#[test]
fn malformed_urls_are_rejected() {
    for url in ["", "h", "http://", "http://:80", "http://h:", "http://h:8a"] {
        let result = ParsedEndpoint::parse(url);
        assert!(result.is_err(), "{url:?} should not parse");
    }
}

#[test]
fn base_url_always_carries_a_port() {
    let parsed = ParsedEndpoint::parse("https://h").unwrap();
    assert_eq!(parsed.base_url(), "https://h:443");
    let parsed = ParsedEndpoint::parse("http://h:81").unwrap();
    assert_eq!(parsed.base_url(), "http://h:81");
}

#[test]
fn endpoint_validation_requires_instance() {
    let err = Endpoint::new("https://h", "").validate().unwrap_err();
    assert_eq!(err.code, ErrorCode::OtsParameterInvalid);
    Endpoint::new("https://h", "inst").validate().unwrap();
}
