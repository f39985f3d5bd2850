use std::collections::BTreeMap;
use widerow::security::{base64_encode, content_md5, hmac_sha1};
use widerow::signer::{
    self, HEADER_ACCESS_KEY_ID, HEADER_API_VERSION, HEADER_CONTENT_MD5, HEADER_DATE,
    HEADER_INSTANCE_NAME, HEADER_SIGNATURE, HEADER_STS_TOKEN, HEADER_TRACE_ID,
};
use widerow::{Credential, Tracker, UtcTime};

#[test]
fn hmac_sha1_reference_vector() {
    let mac = hmac_sha1(b"key", b"The quick brown fox jumps over the lazy dog");
    assert_eq!(base64_encode(&mac), "3nybhbi3iqa8ino29wqQcBydtNk=");
}

#[test]
fn content_md5_reference_vectors() {
    assert_eq!(content_md5(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
    assert_eq!(content_md5(b"hello"), "XUFAKrxLKna5cZ2REBfFkg==");
}

fn headers_for(token: Option<&str>) -> BTreeMap<String, String> {
    let mut credential = Credential::new("akid", "secret");
    if let Some(token) = token {
        credential = credential.with_security_token(token);
    }
    signer::build_headers(
        &credential,
        "inst",
        &Tracker::new("trace123"),
        b"body-bytes",
        UtcTime::from_usec(1_451_700_245_678_901),
    )
}

#[test]
fn build_headers_covers_the_protocol_set() {
    let headers = headers_for(None);
    assert_eq!(headers.get(HEADER_DATE).unwrap(), "2016-01-02T02:04:05.678901Z");
    assert_eq!(headers.get(HEADER_API_VERSION).unwrap(), "2015-12-31");
    assert_eq!(headers.get(HEADER_ACCESS_KEY_ID).unwrap(), "akid");
    assert_eq!(headers.get(HEADER_INSTANCE_NAME).unwrap(), "inst");
    assert_eq!(headers.get(HEADER_TRACE_ID).unwrap(), "trace123");
    assert_eq!(
        headers.get(HEADER_CONTENT_MD5).unwrap(),
        &content_md5(b"body-bytes")
    );
    assert!(!headers.contains_key(HEADER_STS_TOKEN));

    let with_token = headers_for(Some("tok"));
    assert_eq!(with_token.get(HEADER_STS_TOKEN).unwrap(), "tok");
}

#[test]
fn canonical_headers_are_sorted_lowercased_and_trimmed() {
    let mut headers = BTreeMap::new();
    headers.insert("x-ots-b".to_string(), " spaced ".to_string());
    headers.insert("x-ots-a".to_string(), "first".to_string());
    headers.insert("content-type".to_string(), "ignored".to_string());
    headers.insert(HEADER_SIGNATURE.to_string(), "never-signed".to_string());
    let canonical = signer::canonical_headers(&headers);
    assert_eq!(canonical, "x-ots-a:first\nx-ots-b:spaced");
}

#[test]
fn string_to_sign_has_the_documented_shape() {
    let mut headers = BTreeMap::new();
    headers.insert("x-ots-a".to_string(), "1".to_string());
    let to_sign = signer::string_to_sign("POST", "/GetRow", "", &headers);
    assert_eq!(to_sign, "POST\n/GetRow\n\nx-ots-a:1");
}

#[test]
fn sign_attaches_a_deterministic_signature() {
    let mut first = headers_for(None);
    let mut second = first.clone();
    signer::sign(&mut first, "/PutRow", "secret");
    signer::sign(&mut second, "/PutRow", "secret");
    let signature = first.get(HEADER_SIGNATURE).unwrap();
    assert!(!signature.is_empty());
    assert_eq!(signature, second.get(HEADER_SIGNATURE).unwrap());

    // a different secret or path must change the MAC
    let mut other_secret = headers_for(None);
    signer::sign(&mut other_secret, "/PutRow", "other");
    assert_ne!(signature, other_secret.get(HEADER_SIGNATURE).unwrap());

    let mut other_path = headers_for(None);
    signer::sign(&mut other_path, "/GetRow", "secret");
    assert_ne!(signature, other_path.get(HEADER_SIGNATURE).unwrap());
}

#[test]
fn signature_covers_the_sts_token() {
    let mut plain = headers_for(None);
    let mut with_token = headers_for(Some("tok"));
    signer::sign(&mut plain, "/PutRow", "secret");
    signer::sign(&mut with_token, "/PutRow", "secret");
    assert_ne!(
        plain.get(HEADER_SIGNATURE).unwrap(),
        with_token.get(HEADER_SIGNATURE).unwrap()
    );
}
