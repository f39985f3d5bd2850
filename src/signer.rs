//! Request canonicalization and signing.
//!
//! The string to sign is `METHOD \n PATH \n QUERY \n HEADERS` where the
//! header block lists every `x-ots-` header except the signature itself,
//! lowercased, value-trimmed, sorted by name, one `name:value` per line.

use crate::client::options::Credential;
use crate::security::{base64_encode, content_md5, hmac_sha1};
use crate::time::UtcTime;
use crate::tracker::Tracker;
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2015-12-31";

pub const HEADER_DATE: &str = "x-ots-date";
pub const HEADER_API_VERSION: &str = "x-ots-apiversion";
pub const HEADER_ACCESS_KEY_ID: &str = "x-ots-accesskeyid";
pub const HEADER_INSTANCE_NAME: &str = "x-ots-instancename";
pub const HEADER_STS_TOKEN: &str = "x-ots-sts-token";
pub const HEADER_CONTENT_MD5: &str = "x-ots-contentmd5";
pub const HEADER_SIGNATURE: &str = "x-ots-signature";
pub const HEADER_TRACE_ID: &str = "x-ots-traceid";
pub const HEADER_REQUEST_ID: &str = "x-ots-requestid";

const SIGNED_PREFIX: &str = "x-ots-";

/// Builds the full header set for one attempt, except the signature.
pub fn build_headers(
    credential: &Credential,
    instance_name: &str,
    tracker: &Tracker,
    body: &[u8],
    now: UtcTime,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(HEADER_DATE.to_string(), now.to_iso8601());
    headers.insert(HEADER_API_VERSION.to_string(), API_VERSION.to_string());
    headers.insert(
        HEADER_ACCESS_KEY_ID.to_string(),
        credential.access_key_id.clone(),
    );
    headers.insert(HEADER_INSTANCE_NAME.to_string(), instance_name.to_string());
    if let Some(token) = &credential.security_token {
        headers.insert(HEADER_STS_TOKEN.to_string(), token.clone());
    }
    headers.insert(HEADER_CONTENT_MD5.to_string(), content_md5(body));
    headers.insert(HEADER_TRACE_ID.to_string(), tracker.trace_id().to_string());
    headers
}

/// Canonical header block. Header names in this SDK are created lowercase;
/// sorting falls out of the ordered map.
pub fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        if !name.starts_with(SIGNED_PREFIX) || name == HEADER_SIGNATURE {
            continue;
        }
        out.push_str(&name);
        out.push(':');
        out.push_str(value.trim());
        out.push('\n');
    }
    // no trailing newline
    out.pop();
    out
}

pub fn string_to_sign(
    method: &str,
    path: &str,
    query: &str,
    headers: &BTreeMap<String, String>,
) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        method,
        path,
        query,
        canonical_headers(headers)
    )
}

/// Computes the signature over `POST path` and attaches `x-ots-signature`.
pub fn sign(headers: &mut BTreeMap<String, String>, path: &str, access_key_secret: &str) {
    let to_sign = string_to_sign("POST", path, "", headers);
    let mac = hmac_sha1(access_key_secret.as_bytes(), to_sign.as_bytes());
    headers.insert(HEADER_SIGNATURE.to_string(), base64_encode(&mac));
}
