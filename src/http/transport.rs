use crate::error::{ErrorCode, OtsError};
use crate::http::endpoint::ParsedEndpoint;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// One framed request handed to the transport. Headers are already signed.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Raw response, undecoded. Header names are lowercased.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: i64,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

/// The transport capability: ship bytes, observe deadlines, return bytes.
///
/// Connections may be pooled and may die between attempts; the pipeline
/// treats every call as independent. Implementations must not run user code.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, OtsError>;
}

/// Default transport over a blocking reqwest client.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(
        parsed: &ParsedEndpoint,
        connect_timeout: Duration,
        max_connections: i64,
    ) -> Result<Self, OtsError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(usize::try_from(max_connections).unwrap_or(usize::MAX))
            .build()
            .map_err(|err| {
                OtsError::new(
                    ErrorCode::OtsClientUnknown,
                    format!("http client build failed: {err}"),
                )
            })?;
        Ok(Self {
            client,
            base_url: parsed.base_url(),
        })
    }

    fn translate(err: &reqwest::Error) -> OtsError {
        if err.is_timeout() {
            OtsError::new(ErrorCode::RequestTimeout, "request timed out")
        } else if err.is_connect() {
            OtsError::new(
                ErrorCode::CouldntResolveHost,
                format!("fail to connect: {err}"),
            )
        } else if err.is_body() || err.is_decode() {
            OtsError::new(
                ErrorCode::ResponseDirectlyLost,
                format!("response lost: {err}"),
            )
        } else {
            OtsError::new(
                ErrorCode::WriteRequestFail,
                format!("fail to issue request: {err}"),
            )
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, OtsError> {
        let mut headers = reqwest::header::HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = reqwest::header::HeaderName::from_str(name).map_err(|_| {
                OtsError::new(
                    ErrorCode::OtsClientUnknown,
                    format!("invalid header name: {name}"),
                )
            })?;
            let value = reqwest::header::HeaderValue::from_str(value).map_err(|_| {
                OtsError::new(ErrorCode::OtsClientUnknown, "invalid header value")
            })?;
            headers.insert(name, value);
        }
        let response = self
            .client
            .post(format!("{}{}", self.base_url, request.path))
            .headers(headers)
            .timeout(request.request_timeout)
            .body(request.body)
            .send()
            .map_err(|err| Self::translate(&err))?;
        let status = i64::from(response.status().as_u16());
        let mut response_headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                response_headers.insert(name.as_str().to_ascii_lowercase(), text.to_string());
            }
        }
        let body = response.bytes().map_err(|err| Self::translate(&err))?.to_vec();
        Ok(HttpResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}
