use std::fmt;
use thiserror::Error;

/// Error codes understood by the SDK.
///
/// The string forms are wire-compatible: server envelopes carry them
/// verbatim and the retry engine classifies on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // raised locally, before any network I/O
    OtsParameterInvalid,
    OtsClientUnknown,
    // raised by the transport
    CouldntResolveHost,
    NoAvailableConnection,
    WriteRequestFail,
    CorruptedResponse,
    ResponseDirectlyLost,
    SslHandshakeFail,
    RequestTimeout,
    // server-side throttling
    OtsServerBusy,
    OtsQuotaExhausted,
    OtsPartitionUnavailable,
    OtsNotEnoughCapacityUnit,
    // server-side transient state
    OtsTableNotReady,
    OtsRowOperationConflict,
    OtsRequestTimeout,
    // server-side terminal
    OtsAuthFailed,
    OtsMethodNotAllowed,
    OtsObjectNotExist,
    OtsObjectAlreadyExist,
    OtsConditionCheckFail,
    OtsOutOfRowSizeLimit,
    OtsOutOfColumnCountLimit,
    OtsInvalidPk,
    OtsInternalServerError,
}

impl ErrorCode {
    /// Wire string of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::OtsParameterInvalid => "OTSParameterInvalid",
            ErrorCode::OtsClientUnknown => "OTSClientUnknownError",
            ErrorCode::CouldntResolveHost => "CouldntResolveHost",
            ErrorCode::NoAvailableConnection => "NoAvailableConnection",
            ErrorCode::WriteRequestFail => "WriteRequestFail",
            ErrorCode::CorruptedResponse => "CorruptedResponse",
            ErrorCode::ResponseDirectlyLost => "ResponseDirectlyLost",
            ErrorCode::SslHandshakeFail => "SSLHandshakeFail",
            ErrorCode::RequestTimeout => "RequestTimeout",
            ErrorCode::OtsServerBusy => "OTSServerBusy",
            ErrorCode::OtsQuotaExhausted => "OTSQuotaExhausted",
            ErrorCode::OtsPartitionUnavailable => "OTSPartitionUnavailable",
            ErrorCode::OtsNotEnoughCapacityUnit => "OTSNotEnoughCapacityUnit",
            ErrorCode::OtsTableNotReady => "OTSTableNotReady",
            ErrorCode::OtsRowOperationConflict => "OTSRowOperationConflict",
            ErrorCode::OtsRequestTimeout => "OTSRequestTimeout",
            ErrorCode::OtsAuthFailed => "OTSAuthFailed",
            ErrorCode::OtsMethodNotAllowed => "OTSMethodNotAllowed",
            ErrorCode::OtsObjectNotExist => "OTSObjectNotExist",
            ErrorCode::OtsObjectAlreadyExist => "OTSObjectAlreadyExist",
            ErrorCode::OtsConditionCheckFail => "OTSConditionCheckFail",
            ErrorCode::OtsOutOfRowSizeLimit => "OTSOutOfRowSizeLimit",
            ErrorCode::OtsOutOfColumnCountLimit => "OTSOutOfColumnCountLimit",
            ErrorCode::OtsInvalidPk => "OTSInvalidPK",
            ErrorCode::OtsInternalServerError => "OTSInternalServerError",
        }
    }

    /// Parses a wire code string. Unknown codes map to `None`; callers fall
    /// back to `OtsClientUnknown` so an unrecognized server error still
    /// surfaces.
    pub fn from_wire(code: &str) -> Option<Self> {
        let all = [
            ErrorCode::OtsParameterInvalid,
            ErrorCode::OtsClientUnknown,
            ErrorCode::CouldntResolveHost,
            ErrorCode::NoAvailableConnection,
            ErrorCode::WriteRequestFail,
            ErrorCode::CorruptedResponse,
            ErrorCode::ResponseDirectlyLost,
            ErrorCode::SslHandshakeFail,
            ErrorCode::RequestTimeout,
            ErrorCode::OtsServerBusy,
            ErrorCode::OtsQuotaExhausted,
            ErrorCode::OtsPartitionUnavailable,
            ErrorCode::OtsNotEnoughCapacityUnit,
            ErrorCode::OtsTableNotReady,
            ErrorCode::OtsRowOperationConflict,
            ErrorCode::OtsRequestTimeout,
            ErrorCode::OtsAuthFailed,
            ErrorCode::OtsMethodNotAllowed,
            ErrorCode::OtsObjectNotExist,
            ErrorCode::OtsObjectAlreadyExist,
            ErrorCode::OtsConditionCheckFail,
            ErrorCode::OtsOutOfRowSizeLimit,
            ErrorCode::OtsOutOfColumnCountLimit,
            ErrorCode::OtsInvalidPk,
            ErrorCode::OtsInternalServerError,
        ];
        all.into_iter().find(|c| c.as_str() == code)
    }

    /// Default HTTP status paired with the code when the server did not
    /// supply one (local and transport errors carry status 0).
    pub fn default_status(self) -> i64 {
        match self {
            ErrorCode::OtsParameterInvalid
            | ErrorCode::OtsInvalidPk
            | ErrorCode::OtsOutOfRowSizeLimit
            | ErrorCode::OtsOutOfColumnCountLimit => 400,
            ErrorCode::OtsAuthFailed => 403,
            ErrorCode::OtsObjectNotExist => 404,
            ErrorCode::OtsMethodNotAllowed => 405,
            ErrorCode::OtsObjectAlreadyExist | ErrorCode::OtsConditionCheckFail => 409,
            ErrorCode::OtsServerBusy
            | ErrorCode::OtsQuotaExhausted
            | ErrorCode::OtsPartitionUnavailable
            | ErrorCode::OtsNotEnoughCapacityUnit
            | ErrorCode::OtsTableNotReady
            | ErrorCode::OtsRowOperationConflict
            | ErrorCode::OtsRequestTimeout => 503,
            ErrorCode::OtsInternalServerError => 500,
            _ => 0,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error surfaced by every SDK operation.
///
/// `request_id` is server-issued per attempt; `trace_id` is the tracker the
/// client sent, identical across retries of one logical call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code} (http {http_status}): {message} [request={request_id} trace={trace_id}]")]
pub struct OtsError {
    pub code: ErrorCode,
    pub http_status: i64,
    pub message: String,
    pub request_id: String,
    pub trace_id: String,
}

impl OtsError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            http_status: code.default_status(),
            message: message.into(),
            request_id: String::new(),
            trace_id: String::new(),
        }
    }

    /// Validation failure; never reaches the transport.
    pub fn parameter_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OtsParameterInvalid, message)
    }

    /// Undecodable response body, with the position the decoder stopped at.
    pub fn corrupted_response(context: impl Into<String>, position: usize) -> Self {
        Self::new(
            ErrorCode::CorruptedResponse,
            format!("{} at offset {}", context.into(), position),
        )
    }

    pub fn with_status(mut self, status: i64) -> Self {
        self.http_status = status;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }
}
