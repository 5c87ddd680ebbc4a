use thiserror::Error;

/// Errors from the remote imaging service.
///
/// None of these escape the tile pipeline: a failed fetch is logged and the
/// tile is synthesized procedurally instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not complete within the client timeout
    #[error("request timed out")]
    Timeout,

    /// Connection could not be established or was dropped
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// Non-2xx status, non-image content type, or empty body
    #[error("bad response: {0}")]
    BadResponse(String),
}

impl FetchError {
    /// Short label used in structured log fields and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Unreachable(_) => "unreachable",
            FetchError::BadResponse(_) => "bad_response",
        }
    }
}

/// Errors raised while decoding or re-encoding a tile.
///
/// Non-fatal: the enhancer degrades to the original bytes when it sees one.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The payload could not be decoded into a pixel buffer
    #[error("decode failed: {0}")]
    Decode(String),

    /// The processed pixel buffer could not be encoded
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Errors surfaced by the HTTP layer.
///
/// The tile pipeline itself never fails; these only cover malformed requests.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// A query parameter was present but unusable
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Survey name was empty after trimming
    #[error("Survey name must not be empty")]
    EmptySurvey,
}
