//! Error types for zest-client.

use thiserror::Error;

/// Main error type for all Zest operations.
#[derive(Debug, Error)]
pub enum ZestError {
    /// Content format name outside {TEXT, BINARY, JSON}. Rejected before
    /// any frame is built or any network I/O happens.
    #[error("unsupported content format: {0}")]
    UnsupportedFormat(String),

    /// Observe mode name outside {default, data, audit, notification}.
    #[error("unsupported observe mode: {0}")]
    UnsupportedMode(String),

    /// Malformed resource path (e.g. empty).
    #[error("invalid uri path: {0:?}")]
    InvalidPath(String),

    /// Could not open or authenticate a channel.
    #[error("connection error: {0}")]
    ConnectionFailed(String),

    /// No reply arrived within the receive window on the primary channel.
    #[error("timed out waiting for reply")]
    Timeout,

    /// A frame could not be encoded or decoded.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Server status 128.
    #[error("bad request")]
    BadRequest,

    /// Server status 129.
    #[error("unauthorized")]
    Unauthorized,

    /// Server status 134.
    #[error("not acceptable")]
    NotAcceptable,

    /// Server status 141.
    #[error("request entity too large")]
    RequestTooLarge,

    /// Server status 143.
    #[error("unsupported content format requested")]
    UnsupportedContentFormat,

    /// Server status 160.
    #[error("internal server error")]
    InternalError,

    /// Server status 163.
    #[error("service unavailable")]
    ServiceUnavailable,

    /// A status code outside the known registry.
    #[error("protocol error: unrecognized status code {code}")]
    Protocol {
        /// The raw status byte carried by the reply.
        code: u8,
    },

    /// The channel was closed (or its socket lost) before the operation ran.
    #[error("channel closed")]
    ChannelClosed,

    /// Low-level transport failure during send/receive.
    #[error("transport error: {0}")]
    Transport(#[from] zmq::Error),

    /// I/O error from the underlying runtime.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZestError {
    /// Map a recognized-but-unsuccessful status code to its named variant.
    ///
    /// Any code outside the registry maps to the generic [`ZestError::Protocol`].
    pub fn from_status_code(code: u8) -> Self {
        match code {
            128 => ZestError::BadRequest,
            129 => ZestError::Unauthorized,
            134 => ZestError::NotAcceptable,
            141 => ZestError::RequestTooLarge,
            143 => ZestError::UnsupportedContentFormat,
            160 => ZestError::InternalError,
            163 => ZestError::ServiceUnavailable,
            code => ZestError::Protocol { code },
        }
    }
}

/// Result type alias using ZestError.
pub type Result<T> = std::result::Result<T, ZestError>;
