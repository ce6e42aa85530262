//! Error types for session decoding and header conversion.

use thiserror::Error;

/// Errors raised while decoding a [`Session`](crate::Session) from its JSON wire shape.
///
/// A decode either produces a complete session or one of these errors; callers
/// never observe a partially populated session.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON or does not match the session shape.
    #[error("malformed session payload: {0}")]
    Json(#[from] serde_json::Error),

    /// `match_context.url` could not be parsed as an absolute URL.
    #[error("invalid match context url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// `match_context.url` contains a `%` not followed by two hex digits.
    #[error("invalid percent escape in match context url '{url}'")]
    InvalidUrlEscape { url: String },

    /// The payload exceeds the configured size limit.
    #[error("session payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Strict decoding found a key the session does not recognize.
    #[error("unknown field '{field}' in session payload")]
    UnknownField { field: String },

    /// Reading the payload failed.
    #[error("failed to read session payload: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }
}

/// Errors raised while converting staged headers into an outbound `http::HeaderMap`.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("invalid header name '{name}'")]
    InvalidName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },

    #[error("invalid value for header '{name}'")]
    InvalidValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
}
