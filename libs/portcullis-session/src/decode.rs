//! Decoding sessions from the JSON shape returned by upstream providers.
//!
//! ```json
//! {
//!   "subject": "anonymous",
//!   "extra": {"foo": "bar"},
//!   "header": {"foo": ["bar1", "bar2"]},
//!   "match_context": {
//!     "regexp_capture_groups": ["http", "foo"],
//!     "url": "http://domain.com/foo"
//!   }
//! }
//! ```
//!
//! Every key is optional; absent or `null` keys leave the field empty.

use std::cell::Cell;
use std::io::Read;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use url::{SyntaxViolation, Url};

use crate::config::SessionDecoderConfig;
use crate::error::DecodeError;
use crate::header::HeaderMap;
use crate::match_context::MatchContext;
use crate::session::Session;

const SESSION_FIELDS: &[&str] = &["subject", "extra", "header", "match_context"];
const MATCH_CONTEXT_FIELDS: &[&str] = &["regexp_capture_groups", "url"];

#[derive(Deserialize)]
struct SessionPayload {
    subject: Option<String>,
    extra: Option<Map<String, Value>>,
    header: Option<HeaderMap>,
    match_context: Option<MatchContextPayload>,
}

#[derive(Deserialize)]
struct MatchContextPayload {
    regexp_capture_groups: Option<Vec<String>>,
    url: Option<String>,
}

impl SessionPayload {
    fn into_session(self) -> Result<Session, DecodeError> {
        let match_context = self
            .match_context
            .map(MatchContextPayload::into_match_context)
            .transpose()?
            .unwrap_or_default();

        Ok(Session {
            subject: self.subject.unwrap_or_default(),
            extra: self.extra.unwrap_or_default(),
            header: self.header,
            match_context,
        })
    }
}

impl MatchContextPayload {
    fn into_match_context(self) -> Result<MatchContext, DecodeError> {
        Ok(MatchContext {
            regexp_capture_groups: self.regexp_capture_groups.unwrap_or_default(),
            url: self.url.as_deref().map(parse_url).transpose()?.flatten(),
        })
    }
}

/// An empty string means "no URL"; anything else must be an absolute URL
/// without malformed percent escapes.
fn parse_url(raw: &str) -> Result<Option<Url>, DecodeError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let bad_escape = Cell::new(false);
    let on_violation = |violation: SyntaxViolation| {
        if matches!(violation, SyntaxViolation::PercentDecode) {
            bad_escape.set(true);
        }
    };
    let url = Url::options()
        .syntax_violation_callback(Some(&on_violation))
        .parse(raw)
        .map_err(|source| DecodeError::InvalidUrl {
            url: raw.to_owned(),
            source,
        })?;
    if bad_escape.get() {
        return Err(DecodeError::InvalidUrlEscape {
            url: raw.to_owned(),
        });
    }
    Ok(Some(url))
}

impl<'de> Deserialize<'de> for Session {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        SessionPayload::deserialize(deserializer)?
            .into_session()
            .map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for MatchContext {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        MatchContextPayload::deserialize(deserializer)?
            .into_match_context()
            .map_err(serde::de::Error::custom)
    }
}

/// Decodes sessions under a [`SessionDecoderConfig`].
#[derive(Debug, Clone, Default)]
pub struct SessionDecoder {
    config: SessionDecoderConfig,
}

impl SessionDecoder {
    #[must_use]
    pub fn new(config: SessionDecoderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SessionDecoderConfig {
        &self.config
    }

    /// Decode a session from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// - `PayloadTooLarge` if `bytes` exceeds `max_payload_bytes`
    /// - `Json` if `bytes` is not a JSON object of the session shape
    /// - `UnknownField` if strict decoding is enabled and an unknown key is present
    /// - `InvalidUrl` if `match_context.url` is not an absolute URL
    /// - `InvalidUrlEscape` if `match_context.url` holds a malformed `%` escape
    pub fn decode_slice(&self, bytes: &[u8]) -> Result<Session, DecodeError> {
        let limit = self.config.max_payload_bytes;
        if bytes.len() > limit {
            tracing::warn!(size = bytes.len(), limit, "session payload rejected: too large");
            return Err(DecodeError::PayloadTooLarge {
                size: bytes.len(),
                limit,
            });
        }

        let payload: SessionPayload = if self.config.deny_unknown_fields {
            let value: Value = serde_json::from_slice(bytes)?;
            check_known_fields(&value)?;
            serde_json::from_value(value)?
        } else {
            serde_json::from_slice(bytes)?
        };

        payload
            .into_session()
            .inspect(log_decoded)
            .inspect_err(|e| tracing::warn!(error = %e, "session payload rejected"))
    }

    /// Decode a session from a JSON string.
    ///
    /// # Errors
    ///
    /// See [`SessionDecoder::decode_slice`].
    pub fn decode_str(&self, json: &str) -> Result<Session, DecodeError> {
        self.decode_slice(json.as_bytes())
    }

    /// Decode a session read from `reader`.
    ///
    /// At most `max_payload_bytes + 1` bytes are read, so an oversized body
    /// is rejected without buffering all of it.
    ///
    /// # Errors
    ///
    /// Returns `Io` if reading fails, otherwise see [`SessionDecoder::decode_slice`].
    pub fn decode_reader<R: Read>(&self, reader: R) -> Result<Session, DecodeError> {
        let limit = self.config.max_payload_bytes;
        let mut buf = Vec::new();
        reader
            .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
            .read_to_end(&mut buf)?;
        self.decode_slice(&buf)
    }
}

fn log_decoded(session: &Session) {
    tracing::debug!(
        subject = %session.subject,
        extra_keys = session.extra.len(),
        headers = session.header.as_ref().map_or(0, HeaderMap::len),
        "decoded authentication session"
    );
}

fn check_known_fields(value: &Value) -> Result<(), DecodeError> {
    let Some(object) = value.as_object() else {
        // Shape errors are reported by the typed pass.
        return Ok(());
    };
    if let Some(field) = object.keys().find(|k| !SESSION_FIELDS.contains(&k.as_str())) {
        return Err(DecodeError::unknown_field(field.as_str()));
    }
    if let Some(ctx) = object.get("match_context").and_then(Value::as_object)
        && let Some(field) = ctx
            .keys()
            .find(|k| !MATCH_CONTEXT_FIELDS.contains(&k.as_str()))
    {
        return Err(DecodeError::unknown_field(format!("match_context.{field}")));
    }
    Ok(())
}
