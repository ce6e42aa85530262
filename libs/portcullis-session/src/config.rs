//! Configuration for decoding sessions received from upstream providers.

use figment::Figment;
use serde::{Deserialize, Serialize};

/// Key under which the decoder configuration lives in a figment source.
pub const CONFIG_KEY: &str = "session_decoder";

fn default_max_payload_bytes() -> usize {
    1024 * 1024
}

/// Decoder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionDecoderConfig {
    /// Largest payload accepted, in bytes.
    pub max_payload_bytes: usize,

    /// Reject payloads carrying keys the session does not recognize.
    /// Default: false (unknown keys are ignored).
    pub deny_unknown_fields: bool,
}

impl Default for SessionDecoderConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            deny_unknown_fields: false,
        }
    }
}

impl SessionDecoderConfig {
    /// Read the `session_decoder` section of `figment`, falling back to
    /// defaults when the section is absent.
    ///
    /// # Errors
    ///
    /// Returns the figment error if the section exists but does not match
    /// this structure.
    #[allow(
        clippy::result_large_err,
        reason = "figment::Error is returned as-is so callers can merge it with their own"
    )]
    pub fn from_figment(figment: &Figment) -> Result<Self, figment::Error> {
        if figment.find_value(CONFIG_KEY).is_err() {
            return Ok(Self::default());
        }
        figment.extract_inner(CONFIG_KEY)
    }
}
