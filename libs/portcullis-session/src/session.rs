use serde::Serialize;
use serde_json::{Map, Value};

use crate::header::HeaderMap;
use crate::match_context::MatchContext;

/// `Session` is the authentication context of a single proxied request.
///
/// Created empty by the pipeline driver when a request arrives and handed to
/// every authenticator, authorizer and mutator in turn. Stages that may run
/// concurrently over the same request must each work on their own
/// [`Session::copy`]; the session itself does no locking.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    /// Identity established by an authenticator, e.g. `"anonymous"`. Empty until then.
    pub subject: String,
    /// Provider-specific claims.
    pub extra: Map<String, Value>,
    /// Headers staged for the outbound request. `None` until a stage sets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderMap>,
    pub match_context: MatchContext,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty session for a request the rule matcher has already matched.
    #[must_use]
    pub fn for_match(match_context: MatchContext) -> Self {
        Self {
            match_context,
            ..Self::default()
        }
    }

    /// Stage `value` under header `name`, initializing the header map on first use.
    ///
    /// Earlier values for the same name are kept; [`Session::header_value`]
    /// returns the latest one.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.header
            .get_or_insert_with(HeaderMap::new)
            .append(name, value);
    }

    /// Most recently staged value for header `name`.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header.as_ref().and_then(|h| h.get(name))
    }

    #[must_use]
    pub fn extra_value(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Independent copy of this session.
    ///
    /// Every container is reallocated, nested `extra` values included, so no
    /// mutation of the copy is visible through `self` and vice versa.
    #[must_use]
    pub fn copy(&self) -> Self {
        tracing::trace!(subject = %self.subject, "copying authentication session");
        self.clone()
    }
}
