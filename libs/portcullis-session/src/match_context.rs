use serde::Serialize;
use url::Url;

/// Outcome of matching the incoming request against an access rule.
///
/// Produced by the rule matcher before the first stage runs. `url` is the
/// full URL of the original request, and `regexp_capture_groups` holds the
/// groups captured by the rule's match expression, in match order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchContext {
    pub regexp_capture_groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
}

impl MatchContext {
    #[must_use]
    pub fn new(url: Url, regexp_capture_groups: Vec<String>) -> Self {
        Self {
            regexp_capture_groups,
            url: Some(url),
        }
    }

    /// Capture group at `index`, if the rule captured that many.
    #[must_use]
    pub fn capture_group(&self, index: usize) -> Option<&str> {
        self.regexp_capture_groups.get(index).map(String::as_str)
    }
}
