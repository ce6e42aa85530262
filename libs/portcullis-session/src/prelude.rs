pub use crate::config::SessionDecoderConfig;
pub use crate::decode::SessionDecoder;
pub use crate::error::{DecodeError, HeaderError};
pub use crate::header::HeaderMap;
pub use crate::match_context::MatchContext;
pub use crate::session::Session;
