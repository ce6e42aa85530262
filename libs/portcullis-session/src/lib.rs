#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Authentication session for the Portcullis access-control pipeline.
//!
//! A [`Session`] is created empty for every proxied request and passed through
//! the authenticator, authorizer and mutator stages. Stages read and extend it:
//!
//! - [`Session::set_header`] stages headers for the outbound request
//! - [`Session::copy`] gives a stage its own independent session
//! - [`SessionDecoder`] builds a session from an upstream provider's JSON
//!
//! ```ignore
//! use portcullis_session::{Session, SessionDecoder};
//!
//! let mut session = SessionDecoder::default().decode_slice(&body)?;
//! session.set_header("X-User", session.subject.clone());
//! session.header.unwrap_or_default().apply_to(request.headers_mut())?;
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod header;
pub mod match_context;
pub mod prelude;
pub mod session;

pub use config::SessionDecoderConfig;
pub use decode::SessionDecoder;
pub use error::{DecodeError, HeaderError};
pub use header::HeaderMap;
pub use match_context::MatchContext;
pub use session::Session;
