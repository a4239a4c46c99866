//! LSRC2 JSON-RPC client.
//!
//! The RemoteControl 2 API speaks JSON-RPC 2.0 over HTTP POST but reports
//! errors in ways the JSON-RPC specification does not allow. This module
//! hides that behind [`Session`], whose calls either return the expected
//! data or a single [`ClientError`].

pub mod envelope;
pub mod error;
pub mod outcome;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use envelope::{RawResponse, Request, RequestIds};
pub use error::ClientError;
pub use outcome::{normalize, CallKind, Outcome};
pub use session::{Session, SessionOptions, SessionState};
pub use transport::{Endpoint, HttpEndpoint, Transport};
