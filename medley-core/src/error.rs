//! Medley error abstractions.

use thiserror::Error;

/// Errors surfaced by the RPC layer to its immediate caller.
///
/// Remote failures are never swallowed: a server's code 1 reply is
/// re-surfaced verbatim as `Remote`, and is kept distinct from `Timeout` so
/// callers can tell "it said no" apart from "it never answered".
#[derive(Debug, Error)]
pub enum RpcError {
    /// No usable broker channel.
    #[error("message transport unavailable: {0}")]
    Transport(#[source] anyhow::Error),
    /// The client is not yet initialized or has been closed.
    #[error("client is not ready")]
    NotReady,
    /// The server replied with an application-level failure.
    #[error("remote failure: {0}")]
    Remote(String),
    /// No reply arrived within the deadline.
    #[error("request timed out")]
    Timeout,
    /// The server has no such method registered.
    #[error("method not allowed")]
    MethodNotAllowed,
    /// The client was closed while the call was in flight.
    #[error("client closed")]
    Closed,
    /// The reply payload could not be decoded.
    #[error("malformed response payload: {0}")]
    Decode(String),
}

impl RpcError {
    /// Whether this error indicates that the request may never have reached
    /// a live server.
    pub fn is_unanswered(&self) -> bool {
        matches!(self, Self::Timeout | Self::Closed | Self::NotReady | Self::Transport(_))
    }
}
