//! RPC wire envelopes.
//!
//! Requests and responses are serialized JSON payloads. The correlation id
//! and reply destination travel as transport-level message properties, never
//! as part of the payload itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// RPC method names, shared between callers and servers.
pub const ALLOC_MEDIA: &str = "ALLOC_MEDIA";
pub const CREATE_SEND_TRANSPORT: &str = "CREATE_SEND_TRANSPORT";
pub const CONNECT_TRANSPORT: &str = "CONNECT_TRANSPORT";
pub const CREATE_PRODUCER: &str = "CREATE_PRODUCER";
pub const CREATE_RECV_TRANSPORT: &str = "CREATE_RECV_TRANSPORT";
pub const CREATE_CONSUMER: &str = "CREATE_CONSUMER";

/// An RPC request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// The name of the method to invoke on the server.
    pub method: String,
    /// The method-specific request body.
    pub body: Value,
}

/// An RPC response envelope, discriminated on the wire by an integer `code`.
///
/// `Timeout` is reserved on the wire but never emitted by a server: it is the
/// client's locally synthesized outcome when no reply arrives in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResponse", into = "RawResponse")]
pub enum RpcResponse {
    /// Code 0: success with an arbitrary payload.
    Ok(Value),
    /// Code 1: application-level failure with a human-readable reason.
    Failure(String),
    /// Code 2: client-local timeout marker.
    Timeout,
    /// Code 3: the requested method is not in the server's table.
    MethodNotAllowed,
}

impl RpcResponse {
    /// Build a failure response from any displayable reason.
    pub fn failure(reason: impl std::fmt::Display) -> Self {
        Self::Failure(reason.to_string())
    }
}

/// The raw wire form of a response envelope.
#[derive(Serialize, Deserialize)]
struct RawResponse {
    code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl TryFrom<RawResponse> for RpcResponse {
    type Error = String;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        match raw.code {
            0 => Ok(Self::Ok(raw.data.unwrap_or(Value::Null))),
            1 => {
                let reason = match raw.data {
                    Some(Value::String(reason)) => reason,
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Ok(Self::Failure(reason))
            }
            2 => Ok(Self::Timeout),
            3 => Ok(Self::MethodNotAllowed),
            code => Err(format!("unknown response code {}", code)),
        }
    }
}

impl From<RpcResponse> for RawResponse {
    fn from(res: RpcResponse) -> Self {
        match res {
            RpcResponse::Ok(data) => Self { code: 0, data: Some(data) },
            RpcResponse::Failure(reason) => Self { code: 1, data: Some(Value::String(reason)) },
            RpcResponse::Timeout => Self { code: 2, data: None },
            RpcResponse::MethodNotAllowed => Self { code: 3, data: None },
        }
    }
}
