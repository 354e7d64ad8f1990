//! Inbound request messages.
//!
//! Every message from the host UI is one JSON object with a `type` field and
//! a handful of optional fields whose presence depends on the type. Parsing
//! is deliberately lenient: [`Request`] accepts any `type` string so that an
//! unknown type can still be answered with an `RPC_ERROR` carrying the
//! caller's `reqId`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::jobs::JobId;

/// The request kinds the dispatcher routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Rpc,
    JobStart,
    JobCancel,
    SessionConnect,
    SessionDisconnect,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Rpc => "RPC",
            RequestType::JobStart => "JOB_START",
            RequestType::JobCancel => "JOB_CANCEL",
            RequestType::SessionConnect => "SESSION_CONNECT",
            RequestType::SessionDisconnect => "SESSION_DISCONNECT",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RPC" => Ok(RequestType::Rpc),
            "JOB_START" => Ok(RequestType::JobStart),
            "JOB_CANCEL" => Ok(RequestType::JobCancel),
            "SESSION_CONNECT" => Ok(RequestType::SessionConnect),
            "SESSION_DISCONNECT" => Ok(RequestType::SessionDisconnect),
            _ => Err(()),
        }
    }
}

/// A raw inbound message.
///
/// | type                 | required fields              |
/// |----------------------|------------------------------|
/// | `RPC`                | `method`, `reqId`, `params`? |
/// | `JOB_START`          | `method`, `reqId`, `params`? |
/// | `JOB_CANCEL`         | `reqId`, `jobId`             |
/// | `SESSION_CONNECT`    | `channel`, `sessionId`, `payload`? |
/// | `SESSION_DISCONNECT` | `channel`, `sessionId`       |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Request {
    /// The parsed request type, `None` if absent or unrecognised.
    pub fn request_type(&self) -> Option<RequestType> {
        self.kind.as_deref().and_then(|k| k.parse().ok())
    }

    pub fn rpc(req_id: &str, method: &str, params: Value) -> Self {
        Request {
            kind: Some(RequestType::Rpc.as_str().to_string()),
            req_id: Some(req_id.to_string()),
            method: Some(method.to_string()),
            params: Some(params),
            ..Default::default()
        }
    }

    pub fn job_start(req_id: &str, method: &str, params: Value) -> Self {
        Request {
            kind: Some(RequestType::JobStart.as_str().to_string()),
            ..Request::rpc(req_id, method, params)
        }
    }

    pub fn job_cancel(req_id: &str, job_id: &JobId) -> Self {
        Request {
            kind: Some(RequestType::JobCancel.as_str().to_string()),
            req_id: Some(req_id.to_string()),
            job_id: Some(job_id.clone()),
            ..Default::default()
        }
    }

    pub fn session_connect(channel: &str, session_id: &str, payload: Option<Value>) -> Self {
        Request {
            kind: Some(RequestType::SessionConnect.as_str().to_string()),
            channel: Some(channel.to_string()),
            session_id: Some(session_id.to_string()),
            payload,
            ..Default::default()
        }
    }

    pub fn session_disconnect(channel: &str, session_id: &str) -> Self {
        Request {
            kind: Some(RequestType::SessionDisconnect.as_str().to_string()),
            channel: Some(channel.to_string()),
            session_id: Some(session_id.to_string()),
            ..Default::default()
        }
    }
}
