use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

use crate::libdns::proto::{error::ProtoError, op::OpCode, rr::RecordType};

/// A backend lookup could not be completed.
///
/// Distinct from an empty answer: "no such record" is `Ok(vec![])`, every
/// variant here is a failure.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum LookupError {
    /// The question type has no lookup strategy in the active backend mode.
    #[error("request type {0} not implemented")]
    NotImplemented(RecordType),
    /// A PTR question whose name is not a reverse-mapping name.
    #[error("{0} is not a valid reverse lookup name")]
    InvalidReverseName(String),
    /// Connection, TLS or timeout failure
    #[error("problem performing request: {0}")]
    Request(Arc<reqwest::Error>),
    #[error("bad HTTP response code: {0}")]
    Status(StatusCode),
    #[error("could not unmarshal response: {0}")]
    Decode(Arc<serde_json::Error>),
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
}

impl PartialEq for LookupError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotImplemented(l0), Self::NotImplemented(r0)) => l0 == r0,
            (Self::InvalidReverseName(l0), Self::InvalidReverseName(r0)) => l0 == r0,
            (Self::Status(l0), Self::Status(r0)) => l0 == r0,
            (Self::Url(l0), Self::Url(r0)) => l0 == r0,
            (Self::Request(l0), Self::Request(r0)) => l0.to_string() == r0.to_string(),
            (Self::Decode(l0), Self::Decode(r0)) => l0.to_string() == r0.to_string(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(value: reqwest::Error) -> Self {
        Self::Request(Arc::new(value))
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(Arc::new(value))
    }
}

impl From<StatusCode> for LookupError {
    fn from(value: StatusCode) -> Self {
        Self::Status(value)
    }
}

/// Errors surfaced by the DNS pipeline.
#[derive(Debug, Clone, Error)]
pub enum DnsError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// Every stage delegated and nothing was left to answer.
    #[error("no middleware answered the request")]
    NoNextHandler,
    #[error("request carries no question")]
    NoQuestion,
    #[error("opcode {0:?} not supported")]
    UnsupportedOpCode(OpCode),
    #[error("proto error: {0}")]
    Proto(Arc<ProtoError>),
}

impl From<ProtoError> for DnsError {
    fn from(value: ProtoError) -> Self {
        Self::Proto(Arc::new(value))
    }
}
