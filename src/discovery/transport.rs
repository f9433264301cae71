//! Wrapper around Reqwest's error type to facilitate exclusive matching

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransportKind {
    ConnectFailed,
    TimedOut,
    DecodingFailed,
    RedirectPolicyViolated,
    Other,
}

#[derive(Debug)]
pub(crate) struct TransportError {
    kind: TransportKind,
    source: reqwest::Error,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::TimedOut
        } else if err.is_connect() {
            TransportKind::ConnectFailed
        } else if err.is_decode() {
            TransportKind::DecodingFailed
        } else if err.is_redirect() {
            TransportKind::RedirectPolicyViolated
        } else {
            TransportKind::Other
        };

        TransportError { kind, source: err }
    }
}

impl TransportError {
    pub(crate) fn kind(&self) -> TransportKind {
        self.kind
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportKind::ConnectFailed => write!(f, "connection failed"),
            TransportKind::TimedOut => write!(f, "timed out"),
            TransportKind::DecodingFailed => write!(f, "decoding failed"),
            TransportKind::RedirectPolicyViolated => write!(f, "redirect policy violated"),
            TransportKind::Other => write!(f, "{}", self.source),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}
