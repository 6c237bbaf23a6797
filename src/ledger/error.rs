use std::error::Error as _;

use thiserror::Error;

/// Failure reported by a ledger read or submission.
///
/// The variant is the classification code the retry policy inspects: only
/// rate limiting and network-level timeouts/resets are worth another attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("RPC rate limited: {0}")]
    RateLimited(String),

    #[error("RPC request timed out: {0}")]
    Timeout(String),

    #[error("RPC connection reset: {0}")]
    ConnectionReset(String),

    /// The node answered, and the answer was a refusal.
    #[error("{0}")]
    Rejected(String),

    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Failed to sign transaction: {0}")]
    Signing(String),
}

impl RpcError {
    /// Stable classification code, used in logs and API error details
    pub fn code(&self) -> &'static str {
        match self {
            RpcError::RateLimited(_) => "RATE_LIMITED",
            RpcError::Timeout(_) => "TIMEOUT",
            RpcError::ConnectionReset(_) => "CONNECTION_RESET",
            RpcError::Rejected(_) => "REJECTED",
            RpcError::Transport(_) => "TRANSPORT",
            RpcError::InvalidResponse(_) => "INVALID_RESPONSE",
            RpcError::Signing(_) => "SIGNING",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RpcError::RateLimited(_) | RpcError::Timeout(_) | RpcError::ConnectionReset(_)
        )
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RpcError::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() || is_connection_drop(&e) {
            RpcError::ConnectionReset(e.to_string())
        } else if e.is_decode() {
            RpcError::InvalidResponse(e.to_string())
        } else {
            RpcError::Transport(e.to_string())
        }
    }
}

/// Walk the source chain for an I/O error that means the peer went away
fn is_connection_drop(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = e.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            );
        }
        source = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RpcError::RateLimited("429".into()).is_transient());
        assert!(RpcError::Timeout("30s".into()).is_transient());
        assert!(RpcError::ConnectionReset("ECONNRESET".into()).is_transient());

        assert!(!RpcError::Rejected("MethodNotFound".into()).is_transient());
        assert!(!RpcError::Transport("tls".into()).is_transient());
        assert!(!RpcError::InvalidResponse("eof".into()).is_transient());
        assert!(!RpcError::Signing("bad deposit".into()).is_transient());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("body read failed")]
    struct Wrapped(#[source] std::io::Error);

    #[test]
    fn test_connection_drop_in_source_chain() {
        let reset = Wrapped(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert!(is_connection_drop(&reset));

        let eof = Wrapped(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(is_connection_drop(&eof));

        let denied = Wrapped(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!is_connection_drop(&denied));
    }

    #[test]
    fn test_codes() {
        assert_eq!(RpcError::RateLimited(String::new()).code(), "RATE_LIMITED");
        assert_eq!(RpcError::Rejected(String::new()).code(), "REJECTED");
    }

    #[test]
    fn test_rejected_display_is_verbatim() {
        let err = RpcError::Rejected("Smart contract panicked: The account is not registered".into());
        assert_eq!(
            err.to_string(),
            "Smart contract panicked: The account is not registered"
        );
    }
}
