//! Error types for the remora bridging layer

use thiserror::Error;

use crate::mux::ClientId;

/// Main error type for remora operations
#[derive(Error, Debug)]
pub enum RemoraError {
    /// Transport-level failures
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session routing failures
    #[error("Mux error: {0}")]
    Mux(#[from] MuxError),

    /// Anti-spoofing cookie failures
    #[error("Cookie error: {0}")]
    Cookie(#[from] CookieError),

    /// Credential resolution failures
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// Failures surfaced by a caller-supplied transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// No data or buffer space right now; retry later. This is an expected
    /// control-flow signal, not a fault.
    #[error("Operation would block")]
    WouldBlock,

    /// Fatal I/O failure; the connection or session is torn down.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport was closed on this side.
    #[error("Transport closed")]
    Closed,
}

/// Session multiplexer misuse or routing of an unrecognized client
#[derive(Error, Debug)]
pub enum MuxError {
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(ClientId),

    #[error("Unknown session: {0}")]
    UnknownSession(ClientId),
}

/// Anti-spoofing cookie verification failures
#[derive(Error, Debug)]
pub enum CookieError {
    /// The presented cookie matches neither the current secret nor a
    /// grace-period one. The client restarts its handshake; no server-side
    /// resource is retained.
    #[error("Cookie verification failed")]
    Rejected,

    #[error("Cookie too long: max {max}, got {got}")]
    Oversize { got: usize, max: usize },
}

/// PSK resolution failures; each aborts the handshake, never a downgrade
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The client side could not produce an identity for this handshake.
    #[error("No credential available")]
    CredentialUnavailable,

    /// The server side has no secret for the presented identity.
    #[error("Unknown PSK identity")]
    UnknownIdentity,

    #[error("Identity too long: max {max}, got {got}")]
    IdentityTooLong { got: usize, max: usize },

    #[error("Secret too long: max {max}, got {got}")]
    SecretTooLong { got: usize, max: usize },
}

impl RemoraError {
    /// Check if this error is an expected retry signal rather than a fault
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(TransportError::WouldBlock))
    }
}

/// Result type alias for remora operations
pub type Result<T> = std::result::Result<T, RemoraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_would_block_is_transient() {
        let err = RemoraError::from(TransportError::WouldBlock);
        assert!(err.is_transient());
    }

    #[test]
    fn test_io_failure_is_not_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = RemoraError::from(TransportError::Io(io));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_credential_errors_are_not_transient() {
        let err = RemoraError::from(CredentialError::UnknownIdentity);
        assert!(!err.is_transient());
    }
}
