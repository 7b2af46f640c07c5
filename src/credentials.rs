//! PSK credential resolution
//!
//! Bridges the engine's credential-negotiation callbacks to caller-supplied
//! identity/secret lookup. Resolution is one synchronous lookup per
//! handshake attempt, side-effect-free on failure; a failed lookup aborts
//! the handshake and never falls back to an unauthenticated mode.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use zeroize::Zeroize;

use crate::error::CredentialError;

/// Engine-side bound on a PSK secret.
pub const MAX_PSK_LEN: usize = 256;

/// Engine-side bound on a PSK identity.
pub const MAX_IDENTITY_LEN: usize = 128;

/// A pre-shared secret. Zeroed on drop, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PskSecret(Vec<u8>);

impl PskSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for PskSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for PskSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PskSecret({} bytes)", self.0.len())
    }
}

/// Identity plus secret, resolved for one handshake attempt.
#[derive(Debug, Clone)]
pub struct PskCredential {
    /// Opaque identity presented to the peer.
    pub identity: Vec<u8>,
    /// Shared secret fed to the engine's key schedule.
    pub secret: PskSecret,
}

/// Client-role credential lookup: a server-supplied hint (possibly absent)
/// to an identity and secret.
///
/// Implementations backed by a remote store should apply their own timeout;
/// a lookup that never returns stalls that handshake's thread.
pub trait ClientCredentialSource: Send + Sync {
    fn resolve(&self, hint: Option<&[u8]>) -> Result<PskCredential, CredentialError>;
}

/// Server-role credential lookup: a client-presented identity to its secret.
pub trait ServerCredentialSource: Send + Sync {
    fn lookup(&self, identity: &[u8]) -> Result<PskSecret, CredentialError>;
}

/// Client-role resolver backing the engine's PSK callback.
///
/// Enforces the engine's buffer bounds here so an oversize credential can
/// never reach the wire, and treats zero-length output as "no credential"
/// rather than an empty one.
pub struct ClientPskResolver {
    source: Arc<dyn ClientCredentialSource>,
}

impl ClientPskResolver {
    pub fn new(source: Arc<dyn ClientCredentialSource>) -> Self {
        Self { source }
    }

    /// Resolve the credential for one handshake attempt.
    pub fn resolve(&self, hint: Option<&[u8]>) -> Result<PskCredential, CredentialError> {
        let credential = self.source.resolve(hint)?;

        if credential.identity.is_empty() || credential.secret.is_empty() {
            return Err(CredentialError::CredentialUnavailable);
        }
        if credential.identity.len() > MAX_IDENTITY_LEN {
            return Err(CredentialError::IdentityTooLong {
                got: credential.identity.len(),
                max: MAX_IDENTITY_LEN,
            });
        }
        if credential.secret.len() > MAX_PSK_LEN {
            return Err(CredentialError::SecretTooLong {
                got: credential.secret.len(),
                max: MAX_PSK_LEN,
            });
        }

        Ok(credential)
    }
}

/// Server-role resolver backing the engine's PSK callback.
pub struct ServerPskResolver {
    source: Arc<dyn ServerCredentialSource>,
}

impl ServerPskResolver {
    pub fn new(source: Arc<dyn ServerCredentialSource>) -> Self {
        Self { source }
    }

    /// Look up the secret for a client-presented identity.
    ///
    /// Any failure aborts the handshake; there is no unauthenticated
    /// fallback.
    pub fn lookup(&self, identity: &[u8]) -> Result<PskSecret, CredentialError> {
        if identity.len() > MAX_IDENTITY_LEN {
            return Err(CredentialError::IdentityTooLong {
                got: identity.len(),
                max: MAX_IDENTITY_LEN,
            });
        }

        let secret = self.source.lookup(identity).map_err(|err| {
            tracing::warn!("PSK lookup failed for {}: {}", hex::encode(identity), err);
            err
        })?;

        if secret.is_empty() {
            return Err(CredentialError::UnknownIdentity);
        }
        if secret.len() > MAX_PSK_LEN {
            return Err(CredentialError::SecretTooLong {
                got: secret.len(),
                max: MAX_PSK_LEN,
            });
        }

        Ok(secret)
    }
}

/// One fixed credential, ignoring any server hint.
pub struct StaticPsk {
    identity: Vec<u8>,
    secret: PskSecret,
}

impl StaticPsk {
    pub fn new(identity: impl Into<Vec<u8>>, secret: PskSecret) -> Self {
        Self {
            identity: identity.into(),
            secret,
        }
    }
}

impl ClientCredentialSource for StaticPsk {
    fn resolve(&self, _hint: Option<&[u8]>) -> Result<PskCredential, CredentialError> {
        Ok(PskCredential {
            identity: self.identity.clone(),
            secret: self.secret.clone(),
        })
    }
}

/// In-memory identity-to-secret table for server-role lookup.
#[derive(Default)]
pub struct PskTable {
    entries: HashMap<Vec<u8>, PskSecret>,
}

impl PskTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identity: impl Into<Vec<u8>>, secret: PskSecret) {
        self.entries.insert(identity.into(), secret);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ServerCredentialSource for PskTable {
    fn lookup(&self, identity: &[u8]) -> Result<PskSecret, CredentialError> {
        self.entries
            .get(identity)
            .cloned()
            .ok_or(CredentialError::UnknownIdentity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_psk_resolves_with_and_without_hint() {
        let source = StaticPsk::new(b"device-1".to_vec(), PskSecret::new(b"s3cret".to_vec()));
        let resolver = ClientPskResolver::new(Arc::new(source));

        let credential = resolver.resolve(None).unwrap();
        assert_eq!(credential.identity, b"device-1");
        assert_eq!(credential.secret.as_bytes(), b"s3cret");

        let hinted = resolver.resolve(Some(b"realm")).unwrap();
        assert_eq!(hinted.identity, b"device-1");
    }

    #[test]
    fn test_empty_credential_means_unavailable() {
        let source = StaticPsk::new(Vec::new(), PskSecret::new(Vec::new()));
        let resolver = ClientPskResolver::new(Arc::new(source));

        assert!(matches!(
            resolver.resolve(None),
            Err(CredentialError::CredentialUnavailable)
        ));
    }

    #[test]
    fn test_oversize_client_credential_rejected() {
        let long_identity = StaticPsk::new(
            vec![b'a'; MAX_IDENTITY_LEN + 1],
            PskSecret::new(b"ok".to_vec()),
        );
        let resolver = ClientPskResolver::new(Arc::new(long_identity));
        assert!(matches!(
            resolver.resolve(None),
            Err(CredentialError::IdentityTooLong { .. })
        ));

        let long_secret = StaticPsk::new(
            b"device-1".to_vec(),
            PskSecret::new(vec![0u8; MAX_PSK_LEN + 1]),
        );
        let resolver = ClientPskResolver::new(Arc::new(long_secret));
        assert!(matches!(
            resolver.resolve(None),
            Err(CredentialError::SecretTooLong { .. })
        ));
    }

    #[test]
    fn test_table_lookup_known_identity() {
        let mut table = PskTable::new();
        table.insert(b"device-1".to_vec(), PskSecret::new(b"s3cret".to_vec()));
        let resolver = ServerPskResolver::new(Arc::new(table));

        let secret = resolver.lookup(b"device-1").unwrap();
        assert_eq!(secret.as_bytes(), b"s3cret");
    }

    #[test]
    fn test_unknown_identity_aborts() {
        let resolver = ServerPskResolver::new(Arc::new(PskTable::new()));
        assert!(matches!(
            resolver.lookup(b"stranger"),
            Err(CredentialError::UnknownIdentity)
        ));
    }

    #[test]
    fn test_empty_table_secret_is_unknown_identity() {
        let mut table = PskTable::new();
        table.insert(b"device-1".to_vec(), PskSecret::new(Vec::new()));
        let resolver = ServerPskResolver::new(Arc::new(table));

        assert!(matches!(
            resolver.lookup(b"device-1"),
            Err(CredentialError::UnknownIdentity)
        ));
    }

    #[test]
    fn test_oversize_presented_identity_rejected() {
        let resolver = ServerPskResolver::new(Arc::new(PskTable::new()));
        let identity = vec![b'a'; MAX_IDENTITY_LEN + 1];
        assert!(matches!(
            resolver.lookup(&identity),
            Err(CredentialError::IdentityTooLong { .. })
        ));
    }

    #[test]
    fn test_secret_debug_hides_material() {
        let secret = PskSecret::new(b"top-secret".to_vec());
        let printed = format!("{:?}", secret);
        assert!(!printed.contains("top-secret"));
    }
}
