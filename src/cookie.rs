//! Stateless anti-spoofing cookie exchange
//!
//! Implements the HelloVerifyRequest side of the handshake: a keyed MAC over
//! the client's transport identity, handed out on first contact and checked
//! when echoed back. No per-client state is kept, so spoofed-source flood
//! traffic cannot force allocation before a client proves it owns the
//! address it claims.

use std::net::SocketAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::CookieError;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound on a cookie's wire length (DTLS 1.2 record bound).
pub const MAX_COOKIE_LEN: usize = 255;

/// Length of a generated cookie: one full HMAC-SHA256 tag.
pub const COOKIE_LEN: usize = 32;

/// How long a rotated-out secret keeps verifying cookies.
const DEFAULT_GRACE: Duration = Duration::from_secs(120);

/// Canonical byte form of a client's transport identity: address, port, or
/// whatever opaque connection parameters the caller's transport exposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(Vec<u8>);

impl ClientIdentity {
    /// Identity from opaque connection parameters.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<SocketAddr> for ClientIdentity {
    /// Canonical `ip:port` text form, the same shape sessions are keyed by.
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string().into_bytes())
    }
}

/// A derived anti-spoofing cookie. Never persisted; recomputed on verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie([u8; COOKIE_LEN]);

impl Cookie {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

struct Secrets {
    current: [u8; 32],
    previous: Option<[u8; 32]>,
    rotated_at: Instant,
}

/// Stateless cookie generation and verification with rotating secrets.
///
/// Shared across every session of a server endpoint. Generate and verify
/// run concurrently under a read lock; rotation is one atomic swap that
/// retains the outgoing secret for a grace window, so handshakes in flight
/// across the rotation boundary still verify.
pub struct CookieAuthority {
    secrets: RwLock<Secrets>,
    grace: Duration,
}

impl CookieAuthority {
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_GRACE)
    }

    /// Authority whose rotated-out secret stops verifying after `grace`.
    /// The rotation cadence itself is the operator's: call [`rotate`] on
    /// whatever interval policy requires.
    ///
    /// [`rotate`]: CookieAuthority::rotate
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            secrets: RwLock::new(Secrets {
                current: fresh_secret(),
                previous: None,
                rotated_at: Instant::now(),
            }),
            grace,
        }
    }

    /// Swap in a fresh secret, retaining the outgoing one for the grace
    /// window.
    pub fn rotate(&self) {
        let mut secrets = self.secrets.write().unwrap();
        secrets.previous = Some(secrets.current);
        secrets.current = fresh_secret();
        secrets.rotated_at = Instant::now();
        tracing::debug!("Cookie secret rotated");
    }

    /// Derive the cookie for `identity` under the current secret.
    pub fn generate(&self, identity: &ClientIdentity) -> Cookie {
        let secrets = self.secrets.read().unwrap();
        Cookie(mac_bytes(&secrets.current, identity))
    }

    /// Verify a presented cookie in constant time.
    ///
    /// Accepts cookies derived under the current secret, or under the
    /// previous secret while the grace window is open. Anything else is
    /// rejected without consulting any per-client state.
    pub fn verify(&self, identity: &ClientIdentity, presented: &[u8]) -> Result<(), CookieError> {
        if presented.len() > MAX_COOKIE_LEN {
            return Err(CookieError::Oversize {
                got: presented.len(),
                max: MAX_COOKIE_LEN,
            });
        }

        let secrets = self.secrets.read().unwrap();
        if mac_verifies(&secrets.current, identity, presented) {
            return Ok(());
        }

        if let Some(previous) = secrets.previous {
            if secrets.rotated_at.elapsed() < self.grace
                && mac_verifies(&previous, identity, presented)
            {
                return Ok(());
            }
        }

        tracing::debug!("Cookie rejected for {}", hex::encode(identity.as_bytes()));
        Err(CookieError::Rejected)
    }
}

impl Default for CookieAuthority {
    fn default() -> Self {
        Self::new()
    }
}

fn fresh_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

fn mac_bytes(secret: &[u8; 32], identity: &ClientIdentity) -> [u8; COOKIE_LEN] {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(identity.as_bytes());
    mac.finalize().into_bytes().into()
}

fn mac_verifies(secret: &[u8; 32], identity: &ClientIdentity, presented: &[u8]) -> bool {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(identity.as_bytes());
    mac.verify_slice(presented).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(tag: &str) -> ClientIdentity {
        ClientIdentity::from_bytes(tag.as_bytes().to_vec())
    }

    #[test]
    fn test_round_trip_accepts() {
        let authority = CookieAuthority::new();
        let client = identity("198.51.100.7:5684");

        let cookie = authority.generate(&client);
        assert!(authority.verify(&client, cookie.as_bytes()).is_ok());
    }

    #[test]
    fn test_no_cross_client_reuse() {
        let authority = CookieAuthority::new();
        let alice = identity("198.51.100.7:5684");
        let bob = identity("203.0.113.9:5684");

        let cookie = authority.generate(&alice);
        assert!(matches!(
            authority.verify(&bob, cookie.as_bytes()),
            Err(CookieError::Rejected)
        ));
    }

    #[test]
    fn test_forged_cookie_rejected() {
        let authority = CookieAuthority::new();
        let client = identity("198.51.100.7:5684");

        assert!(matches!(
            authority.verify(&client, &[0u8; COOKIE_LEN]),
            Err(CookieError::Rejected)
        ));
    }

    #[test]
    fn test_oversize_cookie_rejected() {
        let authority = CookieAuthority::new();
        let client = identity("198.51.100.7:5684");

        let oversize = vec![0u8; MAX_COOKIE_LEN + 1];
        assert!(matches!(
            authority.verify(&client, &oversize),
            Err(CookieError::Oversize { .. })
        ));
    }

    #[test]
    fn test_rotation_grace_accepts_previous_secret() {
        let authority = CookieAuthority::with_grace(Duration::from_secs(60));
        let client = identity("198.51.100.7:5684");

        let cookie = authority.generate(&client);
        authority.rotate();

        // Still within the grace window: the previous secret verifies.
        assert!(authority.verify(&client, cookie.as_bytes()).is_ok());

        // A second rotation discards that secret entirely.
        authority.rotate();
        assert!(authority.verify(&client, cookie.as_bytes()).is_err());
    }

    #[test]
    fn test_expired_grace_window_rejects() {
        let authority = CookieAuthority::with_grace(Duration::ZERO);
        let client = identity("198.51.100.7:5684");

        let cookie = authority.generate(&client);
        authority.rotate();

        assert!(matches!(
            authority.verify(&client, cookie.as_bytes()),
            Err(CookieError::Rejected)
        ));
    }

    #[test]
    fn test_generation_is_deterministic_between_rotations() {
        let authority = CookieAuthority::new();
        let client = identity("198.51.100.7:5684");

        assert_eq!(authority.generate(&client), authority.generate(&client));

        authority.rotate();
        let after = authority.generate(&client);
        assert!(authority.verify(&client, after.as_bytes()).is_ok());
    }

    #[test]
    fn test_identity_from_socket_addr() {
        let addr: SocketAddr = "127.0.0.1:5684".parse().unwrap();
        let id = ClientIdentity::from(addr);
        assert_eq!(id.as_bytes(), b"127.0.0.1:5684");
    }
}
