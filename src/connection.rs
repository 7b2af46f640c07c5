//! Client-role connections
//!
//! A [`Connector`] is the explicit factory for client connections: it owns
//! the pinned engine configuration and the credential source, and each
//! `open` wraps one caller-supplied transport as a [`Connection`] the engine
//! can drive. Nothing is registered process-wide.

use std::sync::Arc;

use crate::credentials::{ClientCredentialSource, ClientPskResolver, PskCredential};
use crate::engine::{CtrlOp, CtrlReply, EngineConfig, PluginIo, TransportPlugin};
use crate::error::CredentialError;
use crate::transport::{TransportAdapter, TransportSource};

/// Factory for client-role connections sharing one configuration and
/// credential source.
pub struct Connector {
    config: EngineConfig,
    credentials: Arc<dyn ClientCredentialSource>,
}

impl Connector {
    pub fn new(config: EngineConfig, credentials: Arc<dyn ClientCredentialSource>) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Open a connection over a caller-supplied transport.
    pub fn open(&self, transport: Box<dyn TransportSource>) -> Connection {
        tracing::debug!("Opening client connection");
        Connection {
            adapter: TransportAdapter::new(transport),
            psk: ClientPskResolver::new(self.credentials.clone()),
            config: self.config.clone(),
        }
    }
}

/// One client-role logical link: the engine-facing endpoint for a single
/// point-to-point connection, exclusively owning its transport.
pub struct Connection {
    adapter: TransportAdapter,
    psk: ClientPskResolver,
    config: EngineConfig,
}

impl Connection {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Client-role PSK callback for the engine's handshake: resolve the
    /// identity and secret to present, given the server's hint.
    pub fn client_psk(&self, hint: Option<&[u8]>) -> Result<PskCredential, CredentialError> {
        self.psk.resolve(hint)
    }

    /// Release the underlying transport. The first call closes the source;
    /// repeated calls are no-ops.
    pub fn close(&mut self) {
        self.adapter.close();
    }

    pub fn is_closed(&self) -> bool {
        self.adapter.is_closed()
    }
}

impl TransportPlugin for Connection {
    fn read(&mut self, buf: &mut [u8]) -> PluginIo {
        self.adapter.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> PluginIo {
        self.adapter.write(buf)
    }

    fn ctrl(&mut self, op: CtrlOp) -> CtrlReply {
        self.adapter.ctrl(op)
    }

    fn destroyed(&mut self) {
        self.adapter.destroyed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{PskSecret, StaticPsk};
    use crate::error::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoSource {
        pending: Vec<u8>,
        closes: Arc<AtomicUsize>,
    }

    impl TransportSource for EchoSource {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            if self.pending.is_empty() {
                return Err(TransportError::WouldBlock);
            }
            let n = self.pending.len().min(buf.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
            self.pending.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn connector() -> Connector {
        let source = StaticPsk::new(b"device-1".to_vec(), PskSecret::new(b"s3cret".to_vec()));
        Connector::new(EngineConfig::default(), Arc::new(source))
    }

    fn open_echo(connector: &Connector) -> (Connection, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let connection = connector.open(Box::new(EchoSource {
            pending: Vec::new(),
            closes: closes.clone(),
        }));
        (connection, closes)
    }

    #[test]
    fn test_open_connection_round_trip() {
        let connector = connector();
        let (mut connection, _) = open_echo(&connector);

        assert_eq!(connection.write(b"record"), PluginIo::Transferred(6));

        let mut buf = [0u8; 64];
        assert_eq!(connection.read(&mut buf), PluginIo::Transferred(6));
        assert_eq!(&buf[..6], b"record");

        // Drained: the source reports would-block, the engine sees retry.
        assert_eq!(connection.read(&mut buf), PluginIo::Retry);
    }

    #[test]
    fn test_connection_psk_resolution() {
        let connector = connector();
        let (connection, _) = open_echo(&connector);

        let credential = connection.client_psk(Some(b"hint")).unwrap();
        assert_eq!(credential.identity, b"device-1");
        assert_eq!(credential.secret.as_bytes(), b"s3cret");
    }

    #[test]
    fn test_connection_close_once() {
        let connector = connector();
        let (mut connection, closes) = open_echo(&connector);

        connection.close();
        connection.close();

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(connection.is_closed());
        assert_eq!(connection.write(b"late"), PluginIo::Fatal);
    }

    #[test]
    fn test_connection_is_pinned() {
        let connector = connector();
        let (connection, _) = open_echo(&connector);
        assert_eq!(
            connection.config().min_version(),
            connection.config().max_version()
        );
    }
}
