//! Server-role sessions and the endpoint that owns them
//!
//! A [`ServerEndpoint`] bundles the collaborators shared by every client of
//! one underlying channel (pinned engine configuration, cookie authority,
//! credential source, tagged outbound sink) and hands out one
//! [`ServerSession`] per client, registered in the session multiplexer.

use std::sync::Arc;

use crate::cookie::CookieAuthority;
use crate::credentials::{PskSecret, ServerCredentialSource, ServerPskResolver};
use crate::engine::{CtrlOp, CtrlReply, EngineConfig, PluginIo, TransportPlugin};
use crate::error::{CredentialError, MuxError, TransportError};
use crate::mux::{ClientId, InboundQueue, SessionMux, TaggedSink};

/// One server-role client session: the engine-facing endpoint for a single
/// client multiplexed over the shared channel.
///
/// The identifier is an explicit field, looked up through the multiplexer's
/// mapping; sessions carry no hidden per-adapter storage.
pub struct ServerSession {
    id: ClientId,
    inbound: InboundQueue,
    sink: Arc<dyn TaggedSink>,
    config: EngineConfig,
    cookies: Arc<CookieAuthority>,
    psk: ServerPskResolver,
}

impl ServerSession {
    fn new(
        id: ClientId,
        config: EngineConfig,
        cookies: Arc<CookieAuthority>,
        psk: ServerPskResolver,
        sink: Arc<dyn TaggedSink>,
    ) -> Self {
        Self {
            id,
            inbound: InboundQueue::new(),
            sink,
            config,
            cookies,
            psk,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cookie callbacks for the engine's HelloVerifyRequest exchange.
    pub fn cookies(&self) -> &CookieAuthority {
        &self.cookies
    }

    /// Server-role PSK callback for the engine's handshake.
    pub fn server_psk(&self, identity: &[u8]) -> Result<PskSecret, CredentialError> {
        self.psk.lookup(identity)
    }

    pub(crate) fn push_inbound(&self, datagram: Vec<u8>) -> bool {
        self.inbound.push(datagram)
    }

    /// Close the inbound path, unblocking any in-progress read.
    pub(crate) fn shutdown(&self) {
        self.inbound.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inbound.is_closed()
    }
}

/// The engine drives a session through a shared handle: reads block on the
/// inbound queue until the mux routes a datagram here, writes leave through
/// the shared sink tagged with this session's identifier.
impl TransportPlugin for Arc<ServerSession> {
    fn read(&mut self, buf: &mut [u8]) -> PluginIo {
        match self.inbound.pop() {
            Some(datagram) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                PluginIo::Transferred(n)
            }
            // Session closed underneath the engine.
            None => PluginIo::Fatal,
        }
    }

    fn write(&mut self, buf: &[u8]) -> PluginIo {
        if self.is_closed() {
            return PluginIo::Fatal;
        }
        match self.sink.send(self.id, buf) {
            Ok(n) => PluginIo::Transferred(n),
            Err(TransportError::WouldBlock) => PluginIo::Retry,
            Err(err) => {
                tracing::debug!("Outbound send failed for {}: {}", self.id, err);
                PluginIo::Fatal
            }
        }
    }

    fn ctrl(&mut self, _op: CtrlOp) -> CtrlReply {
        CtrlReply::Unsupported
    }

    fn destroyed(&mut self) {
        self.shutdown();
    }
}

/// Server endpoint for one shared channel.
///
/// Every collaborator is passed at construction; nothing is registered
/// process-wide.
pub struct ServerEndpoint {
    config: EngineConfig,
    cookies: Arc<CookieAuthority>,
    credentials: Arc<dyn ServerCredentialSource>,
    sink: Arc<dyn TaggedSink>,
    mux: SessionMux,
}

impl ServerEndpoint {
    pub fn new(
        config: EngineConfig,
        credentials: Arc<dyn ServerCredentialSource>,
        sink: Arc<dyn TaggedSink>,
    ) -> Self {
        Self {
            config,
            cookies: Arc::new(CookieAuthority::new()),
            credentials,
            sink,
            mux: SessionMux::new(),
        }
    }

    /// Use a caller-managed cookie authority, e.g. one whose rotation is
    /// driven by an operator timer shared across endpoints.
    pub fn with_cookie_authority(mut self, cookies: Arc<CookieAuthority>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Open and register the session for a new client.
    ///
    /// Fails with [`MuxError::DuplicateIdentifier`] if `id` already names a
    /// registered session.
    pub fn open_session(&self, id: ClientId) -> Result<Arc<ServerSession>, MuxError> {
        let session = Arc::new(ServerSession::new(
            id,
            self.config.clone(),
            self.cookies.clone(),
            ServerPskResolver::new(self.credentials.clone()),
            self.sink.clone(),
        ));
        self.mux.register(session.clone())?;
        Ok(session)
    }

    /// Route one inbound datagram to the session registered under `id`.
    pub fn dispatch(&self, id: ClientId, datagram: &[u8]) -> Result<(), MuxError> {
        self.mux.dispatch(id, datagram)
    }

    /// Close and deregister a session, unblocking any in-progress read.
    /// Idempotent.
    pub fn close_session(&self, id: ClientId) {
        self.mux.remove(id);
    }

    /// Look up a registered session.
    pub fn session(&self, id: ClientId) -> Option<Arc<ServerSession>> {
        self.mux.get(id)
    }

    pub fn cookies(&self) -> &Arc<CookieAuthority> {
        &self.cookies
    }

    pub fn session_count(&self) -> usize {
        self.mux.len()
    }
}
