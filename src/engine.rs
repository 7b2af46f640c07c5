//! Contract surface of the external DTLS engine
//!
//! The engine is an opaque collaborator: it owns the handshake state machine
//! and the record-layer cryptography. Per connection it drives one
//! [`TransportPlugin`] plus, during a handshake, the cookie and PSK
//! callbacks. This module pins down the shape of that surface; the rest of
//! the crate implements it.

/// Outcome of a plugin read or write, as the engine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginIo {
    /// Bytes transferred. Zero on a read means end of stream.
    Transferred(usize),
    /// Temporary failure; the engine retries the operation later.
    Retry,
    /// Fatal failure; the engine tears the connection down.
    Fatal,
}

/// Control queries an engine may issue against its transport plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlOp {
    /// Flush buffered writes.
    Flush,
    /// Query the path MTU.
    QueryMtu,
    /// Arm a read/write deadline, in milliseconds.
    SetDeadline(u64),
}

/// Reply to a [`CtrlOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlReply {
    /// The queried behavior is not provided by this transport.
    Unsupported,
}

/// Per-connection transport plugin surface the engine drives.
///
/// One read, one write, one control query, and creation/destruction
/// notifications, all invoked synchronously on whatever thread is driving
/// that connection's handshake or record processing. A call may block only
/// as long as the underlying caller-supplied I/O blocks.
pub trait TransportPlugin {
    /// Read up to `buf.len()` bytes of one inbound datagram.
    fn read(&mut self, buf: &mut [u8]) -> PluginIo;

    /// Write one outbound datagram.
    fn write(&mut self, buf: &[u8]) -> PluginIo;

    /// Control queries. This is a logical, not a real, transport primitive:
    /// MTU discovery, timeouts and the like are the caller's responsibility,
    /// so every query answers [`CtrlReply::Unsupported`].
    fn ctrl(&mut self, op: CtrlOp) -> CtrlReply;

    /// Invoked once when the engine attaches the plugin.
    fn created(&mut self) {}

    /// Invoked once when the engine detaches the plugin.
    fn destroyed(&mut self) {}
}

/// DTLS protocol versions an engine context can be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    Dtls12,
}

impl ProtocolVersion {
    /// Wire identifier carried on the record layer.
    pub fn wire_id(self) -> u16 {
        match self {
            Self::Dtls12 => 0xfefd,
        }
    }
}

/// PSK cipher suites offered to the engine unless overridden.
pub const DEFAULT_CIPHER_LIST: &str = "PSK-AES256-CCM8:PSK-AES128-CCM8";

/// Engine context configuration, applied at construction time.
///
/// The version span is always pinned: minimum equals maximum, so version
/// negotiation collapses to accepting exactly one protocol and the
/// downgrade branches of the handshake never run. No runtime inputs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    version: ProtocolVersion,
    cipher_list: String,
    read_ahead: bool,
}

impl EngineConfig {
    /// Configuration pinned to exactly one protocol version.
    pub fn pinned(version: ProtocolVersion) -> Self {
        Self {
            version,
            cipher_list: DEFAULT_CIPHER_LIST.to_string(),
            read_ahead: true,
        }
    }

    /// Override the cipher suites offered to the engine.
    pub fn with_cipher_list(mut self, cipher_list: &str) -> Self {
        self.cipher_list = cipher_list.to_string();
        self
    }

    /// Minimum protocol version, equal to [`EngineConfig::max_version`].
    pub fn min_version(&self) -> u16 {
        self.version.wire_id()
    }

    /// Maximum protocol version, equal to [`EngineConfig::min_version`].
    pub fn max_version(&self) -> u16 {
        self.version.wire_id()
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn cipher_list(&self) -> &str {
        &self.cipher_list
    }

    /// Whether the engine should read whole datagrams ahead of record
    /// boundaries. Always set for datagram transports.
    pub fn read_ahead(&self) -> bool {
        self.read_ahead
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::pinned(ProtocolVersion::Dtls12)
    }
}
