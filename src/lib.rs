//! remora-dtls - transport and credential bridging for a DTLS engine
//!
//! Lets a DTLS engine run over an arbitrary caller-supplied transport
//! instead of a native socket, with peer authentication resolved through a
//! caller-supplied pre-shared-key source. The engine itself (handshake
//! state machine, record-layer cryptography) is an external collaborator;
//! this crate supplies the plugin surface it drives.
//!
//! # Features
//!
//! - Client role: [`Connector::open`] wraps one transport as a [`Connection`]
//! - Server role: [`ServerEndpoint`] multiplexes many clients over one
//!   shared channel, keyed by [`ClientId`]
//! - Stateless anti-spoofing cookies ([`CookieAuthority`]) with rotating
//!   secrets and a verification grace window
//! - PSK resolution through caller capability traits, client and server role
//! - Negotiation pinned to a single protocol version ([`EngineConfig`])
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use remora_dtls::{
//!     ClientId, EngineConfig, PskSecret, PskTable, ServerEndpoint, TaggedSink, TransportError,
//! };
//!
//! struct SharedChannel;
//!
//! impl TaggedSink for SharedChannel {
//!     fn send(&self, id: ClientId, datagram: &[u8]) -> Result<usize, TransportError> {
//!         // hand the datagram to the real shared socket, tagged with `id`
//!         Ok(datagram.len())
//!     }
//! }
//!
//! let mut table = PskTable::new();
//! table.insert(b"device-1".to_vec(), PskSecret::new(b"s3cret".to_vec()));
//!
//! let endpoint = ServerEndpoint::new(
//!     EngineConfig::default(),
//!     Arc::new(table),
//!     Arc::new(SharedChannel),
//! );
//!
//! let id = ClientId::next();
//! let session = endpoint.open_session(id)?;
//! endpoint.dispatch(id, b"first datagram from this client")?;
//! # Ok::<(), remora_dtls::MuxError>(())
//! ```

pub mod connection;
pub mod cookie;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod mux;
pub mod session;
pub mod transport;

pub use connection::{Connection, Connector};
pub use cookie::{ClientIdentity, Cookie, CookieAuthority};
pub use credentials::{
    ClientCredentialSource, PskCredential, PskSecret, PskTable, ServerCredentialSource, StaticPsk,
};
pub use engine::{CtrlOp, CtrlReply, EngineConfig, PluginIo, ProtocolVersion, TransportPlugin};
pub use error::{
    CookieError, CredentialError, MuxError, RemoraError, Result, TransportError,
};
pub use mux::{ClientId, SessionMux, TaggedSink};
pub use session::{ServerEndpoint, ServerSession};
pub use transport::{TransportAdapter, TransportSource};
