//! Server-side session multiplexing
//!
//! One shared underlying channel serves many clients. Each inbound datagram
//! arrives with an opaque client identifier; the mux routes it to that
//! client's session, and each outbound write leaves tagged with the writing
//! session's identifier.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};

use crate::error::{MuxError, TransportError};
use crate::session::ServerSession;

/// Opaque routing token naming one concurrently active session.
///
/// Unique among registered sessions, stable for a session's lifetime, and
/// never handed out again while the session it names is still registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u32);

static NEXT_CLIENT_ID: AtomicU32 = AtomicU32::new(1);

impl ClientId {
    /// Allocate a fresh identifier, unique for the life of the process.
    pub fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Identifier recovered from the caller's own tagging scheme.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Caller-supplied shared outbound channel with identifier tagging.
///
/// The single byte sink all sessions of an endpoint write through; the
/// implementation tags each datagram with `id` however its wire protocol
/// requires.
pub trait TaggedSink: Send + Sync {
    fn send(&self, id: ClientId, datagram: &[u8]) -> Result<usize, TransportError>;
}

/// Most datagrams a stalled session may have queued before the mux starts
/// shedding load for it.
pub const INBOUND_QUEUE_LIMIT: usize = 64;

struct QueueState {
    datagrams: VecDeque<Vec<u8>>,
    closed: bool,
}

/// Per-session inbound datagram queue.
///
/// Dispatch pushes, the session's engine thread pops. Closing wakes any
/// blocked reader immediately.
pub(crate) struct InboundQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl InboundQueue {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                datagrams: VecDeque::new(),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Enqueue one datagram, returning false if the queue is closed.
    ///
    /// Never blocks: when the session's engine has stalled and the queue is
    /// full, the oldest datagram is shed instead. The transport is
    /// loss-tolerant and retransmission belongs to the engine.
    pub(crate) fn push(&self, datagram: Vec<u8>) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return false;
        }
        if state.datagrams.len() >= INBOUND_QUEUE_LIMIT {
            state.datagrams.pop_front();
            tracing::warn!("Inbound queue full, shedding oldest datagram");
        }
        state.datagrams.push_back(datagram);
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Block until a datagram arrives or the queue closes. `None` means
    /// closed.
    pub(crate) fn pop(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(datagram) = state.datagrams.pop_front() {
                return Some(datagram);
            }
            if state.closed {
                return None;
            }
            state = self.ready.wait(state).unwrap();
        }
    }

    /// Close the queue, discarding pending datagrams and waking all blocked
    /// readers.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.datagrams.clear();
        drop(state);
        self.ready.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

/// Identifier-to-session registry for one shared channel.
///
/// Register and remove are mutually exclusive with each other and with
/// lookups, but dispatch holds the registry lock only long enough to clone
/// the session handle; feeding a slow client's queue happens outside it,
/// so one stalled session never delays another's traffic.
pub struct SessionMux {
    sessions: RwLock<HashMap<ClientId, Arc<ServerSession>>>,
}

impl SessionMux {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session under its identifier.
    ///
    /// Fails with [`MuxError::DuplicateIdentifier`] when the identifier is
    /// taken; the existing entry is left untouched.
    pub fn register(&self, session: Arc<ServerSession>) -> Result<(), MuxError> {
        let id = session.id();
        let mut sessions = self.sessions.write().unwrap();
        match sessions.entry(id) {
            Entry::Occupied(_) => Err(MuxError::DuplicateIdentifier(id)),
            Entry::Vacant(slot) => {
                slot.insert(session);
                tracing::info!("Session registered: {}", id);
                Ok(())
            }
        }
    }

    /// Route one inbound datagram to the session registered under `id`.
    ///
    /// An unregistered identifier yields [`MuxError::UnknownSession`]; the
    /// caller decides whether that warrants starting a new handshake.
    pub fn dispatch(&self, id: ClientId, datagram: &[u8]) -> Result<(), MuxError> {
        let session = {
            let sessions = self.sessions.read().unwrap();
            sessions.get(&id).cloned()
        };

        let session = session.ok_or(MuxError::UnknownSession(id))?;
        if !session.push_inbound(datagram.to_vec()) {
            // Lost the race with remove(); the datagram is moot.
            tracing::trace!("Dropped datagram for closing session {}", id);
        }
        Ok(())
    }

    /// Deregister `id`, closing that session's inbound path and unblocking
    /// any in-progress read. Removing an absent identifier is a no-op.
    pub fn remove(&self, id: ClientId) {
        let removed = self.sessions.write().unwrap().remove(&id);
        if let Some(session) = removed {
            session.shutdown();
            tracing::info!("Session removed: {}", id);
        }
    }

    /// Look up the session registered under `id`.
    pub fn get(&self, id: ClientId) -> Option<Arc<ServerSession>> {
        self.sessions.read().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }
}

impl Default for SessionMux {
    fn default() -> Self {
        Self::new()
    }
}
