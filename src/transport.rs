//! Client-role transport adaptation
//!
//! Wraps one caller-supplied byte source/sink as the engine's transport
//! plugin for a single logical connection. The adapter buffers nothing and
//! retries nothing: each call delegates synchronously to the source, and the
//! source's verdict is translated verbatim into the engine's retry/fatal
//! distinction.

use crate::engine::{CtrlOp, CtrlReply, PluginIo, TransportPlugin};
use crate::error::TransportError;

/// Caller-supplied bidirectional datagram source for one connection.
///
/// Implementations own every real transport concern: MTU, deadlines,
/// blocking behavior. A blocked `read` or `write` must return promptly once
/// `close` has been observed.
pub trait TransportSource: Send {
    /// Read one datagram into `buf`, returning the byte count.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write one datagram, returning the byte count accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError>;

    /// Release the transport. Called at most once.
    fn close(&mut self);
}

/// Engine-facing adapter over one exclusively-owned [`TransportSource`].
pub struct TransportAdapter {
    source: Option<Box<dyn TransportSource>>,
}

impl TransportAdapter {
    pub fn new(source: Box<dyn TransportSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Release the owned source. The first call reaches the source's
    /// `close`; repeated calls are no-ops. Reads and writes after close
    /// report fatal failure.
    pub fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
            tracing::debug!("Transport adapter closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    fn translate(result: Result<usize, TransportError>) -> PluginIo {
        match result {
            Ok(n) => PluginIo::Transferred(n),
            Err(TransportError::WouldBlock) => PluginIo::Retry,
            Err(err) => {
                tracing::debug!("Transport failure: {}", err);
                PluginIo::Fatal
            }
        }
    }
}

impl TransportPlugin for TransportAdapter {
    fn read(&mut self, buf: &mut [u8]) -> PluginIo {
        match self.source.as_mut() {
            Some(source) => Self::translate(source.read(buf)),
            None => PluginIo::Fatal,
        }
    }

    fn write(&mut self, buf: &[u8]) -> PluginIo {
        match self.source.as_mut() {
            Some(source) => Self::translate(source.write(buf)),
            None => PluginIo::Fatal,
        }
    }

    fn ctrl(&mut self, _op: CtrlOp) -> CtrlReply {
        CtrlReply::Unsupported
    }

    fn destroyed(&mut self) {
        self.close();
    }
}
