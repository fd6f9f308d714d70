//! Diagnostic mirroring of raw frames to a secondary unreliable channel.

use std::fmt;
use std::io;
use std::net::{SocketAddr, UdpSocket};

use tracing::debug;

/// Which way a mirrored frame travelled on the primary link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Frame written to the link.
    Outbound,
    /// Frame decoded from the link.
    Inbound,
}

/// Receives a verbatim copy of every frame the engine sends or accepts.
///
/// Called with the engine state lock held; must not block for long.
pub trait FrameMirror: Send + Sync {
    /// Observe one raw frame, sync byte through checksum.
    fn mirror(&self, direction: Direction, frame: &[u8]);
}

/// UDP mirror configuration.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Local address to bind the mirror socket to.
    pub bind: SocketAddr,
    /// Destination for outbound frames.
    pub outbound_target: SocketAddr,
    /// Destination for inbound frames.
    pub inbound_target: SocketAddr,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            outbound_target: SocketAddr::from(([127, 0, 0, 1], 9000)),
            inbound_target: SocketAddr::from(([127, 0, 0, 1], 9001)),
        }
    }
}

/// Mirror that forwards each frame as one UDP datagram.
///
/// The socket is non-blocking; datagrams that cannot be sent immediately are
/// dropped.
pub struct UdpMirror {
    socket: UdpSocket,
    config: MirrorConfig,
}

impl UdpMirror {
    /// Bind the mirror socket.
    pub fn bind(config: MirrorConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind(config.bind)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, config })
    }

    /// Access the local address of the mirror socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl FrameMirror for UdpMirror {
    fn mirror(&self, direction: Direction, frame: &[u8]) {
        let target = match direction {
            Direction::Outbound => self.config.outbound_target,
            Direction::Inbound => self.config.inbound_target,
        };
        if let Err(err) = self.socket.send_to(frame, target) {
            debug!(error = %err, ?direction, %target, "mirror datagram dropped");
        }
    }
}

impl fmt::Debug for UdpMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpMirror")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
