//! The UDP transport.

use std::{
    collections::HashMap,
    io,
    net::{SocketAddr, SocketAddrV4},
    sync::Arc,
};

use tokio::net::UdpSocket;

use dhcp_protocol::{InterfaceId, Transport};

/// Must be enough to decode a message with trailing garbage.
pub const BUFFER_READ_CAPACITY: usize = 1500;

/// Binds a broadcast-capable UDP socket.
///
/// # Errors
/// `io::Error` on unsuccessful socket building or binding.
pub async fn bind(address: SocketAddrV4) -> io::Result<Arc<UdpSocket>> {
    let socket = UdpSocket::bind(SocketAddr::V4(address)).await?;
    socket.set_broadcast(true)?;
    Ok(Arc::new(socket))
}

/// Sends through per-interface sockets, falling back to a default one.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    default: Arc<UdpSocket>,
    by_interface: HashMap<InterfaceId, Arc<UdpSocket>>,
}

impl UdpTransport {
    pub fn new(default: Arc<UdpSocket>) -> Self {
        UdpTransport {
            default,
            by_interface: HashMap::new(),
        }
    }

    /// Sends datagrams for `interface` through `socket`.
    pub fn with_interface(mut self, interface: InterfaceId, socket: Arc<UdpSocket>) -> Self {
        self.by_interface.insert(interface, socket);
        self
    }

    fn socket(&self, interface: Option<InterfaceId>) -> &UdpSocket {
        interface
            .and_then(|interface| self.by_interface.get(&interface))
            .unwrap_or(&self.default)
    }
}

impl Transport for UdpTransport {
    /// Sends without waiting. A full socket buffer is reported as `WouldBlock`.
    fn send(&mut self, payload: &[u8], destination: SocketAddrV4, interface: Option<InterfaceId>) -> io::Result<()> {
        let sent = self.socket(interface).try_send_to(payload, SocketAddr::V4(destination))?;
        if sent != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "Failed to write entire datagram to socket",
            ));
        }
        Ok(())
    }
}
