//! The event loop running one engine.

use std::{
    future::Future,
    io,
    net::{SocketAddr, SocketAddrV4},
    sync::Arc,
    time::Duration,
};

use tokio::{net::UdpSocket, sync::mpsc};

use dhcp_protocol::{Engine, InterfaceId, Received};

use crate::{socket::BUFFER_READ_CAPACITY, timers::TimerReceiver};

/// Pause after a failed receive so a broken socket cannot spin.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A socket the engine listens on and the interface it stands for.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub socket: Arc<UdpSocket>,
    pub interface: InterfaceId,
}

impl Endpoint {
    pub fn new(socket: Arc<UdpSocket>, interface: InterfaceId) -> Self {
        Endpoint { socket, interface }
    }
}

struct Datagram {
    payload: Vec<u8>,
    source: SocketAddrV4,
    local_port: u16,
    interface: InterfaceId,
}

/// How long to wait before reading again after `error`.
fn backoff(error: &io::Error) -> Option<Duration> {
    match error.kind() {
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => None,
        _ => Some(RECV_ERROR_BACKOFF),
    }
}

/// Reads `endpoint` until the driver goes away.
async fn listen(endpoint: Endpoint, local_port: u16, sender: mpsc::UnboundedSender<Datagram>) {
    let mut buffer = vec![0u8; BUFFER_READ_CAPACITY];
    loop {
        let (amount, source) = match endpoint.socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(error) => {
                if let Some(pause) = backoff(&error) {
                    warn!("Socket error on {}: {}", endpoint.interface, error);
                    tokio::time::sleep(pause).await;
                }
                continue;
            }
        };
        let source = match source {
            SocketAddr::V4(source) => source,
            SocketAddr::V6(source) => {
                debug!("Ignoring an IPv6 datagram from {}", source);
                continue;
            }
        };
        let datagram = Datagram {
            payload: buffer[..amount].to_vec(),
            source,
            local_port,
            interface: endpoint.interface,
        };
        if sender.send(datagram).is_err() {
            break;
        }
    }
}

/// Starts `engine` and feeds it datagrams from `endpoints` and expiries from
/// `timers` until `shutdown` completes, then stops it.
///
/// Events are handled one at a time, so the engine needs no locking.
///
/// # Errors
/// `io::Error` if an endpoint socket has no local address.
pub async fn drive<E, S>(
    engine: &mut E,
    endpoints: Vec<Endpoint>,
    timers: &mut TimerReceiver<E::Timer>,
    shutdown: S,
) -> io::Result<()>
where
    E: Engine,
    S: Future<Output = ()>,
{
    let (sender, mut datagrams) = mpsc::unbounded_channel();
    let mut listeners = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        let local_port = endpoint.socket.local_addr()?.port();
        info!("Listening on port {} for {}", local_port, endpoint.interface);
        listeners.push(tokio::spawn(listen(endpoint, local_port, sender.clone())));
    }
    drop(sender);

    engine.start();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(datagram) = datagrams.recv() => {
                engine.handle_datagram(Received {
                    payload: &datagram.payload,
                    source: datagram.source,
                    local_port: datagram.local_port,
                    interface: datagram.interface,
                });
            },
            Some((handle, timer)) = timers.recv() => engine.handle_timer(handle, timer),
            else => break,
        }
    }
    engine.stop();

    for listener in listeners {
        listener.abort();
    }
    Ok(())
}
