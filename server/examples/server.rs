#[macro_use]
extern crate log;

use std::net::{Ipv4Addr, SocketAddrV4};

use futures::StreamExt;

use dhcp_framed::{bind, drive, Endpoint, TokioTimers, UdpTransport};
use dhcp_protocol::{InterfaceId, Ipv4Net, StaticInterfaces, PORT_SERVER};
use dhcp_server::{AddressPool, Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let server_address = std::env::args()
        .nth(1)
        .map(|address| address.parse())
        .transpose()?
        .unwrap_or_else(|| Ipv4Addr::new(192, 168, 0, 12));
    let mask = Ipv4Addr::new(255, 255, 255, 0);
    let interface = InterfaceId(0);

    let socket = bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, PORT_SERVER)).await?;
    let (timers, mut expiries) = TokioTimers::new();
    let interfaces = StaticInterfaces::new().with(interface, Ipv4Net::new(server_address, mask)?);

    let mut server = Server::new(
        ServerConfig::new(server_address),
        UdpTransport::new(socket.clone()),
        timers,
        interfaces,
    )?;
    let network = Ipv4Net::new(server_address, mask)?.network();
    let first = Ipv4Addr::from(u32::from(network) + 100);
    let last = Ipv4Addr::from(u32::from(network) + 200);
    server.add_pool(AddressPool::new(network, mask, first, last, Some(server_address))?)?;

    let mut events = server.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            info!("{}", event);
        }
    });

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for the interrupt: {}", error);
        }
    };
    drive(&mut server, vec![Endpoint::new(socket, interface)], &mut expiries, shutdown).await?;
    Ok(())
}
