#[macro_use]
extern crate log;

use std::net::{Ipv4Addr, SocketAddrV4};

use eui48::MacAddress;
use futures::StreamExt;

use dhcp_client::{Client, ClientConfig, MemoryHost};
use dhcp_framed::{bind, drive, Endpoint, TokioTimers, UdpTransport};
use dhcp_protocol::{ClientId, InterfaceId, PORT_CLIENT};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mac = match std::env::args().nth(1) {
        Some(mac) => MacAddress::parse_str(&mac)?,
        None => MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x07]),
    };

    let socket = bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, PORT_CLIENT)).await?;
    let (timers, mut expiries) = TokioTimers::new();
    let mut client = Client::new(
        ClientConfig::new(ClientId::from(mac)),
        UdpTransport::new(socket.clone()),
        timers,
        MemoryHost::new(),
    )?;

    let mut events = client.subscribe();
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
    drive(&mut client, vec![Endpoint::new(socket, InterfaceId(0))], &mut expiries, shutdown).await?;
    Ok(())
}
