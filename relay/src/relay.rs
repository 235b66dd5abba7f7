//! The relay engine.

use std::{convert::Infallible, net::SocketAddrV4};

use dhcp_protocol::{
    Engine, InterfaceId, Interfaces, LeaseMessage, MessageType, Received, TimerHandle, Transport, BROADCAST,
};

use crate::{
    config::RelayConfig,
    error::Error,
    route::{RelayRoute, RoutingTable},
};

/// The relay engine.
///
/// Forwards through `N` and asks `I` which interface a datagram arrived on
/// and which interface owns a gateway.
pub struct Relay<N, I> {
    config: RelayConfig,
    transport: N,
    interfaces: I,
    routes: RoutingTable,
    running: bool,
}

impl<N, I> Relay<N, I>
where
    N: Transport,
    I: Interfaces,
{
    /// Creates a stopped relay without routes.
    ///
    /// # Errors
    /// The configuration is rejected.
    pub fn new(config: RelayConfig, transport: N, interfaces: I) -> Result<Self, Error> {
        config.validate()?;
        Ok(Relay {
            config,
            transport,
            interfaces,
            routes: RoutingTable::new(),
            running: false,
        })
    }

    /// Adds a client-facing subnet.
    ///
    /// # Errors
    /// The gateway is taken or the subnet overlaps an existing route.
    pub fn add_route(&mut self, route: RelayRoute) -> Result<(), Error> {
        self.routes.add(route)?;
        info!("Relaying {} via {}", route.subnet(), route.gateway());
        Ok(())
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Client to server: stamp the gateway of the receiving subnet and unicast to the server.
    fn forward_to_server(&mut self, mut message: LeaseMessage, datagram: &Received<'_>) {
        let local = match self.interfaces.address(datagram.interface) {
            Some(local) => local,
            None => {
                debug!("No address on {}, dropping {}", datagram.interface, message.message_type);
                return;
            }
        };
        let route = match self.routes.by_gateway(local.address()) {
            Some(route) => *route,
            None => {
                debug!("No route via {}, dropping {}", local.address(), message.message_type);
                return;
            }
        };
        if route.subnet().same_subnet(&self.config.server_side) {
            debug!("{} is on the server subnet, not relaying", route.subnet());
            return;
        }

        if message.gateway_address.is_none() {
            message.gateway_address = Some(route.gateway());
        }
        let destination = SocketAddrV4::new(self.config.server_address, self.config.server_port);
        let interface = self.interfaces.interface_with(self.config.server_side.address());
        self.send(&message, destination, interface);
    }

    /// Server to client: broadcast on the subnet named by the gateway.
    ///
    /// Only replies heard on the server side are forwarded, so the relay
    /// never picks up its own broadcasts again.
    fn forward_to_client(&mut self, message: LeaseMessage, datagram: &Received<'_>) {
        let server_side = self.interfaces.interface_with(self.config.server_side.address());
        if server_side != Some(datagram.interface) {
            debug!("{} arrived on the client side {}, dropping", message.message_type, datagram.interface);
            return;
        }
        let gateway = match message.gateway_address {
            Some(gateway) => gateway,
            None => {
                debug!("{} without a gateway address, dropping", message.message_type);
                return;
            }
        };
        if self.routes.by_gateway(gateway).is_none() {
            debug!("No route via {}, dropping {}", gateway, message.message_type);
            return;
        }
        let interface = match self.interfaces.interface_with(gateway) {
            Some(interface) => interface,
            None => {
                warn!("No interface owns the gateway {}", gateway);
                return;
            }
        };

        let destination = SocketAddrV4::new(BROADCAST, self.config.client_port);
        self.send(&message, destination, Some(interface));
    }

    fn send(&mut self, message: &LeaseMessage, destination: SocketAddrV4, interface: Option<InterfaceId>) {
        info!("Relaying {} to {}", message.message_type, destination);
        debug!("{}", message);
        if let Err(error) = self.transport.send(&message.encode(), destination, interface) {
            warn!("Socket error: {}", error);
        }
    }
}

impl<N, I> Engine for Relay<N, I>
where
    N: Transport,
    I: Interfaces,
{
    type Timer = Infallible;

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn handle_datagram(&mut self, datagram: Received<'_>) {
        if !self.running {
            return;
        }
        let message = match LeaseMessage::from_bytes(datagram.payload).and_then(|message| message.validate().map(|_| message)) {
            Ok(message) => message,
            Err(error) => {
                debug!("Dropped a datagram from {}: {}", datagram.source, error);
                return;
            }
        };
        debug!("Received {} from {} on port {}", message.message_type, datagram.source, datagram.local_port);

        match message.message_type {
            MessageType::Discover | MessageType::Request if datagram.local_port == self.config.server_port => {
                self.forward_to_server(message, &datagram)
            }
            MessageType::Offer | MessageType::Ack | MessageType::Nack if datagram.local_port == self.config.client_port => {
                self.forward_to_client(message, &datagram)
            }
            message_type => debug!("Ignoring {} on port {}", message_type, datagram.local_port),
        }
    }

    fn handle_timer(&mut self, _handle: TimerHandle, timer: Infallible) {
        match timer {}
    }
}
