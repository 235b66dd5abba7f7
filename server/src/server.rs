//! Server module

use std::net::{Ipv4Addr, SocketAddrV4};

use dhcp_protocol::{
    ClientId, Engine, Interfaces, LeaseEvent, LeaseMessage, MessageType, Notifier, Received, TimerHandle, TimerSet,
    Timers, Transport, BROADCAST,
};
use futures::channel::mpsc;

use crate::{
    builder::{MessageBuilder, SubnetData},
    config::ServerConfig,
    error::Error,
    pool::AddressPool,
    storage::Storage,
};

/// The timers the server schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerTimer {
    /// Remove expired leases and offers.
    Sweep,
}

/// The server engine.
///
/// Talks through `N`, schedules on `T` and asks `I` about the interface a
/// request arrived on.
pub struct Server<N, T, I> {
    config: ServerConfig,
    transport: N,
    timers: T,
    interfaces: I,
    armed: TimerSet<ServerTimer>,
    builder: MessageBuilder,
    storage: Storage,
    notifier: Notifier,
    running: bool,
}

impl<N, T, I> Server<N, T, I>
where
    N: Transport,
    T: Timers<ServerTimer>,
    I: Interfaces,
{
    /// Creates a stopped server without pools.
    ///
    /// # Errors
    /// The timing configuration is rejected.
    pub fn new(config: ServerConfig, transport: N, timers: T, interfaces: I) -> Result<Self, Error> {
        config.validate()?;
        let builder = MessageBuilder::new(
            config.server_address,
            config.lease_seconds,
            config.renew_seconds,
            config.rebind_seconds,
        );
        Ok(Server {
            config,
            transport,
            timers,
            interfaces,
            armed: TimerSet::new(),
            builder,
            storage: Storage::new(),
            notifier: Notifier::new(),
            running: false,
        })
    }

    /// Adds a dynamic pool.
    ///
    /// # Errors
    /// The pool overlaps another pool or a static reservation, or contains
    /// the server address or its own router.
    pub fn add_pool(&mut self, pool: AddressPool) -> Result<(), Error> {
        if pool.contains(self.config.server_address) {
            return Err(Error::ReservedInPool(self.config.server_address));
        }
        if let Some(router) = pool.router().filter(|router| pool.contains(*router)) {
            return Err(Error::ReservedInPool(router));
        }
        self.storage.add_pool(pool)?;
        info!("Serving {}-{} on {}", pool.first(), pool.last(), pool.subnet());
        Ok(())
    }

    /// Reserves `address` for `client_id`.
    ///
    /// # Errors
    /// The address lies in a pool range or is reserved for another client.
    pub fn add_static_entry(&mut self, client_id: ClientId, address: Ipv4Addr) -> Result<(), Error> {
        self.storage.add_static(client_id, address)?;
        info!("Reserved {} for {}", address, client_id);
        Ok(())
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LeaseEvent> {
        self.notifier.subscribe()
    }

    /// The pool for a request, by the relay gateway or else by the receiving interface.
    fn select_pool(&self, request: &LeaseMessage, datagram: &Received<'_>) -> Option<AddressPool> {
        let key = match request.gateway_address {
            Some(gateway) => gateway,
            None => self.interfaces.address(datagram.interface)?.address(),
        };
        self.storage.pool_serving(key).copied()
    }

    /// The mask and router for `address`, from its pool or the receiving interface.
    fn subnet_data(&self, address: Ipv4Addr, pool: Option<&AddressPool>, datagram: &Received<'_>) -> SubnetData {
        match pool.filter(|pool| pool.serves(address)).or_else(|| self.storage.pool_serving(address)) {
            Some(pool) => SubnetData {
                mask: Some(pool.mask()),
                router: pool.router(),
            },
            None => SubnetData {
                mask: self.interfaces.address(datagram.interface).map(|net| net.mask()),
                router: None,
            },
        }
    }

    fn handle_discover(&mut self, discover: &LeaseMessage, datagram: &Received<'_>) {
        let pool = self.select_pool(discover, datagram);
        let now = self.timers.now();
        let address = match self
            .storage
            .offer(discover.client_id, pool.as_ref(), now, self.config.offer_timeout)
        {
            Some(address) => address,
            None => {
                match pool {
                    Some(pool) => warn!("The pool {}-{} has been exhausted", pool.first(), pool.last()),
                    None => warn!("No pool serves the request from {}", datagram.source),
                }
                return;
            }
        };

        let subnet = self.subnet_data(address, pool.as_ref(), datagram);
        let offer = self.builder.discover_to_offer(discover, address, subnet);
        self.reply(&offer, discover, datagram);
    }

    fn handle_request(&mut self, request: &LeaseMessage, datagram: &Received<'_>) {
        if let Some(server_id) = request.server_id {
            if server_id != self.config.server_address {
                if let Some(address) = self.storage.withdraw_offer(&request.client_id) {
                    info!("{} chose the server {}, withdrawing the offer of {}", request.client_id, server_id, address);
                }
                return;
            }
        }
        let requested = match request.requested_address {
            Some(address) => address,
            None => return,
        };

        let pool = self.select_pool(request, datagram);
        let now = self.timers.now();
        match self
            .storage
            .assign(request.client_id, requested, pool.as_ref(), now, self.config.lease_time())
        {
            Ok(assignment) => {
                let subnet = self.subnet_data(assignment.address, pool.as_ref(), datagram);
                let ack = self.builder.request_to_ack(request, assignment.address, subnet);
                self.reply(&ack, request, datagram);
                if let Some(replaced) = assignment.replaced {
                    self.notifier.notify(LeaseEvent::Expired(replaced));
                }
                if assignment.is_new {
                    info!("Leased {} to {}", assignment.address, request.client_id);
                    self.notifier.notify(LeaseEvent::Granted(assignment.address));
                }
            }
            Err(refusal) => {
                info!("Refusing {} to {}: {:?}", requested, request.client_id, refusal);
                let nack = self.builder.request_to_nack(request);
                self.reply(&nack, request, datagram);
            }
        }
    }

    /// Removes expired records and reports the expired leases.
    fn sweep(&mut self) {
        let now = self.timers.now();
        for address in self.storage.sweep(now) {
            info!("The lease of {} has expired", address);
            self.notifier.notify(LeaseEvent::Expired(address));
        }
    }

    /// Sends `response` to the relay, to the client's own address or to
    /// everyone on the receiving interface, in that order of preference.
    fn reply(&mut self, response: &LeaseMessage, request: &LeaseMessage, datagram: &Received<'_>) {
        let source = *datagram.source.ip();
        let destination = match request.gateway_address {
            Some(gateway) => SocketAddrV4::new(gateway, self.config.client_port),
            None if !source.is_unspecified() => SocketAddrV4::new(source, self.config.client_port),
            None => SocketAddrV4::new(BROADCAST, self.config.client_port),
        };

        log_send!(response, destination);
        if let Err(error) = self
            .transport
            .send(&response.encode(), destination, Some(datagram.interface))
        {
            warn!("Socket error: {}", error);
        }
    }
}

impl<N, T, I> Engine for Server<N, T, I>
where
    N: Transport,
    T: Timers<ServerTimer>,
    I: Interfaces,
{
    type Timer = ServerTimer;

    fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        info!("Server {} started", self.config.server_address);
        self.armed.arm(&mut self.timers, ServerTimer::Sweep, self.config.sweep_interval);
    }

    fn stop(&mut self) {
        self.running = false;
        self.armed.disarm_all(&mut self.timers);
        info!("Server {} stopped", self.config.server_address);
    }

    fn handle_datagram(&mut self, datagram: Received<'_>) {
        if !self.running || datagram.local_port != self.config.server_port {
            return;
        }

        let message = decode!(datagram);
        log_receive!(message, datagram.source);
        self.sweep();

        match message.message_type {
            MessageType::Discover => self.handle_discover(&message, &datagram),
            MessageType::Request => self.handle_request(&message, &datagram),
            message_type => debug!("Ignoring {} from {}", message_type, datagram.source),
        }
    }

    fn handle_timer(&mut self, handle: TimerHandle, timer: ServerTimer) {
        if !self.armed.fire(timer, handle) {
            return;
        }
        match timer {
            ServerTimer::Sweep => {
                self.sweep();
                self.armed.arm(&mut self.timers, ServerTimer::Sweep, self.config.sweep_interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dhcp_protocol::{
        testing::{ManualTimers, RecordingTransport},
        InterfaceId, Ipv4Net, StaticInterfaces, PORT_CLIENT, PORT_SERVER,
    };

    use super::*;

    type TestServer = Server<RecordingTransport, ManualTimers<ServerTimer>, StaticInterfaces>;

    const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

    fn setup() -> (TestServer, RecordingTransport, ManualTimers<ServerTimer>) {
        let transport = RecordingTransport::new();
        let timers = ManualTimers::new();
        let interfaces = StaticInterfaces::new().with(InterfaceId(1), Ipv4Net::new(SERVER, MASK).unwrap());
        let mut server = Server::new(ServerConfig::new(SERVER), transport.clone(), timers.clone(), interfaces).unwrap();
        server
            .add_pool(
                AddressPool::new(
                    Ipv4Addr::new(10, 0, 0, 0),
                    MASK,
                    Ipv4Addr::new(10, 0, 0, 10),
                    Ipv4Addr::new(10, 0, 0, 15),
                    None,
                )
                .unwrap(),
            )
            .unwrap();
        server.start();
        (server, transport, timers)
    }

    fn client(id: u8) -> ClientId {
        ClientId::from_slice(&[0x02, 0, 0, 0, 0, id])
    }

    fn discover(id: u8) -> LeaseMessage {
        LeaseMessage::new(MessageType::Discover, u32::from(id), client(id))
    }

    fn request(id: u8, address: Ipv4Addr, server_id: Option<Ipv4Addr>) -> LeaseMessage {
        let mut message = LeaseMessage::new(MessageType::Request, u32::from(id), client(id));
        message.requested_address = Some(address);
        message.server_id = server_id;
        message
    }

    fn deliver_from(server: &mut TestServer, message: &LeaseMessage, source: Ipv4Addr) {
        let payload = message.encode();
        server.handle_datagram(Received {
            payload: &payload,
            source: SocketAddrV4::new(source, PORT_CLIENT),
            local_port: PORT_SERVER,
            interface: InterfaceId(1),
        });
    }

    fn deliver(server: &mut TestServer, message: &LeaseMessage) {
        deliver_from(server, message, Ipv4Addr::UNSPECIFIED);
    }

    fn answer(transport: &RecordingTransport) -> (LeaseMessage, SocketAddrV4) {
        let mut sent = transport.take();
        assert_eq!(sent.len(), 1);
        let sent = sent.remove(0);
        (sent.message().unwrap(), sent.destination)
    }

    #[test]
    fn offers_lowest_free_address_by_broadcast() {
        let (mut server, transport, _) = setup();
        deliver(&mut server, &discover(1));

        let (offer, destination) = answer(&transport);
        assert_eq!(offer.message_type, MessageType::Offer);
        assert_eq!(offer.offered_address, Some(Ipv4Addr::new(10, 0, 0, 10)));
        assert_eq!(offer.subnet_mask, Some(MASK));
        assert_eq!(offer.server_id, Some(SERVER));
        assert_eq!(offer.transaction_id, 1);
        assert_eq!(destination, SocketAddrV4::new(BROADCAST, PORT_CLIENT));
    }

    #[test]
    fn acks_and_emits_granted() {
        let (mut server, transport, _) = setup();
        let mut events = server.subscribe();
        deliver(&mut server, &discover(1));
        transport.take();

        deliver(&mut server, &request(1, Ipv4Addr::new(10, 0, 0, 10), Some(SERVER)));
        let (ack, _) = answer(&transport);
        assert_eq!(ack.message_type, MessageType::Ack);
        assert_eq!((ack.renew_seconds, ack.rebind_seconds, ack.lease_seconds), (15, 25, 30));
        assert_eq!(
            events.try_next().unwrap(),
            Some(LeaseEvent::Granted(Ipv4Addr::new(10, 0, 0, 10)))
        );
        assert_eq!(server.storage().owner(Ipv4Addr::new(10, 0, 0, 10)), Some(client(1)));
    }

    #[test]
    fn repeated_request_is_acked_again() {
        let (mut server, transport, _) = setup();
        let mut events = server.subscribe();
        deliver(&mut server, &request(1, Ipv4Addr::new(10, 0, 0, 12), Some(SERVER)));
        deliver_from(&mut server, &request(1, Ipv4Addr::new(10, 0, 0, 12), None), Ipv4Addr::new(10, 0, 0, 12));

        let sent = transport.take();
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|sent| sent.message().unwrap().message_type == MessageType::Ack));
        // the renewal is unicast to the client's address
        assert_eq!(sent[1].destination, SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 12), PORT_CLIENT));
        events.try_next().unwrap();
        assert!(events.try_next().is_err());
    }

    #[test]
    fn nacks_foreign_and_out_of_range_addresses() {
        let (mut server, transport, _) = setup();
        deliver(&mut server, &request(1, Ipv4Addr::new(10, 0, 0, 10), Some(SERVER)));
        transport.take();

        deliver(&mut server, &request(2, Ipv4Addr::new(10, 0, 0, 10), Some(SERVER)));
        let (nack, _) = answer(&transport);
        assert_eq!(nack.message_type, MessageType::Nack);

        deliver(&mut server, &request(2, Ipv4Addr::new(10, 0, 0, 99), Some(SERVER)));
        assert_eq!(answer(&transport).0.message_type, MessageType::Nack);
    }

    #[test]
    fn stays_silent_when_another_server_was_chosen() {
        let (mut server, transport, _) = setup();
        deliver(&mut server, &discover(1));
        transport.take();

        deliver(&mut server, &request(1, Ipv4Addr::new(10, 0, 0, 10), Some(Ipv4Addr::new(10, 0, 0, 2))));
        assert!(transport.is_empty());
        assert!(server.storage().lease(&client(1)).is_none());
    }

    #[test]
    fn exhausted_pool_stays_silent() {
        let (mut server, transport, _) = setup();
        for id in 1..=6 {
            deliver(&mut server, &discover(id));
        }
        assert_eq!(transport.take().len(), 6);
        deliver(&mut server, &discover(7));
        assert!(transport.is_empty());
    }

    #[test]
    fn static_reservation_is_offered() {
        let (mut server, transport, _) = setup();
        server.add_static_entry(client(1), Ipv4Addr::new(10, 0, 0, 100)).unwrap();
        deliver(&mut server, &discover(1));
        let (offer, _) = answer(&transport);
        assert_eq!(offer.offered_address, Some(Ipv4Addr::new(10, 0, 0, 100)));
        assert_eq!(offer.subnet_mask, Some(MASK));
    }

    #[test]
    fn replies_to_relay_gateway() {
        let (mut server, transport, _) = setup();
        server
            .add_pool(
                AddressPool::new(
                    Ipv4Addr::new(172, 30, 0, 0),
                    MASK,
                    Ipv4Addr::new(172, 30, 0, 10),
                    Ipv4Addr::new(172, 30, 0, 20),
                    Some(Ipv4Addr::new(172, 30, 0, 1)),
                )
                .unwrap(),
            )
            .unwrap();
        let mut relayed = discover(1);
        relayed.gateway_address = Some(Ipv4Addr::new(172, 30, 0, 1));
        deliver_from(&mut server, &relayed, Ipv4Addr::new(10, 0, 0, 254));

        let (offer, destination) = answer(&transport);
        assert_eq!(offer.offered_address, Some(Ipv4Addr::new(172, 30, 0, 10)));
        assert_eq!(offer.router, Some(Ipv4Addr::new(172, 30, 0, 1)));
        assert_eq!(offer.gateway_address, Some(Ipv4Addr::new(172, 30, 0, 1)));
        assert_eq!(destination, SocketAddrV4::new(Ipv4Addr::new(172, 30, 0, 1), PORT_CLIENT));
    }

    #[test]
    fn sweep_expires_leases() {
        let (mut server, transport, timers) = setup();
        let mut events = server.subscribe();
        deliver(&mut server, &request(1, Ipv4Addr::new(10, 0, 0, 10), Some(SERVER)));
        transport.take();
        events.try_next().unwrap();

        let until = timers.now() + Duration::from_secs(30);
        while let Some((handle, timer)) = timers.pop_due(until) {
            server.handle_timer(handle, timer);
        }
        assert_eq!(
            events.try_next().unwrap(),
            Some(LeaseEvent::Expired(Ipv4Addr::new(10, 0, 0, 10)))
        );
        assert!(server.storage().lease(&client(1)).is_none());
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn rejects_pool_containing_server_address() {
        let (mut server, _, _) = setup();
        let pool = AddressPool::new(
            Ipv4Addr::new(10, 0, 0, 0),
            MASK,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 5),
            None,
        )
        .unwrap();
        assert_eq!(server.add_pool(pool), Err(Error::ReservedInPool(SERVER)));
    }
}
