//! The client engine.

use std::{
    collections::VecDeque,
    net::{Ipv4Addr, SocketAddrV4},
    time::{Duration, Instant},
};

use dhcp_protocol::{
    Engine, LeaseEvent, LeaseMessage, MessageType, Notifier, Received, TimerHandle, TimerSet, Timers, Transport,
    BROADCAST,
};
use futures::channel::mpsc;

use crate::{
    builder::MessageBuilder,
    config::ClientConfig,
    error::Error,
    stack::HostInterface,
    state::State,
};

/// The timers the client schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientTimer {
    /// No OFFER arrived in time, discover again.
    Discover,
    /// The OFFER collection window is over.
    Collect,
    /// No answer to a REQUEST, try the next OFFER.
    NextOffer,
    Renew,
    Rebind,
    Expire,
}

/// An OFFER waiting to be requested.
#[derive(Debug, Clone, Copy)]
struct Offer {
    address: Ipv4Addr,
    server_id: Ipv4Addr,
    mask: Option<Ipv4Addr>,
    router: Option<Ipv4Addr>,
    source: Ipv4Addr,
}

/// The lease the client holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub address: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub server_id: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub lease: Duration,
    pub renew: Duration,
    pub rebind: Duration,
    pub acquired_at: Instant,
}

/// The client engine.
///
/// Talks through `N`, schedules on `T` and installs leases into `H`.
pub struct Client<N, T, H> {
    config: ClientConfig,
    transport: N,
    timers: T,
    host: H,
    armed: TimerSet<ClientTimer>,
    builder: MessageBuilder,
    notifier: Notifier,

    state: State,
    running: bool,
    link_up: bool,
    transaction_id: u32,
    started_at: Instant,
    offers: VecDeque<Offer>,
    chosen: Option<Offer>,
    binding: Option<Binding>,
}

impl<N, T, H> Client<N, T, H>
where
    N: Transport,
    T: Timers<ClientTimer>,
    H: HostInterface,
{
    /// Creates a stopped client with the link up.
    ///
    /// # Errors
    /// The configuration is rejected.
    pub fn new(config: ClientConfig, transport: N, timers: T, host: H) -> Result<Self, Error> {
        config.validate()?;
        let started_at = timers.now();
        Ok(Client {
            builder: MessageBuilder::new(config.client_id),
            config,
            transport,
            timers,
            host,
            armed: TimerSet::new(),
            notifier: Notifier::new(),

            state: State::Init,
            running: false,
            link_up: true,
            transaction_id: 0,
            started_at,
            offers: VecDeque::new(),
            chosen: None,
            binding: None,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn transaction_id(&self) -> u32 {
        self.transaction_id
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LeaseEvent> {
        self.notifier.subscribe()
    }

    /// The link went down: forget everything and wait for it to come back.
    pub fn link_down(&mut self) {
        info!("Link down");
        self.link_up = false;
        self.armed.disarm_all(&mut self.timers);
        self.offers.clear();
        self.chosen = None;
        self.uninstall();
        self.binding = None;
        if self.running {
            self.state = State::Suspended;
        }
    }

    /// The link came back: negotiate from scratch.
    pub fn link_up(&mut self) {
        info!("Link up");
        self.link_up = true;
        if self.running {
            self.boot();
        }
    }

    /// Starts a fresh negotiation attempt with a new transaction ID.
    fn boot(&mut self) {
        self.armed.disarm_all(&mut self.timers);
        self.transaction_id = rand::random();
        self.started_at = self.timers.now();
        self.offers.clear();
        self.chosen = None;

        let discover = self.builder.discover(self.transaction_id, 0);
        self.send(&discover, SocketAddrV4::new(BROADCAST, self.config.server_port));
        self.state = State::Selecting;
        self.armed.arm(&mut self.timers, ClientTimer::Discover, self.config.retransmit);
    }

    /// Requests the oldest buffered OFFER, or starts over if there is none.
    fn select(&mut self) {
        let offer = match self.offers.pop_front() {
            Some(offer) => offer,
            None => {
                debug!("No offers left, discovering again");
                self.boot();
                return;
            }
        };

        let request = self.builder.request(
            self.transaction_id,
            self.timestamp(),
            offer.address,
            Some(offer.server_id),
        );
        self.send(&request, SocketAddrV4::new(BROADCAST, self.config.server_port));
        self.chosen = Some(offer);
        self.state = State::Requesting;
        self.armed.arm(&mut self.timers, ClientTimer::NextOffer, self.config.re_request);
    }

    /// Asks the leasing server directly to extend the lease.
    fn renew(&mut self) {
        let binding = match self.binding {
            Some(binding) => binding,
            None => return,
        };
        self.transaction_id = rand::random();
        self.started_at = self.timers.now();
        let request = self.builder.request(self.transaction_id, 0, binding.address, Some(binding.server_id));
        self.send(&request, SocketAddrV4::new(binding.server_id, self.config.server_port));
        self.state = State::Renewing;
    }

    /// Asks any server to extend the lease.
    fn rebind(&mut self) {
        let binding = match self.binding {
            Some(binding) => binding,
            None => return,
        };
        let request = self.builder.request(
            self.transaction_id,
            self.timestamp(),
            binding.address,
            Some(binding.server_id),
        );
        self.send(&request, SocketAddrV4::new(BROADCAST, self.config.server_port));
        self.state = State::Rebinding;
    }

    fn expire(&mut self) {
        if let Some(binding) = self.binding {
            info!("Lease of {} expired", binding.address);
            self.release(binding);
        }
        self.boot();
    }

    fn handle_offer(&mut self, message: &LeaseMessage, source: Ipv4Addr) {
        if self.state != State::Selecting {
            debug!("Ignoring an OFFER in state {}", self.state);
            return;
        }
        let (address, server_id) = match (message.offered_address, message.server_id) {
            (Some(address), Some(server_id)) => (address, server_id),
            _ => return,
        };

        self.offers.push_back(Offer {
            address,
            server_id,
            mask: message.subnet_mask,
            router: message.router,
            source,
        });
        if !self.armed.is_armed(ClientTimer::Collect) {
            self.armed.disarm(&mut self.timers, ClientTimer::Discover);
            self.armed.arm(&mut self.timers, ClientTimer::Collect, self.config.collect);
        }
    }

    fn handle_ack(&mut self, message: &LeaseMessage, source: Ipv4Addr) {
        let (address, server_id) = match (message.offered_address, message.server_id) {
            (Some(address), Some(server_id)) => (address, server_id),
            _ => return,
        };
        self.armed.disarm_all(&mut self.timers);

        let chosen = self.chosen.take();
        let mask = message
            .subnet_mask
            .or_else(|| chosen.and_then(|offer| offer.mask))
            .unwrap_or(BROADCAST);
        let gateway = message
            .router
            .or_else(|| chosen.and_then(|offer| offer.router))
            .or_else(|| chosen.map(|offer| offer.source))
            .or_else(|| self.binding.map(|binding| binding.gateway))
            .or_else(|| Some(source).filter(|source| !source.is_unspecified()))
            .unwrap_or(server_id);

        let binding = Binding {
            address,
            mask,
            server_id,
            gateway,
            lease: Duration::from_secs(u64::from(message.lease_seconds)),
            renew: Duration::from_secs(u64::from(message.renew_seconds)),
            rebind: Duration::from_secs(u64::from(message.rebind_seconds)),
            acquired_at: self.timers.now(),
        };
        self.install(binding);

        self.offers.clear();
        self.state = State::Bound;
        self.armed.arm(&mut self.timers, ClientTimer::Renew, binding.renew);
        self.armed.arm(&mut self.timers, ClientTimer::Rebind, binding.rebind);
        self.armed.arm(&mut self.timers, ClientTimer::Expire, binding.lease);
        info!(
            "Bound to {}/{} via {} for {} seconds",
            binding.address,
            binding.mask,
            binding.gateway,
            message.lease_seconds
        );
    }

    fn handle_nack(&mut self) {
        info!("Got NACK in state {}, starting over", self.state);
        if let Some(binding) = self.binding {
            self.release(binding);
        }
        self.boot();
    }

    /// Applies a new or refreshed binding to the host.
    fn install(&mut self, binding: Binding) {
        let previous = self.binding.replace(binding);

        match previous {
            Some(previous) if previous.address == binding.address && previous.mask == binding.mask => {}
            Some(previous) => {
                if let Err(error) = self.host.remove_address(previous.address) {
                    warn!("Unable to remove address {}: {}", previous.address, error);
                }
                self.add_address(binding);
            }
            None => self.add_address(binding),
        }

        match previous {
            Some(previous) if previous.gateway == binding.gateway => {}
            Some(previous) => {
                if let Err(error) = self.host.remove_default_route(previous.gateway) {
                    warn!("Unable to remove the route via {}: {}", previous.gateway, error);
                }
                self.set_default_route(binding.gateway);
            }
            None => self.set_default_route(binding.gateway),
        }

        match previous {
            Some(previous) if previous.address == binding.address => {}
            Some(previous) => {
                self.notifier.notify(LeaseEvent::Granted(binding.address));
                self.notifier.notify(LeaseEvent::Expired(previous.address));
            }
            None => self.notifier.notify(LeaseEvent::Granted(binding.address)),
        }
    }

    fn add_address(&mut self, binding: Binding) {
        if let Err(error) = self.host.add_address(binding.address, binding.mask) {
            warn!("Unable to add address {}: {}", binding.address, error);
        }
    }

    fn set_default_route(&mut self, gateway: Ipv4Addr) {
        if let Err(error) = self.host.set_default_route(gateway) {
            warn!("Unable to set the route via {}: {}", gateway, error);
        }
    }

    /// Drops the binding and reports it expired.
    fn release(&mut self, binding: Binding) {
        self.uninstall();
        self.binding = None;
        self.notifier.notify(LeaseEvent::Expired(binding.address));
    }

    /// Removes the held address and route from the host without reporting it.
    fn uninstall(&mut self) {
        if let Some(binding) = self.binding {
            if let Err(error) = self.host.remove_address(binding.address) {
                warn!("Unable to remove address {}: {}", binding.address, error);
            }
            if let Err(error) = self.host.remove_default_route(binding.gateway) {
                warn!("Unable to remove the route via {}: {}", binding.gateway, error);
            }
        }
    }

    fn timestamp(&self) -> u32 {
        self.timers.now().saturating_duration_since(self.started_at).as_secs() as u32
    }

    fn send(&mut self, message: &LeaseMessage, destination: SocketAddrV4) {
        log_send!(message, destination);
        if let Err(error) = self.transport.send(&message.encode(), destination, None) {
            warn!("Socket error: {}", error);
        }
    }
}

impl<N, T, H> Engine for Client<N, T, H>
where
    N: Transport,
    T: Timers<ClientTimer>,
    H: HostInterface,
{
    type Timer = ClientTimer;

    fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        if self.link_up {
            self.boot();
        } else {
            self.state = State::Suspended;
        }
    }

    fn stop(&mut self) {
        self.running = false;
        self.armed.disarm_all(&mut self.timers);
        self.offers.clear();
        self.chosen = None;
        self.uninstall();
        self.binding = None;
        self.state = State::Init;
    }

    fn handle_datagram(&mut self, datagram: Received<'_>) {
        if !self.running || !self.link_up {
            return;
        }
        if datagram.local_port != self.config.client_port {
            return;
        }

        let message = decode!(datagram);
        if message.client_id != self.config.client_id {
            return;
        }
        log_receive!(message, datagram.source);
        check_xid!(self.transaction_id, message.transaction_id);

        let source = *datagram.source.ip();
        match message.message_type {
            MessageType::Offer => self.handle_offer(&message, source),
            MessageType::Ack if self.state.awaits_answer() => self.handle_ack(&message, source),
            MessageType::Nack if self.state.awaits_answer() => self.handle_nack(),
            message_type => debug!("Ignoring {} in state {}", message_type, self.state),
        }
    }

    fn handle_timer(&mut self, handle: TimerHandle, timer: ClientTimer) {
        if !self.armed.fire(timer, handle) {
            trace!("Ignoring a stale {:?} timer {}", timer, handle);
            return;
        }
        debug!("Timer {:?} fired in state {}", timer, self.state);

        match timer {
            ClientTimer::Discover => self.boot(),
            ClientTimer::Collect | ClientTimer::NextOffer => self.select(),
            ClientTimer::Renew => self.renew(),
            ClientTimer::Rebind => self.rebind(),
            ClientTimer::Expire => self.expire(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use dhcp_protocol::{
        testing::{ManualTimers, RecordingTransport},
        ClientId, InterfaceId, PORT_CLIENT, PORT_SERVER,
    };

    use super::*;
    use crate::stack::MemoryHost;

    type TestClient = Client<RecordingTransport, ManualTimers<ClientTimer>, MemoryHost>;

    const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    fn client_id() -> ClientId {
        ClientId::from_slice(&[0x02, 0, 0, 0, 0, 0x01])
    }

    fn setup() -> (TestClient, RecordingTransport, ManualTimers<ClientTimer>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let transport = RecordingTransport::new();
        let timers = ManualTimers::new();
        let client = Client::new(
            ClientConfig::new(client_id()),
            transport.clone(),
            timers.clone(),
            MemoryHost::new(),
        )
        .unwrap();
        (client, transport, timers)
    }

    fn reply(client: &TestClient, message_type: MessageType, address: Ipv4Addr) -> LeaseMessage {
        let mut message = LeaseMessage::new(message_type, client.transaction_id(), client_id());
        message.server_id = Some(SERVER);
        if message_type != MessageType::Nack {
            message.offered_address = Some(address);
            message.subnet_mask = Some(Ipv4Addr::new(255, 255, 255, 0));
        }
        message.lease_seconds = 30;
        message.renew_seconds = 15;
        message.rebind_seconds = 25;
        message
    }

    fn deliver(client: &mut TestClient, message: &LeaseMessage) {
        let payload = message.encode();
        client.handle_datagram(Received {
            payload: &payload,
            source: SocketAddrV4::new(SERVER, PORT_SERVER),
            local_port: PORT_CLIENT,
            interface: InterfaceId(0),
        });
    }

    /// Fires every timer due within `delay` from now.
    fn run_for(client: &mut TestClient, timers: &ManualTimers<ClientTimer>, delay: Duration) {
        let until = timers.now() + delay;
        while let Some((handle, timer)) = timers.pop_due(until) {
            client.handle_timer(handle, timer);
        }
        timers.advance_to(until);
    }

    fn bind(client: &mut TestClient, transport: &RecordingTransport, timers: &ManualTimers<ClientTimer>) {
        client.start();
        transport.take();
        let offer = reply(client, MessageType::Offer, Ipv4Addr::new(10, 0, 0, 10));
        deliver(client, &offer);
        run_for(client, timers, Duration::from_secs(5));
        transport.take();
        let ack = reply(client, MessageType::Ack, Ipv4Addr::new(10, 0, 0, 10));
        deliver(client, &ack);
    }

    #[test]
    fn start_broadcasts_discover() {
        let (mut client, transport, _) = setup();
        client.start();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, SocketAddrV4::new(BROADCAST, PORT_SERVER));
        let discover = sent[0].message().unwrap();
        assert_eq!(discover.message_type, MessageType::Discover);
        assert_eq!(discover.transaction_id, client.transaction_id());
        assert_eq!(client.state(), State::Selecting);
    }

    #[test]
    fn retransmits_with_fresh_transaction() {
        let (mut client, transport, timers) = setup();
        client.start();
        transport.take();

        run_for(&mut client, &timers, Duration::from_secs(5));
        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        let second = sent[0].message().unwrap();
        assert_eq!(second.message_type, MessageType::Discover);
        assert_eq!(second.transaction_id, client.transaction_id());
        assert_eq!(client.state(), State::Selecting);
    }

    #[test]
    fn collects_offers_then_requests_the_first() {
        let (mut client, transport, timers) = setup();
        client.start();
        transport.take();

        let offer = reply(&client, MessageType::Offer, Ipv4Addr::new(10, 0, 0, 10));

        deliver(&mut client, &offer);
        let offer = reply(&client, MessageType::Offer, Ipv4Addr::new(10, 0, 0, 11));
        deliver(&mut client, &offer);
        run_for(&mut client, &timers, Duration::from_secs(4));
        assert!(transport.is_empty());

        run_for(&mut client, &timers, Duration::from_secs(1));
        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        let request = sent[0].message().unwrap();
        assert_eq!(request.message_type, MessageType::Request);
        assert_eq!(request.requested_address, Some(Ipv4Addr::new(10, 0, 0, 10)));
        assert_eq!(request.server_id, Some(SERVER));
        assert_eq!(request.timestamp, 5);
        assert_eq!(client.state(), State::Requesting);
    }

    #[test]
    fn falls_back_to_next_offer_without_answer() {
        let (mut client, transport, timers) = setup();
        client.start();
        let offer = reply(&client, MessageType::Offer, Ipv4Addr::new(10, 0, 0, 10));
        deliver(&mut client, &offer);
        let offer = reply(&client, MessageType::Offer, Ipv4Addr::new(10, 0, 0, 11));
        deliver(&mut client, &offer);
        run_for(&mut client, &timers, Duration::from_secs(5));
        transport.take();

        run_for(&mut client, &timers, Duration::from_secs(10));
        let request = transport.take()[0].message().unwrap();
        assert_eq!(request.requested_address, Some(Ipv4Addr::new(10, 0, 0, 11)));

        run_for(&mut client, &timers, Duration::from_secs(10));
        let discover = transport.take()[0].message().unwrap();
        assert_eq!(discover.message_type, MessageType::Discover);
        assert_eq!(client.state(), State::Selecting);
    }

    #[test]
    fn ignores_foreign_client_and_transaction() {
        let (mut client, transport, timers) = setup();
        client.start();
        transport.take();

        let mut foreign = reply(&client, MessageType::Offer, Ipv4Addr::new(10, 0, 0, 10));
        foreign.client_id = ClientId::from_slice(&[9]);
        deliver(&mut client, &foreign);
        let mut stale = reply(&client, MessageType::Offer, Ipv4Addr::new(10, 0, 0, 10));
        stale.transaction_id = client.transaction_id().wrapping_add(1);
        deliver(&mut client, &stale);

        run_for(&mut client, &timers, Duration::from_secs(5));
        let discover = transport.take()[0].message().unwrap();
        assert_eq!(discover.message_type, MessageType::Discover);
    }

    #[test]
    fn ack_installs_lease_and_arms_timers() {
        let (mut client, transport, timers) = setup();
        let mut events = client.subscribe();
        bind(&mut client, &transport, &timers);

        assert_eq!(client.state(), State::Bound);
        let binding = *client.binding().unwrap();
        assert_eq!(binding.address, Ipv4Addr::new(10, 0, 0, 10));
        assert_eq!(binding.mask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(binding.gateway, SERVER);
        assert!(binding.renew < binding.rebind && binding.rebind < binding.lease);
        assert!(client.host().has_address(Ipv4Addr::new(10, 0, 0, 10)));
        assert_eq!(client.host().default_route, Some(SERVER));
        assert_eq!(timers.pending(), 3);
        assert_eq!(
            timers.next_deadline(),
            Some(binding.acquired_at + Duration::from_secs(15))
        );
        assert_eq!(
            events.try_next().unwrap(),
            Some(LeaseEvent::Granted(Ipv4Addr::new(10, 0, 0, 10)))
        );
    }

    #[test]
    fn renews_by_unicast_then_rebinds_by_broadcast() {
        let (mut client, transport, timers) = setup();
        bind(&mut client, &transport, &timers);

        run_for(&mut client, &timers, Duration::from_secs(15));
        let sent = transport.take();
        assert_eq!(sent[0].destination, SocketAddrV4::new(SERVER, PORT_SERVER));
        assert_eq!(sent[0].message().unwrap().requested_address, Some(Ipv4Addr::new(10, 0, 0, 10)));
        assert_eq!(client.state(), State::Renewing);

        run_for(&mut client, &timers, Duration::from_secs(10));
        let sent = transport.take();
        assert_eq!(sent[0].destination, SocketAddrV4::new(BROADCAST, PORT_SERVER));
        assert_eq!(client.state(), State::Rebinding);

        let ack = reply(&client, MessageType::Ack, Ipv4Addr::new(10, 0, 0, 10));
        deliver(&mut client, &ack);
        assert_eq!(client.state(), State::Bound);
        assert_eq!(client.host().addresses.len(), 1);
    }

    #[test]
    fn expiry_drops_lease_and_starts_over() {
        let (mut client, transport, timers) = setup();
        let mut events = client.subscribe();
        bind(&mut client, &transport, &timers);
        events.try_next().unwrap();

        run_for(&mut client, &timers, Duration::from_secs(30));
        assert_eq!(
            events.try_next().unwrap(),
            Some(LeaseEvent::Expired(Ipv4Addr::new(10, 0, 0, 10)))
        );
        assert!(client.binding().is_none());
        assert!(client.host().addresses.is_empty());
        assert_eq!(client.host().default_route, None);
        assert_eq!(client.state(), State::Selecting);
        let last = transport.take().pop().unwrap().message().unwrap();
        assert_eq!(last.message_type, MessageType::Discover);
    }

    #[test]
    fn nack_while_renewing_drops_lease() {
        let (mut client, transport, timers) = setup();
        let mut events = client.subscribe();
        bind(&mut client, &transport, &timers);
        events.try_next().unwrap();
        run_for(&mut client, &timers, Duration::from_secs(15));

        let nack = reply(&client, MessageType::Nack, Ipv4Addr::UNSPECIFIED);
        deliver(&mut client, &nack);
        assert_eq!(
            events.try_next().unwrap(),
            Some(LeaseEvent::Expired(Ipv4Addr::new(10, 0, 0, 10)))
        );
        assert_eq!(client.state(), State::Selecting);
        assert!(client.host().addresses.is_empty());
    }

    #[test]
    fn link_down_suspends_until_link_up() {
        let (mut client, transport, timers) = setup();
        bind(&mut client, &transport, &timers);

        client.link_down();
        assert_eq!(client.state(), State::Suspended);
        assert_eq!(timers.pending(), 0);
        assert!(client.host().addresses.is_empty());

        let ack = reply(&client, MessageType::Ack, Ipv4Addr::new(10, 0, 0, 10));
        deliver(&mut client, &ack);
        assert_eq!(client.state(), State::Suspended);

        client.link_up();
        assert_eq!(client.state(), State::Selecting);
        assert_eq!(transport.take()[0].message().unwrap().message_type, MessageType::Discover);
    }

    #[test]
    fn stale_timer_is_ignored() {
        let (mut client, transport, timers) = setup();
        client.start();
        transport.take();
        let (stale, timer) = timers.pop_due(timers.now() + Duration::from_secs(5)).unwrap();
        client.handle_timer(stale, timer);
        transport.take();

        client.handle_timer(stale, timer);
        assert!(transport.is_empty());
    }
}
