//! The lease table: pools, static reservations and per-client records.

use std::{
    collections::HashMap,
    net::Ipv4Addr,
    time::{Duration, Instant},
};

use dhcp_protocol::ClientId;

use crate::{error::Error, lease::Lease, pool::AddressPool};

/// The outcome of a granted REQUEST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub address: Ipv4Addr,
    /// The client did not hold this address as an active lease before.
    pub is_new: bool,
    /// A different active lease of the client the assignment replaced.
    pub replaced: Option<Ipv4Addr>,
}

/// Why a REQUEST is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// No pool serves the subnet the request came from.
    NoPool,
    /// The address is outside the selected pool range.
    OutOfRange,
    /// Another client holds the address.
    Taken(ClientId),
}

pub struct Storage {
    pools: Vec<AddressPool>,
    statics: HashMap<ClientId, Ipv4Addr>,
    leases: HashMap<ClientId, Lease>, // client_id -> Lease
    owners: HashMap<Ipv4Addr, ClientId>, // IPv4 -> client_id
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    pub fn new() -> Self {
        Storage {
            pools: Vec::new(),
            statics: HashMap::new(),
            leases: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// # Errors
    /// The pool overlaps another pool or contains a static reservation.
    pub fn add_pool(&mut self, pool: AddressPool) -> Result<(), Error> {
        if let Some(existing) = self.pools.iter().find(|existing| existing.overlaps(&pool)) {
            return Err(Error::OverlappingPools(existing.subnet(), pool.subnet()));
        }
        if let Some(address) = self.statics.values().find(|address| pool.contains(**address)) {
            return Err(Error::ReservedInPool(*address));
        }
        self.pools.push(pool);
        Ok(())
    }

    /// Reserves `address` for `client_id`, replacing its previous reservation.
    ///
    /// # Errors
    /// The address lies in a pool range or is reserved for another client.
    pub fn add_static(&mut self, client_id: ClientId, address: Ipv4Addr) -> Result<(), Error> {
        if self.pools.iter().any(|pool| pool.contains(address)) {
            return Err(Error::ReservedInPool(address));
        }
        if let Some((owner, _)) = self
            .statics
            .iter()
            .find(|(owner, reserved)| **reserved == address && **owner != client_id)
        {
            return Err(Error::StaticConflict {
                address,
                owner: *owner,
            });
        }
        self.statics.insert(client_id, address);
        Ok(())
    }

    pub fn pools(&self) -> &[AddressPool] {
        &self.pools
    }

    /// The pool serving the subnet `address` belongs to.
    pub fn pool_serving(&self, address: Ipv4Addr) -> Option<&AddressPool> {
        self.pools.iter().find(|pool| pool.serves(address))
    }

    pub fn static_address(&self, client_id: &ClientId) -> Option<Ipv4Addr> {
        self.statics.get(client_id).copied()
    }

    pub fn lease(&self, client_id: &ClientId) -> Option<&Lease> {
        self.leases.get(client_id)
    }

    pub fn owner(&self, address: Ipv4Addr) -> Option<ClientId> {
        self.owners.get(&address).copied()
    }

    /// Picks an address to offer and reserves it for `offer_timeout`.
    ///
    /// Returns `None` if the pool is exhausted.
    pub fn offer(
        &mut self,
        client_id: ClientId,
        pool: Option<&AddressPool>,
        now: Instant,
        offer_timeout: Duration,
    ) -> Option<Ipv4Addr> {
        trace!("Allocation sequence: started for {}", client_id);

        trace!("Allocation sequence: checking for a static reservation");
        if let Some(address) = self.static_address(&client_id) {
            trace!("Allocation sequence: the client has a static address {}", address);
            return Some(address);
        }

        trace!("Allocation sequence: checking for a client's current address");
        if let Some(lease) = self.leases.get(&client_id) {
            if lease.is_active(now) {
                trace!("Allocation sequence: the client has already leased an address: {}", lease.address());
                return Some(lease.address());
            }
        }

        trace!("Allocation sequence: checking for a client's outstanding offer");
        if let Some(lease) = self.leases.get(&client_id) {
            if lease.is_offered() && !lease.is_expired(now) && pool.map_or(false, |pool| pool.contains(lease.address())) {
                let address = lease.address();
                trace!("Allocation sequence: repeating the offer of {}", address);
                self.reserve(client_id, Lease::offered(address, now, offer_timeout));
                return Some(address);
            }
        }

        let pool = pool?;
        let address = pool.addresses().find(|address| self.is_free(*address, &client_id, now))?;
        trace!("Allocation sequence: offering the newly allocated address: {}", address);
        self.reserve(client_id, Lease::offered(address, now, offer_timeout));
        Some(address)
    }

    /// Grants `requested` to `client_id` for `lease_time` if it may have it.
    ///
    /// The client's static reservation and its active lease are always
    /// granted. Any other address must be in the range of `pool` and not be
    /// held by another client.
    pub fn assign(
        &mut self,
        client_id: ClientId,
        requested: Ipv4Addr,
        pool: Option<&AddressPool>,
        now: Instant,
        lease_time: Duration,
    ) -> Result<Assignment, Refusal> {
        let current = self
            .leases
            .get(&client_id)
            .filter(|lease| lease.is_active(now))
            .map(|lease| lease.address());

        let is_static = self.static_address(&client_id) == Some(requested);
        if !is_static && current != Some(requested) {
            let pool = pool.ok_or(Refusal::NoPool)?;
            if !pool.contains(requested) {
                return Err(Refusal::OutOfRange);
            }
            if let Some(owner) = self.holder(requested, now) {
                if owner != client_id {
                    return Err(Refusal::Taken(owner));
                }
            }
        }

        match self.leases.get_mut(&client_id).filter(|lease| lease.address() == requested) {
            Some(lease) => lease.assign(now, lease_time),
            None => self.reserve(client_id, Lease::assigned(requested, now, lease_time)),
        }
        Ok(Assignment {
            address: requested,
            is_new: current != Some(requested),
            replaced: current.filter(|address| *address != requested),
        })
    }

    /// Forgets the outstanding offer of a client that chose another server.
    pub fn withdraw_offer(&mut self, client_id: &ClientId) -> Option<Ipv4Addr> {
        match self.leases.get(client_id) {
            Some(lease) if lease.is_offered() => {
                let address = lease.address();
                self.remove(client_id);
                Some(address)
            }
            _ => None,
        }
    }

    /// Removes expired records.
    ///
    /// Returns the addresses of the removed assignments. Expired offers are
    /// removed silently.
    pub fn sweep(&mut self, now: Instant) -> Vec<Ipv4Addr> {
        let expired: Vec<(ClientId, Lease)> = self
            .leases
            .iter()
            .filter(|(_, lease)| lease.is_expired(now))
            .map(|(client_id, lease)| (*client_id, *lease))
            .collect();

        let mut addresses = Vec::new();
        for (client_id, lease) in expired {
            self.remove(&client_id);
            if lease.is_assigned() {
                addresses.push(lease.address());
            }
        }
        addresses.sort();
        addresses
    }

    /// The client holding `address` with an unexpired record, if any.
    fn holder(&self, address: Ipv4Addr, now: Instant) -> Option<ClientId> {
        let owner = self.owners.get(&address)?;
        match self.leases.get(owner) {
            Some(lease) if lease.address() == address && !lease.is_expired(now) => Some(*owner),
            _ => None,
        }
    }

    fn is_free(&self, address: Ipv4Addr, client_id: &ClientId, now: Instant) -> bool {
        if self.statics.values().any(|reserved| *reserved == address) {
            return false;
        }
        match self.holder(address, now) {
            Some(owner) => owner == *client_id,
            None => true,
        }
    }

    /// Replaces the client's record, releasing its previous address.
    fn reserve(&mut self, client_id: ClientId, lease: Lease) {
        let address = lease.address();
        if let Some(previous) = self.leases.insert(client_id, lease) {
            if previous.address() != address && self.owners.get(&previous.address()) == Some(&client_id) {
                self.owners.remove(&previous.address());
            }
        }
        if let Some(evicted) = self.owners.insert(address, client_id) {
            if evicted != client_id {
                let stale = self.leases.get(&evicted).map_or(false, |lease| lease.address() == address);
                if stale {
                    self.leases.remove(&evicted);
                }
            }
        }
    }

    fn remove(&mut self, client_id: &ClientId) {
        if let Some(lease) = self.leases.remove(client_id) {
            if self.owners.get(&lease.address()) == Some(client_id) {
                self.owners.remove(&lease.address());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(30);
    const OFFER: Duration = Duration::from_secs(60);

    fn pool() -> AddressPool {
        AddressPool::new(
            Ipv4Addr::new(10, 0, 0, 0),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::new(10, 0, 0, 10),
            Ipv4Addr::new(10, 0, 0, 15),
            None,
        )
        .unwrap()
    }

    fn storage() -> Storage {
        let mut storage = Storage::new();
        storage.add_pool(pool()).unwrap();
        storage
    }

    fn client(id: u8) -> ClientId {
        ClientId::from_slice(&[id])
    }

    #[test]
    fn offers_lowest_free_address() {
        let mut storage = storage();
        let now = Instant::now();
        let pool = pool();

        assert_eq!(storage.offer(client(1), Some(&pool), now, OFFER), Some(Ipv4Addr::new(10, 0, 0, 10)));
        assert_eq!(storage.offer(client(2), Some(&pool), now, OFFER), Some(Ipv4Addr::new(10, 0, 0, 11)));
        // repeated DISCOVER gets the same offer
        assert_eq!(storage.offer(client(1), Some(&pool), now, OFFER), Some(Ipv4Addr::new(10, 0, 0, 10)));
    }

    #[test]
    fn reuses_client_current_address() {
        let mut storage = storage();
        let now = Instant::now();
        let pool = pool();

        storage.assign(client(1), Ipv4Addr::new(10, 0, 0, 13), Some(&pool), now, LEASE).unwrap();
        assert_eq!(storage.offer(client(1), Some(&pool), now, OFFER), Some(Ipv4Addr::new(10, 0, 0, 13)));
        assert_eq!(storage.lease(&client(1)).map(Lease::is_assigned), Some(true));
    }

    #[test]
    fn accepted_offer_turns_into_lease() {
        let mut storage = storage();
        let now = Instant::now();
        let later = now + Duration::from_secs(3);
        let pool = pool();

        let offered = storage.offer(client(1), Some(&pool), now, OFFER).unwrap();
        assert_eq!(storage.lease(&client(1)).map(Lease::is_offered), Some(true));

        let assignment = storage.assign(client(1), offered, Some(&pool), later, LEASE).unwrap();
        assert!(assignment.is_new);
        let lease = storage.lease(&client(1)).unwrap();
        assert!(lease.is_active(later));
        assert_eq!(lease.expires_at(), later + LEASE);
        assert_eq!(storage.owner(offered), Some(client(1)));
    }

    #[test]
    fn static_reservation_wins() {
        let mut storage = storage();
        let now = Instant::now();
        let pool = pool();
        storage.add_static(client(1), Ipv4Addr::new(10, 0, 0, 100)).unwrap();

        assert_eq!(storage.offer(client(1), Some(&pool), now, OFFER), Some(Ipv4Addr::new(10, 0, 0, 100)));
        let assignment = storage.assign(client(1), Ipv4Addr::new(10, 0, 0, 100), Some(&pool), now, LEASE).unwrap();
        assert!(assignment.is_new);
    }

    #[test]
    fn rejects_bad_statics_and_pools() {
        let mut storage = storage();
        assert_eq!(
            storage.add_static(client(1), Ipv4Addr::new(10, 0, 0, 12)),
            Err(Error::ReservedInPool(Ipv4Addr::new(10, 0, 0, 12)))
        );
        storage.add_static(client(1), Ipv4Addr::new(10, 0, 0, 100)).unwrap();
        assert_eq!(
            storage.add_static(client(2), Ipv4Addr::new(10, 0, 0, 100)),
            Err(Error::StaticConflict {
                address: Ipv4Addr::new(10, 0, 0, 100),
                owner: client(1),
            })
        );
        assert!(storage.add_pool(pool()).is_err());
    }

    #[test]
    fn exhausted_pool_offers_nothing() {
        let mut storage = storage();
        let now = Instant::now();
        let pool = pool();
        for id in 1..=6 {
            assert!(storage.offer(client(id), Some(&pool), now, OFFER).is_some());
        }
        assert_eq!(storage.offer(client(7), Some(&pool), now, OFFER), None);

        // expired offers are reusable
        let later = now + OFFER;
        assert_eq!(storage.offer(client(7), Some(&pool), later, OFFER), Some(Ipv4Addr::new(10, 0, 0, 10)));
    }

    #[test]
    fn refuses_address_held_by_another_client() {
        let mut storage = storage();
        let now = Instant::now();
        let pool = pool();
        storage.assign(client(1), Ipv4Addr::new(10, 0, 0, 10), Some(&pool), now, LEASE).unwrap();

        assert_eq!(
            storage.assign(client(2), Ipv4Addr::new(10, 0, 0, 10), Some(&pool), now, LEASE),
            Err(Refusal::Taken(client(1)))
        );
        assert_eq!(
            storage.assign(client(2), Ipv4Addr::new(10, 0, 0, 99), Some(&pool), now, LEASE),
            Err(Refusal::OutOfRange)
        );
        assert_eq!(
            storage.assign(client(2), Ipv4Addr::new(10, 0, 0, 11), None, now, LEASE),
            Err(Refusal::NoPool)
        );
    }

    #[test]
    fn renewal_is_always_granted() {
        let mut storage = storage();
        let now = Instant::now();
        let pool = pool();
        storage.assign(client(1), Ipv4Addr::new(10, 0, 0, 10), Some(&pool), now, LEASE).unwrap();

        let later = now + Duration::from_secs(20);
        let renewal = storage.assign(client(1), Ipv4Addr::new(10, 0, 0, 10), None, later, LEASE).unwrap();
        assert!(!renewal.is_new);
        assert_eq!(storage.lease(&client(1)).unwrap().expires_at(), later + LEASE);
    }

    #[test]
    fn sweep_reports_expired_assignments_only() {
        let mut storage = storage();
        let now = Instant::now();
        let pool = pool();
        storage.assign(client(1), Ipv4Addr::new(10, 0, 0, 10), Some(&pool), now, LEASE).unwrap();
        storage.offer(client(2), Some(&pool), now, Duration::from_secs(10));

        assert!(storage.sweep(now + Duration::from_secs(5)).is_empty());
        assert!(storage.sweep(now + Duration::from_secs(10)).is_empty());
        assert!(storage.lease(&client(2)).is_none());
        assert_eq!(storage.sweep(now + LEASE), vec![Ipv4Addr::new(10, 0, 0, 10)]);
        assert_eq!(storage.owner(Ipv4Addr::new(10, 0, 0, 10)), None);
    }

    #[test]
    fn withdrawn_offer_frees_address() {
        let mut storage = storage();
        let now = Instant::now();
        let pool = pool();
        storage.offer(client(1), Some(&pool), now, OFFER);

        assert_eq!(storage.withdraw_offer(&client(1)), Some(Ipv4Addr::new(10, 0, 0, 10)));
        assert_eq!(storage.offer(client(2), Some(&pool), now, OFFER), Some(Ipv4Addr::new(10, 0, 0, 10)));
    }
}
