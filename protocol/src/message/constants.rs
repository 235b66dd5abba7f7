//! Lease message constants.

use std::net::Ipv4Addr;

/// `client_id` size in bytes.
pub const SIZE_CLIENT_ID: usize = 16;

/// The size of an encoded message in bytes.
///
/// magic(4) + type(1) + transaction(4) + client_id(16) + 6 addresses(24) + 4 counters(16)
pub const SIZE_MESSAGE: usize = 65;

/// The `client_id` field offset in bytes.
pub const OFFSET_CLIENT_ID: usize = 9;

/// The first address field offset in bytes.
pub const OFFSET_ADDRESSES: usize = OFFSET_CLIENT_ID + SIZE_CLIENT_ID;

/// The magic number every message starts with.
pub const MAGIC_COOKIE: u32 = 0x6382_5363;

/// The port servers and relays listen on for client traffic.
pub const PORT_SERVER: u16 = 67;

/// The port clients and relays listen on for server traffic.
pub const PORT_CLIENT: u16 = 68;

/// The limited broadcast destination.
pub const BROADCAST: Ipv4Addr = Ipv4Addr::BROADCAST;
