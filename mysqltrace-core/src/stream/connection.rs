use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use serde::Serialize;
use tracing::trace;

use super::{Direction, TcpFlags};

/// One side of a TCP connection.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V4(ip) => write!(f, "{ip}:{}", self.port),
            IpAddr::V6(ip) => write!(f, "[{ip}]:{}", self.port),
        }
    }
}

/// A connection named by its client and server endpoints.
///
/// Both directions of the connection map to the same value.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize)]
pub struct ConnectionAddress {
    pub client: Endpoint,
    pub server: Endpoint,
}

impl ConnectionAddress {
    /// Address of the connection a packet from `src` to `dst` belongs to,
    /// given the direction it travels in.
    pub fn from_flow(src: Endpoint, dst: Endpoint, direction: Direction) -> Self {
        match direction {
            Direction::ToServer => Self {
                client: src,
                server: dst,
            },
            Direction::ToClient => Self {
                client: dst,
                server: src,
            },
        }
    }

    /// Direction of a packet sent by `src`.
    pub fn direction_from(&self, src: &Endpoint) -> Direction {
        if *src == self.client {
            Direction::ToServer
        } else {
            Direction::ToClient
        }
    }
}

impl fmt::Display for ConnectionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.client, self.server)
    }
}

/// Guess the direction of a packet when the handshake was not captured.
///
/// A configured server port wins; otherwise the lower port is taken to be
/// the server. Equal ports count as client to server.
pub fn classify_direction(src_port: u16, dst_port: u16, server_port: Option<u16>) -> Direction {
    match server_port {
        Some(port) if dst_port == port => Direction::ToServer,
        Some(port) if src_port == port => Direction::ToClient,
        _ if src_port < dst_port => Direction::ToClient,
        _ => Direction::ToServer,
    }
}

/// Normalized connection key (lower endpoint first for consistent lookup).
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ConnectionKey {
    a: Endpoint,
    b: Endpoint,
}

impl ConnectionKey {
    pub fn new(src: Endpoint, dst: Endpoint) -> Self {
        if src <= dst {
            Self { a: src, b: dst }
        } else {
            Self { a: dst, b: src }
        }
    }
}

/// A tracked connection.
#[derive(Debug, Clone)]
struct Tracked {
    address: ConnectionAddress,
    /// Roles came from the handshake rather than the port heuristic.
    from_handshake: bool,
    packets_to_server: u32,
    packets_to_client: u32,
}

/// Remembers which endpoint is the client for every connection seen.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    connections: HashMap<ConnectionKey, Tracked>,
    server_port: Option<u16>,
}

impl ConnectionTracker {
    pub fn new(server_port: Option<u16>) -> Self {
        Self {
            connections: HashMap::new(),
            server_port,
        }
    }

    /// Look up the connection a packet belongs to, creating it on first sight.
    ///
    /// The sender of a bare SYN is the client and the sender of a SYN-ACK is
    /// the server. Connections picked up mid-stream fall back to
    /// [`classify_direction`]. A new SYN on a tuple first seen mid-stream
    /// corrects the guess.
    pub fn get_or_create(
        &mut self,
        src: Endpoint,
        dst: Endpoint,
        flags: TcpFlags,
    ) -> (ConnectionAddress, Direction) {
        let key = ConnectionKey::new(src, dst);
        let handshake_direction = if flags.is_syn_only() {
            Some(Direction::ToServer)
        } else if flags.syn && flags.ack {
            Some(Direction::ToClient)
        } else {
            None
        };

        let server_port = self.server_port;
        let tracked = self.connections.entry(key).or_insert_with(|| {
            let direction = handshake_direction
                .unwrap_or_else(|| classify_direction(src.port, dst.port, server_port));
            let address = ConnectionAddress::from_flow(src, dst, direction);
            trace!(%address, from_handshake = handshake_direction.is_some(), "tracking connection");
            Tracked {
                address,
                from_handshake: handshake_direction.is_some(),
                packets_to_server: 0,
                packets_to_client: 0,
            }
        });

        if let Some(direction) = handshake_direction {
            if !tracked.from_handshake {
                tracked.address = ConnectionAddress::from_flow(src, dst, direction);
                tracked.from_handshake = true;
            }
        }

        let direction = tracked.address.direction_from(&src);
        match direction {
            Direction::ToServer => tracked.packets_to_server += 1,
            Direction::ToClient => tracked.packets_to_client += 1,
        }
        (tracked.address.clone(), direction)
    }

    /// Forget a connection so a reused tuple starts fresh.
    pub fn remove(&mut self, address: &ConnectionAddress) {
        self.connections
            .remove(&ConnectionKey::new(address.client, address.server));
    }

    /// Packets seen per direction, as (to server, to client).
    pub fn packet_counts(&self, address: &ConnectionAddress) -> Option<(u32, u32)> {
        self.connections
            .get(&ConnectionKey::new(address.client, address.server))
            .map(|t| (t.packets_to_server, t.packets_to_client))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
