//! Connections between endpoints and the per-block connection table.

use std::slice;

use crate::block::endpoint::Endpoint;
use crate::block::BlockId;
use crate::port::PortId;

/// A connection between two endpoints.
///
/// Connections are unordered: the connection from `a` to `b` is the
/// connection from `b` to `a`.
#[derive(Clone, Debug)]
pub struct Connection {
    endpoints: [Endpoint; 2],
}

impl Connection {
    pub(crate) fn new(ep0: Endpoint, ep1: Endpoint) -> Self {
        Self {
            endpoints: [ep0, ep1],
        }
    }

    /// Returns both endpoints, in the order they were connected.
    pub fn endpoints(&self) -> (&Endpoint, &Endpoint) {
        (&self.endpoints[0], &self.endpoints[1])
    }

    /// Checks whether this connection joins the two ports, in any order.
    pub fn joins(&self, a: PortId, b: PortId) -> bool {
        let (p0, p1) = (self.endpoints[0].id(), self.endpoints[1].id());

        (p0 == a && p1 == b) || (p0 == b && p1 == a)
    }

    /// Checks whether either endpoint belongs to the specified block.
    pub fn touches(&self, owner: BlockId) -> bool {
        self.endpoints.iter().any(|ep| ep.owner() == owner)
    }

    /// Returns the endpoint on the other side of `port`, if `port` is one of
    /// the endpoints.
    pub fn other_side(&self, port: PortId) -> Option<&Endpoint> {
        if self.endpoints[0].id() == port {
            Some(&self.endpoints[1])
        } else if self.endpoints[1].id() == port {
            Some(&self.endpoints[0])
        } else {
            None
        }
    }
}

/// The connections owned by a block, in insertion order.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConnectionTable(Vec<Connection>);

impl ConnectionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Checks whether the two ports are connected to each other.
    pub(crate) fn contains(&self, a: PortId, b: PortId) -> bool {
        self.0.iter().any(|conn| conn.joins(a, b))
    }

    /// Adds a connection.
    ///
    /// The caller is responsible for checking that the pair is not already
    /// connected.
    pub(crate) fn insert(&mut self, connection: Connection) {
        self.0.push(connection);
    }

    /// Removes the connection joining the two ports, if any.
    pub(crate) fn remove(&mut self, a: PortId, b: PortId) -> Option<Connection> {
        let position = self.0.iter().position(|conn| conn.joins(a, b))?;

        Some(self.0.remove(position))
    }

    /// Removes all connections touching the specified block and returns how
    /// many were removed.
    pub(crate) fn remove_touching(&mut self, owner: BlockId) -> usize {
        let len = self.0.len();
        self.0.retain(|conn| !conn.touches(owner));

        len - self.0.len()
    }

    /// Removes all connections and returns how many were removed.
    pub(crate) fn clear(&mut self) -> usize {
        let len = self.0.len();
        self.0.clear();

        len
    }

    /// Returns the partner of `port` in the first connection involving it.
    pub(crate) fn lookup_other_endpoint(&self, port: PortId) -> Option<&Endpoint> {
        self.0.iter().find_map(|conn| conn.other_side(port))
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn iter(&self) -> slice::Iter<'_, Connection> {
        self.0.iter()
    }
}
