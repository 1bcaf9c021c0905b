//! Blocks and their wiring.
//!
//! A [`Block`] is a node of the composition tree. It owns:
//!
//! * a registry of named [`Port`]s, created with [`Block::define_port()`],
//! * a registry of named child blocks, attached with
//!   [`Block::define_component()`],
//! * a table of connections between ports of itself and of its children,
//!   maintained with [`Block::connect()`] and the `disconnect*` family,
//! * an [`Inbox`] collecting the messages delivered to any of its ports.
//!
//! Endpoints are addressed by `(component, port)` name pairs relative to the
//! block on which a wiring method is called, where the reserved component name
//! [`SELF`] denotes the block itself. A child's INTERNAL ports face the child's
//! own sub-components and cannot be reached from its parent.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use mblock::block::Block;
//! use mblock::port::PortRole;
//! use mblock::protocol::{ProtocolClass, ProtocolClassRegistry};
//!
//! let protocols: ProtocolClassRegistry = [ProtocolClass::new("samples")
//!     .incoming(["data"])
//!     .outgoing(["ack"])]
//! .into_iter()
//! .collect();
//! let protocols = Arc::new(protocols);
//!
//! let mut source = Block::new("source", protocols.clone());
//! source.define_port("out", "samples", true, PortRole::External).unwrap();
//!
//! let mut top = Block::new("/top", protocols);
//! top.define_port("in", "samples", false, PortRole::External).unwrap();
//! top.define_component("source", source).unwrap();
//! top.connect("self", "in", "source", "out").unwrap();
//!
//! assert_eq!(top.component("source").unwrap().fullname(), "/top/source");
//! assert_eq!(top.nconnections(), 1);
//! ```
//!
//! # Concurrency
//!
//! All topology mutations take `&mut self` and are therefore serialized with
//! respect to each other and to tree walks. Once a graph is activated its
//! topology is meant to be read-only; rewiring a live graph requires the
//! caller to quiesce the affected blocks first. The inbox is the only
//! structure shared with other threads, through [`Accepter`] handles.
mod connection;
mod endpoint;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::WiringError;
use crate::inbox::{Accepter, Inbox};
use crate::port::{Port, PortId, PortRole};
use crate::protocol::ProtocolRegistry;

pub use connection::Connection;
pub use endpoint::{endpoints_are_compatible, Endpoint};

use connection::ConnectionTable;

/// Reserved component name denoting the block on which a wiring method is
/// called.
pub const SELF: &str = "self";

/// Joins a parent path and a local name with `/`.
///
/// Used for full names, walk paths and `component/port` endpoint names.
pub(crate) fn join_names(prefix: &str, name: &str) -> String {
    format!("{}/{}", prefix, name)
}

/// Stable identifier of a block.
///
/// Identifiers are unique for the lifetime of the process and are never
/// reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

impl BlockId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        // Ordering: uniqueness is all that is needed.
        BlockId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the composition tree.
pub struct Block {
    id: BlockId,
    name: String,
    fullname: String,
    parent: Option<BlockId>,
    ports: Vec<Port>,
    port_index: HashMap<String, usize>,
    components: Vec<Block>,
    component_index: HashMap<String, usize>,
    connections: ConnectionTable,
    inbox: Inbox,
    protocols: Arc<dyn ProtocolRegistry>,
}

impl Block {
    /// Creates a detached block with an inbox of capacity
    /// [`Inbox::DEFAULT_CAPACITY`].
    ///
    /// The name is used both as local name and as full name until the block
    /// is attached to a parent.
    pub fn new(name: impl Into<String>, protocols: Arc<dyn ProtocolRegistry>) -> Self {
        Self::with_capacity(name, protocols, Inbox::DEFAULT_CAPACITY)
    }

    /// Creates a detached block with an inbox of the specified capacity.
    ///
    /// # Panic
    ///
    /// The constructor will panic if the requested capacity is 0 or is greater
    /// than `usize::MAX/2 + 1`.
    pub fn with_capacity(
        name: impl Into<String>,
        protocols: Arc<dyn ProtocolRegistry>,
        capacity: usize,
    ) -> Self {
        let name = name.into();

        Self {
            id: BlockId::next(),
            fullname: name.clone(),
            name,
            parent: None,
            ports: Vec::new(),
            port_index: HashMap::new(),
            components: Vec::new(),
            component_index: HashMap::new(),
            connections: ConnectionTable::new(),
            inbox: Inbox::with_capacity(capacity),
            protocols,
        }
    }

    /// Returns the identifier of the block.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the local name of the block.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the hierarchical name of the block.
    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// Returns the identifier of the parent block, if the block is attached.
    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    /// Overwrites the full name of the block and recomputes those of all its
    /// descendants.
    pub fn set_fullname(&mut self, fullname: impl Into<String>) {
        self.fullname = fullname.into();

        for child in &mut self.components {
            child.set_fullname(join_names(&self.fullname, &child.name));
        }
    }

    /// Defines a port.
    ///
    /// The protocol class must be known to the protocol registry the block was
    /// created with. The returned handle can be kept by the caller to later
    /// identify the port, e.g. with [`Block::lookup_other_endpoint()`].
    pub fn define_port(
        &mut self,
        name: impl Into<String>,
        protocol_class_name: &str,
        conjugated: bool,
        role: PortRole,
    ) -> Result<Port, WiringError> {
        let name = name.into();

        if self.port_index.contains_key(&name) {
            return Err(self.reject(WiringError::DuplicatePort {
                block: self.fullname.clone(),
                port: name,
            }));
        }
        let Some(protocol) = self.protocols.lookup(protocol_class_name) else {
            return Err(self.reject(WiringError::UnknownProtocolClass {
                block: self.fullname.clone(),
                port: name,
                protocol: protocol_class_name.into(),
            }));
        };

        let port = Port::new(
            PortId::new(self.id, self.ports.len()),
            &name,
            protocol,
            conjugated,
            role,
        );
        debug!(
            block = %self.fullname,
            port = %name,
            protocol = protocol_class_name,
            conjugated,
            %role,
            "port defined"
        );
        self.port_index.insert(name, self.ports.len());
        self.ports.push(port.clone());

        Ok(port)
    }

    /// Attaches a child block under the specified component name.
    ///
    /// The child takes the component name as local name and its full name,
    /// as well as those of all its descendants, is recomputed.
    pub fn define_component(
        &mut self,
        name: impl Into<String>,
        mut child: Block,
    ) -> Result<(), WiringError> {
        let name = name.into();

        let index = self.components.len();
        match self.component_index.entry(name) {
            Entry::Vacant(s) => {
                let name = s.key().clone();
                s.insert(index);

                child.parent = Some(self.id);
                child.set_fullname(join_names(&self.fullname, &name));
                child.name = name;

                debug!(
                    block = %self.fullname,
                    component = %child.name,
                    child = %child.fullname,
                    "component defined"
                );
                self.components.push(child);

                Ok(())
            }
            Entry::Occupied(s) => {
                let err = WiringError::DuplicateComponent {
                    block: self.fullname.clone(),
                    component: s.key().clone(),
                };

                Err(self.reject(err))
            }
        }
    }

    /// Checks whether a port with this name is defined.
    pub fn has_port(&self, name: &str) -> bool {
        self.port_index.contains_key(name)
    }

    /// Returns the port with this name, if it is defined.
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.port_index.get(name).map(|&i| &self.ports[i])
    }

    /// Returns an iterator over the ports, in definition order.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Checks whether a component with this name is defined.
    pub fn has_component(&self, name: &str) -> bool {
        self.component_index.contains_key(name)
    }

    /// Returns the component with this name, if it is defined.
    pub fn component(&self, name: &str) -> Option<&Block> {
        self.component_index
            .get(name)
            .map(|&i| &self.components[i])
    }

    /// Returns a mutable reference to the component with this name, if it is
    /// defined.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Block> {
        self.component_index
            .get(name)
            .map(|&i| &mut self.components[i])
    }

    /// Returns an iterator over the components, in definition order.
    pub fn components(&self) -> impl Iterator<Item = &Block> {
        self.components.iter()
    }

    /// Searches this block and its descendants for the block with the
    /// specified identifier.
    ///
    /// This is typically used from the root to resolve a
    /// [`parent()`](Block::parent) back-reference.
    pub fn find(&self, id: BlockId) -> Option<&Block> {
        if self.id == id {
            return Some(self);
        }

        self.components.iter().find_map(|c| c.find(id))
    }

    /// Resolves an endpoint relative to this block.
    ///
    /// With [`SELF`] as component name, the port is looked up among this
    /// block's ports. Otherwise it is looked up among the EXTERNAL and RELAY
    /// ports of the named component.
    pub fn check_and_resolve_endpoint(
        &self,
        comp_name: &str,
        port_name: &str,
    ) -> Result<Endpoint, WiringError> {
        let unknown_port = || WiringError::UnknownPort {
            block: self.fullname.clone(),
            component: comp_name.into(),
            port: port_name.into(),
        };

        let port = if comp_name == SELF {
            self.port(port_name).ok_or_else(unknown_port)?
        } else {
            let component = self
                .component(comp_name)
                .ok_or_else(|| WiringError::UnknownComponent {
                    block: self.fullname.clone(),
                    component: comp_name.into(),
                })?;

            // A child's internal ports are only visible from inside the child.
            component
                .port(port_name)
                .filter(|port| port.role() != PortRole::Internal)
                .ok_or_else(unknown_port)?
        };

        Ok(Endpoint::new(comp_name, port.clone()))
    }

    /// Connects two endpoints.
    ///
    /// The order of the endpoints is irrelevant: connecting `(a, b)` and then
    /// `(b, a)` fails with [`WiringError::AlreadyConnected`].
    pub fn connect(
        &mut self,
        comp_name1: &str,
        port_name1: &str,
        comp_name2: &str,
        port_name2: &str,
    ) -> Result<(), WiringError> {
        let (ep0, ep1) = self.resolve_pair(comp_name1, port_name1, comp_name2, port_name2)?;

        if !endpoints_are_compatible(&ep0, &ep1) {
            return Err(self.reject(WiringError::IncompatibleEndpoints {
                block: self.fullname.clone(),
                first: ep0.to_string(),
                second: ep1.to_string(),
            }));
        }
        if self.connections.contains(ep0.id(), ep1.id()) {
            return Err(self.reject(WiringError::AlreadyConnected {
                block: self.fullname.clone(),
                first: ep0.to_string(),
                second: ep1.to_string(),
            }));
        }

        debug!(block = %self.fullname, first = %ep0, second = %ep1, "connected");
        self.connections.insert(Connection::new(ep0, ep1));

        Ok(())
    }

    /// Disconnects two endpoints.
    pub fn disconnect(
        &mut self,
        comp_name1: &str,
        port_name1: &str,
        comp_name2: &str,
        port_name2: &str,
    ) -> Result<(), WiringError> {
        let (ep0, ep1) = self.resolve_pair(comp_name1, port_name1, comp_name2, port_name2)?;

        match self.connections.remove(ep0.id(), ep1.id()) {
            Some(_) => {
                debug!(block = %self.fullname, first = %ep0, second = %ep1, "disconnected");

                Ok(())
            }
            None => Err(self.reject(WiringError::NotConnected {
                block: self.fullname.clone(),
                first: ep0.to_string(),
                second: ep1.to_string(),
            })),
        }
    }

    /// Removes all connections involving a port of the named component, or
    /// of this block if the name is [`SELF`].
    ///
    /// Unknown names and components without connections are ignored.
    pub fn disconnect_component(&mut self, component_name: &str) {
        let owner = if component_name == SELF {
            Some(self.id)
        } else {
            self.component(component_name).map(Block::id)
        };

        if let Some(owner) = owner {
            let count = self.connections.remove_touching(owner);
            debug!(
                block = %self.fullname,
                component = component_name,
                count,
                "component disconnected"
            );
        }
    }

    /// Removes all connections.
    pub fn disconnect_all(&mut self) {
        let count = self.connections.clear();
        debug!(block = %self.fullname, count, "all connections removed");
    }

    /// Returns the number of connections owned by this block.
    pub fn nconnections(&self) -> usize {
        self.connections.len()
    }

    /// Returns an iterator over the connections owned by this block, in the
    /// order in which they were made.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Returns the endpoint connected to `port`, if any.
    ///
    /// Ports are compared by identity. If the port takes part in several
    /// connections, the partner in the oldest one is returned.
    pub fn lookup_other_endpoint(&self, port: &Port) -> Option<&Endpoint> {
        self.connections.lookup_other_endpoint(port.id())
    }

    /// Visits this block and all its descendants in depth-first pre-order.
    ///
    /// The visitor is called with each block and its path, the path of a
    /// child being `path + "/" + local_name`. Children are visited in
    /// definition order. The walk stops as soon as the visitor returns
    /// `false`, in which case `false` is returned.
    pub fn walk_tree<F>(&self, path: &str, mut visitor: F) -> bool
    where
        F: FnMut(&Block, &str) -> bool,
    {
        self.walk(path, &mut visitor)
    }

    /// Visits this block and all its descendants in depth-first pre-order,
    /// with mutable access.
    ///
    /// Each block is visited before its children are enumerated, so the
    /// visitor may add components to the block it is given.
    pub fn walk_tree_mut<F>(&mut self, path: &str, mut visitor: F) -> bool
    where
        F: FnMut(&mut Block, &str) -> bool,
    {
        self.walk_mut(path, &mut visitor)
    }

    /// Returns an accepter delivering messages to this block's inbox on
    /// behalf of the named port.
    pub fn make_accepter(&self, port_name: &str) -> Result<Accepter, WiringError> {
        let Some(port) = self.port(port_name) else {
            return Err(self.reject(WiringError::UnknownPort {
                block: self.fullname.clone(),
                component: SELF.into(),
                port: port_name.into(),
            }));
        };

        Ok(self.inbox.accepter(port.shared_name()))
    }

    /// Returns the inbox of this block.
    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Returns a mutable reference to the inbox of this block, as needed to
    /// receive from it.
    pub fn inbox_mut(&mut self) -> &mut Inbox {
        &mut self.inbox
    }

    fn walk<F>(&self, path: &str, visitor: &mut F) -> bool
    where
        F: FnMut(&Block, &str) -> bool,
    {
        trace!(block = %self.fullname, path, "visiting");
        if !visitor(self, path) {
            return false;
        }

        self.components
            .iter()
            .all(|c| c.walk(&join_names(path, &c.name), visitor))
    }

    fn walk_mut<F>(&mut self, path: &str, visitor: &mut F) -> bool
    where
        F: FnMut(&mut Block, &str) -> bool,
    {
        trace!(block = %self.fullname, path, "visiting");
        if !visitor(self, path) {
            return false;
        }

        self.components
            .iter_mut()
            .all(|c| c.walk_mut(&join_names(path, &c.name), visitor))
    }

    fn resolve_pair(
        &self,
        comp_name1: &str,
        port_name1: &str,
        comp_name2: &str,
        port_name2: &str,
    ) -> Result<(Endpoint, Endpoint), WiringError> {
        let ep0 = self
            .check_and_resolve_endpoint(comp_name1, port_name1)
            .map_err(|e| self.reject(e))?;
        let ep1 = self
            .check_and_resolve_endpoint(comp_name2, port_name2)
            .map_err(|e| self.reject(e))?;

        Ok((ep0, ep1))
    }

    fn reject(&self, err: WiringError) -> WiringError {
        debug!(block = %self.fullname, error = %err, "wiring call rejected");

        err
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("fullname", &self.fullname)
            .field("ports", &self.ports.len())
            .field("components", &self.components.len())
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}
