//! Ports of a block.

use std::fmt;
use std::sync::Arc;

use crate::block::BlockId;
use crate::protocol::ProtocolClass;

/// The role of a port with respect to the block boundary.
///
/// EXTERNAL and RELAY ports are part of a block's peer interface while
/// INTERNAL ports are used to talk to the block's own sub-components. A RELAY
/// port forwards transparently between the outside and the inside of a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PortRole {
    /// Faces the sub-components of the owning block.
    Internal,
    /// Faces the peers of the owning block.
    External,
    /// Faces the peers and forwards to the sub-components.
    Relay,
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => "internal".fmt(f),
            Self::External => "external".fmt(f),
            Self::Relay => "relay".fmt(f),
        }
    }
}

/// Stable identity of a port.
///
/// Two ports are the same port if and only if their identifiers are equal,
/// regardless of the name through which they were reached.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId {
    block: BlockId,
    index: usize,
}

impl PortId {
    pub(crate) fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }

    /// Returns the identifier of the block owning the port.
    pub fn block(&self) -> BlockId {
        self.block
    }
}

/// A named, typed endpoint of a block.
///
/// Ports are created with
/// [`Block::define_port()`](crate::block::Block::define_port) and are
/// immutable thereafter. A `Port` value is a cheap handle: clones refer to the
/// same port and compare equal.
#[derive(Clone)]
pub struct Port {
    id: PortId,
    name: Arc<str>,
    protocol: Arc<ProtocolClass>,
    conjugated: bool,
    role: PortRole,
}

impl Port {
    pub(crate) fn new(
        id: PortId,
        name: &str,
        protocol: Arc<ProtocolClass>,
        conjugated: bool,
        role: PortRole,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            protocol,
            conjugated,
            role,
        }
    }

    /// Returns the identity of the port.
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Returns the name of the port.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Returns the protocol class of the port.
    pub fn protocol_class(&self) -> &ProtocolClass {
        &self.protocol
    }

    /// Returns the name of the protocol class of the port.
    pub fn protocol_class_name(&self) -> &str {
        self.protocol.name()
    }

    /// Checks whether the incoming and outgoing signal sets are swapped with
    /// respect to the protocol class.
    pub fn is_conjugated(&self) -> bool {
        self.conjugated
    }

    /// Returns the role of the port.
    pub fn role(&self) -> PortRole {
        self.role
    }

    /// Returns the signals received through this port.
    pub fn incoming_signals(&self) -> &[String] {
        if self.conjugated {
            self.protocol.outgoing_signals()
        } else {
            self.protocol.incoming_signals()
        }
    }

    /// Returns the signals emitted through this port.
    pub fn outgoing_signals(&self) -> &[String] {
        if self.conjugated {
            self.protocol.incoming_signals()
        } else {
            self.protocol.outgoing_signals()
        }
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Port {}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name)
            .field("protocol", &self.protocol.name())
            .field("conjugated", &self.conjugated)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
