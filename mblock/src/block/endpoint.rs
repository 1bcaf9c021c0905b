//! Resolved endpoints and the compatibility rule.

use std::fmt;
use std::sync::Arc;

use crate::block::{join_names, BlockId, SELF};
use crate::port::{Port, PortId, PortRole};

/// A resolved `(component, port)` pair, one side of a connection.
///
/// The component name is relative to the block that resolved the endpoint,
/// [`SELF`] denoting that block itself.
#[derive(Clone)]
pub struct Endpoint {
    component_name: Arc<str>,
    port: Port,
}

impl Endpoint {
    pub(crate) fn new(component_name: &str, port: Port) -> Self {
        Self {
            component_name: component_name.into(),
            port,
        }
    }

    /// Returns the component name, relative to the resolving block.
    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    /// Returns the name of the port.
    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    /// Returns the resolved port.
    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Returns the identity of the resolved port.
    pub fn id(&self) -> PortId {
        self.port.id()
    }

    /// Returns the identifier of the block owning the port.
    pub fn owner(&self) -> BlockId {
        self.port.id().block()
    }

    /// Checks whether the endpoint is a RELAY port of the resolving block,
    /// seen from the inside.
    pub fn is_inside_of_relay(&self) -> bool {
        &*self.component_name == SELF && self.port.role() == PortRole::Relay
    }

    /// Returns the conjugation of the endpoint once the inside view of a
    /// RELAY port is accounted for.
    pub fn effective_conjugation(&self) -> bool {
        self.port.is_conjugated() ^ self.is_inside_of_relay()
    }

    /// Returns the signals received through this endpoint.
    pub fn incoming_signals(&self) -> &[String] {
        if self.is_inside_of_relay() {
            self.port.outgoing_signals()
        } else {
            self.port.incoming_signals()
        }
    }

    /// Returns the signals emitted through this endpoint.
    pub fn outgoing_signals(&self) -> &[String] {
        if self.is_inside_of_relay() {
            self.port.incoming_signals()
        } else {
            self.port.outgoing_signals()
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_names(&self.component_name, self.port.name()))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("component_name", &self.component_name)
            .field("port", &self.port)
            .finish()
    }
}

/// Checks whether two endpoints can be connected.
///
/// The endpoints must use the same protocol class and have opposite effective
/// conjugations, so that what one side emits is what the other side receives.
/// A RELAY port is transparent: seen from the inside, its conjugation is
/// flipped.
pub fn endpoints_are_compatible(ep0: &Endpoint, ep1: &Endpoint) -> bool {
    ep0.port.protocol_class_name() == ep1.port.protocol_class_name()
        && ep0.effective_conjugation() != ep1.effective_conjugation()
}
