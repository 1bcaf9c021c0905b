//! Protocol classes and their registry.
//!
//! A protocol class names the set of signals that can travel through a port
//! and their direction. The direction is given from the point of view of a
//! port that is not conjugated: such a port receives the `incoming` signals
//! and emits the `outgoing` ones, while a conjugated port does the opposite.
//!
//! Blocks never reach for a global table of protocol classes: a
//! [`ProtocolRegistry`] is injected when a block is created and queried each
//! time a port is defined.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named schema of incoming and outgoing signals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolClass {
    name: String,
    incoming: Vec<String>,
    outgoing: Vec<String>,
}

impl ProtocolClass {
    /// Creates a protocol class with no signals.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    /// Adds signals received by a non-conjugated port.
    pub fn incoming<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.incoming.extend(signals.into_iter().map(Into::into));
        self
    }

    /// Adds signals emitted by a non-conjugated port.
    pub fn outgoing<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outgoing.extend(signals.into_iter().map(Into::into));
        self
    }

    /// Returns the name of the protocol class.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the signals received by a non-conjugated port.
    pub fn incoming_signals(&self) -> &[String] {
        &self.incoming
    }

    /// Returns the signals emitted by a non-conjugated port.
    pub fn outgoing_signals(&self) -> &[String] {
        &self.outgoing
    }
}

/// Lookup capability for protocol classes.
pub trait ProtocolRegistry: Send + Sync {
    /// Returns the protocol class with the specified name, if it exists.
    fn lookup(&self, name: &str) -> Option<Arc<ProtocolClass>>;
}

/// An in-memory table of protocol classes.
#[derive(Default)]
pub struct ProtocolClassRegistry(HashMap<String, Arc<ProtocolClass>>);

impl ProtocolClassRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a protocol class to the registry.
    ///
    /// If a class with the same name is already registered, the class provided
    /// as argument is returned in the error.
    pub fn add(&mut self, class: ProtocolClass) -> Result<(), ProtocolClass> {
        match self.0.entry(class.name.clone()) {
            Entry::Vacant(s) => {
                s.insert(Arc::new(class));

                Ok(())
            }
            Entry::Occupied(_) => Err(class),
        }
    }

    /// Checks whether a class with the specified name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the number of registered classes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ProtocolRegistry for ProtocolClassRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<ProtocolClass>> {
        self.0.get(name).cloned()
    }
}

impl FromIterator<ProtocolClass> for ProtocolClassRegistry {
    /// Collects protocol classes into a registry; later duplicates are
    /// ignored.
    fn from_iter<I: IntoIterator<Item = ProtocolClass>>(iter: I) -> Self {
        let mut registry = Self::new();
        for class in iter {
            let _ = registry.add(class);
        }

        registry
    }
}

impl fmt::Debug for ProtocolClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ProtocolClassRegistry ({} classes)", self.0.len())
    }
}
