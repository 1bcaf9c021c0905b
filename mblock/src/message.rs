//! Messages exchanged between blocks.
//!
//! The wiring layer never interprets message contents: a [`Message`] is a
//! signal name, as declared by a protocol class, with an optional opaque
//! payload. Messages reach a block's inbox wrapped in a [`Delivery`] that
//! records the port through which they were accepted.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque message payload.
pub type Payload = Box<dyn Any + Send>;

/// A message sent from one block to another.
pub struct Message {
    signal: String,
    data: Option<Payload>,
}

impl Message {
    /// Creates a message without payload.
    pub fn new(signal: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            data: None,
        }
    }

    /// Creates a message carrying the provided payload.
    pub fn with_data<T: Any + Send>(signal: impl Into<String>, data: T) -> Self {
        Self {
            signal: signal.into(),
            data: Some(Box::new(data)),
        }
    }

    /// Returns the signal name.
    pub fn signal(&self) -> &str {
        &self.signal
    }

    /// Returns a reference to the payload if there is one and it has type `T`.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|data| data.downcast_ref())
    }

    /// Checks whether the message carries a payload.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Extracts the payload if it has type `T`.
    ///
    /// The message is handed back unchanged if there is no payload or if its
    /// type does not match.
    pub fn into_data<T: Any>(self) -> Result<T, Self> {
        match self.data {
            Some(data) => match data.downcast::<T>() {
                Ok(data) => Ok(*data),
                Err(data) => Err(Self {
                    signal: self.signal,
                    data: Some(data),
                }),
            },
            None => Err(self),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("signal", &self.signal)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

/// A message queued in a block's inbox, tagged with the name of the port that
/// accepted it.
#[derive(Debug)]
pub struct Delivery {
    pub(crate) port_name: Arc<str>,
    pub(crate) message: Message,
}

impl Delivery {
    /// Returns the name of the port through which the message was accepted.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Returns the message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Splits the delivery into its port name and message.
    pub fn into_parts(self) -> (Arc<str>, Message) {
        (self.port_name, self.message)
    }
}
