//! Errors raised while building or rewiring a block hierarchy.

use thiserror::Error;

/// An error signaling a composition or configuration defect.
///
/// Every variant records the full name of the block on which the failing call
/// was made. Endpoints are rendered as `component/port`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WiringError {
    /// A port with the same name is already defined on the block.
    #[error("{block}: port '{port}' is already defined")]
    DuplicatePort {
        /// Full name of the block.
        block: String,
        /// Name of the port.
        port: String,
    },
    /// The protocol class of a port is not registered.
    #[error("{block}: port '{port}' refers to unknown protocol class '{protocol}'")]
    UnknownProtocolClass {
        /// Full name of the block.
        block: String,
        /// Name of the port.
        port: String,
        /// Name of the protocol class.
        protocol: String,
    },
    /// A component with the same name is already defined on the block.
    #[error("{block}: component '{component}' is already defined")]
    DuplicateComponent {
        /// Full name of the block.
        block: String,
        /// Name of the component.
        component: String,
    },
    /// The component name is neither `self` nor a registered component.
    #[error("{block}: no component named '{component}'")]
    UnknownComponent {
        /// Full name of the block.
        block: String,
        /// Name of the component.
        component: String,
    },
    /// The resolved component has no visible port of that name.
    #[error("{block}: no port named '{component}/{port}'")]
    UnknownPort {
        /// Full name of the block.
        block: String,
        /// Name of the component, or `self`.
        component: String,
        /// Name of the port.
        port: String,
    },
    /// The endpoints use different protocol classes or the same direction.
    #[error("{block}: endpoints '{first}' and '{second}' are incompatible")]
    IncompatibleEndpoints {
        /// Full name of the block.
        block: String,
        /// First endpoint.
        first: String,
        /// Second endpoint.
        second: String,
    },
    /// The endpoints are already connected to each other.
    #[error("{block}: endpoints '{first}' and '{second}' are already connected")]
    AlreadyConnected {
        /// Full name of the block.
        block: String,
        /// First endpoint.
        first: String,
        /// Second endpoint.
        second: String,
    },
    /// The endpoints are not connected to each other.
    #[error("{block}: endpoints '{first}' and '{second}' are not connected")]
    NotConnected {
        /// Full name of the block.
        block: String,
        /// First endpoint.
        first: String,
        /// Second endpoint.
        second: String,
    },
}
