//! Hierarchical composition and wiring of message-passing blocks.
//!
//! A signal-processing application is commonly assembled from blocks that
//! exchange asynchronous messages through typed ports. This crate provides
//! the structural layer of such an application: it lets blocks declare ports,
//! nest other blocks as named components, and connect ports under rules that
//! are checked at wiring time. Scheduling and message dispatch are left to the
//! runtime driving the blocks.
//!
//! # A practical overview
//!
//! ## Protocol classes
//!
//! A [`ProtocolClass`](protocol::ProtocolClass) names a conversation and
//! lists the signals flowing in each direction from the point of view of an
//! unconjugated port. Protocol classes are collected in a registry that
//! implements [`ProtocolRegistry`](protocol::ProtocolRegistry) and is shared
//! by all the blocks of an application.
//!
//! ## Ports and roles
//!
//! Ports are defined with [`Block::define_port()`](block::Block::define_port)
//! and have one of three [roles](port::PortRole):
//!
//! * _external_ ports make up the interface a block offers to its peers,
//! * _internal_ ports are used by a block to talk to its own sub-components
//!   and are invisible from the parent,
//! * _relay_ ports are external ports that transparently forward to a
//!   sub-component; seen from inside the block, their direction is reversed.
//!
//! A _conjugated_ port swaps the incoming and outgoing signal sets of its
//! protocol class. Two endpoints can be connected if they use the same
//! protocol class and have opposite effective conjugations.
//!
//! ## Composition and wiring
//!
//! Child blocks are attached with
//! [`Block::define_component()`](block::Block::define_component), which also
//! derives their hierarchical names. Connections are made on the block owning
//! both sides, by naming each endpoint with a `(component, port)` pair, where
//! the reserved component name [`"self"`](block::SELF) denotes the block
//! itself:
//!
//! ```
//! use std::sync::Arc;
//!
//! use mblock::block::Block;
//! use mblock::message::Message;
//! use mblock::port::PortRole;
//! use mblock::protocol::{ProtocolClass, ProtocolClassRegistry};
//!
//! let protocols: ProtocolClassRegistry = [ProtocolClass::new("control")
//!     .incoming(["start", "stop"])
//!     .outgoing(["done"])]
//! .into_iter()
//! .collect();
//! let protocols = Arc::new(protocols);
//!
//! // A child offering an unconjugated control port.
//! let mut worker = Block::new("worker", protocols.clone());
//! worker.define_port("ctl", "control", false, PortRole::External)?;
//!
//! // A parent driving the child through an internal conjugated port.
//! let mut top = Block::new("/top", protocols);
//! top.define_port("to_worker", "control", true, PortRole::Internal)?;
//! top.define_component("worker", worker)?;
//! top.connect("self", "to_worker", "worker", "ctl")?;
//!
//! // Deliver a message to the worker's `ctl` port.
//! let port = top.port("to_worker").unwrap().clone();
//! let peer = top.lookup_other_endpoint(&port).unwrap();
//! assert_eq!(peer.to_string(), "worker/ctl");
//!
//! let worker = top.component_mut("worker").unwrap();
//! worker.make_accepter("ctl")?.accept(Message::new("start")).unwrap();
//!
//! let delivery = worker.inbox_mut().try_recv().unwrap();
//! assert_eq!(delivery.port_name(), "ctl");
//! assert_eq!(delivery.message().signal(), "start");
//! # Ok::<(), mblock::error::WiringError>(())
//! ```
//!
//! ## Tree traversal
//!
//! [`Block::walk_tree()`](block::Block::walk_tree) visits a block and all its
//! descendants in depth-first pre-order, which is typically used to start or
//! inspect every block of an application. A visitor can stop the walk early by
//! returning `false`.
//!
//! ## Inboxes
//!
//! Each block owns a bounded [`Inbox`](inbox::Inbox). Producers push to it
//! through [`Accepter`](inbox::Accepter) handles bound to one of the block's
//! ports, and the runtime driving the block pops the resulting
//! [`Delivery`](message::Delivery)s either asynchronously or by blocking the
//! current thread.
//!
//! # Logging
//!
//! Successful topology mutations are logged at the `DEBUG` level and tree
//! visits at the `TRACE` level with the [`tracing`] crate. Rejected wiring
//! calls are logged at the `DEBUG` level before the error is returned.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod block;
pub(crate) mod channel;
pub mod error;
pub mod inbox;
mod loom_exports;
pub mod message;
pub mod port;
pub mod protocol;
