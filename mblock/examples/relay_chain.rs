//! Example: receiver front-end with a relayed tuner control port.
//!
//! This example demonstrates in particular:
//!
//! * protocol classes and conjugated ports,
//! * nested components forwarding through RELAY ports,
//! * following a chain of connections down to the block that handles it,
//! * a block message loop running on its own thread.
//!
//! ```text
//!                     ┌──────────────────────────────────────────┐
//!                     │ front_end                                │
//!    ┌────────────┐   │         ┌────────────────────────────┐   │
//!    │            │ tune        │ rf                         │   │
//!    │ Controller ├───►○────────►○──────────► ┌───────┐     │   │
//!    │            │   │ (relay) │ (relay)     │ Tuner │     │   │
//!    └────────────┘   │         │             └───────┘     │   │
//!                     │         └────────────────────────────┘   │
//!                     └──────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::thread;

use mblock::block::{Block, SELF};
use mblock::error::WiringError;
use mblock::inbox::Accepter;
use mblock::message::Message;
use mblock::port::{Port, PortRole};
use mblock::protocol::{ProtocolClass, ProtocolClassRegistry, ProtocolRegistry};

/// Frequency in Hz.
type Frequency = f64;

fn protocols() -> Arc<dyn ProtocolRegistry> {
    let registry: ProtocolClassRegistry = [ProtocolClass::new("tuning")
        .incoming(["set-freq", "shutdown"])
        .outgoing(["freq-changed"])]
    .into_iter()
    .collect();

    Arc::new(registry)
}

/// Builds the hierarchy and returns it with the controller's output port.
fn assemble(protocols: Arc<dyn ProtocolRegistry>) -> Result<(Block, Port), WiringError> {
    let mut tuner = Block::new("tuner", protocols.clone());
    tuner.define_port("ctl", "tuning", false, PortRole::External)?;

    let mut rf = Block::new("rf", protocols.clone());
    rf.define_port("tune", "tuning", false, PortRole::Relay)?;
    rf.define_component("tuner", tuner)?;
    rf.connect(SELF, "tune", "tuner", "ctl")?;

    let mut front_end = Block::new("front_end", protocols.clone());
    front_end.define_port("tune", "tuning", false, PortRole::Relay)?;
    front_end.define_component("rf", rf)?;
    front_end.connect(SELF, "tune", "rf", "tune")?;

    let mut controller = Block::new("controller", protocols.clone());
    let out = controller.define_port("tune", "tuning", true, PortRole::External)?;

    let mut top = Block::new("/radio", protocols);
    top.define_component("front_end", front_end)?;
    top.define_component("controller", controller)?;
    top.connect("controller", "tune", "front_end", "tune")?;

    Ok((top, out))
}

/// Follows relays from `port`, a port of a component of `top`, and returns an
/// accepter for the block that terminates the chain.
fn resolve(top: &Block, port: &Port) -> Option<Accepter> {
    let mut block = top;
    let mut port = port.clone();

    loop {
        let ep = block.lookup_other_endpoint(&port)?;
        let owner = block.component(ep.component_name())?;
        if ep.port().role() != PortRole::Relay {
            println!("{} -> {}/{}", port.name(), owner.fullname(), ep.port_name());
            return owner.make_accepter(ep.port_name()).ok();
        }
        println!("{} -> {}/{} (relay)", port.name(), owner.fullname(), ep.port_name());
        block = owner;
        port = ep.port().clone();
    }
}

fn main() -> Result<(), WiringError> {
    tracing_subscriber::fmt::init();

    let (mut top, out) = assemble(protocols())?;

    // Print the hierarchy.
    top.walk_tree("/radio", |block, path| {
        let ports: Vec<_> = block.ports().map(|p| p.name()).collect();
        println!("{path} ports={ports:?} connections={}", block.nconnections());
        true
    });

    let accepter = resolve(&top, &out).expect("the tuner is reachable");

    // Run the tuner message loop on its own thread.
    let tuner = top
        .component_mut("front_end")
        .and_then(|b| b.component_mut("rf"))
        .and_then(|b| b.component_mut("tuner"))
        .expect("the tuner exists");
    thread::scope(|s| {
        let inbox = tuner.inbox_mut();
        s.spawn(move || {
            while let Ok(delivery) = inbox.recv_timeout(None) {
                let message = delivery.message();
                match message.signal() {
                    "set-freq" => {
                        let freq = message.data::<Frequency>().copied().unwrap_or_default();
                        println!("tuner: {} set to {:.1} MHz", delivery.port_name(), freq / 1e6);
                    }
                    "shutdown" => break,
                    other => println!("tuner: ignoring '{other}'"),
                }
            }
        });

        for freq in [88.1e6, 101.5e6, 107.9e6] {
            futures_executor::block_on(accepter.send(Message::with_data("set-freq", freq)))
                .expect("the tuner inbox is open");
        }
        accepter
            .accept(Message::new("shutdown"))
            .expect("the tuner inbox has room");
    });

    Ok(())
}
