// Integration tests follow the organization suggested by Matklad:
// https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod tree_walk;
mod wiring;

use std::sync::Arc;

use mblock::protocol::{ProtocolClass, ProtocolClassRegistry, ProtocolRegistry};

/// Installs a test-friendly subscriber so that `RUST_LOG=mblock=trace` shows
/// the wiring log of a failing test.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Registry shared by all tests.
///
/// * `PC1` is a request/reply protocol,
/// * `PC2` is a one-way data protocol,
/// * `ctl` is a control protocol with several signals per direction.
fn protocols() -> Arc<dyn ProtocolRegistry> {
    let registry: ProtocolClassRegistry = [
        ProtocolClass::new("PC1")
            .incoming(["request"])
            .outgoing(["reply"]),
        ProtocolClass::new("PC2").incoming(["data"]),
        ProtocolClass::new("ctl")
            .incoming(["start", "stop"])
            .outgoing(["started", "stopped", "error"]),
    ]
    .into_iter()
    .collect();

    Arc::new(registry)
}
