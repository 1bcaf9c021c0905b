//! Port definition, composition and connection rules.

use mblock::block::{endpoints_are_compatible, Block, SELF};
use mblock::error::WiringError;
use mblock::port::{Port, PortRole};

use crate::{init_tracing, protocols};

/// `top` with external port `p_in` and child `child` with conjugated external
/// port `q_out`, both of protocol `PC1`.
fn top_and_child() -> (Block, Port) {
    init_tracing();

    let protocols = protocols();

    let mut child = Block::new("child", protocols.clone());
    child
        .define_port("q_out", "PC1", true, PortRole::External)
        .unwrap();

    let mut top = Block::new("/top", protocols);
    let p_in = top
        .define_port("p_in", "PC1", false, PortRole::External)
        .unwrap();
    top.define_component("child", child).unwrap();

    (top, p_in)
}

/// Connection list rendered as `a <-> b` strings, for table comparisons.
fn table(block: &Block) -> Vec<String> {
    block
        .connections()
        .map(|conn| {
            let (ep0, ep1) = conn.endpoints();
            format!("{} <-> {}", ep0, ep1)
        })
        .collect()
}

#[test]
fn wiring_parent_child_scenario() {
    let (mut top, p_in) = top_and_child();

    top.connect("self", "p_in", "child", "q_out").unwrap();
    assert_eq!(top.nconnections(), 1);

    let ep = top.lookup_other_endpoint(&p_in).unwrap();
    assert_eq!(ep.component_name(), "child");
    assert_eq!(ep.port_name(), "q_out");
    assert_eq!(ep.owner(), top.component("child").unwrap().id());
}

#[test]
fn wiring_different_protocols_are_incompatible() {
    let (mut top, _) = top_and_child();
    top.define_port("data", "PC2", true, PortRole::Internal)
        .unwrap();

    let err = top.connect(SELF, "data", "child", "q_out").unwrap_err();

    assert_eq!(
        err,
        WiringError::IncompatibleEndpoints {
            block: "/top".into(),
            first: "self/data".into(),
            second: "child/q_out".into(),
        }
    );
    assert_eq!(top.nconnections(), 0);
}

#[test]
fn wiring_missing_port() {
    let (mut top, _) = top_and_child();
    top.connect(SELF, "p_in", "child", "q_out").unwrap();
    let before = table(&top);

    let err = top
        .connect("self", "missing_port", "child", "q_out")
        .unwrap_err();

    assert!(matches!(err, WiringError::UnknownPort { ref port, .. } if port == "missing_port"));
    assert_eq!(table(&top), before);
}

#[test]
fn wiring_unknown_component() {
    let (mut top, _) = top_and_child();

    let err = top.connect(SELF, "p_in", "stranger", "q_out").unwrap_err();

    assert_eq!(
        err.to_string(),
        "/top: no component named 'stranger'".to_owned()
    );
    assert_eq!(top.nconnections(), 0);
}

#[test]
fn wiring_duplicate_definitions_leave_registries_unchanged() {
    let (mut top, p_in) = top_and_child();
    let child_id = top.component("child").unwrap().id();

    assert!(matches!(
        top.define_port("p_in", "PC2", true, PortRole::Relay),
        Err(WiringError::DuplicatePort { .. })
    ));
    assert!(matches!(
        top.define_port("p_in", "PC1", false, PortRole::External),
        Err(WiringError::DuplicatePort { .. })
    ));
    assert!(matches!(
        top.define_component("child", Block::new("other", protocols())),
        Err(WiringError::DuplicateComponent { .. })
    ));

    let port = top.port("p_in").unwrap();
    assert_eq!(port, &p_in);
    assert_eq!(port.protocol_class_name(), "PC1");
    assert_eq!(port.role(), PortRole::External);
    assert_eq!(top.ports().count(), 1);
    assert_eq!(top.components().count(), 1);
    assert_eq!(top.component("child").unwrap().id(), child_id);
}

#[test]
fn wiring_connect_disconnect_round_trip() {
    let (mut top, _) = top_and_child();
    top.define_port("i_ctl", "ctl", true, PortRole::Internal)
        .unwrap();
    top.component_mut("child")
        .unwrap()
        .define_port("ctl", "ctl", false, PortRole::External)
        .unwrap();
    top.connect(SELF, "i_ctl", "child", "ctl").unwrap();

    let before = table(&top);
    let count = top.nconnections();

    top.connect(SELF, "p_in", "child", "q_out").unwrap();
    assert_eq!(top.nconnections(), count + 1);
    top.disconnect(SELF, "p_in", "child", "q_out").unwrap();

    assert_eq!(top.nconnections(), count);
    assert_eq!(table(&top), before);
}

#[test]
fn wiring_connect_is_symmetric() {
    let (mut top, _) = top_and_child();
    top.connect(SELF, "p_in", "child", "q_out").unwrap();

    for (c0, p0, c1, p1) in [
        (SELF, "p_in", "child", "q_out"),
        ("child", "q_out", SELF, "p_in"),
    ] {
        assert!(matches!(
            top.connect(c0, p0, c1, p1),
            Err(WiringError::AlreadyConnected { .. })
        ));
    }
    assert_eq!(top.nconnections(), 1);

    // Disconnection accepts either order too.
    top.disconnect("child", "q_out", SELF, "p_in").unwrap();
    assert_eq!(top.nconnections(), 0);
}

#[test]
fn wiring_compatibility_is_symmetric() {
    init_tracing();

    let protocols = protocols();
    let mut top = Block::new("top", protocols.clone());
    let mut names = Vec::new();
    for (i, (protocol, conjugated, role)) in [
        ("PC1", false, PortRole::External),
        ("PC1", true, PortRole::External),
        ("PC1", false, PortRole::Relay),
        ("PC1", true, PortRole::Internal),
        ("PC2", false, PortRole::Relay),
        ("PC2", true, PortRole::External),
    ]
    .into_iter()
    .enumerate()
    {
        let name = format!("p{}", i);
        top.define_port(name.clone(), protocol, conjugated, role)
            .unwrap();
        names.push((SELF.to_owned(), name));
    }
    let mut child = Block::new("child", protocols);
    child.define_port("x", "PC1", false, PortRole::Relay).unwrap();
    child.define_port("y", "PC2", true, PortRole::External).unwrap();
    top.define_component("child", child).unwrap();
    names.push(("child".to_owned(), "x".to_owned()));
    names.push(("child".to_owned(), "y".to_owned()));

    let endpoints: Vec<_> = names
        .iter()
        .map(|(c, p)| top.check_and_resolve_endpoint(c, p).unwrap())
        .collect();

    let mut compatible_pairs = 0;
    for ep0 in &endpoints {
        for ep1 in &endpoints {
            let forward = endpoints_are_compatible(ep0, ep1);
            assert_eq!(forward, endpoints_are_compatible(ep1, ep0));
            if forward {
                compatible_pairs += 1;
            }
        }
    }
    assert!(compatible_pairs > 0);
}

#[test]
fn wiring_relay_chain() {
    init_tracing();

    let protocols = protocols();

    let mut leaf = Block::new("leaf", protocols.clone());
    leaf.define_port("in", "ctl", false, PortRole::External)
        .unwrap();

    let mut inner = Block::new("inner", protocols.clone());
    inner
        .define_port("r", "ctl", false, PortRole::Relay)
        .unwrap();
    inner.define_component("leaf", leaf).unwrap();
    inner.connect(SELF, "r", "leaf", "in").unwrap();

    let mut outer = Block::new("outer", protocols.clone());
    outer
        .define_port("r", "ctl", false, PortRole::Relay)
        .unwrap();
    outer.define_component("inner", inner).unwrap();
    outer.connect(SELF, "r", "inner", "r").unwrap();

    let mut driver = Block::new("driver", protocols.clone());
    let out = driver
        .define_port("out", "ctl", true, PortRole::External)
        .unwrap();

    let mut top = Block::new("/top", protocols);
    top.define_component("outer", outer).unwrap();
    top.define_component("driver", driver).unwrap();
    top.connect("driver", "out", "outer", "r").unwrap();

    // Follow the chain of relays down to the leaf.
    let mut block = &top;
    let mut port = out;
    let mut hops = Vec::new();
    while let Some(ep) = block.lookup_other_endpoint(&port) {
        hops.push(format!("{}:{}", block.fullname(), ep));
        if ep.component_name() == SELF {
            break;
        }
        let next = block.component(ep.component_name()).unwrap();
        if ep.port().role() != PortRole::Relay {
            break;
        }
        block = next;
        port = ep.port().clone();
    }

    assert_eq!(
        hops,
        [
            "/top:outer/r",
            "/top/outer:inner/r",
            "/top/outer/inner:leaf/in",
        ]
    );

    // Seen from inside, `outer/r` behaves as a conjugated port even though
    // `driver/out`, itself conjugated, could connect to it from outside.
    let mut tap = Block::new("tap", crate::protocols());
    tap.define_port("in", "ctl", true, PortRole::External)
        .unwrap();
    let outer = top.component_mut("outer").unwrap();
    outer.define_component("tap", tap).unwrap();
    assert!(matches!(
        outer.connect(SELF, "r", "tap", "in"),
        Err(WiringError::IncompatibleEndpoints { .. })
    ));
    assert_eq!(outer.nconnections(), 1);
}

#[test]
fn wiring_disconnect_component() {
    init_tracing();

    let protocols = protocols();
    let mut top = Block::new("top", protocols.clone());
    for name in ["a", "b", "c"] {
        let mut child = Block::new(name, protocols.clone());
        child
            .define_port("req", "PC1", true, PortRole::External)
            .unwrap();
        child
            .define_port("rep", "PC1", false, PortRole::External)
            .unwrap();
        top.define_component(name, child).unwrap();
    }
    top.connect("a", "req", "b", "rep").unwrap();
    top.connect("b", "req", "c", "rep").unwrap();
    top.connect("c", "req", "a", "rep").unwrap();

    top.disconnect_component("b");
    assert_eq!(table(&top), ["c/req <-> a/rep"]);

    top.disconnect_component("b");
    assert_eq!(table(&top), ["c/req <-> a/rep"]);

    top.disconnect_all();
    assert_eq!(top.nconnections(), 0);
    top.disconnect_all();
    assert_eq!(top.nconnections(), 0);
}

#[test]
fn wiring_parent_back_reference() {
    let (top, _) = top_and_child();
    let child = top.component("child").unwrap();

    let parent = top.find(child.parent().unwrap()).unwrap();
    assert_eq!(parent.fullname(), "/top");
    assert!(top.parent().is_none());
}
