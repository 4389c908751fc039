//! Integration tests for the diagram mutator.

mod helpers;

use procflow::diagram::{self, NewNode, NodeKind};

fn lines(source: &str) -> Vec<&str> {
    source.split('\n').collect()
}

fn assert_fixed_point(source: &str) {
    assert_eq!(diagram::validate(source), source, "mutator output is not repaired");
}

#[test]
fn relabel_touches_one_line() {
    let out = diagram::set_node_label(helpers::ONBOARDING, "B", "Check ID").unwrap();
    assert_eq!(helpers::changed_lines(helpers::ONBOARDING, &out), vec![4]);
    assert_eq!(lines(&out)[4], "        B[\"Check ID (1 hour)\"]");

    let node = diagram::parse(&out).node("B").cloned().unwrap();
    assert_eq!(node.label, "Check ID");
    assert_eq!(node.time_estimate.as_deref(), Some("1 hour"));
    assert_fixed_point(&out);
}

#[test]
fn time_estimate_replaces_suffix() {
    let out = diagram::set_node_time_estimate(helpers::ONBOARDING, "A", "45 minutes").unwrap();
    assert_eq!(helpers::changed_lines(helpers::ONBOARDING, &out), vec![2]);
    let a = diagram::parse(&out).node("A").cloned().unwrap();
    assert_eq!(a.label, "Receive application");
    assert_eq!(a.time_estimate.as_deref(), Some("45 minutes"));

    let cleared = diagram::set_node_time_estimate(&out, "A", "").unwrap();
    let a = diagram::parse(&cleared).node("A").cloned().unwrap();
    assert_eq!(a.raw_label, "Receive application");
    assert_eq!(a.time_estimate, None);
}

#[test]
fn editing_implicit_node_materializes_it() {
    let out = diagram::set_node_time_estimate(helpers::ONBOARDING, "F", "20 min").unwrap();
    let out_lines = lines(&out);
    assert_eq!(out_lines.len(), lines(helpers::ONBOARDING).len() + 1);
    assert_eq!(out_lines[2], "    F[\"F (20 min)\"]");

    let model = diagram::parse(&out);
    let f = model.node("F").unwrap();
    assert!(!f.is_implicit());
    assert_eq!(f.time_estimate.as_deref(), Some("20 min"));
    assert_eq!(model.connections.len(), 8);
    assert_fixed_point(&out);
}

#[test]
fn materialized_node_goes_before_first_edge() {
    let out = diagram::set_node_time_estimate("graph TD\nA-->B", "B", "10 min").unwrap();
    assert_eq!(out, "graph TD\nB[\"B (10 min)\"]\nA-->B");
}

#[test]
fn connection_label_rewrites_edge() {
    let out = diagram::set_connection_label(helpers::ONBOARDING, "E", "F", "Handoff").unwrap();
    assert_eq!(helpers::changed_lines(helpers::ONBOARDING, &out), vec![12]);
    assert_eq!(lines(&out)[12], "    E -->|\"Handoff\"| F");
    let model = diagram::parse(&out);
    let edge = model.connections_between("E", "F").next().unwrap();
    assert_eq!(edge.label.as_deref(), Some("Handoff"));
}

#[test]
fn add_node_wires_generated_id() {
    let mut node = NewNode::new("Escalate");
    node.time_estimate = Some("1 day".into());
    node.connect_from = Some("E".into());
    node.connect_to = Some("F".into());

    let inserted = diagram::add_node(helpers::ONBOARDING, &node).unwrap();
    assert_eq!(inserted.node_id, "G");
    assert!(inserted.source.contains(
        "    G[\"Escalate (1 day)\"]\n    E --> G\n    G --> F\n    start("
    ));

    let model = diagram::parse(&inserted.source);
    assert_eq!(model.node("G").unwrap().kind, NodeKind::Process);
    assert!(model.connections_between("E", "G").next().is_some());
    assert!(model.connections_between("G", "F").next().is_some());
    assert_fixed_point(&inserted.source);
}

#[test]
fn add_node_rejects_duplicates_and_unknown_endpoints() {
    let mut node = NewNode::new("Again");
    node.id = Some("B".into());
    let err = diagram::add_node(helpers::ONBOARDING, &node).unwrap_err();
    assert_eq!(err.code, "M003");

    let mut node = NewNode::new("Dangling");
    node.connect_from = Some("nowhere".into());
    let err = diagram::add_node(helpers::ONBOARDING, &node).unwrap_err();
    assert_eq!(err.code, "M001");
    assert_eq!(err.node_id.as_deref(), Some("nowhere"));

    let err = diagram::add_node(helpers::ONBOARDING, &NewNode::new("   ")).unwrap_err();
    assert_eq!(err.code, "M005");
}

#[test]
fn add_connection_follows_last_edge() {
    let out = diagram::add_connection(helpers::ONBOARDING, "A", "C", Some("skip")).unwrap();
    let out_lines = lines(&out);
    assert_eq!(out_lines[13], "    F --> finish([\"Done\"])");
    assert_eq!(out_lines[14], "    A -->|\"skip\"| C");
    assert_fixed_point(&out);

    let err = diagram::add_connection(helpers::ONBOARDING, "A", "B", None).unwrap_err();
    assert_eq!(err.code, "M006");
    let err = diagram::add_connection(helpers::ONBOARDING, "A", "Q", None).unwrap_err();
    assert_eq!(err.code, "M001");
}

#[test]
fn remove_connection_keeps_inline_declaration() {
    let out = diagram::remove_connection(helpers::ONBOARDING, "C", "D").unwrap();
    let model = diagram::parse(&out);
    assert!(model.connections_between("C", "D").next().is_none());

    let d = model.node("D").unwrap();
    assert!(!d.is_implicit());
    assert_eq!(d.label, "Request missing documents");
    assert_eq!(lines(&out)[9], "    D[\"Request missing documents (2 days)\"]");
    assert_fixed_point(&out);
}

#[test]
fn removing_missing_connection_is_not_an_error() {
    let out = diagram::remove_connection(helpers::ONBOARDING, "A", "finish").unwrap();
    assert_eq!(out, diagram::validate(helpers::ONBOARDING));
}

#[test]
fn remove_node_drops_its_edges() {
    let out = diagram::remove_node(helpers::ONBOARDING, "D").unwrap();
    let mut expected = lines(helpers::ONBOARDING);
    expected.drain(9..=10);
    assert_eq!(out, expected.join("\n"));

    let model = diagram::parse(&out);
    assert!(!model.contains_node("D"));
    assert!(model.connections.iter().all(|c| c.from_id != "D" && c.to_id != "D"));
}

#[test]
fn remove_node_respects_floor() {
    let err = diagram::remove_node("graph TD\nA-->B", "A").unwrap_err();
    assert_eq!(err.code, "M004");

    // Dropping the hub would leave no nodes at all.
    let err = diagram::remove_node("graph TD\nA-->B\nB-->C", "B").unwrap_err();
    assert_eq!(err.code, "M004");
}

#[test]
fn remove_node_named_after_closer_keyword() {
    let source = "graph TD\nA[\"Open\"] --> B[\"Work\"]\nB --> end\nsubgraph \"G\"\n  C[\"Check\"] --> end\nend\nstyle end fill:#f00";
    let out = diagram::remove_node(source, "end").unwrap();
    assert_eq!(
        out,
        "graph TD\nA[\"Open\"] --> B[\"Work\"]\nsubgraph \"G\"\n  C[\"Check\"]\nend"
    );
    assert!(helpers::groups_balanced(&out));
}

#[test]
fn unknown_node_reports_id() {
    let err = diagram::set_node_label(helpers::ONBOARDING, "ZZ", "x").unwrap_err();
    assert_eq!(err.code, "M001");
    assert_eq!(err.node_id.as_deref(), Some("ZZ"));

    let err = diagram::set_connection_label(helpers::ONBOARDING, "A", "F", "x").unwrap_err();
    assert_eq!(err.code, "M002");

    let err = diagram::set_node_label(helpers::ONBOARDING, "B", "  ").unwrap_err();
    assert_eq!(err.code, "M005");
    assert_eq!(err.node_id.as_deref(), Some("B"));
}
