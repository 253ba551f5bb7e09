//! Unit tests for the core graph store

use crate::*;

fn sym_in(file: &str, line: u32, name: &str, kind: SymbolKind) -> Symbol {
    let id = SymbolId::new(file, line, name);
    let package = id.package().to_string();
    Symbol {
        id,
        name: name.to_string(),
        kind,
        file: file.to_string(),
        start_line: line,
        end_line: line + 5,
        start_col: 0,
        end_col: 0,
        package,
        exported: name.chars().next().is_some_and(|c| c.is_uppercase()),
        language: "go".to_string(),
        signature: None,
    }
}

fn func(file: &str, line: u32, name: &str) -> Symbol {
    sym_in(file, line, name, SymbolKind::Function)
}

/// Call graph from name pairs; each name becomes a function in src/app.
fn call_graph(edges: &[(&str, &str)]) -> CodeGraph {
    let mut builder = GraphBuilder::new();
    let mut line = 1;
    let mut id_of = std::collections::HashMap::new();
    for &(a, b) in edges {
        for name in [a, b] {
            if !id_of.contains_key(name) {
                let s = func("src/app/main.go", line, name);
                id_of.insert(name.to_string(), s.id.clone());
                builder.add_node(s).unwrap();
                line += 10;
            }
        }
    }
    for &(a, b) in edges {
        builder
            .add_edge(
                &id_of[a],
                &id_of[b],
                EdgeKind::Calls,
                SourceLocation::new("src/app/main.go", line),
            )
            .unwrap();
        line += 1;
    }
    builder.freeze()
}

#[test]
fn id_components_follow_canonical_form() {
    let id = SymbolId::new("src/server/router.go", 42, "Dispatch");
    assert_eq!(id.as_str(), "src/server/router.go:42:Dispatch");
    assert_eq!(id.package(), "src/server");
    assert_eq!(id.short_name(), "Dispatch");
    assert_eq!(id.line(), 42);
}

#[test]
fn id_components_degrade_on_opaque_ids() {
    let id = SymbolId::from("fmt.Println");
    assert_eq!(id.package(), "");
    assert_eq!(id.short_name(), "");
    assert_eq!(id.line(), 0);
}

#[test]
fn kind_tags_are_lowercase() {
    assert_eq!(SymbolKind::Function.as_str(), "function");
    assert_eq!(SymbolKind::External.as_str(), "external");
    assert_eq!(EdgeKind::Calls.as_str(), "calls");
    assert_eq!(EdgeKind::Overrides.as_str(), "overrides");
}

#[test]
fn symbol_equality_is_by_id() {
    let a = func("src/a.go", 1, "f");
    let mut b = a.clone();
    b.end_line = 99;
    assert_eq!(a, b);
    assert!(!a.same_attributes(&b));
}

#[test]
fn add_node_is_idempotent_for_identical_records() {
    let mut builder = GraphBuilder::new();
    let s = func("src/a.go", 1, "f");
    let first = builder.add_node(s.clone()).unwrap();
    let second = builder.add_node(s).unwrap();
    assert_eq!(first, second);
    assert_eq!(builder.node_count(), 1);
}

#[test]
fn add_node_rejects_conflicting_duplicate() {
    let mut builder = GraphBuilder::new();
    let s = func("src/a.go", 1, "f");
    builder.add_node(s.clone()).unwrap();
    let mut conflicting = s;
    conflicting.end_line = 400;
    match builder.add_node(conflicting) {
        Err(Error::DuplicateId(id)) => assert_eq!(id, "src/a.go:1:f"),
        other => panic!("expected DuplicateId, got {other:?}"),
    }
}

#[test]
fn add_edge_requires_known_endpoints() {
    let mut builder = GraphBuilder::new();
    let s = func("src/a.go", 1, "f");
    let known = s.id.clone();
    builder.add_node(s).unwrap();
    let missing = SymbolId::from("src/a.go:9:ghost");
    let err = builder
        .add_edge(&known, &missing, EdgeKind::Calls, SourceLocation::default())
        .unwrap_err();
    assert!(matches!(err, Error::UnknownNode(_)));
}

#[test]
fn identical_edges_are_deduplicated_but_distinct_sites_kept() {
    let mut builder = GraphBuilder::new();
    let a = func("src/a.go", 1, "f");
    let b = func("src/a.go", 20, "g");
    let (ida, idb) = (a.id.clone(), b.id.clone());
    builder.add_node(a).unwrap();
    builder.add_node(b).unwrap();

    let site = SourceLocation::new("src/a.go", 3);
    builder.add_edge(&ida, &idb, EdgeKind::Calls, site.clone()).unwrap();
    builder.add_edge(&ida, &idb, EdgeKind::Calls, site).unwrap();
    builder
        .add_edge(&ida, &idb, EdgeKind::Calls, SourceLocation::new("src/a.go", 7))
        .unwrap();
    assert_eq!(builder.edge_count(), 2);
}

#[test]
fn freeze_preserves_insertion_order() {
    let g = call_graph(&[("main", "init"), ("init", "run"), ("main", "run")]);
    let names: Vec<&str> = g.nodes().map(|(_, s)| s.name.as_str()).collect();
    assert_eq!(names, ["main", "init", "run"]);

    let main = g.resolve("src/app/main.go:1:main").unwrap();
    let targets: Vec<&str> = g
        .outgoing(main)
        .iter()
        .map(|e| g.symbol(e.other).name.as_str())
        .collect();
    assert_eq!(targets, ["init", "run"]);
    assert!(g.is_frozen());
}

#[test]
fn incoming_mirrors_outgoing() {
    let g = call_graph(&[
        ("main", "init"),
        ("main", "run"),
        ("init", "run"),
        ("run", "main"),
    ]);
    for (idx, _) in g.nodes() {
        let mut from_incoming: Vec<(u32, &str, String, u32)> = g
            .incoming(idx)
            .iter()
            .map(|e| (e.other.0, e.kind.as_str(), e.site.file.clone(), e.site.line))
            .collect();
        let mut from_outgoing: Vec<(u32, &str, String, u32)> = g
            .nodes()
            .flat_map(|(src, _)| {
                g.outgoing(src)
                    .iter()
                    .filter(|e| e.other == idx)
                    .map(move |e| (src.0, e.kind.as_str(), e.site.file.clone(), e.site.line))
            })
            .collect();
        from_incoming.sort();
        from_outgoing.sort();
        assert_eq!(from_incoming, from_outgoing, "mirror broken at {idx}");
    }
}

#[test]
fn index_buckets_preserve_insertion_order() {
    let mut builder = GraphBuilder::new();
    let s1 = sym_in("src/a/x.go", 1, "Handle", SymbolKind::Struct);
    let s2 = sym_in("src/b/y.go", 5, "Handle", SymbolKind::Function);
    let s3 = sym_in("src/a/x.go", 30, "other", SymbolKind::Function);
    builder.add_node(s1).unwrap();
    builder.add_node(s2).unwrap();
    builder.add_node(s3).unwrap();
    let g = builder.freeze();

    let named: Vec<&str> = g
        .symbols_named("Handle")
        .map(|(_, s)| s.file.as_str())
        .collect();
    assert_eq!(named, ["src/a/x.go", "src/b/y.go"]);

    let functions = g.index().of_kind(SymbolKind::Function);
    assert_eq!(functions.len(), 2);
    assert_eq!(g.index().in_file("src/a/x.go").len(), 2);
    assert!(g.get("src/b/y.go:5:Handle").is_some());
}

#[test]
fn search_ranks_exact_before_prefix() {
    let mut builder = GraphBuilder::new();
    for (i, name) in ["parser", "Parse", "parse", "parseExpr", "other"].into_iter().enumerate() {
        builder
            .add_node(func("src/p/p.go", (i as u32 + 1) * 10, name))
            .unwrap();
    }
    let g = builder.freeze();

    let hits: Vec<&str> = g
        .search("parse", 0)
        .into_iter()
        .map(|idx| g.symbol(idx).name.as_str())
        .collect();
    assert_eq!(hits, ["parse", "parser", "Parse", "parseExpr"]);

    assert_eq!(g.search("parse", 2).len(), 2);
    assert!(g.search("nothing", 0).is_empty());
}

#[test]
fn external_symbols_have_no_file() {
    let ext = Symbol::external("fmt.Println");
    assert_eq!(ext.kind, SymbolKind::External);
    assert!(ext.file.is_empty());
    assert_eq!(ext.name, "fmt.Println");
}

#[test]
fn handle_publish_and_snapshot() {
    let handle = GraphHandle::new();
    assert!(handle.snapshot().is_none());

    let first = handle.publish(call_graph(&[("a", "b")]));
    let snap = handle.snapshot().unwrap();
    assert_eq!(snap.built_at_milli(), first.built_at_milli());

    handle.publish(call_graph(&[("a", "b"), ("b", "c")]));
    let replaced = handle.snapshot().unwrap();
    assert_eq!(replaced.node_count(), 3);
}

#[test]
fn hierarchical_groups_by_package() {
    let mut builder = GraphBuilder::new();
    builder.add_node(func("src/api/h.go", 1, "serve")).unwrap();
    builder.add_node(func("src/api/h.go", 20, "route")).unwrap();
    builder.add_node(func("src/db/q.go", 1, "query")).unwrap();
    let g = builder.freeze();

    let view = g.hierarchical();
    assert_eq!(view.package_count(), 2);
    let pkgs: Vec<&str> = view.packages().map(|(p, _)| p).collect();
    assert_eq!(pkgs, ["src/api", "src/db"]);
    assert_eq!(view.members("src/api").len(), 2);

    let all: Vec<NodeIdx> = g.nodes().map(|(i, _)| i).collect();
    assert_eq!(view.dominant_package(&all), "src/api");
}

#[test]
fn dominant_package_tie_breaks_lexicographically() {
    let mut builder = GraphBuilder::new();
    builder.add_node(func("src/zz/a.go", 1, "f1")).unwrap();
    builder.add_node(func("src/aa/b.go", 1, "f2")).unwrap();
    let g = builder.freeze();
    let all: Vec<NodeIdx> = g.nodes().map(|(i, _)| i).collect();
    assert_eq!(g.hierarchical().dominant_package(&all), "src/aa");
}

#[test]
fn induced_subgraph_keeps_internal_edges_only() {
    let g = call_graph(&[("main", "init"), ("init", "run"), ("run", "done"), ("main", "done")]);
    let init = g.resolve("src/app/main.go:11:init").unwrap();
    let run = g.resolve("src/app/main.go:21:run").unwrap();

    let sub = g.induced_subgraph(&[init, run]).unwrap();
    assert_eq!(sub.node_count(), 2);
    assert_eq!(sub.edge_count(), 1);
    assert!(sub.get(g.symbol(init).id.as_str()).is_some());

    assert!(matches!(
        g.induced_subgraph(&[]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn symbol_serialization_round_trips() {
    let sym = func("src/a.go", 1, "f");
    let json = serde_json::to_string(&sym).unwrap();
    let back: Symbol = serde_json::from_str(&json).unwrap();
    assert!(sym.same_attributes(&back));

    assert_eq!(
        serde_json::to_string(&SymbolKind::Function).unwrap(),
        "\"function\""
    );
    assert_eq!(serde_json::to_string(&EdgeKind::Calls).unwrap(), "\"calls\"");
}

#[test]
fn edge_records_feed_the_builder() {
    let mut builder = GraphBuilder::new();
    let a = func("src/a.go", 1, "f");
    let b = func("src/a.go", 20, "g");
    let edge = Edge {
        from: a.id.clone(),
        to: b.id.clone(),
        kind: EdgeKind::Calls,
        site: SourceLocation::new("src/a.go", 3),
    };
    builder.add_node(a).unwrap();
    builder.add_node(b).unwrap();
    builder.add_edge_record(edge).unwrap();
    assert_eq!(builder.edge_count(), 1);
}

#[test]
fn stats_tally_kinds() {
    let g = call_graph(&[("main", "init"), ("init", "run")]);
    let stats = g.stats();
    assert_eq!(stats.nodes, 3);
    assert_eq!(stats.edges, 2);
    assert_eq!(stats.symbols_by_kind["function"], 3);
    assert_eq!(stats.edges_by_kind["calls"], 2);
}
