//! End-to-end query tests over small fixture graphs

use arbor_core::{
    CancelToken, CodeGraph, EdgeKind, Error, GraphBuilder, GraphHandle, SourceLocation, Symbol,
    SymbolId, SymbolKind,
};

use crate::queries::*;

fn init_logging() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn func(file: &str, line: u32, name: &str) -> Symbol {
    let id = SymbolId::new(file, line, name);
    let package = id.package().to_string();
    Symbol {
        id,
        name: name.to_string(),
        kind: SymbolKind::Function,
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

fn graph_of(edges: &[(&str, &str)], isolated: &[&str]) -> CodeGraph {
    let mut builder = GraphBuilder::new();
    let mut line = 1;
    let mut id_of = std::collections::HashMap::new();
    let intern = |builder: &mut GraphBuilder,
                      id_of: &mut std::collections::HashMap<String, SymbolId>,
                      line: &mut u32,
                      name: &str| {
        if !id_of.contains_key(name) {
            let s = func("src/app/main.go", *line, name);
            id_of.insert(name.to_string(), s.id.clone());
            builder.add_node(s).unwrap();
            *line += 10;
        }
    };
    for &(a, b) in edges {
        intern(&mut builder, &mut id_of, &mut line, a);
        intern(&mut builder, &mut id_of, &mut line, b);
    }
    for &name in isolated {
        intern(&mut builder, &mut id_of, &mut line, name);
    }
    for (i, &(a, b)) in edges.iter().enumerate() {
        builder
            .add_edge(
                &id_of[a],
                &id_of[b],
                EdgeKind::Calls,
                SourceLocation::new("src/app/main.go", 1000 + i as u32),
            )
            .unwrap();
    }
    builder.freeze()
}

fn handle_of(edges: &[(&str, &str)]) -> GraphHandle {
    GraphHandle::published(graph_of(edges, &[]))
}

/// Linear chain with a fork: `main→init→A`, `A→{B,C}`, `B→D`.
fn fork_handle() -> GraphHandle {
    handle_of(&[
        ("main", "init"),
        ("init", "A"),
        ("A", "B"),
        ("A", "C"),
        ("B", "D"),
    ])
}

fn hop_names(path: &[crate::report::PathHop]) -> Vec<&str> {
    path.iter().map(|h| h.name.as_str()).collect()
}

// ── Paths ───────────────────────────────────────────────

#[test]
fn find_path_walks_the_fork_chain() {
    init_logging();
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_path(
        &handle,
        PathParams {
            from: "main".into(),
            to: "D".into(),
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert_eq!(report.length, 4);
    assert!(report.found);
    assert_eq!(hop_names(&report.path), ["main", "init", "A", "B", "D"]);
    assert_eq!(out.trace.action, "find_path");
    assert_eq!(out.trace.tool, "bfs_shortest_path");
    assert_eq!(out.trace.target, "main");
}

#[test]
fn find_path_unknown_symbol_is_not_found() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_path(
        &handle,
        PathParams {
            from: "main".into(),
            to: "ghost".into(),
        },
        &cancel,
    );
    assert!(matches!(out.result, Err(Error::NotFound(_))));
    assert!(out.trace.error.is_some());
    assert_eq!(out.trace.metadata["error_kind"], "not_found");
}

#[test]
fn find_path_missing_argument_is_invalid() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_path(&handle, PathParams::default(), &cancel);
    assert!(matches!(out.result, Err(Error::InvalidArgument(_))));
}

#[test]
fn find_path_unreachable_is_success() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_path(
        &handle,
        PathParams {
            from: "D".into(),
            to: "main".into(),
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert!(!report.found);
    assert_eq!(report.length, -1);
    assert!(report.path.is_empty());
}

// ── Critical path / dominators / LCD ────────────────────

#[test]
fn critical_path_is_the_dominator_chain() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_critical_path(
        &handle,
        CriticalPathParams {
            target: "D".into(),
            entry: None,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert!(report.entry_auto_detected);
    assert_eq!(hop_names(&report.path), ["main", "init", "A", "B", "D"]);
    assert_eq!(out.trace.metadata["converged"], "true");
}

#[test]
fn critical_path_to_isolated_node_reports_unreachable() {
    init_logging();
    let handle = GraphHandle::published(graph_of(
        &[
            ("main", "init"),
            ("init", "A"),
            ("A", "B"),
            ("A", "C"),
            ("B", "D"),
        ],
        &["Z"],
    ));
    let cancel = CancelToken::new();
    let out = find_critical_path(
        &handle,
        CriticalPathParams {
            target: "Z".into(),
            entry: None,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert_eq!(report.length, 0);
    assert!(report.path.is_empty());
    assert!(report.explanation.contains("not reachable"));
}

#[test]
fn dominators_of_the_fork_target() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_dominators(
        &handle,
        DominatorsParams {
            target: "D".into(),
            entry: None,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert_eq!(report.depth, 4);
    assert!(report.entry_auto_detected);
    let names: Vec<&str> = report.dominators.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["D", "B", "A", "init", "main"]);
    assert_eq!(
        report.immediate_dominator.as_deref(),
        Some("src/app/main.go:31:B")
    );
    assert_eq!(report.subtree, vec!["src/app/main.go:51:D".to_string()]);
}

#[test]
fn dominators_of_unreachable_target_are_empty_success() {
    let handle = GraphHandle::published(graph_of(&[("main", "A")], &["Z"]));
    let cancel = CancelToken::new();
    let out = find_dominators(
        &handle,
        DominatorsParams {
            target: "Z".into(),
            entry: None,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert!(report.dominators.is_empty());
    assert!(report.subtree.is_empty());
    assert_eq!(report.depth, 0);
}

#[test]
fn lcd_on_the_fork_graph_is_the_fork_point() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = lowest_common_dominator(
        &handle,
        LcdParams {
            targets: vec!["C".into(), "D".into()],
            entry: None,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert_eq!(report.lcd.unwrap().name, "A");
    assert_eq!(report.depth, Some(2));
}

#[test]
fn lcd_matches_the_two_branch_fixture() {
    let handle = handle_of(&[
        ("main", "init"),
        ("init", "A"),
        ("init", "B"),
        ("A", "C"),
        ("A", "D"),
        ("B", "E"),
        ("B", "F"),
    ]);
    let cancel = CancelToken::new();

    let lcd_of = |targets: &[&str]| {
        let out = lowest_common_dominator(
            &handle,
            LcdParams {
                targets: targets.iter().map(|s| s.to_string()).collect(),
                entry: None,
            },
            &cancel,
        );
        out.result.unwrap().lcd.unwrap().name
    };
    assert_eq!(lcd_of(&["C", "D"]), "A");
    assert_eq!(lcd_of(&["C", "E"]), "init");
    assert_eq!(lcd_of(&["C", "D", "E", "F"]), "init");
}

#[test]
fn lcd_needs_two_targets() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = lowest_common_dominator(
        &handle,
        LcdParams {
            targets: vec!["C".into()],
            entry: None,
        },
        &cancel,
    );
    assert!(matches!(out.result, Err(Error::InvalidArgument(_))));
}

#[test]
fn lcd_with_unresolved_target_is_not_found() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = lowest_common_dominator(
        &handle,
        LcdParams {
            targets: vec!["C".into(), "ghost".into()],
            entry: None,
        },
        &cancel,
    );
    assert!(matches!(out.result, Err(Error::NotFound(_))));
}

// ── Cycles ──────────────────────────────────────────────

#[test]
fn cycles_query_reports_the_triangle() {
    let handle = handle_of(&[("X", "Y"), ("Y", "Z"), ("Z", "X"), ("Q", "X")]);
    let cancel = CancelToken::new();
    let out = find_cycles(&handle, CyclesParams::default(), &cancel);
    let report = out.result.unwrap();
    assert_eq!(report.cycle_count, 1);
    let cycle = &report.cycles[0];
    assert_eq!(cycle.cycle_number, 1);
    assert_eq!(cycle.length, 3);
    let names: Vec<&str> = cycle.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["X", "Y", "Z"]);
}

#[test]
fn cycles_on_acyclic_graph_is_empty_success_with_trace() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_cycles(&handle, CyclesParams::default(), &cancel);
    let report = out.result.unwrap();
    assert_eq!(report.cycle_count, 0);
    assert_eq!(out.trace.metadata["cycle_count"], "0");
    assert!(out.trace.error.is_none());
}

// ── Dead code ───────────────────────────────────────────

#[test]
fn dead_code_finds_the_orphan_root() {
    let handle = handle_of(&[("main", "A"), ("B", "C")]);
    let cancel = CancelToken::new();
    let out = find_dead_code(
        &handle,
        DeadCodeParams {
            include_exported: true,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    let dead: Vec<&str> = report.dead.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(dead, ["B"]);
    assert_eq!(report.entry_points.len(), 1);
    assert!(report.entry_points[0].ends_with(":main"));
}

#[test]
fn dead_code_skips_exported_symbols_by_default() {
    let handle = handle_of(&[("main", "A"), ("B", "C")]);
    let cancel = CancelToken::new();
    let out = find_dead_code(&handle, DeadCodeParams::default(), &cancel);
    // `B` is uppercase, hence exported in the fixture, hence skipped.
    assert!(out.result.unwrap().dead.is_empty());
}

// ── Communities ─────────────────────────────────────────

fn two_cliques() -> CodeGraph {
    let mut builder = GraphBuilder::new();
    let mut ids = Vec::new();
    for group in ["a", "b"] {
        for i in 0..5 {
            let s = func(
                &format!("src/{group}/mod.go"),
                1 + i * 10,
                &format!("{group}{i}"),
            );
            ids.push(s.id.clone());
            builder.add_node(s).unwrap();
        }
    }
    for offset in [0, 5] {
        for i in 0..5 {
            for j in (i + 1)..5 {
                builder
                    .add_edge(
                        &ids[offset + i],
                        &ids[offset + j],
                        EdgeKind::Calls,
                        SourceLocation::new("src/x.go", (offset + i * 5 + j) as u32),
                    )
                    .unwrap();
            }
        }
    }
    builder
        .add_edge(&ids[0], &ids[5], EdgeKind::Calls, SourceLocation::new("src/x.go", 999))
        .unwrap();
    builder.freeze()
}

#[test]
fn communities_split_the_cliques_and_expose_the_bridge() {
    init_logging();
    let handle = GraphHandle::published(two_cliques());
    let cancel = CancelToken::new();
    let out = find_communities(&handle, CommunitiesParams::default(), &cancel);
    let report = out.result.unwrap();

    assert_eq!(report.community_count, 2);
    assert!(report.modularity > 0.3, "modularity {}", report.modularity);
    assert!(report.converged);
    assert_eq!(report.communities[0].size, 5);
    assert_eq!(report.communities[0].dominant_package, "src/a");
    assert_eq!(report.communities[1].dominant_package, "src/b");
    assert!(!report.communities[0].is_cross_package);

    assert_eq!(report.cross_community_edges.len(), 1);
    let bridge = &report.cross_community_edges[0];
    assert!(bridge.source.ends_with(":a0"));
    assert!(bridge.target.ends_with(":b0"));
    assert_eq!(bridge.source_community, 0);
    assert_eq!(bridge.target_community, 1);
}

#[test]
fn communities_are_cached_per_graph_version() {
    let handle = GraphHandle::published(two_cliques());
    let cancel = CancelToken::new();
    let first = find_communities(&handle, CommunitiesParams::default(), &cancel);
    assert_eq!(first.trace.metadata["cache"], "miss");
    let second = find_communities(&handle, CommunitiesParams::default(), &cancel);
    assert_eq!(second.trace.metadata["cache"], "hit");
    assert_eq!(
        first.result.unwrap().modularity.to_bits(),
        second.result.unwrap().modularity.to_bits()
    );
}

#[test]
fn community_parameters_clamp_instead_of_failing() {
    let handle = GraphHandle::published(two_cliques());
    let cancel = CancelToken::new();
    let out = find_communities(
        &handle,
        CommunitiesParams {
            resolution: 99.0,
            min_size: 0,
        },
        &cancel,
    );
    assert!(out.result.is_ok());
    assert_eq!(out.trace.metadata["resolution"], "5");
    assert_eq!(out.trace.metadata["min_size"], "1");
}

#[test]
fn module_api_scores_the_bridged_entry_point() {
    let handle = GraphHandle::published(two_cliques());
    let cancel = CancelToken::new();
    let out = module_api(&handle, CommunitiesParams::default(), &cancel);
    let report = out.result.unwrap();
    assert_eq!(report.communities.len(), 2);

    // Community 1 is the b-clique; its API is the bridge target b0.
    let b = &report.communities[1];
    assert_eq!(b.api.len(), 1);
    assert!(b.api[0].id.ends_with(":b0"));
    assert_eq!(b.api[0].external_callers, 1);
    assert!((b.api[0].coverage - 1.0).abs() < 1e-9);

    // Nothing calls into the a-clique; its API falls back to internal roots.
    let a = &report.communities[0];
    assert_eq!(a.api.len(), 1);
    assert!(a.api[0].id.ends_with(":a0"));
    assert_eq!(a.api[0].external_callers, 0);
}

#[test]
fn report_serialization_uses_contract_field_names() {
    let handle = GraphHandle::published(two_cliques());
    let cancel = CancelToken::new();

    let out = find_communities(&handle, CommunitiesParams::default(), &cancel);
    let value = serde_json::to_value(out.result.unwrap()).unwrap();
    for key in [
        "modularity",
        "community_count",
        "converged",
        "iterations",
        "communities",
        "cross_package_communities",
        "cross_community_edges",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    let community = &value["communities"][0];
    for key in [
        "id",
        "size",
        "dominant_package",
        "is_cross_package",
        "connectivity",
        "internal_edges",
        "external_edges",
        "members",
    ] {
        assert!(community.get(key).is_some(), "missing communities[].{key}");
    }

    let path = find_path(
        &handle,
        PathParams {
            from: "a0".into(),
            to: "b0".into(),
        },
        &cancel,
    );
    let value = serde_json::to_value(path.result.unwrap()).unwrap();
    for key in ["from", "to", "length", "found", "path"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    let hop = &value["path"][0];
    for key in ["hop", "id", "name", "file", "line", "kind"] {
        assert!(hop.get(key).is_some(), "missing path[].{key}");
    }
}

// ── Neighbors ───────────────────────────────────────────

#[test]
fn caller_limit_applies_per_resolved_id() {
    let mut builder = GraphBuilder::new();
    let mut add = |s: Symbol| {
        let id = s.id.clone();
        builder.add_node(s).unwrap();
        id
    };
    let dup1 = add(func("src/x/one.go", 5, "dup"));
    let dup2 = add(func("src/y/two.go", 7, "dup"));
    let c1 = add(func("src/x/one.go", 50, "c1"));
    let c2 = add(func("src/x/one.go", 60, "c2"));
    let c3 = add(func("src/y/two.go", 50, "c3"));
    for (from, to, line) in [(&c1, &dup1, 51), (&c2, &dup1, 61), (&c3, &dup2, 52)] {
        builder
            .add_edge(from, to, EdgeKind::Calls, SourceLocation::new("src", line))
            .unwrap();
    }
    let handle = GraphHandle::published(builder.freeze());
    let cancel = CancelToken::new();

    let out = find_callers(
        &handle,
        NeighborParams {
            target: "dup".into(),
            limit: 1,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert_eq!(report.results.len(), 2);
    for callers in report.results.values() {
        assert!(callers.len() <= 1);
    }
    assert_eq!(report.total, 2);
    assert_eq!(out.trace.metadata["resolved"], "2");
}

#[test]
fn unknown_name_in_list_query_is_empty_success() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_callers(&handle, NeighborParams::new("ghost"), &cancel);
    let report = out.result.unwrap();
    assert!(report.results.is_empty());
    assert_eq!(report.total, 0);
}

#[test]
fn references_come_back_grouped_with_sites() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_references(&handle, NeighborParams::new("A"), &cancel);
    let report = out.result.unwrap();
    assert_eq!(report.total, 1);
    let sites = report.results.values().next().unwrap();
    assert!(sites[0].from.ends_with(":init"));
}

#[test]
fn search_ranks_exact_matches_first() {
    let handle = handle_of(&[("parse", "parser"), ("parser", "parseExpr")]);
    let cancel = CancelToken::new();
    let out = search_symbols(
        &handle,
        SearchParams {
            prefix: "parse".into(),
            limit: 0,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    let names: Vec<&str> = report.matches.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["parse", "parser", "parseExpr"]);
}

// ── Regions, hot spots, merge points, articulation ──────

fn nested_diamonds() -> GraphHandle {
    handle_of(&[
        ("main", "b"),
        ("main", "c"),
        ("b", "d"),
        ("b", "e"),
        ("d", "f"),
        ("e", "f"),
        ("f", "g"),
        ("c", "g"),
    ])
}

#[test]
fn regions_query_reports_exact_regions() {
    let handle = nested_diamonds();
    let cancel = CancelToken::new();
    let out = find_regions(&handle, RegionListParams::default(), &cancel);
    let report = out.result.unwrap();
    assert_eq!(out.trace.metadata["approximate"], "false");
    assert_eq!(report.summary.total_regions, 2);
    assert_eq!(report.regions[0].size, 6);
    assert!(report.regions[0].has_nested_regions);
    assert_eq!(report.regions[1].size, 3);
    assert_eq!(report.regions[1].depth, 1);
}

#[test]
fn extractable_regions_filter_and_rank() {
    let handle = nested_diamonds();
    let cancel = CancelToken::new();
    let out = find_extractable_regions(&handle, RegionParams::default(), &cancel);
    let report = out.result.unwrap();
    assert_eq!(report.summary.extractable_count, 2);
    assert_eq!(report.summary.returned, 2);
    assert_eq!(report.summary.min_size_used, 3);
    assert!(report.regions[0].size >= report.regions[1].size);

    let narrow = find_extractable_regions(
        &handle,
        RegionParams {
            min_size: 4,
            max_size: 50,
            top: 10,
            entry: None,
        },
        &cancel,
    );
    let narrow = narrow.result.unwrap();
    assert_eq!(narrow.summary.extractable_count, 1);
    assert_eq!(narrow.regions[0].size, 6);
}

#[test]
fn approximate_fallback_is_flagged_in_trace() {
    let handle = handle_of(&[("main", "a"), ("a", "b"), ("b", "c"), ("c", "a")]);
    let cancel = CancelToken::new();
    let out = find_regions(&handle, RegionListParams::default(), &cancel);
    assert_eq!(out.trace.metadata["approximate"], "true");
    assert!(out.result.is_ok());
}

#[test]
fn hot_spots_respect_the_top_cap() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    let out = find_hot_spots(
        &handle,
        HotSpotsParams {
            top: 200,
            damping: 0.85,
        },
        &cancel,
    );
    let report = out.result.unwrap();
    assert!(report.hot_spots.len() <= 50);
    assert!(report.converged);
    assert_eq!(out.trace.metadata["top"], "50");
}

#[test]
fn merge_points_find_the_join() {
    let handle = handle_of(&[("main", "a"), ("main", "b"), ("a", "join"), ("b", "join")]);
    let cancel = CancelToken::new();
    let out = find_merge_points(&handle, MergePointsParams::default(), &cancel);
    let report = out.result.unwrap();
    assert_eq!(report.merge_points.len(), 1);
    assert_eq!(report.merge_points[0].name, "join");
    assert_eq!(report.merge_points[0].degree, 2);
}

#[test]
fn articulation_query_reports_cut_vertices() {
    let handle = handle_of(&[("a", "b"), ("b", "c")]);
    let cancel = CancelToken::new();
    let out = find_articulation_points(&handle, &cancel);
    let report = out.result.unwrap();
    assert_eq!(report.count, 1);
    assert_eq!(report.nodes[0].name, "b");
}

// ── Failure semantics ───────────────────────────────────

#[test]
fn unpublished_handle_surfaces_not_ready_after_retries() {
    let handle = GraphHandle::new();
    let cancel = CancelToken::new();
    let started = std::time::Instant::now();
    let out = find_cycles(&handle, CyclesParams::default(), &cancel);
    assert!(matches!(out.result, Err(Error::NotReady)));
    assert_eq!(out.trace.metadata["error_kind"], "not_ready");
    assert!(started.elapsed() >= std::time::Duration::from_millis(1400));
}

#[test]
fn cancellation_surfaces_as_cancelled() {
    let handle = fork_handle();
    let cancel = CancelToken::new();
    cancel.cancel();
    let out = find_communities(&handle, CommunitiesParams::default(), &cancel);
    assert!(matches!(out.result, Err(Error::Cancelled)));
    assert!(out.trace.error.is_some());
}
