//! Integration tests for the clustering pipeline
//!
//! Exercises the public API end to end: normalization through ranking,
//! summary counts and pagination.

use std::collections::HashSet;

use failure_cluster::{
    cluster, ClusterParams, ClusterSummary, ClusteringEngine, FailureRecord, MatchType,
    Normalizer, NormalizerConfig, SortBy,
};

fn rec(name: &str, message: &str) -> FailureRecord {
    FailureRecord::new(name, message)
}

/// A run with a few large groups, some noise and some singletons
fn fleet_run() -> Vec<FailureRecord> {
    let mut records = Vec::new();

    for i in 0..12 {
        records.push(
            rec(
                &format!("test_bgp_neighbor[{}]", i),
                &format!(
                    "AssertionError: BGP neighbor 10.0.{}.{} not established after {} s",
                    i,
                    i + 1,
                    30 + i
                ),
            )
            .with_topology(if i % 2 == 0 { "t0" } else { "t1" })
            .with_priority(if i < 4 { "p0" } else { "p1" }),
        );
    }

    for i in 0..7 {
        records.push(
            rec(
                &format!("test_reboot[dut-{}]", i),
                &format!("TimeoutError: dut-{} did not come back within {} s", i, 300),
            )
            .with_topology("t1")
            .with_stack_trace(format!(
                "tests/common/reboot.py:{}: in wait_until\ntests/test_reboot.py:{}: TimeoutError",
                100 + i,
                40
            )),
        );
    }

    records.push(rec("test_config_push", "KeyError: 'vlan_members'"));
    records.push(rec("test_lldp", "lldp table mismatch on port Ethernet8"));
    records.push(FailureRecord::without_message("test_crashed"));

    records
}

#[test]
fn test_documented_example_scenario() {
    let records = vec![
        rec("r1", "AssertionError: IP 10.0.0.1 unreachable"),
        rec("r2", "AssertionError: IP 10.0.0.2 unreachable"),
        rec("r3", "TimeoutError: no response"),
    ];
    let report = cluster(&records, &ClusterParams::default().with_threshold(0.8));

    assert_eq!(
        report.summary,
        ClusterSummary {
            total_failures: 3,
            unique_clusters: 2,
            largest_cluster: 2,
            unclustered: 1,
        }
    );

    let first = &report.clusters[0];
    assert_eq!(first.error_category().as_str(), "AssertionError");
    assert_eq!(first.count, 2);
    assert_eq!(first.match_type, MatchType::Exact);

    let second = &report.clusters[1];
    assert_eq!(second.error_category().as_str(), "TimeoutError");
    assert_eq!(second.count, 1);
}

#[test]
fn test_fleet_run_collapses_noise() {
    let records = fleet_run();
    let report = cluster(&records, &ClusterParams::default());

    assert_eq!(report.summary.total_failures, records.len());
    assert_eq!(report.summary.unique_clusters, 5);
    assert_eq!(report.summary.largest_cluster, 12);
    assert_eq!(report.summary.unclustered, 3);

    let bgp = &report.clusters[0];
    assert_eq!(bgp.count, 12);
    assert_eq!(bgp.match_type, MatchType::Exact);
    assert_eq!(bgp.topologies, vec!["t0".to_string(), "t1".to_string()]);
    assert_eq!(bgp.priorities.get("p0"), Some(&4));
    assert_eq!(bgp.priorities.get("p1"), Some(&8));

    let reboot = &report.clusters[1];
    assert_eq!(reboot.count, 7);
    assert_eq!(reboot.error_category().as_str(), "TimeoutError");
    let location = reboot.signature.source_location.as_ref().unwrap();
    assert_eq!(location.to_string(), "tests/test_reboot.py:40");
}

#[test]
fn test_unknown_categories_cluster_among_themselves() {
    let records = fleet_run();
    let report = cluster(&records, &ClusterParams::default());

    let unknown: Vec<_> = report
        .clusters
        .iter()
        .filter(|c| c.error_category().is_unknown())
        .collect();
    // "lldp table mismatch" and the message-less record share the sentinel
    // but not enough text to merge
    assert_eq!(unknown.len(), 2);
}

#[test]
fn test_determinism() {
    let records = fleet_run();
    let params = ClusterParams::default().with_threshold(0.6);

    let a = cluster(&records, &params);
    let b = cluster(&records, &params);

    let shape = |r: &failure_cluster::ClusterReport| {
        r.clusters
            .iter()
            .map(|c| (c.signature.fingerprint.clone(), c.member_names().map(String::from).collect::<Vec<_>>()))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&a), shape(&b));
    assert_eq!(a.summary, b.summary);
}

#[test]
fn test_partition_invariant() {
    let records = fleet_run();
    let report = cluster(&records, &ClusterParams::default().with_threshold(0.5));

    let mut seen = Vec::new();
    for c in &report.clusters {
        assert_eq!(c.count, c.members.len());
        assert_eq!(c.priorities.values().sum::<usize>(), c.count);
        seen.extend(c.member_names().map(String::from));
    }

    assert_eq!(seen.len(), records.len());
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), records.len());
}

#[test]
fn test_category_separation() {
    let records = vec![
        rec("a", "ConnectionError: peer reset"),
        rec("b", "ConnectionResetError: peer reset"),
        rec("c", "ConnectionError: peer reset"),
    ];
    let report = cluster(&records, &ClusterParams::default().with_threshold(0.01));

    assert_eq!(report.clusters.len(), 2);
    for c in &report.clusters {
        let categories: HashSet<_> = c
            .members
            .iter()
            .map(|m| m.message().split(':').next().unwrap_or("").to_string())
            .collect();
        assert_eq!(categories.len(), 1);
    }
}

#[test]
fn test_exact_match_precedes_fuzzy() {
    let records = vec![
        rec("a", "ValueError: bad value for field alpha"),
        rec("b", "ValueError: bad value for field beta"),
        rec("c", "ValueError: bad value for field beta"),
    ];
    // threshold high enough that a/b never merge
    let report = cluster(&records, &ClusterParams::default().with_threshold(0.95));

    let with_b = report
        .clusters
        .iter()
        .find(|c| c.member_names().any(|n| n == "b"))
        .unwrap();
    assert_eq!(with_b.member_names().collect::<Vec<_>>(), vec!["b", "c"]);
    assert_eq!(with_b.match_type, MatchType::Exact);
}

#[test]
fn test_greedy_assignment_is_order_sensitive() {
    // B sits between A and C: A~B and B~C score 0.75, A~C only 0.5
    let a = rec("a", "ValueError: one two three four five six seven");
    let b = rec("b", "ValueError: one two three four five xx yy");
    let c = rec("c", "ValueError: one two three xx yy zz ww");
    let params = ClusterParams::default().with_threshold(0.7);

    // A first: B joins A, C cannot reach A's representative
    let forward = cluster(&[a.clone(), b.clone(), c.clone()], &params);
    assert_eq!(forward.summary.unique_clusters, 2);
    assert_eq!(
        forward.clusters[0].member_names().collect::<Vec<_>>(),
        vec!["a", "b"]
    );

    // B first: both neighbours fall into B's cluster
    let pivot_first = cluster(&[b, a, c], &params);
    assert_eq!(pivot_first.summary.unique_clusters, 1);
    assert_eq!(pivot_first.clusters[0].count, 3);
}

#[test]
fn test_pagination_stability() {
    let records = fleet_run();
    let full = cluster(&records, &ClusterParams::default());
    let expected: Vec<_> = full
        .clusters
        .iter()
        .map(|c| c.signature.fingerprint.clone())
        .collect();

    for page_size in 1..=4 {
        let mut collected = Vec::new();
        let mut skip = 0;
        loop {
            let params = ClusterParams::default().with_page(skip, Some(page_size));
            let page = cluster(&records, &params);
            assert_eq!(page.summary, full.summary);
            if page.clusters.is_empty() {
                break;
            }
            collected.extend(page.clusters.iter().map(|c| c.signature.fingerprint.clone()));
            skip += page_size;
        }
        assert_eq!(collected, expected, "page size {}", page_size);
    }
}

#[test]
fn test_min_cluster_size_and_sorting_together() {
    let records = fleet_run();
    let params = ClusterParams::default()
        .with_min_cluster_size(2)
        .with_sort_by(SortBy::ErrorCategory);
    let report = cluster(&records, &params);

    let categories: Vec<_> = report
        .clusters
        .iter()
        .map(|c| c.error_category().to_string())
        .collect();
    assert_eq!(categories, vec!["AssertionError", "TimeoutError"]);
    assert_eq!(report.summary.unique_clusters, 2);
    assert_eq!(report.summary.largest_cluster, 12);
    assert_eq!(report.summary.total_failures, records.len());
}

#[test]
fn test_min_cluster_size_above_everything() {
    let records = fleet_run();
    let report = cluster(&records, &ClusterParams::default().with_min_cluster_size(100));

    assert!(report.clusters.is_empty());
    assert_eq!(report.summary.unique_clusters, 0);
    assert_eq!(report.summary.largest_cluster, 0);
    assert_eq!(report.summary.total_failures, records.len());
}

#[test]
fn test_custom_identifier_patterns_merge_clusters() {
    let records = vec![
        rec("a", "RuntimeError: chassisA fan failure"),
        rec("b", "RuntimeError: chassisB fan failure"),
    ];
    let params = ClusterParams::default().with_threshold(1.0);

    let plain = cluster(&records, &params);
    assert_eq!(plain.summary.unique_clusters, 2);

    let normalizer = Normalizer::from_config(&NormalizerConfig {
        id_patterns: None,
        extra_id_patterns: vec![r"\bchassis[A-Z]\b".to_string()],
    })
    .unwrap();
    let engine = ClusteringEngine::new(normalizer);
    let merged = engine.cluster(&records, &params);
    assert_eq!(merged.summary.unique_clusters, 1);
    assert_eq!(merged.clusters[0].match_type, MatchType::Exact);
}
