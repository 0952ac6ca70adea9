//! File-level tests of the offline pipeline: raw logs to tables, tables to
//! graph, graph to cleaned graph.

use std::fs;

use repograph::clean::{CLEAN_EDGES_FILE, CLEAN_NODES_FILE};
use repograph::graph::{EDGES_FILE, NODES_FILE};
use repograph::{DegreeDistribution, DegreeThresholds, Graph, NodeKind, ResultsDir};
use serde_json::json;
use tempfile::TempDir;

/// Three users: the first two contribute to R1, the third to R2.
fn write_graphql_snapshot(results: &ResultsDir) {
    let repo = |id: &str, stars: serde_json::Value| {
        json!({
            "id": id,
            "name": id.to_lowercase(),
            "nameWithOwner": format!("org/{}", id.to_lowercase()),
            "stargazers": stars,
            "primaryLanguage": null
        })
    };
    let user = |id: &str, repo: serde_json::Value| {
        json!({
            "id": id,
            "login": id.to_lowercase(),
            "name": null,
            "repositoriesContributedTo": {"totalCount": 1, "nodes": [repo]}
        })
    };
    let nodes = json!([
        user("U1", repo("R1", json!({"totalCount": 12}))),
        user("U2", repo("R1", json!({"totalCount": 12}))),
        user("U3", repo("R2", serde_json::Value::Null)),
    ]);

    fs::create_dir_all(results.graphql()).unwrap();
    fs::write(results.graphql_snapshot(), nodes.to_string()).unwrap();
}

#[test]
fn graphql_scenario_materializes_and_cleans() {
    let tmp = TempDir::new().unwrap();
    let results = ResultsDir::new(tmp.path());
    write_graphql_snapshot(&results);

    repograph::tables::write_graphql_tables(&results).unwrap();
    assert_eq!(
        fs::read_to_string(results.graphql_repositories()).unwrap(),
        "R1,org/r1,12,None\nR2,org/r2,0,None\n"
    );

    let output = repograph::graph::write_graphql_graph(&results).unwrap();
    assert_eq!(output.stats.users, 3);
    assert_eq!(output.stats.repositories, 2);
    assert_eq!(output.stats.edges, 3);

    let gephi = results.graphql_gephi();
    assert_eq!(
        fs::read_to_string(gephi.join(NODES_FILE)).unwrap(),
        "id,label,type\n0,u1,user\n1,u2,user\n2,u3,user\n3,org/r1,repository\n4,org/r2,repository\n"
    );
    assert_eq!(
        fs::read_to_string(gephi.join(EDGES_FILE)).unwrap(),
        "Source,Target,Weight\n0,3,\n1,3,\n2,4,\n"
    );

    let cleaned = tmp.path().join("cleaned");
    let report = repograph::clean_files(
        &gephi,
        &cleaned,
        DegreeThresholds {
            min_repositories_per_user: 1,
            min_contributors_per_repository: 2,
        },
    )
    .unwrap();

    assert_eq!(report.below_threshold, vec![4]);
    assert_eq!(report.disconnected, vec![2]);
    assert_eq!(
        fs::read_to_string(cleaned.join(CLEAN_NODES_FILE)).unwrap(),
        "id,label,type\n0,u1,user\n1,u2,user\n3,org/r1,repository\n"
    );
    assert_eq!(
        fs::read_to_string(cleaned.join(CLEAN_EDGES_FILE)).unwrap(),
        "Source,Target,Weight\n0,3,\n1,3,\n"
    );
}

#[test]
fn rematerializing_is_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let results = ResultsDir::new(tmp.path());
    fs::create_dir_all(results.rest()).unwrap();
    fs::write(results.rest_repositories(), "10,a/one\n12,c/three\n").unwrap();
    fs::write(results.rest_users(), "7, octocat\n8,hubot\n").unwrap();
    fs::write(results.rest_contributions(), "10,7,40\n10,8,2\n12,8,5\n").unwrap();

    repograph::graph::write_rest_graph(&results).unwrap();
    let gephi = results.rest_gephi();
    let first = (
        fs::read(gephi.join(NODES_FILE)).unwrap(),
        fs::read(gephi.join(EDGES_FILE)).unwrap(),
    );

    repograph::graph::write_rest_graph(&results).unwrap();
    let second = (
        fs::read(gephi.join(NODES_FILE)).unwrap(),
        fs::read(gephi.join(EDGES_FILE)).unwrap(),
    );

    assert_eq!(first, second);
    assert_eq!(
        String::from_utf8(first.1).unwrap(),
        "Source,Target,Weight\n0,2,40\n1,2,2\n1,3,5\n"
    );
}

#[test]
fn rest_graph_requires_contributor_fetch() {
    let tmp = TempDir::new().unwrap();
    let results = ResultsDir::new(tmp.path());
    fs::create_dir_all(results.rest()).unwrap();
    fs::write(results.rest_repositories(), "10,a/one\n").unwrap();

    let err = repograph::graph::write_rest_graph(&results).unwrap_err();
    assert!(err.is_missing_prerequisite());
    assert!(!results.rest_gephi().exists());
}

#[test]
fn cleaning_requires_a_graph() {
    let tmp = TempDir::new().unwrap();
    let err = repograph::clean_files(
        tmp.path(),
        &tmp.path().join("out"),
        DegreeThresholds::default(),
    )
    .unwrap_err();
    assert!(err.is_missing_prerequisite());
}

#[test]
fn distribution_of_written_graph() {
    let tmp = TempDir::new().unwrap();
    let results = ResultsDir::new(tmp.path());
    write_graphql_snapshot(&results);
    repograph::tables::write_graphql_tables(&results).unwrap();
    repograph::graph::write_graphql_graph(&results).unwrap();

    let gephi = results.graphql_gephi();
    let graph = Graph::read(&gephi.join(NODES_FILE), &gephi.join(EDGES_FILE)).unwrap();
    assert_eq!(
        graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Repository)
            .count(),
        2
    );

    let dist = DegreeDistribution::from_graph(&graph);
    assert_eq!(dist.contributors_per_repository.max_degree(), Some(2));
    assert_eq!(dist.repositories_per_user.counts.get(&1), Some(&3));
}
