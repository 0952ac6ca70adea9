use std::error::Error;
use std::path::Path;

use repograph::clean::{CLEAN_EDGES_FILE, CLEAN_NODES_FILE, CleanReport};
use repograph::{DegreeThresholds, clean_files};

pub(crate) fn handle_clean(
    source: &Path,
    destination: &Path,
    thresholds: DegreeThresholds,
) -> Result<(), Box<dyn Error>> {
    println!(
        "Cleaning {} (users need {}+ repositories, repositories need {}+ contributors)...\n",
        source.display(),
        thresholds.min_repositories_per_user,
        thresholds.min_contributors_per_repository
    );
    let report = clean_files(source, destination, thresholds)?;
    for line in report_lines(&report) {
        println!("{line}");
    }
    println!(
        "\nWrote {} and {} in {}",
        CLEAN_NODES_FILE,
        CLEAN_EDGES_FILE,
        destination.display()
    );
    Ok(())
}

fn report_lines(report: &CleanReport) -> Vec<String> {
    vec![
        format!(
            "Kept:         {} nodes, {} edges",
            report.graph.nodes.len(),
            report.graph.edges.len()
        ),
        format!("Low degree:   {} nodes removed", report.below_threshold.len()),
        format!("Disconnected: {} nodes removed", report.disconnected.len()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph::Graph;

    #[test]
    fn report_lines_show_counts() {
        let report = CleanReport {
            graph: Graph::default(),
            below_threshold: vec![3, 4],
            disconnected: vec![1],
        };
        let lines = report_lines(&report);
        assert_eq!(lines[0], "Kept:         0 nodes, 0 edges");
        assert!(lines[1].contains("2 nodes"));
        assert!(lines[2].contains("1 nodes"));
    }
}
