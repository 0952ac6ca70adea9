use std::collections::BTreeSet;
use std::error::Error;
use std::path::Path;

use repograph::clean::{CLEAN_EDGES_FILE, CLEAN_NODES_FILE};
use repograph::graph::{EDGES_FILE, NODES_FILE};
use repograph::{DegreeDistribution, Graph, Histogram};

use crate::commands::OutputFormat;

/// Widest bar in a plot.
const PLOT_WIDTH: usize = 50;

/// One histogram row: how many users and repositories have a given degree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, tabled::Tabled)]
pub(crate) struct DegreeRow {
    #[tabled(rename = "Degree")]
    pub degree: usize,
    #[tabled(rename = "Users")]
    pub users: usize,
    #[tabled(rename = "Repositories")]
    pub repositories: usize,
}

pub(crate) fn handle_degrees(
    source: &Path,
    cleaned: bool,
    plot: bool,
    output: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    let (nodes, edges) = if cleaned {
        (CLEAN_NODES_FILE, CLEAN_EDGES_FILE)
    } else {
        (NODES_FILE, EDGES_FILE)
    };
    let graph = Graph::read(&source.join(nodes), &source.join(edges))?;
    let distribution = DegreeDistribution::from_graph(&graph);

    match output {
        OutputFormat::Table => {
            println!(
                "{}",
                summary_line("Repositories per user", &distribution.repositories_per_user)
            );
            println!(
                "{}",
                summary_line(
                    "Contributors per repository",
                    &distribution.contributors_per_repository
                )
            );
            let mut table = tabled::Table::new(degree_rows(&distribution));
            table.with(tabled::settings::Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&distribution)?);
        }
    }

    if plot {
        for line in plot_lines("Repositories per user", &distribution.repositories_per_user) {
            println!("{line}");
        }
        println!();
        for line in plot_lines(
            "Contributors per repository",
            &distribution.contributors_per_repository,
        ) {
            println!("{line}");
        }
    }

    Ok(())
}

fn summary_line(title: &str, histogram: &Histogram) -> String {
    match (histogram.max_degree(), histogram.mean()) {
        (Some(max), Some(mean)) => format!(
            "{title}: {} nodes, max {max}, mean {mean:.2}",
            histogram.nodes()
        ),
        _ => format!("{title}: no nodes"),
    }
}

/// Merge both histograms into rows keyed by degree.
pub(crate) fn degree_rows(distribution: &DegreeDistribution) -> Vec<DegreeRow> {
    let users = &distribution.repositories_per_user.counts;
    let repositories = &distribution.contributors_per_repository.counts;
    let degrees: BTreeSet<usize> = users.keys().chain(repositories.keys()).copied().collect();

    degrees
        .into_iter()
        .map(|degree| DegreeRow {
            degree,
            users: users.get(&degree).copied().unwrap_or(0),
            repositories: repositories.get(&degree).copied().unwrap_or(0),
        })
        .collect()
}

/// Horizontal bars with log-scaled length, so long-tailed
/// distributions stay readable.
pub(crate) fn plot_lines(title: &str, histogram: &Histogram) -> Vec<String> {
    let mut lines = vec![title.to_string()];
    let Some(&largest) = histogram.counts.values().max() else {
        lines.push("  (empty)".to_string());
        return lines;
    };

    let scale = ((largest + 1) as f64).ln();
    let width = histogram
        .max_degree()
        .map(|d| d.to_string().len())
        .unwrap_or(1);
    for (degree, count) in &histogram.counts {
        let len = if scale > 0.0 {
            ((((count + 1) as f64).ln() / scale) * PLOT_WIDTH as f64).ceil() as usize
        } else {
            0
        };
        lines.push(format!("  {degree:>width$} | {} {count}", "#".repeat(len.max(1))));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn histogram(pairs: &[(usize, usize)]) -> Histogram {
        Histogram {
            counts: pairs.iter().copied().collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn rows_cover_degrees_of_both_kinds() {
        let distribution = DegreeDistribution {
            repositories_per_user: histogram(&[(1, 3), (2, 1)]),
            contributors_per_repository: histogram(&[(2, 1), (5, 1)]),
        };
        let rows = degree_rows(&distribution);
        assert_eq!(
            rows,
            vec![
                DegreeRow { degree: 1, users: 3, repositories: 0 },
                DegreeRow { degree: 2, users: 1, repositories: 1 },
                DegreeRow { degree: 5, users: 0, repositories: 1 },
            ]
        );
    }

    #[test]
    fn plot_bars_are_log_scaled() {
        let lines = plot_lines("t", &histogram(&[(1, 1000), (10, 1)]));
        assert_eq!(lines[0], "t");
        let bar = |line: &str| line.chars().filter(|&c| c == '#').count();
        assert_eq!(bar(&lines[1]), PLOT_WIDTH);
        // ln(2) / ln(1001) of the full width, rounded up.
        assert_eq!(bar(&lines[2]), 6);
        assert!(lines[2].starts_with("  10 |"));
    }

    #[test]
    fn plot_of_empty_histogram() {
        let lines = plot_lines("t", &Histogram::default());
        assert_eq!(lines, vec!["t".to_string(), "  (empty)".to_string()]);
    }

    #[test]
    fn summary_line_reports_max_and_mean() {
        let line = summary_line("Users", &histogram(&[(1, 1), (3, 1)]));
        assert_eq!(line, "Users: 2 nodes, max 3, mean 2.00");
        assert_eq!(summary_line("Users", &Histogram::default()), "Users: no nodes");
    }
}
