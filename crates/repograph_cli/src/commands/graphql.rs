use std::error::Error;

use repograph::ResultsDir;
use repograph::fetch::{CursorPolicy, fetch_user_nodes};
use repograph::github::ContributionsQuery;
use repograph::graph::write_graphql_graph;
use repograph::tables::write_graphql_tables;

use crate::GraphqlAction;
use crate::commands::shared::{FetchContext, fetch_failed, print_graph_output, print_summary};
use crate::config::Config;

pub(crate) async fn handle_graphql(
    action: GraphqlAction,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    match action {
        GraphqlAction::Fetch {
            after,
            users_per_query,
            repositories_per_user,
            search,
            per_page_cursors,
            fetch_opts,
        } => {
            let cursor_policy = if per_page_cursors {
                CursorPolicy::PerPage
            } else {
                CursorPolicy::PerRecord
            };
            let ctx = FetchContext::open(config, &fetch_opts, cursor_policy)?;
            let query = ContributionsQuery::new()
                .users_per_page(users_per_query.unwrap_or(config.fetch.users_per_query))
                .repositories_per_user(
                    repositories_per_user.unwrap_or(config.fetch.repositories_per_user),
                )
                .search(search.unwrap_or_else(|| config.fetch.search.clone()));
            println!("Searching users into {}...\n", ctx.results.graphql_raw().display());

            let callback = ctx.reporter.as_callback();
            let result = fetch_user_nodes(
                &ctx.client,
                &ctx.results,
                &ctx.options,
                query,
                after,
                Some(&callback),
            )
            .await;
            ctx.reporter.finish();

            let report = result.map_err(fetch_failed)?;
            println!();
            print_summary("users", &report.summary);
            println!(
                "  Snapshot: {} records in {}",
                report.snapshot_records,
                ctx.results.graphql_snapshot().display()
            );
        }
        GraphqlAction::Tables => {
            let results = ResultsDir::new(&config.fetch.results_dir);
            let tables = write_graphql_tables(&results)?;
            println!(
                "Wrote {} users, {} repositories and {} contributions to {}",
                tables.users.len(),
                tables.repositories.len(),
                tables.contributions.len(),
                results.graphql().display()
            );
        }
        GraphqlAction::Graph => {
            let results = ResultsDir::new(&config.fetch.results_dir);
            let output = write_graphql_graph(&results)?;
            print_graph_output(&output);
        }
    }

    Ok(())
}
