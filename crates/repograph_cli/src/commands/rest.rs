use std::error::Error;

use repograph::ResultsDir;
use repograph::fetch::{CursorPolicy, fetch_contributors, fetch_repositories};
use repograph::graph::write_rest_graph;

use crate::RestAction;
use crate::commands::shared::{FetchContext, fetch_failed, print_graph_output, print_summary};
use crate::config::Config;

pub(crate) async fn handle_rest(action: RestAction, config: &Config) -> Result<(), Box<dyn Error>> {
    match action {
        RestAction::Repositories { since, fetch_opts } => {
            let ctx = FetchContext::open(config, &fetch_opts, CursorPolicy::default())?;
            println!(
                "Listing public repositories into {}...\n",
                ctx.results.rest_repositories().display()
            );

            let callback = ctx.reporter.as_callback();
            let result = fetch_repositories(
                &ctx.client,
                &ctx.results,
                &ctx.options,
                since,
                Some(&callback),
            )
            .await;
            ctx.reporter.finish();

            let summary = result.map_err(fetch_failed)?;
            println!();
            print_summary("repositories", &summary);
        }
        RestAction::Contributors {
            since,
            per_page,
            fetch_opts,
        } => {
            let ctx = FetchContext::open(config, &fetch_opts, CursorPolicy::default())?;
            let per_page = per_page.unwrap_or(config.fetch.contributors_per_repository);
            println!("Fetching contributors ({per_page} per repository)...\n");

            let callback = ctx.reporter.as_callback();
            let result = fetch_contributors(
                &ctx.client,
                &ctx.results,
                &ctx.options,
                per_page,
                since,
                Some(&callback),
            )
            .await;
            ctx.reporter.finish();

            let summary = result.map_err(fetch_failed)?;
            println!();
            print_summary("repositories", &summary);
        }
        RestAction::Graph => {
            let results = ResultsDir::new(&config.fetch.results_dir);
            let output = write_rest_graph(&results)?;
            print_graph_output(&output);
        }
    }

    Ok(())
}
