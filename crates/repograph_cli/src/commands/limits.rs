use std::error::Error;

use chrono::{DateTime, Utc};
use repograph::github::{RateLimitResource, RateLimitResponse};
use tabled::Tabled;

use crate::commands::OutputFormat;
use crate::commands::shared::build_client;
use crate::config::Config;

/// Show the remaining quota of the core, search and GraphQL buckets, and
/// whether a fetch would currently pause on each.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    let client = build_client(config, None)?;
    let response = client.rate_limit().await?;
    let rows = quota_rows(&response, config.fetch.quota_threshold, Utc::now());

    match output {
        OutputFormat::Table => {
            let mut table = tabled::Table::new(&rows);
            table.with(tabled::settings::Style::rounded());
            println!("{table}");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

#[derive(Debug, Clone, serde::Serialize, Tabled)]
pub(crate) struct QuotaRow {
    #[tabled(rename = "Bucket")]
    pub bucket: &'static str,
    #[tabled(rename = "Remaining")]
    pub remaining: usize,
    #[tabled(rename = "Limit")]
    pub limit: usize,
    #[tabled(rename = "Used %", display_with = "percent")]
    pub used_percent: f64,
    #[tabled(rename = "Fetch")]
    pub gate: &'static str,
    #[tabled(rename = "Resets")]
    pub resets_at: DateTime<Utc>,
    #[tabled(rename = "In")]
    pub resets_in: String,
}

fn percent(value: &f64) -> String {
    format!("{value:.1}%")
}

impl QuotaRow {
    fn new(
        bucket: &'static str,
        resource: &RateLimitResource,
        threshold: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let used_percent = match resource.limit {
            0 => 0.0,
            limit => resource.used as f64 * 100.0 / limit as f64,
        };
        let resets_at = resource.reset_at();

        Self {
            bucket,
            remaining: resource.remaining,
            limit: resource.limit,
            used_percent,
            // Mirrors the gate: a fetch sleeps once remaining drops to the threshold.
            gate: if resource.remaining > threshold {
                "ready"
            } else {
                "paused"
            },
            resets_at,
            resets_in: until(resets_at - now),
        }
    }
}

/// Older servers only report the legacy top-level `rate`, which mirrors
/// `core`.
pub(crate) fn quota_rows(
    response: &RateLimitResponse,
    threshold: usize,
    now: DateTime<Utc>,
) -> Vec<QuotaRow> {
    let Some(resources) = &response.resources else {
        return vec![QuotaRow::new("core", &response.rate, threshold, now)];
    };

    [
        ("core", Some(&resources.core)),
        ("graphql", resources.graphql.as_ref()),
        ("search", resources.search.as_ref()),
    ]
    .into_iter()
    .filter_map(|(bucket, resource)| resource.map(|r| QuotaRow::new(bucket, r, threshold, now)))
    .collect()
}

/// Compact "1h 5m" / "4m 10s" / "now" rendering of the time to a reset.
fn until(remaining: chrono::Duration) -> String {
    let secs = remaining.num_seconds();
    if secs <= 0 {
        return "now".into();
    }
    let (hours, mins, secs) = (secs / 3600, secs % 3600 / 60, secs % 60);
    match (hours, mins, secs) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}
