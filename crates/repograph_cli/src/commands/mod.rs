pub(crate) mod clean;
pub(crate) mod degrees;
pub(crate) mod graphql;
pub(crate) mod limits;
pub(crate) mod meta;
pub(crate) mod rest;
pub(crate) mod shared;

use clap::ValueEnum;

/// Output format for tabular reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}
