//! Structured tables reconstituted from the raw fetch logs.
//!
//! Both APIs end up in the same three shapes: users, repositories and
//! contributions. REST data is already tabular on disk; GraphQL user nodes
//! are flattened here, deduplicating repositories at first encounter and
//! normalising null platform fields.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::github::UserNode;
use crate::store::{CsvLog, ResultsDir, StagedFiles, StoreError, require, steps};

/// Placeholder for missing names and languages.
pub const NONE_LABEL: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRow {
    pub id: String,
    pub full_name: String,
    /// Absent for REST listings, which carry no star counts.
    pub stars: Option<u64>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRow {
    pub repository_id: String,
    pub user_id: String,
    /// Commit count from REST; GraphQL reports no weight.
    pub count: Option<u64>,
}

/// Users, repositories and contributions in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    pub users: Vec<UserRow>,
    pub repositories: Vec<RepositoryRow>,
    pub contributions: Vec<ContributionRow>,
}

impl Tables {
    /// Load the REST tables from `rest/`.
    pub fn load_rest(results: &ResultsDir) -> Result<Self, StoreError> {
        let repositories = results.rest_repositories();
        require(&repositories, steps::REST_REPOSITORIES)?;
        let users = results.rest_users();
        require(&users, steps::REST_CONTRIBUTORS)?;
        let contributions = results.rest_contributions();
        require(&contributions, steps::REST_CONTRIBUTORS)?;

        Self::load(&users, &repositories, &contributions)
    }

    /// Load the GraphQL tables written by [`write_graphql_tables`].
    pub fn load_graphql(results: &ResultsDir) -> Result<Self, StoreError> {
        let paths = [
            results.graphql_users(),
            results.graphql_repositories(),
            results.graphql_contributions(),
        ];
        for path in &paths {
            require(path, steps::GRAPHQL_TABLES)?;
        }
        let [users, repositories, contributions] = paths;
        Self::load(&users, &repositories, &contributions)
    }

    fn load(users: &Path, repositories: &Path, contributions: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            users: parse_rows(users, 2, |f| UserRow {
                id: f[0].to_string(),
                login: f[1].to_string(),
            })?,
            repositories: parse_rows(repositories, 2, |f| RepositoryRow {
                id: f[0].to_string(),
                full_name: f[1].to_string(),
                stars: f.get(2).and_then(|s| s.parse().ok()),
                language: f.get(3).filter(|s| !s.is_empty()).map(|s| s.to_string()),
            })?,
            contributions: parse_rows(contributions, 2, |f| ContributionRow {
                repository_id: f[0].to_string(),
                user_id: f[1].to_string(),
                count: f.get(2).and_then(|s| s.parse().ok()),
            })?,
        })
    }

    /// Flatten raw GraphQL user nodes.
    pub fn from_user_nodes(nodes: &[Value]) -> Self {
        let mut tables = Tables::default();
        let mut registered: HashSet<String> = HashSet::new();

        for (index, raw) in nodes.iter().enumerate() {
            let node: UserNode = match serde_json::from_value(raw.clone()) {
                Ok(node) => node,
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping unreadable user node");
                    continue;
                }
            };
            let Some(user_id) = node.id else {
                tracing::warn!(index, "Skipping user node without id");
                continue;
            };

            let login = node
                .login
                .or(node.name)
                .unwrap_or_else(|| NONE_LABEL.to_string());
            tables.users.push(UserRow {
                id: user_id.clone(),
                login,
            });

            let repositories = node
                .repositories_contributed_to
                .map(|r| r.nodes)
                .unwrap_or_default();
            for repository in repositories.into_iter().flatten() {
                let Some(repository_id) = repository.id else {
                    continue;
                };

                if registered.insert(repository_id.clone()) {
                    tables.repositories.push(RepositoryRow {
                        id: repository_id.clone(),
                        full_name: repository
                            .name_with_owner
                            .or(repository.name)
                            .unwrap_or_else(|| NONE_LABEL.to_string()),
                        stars: Some(
                            repository
                                .stargazers
                                .and_then(|s| s.total_count)
                                .unwrap_or(0),
                        ),
                        language: Some(
                            repository
                                .primary_language
                                .and_then(|l| l.name)
                                .unwrap_or_else(|| NONE_LABEL.to_string()),
                        ),
                    });
                }

                tables.contributions.push(ContributionRow {
                    repository_id,
                    user_id: user_id.clone(),
                    count: None,
                });
            }
        }

        tables
    }
}

/// Parse headerless rows, skipping (and logging) rows with too few fields.
fn parse_rows<T>(
    path: &Path,
    min_fields: usize,
    row: impl Fn(&[&str]) -> T,
) -> Result<Vec<T>, StoreError> {
    let mut rows = Vec::new();
    for (line, record) in CsvLog::new(path).read_records()?.iter().enumerate() {
        let fields: Vec<&str> = record.iter().collect();
        if fields.len() < min_fields || fields[..min_fields].iter().any(|f| f.is_empty()) {
            tracing::warn!(path = %path.display(), line = line + 1, "Skipping short row");
            continue;
        }
        rows.push(row(&fields));
    }
    Ok(rows)
}

/// Convert `graphql/data.json` into the three GraphQL tables.
///
/// The tables are derived data and are rewritten on every call.
pub fn write_graphql_tables(results: &ResultsDir) -> Result<Tables, StoreError> {
    let snapshot = results.graphql_snapshot();
    require(&snapshot, steps::GRAPHQL_FETCH)?;

    let bytes = fs::read(&snapshot).map_err(|e| StoreError::io(&snapshot, e))?;
    let nodes: Vec<Value> = serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
        path: snapshot.clone(),
        line: 1,
        source,
    })?;

    let tables = Tables::from_user_nodes(&nodes);
    let mut files = StagedFiles::new();
    files.csv(&results.graphql_users(), &[], &tables.users)?;
    files.csv(&results.graphql_repositories(), &[], &tables.repositories)?;
    files.csv(&results.graphql_contributions(), &[], &tables.contributions)?;
    files.commit()?;

    tracing::info!(
        nodes = nodes.len(),
        users = tables.users.len(),
        repositories = tables.repositories.len(),
        contributions = tables.contributions.len(),
        "Converted GraphQL snapshot to tables"
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn user(id: &str, repos: Value) -> Value {
        json!({
            "id": id,
            "login": id.to_lowercase(),
            "name": null,
            "repositoriesContributedTo": {"totalCount": 1, "nodes": repos}
        })
    }

    fn repo(id: &str, stars: Value, language: Value) -> Value {
        json!({
            "id": id,
            "name": id.to_lowercase(),
            "nameWithOwner": format!("owner/{}", id.to_lowercase()),
            "stargazers": stars,
            "primaryLanguage": language
        })
    }

    #[test]
    fn repositories_are_registered_once() {
        let r1 = repo("R1", json!({"totalCount": 7}), json!({"name": "Rust"}));
        let r2 = repo("R2", json!({"totalCount": 1}), json!({"name": "Go"}));
        let nodes = vec![
            user("U1", json!([r1.clone()])),
            user("U2", json!([r1])),
            user("U3", json!([r2])),
        ];

        let tables = Tables::from_user_nodes(&nodes);
        assert_eq!(tables.users.len(), 3);
        assert_eq!(tables.repositories.len(), 2);
        assert_eq!(tables.contributions.len(), 3);
        assert_eq!(tables.repositories[0].full_name, "owner/r1");
        assert_eq!(tables.contributions[1].repository_id, "R1");
        assert_eq!(tables.contributions[1].user_id, "U2");
        assert!(tables.contributions.iter().all(|c| c.count.is_none()));
    }

    #[test]
    fn null_stars_and_language_get_defaults() {
        let nodes = vec![user("U1", json!([repo("R1", Value::Null, Value::Null)]))];

        let tables = Tables::from_user_nodes(&nodes);
        let row = &tables.repositories[0];
        assert_eq!(row.stars, Some(0));
        assert_eq!(row.language.as_deref(), Some("None"));
    }

    #[test]
    fn user_label_falls_back_to_name() {
        let nodes = vec![
            json!({"id": "U1", "login": null, "name": "Mona"}),
            json!({"id": "U2"}),
            json!({}),
        ];

        let tables = Tables::from_user_nodes(&nodes);
        assert_eq!(tables.users.len(), 2);
        assert_eq!(tables.users[0].login, "Mona");
        assert_eq!(tables.users[1].login, "None");
        assert!(tables.repositories.is_empty());
    }

    #[test]
    fn null_repository_entries_are_ignored() {
        let nodes = vec![user("U1", json!([null, repo("R1", Value::Null, Value::Null)]))];
        let tables = Tables::from_user_nodes(&nodes);
        assert_eq!(tables.contributions.len(), 1);
    }

    #[test]
    fn graphql_tables_round_trip_through_disk() {
        let tmp = TempDir::new().unwrap();
        let results = ResultsDir::new(tmp.path());
        fs::create_dir_all(results.graphql()).unwrap();
        let nodes = json!([user("U1", json!([repo("R1", Value::Null, Value::Null)]))]);
        fs::write(results.graphql_snapshot(), nodes.to_string()).unwrap();

        let written = write_graphql_tables(&results).unwrap();
        assert_eq!(
            fs::read_to_string(results.graphql_repositories()).unwrap(),
            "R1,owner/r1,0,None\n"
        );
        assert_eq!(
            fs::read_to_string(results.graphql_contributions()).unwrap(),
            "R1,U1,\n"
        );

        let loaded = Tables::load_graphql(&results).unwrap();
        assert_eq!(loaded, written);
    }

    #[test]
    fn graphql_tables_require_snapshot() {
        let tmp = TempDir::new().unwrap();
        let err = write_graphql_tables(&ResultsDir::new(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("graphql fetch"));
    }

    #[test]
    fn rest_tables_accept_padded_legacy_rows() {
        let tmp = TempDir::new().unwrap();
        let results = ResultsDir::new(tmp.path());
        fs::create_dir_all(results.rest()).unwrap();
        fs::write(results.rest_users(), "7, octocat\n8, hubot\n").unwrap();
        fs::write(results.rest_repositories(), "10,a/one\n").unwrap();
        fs::write(results.rest_contributions(), "10,7,40\n10,8,2\n").unwrap();

        let tables = Tables::load_rest(&results).unwrap();
        assert_eq!(tables.users[0].login, "octocat");
        assert_eq!(tables.repositories[0].stars, None);
        assert_eq!(tables.contributions[1].count, Some(2));
    }

    #[test]
    fn rest_tables_name_missing_step() {
        let tmp = TempDir::new().unwrap();
        let results = ResultsDir::new(tmp.path());
        fs::create_dir_all(results.rest()).unwrap();
        fs::write(results.rest_repositories(), "10,a/one\n").unwrap();

        let err = Tables::load_rest(&results).unwrap_err();
        assert!(err.to_string().contains("rest contributors"));
    }
}
