//! Datasource configuration: a YAML file mapping an environment name to a
//! datasource, in the same shape sql-migrate uses.
//!
//! ```yaml
//! development:
//!   datasource: wiki-dev.db
//! test:
//!   datasource: ":memory:"
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::Database;

const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, Deserialize)]
pub struct DataSource {
    pub datasource: String,
}

impl DataSource {
    pub fn open(&self) -> Result<Database> {
        let db = if self.datasource == IN_MEMORY {
            Database::open_in_memory()?
        } else {
            Database::open(Path::new(&self.datasource))?
        };
        Ok(db)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct DbConfigs(HashMap<String, DataSource>);

impl DbConfigs {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("cannot open database configuration {}", path.display()))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_yaml::from_reader(reader).context("invalid database configuration")
    }

    /// An unknown environment is an error rather than a missing database.
    pub fn get(&self, env: &str) -> Result<&DataSource> {
        self.0
            .get(env)
            .ok_or_else(|| anyhow!("no datasource configured for environment '{}'", env))
    }

    pub fn open(&self, env: &str) -> Result<Database> {
        self.get(env)?.open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "
development:
  datasource: wiki-dev.db
test:
  datasource: \":memory:\"
";

    #[test]
    fn selects_datasource_by_environment() {
        let configs = DbConfigs::from_reader(YAML.as_bytes()).unwrap();
        assert_eq!(configs.get("development").unwrap().datasource, "wiki-dev.db");
        assert_eq!(configs.get("test").unwrap().datasource, IN_MEMORY);
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let configs = DbConfigs::from_reader(YAML.as_bytes()).unwrap();
        let err = configs.get("production").unwrap_err();
        assert!(err.to_string().contains("production"));
    }

    #[test]
    fn in_memory_datasource_opens_migrated_database() {
        let configs = DbConfigs::from_reader(YAML.as_bytes()).unwrap();
        let db = configs.open("test").unwrap();
        assert_eq!(db.article_count().unwrap(), 0);
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        assert!(DbConfigs::from_reader("development: [".as_bytes()).is_err());
    }
}
