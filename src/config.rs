use crate::error::{EtlError, Result};
use std::env;

/// Warehouse session settings, read once from the environment at process
/// start and immutable for the duration of the run.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
}

impl WarehouseConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Ok(Self {
            account: require("WAREHOUSE_ACCOUNT")?,
            user: require("WAREHOUSE_USER")?,
            password: require("WAREHOUSE_PASSWORD")?,
            role: require("WAREHOUSE_ROLE")?,
            warehouse: require("WAREHOUSE_WAREHOUSE")?,
            database: require("WAREHOUSE_DATABASE")?,
            schema: require("WAREHOUSE_SCHEMA")?,
        })
    }
}

fn require(key: &str) -> Result<String> {
    env::var(key).map_err(|_| EtlError::Config(format!("{key} environment variable not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_reads_all_settings() {
        for key in [
            "WAREHOUSE_ACCOUNT",
            "WAREHOUSE_USER",
            "WAREHOUSE_PASSWORD",
            "WAREHOUSE_ROLE",
            "WAREHOUSE_WAREHOUSE",
            "WAREHOUSE_DATABASE",
            "WAREHOUSE_SCHEMA",
        ] {
            env::set_var(key, format!("test_{}", key.to_lowercase()));
        }

        let config = WarehouseConfig::from_env().unwrap();
        assert_eq!(config.account, "test_warehouse_account");
        assert_eq!(config.database, "test_warehouse_database");
    }
}
