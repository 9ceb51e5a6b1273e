//! Startup Configuration
//!
//! Resolved once in `main` from environment variables and command-line flags,
//! then handed to the components that need it. Nothing reads the environment
//! after startup.

use anyhow::{Context, Result, bail};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const ENV_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const ENV_TABLE_NAME: &str = "ACHIEVEMENT_TABLE_NAME";
pub const ENV_STORE_FILE: &str = "ACHIEVEMENT_STORE_FILE";
pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";

pub const DEFAULT_TABLE_NAME: &str = "achievements";
pub const DEFAULT_STORE_FILE: &str = "achievements.json";
pub const DEFAULT_PORT: u16 = 5050;

/// Which ledger strategy to run, chosen once at startup.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageConfig {
    File {
        path: PathBuf,
    },
    Table {
        connection_string: String,
        table_name: String,
    },
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            StorageConfig::Table { table_name, .. } => f
                .debug_struct("Table")
                .field("connection_string", &"<redacted>")
                .field("table_name", table_name)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |name| std::env::var(name).ok())
    }

    /// `args` is the full argument vector (program name first). Flags win over
    /// the environment.
    pub fn from_sources(args: &[String], var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| var(name).filter(|value| !value.trim().is_empty());

        let mut bind_flag: Option<SocketAddr> = None;
        let mut store_file_flag: Option<PathBuf> = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--bind" => {
                    let value = args.get(i + 1).context("--bind requires <ip:port>")?;
                    bind_flag = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid --bind address: {}", value))?,
                    );
                    i += 2;
                }
                "--store-file" => {
                    let value = args.get(i + 1).context("--store-file requires <path>")?;
                    store_file_flag = Some(PathBuf::from(value));
                    i += 2;
                }
                other => bail!("Unknown argument: {}", other),
            }
        }

        let bind_addr = match bind_flag {
            Some(addr) => addr,
            None => {
                let ip: IpAddr = match var(ENV_BIND_ADDR) {
                    Some(raw) => raw
                        .parse()
                        .with_context(|| format!("Invalid {}: {}", ENV_BIND_ADDR, raw))?,
                    None => IpAddr::from([0, 0, 0, 0]),
                };
                let port: u16 = match var(ENV_PORT) {
                    Some(raw) => raw
                        .parse()
                        .with_context(|| format!("Invalid {}: {}", ENV_PORT, raw))?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::new(ip, port)
            }
        };

        let storage = match var(ENV_CONNECTION_STRING) {
            Some(connection_string) => StorageConfig::Table {
                connection_string,
                table_name: var(ENV_TABLE_NAME).unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            },
            None => StorageConfig::File {
                path: store_file_flag
                    .or_else(|| var(ENV_STORE_FILE).map(PathBuf::from))
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE)),
            },
        };

        Ok(Self { bind_addr, storage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(args: &[&str], env: &[(&str, &str)]) -> Result<Config> {
        let args: Vec<String> = std::iter::once("achievement-api")
            .chain(args.iter().copied())
            .map(String::from)
            .collect();
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(&args, |name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults_select_file_storage() {
        let config = resolve(&[], &[]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:5050".parse().unwrap());
        assert_eq!(
            config.storage,
            StorageConfig::File {
                path: PathBuf::from("achievements.json")
            }
        );
    }

    #[test]
    fn test_connection_string_selects_table_storage() {
        let config = resolve(
            &[],
            &[
                (ENV_CONNECTION_STRING, "UseDevelopmentStorage=true"),
                (ENV_TABLE_NAME, "badges"),
            ],
        )
        .unwrap();

        assert_eq!(
            config.storage,
            StorageConfig::Table {
                connection_string: "UseDevelopmentStorage=true".to_string(),
                table_name: "badges".to_string(),
            }
        );
    }

    #[test]
    fn test_blank_connection_string_falls_back_to_file() {
        let config = resolve(&[], &[(ENV_CONNECTION_STRING, "   ")]).unwrap();
        assert!(matches!(config.storage, StorageConfig::File { .. }));
    }

    #[test]
    fn test_flags_override_environment() {
        let config = resolve(
            &["--bind", "127.0.0.1:6000", "--store-file", "/tmp/b.json"],
            &[(ENV_PORT, "7000"), (ENV_STORE_FILE, "/tmp/env.json")],
        )
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:6000".parse().unwrap());
        assert_eq!(
            config.storage,
            StorageConfig::File {
                path: PathBuf::from("/tmp/b.json")
            }
        );
    }

    #[test]
    fn test_port_and_bind_from_environment() {
        let config = resolve(&[], &[(ENV_PORT, "8081"), (ENV_BIND_ADDR, "127.0.0.1")]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8081".parse().unwrap());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(resolve(&[], &[(ENV_PORT, "not-a-port")]).is_err());
        assert!(resolve(&["--bind"], &[]).is_err());
        assert!(resolve(&["--verbose"], &[]).is_err());
    }

    #[test]
    fn test_debug_output_redacts_connection_string() {
        let storage = StorageConfig::Table {
            connection_string: "AccountKey=secret".to_string(),
            table_name: "achievements".to_string(),
        };
        let printed = format!("{:?}", storage);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("achievements"));
    }
}
