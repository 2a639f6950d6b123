use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use sqlx::sqlite::SqliteJournalMode;

use crate::wasm_udf::runtime::DEFAULT_FUEL_LIMIT;

pub const ENV_PREFIX: &str = "WASMFN";

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct WasmFnConfig {
    pub object_store: ObjectStore,
    pub catalog: Catalog,
    #[serde(default)]
    pub runtime: Runtime,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStore {
    Local(Local),
    #[serde(rename = "memory")]
    InMemory(InMemory),
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Local {
    pub data_dir: String,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct InMemory {}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Catalog {
    Sqlite(Sqlite),
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Sqlite {
    pub dsn: String,
    #[serde(default)]
    pub journal_mode: JournalMode,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

impl From<JournalMode> for SqliteJournalMode {
    fn from(val: JournalMode) -> Self {
        match val {
            JournalMode::Delete => SqliteJournalMode::Delete,
            JournalMode::Truncate => SqliteJournalMode::Truncate,
            JournalMode::Persist => SqliteJournalMode::Persist,
            JournalMode::Memory => SqliteJournalMode::Memory,
            JournalMode::Wal => SqliteJournalMode::Wal,
            JournalMode::Off => SqliteJournalMode::Off,
        }
    }
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Runtime {
    // Units of wasmtime fuel a single UDF call may burn before it's aborted
    pub fuel_limit: u64,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            fuel_limit: DEFAULT_FUEL_LIMIT,
        }
    }
}

pub fn validate_config(config: WasmFnConfig) -> Result<WasmFnConfig, ConfigError> {
    let in_memory_catalog = matches!(config.catalog, Catalog::Sqlite(Sqlite { ref dsn, .. }) if dsn.contains(":memory:"));

    let in_memory_object_store = matches!(config.object_store, ObjectStore::InMemory(_));

    if in_memory_catalog ^ in_memory_object_store {
        return Err(ConfigError::Message(
            "You are using an in-memory catalog with a non in-memory \
        object store or vice versa. This will cause consistency issues \
        if the process is restarted."
                .to_string(),
        ));
    }

    if config.runtime.fuel_limit == 0 {
        return Err(ConfigError::Message(
            "runtime.fuel_limit has to be greater than zero".to_string(),
        ));
    }

    Ok(config)
}

fn env_source(env_override: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .source(env_override)
}

pub fn load_config(path: &Path) -> Result<WasmFnConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path))
        .add_source(env_source(None));

    config.build()?.try_deserialize().and_then(validate_config)
}

// Load a config from a string (to test our structs are defined correctly)
pub fn load_config_from_string(
    config_str: &str,
    skip_validation: bool,
    env_override: Option<HashMap<String, String>>,
) -> Result<WasmFnConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(config_str, FileFormat::Toml))
        .add_source(env_source(env_override));

    if skip_validation {
        config.build()?.try_deserialize()
    } else {
        config.build()?.try_deserialize().and_then(validate_config)
    }
}
