// Copyright 2024-2025 Golem Cloud
//
// Licensed under the Golem Source License v1.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://license.golem.cloud/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::SafeDisplay;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteConnectOptions;
use std::fmt::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub const ENV_VAR_PREFIX: &str = "AUCTION__";
pub const ENV_VAR_NESTED_SEPARATOR: &str = "__";

const DUMP_DEFAULT_TOML_FLAG: &str = "--dump-config-default-toml";
const DUMP_DEFAULT_ENV_VAR_FLAG: &str = "--dump-config-default-env-var";

pub type ConfigExample<T> = (&'static str, T);

pub trait HasConfigExamples<T> {
    fn examples() -> Vec<ConfigExample<T>>;
}

/// Layered configuration: built-in defaults, then the TOML file, then `AUCTION__` prefixed
/// environment variables (`__` separates nested keys).
pub struct ConfigLoader<T> {
    pub config_file_name: PathBuf,
    examples: Vec<ConfigExample<T>>,
    config_type: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Default> ConfigLoader<T> {
    pub fn new(config_file_name: &Path) -> Self {
        Self {
            config_file_name: config_file_name.to_path_buf(),
            examples: Vec::new(),
            config_type: PhantomData,
        }
    }

    pub fn new_with_examples(config_file_name: &Path) -> Self
    where
        T: HasConfigExamples<T>,
    {
        Self {
            config_file_name: config_file_name.to_path_buf(),
            examples: T::examples(),
            config_type: PhantomData,
        }
    }

    pub fn figment(&self) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(T::default()))
            .merge(Toml::file(&self.config_file_name))
            .merge(Env::prefixed(ENV_VAR_PREFIX).split(ENV_VAR_NESTED_SEPARATOR))
    }

    pub fn load(&self) -> Result<T, figment::Error> {
        self.figment().extract()
    }

    /// Loads the configuration, unless one of the dump flags was passed on the command line,
    /// in which case the defaults are printed and `None` is returned.
    pub fn load_or_dump_config(&self) -> Result<Option<T>, anyhow::Error> {
        let args: Vec<String> = std::env::args().collect();
        if args.iter().any(|arg| arg == DUMP_DEFAULT_TOML_FLAG) {
            println!("{}", self.default_toml()?);
            Ok(None)
        } else if args.iter().any(|arg| arg == DUMP_DEFAULT_ENV_VAR_FLAG) {
            println!("{}", self.default_env_vars()?);
            Ok(None)
        } else {
            Ok(Some(self.load()?))
        }
    }

    pub fn default_toml(&self) -> Result<String, anyhow::Error> {
        let mut result = String::new();
        let _ = writeln!(&mut result, "# Generated from default config");
        result.push_str(&toml::to_string(&T::default())?);

        for (name, example) in &self.examples {
            let _ = writeln!(&mut result);
            let _ = writeln!(&mut result, "# Generated example: {name}");
            for line in toml::to_string(example)?.lines() {
                let _ = writeln!(&mut result, "# {line}");
            }
        }

        Ok(result)
    }

    pub fn default_env_vars(&self) -> Result<String, anyhow::Error> {
        let value = serde_json::to_value(T::default())?;
        let mut lines = Vec::new();
        collect_env_vars(ENV_VAR_PREFIX.trim_end_matches(ENV_VAR_NESTED_SEPARATOR), &value, &mut lines);
        Ok(lines.join("\n"))
    }
}

fn collect_env_vars(prefix: &str, value: &serde_json::Value, lines: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(fields) => {
            for (key, value) in fields {
                let name = format!("{prefix}{ENV_VAR_NESTED_SEPARATOR}{}", key.to_uppercase());
                collect_env_vars(&name, value, lines);
            }
        }
        serde_json::Value::Null => {}
        serde_json::Value::String(value) => lines.push(format!("{prefix}={value}")),
        other => lines.push(format!("{prefix}={other}")),
    }
}

#[derive(Clone, Debug, Serialize, serde::Deserialize)]
pub struct DbSqliteConfig {
    pub database: String,
    pub max_connections: u32,
    pub foreign_keys: bool,
}

impl DbSqliteConfig {
    pub fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(Path::new(self.database.as_str()))
            .create_if_missing(true)
            .foreign_keys(self.foreign_keys)
    }
}

impl Default for DbSqliteConfig {
    fn default() -> Self {
        Self {
            database: "../data/auctions.sqlite".to_string(),
            max_connections: 10,
            foreign_keys: true,
        }
    }
}

impl SafeDisplay for DbSqliteConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "database: {}", self.database);
        let _ = writeln!(&mut result, "max connections: {}", self.max_connections);
        let _ = writeln!(&mut result, "foreign keys: {}", self.foreign_keys);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigExample, ConfigLoader, HasConfigExamples};
    use assert2::check;
    use serde::{Deserialize, Serialize};
    use std::path::Path;
    use std::time::Duration;
    use test_r::test;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct SampleConfig {
        port: u16,
        #[serde(with = "humantime_serde")]
        interval: Duration,
        nested: Nested,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Nested {
        name: String,
    }

    impl Default for SampleConfig {
        fn default() -> Self {
            Self {
                port: 8080,
                interval: Duration::from_secs(5),
                nested: Nested {
                    name: "default".to_string(),
                },
            }
        }
    }

    impl HasConfigExamples<SampleConfig> for SampleConfig {
        fn examples() -> Vec<ConfigExample<SampleConfig>> {
            vec![(
                "fast interval",
                Self {
                    interval: Duration::from_millis(100),
                    ..Self::default()
                },
            )]
        }
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let loader: ConfigLoader<SampleConfig> =
            ConfigLoader::new(Path::new("config/does-not-exist.toml"));
        check!(loader.load().unwrap() == SampleConfig::default());
    }

    #[test]
    fn default_toml_contains_examples_as_comments() {
        let loader: ConfigLoader<SampleConfig> =
            ConfigLoader::new_with_examples(Path::new("config/does-not-exist.toml"));
        let toml = loader.default_toml().unwrap();
        check!(toml.contains("port = 8080"));
        check!(toml.contains("# Generated example: fast interval"));
        check!(toml.contains("# interval = \"100ms\""));
    }

    #[test]
    fn default_env_vars_are_nested_with_prefix() {
        let loader: ConfigLoader<SampleConfig> =
            ConfigLoader::new(Path::new("config/does-not-exist.toml"));
        let env_vars = loader.default_env_vars().unwrap();
        check!(env_vars.contains("AUCTION__PORT=8080"));
        check!(env_vars.contains("AUCTION__NESTED__NAME=default"));
    }
}
