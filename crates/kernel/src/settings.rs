use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "QUARRY_ENV";
const CONFIG_DIR_ENV: &str = "QUARRY_CONFIG_DIR";
const ENV_PREFIX: &str = "QUARRY";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(format!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// What the application does once the database is ready.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Start up and report, nothing else.
    #[default]
    Default,
    /// Verify the seeded rows after startup and fail hard if they are off.
    Manual,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "default" => Ok(RunMode::Default),
            "manual" => Ok(RunMode::Manual),
            other => Err(format!(
                "unsupported run mode '{}'; expected default/manual",
                other
            )),
        }
    }
}

/// Where the CQL session comes from.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    /// Launch a Cassandra container and connect to its mapped port.
    #[default]
    Bootstrap,
    /// Connect to an already running database at `database.hostname:database.port`.
    Attach,
}

impl FromStr for SessionSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bootstrap" => Ok(SessionSource::Bootstrap),
            "attach" => Ok(SessionSource::Attach),
            other => Err(format!(
                "unsupported session source '{}'; expected bootstrap/attach",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .context("unable to resolve current directory")?,
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load `base.toml` and `{environment}.toml` from `config_dir`, then apply
    /// `QUARRY_*` overrides. Both files are optional.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment = environment.parse::<Environment>().map_err(|e| anyhow!(e))?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub source: SessionSource,
    /// Host used when attaching to an external database.
    #[serde(default = "DatabaseSettings::default_hostname")]
    pub hostname: String,
    /// Port used when attaching to an external database.
    #[serde(default = "DatabaseSettings::default_port")]
    pub port: u16,
    /// Must match the keyspace created by the schema script.
    #[serde(default = "DatabaseSettings::default_keyspace")]
    pub keyspace: String,
    #[serde(default = "DatabaseSettings::default_local_datacenter")]
    pub local_datacenter: String,
    #[serde(default = "DatabaseSettings::default_image")]
    pub image: String,
    #[serde(default = "DatabaseSettings::default_image_tag")]
    pub image_tag: String,
    #[serde(default = "DatabaseSettings::default_seed_data")]
    pub seed_data: bool,
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default)]
    pub ignore_failed_drops: bool,
    /// Overrides the bundled schema script.
    #[serde(default)]
    pub schema_script: Option<PathBuf>,
    /// Overrides the bundled seed-data script.
    #[serde(default)]
    pub data_script: Option<PathBuf>,
}

impl DatabaseSettings {
    fn default_hostname() -> String {
        "localhost".to_string()
    }

    fn default_port() -> u16 {
        9042
    }

    fn default_keyspace() -> String {
        "test".to_string()
    }

    fn default_local_datacenter() -> String {
        "datacenter1".to_string()
    }

    fn default_image() -> String {
        "cassandra".to_string()
    }

    fn default_image_tag() -> String {
        "latest".to_string()
    }

    fn default_seed_data() -> bool {
        true
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            source: SessionSource::default(),
            hostname: Self::default_hostname(),
            port: Self::default_port(),
            keyspace: Self::default_keyspace(),
            local_datacenter: Self::default_local_datacenter(),
            image: Self::default_image(),
            image_tag: Self::default_image_tag(),
            seed_data: Self::default_seed_data(),
            continue_on_error: false,
            ignore_failed_drops: false,
            schema_script: None,
            data_script: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Fallback filter directive when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
        assert_eq!(settings.mode, RunMode::Default);
    }

    #[test]
    fn default_database_targets_local_cassandra() {
        let settings = Settings::default();
        assert_eq!(settings.database.source, SessionSource::Bootstrap);
        assert_eq!(settings.database.hostname, "localhost");
        assert_eq!(settings.database.port, 9042);
        assert_eq!(settings.database.keyspace, "test");
        assert_eq!(settings.database.local_datacenter, "datacenter1");
        assert!(settings.database.seed_data);
        assert!(!settings.database.continue_on_error);
        assert!(!settings.database.ignore_failed_drops);
    }

    #[test]
    fn environment_overlay_wins_over_base_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "mode = \"manual\"\n[database]\nkeyspace = \"base\"\nport = 9142\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            "[database]\nkeyspace = \"staged\"\nsource = \"attach\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path(), "staging").unwrap();

        assert_eq!(settings.environment, Environment::Staging);
        assert_eq!(settings.mode, RunMode::Manual);
        assert_eq!(settings.database.keyspace, "staged");
        assert_eq!(settings.database.port, 9142);
        assert_eq!(settings.database.source, SessionSource::Attach);
    }

    #[test]
    fn missing_config_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path(), "local").unwrap();
        assert_eq!(settings.database.image, "cassandra");
        assert_eq!(settings.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn environment_overrides_keep_numeric_looking_strings() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("QUARRY_DATABASE__IMAGE_TAG", "5.0");
        std::env::set_var("QUARRY_DATABASE__SEED_DATA", "false");
        let loaded = Settings::load_from(dir.path(), "local");
        std::env::remove_var("QUARRY_DATABASE__IMAGE_TAG");
        std::env::remove_var("QUARRY_DATABASE__SEED_DATA");

        let settings = loaded.unwrap();
        assert_eq!(settings.database.image_tag, "5.0");
        assert!(!settings.database.seed_data);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load_from(dir.path(), "qa").unwrap_err();
        assert!(err.to_string().contains("unsupported environment 'qa'"));
    }

    #[test]
    fn modes_parse_from_cli_strings() {
        assert_eq!("manual".parse::<RunMode>(), Ok(RunMode::Manual));
        assert_eq!("attach".parse::<SessionSource>(), Ok(SessionSource::Attach));
        assert!("no-boot".parse::<SessionSource>().is_err());
    }
}
