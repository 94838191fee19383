use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use d2_sync_suggest::Auth;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::since::parse_since;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceConfig {
    /// Base URL of the DHIS2 instance, e.g. https://dhis2.example.org
    #[serde(default)]
    pub url: String,

    /// Personal access token
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
    /// Folder holding dhis.log and its rotated files
    pub folder: PathBuf,

    /// Name of the live log file
    #[serde(default = "default_live_file")]
    pub live_file: String,
}

fn default_live_file() -> String {
    String::from(d2_sync_log::files::DEFAULT_LIVE_FILE)
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("/opt/dhis2/logs"),
            live_file: default_live_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestionsConfig {
    /// Mappings file (JSON, or YAML by extension). The bundled mappings are
    /// used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Container running the DHIS2 database, used in fix commands
    #[serde(default)]
    pub docker_container: Option<String>,

    /// Folder with helper scripts referenced by suggestions
    #[serde(default)]
    pub resources_folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointConfig {
    /// Whether to resume from and update the checkpoint file
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub path: PathBuf,
}

fn default_true() -> bool {
    true
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("d2-sync-report.checkpoint.json"),
        }
    }
}

fn default_log_level() -> String {
    String::from("info")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub instance: InstanceConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub suggestions: SuggestionsConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Tracing filter, e.g. "info" or "info,d2_sync_suggest=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance: InstanceConfig::default(),
            logs: LogsConfig::default(),
            suggestions: SuggestionsConfig::default(),
            checkpoint: CheckpointConfig::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Default, Parser)]
#[command(name = "d2-sync-report")]
#[command(about = "Reports DHIS2 synchronization jobs found in the server logs, with suggestions to fix their errors")]
#[command(version)]
pub struct CliArgs {
    /// Path to a YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// DHIS2 instance URL
    #[arg(long)]
    pub url: Option<String>,

    /// DHIS2 personal access token
    #[arg(long, conflicts_with_all = ["username", "password"])]
    pub token: Option<String>,

    /// DHIS2 username (basic authentication)
    #[arg(long, requires = "password")]
    pub username: Option<String>,

    /// DHIS2 password (basic authentication)
    #[arg(long, requires = "username")]
    pub password: Option<String>,

    /// Folder holding dhis.log and its rotated files
    #[arg(long)]
    pub logs_folder: Option<PathBuf>,

    /// Error mappings file (JSON or YAML)
    #[arg(long)]
    pub suggestions: Option<PathBuf>,

    /// Checkpoint file
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Parse records after this time instead of the checkpoint
    /// ("2025-07-16 09:00:00", "2025-07-16", "today", "-2h", ...)
    #[arg(long)]
    pub since: Option<String>,

    /// Neither read nor write the checkpoint
    #[arg(long)]
    pub no_checkpoint: bool,

    /// Docker container of the DHIS2 database, used in suggestions
    #[arg(long)]
    pub docker_container: Option<String>,

    /// Folder with helper scripts, used in suggestions
    #[arg(long)]
    pub resources_folder: Option<String>,

    /// Tracing log level
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Configuration of one run: file values overridden by the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub config: Config,
    pub since: Option<NaiveDateTime>,
}

impl RunConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Config::from_yaml_file(path)
                .with_context(|| format!("Loading config from {}", path.display()))?,
            None => Config::default(),
        };

        let since = args
            .since
            .as_deref()
            .map(parse_since)
            .transpose()
            .context("Invalid --since value")?;

        config.apply(args);
        config.validate()?;

        Ok(Self { config, since })
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?;
        Ok(config)
    }

    /// Command line values take precedence over the file.
    fn apply(&mut self, args: CliArgs) {
        if let Some(url) = args.url {
            self.instance.url = url;
        }
        if let Some(token) = args.token {
            self.instance.token = Some(token);
            self.instance.username = None;
            self.instance.password = None;
        }
        if let (Some(username), Some(password)) = (args.username, args.password) {
            self.instance.username = Some(username);
            self.instance.password = Some(password);
            self.instance.token = None;
        }
        if let Some(folder) = args.logs_folder {
            self.logs.folder = folder;
        }
        if let Some(path) = args.suggestions {
            self.suggestions.path = Some(path);
        }
        if let Some(path) = args.checkpoint {
            self.checkpoint.path = path;
        }
        if args.no_checkpoint {
            self.checkpoint.enabled = false;
        }
        if let Some(container) = args.docker_container {
            self.suggestions.docker_container = Some(container);
        }
        if let Some(folder) = args.resources_folder {
            self.suggestions.resources_folder = Some(folder);
        }
        if let Some(level) = args.log_level {
            self.log_level = level;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let url = self.instance.url.trim();
        if url.is_empty() {
            anyhow::bail!("instance.url is required (--url)");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("instance.url must start with http:// or https://, got {url}");
        }

        self.auth()?;

        if self.logs.folder.as_os_str().is_empty() {
            anyhow::bail!("logs.folder must not be empty");
        }

        if self.logs.live_file.is_empty() {
            anyhow::bail!("logs.live_file must not be empty");
        }

        if self.checkpoint.enabled && self.checkpoint.path.as_os_str().is_empty() {
            anyhow::bail!("checkpoint.path must not be empty");
        }

        Ok(())
    }

    /// Credentials for the instance: a token, or username and password.
    pub fn auth(&self) -> Result<Auth> {
        let instance = &self.instance;

        match (&instance.token, &instance.username, &instance.password) {
            (Some(token), None, None) => Ok(Auth::Token(token.clone())),
            (None, Some(username), Some(password)) => Ok(Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, None, None) => {
                anyhow::bail!("instance credentials are required: a token or username and password")
            }
            (Some(_), _, _) => {
                anyhow::bail!("instance.token cannot be combined with username and password")
            }
            _ => anyhow::bail!("instance.username and instance.password must be set together"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_from_minimal_file() {
        let file = yaml_file("instance:\n  url: https://dhis2.example.org\n  token: d2pat_x\n");
        let config = Config::from_yaml_file(file.path()).unwrap();

        assert_eq!(config.logs.folder, PathBuf::from("/opt/dhis2/logs"));
        assert_eq!(config.logs.live_file, "dhis.log");
        assert!(config.checkpoint.enabled);
        assert_eq!(config.log_level, "info");
        assert!(matches!(config.auth().unwrap(), Auth::Token(_)));
        config.validate().unwrap();
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let file = yaml_file("instance:\n  url: https://dhis2.example.org\n  tokn: x\n");
        assert!(Config::from_yaml_file(file.path()).is_err());
    }

    #[test]
    fn command_line_overrides_file() {
        let file = yaml_file(
            "instance:\n  url: https://old.example.org\n  token: d2pat_x\nlogs:\n  folder: /old\ncheckpoint:\n  path: /tmp/old.json\n",
        );

        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            url: Some(String::from("https://new.example.org")),
            username: Some(String::from("admin")),
            password: Some(String::from("district")),
            logs_folder: Some(PathBuf::from("/new")),
            since: Some(String::from("2025-07-16")),
            no_checkpoint: true,
            docker_container: Some(String::from("dhis2-db")),
            ..Default::default()
        };

        let run = RunConfig::from_args(args).unwrap();
        assert_eq!(run.config.instance.url, "https://new.example.org");
        assert!(matches!(run.config.auth().unwrap(), Auth::Basic { .. }));
        assert_eq!(run.config.logs.folder, PathBuf::from("/new"));
        assert!(!run.config.checkpoint.enabled);
        assert_eq!(run.config.suggestions.docker_container.as_deref(), Some("dhis2-db"));
        assert_eq!(run.since.unwrap().to_string(), "2025-07-16 00:00:00");
    }

    #[test]
    fn validation_errors() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.instance.url = String::from("dhis2.example.org");
        config.instance.token = Some(String::from("t"));
        assert!(config.validate().is_err());

        config.instance.url = String::from("https://dhis2.example.org");
        config.validate().unwrap();

        config.instance.username = Some(String::from("admin"));
        assert!(config.validate().is_err());

        config.instance.token = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_since() {
        let args = CliArgs {
            url: Some(String::from("https://dhis2.example.org")),
            token: Some(String::from("t")),
            since: Some(String::from("someday")),
            ..Default::default()
        };
        assert!(RunConfig::from_args(args).is_err());
    }
}
