use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Application configuration structure that defines all runtime parameters.
///
/// This structure holds the complete configuration for the validator: network settings,
/// the four working directories, logging retention and task retention. It is read from a
/// TOML file where every key is optional, and a few values can be overridden from the
/// command line through [`CliArgs`].
///
/// # Examples
///
/// ```
/// use sipot_validator::configuration::config::Config;
///
/// let config = Config::from_toml_str("port = 9000").unwrap();
/// assert_eq!(config.port, 9000);
/// assert_eq!(config.upload_dir.to_str(), Some("temp_uploads"));
/// ```
///
/// # Fields Overview
///
/// - `bind_address`: interface the HTTP server binds to
/// - `port`: HTTP port, 8081 unless told otherwise
/// - `upload_dir`: where uploaded files wait for their validation task
/// - `download_dir`: where JSON exports are written and served from
/// - `log_dir`: daily log files (`validacion_YYYY-MM-DD.log`)
/// - `static_dir`: static assets served under `/static`, including the report logo
/// - `logo_file`: logo file name inside `static_dir`
/// - `log_retention_days`: number of daily log files to keep
/// - `max_upload_bytes`: upper bound for a single upload
/// - `task_ttl_secs`: how long finished tasks and their exports are kept, `0` keeps them forever
/// - `cleanup_interval_secs`: period of the retention sweep
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub download_dir: PathBuf,
    pub log_dir: PathBuf,
    pub static_dir: PathBuf,
    pub logo_file: String,
    pub log_retention_days: u32,
    pub max_upload_bytes: u64,
    pub task_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(UPLOAD_FOLDER),
            download_dir: PathBuf::from(DOWNLOAD_FOLDER),
            log_dir: PathBuf::from(LOG_FOLDER),
            static_dir: PathBuf::from(STATIC_FOLDER),
            logo_file: DEFAULT_LOGO_FILE.to_string(),
            log_retention_days: DEFAULT_LOG_RETENTION_DAYS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            task_ttl_secs: DEFAULT_TASK_TTL_SECS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
        }
    }
}

/// Command-line arguments.
///
/// Everything except the configuration file location is optional and only overrides what
/// the file (or the defaults) say.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "sipot-validator")]
#[command(version)]
#[command(about = "Pre-validador de formatos SIPOT")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    ///
    /// # Command Line
    /// Use `--config <FILE>` or the `SIPOT_CONFIG` environment variable
    #[arg(long, env = "SIPOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Network address to bind the server to
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the effective configuration from command-line arguments.
    ///
    /// The file named by `--config` is loaded first (defaults when absent), then the
    /// explicit flags are applied on top and the result is validated again.
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => {
                debug!("No configuration file given, using defaults");
                Self::default()
            }
        };
        if let Some(addr) = &args.bind_address {
            config.bind_address = addr.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::BadPort(self.port));
        }
        self.bind_address
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::BadIPFormatting(format!("{}: {}", self.bind_address, e)))?;
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::NotInRange(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        if self.log_retention_days == 0 {
            return Err(ConfigError::NotInRange(
                "log_retention_days must be greater than 0".to_string(),
            ));
        }
        if self.task_ttl_secs > MAX_TASK_TTL_SECS {
            return Err(ConfigError::NotInRange(format!(
                "task_ttl_secs must not exceed {}",
                MAX_TASK_TTL_SECS
            )));
        }
        if self.logo_file.contains('/') || self.logo_file.contains('\\') {
            return Err(ConfigError::NotInRange(format!(
                "logo_file must be a plain file name: {}",
                self.logo_file
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .bind_address
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::BadIPFormatting(format!("{}: {}", self.bind_address, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn logo_path(&self) -> PathBuf {
        self.static_dir.join(&self.logo_file)
    }

    /// Creates the working directories (`logs`, `temp_uploads`, `temp_downloads`, `static`)
    /// when they do not exist yet.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        for dir in [
            &self.upload_dir,
            &self.download_dir,
            &self.log_dir,
            &self.static_dir,
        ] {
            fs::create_dir_all(dir).map_err(|e| {
                ConfigError::DirectoryNotWritable(format!("{}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_working_layout() {
        let config = Config::default();
        assert_eq!(config.port, 8081);
        assert_eq!(config.upload_dir, PathBuf::from("temp_uploads"));
        assert_eq!(config.download_dir, PathBuf::from("temp_downloads"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.static_dir, PathBuf::from("static"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str_partial() {
        let config = Config::from_toml_str(
            r#"
            bind_address = "127.0.0.1"
            port = 9090
            task_ttl_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 9090);
        assert_eq!(config.task_ttl_secs, 0);
        assert_eq!(config.log_retention_days, 30);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = Config::from_toml_str("prot = 1").unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            bind_address: "not-an-ip".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BadIPFormatting(_))));

        let config = Config {
            port: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BadPort(0))));

        let config = Config {
            max_upload_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NotInRange(_))));

        let config = Config {
            task_ttl_secs: 1_000_000_000_000_000,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NotInRange(_))));

        let config = Config {
            logo_file: "../secret.png".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8081");
    }

    #[test]
    fn test_ensure_directories() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            upload_dir: dir.path().join("temp_uploads"),
            download_dir: dir.path().join("temp_downloads"),
            log_dir: dir.path().join("logs"),
            static_dir: dir.path().join("static"),
            ..Default::default()
        };
        config.ensure_directories().unwrap();
        assert!(config.upload_dir.is_dir());
        assert!(config.download_dir.is_dir());
        assert!(config.log_dir.is_dir());
        assert!(config.static_dir.is_dir());
    }

    #[test]
    fn test_from_args_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = 7000\nbind_address = \"127.0.0.1\"\n").unwrap();

        let args = CliArgs::try_parse_from([
            "sipot-validator",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "7001",
        ])
        .unwrap();
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.port, 7001);
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    #[serial]
    fn test_config_path_from_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("env.toml");
        fs::write(&path, "port = 8123\n").unwrap();

        std::env::set_var("SIPOT_CONFIG", &path);
        let args = CliArgs::try_parse_from(["sipot-validator"]).unwrap();
        std::env::remove_var("SIPOT_CONFIG");

        assert_eq!(args.config.as_deref(), Some(path.as_path()));
        assert_eq!(Config::from_args(&args).unwrap().port, 8123);
    }

    #[test]
    #[serial]
    fn test_no_config_uses_defaults() {
        std::env::remove_var("SIPOT_CONFIG");
        let args = CliArgs::try_parse_from(["sipot-validator"]).unwrap();
        assert_eq!(Config::from_args(&args).unwrap(), Config::default());
    }
}
