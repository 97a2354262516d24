//! Configuration file management for wayfarer.
//!
//! Provides a TOML-based config file at `~/.config/wayfarer/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use wayfarer_core::Planner;
use wayfarer_core::budget::PoolPolicy;
use wayfarer_core::token::{SECRET_ENV, TokenConfig};
use wayfarer_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationSection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// Hex-encoded token secret (64 hex chars = 32 bytes).
    pub token_secret: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Daily-budget thresholds for pool selection.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationSection {
    pub medium_threshold: f64,
    pub high_threshold: f64,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the wayfarer config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/wayfarer` or
/// `~/.config/wayfarer`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("wayfarer");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("wayfarer")
}

/// Return the path to the wayfarer config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("failed to parse config file")
}

/// Write the config file, creating its directory first.
///
/// The file holds the token secret, so on Unix it is created owner-only
/// before any bytes are written, then moved into place.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    let path = config_path();
    let staging = path.with_extension("toml.tmp");
    write_private(&staging, contents.as_bytes())
        .with_context(|| format!("failed to write {}", staging.display()))?;
    std::fs::rename(&staging, &path)
        .with_context(|| format!("failed to move config into place at {}", path.display()))?;
    Ok(())
}

fn write_private(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// 32 random bytes, hex-encoded, for `[auth] token_secret`.
pub fn generate_token_secret() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Address `wayfarer serve` listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
}

impl ServerSettings {
    pub const DEFAULT_BIND: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 3000;
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: Self::DEFAULT_BIND.to_owned(),
            port: Self::DEFAULT_PORT,
        }
    }
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct WayfarerConfig {
    pub db_config: DbConfig,
    /// `None` when no secret is configured; only token-handling commands
    /// need one.
    pub token_config: Option<TokenConfig>,
    pub server: ServerSettings,
    pub policy: PoolPolicy,
}

impl WayfarerConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `WAYFARER_DATABASE_URL` env > `config_file.database.url`
    ///   > `DbConfig::DEFAULT_URL`
    /// - Token secret: `WAYFARER_TOKEN_SECRET` env > `config_file.auth.token_secret`
    ///   (hex-decoded) > none
    /// - Server and generation policy: config file > defaults
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();
        Self::resolve_with(cli_db_url, file_config.as_ref())
    }

    fn resolve_with(cli_db_url: Option<&str>, file_config: Option<&ConfigFile>) -> Result<Self> {
        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::URL_ENV) {
            url
        } else if let Some(cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let token_config = if let Ok(secret_hex) = std::env::var(SECRET_ENV) {
            Some(
                TokenConfig::from_hex(&secret_hex)
                    .with_context(|| format!("{SECRET_ENV} env var is not a usable secret"))?,
            )
        } else if let Some(cfg) = file_config {
            Some(
                TokenConfig::from_hex(&cfg.auth.token_secret)
                    .context("invalid token_secret in config file")?,
            )
        } else {
            None
        };

        let mut server = ServerSettings::default();
        if let Some(section) = file_config.and_then(|c| c.server.as_ref()) {
            if let Some(bind) = &section.bind {
                server.bind = bind.clone();
            }
            if let Some(port) = section.port {
                server.port = port;
            }
        }

        let policy = match file_config.and_then(|c| c.generation.as_ref()) {
            Some(g) => PoolPolicy::default()
                .with_thresholds(g.medium_threshold, g.high_threshold)
                .map_err(|e| anyhow!("invalid [generation] section: {e}"))?,
            None => PoolPolicy::default(),
        };

        Ok(Self {
            db_config,
            token_config,
            server,
            policy,
        })
    }

    /// The token secret, or an error telling the operator how to set one.
    pub fn require_token_config(&self) -> Result<&TokenConfig> {
        self.token_config.as_ref().ok_or_else(|| {
            anyhow!(
                "token secret not found; set {SECRET_ENV} or run `wayfarer init` \
                 to create a config file"
            )
        })
    }

    pub fn planner(&self) -> Planner {
        Planner::new(self.policy.clone())
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
