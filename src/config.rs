use crate::error::{DumpHubError, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Default size of a single upload chunk (30 MB)
pub const DEFAULT_CHUNK_SIZE: u64 = 30_000_000;

/// Default number of chunk requests of one file that may be in flight together
pub const DEFAULT_MAX_CHUNKS_IN_FLIGHT: usize = 4;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpHubConfig {
    #[serde(rename = "serverUrl")]
    pub server_url: Option<String>,
    #[serde(rename = "chunkSize", default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(rename = "maxChunksInFlight", default = "default_max_chunks_in_flight")]
    pub max_chunks_in_flight: usize,
    #[serde(rename = "pollIntervalSecs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(rename = "commentChar", default = "default_comment_char")]
    pub comment_char: Option<char>,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_max_chunks_in_flight() -> usize {
    DEFAULT_MAX_CHUNKS_IN_FLIGHT
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_separator() -> String {
    ":".to_string()
}

fn default_comment_char() -> Option<char> {
    Some('#')
}

impl Default for DumpHubConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks_in_flight: DEFAULT_MAX_CHUNKS_IN_FLIGHT,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            separator: default_separator(),
            comment_char: default_comment_char(),
        }
    }
}

impl DumpHubConfig {
    /// Base URL of the remote API (`{serverUrl}/api/`)
    pub fn api_base_url(&self) -> Result<Url> {
        let server_url = self
            .server_url
            .as_deref()
            .ok_or_else(|| DumpHubError::Config("No server URL configured".to_string()))?;

        let mut base = Url::parse(server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join("api/")?)
    }

    /// Reject values the upload pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DumpHubError::Config("chunkSize must be positive".to_string()));
        }
        if self.max_chunks_in_flight == 0 {
            return Err(DumpHubError::Config(
                "maxChunksInFlight must be positive".to_string(),
            ));
        }
        if self.separator.is_empty() {
            return Err(DumpHubError::Config("separator must not be empty".to_string()));
        }
        Ok(())
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home_dir| home_dir.join(".dumphub"))
        .ok_or_else(|| DumpHubError::Config("Could not find home directory".to_string()))
}

pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}

pub fn get_logs_dir() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("logs"))
}

pub fn ensure_config_dir() -> Result<()> {
    ensure_private_dir(&get_config_dir()?)
}

pub fn ensure_logs_dir() -> Result<()> {
    ensure_config_dir()?;
    ensure_private_dir(&get_logs_dir()?)
}

fn ensure_private_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;

        // Owner-only access on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(dir)?.permissions();
            permissions.set_mode(0o700);
            fs::set_permissions(dir, permissions)?;
        }
    }
    Ok(())
}

pub fn load_config() -> Result<DumpHubConfig> {
    ensure_config_dir()?;
    load_config_from(&get_config_file_path()?)
}

pub fn load_config_from(config_file: &Path) -> Result<DumpHubConfig> {
    if !config_file.exists() {
        return Ok(DumpHubConfig::default());
    }

    let content = fs::read_to_string(config_file)?;
    let config: DumpHubConfig = serde_json::from_str(&content)?;
    config
        .validate()
        .context(&format!("Invalid config {}", config_file.display()))?;
    Ok(config)
}

pub fn save_config(config: &DumpHubConfig) -> Result<()> {
    ensure_config_dir()?;
    save_config_to(&get_config_file_path()?, config)
}

pub fn save_config_to(config_file: &Path, config: &DumpHubConfig) -> Result<()> {
    config.validate()?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_file, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = fs::metadata(config_file)?.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(config_file, permissions)?;
    }

    Ok(())
}

pub fn clear_config() -> Result<()> {
    save_config(&DumpHubConfig::default())
}
