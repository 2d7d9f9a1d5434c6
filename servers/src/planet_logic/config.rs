use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use lib_planetwatch::protocol::MAX_FRAME_SIZE;

const DEFAULT_CONFIG_FILE: &str = "server_planetwatch.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[clap(about = "Planet telemetry WebSocket server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "PLANETWATCH_PORT", help = "Port to listen on for WebSocket clients.")]
    pub port: Option<u16>,

    #[clap(long, env = "PLANETWATCH_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "PLANETWATCH_PLANETS_PATH", help = "Path to the JSON planet directory.")]
    pub planets_path: Option<PathBuf>,

    #[clap(long, env = "PLANETWATCH_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "PLANETWATCH_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "PLANETWATCH_MAX_FRAME_SIZE", help = "Largest accepted planet frame in bytes.")]
    pub max_frame_size: Option<u32>,
}

/// Fully resolved settings, every field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    pub planets_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub max_frame_size: u32,
}

impl Config {
    // 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            planets_path: other.planets_path.or(self.planets_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            max_frame_size: other.max_frame_size.or(self.max_frame_size),
        }
    }

    fn defaults() -> Config {
        Config {
            port: Some(9010),
            planets_path: Some(PathBuf::from("planets.json")),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            max_frame_size: Some(MAX_FRAME_SIZE),
            ..Default::default()
        }
    }

    fn into_settings(self) -> Settings {
        let defaults = Config::defaults();
        Settings {
            port: self.port.or(defaults.port).unwrap_or(9010),
            planets_path: self.planets_path.or(defaults.planets_path).unwrap_or_default(),
            log_dir: self.log_dir.or(defaults.log_dir).unwrap_or_default(),
            log_level: self.log_level.or(defaults.log_level).unwrap_or_default(),
            max_frame_size: self.max_frame_size.unwrap_or(MAX_FRAME_SIZE),
        }
    }
}

/// Reads a JSON config file. Missing or malformed files yield `None`.
fn read_config_file(path: &Path) -> Option<Config> {
    if !path.exists() {
        log::info!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
        return None;
    }
    let config_str = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<Config>(&config_str) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e);
            None
        }
    }
}

/// Layers defaults, the config file and `cli` (which already includes
/// environment variables), later sources winning.
pub fn resolve(cli: Config) -> Settings {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path) {
        current = current.merge(file_config);
    }
    current.merge(cli).into_settings()
}

pub fn load_config() -> Settings {
    resolve(Config::parse())
}
