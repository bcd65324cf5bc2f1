//! Configuration module - environment variable parsing and balance tables

pub mod balance;

pub use balance::{
    BotConfig, BuffConfig, ClassStamina, GameConfig, MeleeStats, PerClass, PickupConfig,
    RespawnConfig, TeamConfig, WeaponTable,
};

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Process configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Status endpoint binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub json_logs: bool,
    /// Optional JSON file overriding balance constants
    pub balance_path: Option<PathBuf>,
    /// Fixed rng seed for reproducible runs
    pub seed: Option<u64>,
    /// Synthetic connected players registered with the headless host
    pub sim_players: usize,
    /// Overrides `bots.per_team` from the balance file
    pub bots_per_team: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")),

            balance_path: env::var("BALANCE_CONFIG").ok().map(PathBuf::from),

            seed: parse_optional("SIM_SEED")?,
            sim_players: parse_optional("SIM_PLAYERS")?.unwrap_or(4),
            bots_per_team: parse_optional("BOTS_PER_TEAM")?,
        })
    }

    /// Balance constants: defaults, then the JSON override file, then env overrides
    pub fn game_config(&self) -> Result<GameConfig, ConfigError> {
        let mut game = match &self.balance_path {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };
        if let Some(per_team) = self.bots_per_team {
            game.bots.per_team = per_team;
        }
        Ok(game)
    }
}

fn parse_optional<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber(key)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid numeric value for environment variable: {0}")]
    InvalidNumber(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Failed to read balance file {path}: {source}")]
    BalanceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse balance config: {0}")]
    BalanceParse(#[from] serde_json::Error),
}
