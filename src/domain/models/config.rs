//! Configuration model for Tribunal.

use serde::{Deserialize, Serialize};

/// Main configuration structure for Tribunal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generation backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Pacing delays for the simulated exchange
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Auto-continuation safety limits
    #[serde(default)]
    pub auto_continue: AutoContinueConfig,

    /// Turn-handoff phrase table extensions
    #[serde(default)]
    pub turn_rules: TurnRulesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            backend: BackendConfig::default(),
            pacing: PacingConfig::default(),
            auto_continue: AutoContinueConfig::default(),
            turn_rules: TurnRulesConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".tribunal/tribunal.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// API base URL (OpenAI-compatible chat completions endpoint).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// API key; falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

const fn default_timeout_secs() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Pacing delays, in milliseconds, applied between visible state changes
/// so multi-speaker exchanges read as discrete turns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PacingConfig {
    /// Gap between consecutive generated utterances of one invocation.
    #[serde(default = "default_utterance_gap_ms")]
    pub utterance_gap_ms: u64,

    /// Readable delay before each autonomous re-invocation.
    #[serde(default = "default_auto_continue_delay_ms")]
    pub auto_continue_delay_ms: u64,

    /// Gap between scripted opening announcements.
    #[serde(default = "default_presentation_gap_ms")]
    pub presentation_gap_ms: u64,

    /// Settling delay between the opening and the judge's case summary.
    #[serde(default = "default_summary_settle_ms")]
    pub summary_settle_ms: u64,
}

const fn default_utterance_gap_ms() -> u64 {
    800
}

const fn default_auto_continue_delay_ms() -> u64 {
    1500
}

const fn default_presentation_gap_ms() -> u64 {
    1200
}

const fn default_summary_settle_ms() -> u64 {
    3000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            utterance_gap_ms: default_utterance_gap_ms(),
            auto_continue_delay_ms: default_auto_continue_delay_ms(),
            presentation_gap_ms: default_presentation_gap_ms(),
            summary_settle_ms: default_summary_settle_ms(),
        }
    }
}

impl PacingConfig {
    /// Zero delays, for tests.
    pub const fn immediate() -> Self {
        Self {
            utterance_gap_ms: 0,
            auto_continue_delay_ms: 0,
            presentation_gap_ms: 0,
            summary_settle_ms: 0,
        }
    }
}

/// Auto-continuation safety limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AutoContinueConfig {
    /// Ceiling on consecutive auto-advances before the human turn is forced.
    #[serde(default = "default_max_consecutive")]
    pub max_consecutive: u32,
}

const fn default_max_consecutive() -> u32 {
    4
}

impl Default for AutoContinueConfig {
    fn default() -> Self {
        Self {
            max_consecutive: default_max_consecutive(),
        }
    }
}

/// Extensions to the built-in turn-handoff phrase table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TurnRulesConfig {
    /// Extra lowercase phrase fragments that hand the floor to the human.
    #[serde(default)]
    pub extra_phrases: Vec<String>,
}
