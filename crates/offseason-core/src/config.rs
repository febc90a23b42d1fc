// Configuration loading and parsing (league.toml, simulation.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::catalog::Salary;
use crate::transactions::CapRules;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub simulation: SimulationConfig,
    pub forecast: ForecastConfig,
    pub data_paths: DataPaths,
    pub models: ModelPaths,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Season the catalog describes, e.g. "2024-25".
    pub season: String,
    /// Season being simulated.
    pub next_season: String,
    pub season_games: u32,
    /// Luxury-tax threshold in dollars.
    pub salary_cap: i64,
    /// Hard ceiling after a free-agent signing, in dollars.
    pub second_apron: i64,
    /// Full franchise name -> abbreviation.
    pub teams: BTreeMap<String, String>,
}

impl LeagueConfig {
    pub fn cap_rules(&self) -> CapRules {
        CapRules {
            salary_cap: Salary::from_dollars(self.salary_cap),
            second_apron: Salary::from_dollars(self.second_apron),
        }
    }

    /// Team abbreviations in sorted order.
    pub fn abbreviations(&self) -> Vec<String> {
        let mut abbrs: Vec<String> = self.teams.values().cloned().collect();
        abbrs.sort();
        abbrs.dedup();
        abbrs
    }

    /// Resolve either an abbreviation ("hou") or a full name
    /// ("Houston Rockets") to the canonical abbreviation.
    pub fn resolve_team(&self, name_or_abbr: &str) -> Option<String> {
        let query = name_or_abbr.trim();
        if let Some(abbr) = self
            .teams
            .values()
            .find(|abbr| abbr.eq_ignore_ascii_case(query))
        {
            return Some(abbr.clone());
        }
        self.teams
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(query))
            .map(|(_, abbr)| abbr.clone())
    }
}

// ---------------------------------------------------------------------------
// simulation.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire simulation.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SimulationFile {
    simulation: SimulationConfig,
    forecast: ForecastConfig,
    data_paths: DataPaths,
    models: ModelPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Team minutes available per game; top contributors are scaled to fit.
    pub minutes_budget: f64,
    /// Fixed seed for reproducible runs. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Noise standard deviation as a fraction of the projected value.
    pub noise_fraction: f64,
    /// Lower bound on the noise standard deviation.
    pub noise_floor: f64,
    /// Seasons with fewer games are ignored when projecting games played.
    pub min_history_games: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub catalog: String,
    pub free_agents: String,
    /// Season stat files, oldest first.
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelPaths {
    pub dir: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/simulation.toml` relative to `base_dir`.
///
/// Does not copy defaults; call [`ensure_config_files`] first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let simulation_path = config_dir.join("simulation.toml");
    let simulation_text = read_file(&simulation_path)?;
    let simulation_file: SimulationFile =
        toml::from_str(&simulation_text).map_err(|e| ConfigError::ParseError {
            path: simulation_path.clone(),
            source: e,
        })?;

    let config = Config {
        league: league_file.league,
        simulation: simulation_file.simulation,
        forecast: simulation_file.forecast,
        data_paths: simulation_file.data_paths,
        models: simulation_file.models,
    };

    validate(&config)?;

    Ok(config)
}

/// Files under `config/` that are seeded from `defaults/`.
pub const CONFIG_FILES: [&str; 2] = ["league.toml", "simulation.toml"];

/// Copy each missing config file from `defaults/`. Existing files are left
/// alone. Returns the paths that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    let copy_error = |message: String| ConfigError::DefaultsCopyError { message };

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(copy_error(format!(
                "{} is missing and there is no default at {}",
                target.display(),
                source.display()
            )));
        }
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| copy_error(format!("failed to create {}: {e}", config_dir.display())))?;
        std::fs::copy(&source, &target).map_err(|e| {
            copy_error(format!(
                "failed to copy {} to {}: {e}",
                source.display(),
                target.display()
            ))
        })?;
        info!("Seeded {} from defaults", target.display());
        copied.push(target);
    }
    Ok(copied)
}

/// Directory holding `config/` and `defaults/`.
///
/// The working directory when it looks like a project root, otherwise the
/// per-user data directory (e.g. `~/.local/share/offseason`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        return Ok(cwd);
    }
    match directories::ProjectDirs::from("", "", "offseason") {
        Some(dirs) => Ok(dirs.data_dir().to_path_buf()),
        None => Ok(cwd),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.salary_cap <= 0 {
        return Err(invalid("league.salary_cap", "must be greater than 0"));
    }
    if league.second_apron < league.salary_cap {
        return Err(invalid(
            "league.second_apron",
            format!(
                "must be at least the salary cap ({}), got {}",
                league.salary_cap, league.second_apron
            ),
        ));
    }
    if league.season_games == 0 {
        return Err(invalid("league.season_games", "must be greater than 0"));
    }
    if league.teams.is_empty() {
        return Err(invalid("league.teams", "at least one team is required"));
    }
    if let Some((name, _)) = league.teams.iter().find(|(_, abbr)| abbr.trim().is_empty()) {
        return Err(invalid("league.teams", format!("empty abbreviation for {name}")));
    }

    if config.simulation.minutes_budget <= 0.0 {
        return Err(invalid(
            "simulation.minutes_budget",
            format!("must be > 0, got {}", config.simulation.minutes_budget),
        ));
    }

    let forecast = &config.forecast;
    if forecast.noise_fraction.is_nan() || forecast.noise_fraction < 0.0 {
        return Err(invalid(
            "forecast.noise_fraction",
            format!("must be >= 0, got {}", forecast.noise_fraction),
        ));
    }
    if forecast.noise_floor.is_nan() || forecast.noise_floor <= 0.0 {
        return Err(invalid(
            "forecast.noise_floor",
            format!("must be > 0, got {}", forecast.noise_floor),
        ));
    }

    if config.data_paths.history.is_empty() {
        return Err(invalid("data_paths.history", "at least one season file is required"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
