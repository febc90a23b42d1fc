// Multi-season player history used by the games-played and plus/minus
// projections.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{load_players_from_reader, normalize_name, open, CatalogError, Player};

/// One past season for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonEntry {
    pub season: String,
    pub games_played: u32,
    pub plus_minus: f64,
}

/// Season lines keyed by normalized player name, oldest season first.
#[derive(Debug, Clone, Default)]
pub struct PlayerHistory {
    seasons: HashMap<String, Vec<SeasonEntry>>,
    total_games: u64,
    total_rows: u64,
}

impl PlayerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one season's rows. Seasons must be pushed in chronological order.
    pub fn push_season(&mut self, season: &str, players: &[Player]) {
        for p in players {
            self.seasons
                .entry(p.name.clone())
                .or_default()
                .push(SeasonEntry {
                    season: season.to_string(),
                    games_played: p.stats.games_played,
                    plus_minus: p.stats.plus_minus,
                });
            self.total_games += p.stats.games_played as u64;
            self.total_rows += 1;
        }
    }

    /// All recorded seasons for a player, oldest first. Empty if unknown.
    pub fn seasons(&self, name: &str) -> &[SeasonEntry] {
        self.seasons
            .get(&normalize_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mean games played over every row of every loaded season.
    pub fn league_mean_games(&self) -> Option<f64> {
        if self.total_rows == 0 {
            None
        } else {
            Some(self.total_games as f64 / self.total_rows as f64)
        }
    }

    pub fn player_count(&self) -> usize {
        self.seasons.len()
    }
}

/// Season label from a file name such as `player_stats_2021-22_cleaned.csv`.
/// Falls back to the file stem.
fn season_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    stem.split('_')
        .find(|part| {
            part.len() == 7
                && part.as_bytes()[4] == b'-'
                && part.chars().filter(|c| c.is_ascii_digit()).count() == 6
        })
        .unwrap_or(stem)
        .to_string()
}

/// Load history files in the given (chronological) order.
pub fn load_history<P: AsRef<Path>>(paths: &[P]) -> Result<PlayerHistory, CatalogError> {
    let mut history = PlayerHistory::new();
    for path in paths {
        let path = path.as_ref();
        let players = load_players_from_reader(open(path)?).map_err(|e| CatalogError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        if players.is_empty() {
            warn!("history file {} has no valid rows", path.display());
        }
        history.push_season(&season_label(path), &players);
    }
    info!(
        "Loaded history for {} players from {} season files",
        history.player_count(),
        paths.len()
    );
    Ok(history)
}
