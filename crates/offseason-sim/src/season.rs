// Season simulation: project a roster, rank the top contributors, and feed
// them to the win predictor.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::info;

use offseason_core::roster::TeamRoster;

use crate::forecast::{AgingForecaster, ProjectionResult};
use crate::models::WinPredictor;
use crate::tables::round1;

/// Players that feed the win predictor.
pub const TOP_N_PLAYERS: usize = 9;
/// Stat fields per ranked player.
pub const FIELDS_PER_PLAYER: usize = 14;
pub const FEATURE_WIDTH: usize = TOP_N_PLAYERS * FIELDS_PER_PLAYER;

/// Ranked player features: for each rank, points, rebounds, offensive
/// rebounds, assists, steals, blocks, turnovers, FG%, 3P%, threes made,
/// FT%, age, minutes, games played. Empty ranks are all zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector([f64; FEATURE_WIDTH]);

impl FeatureVector {
    pub fn zeros() -> Self {
        FeatureVector([0.0; FEATURE_WIDTH])
    }

    /// Build from players already in rank order; extras past the ninth are
    /// ignored.
    pub fn from_ranked(players: &[ProjectionResult]) -> Self {
        let mut v = Self::zeros();
        for (rank, p) in players.iter().take(TOP_N_PLAYERS).enumerate() {
            let start = rank * FIELDS_PER_PLAYER;
            v.0[start..start + FIELDS_PER_PLAYER].copy_from_slice(&player_fields(p));
        }
        v
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// The 14 fields of one rank (0-based).
    pub fn slot(&self, rank: usize) -> &[f64] {
        &self.0[rank * FIELDS_PER_PLAYER..(rank + 1) * FIELDS_PER_PLAYER]
    }
}

fn player_fields(p: &ProjectionResult) -> [f64; FIELDS_PER_PLAYER] {
    [
        p.points,
        p.rebounds,
        p.offensive_rebounds,
        p.assists,
        p.steals,
        p.blocks,
        p.turnovers,
        p.fg_pct,
        p.fg3_pct,
        p.threes_made,
        p.ft_pct,
        p.age as f64,
        p.minutes,
        p.games_played as f64,
    ]
}

/// Sort by projected points, highest first, and keep the top nine.
pub fn select_top(mut projections: Vec<ProjectionResult>) -> Vec<ProjectionResult> {
    projections.sort_by(|a, b| b.points.total_cmp(&a.points));
    projections.truncate(TOP_N_PLAYERS);
    projections
}

/// Scale minutes down proportionally when they exceed the team budget.
pub fn rescale_minutes(players: &mut [ProjectionResult], budget: f64) {
    let total: f64 = players.iter().map(|p| p.minutes).sum();
    if total <= budget {
        return;
    }
    for p in players.iter_mut() {
        p.minutes = round1(p.minutes / total * budget);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonForecast {
    pub team: String,
    /// Raw predictor output.
    pub wins: f64,
    pub losses: u32,
    /// The ranked contributors, minutes already rescaled.
    pub top_players: Vec<ProjectionResult>,
}

impl SeasonForecast {
    /// Wins rounded to whole games within `[0, season_games]`.
    pub fn whole_wins(&self, season_games: u32) -> u32 {
        whole_wins(self.wins, season_games)
    }
}

fn whole_wins(wins: f64, season_games: u32) -> u32 {
    if wins.is_nan() {
        return 0;
    }
    wins.round().clamp(0.0, season_games as f64) as u32
}

pub struct SeasonSimulator {
    forecaster: Arc<AgingForecaster>,
    predictor: Arc<dyn WinPredictor>,
    minutes_budget: f64,
    season_games: u32,
}

impl SeasonSimulator {
    pub fn new(
        forecaster: Arc<AgingForecaster>,
        predictor: Arc<dyn WinPredictor>,
        minutes_budget: f64,
        season_games: u32,
    ) -> Self {
        SeasonSimulator {
            forecaster,
            predictor,
            minutes_budget,
            season_games,
        }
    }

    pub fn season_games(&self) -> u32 {
        self.season_games
    }

    pub fn forecaster(&self) -> &AgingForecaster {
        &self.forecaster
    }

    /// Project every roster member, rank, and predict the team's record.
    pub fn simulate<R: Rng + ?Sized>(&self, roster: &TeamRoster, rng: &mut R) -> SeasonForecast {
        let projections: Vec<ProjectionResult> = roster
            .players()
            .iter()
            .map(|p| self.forecaster.project(p, rng))
            .collect();

        let mut top = select_top(projections);
        rescale_minutes(&mut top, self.minutes_budget);

        let features = FeatureVector::from_ranked(&top);
        let wins = self.predictor.predict_wins(&features);
        let losses = self.season_games - whole_wins(wins, self.season_games);
        info!(
            "{}: projected {:.1} wins, {} losses ({} players, top {} used)",
            roster.team,
            wins,
            losses,
            roster.len(),
            top.len()
        );

        SeasonForecast {
            team: roster.team.clone(),
            wins,
            losses,
            top_players: top,
        }
    }
}
