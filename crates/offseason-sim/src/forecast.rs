// Next-season projection for a single player.
//
// Counting stats come out as per-game rates. Randomness is always supplied
// by the caller so a seeded rng reproduces a projection exactly.

use std::sync::Arc;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::debug;

use offseason_core::catalog::{Player, Salary, MAX_GAMES};
use offseason_core::config::ForecastConfig;
use offseason_core::history::PlayerHistory;

use crate::models::{AgingModels, CountingStat};
use crate::tables::{adjust_shooting, is_breakout, project_minutes, round1, AgeBracket};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastParams {
    /// Noise standard deviation as a fraction of the value.
    pub noise_fraction: f64,
    /// Minimum noise standard deviation.
    pub noise_floor: f64,
    /// Seasons with fewer games are ignored for the games-played mean.
    pub min_history_games: u32,
    pub season_games: u32,
}

impl Default for ForecastParams {
    fn default() -> Self {
        ForecastParams {
            noise_fraction: 0.1,
            noise_floor: 0.01,
            min_history_games: 30,
            season_games: MAX_GAMES,
        }
    }
}

impl ForecastParams {
    pub fn from_config(forecast: &ForecastConfig, season_games: u32) -> Self {
        ForecastParams {
            noise_fraction: forecast.noise_fraction,
            noise_floor: forecast.noise_floor,
            min_history_games: forecast.min_history_games,
            season_games,
        }
    }
}

/// A projected next-season stat line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub id: u64,
    pub name: String,
    pub team: String,
    pub salary: Salary,
    /// Projected (next-season) age.
    pub age: u32,
    pub minutes: f64,
    pub games_played: u32,
    pub points: f64,
    pub rebounds: f64,
    pub offensive_rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub turnovers: f64,
    pub threes_made: f64,
    pub plus_minus: f64,
    pub fg_pct: f64,
    pub fg3_pct: f64,
    pub ft_pct: f64,
}

impl ProjectionResult {
    fn counting_mut(&mut self, stat: CountingStat) -> &mut f64 {
        match stat {
            CountingStat::Points => &mut self.points,
            CountingStat::Rebounds => &mut self.rebounds,
            CountingStat::OffensiveRebounds => &mut self.offensive_rebounds,
            CountingStat::Assists => &mut self.assists,
            CountingStat::Steals => &mut self.steals,
            CountingStat::Blocks => &mut self.blocks,
            CountingStat::Turnovers => &mut self.turnovers,
        }
    }
}

pub struct AgingForecaster {
    models: Arc<AgingModels>,
    history: Arc<PlayerHistory>,
    params: ForecastParams,
}

impl AgingForecaster {
    pub fn new(models: Arc<AgingModels>, history: Arc<PlayerHistory>, params: ForecastParams) -> Self {
        AgingForecaster {
            models,
            history,
            params,
        }
    }

    pub fn params(&self) -> &ForecastParams {
        &self.params
    }

    /// `x` plus Gaussian noise with sd `max(fraction * |x|, floor)`.
    fn with_noise<R: Rng + ?Sized>(&self, x: f64, rng: &mut R) -> f64 {
        let sd = (self.params.noise_fraction * x.abs()).max(self.params.noise_floor);
        match Normal::new(0.0, sd) {
            Ok(normal) => x + normal.sample(rng),
            Err(_) => x,
        }
    }

    /// Mean games over qualifying history seasons (league mean when none),
    /// rounded and capped at a full season.
    fn baseline_games(&self, player: &Player) -> f64 {
        let qualifying: Vec<f64> = self
            .history
            .seasons(&player.name)
            .iter()
            .filter(|s| s.games_played >= self.params.min_history_games)
            .map(|s| s.games_played as f64)
            .collect();
        let mean = if qualifying.is_empty() {
            self.history
                .league_mean_games()
                .unwrap_or(player.stats.games_played as f64)
        } else {
            qualifying.iter().sum::<f64>() / qualifying.len() as f64
        };
        mean.round().min(self.params.season_games as f64)
    }

    /// Season plus/minus: extrapolate half the latest change when there are
    /// two or more history seasons, otherwise carry the current value.
    fn baseline_plus_minus(&self, player: &Player) -> f64 {
        match self.history.seasons(&player.name) {
            [.., prev, last] => round1(last.plus_minus + 0.5 * (last.plus_minus - prev.plus_minus)),
            _ => round1(player.stats.plus_minus),
        }
    }

    pub fn project<R: Rng + ?Sized>(&self, player: &Player, rng: &mut R) -> ProjectionResult {
        let stats = &player.stats;
        let age_last = player.age as f64;
        let age_next = player.age + 1;
        let bracket = AgeBracket::from_age(age_next);

        let minutes_last = stats.minutes_per_game();
        let pts_per_min_last = stats.per_minute(stats.points);
        let breakout = is_breakout(bracket, pts_per_min_last, minutes_last);
        let minutes = project_minutes(minutes_last, bracket, breakout, rng.gen::<f64>());

        let mut projection = ProjectionResult {
            id: player.id,
            name: player.name.clone(),
            team: player.team.clone(),
            salary: player.salary,
            age: age_next,
            minutes,
            games_played: 0,
            points: 0.0,
            rebounds: 0.0,
            offensive_rebounds: 0.0,
            assists: 0.0,
            steals: 0.0,
            blocks: 0.0,
            turnovers: 0.0,
            threes_made: 0.0,
            plus_minus: 0.0,
            fg_pct: 0.0,
            fg3_pct: 0.0,
            ft_pct: 0.0,
        };

        for stat in CountingStat::ALL {
            let per_min_last = stats.per_minute(stat.total(stats));
            let per_min_next = self.models.per_minute(stat).predict(per_min_last, age_last);
            let value = self.with_noise(per_min_next * minutes, rng).max(0.0);
            *projection.counting_mut(stat) = round1(value);
        }

        let season_games = self.params.season_games as f64;
        let games = self
            .with_noise(self.baseline_games(player), rng)
            .round()
            .clamp(0.0, season_games);
        projection.games_played = games as u32;

        let threes_total = self.models.threes_made().predict(stats.threes_made, age_last);
        let plus_minus_total = self.baseline_plus_minus(player);
        if games > 0.0 {
            projection.threes_made = round1(self.with_noise(threes_total / games, rng).max(0.0));
            projection.plus_minus = round1(self.with_noise(plus_minus_total / games, rng));
        }

        projection.fg_pct = adjust_shooting(stats.fg_pct, bracket, rng.gen::<f64>());
        projection.fg3_pct = adjust_shooting(stats.fg3_pct, bracket, rng.gen::<f64>());
        projection.ft_pct = adjust_shooting(stats.ft_pct, bracket, rng.gen::<f64>());

        debug!(
            "{}: {:?}{} {:.1} min, {:.1} pts, {} gp",
            projection.name,
            bracket,
            if breakout { " breakout" } else { "" },
            projection.minutes,
            projection.points,
            projection.games_played
        );
        projection
    }
}
