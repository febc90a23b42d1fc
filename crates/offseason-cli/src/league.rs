// League-wide simulation: every team on the tokio blocking pool at once.
//
// Each team draws from its own StdRng seeded with `base + index`, where the
// index is the team's position in sorted abbreviation order. A team's
// forecast therefore does not depend on which other teams ran beside it.

use std::sync::Arc;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinSet;
use tracing::info;

use offseason_core::roster::TeamRoster;
use offseason_sim::season::{SeasonForecast, SeasonSimulator};

/// Seed for one team given the league's sorted abbreviations.
pub fn team_seed(base: u64, abbreviations: &[String], team: &str) -> u64 {
    let index = abbreviations
        .iter()
        .position(|abbr| abbr == team)
        .unwrap_or(abbreviations.len());
    base.wrapping_add(index as u64)
}

/// Simulate one team with its league seed.
pub fn simulate_team(
    simulator: &SeasonSimulator,
    roster: &TeamRoster,
    base_seed: u64,
    abbreviations: &[String],
) -> SeasonForecast {
    let mut rng = StdRng::seed_from_u64(team_seed(base_seed, abbreviations, &roster.team));
    simulator.simulate(roster, &mut rng)
}

/// Simulate every roster concurrently. Results come back in abbreviation
/// order.
pub async fn simulate_league(
    simulator: Arc<SeasonSimulator>,
    rosters: Vec<TeamRoster>,
    base_seed: u64,
) -> anyhow::Result<Vec<SeasonForecast>> {
    let mut abbreviations: Vec<String> = rosters.iter().map(|r| r.team.clone()).collect();
    abbreviations.sort();
    let abbreviations = Arc::new(abbreviations);

    let mut tasks = JoinSet::new();
    for roster in rosters {
        let simulator = Arc::clone(&simulator);
        let abbreviations = Arc::clone(&abbreviations);
        tasks.spawn_blocking(move || simulate_team(&simulator, &roster, base_seed, &abbreviations));
    }

    let mut forecasts = Vec::with_capacity(abbreviations.len());
    while let Some(joined) = tasks.join_next().await {
        forecasts.push(joined.context("team simulation task failed")?);
    }
    forecasts.sort_by(|a, b| a.team.cmp(&b.team));
    info!("Simulated {} teams (seed {})", forecasts.len(), base_seed);
    Ok(forecasts)
}

/// Forecasts ordered by wins, best first; ties by abbreviation.
pub fn standings(forecasts: &[SeasonForecast]) -> Vec<&SeasonForecast> {
    let mut table: Vec<&SeasonForecast> = forecasts.iter().collect();
    table.sort_by(|a, b| b.wins.total_cmp(&a.wins).then_with(|| a.team.cmp(&b.team)));
    table
}
