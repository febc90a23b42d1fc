// Offseason plan files: a team plus an ordered list of moves.
//
// Salaries in plan files are written in millions; they are converted to
// dollars before reaching the transaction engine.

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::{info, warn};

use offseason_core::catalog::Salary;
use offseason_core::config::LeagueConfig;
use offseason_core::session::{Session, SessionError};
use offseason_core::transactions::{
    SigningRequest, TradeRequest, TransactionReport, TransactionRequest,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    /// Abbreviation or full franchise name.
    pub team: String,
    #[serde(default)]
    pub moves: Vec<Move>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Move {
    Sign {
        player: String,
        /// Millions.
        salary: f64,
    },
    Trade {
        partner: String,
        players_out: Vec<String>,
        players_in: Vec<String>,
    },
}

impl Plan {
    pub fn parse(text: &str) -> anyhow::Result<Plan> {
        toml::from_str(text).context("invalid plan file")
    }

    pub fn load(path: &Path) -> anyhow::Result<Plan> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    /// The plan's team resolved to its abbreviation.
    pub fn team(&self, league: &LeagueConfig) -> anyhow::Result<String> {
        match league.resolve_team(&self.team) {
            Some(abbr) => Ok(abbr),
            None => bail!("unknown team in plan: {}", self.team),
        }
    }

    /// Resolve team names and convert salaries, in plan order.
    pub fn requests(&self, league: &LeagueConfig) -> anyhow::Result<Vec<TransactionRequest>> {
        let team = self.team(league)?;
        self.moves
            .iter()
            .enumerate()
            .map(|(i, mv)| match mv {
                Move::Sign { player, salary } => {
                    if !salary.is_finite() || *salary < 0.0 {
                        bail!("move {}: salary must be a non-negative number of millions", i + 1);
                    }
                    Ok(TransactionRequest::Sign(SigningRequest {
                        team: team.clone(),
                        player: player.clone(),
                        salary: Salary::from_millions(*salary),
                    }))
                }
                Move::Trade {
                    partner,
                    players_out,
                    players_in,
                } => {
                    let Some(partner) = league.resolve_team(partner) else {
                        bail!("move {}: unknown trade partner {}", i + 1, partner);
                    };
                    Ok(TransactionRequest::Trade(TradeRequest {
                        team: team.clone(),
                        partner,
                        players_out: players_out.clone(),
                        players_in: players_in.clone(),
                    }))
                }
            })
            .collect()
    }
}

/// Outcome of one plan move.
#[derive(Debug)]
pub struct MoveOutcome {
    pub request: TransactionRequest,
    pub result: Result<TransactionReport, SessionError>,
}

/// Apply every request in order. Lookup failures and rule violations are
/// reported per move and do not stop the plan.
pub fn apply(session: &mut Session, requests: Vec<TransactionRequest>) -> Vec<MoveOutcome> {
    requests
        .into_iter()
        .map(|request| {
            let result = session.apply(&request);
            match &result {
                Ok(report) if report.applied => info!("plan move applied: {}", request),
                Ok(_) => info!("plan move rejected: {}", request),
                Err(e) => warn!("plan move failed: {}", e),
            }
            MoveOutcome { request, result }
        })
        .collect()
}
