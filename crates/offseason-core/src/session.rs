// An offseason session: every team's roster plus the shared free-agent pool,
// mutated by a sequence of signings and trades.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{normalize_name, FreeAgentPool, PlayerCatalog, Salary};
use crate::config::LeagueConfig;
use crate::roster::TeamRoster;
use crate::transactions::{
    self, apply_trade, evaluate_exchange, CapRules, SigningRequest, TradeRequest, TransactionError,
    TransactionReport, TransactionRequest,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error("a team cannot trade with itself: {0}")]
    SelfTrade(String),

    #[error("{0} is not a free agent")]
    NotAvailable(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// One applied transaction, kept in order for summaries.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub at: DateTime<Utc>,
    pub request: TransactionRequest,
}

/// Caller-owned session state.
///
/// The catalog is shared and never mutated; rosters and the free-agent
/// pool belong to this session alone.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    catalog: Arc<PlayerCatalog>,
    rules: CapRules,
    rosters: BTreeMap<String, TeamRoster>,
    free_agents: FreeAgentPool,
    ledger: Vec<LedgerEntry>,
}

impl Session {
    /// Build opening rosters for every configured team.
    pub fn new(catalog: Arc<PlayerCatalog>, free_agents: &FreeAgentPool, league: &LeagueConfig) -> Self {
        Self::with_teams(catalog, free_agents, &league.abbreviations(), league.cap_rules())
    }

    pub fn with_teams(
        catalog: Arc<PlayerCatalog>,
        free_agents: &FreeAgentPool,
        teams: &[String],
        rules: CapRules,
    ) -> Self {
        let rosters: BTreeMap<String, TeamRoster> = teams
            .iter()
            .map(|team| {
                (
                    team.clone(),
                    TeamRoster::build_initial(team, &catalog, free_agents),
                )
            })
            .collect();
        let created_at = Utc::now();
        let id = format!("session-{}", created_at.format("%Y%m%d%H%M%S%3f"));
        info!(
            "Session {} created with {} teams and {} free agents",
            id,
            rosters.len(),
            free_agents.len()
        );
        Session {
            id,
            created_at,
            catalog,
            rules,
            rosters,
            free_agents: free_agents.clone(),
            ledger: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn catalog(&self) -> &PlayerCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &CapRules {
        &self.rules
    }

    pub fn roster(&self, team: &str) -> Result<&TeamRoster, SessionError> {
        self.rosters
            .get(team)
            .ok_or_else(|| SessionError::UnknownTeam(team.to_string()))
    }

    pub fn rosters(&self) -> impl Iterator<Item = &TeamRoster> {
        self.rosters.values()
    }

    pub fn free_agents(&self) -> &FreeAgentPool {
        &self.free_agents
    }

    pub fn payroll(&self, team: &str) -> Result<Salary, SessionError> {
        self.roster(team).map(TeamRoster::salary)
    }

    /// Applied transactions, oldest first.
    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    fn roster_mut(&mut self, team: &str) -> Result<&mut TeamRoster, SessionError> {
        self.rosters
            .get_mut(team)
            .ok_or_else(|| SessionError::UnknownTeam(team.to_string()))
    }

    fn record(&mut self, request: TransactionRequest) {
        self.ledger.push(LedgerEntry {
            at: Utc::now(),
            request,
        });
    }

    /// Sign a player from the free-agent pool, or re-sign one of the team's
    /// own players (Bird rights) who is in the pool or still on its roster.
    /// On success the player leaves the pool.
    pub fn sign(
        &mut self,
        team: &str,
        player: &str,
        offer: Salary,
    ) -> Result<TransactionReport, SessionError> {
        let name = normalize_name(player);
        let roster = self.roster(team)?;
        let bird_rights = match self.catalog.find(&name) {
            Some(p) => p.team == team,
            None => return Err(TransactionError::PlayerNotFound(name).into()),
        };
        let available = self.free_agents.contains(&name) || (bird_rights && roster.contains(&name));
        if !available {
            warn!("{}: {} is not available to sign", team, name);
            return Err(SessionError::NotAvailable(name));
        }

        let catalog = Arc::clone(&self.catalog);
        let rules = self.rules;
        let report = transactions::sign(self.roster_mut(team)?, &name, offer, &catalog, &rules)?;
        if !report.applied {
            return Ok(report);
        }

        self.free_agents.remove(&name);
        self.record(TransactionRequest::Sign(SigningRequest {
            team: team.to_string(),
            player: name,
            salary: offer,
        }));
        Ok(report)
    }

    /// Trade between two session teams.
    ///
    /// Both sides are judged on their live rosters and payrolls, and every
    /// named player must currently be on the roster that sends him. The
    /// trade is applied to both rosters or to neither; players move at the
    /// salaries they carry.
    pub fn trade(&mut self, request: &TradeRequest) -> Result<TransactionReport, SessionError> {
        if request.team == request.partner {
            return Err(SessionError::SelfTrade(request.team.clone()));
        }
        let evaluation = evaluate_exchange(
            self.roster(&request.team)?,
            &request.players_out,
            self.roster(&request.partner)?,
            &request.players_in,
            &self.rules,
        );

        if !evaluation.accepted {
            warn!("trade {} <-> {} rejected", request.team, request.partner);
            return Ok(TransactionReport {
                applied: false,
                messages: evaluation.messages,
            });
        }

        let sent = evaluation.outgoing.clone();
        let received: Vec<String> = evaluation.incoming.iter().map(|p| p.name.clone()).collect();
        let partner = self.roster_mut(&request.partner)?;
        for name in &received {
            partner.remove(name);
        }
        for player in sent {
            partner.add(player, None);
        }
        let report = apply_trade(self.roster_mut(&request.team)?, evaluation);
        self.record(TransactionRequest::Trade(request.clone()));
        Ok(report)
    }

    pub fn apply(&mut self, request: &TransactionRequest) -> Result<TransactionReport, SessionError> {
        match request {
            TransactionRequest::Sign(s) => self.sign(&s.team, &s.player, s.salary),
            TransactionRequest::Trade(t) => self.trade(t),
        }
    }
}
