// Free-agent signings and trades under salary-cap rules.
//
// Rule violations are not errors: they come back as rejection messages with
// the roster untouched, so the caller can show why a move was refused.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{normalize_name, Player, PlayerCatalog, Salary};
use crate::roster::TeamRoster;

/// Luxury-tax threshold (2025-26), in dollars.
pub const SALARY_CAP: Salary = Salary(187_895_000);
/// Second apron (2025-26), in dollars.
pub const SECOND_APRON: Salary = Salary(207_824_000);
/// Trades whose outgoing and incoming scoring differ by more than this many
/// points per game get a realism advisory.
pub const REALISM_PPG_GAP: f64 = 10.0;

// ---------------------------------------------------------------------------
// Cap rules
// ---------------------------------------------------------------------------

/// The two payroll thresholds that govern signings and trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapRules {
    pub salary_cap: Salary,
    pub second_apron: Salary,
}

impl Default for CapRules {
    fn default() -> Self {
        CapRules {
            salary_cap: SALARY_CAP,
            second_apron: SECOND_APRON,
        }
    }
}

impl CapRules {
    pub fn is_under_cap(&self, payroll: Salary) -> bool {
        payroll < self.salary_cap
    }

    /// Why an outside free-agent signing is refused, if it is.
    pub fn signing_violation(&self, payroll: Salary, offer: Salary) -> Option<CapViolation> {
        if !self.is_under_cap(payroll) {
            Some(CapViolation::OverCap)
        } else {
            match payroll.checked_add(offer) {
                Some(total) if total <= self.second_apron => None,
                _ => Some(CapViolation::OverSecondApron),
            }
        }
    }

    /// Whether a team at `payroll` sending out `outgoing` may take back
    /// `incoming`: up to 200% under the cap, 125% at or over it.
    ///
    /// Integer comparison keeps the boundary exact; amounts too large to
    /// compare are refused.
    pub fn can_absorb(&self, payroll: Salary, outgoing: Salary, incoming: Salary) -> bool {
        let allowed = if self.is_under_cap(payroll) {
            outgoing.0.checked_mul(2).map(|limit| incoming.0 <= limit)
        } else {
            incoming
                .0
                .checked_mul(4)
                .zip(outgoing.0.checked_mul(5))
                .map(|(scaled_in, scaled_out)| scaled_in <= scaled_out)
        };
        allowed.unwrap_or(false)
    }

    /// The largest incoming salary `can_absorb` allows, rounded down.
    pub fn max_incoming(&self, payroll: Salary, outgoing: Salary) -> Salary {
        if self.is_under_cap(payroll) {
            Salary(outgoing.0.saturating_mul(2))
        } else {
            Salary(outgoing.0.saturating_mul(5) / 4)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapViolation {
    /// Payroll already at or above the salary cap.
    OverCap,
    /// The offer would push payroll past the second apron.
    OverSecondApron,
}

// ---------------------------------------------------------------------------
// Requests, messages, reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningRequest {
    pub team: String,
    pub player: String,
    pub salary: Salary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub team: String,
    pub partner: String,
    pub players_out: Vec<String>,
    pub players_in: Vec<String>,
}

impl TradeRequest {
    /// The same trade seen from the partner's side.
    pub fn mirrored(&self) -> TradeRequest {
        TradeRequest {
            team: self.partner.clone(),
            partner: self.team.clone(),
            players_out: self.players_in.clone(),
            players_in: self.players_out.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionRequest {
    Sign(SigningRequest),
    Trade(TradeRequest),
}

impl fmt::Display for TransactionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionRequest::Sign(s) => write!(f, "{} sign {} at {}", s.team, s.player, s.salary),
            TransactionRequest::Trade(t) => write!(
                f,
                "{} trade [{}] to {} for [{}]",
                t.team,
                t.players_out.join(", "),
                t.partner,
                t.players_in.join(", ")
            ),
        }
    }
}

/// A diagnostic or advisory produced by a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionMessage {
    Signed {
        player: String,
        salary: Salary,
        bird_rights: bool,
    },
    /// Re-signed for less than half of last season's salary. Informational.
    PayCut {
        player: String,
        previous: Salary,
        offer: Salary,
    },
    SigningRejected {
        player: String,
        payroll: Salary,
        offer: Salary,
        violation: CapViolation,
    },
    TradeRejected {
        team: String,
        incoming: Salary,
        max_incoming: Salary,
    },
    /// Names in a trade that matched nobody on the expected team.
    UnmatchedPlayers { team: String, names: Vec<String> },
    UnrealisticTrade { outgoing_ppg: f64, incoming_ppg: f64 },
    TradeCompleted { team: String, partner: String },
}

impl fmt::Display for TransactionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionMessage::Signed {
                player,
                salary,
                bird_rights: true,
            } => write!(f, "Signed {player} (re-sign) at {salary}"),
            TransactionMessage::Signed { player, salary, .. } => {
                write!(f, "Signed {player} as FA at {salary}")
            }
            TransactionMessage::PayCut {
                player,
                previous,
                offer,
            } => write!(
                f,
                "Wow! That's a lot of paycut for {player} ({previous} down to {offer})"
            ),
            TransactionMessage::SigningRejected {
                player,
                payroll,
                offer,
                violation: CapViolation::OverCap,
            } => write!(
                f,
                "Cannot sign {player} at {offer}: payroll {payroll} is already over the salary cap."
            ),
            TransactionMessage::SigningRejected {
                player,
                payroll,
                offer,
                violation: CapViolation::OverSecondApron,
            } => write!(
                f,
                "Cannot sign {player} at {offer}: payroll {payroll} would go over the second apron."
            ),
            TransactionMessage::TradeRejected {
                team,
                incoming,
                max_incoming,
            } => write!(
                f,
                "Invalid trade for {team}: incoming salary {incoming} exceeds the {max_incoming} allowed."
            ),
            TransactionMessage::UnmatchedPlayers { team, names } => {
                write!(f, "No {team} player found for: {}", names.join(", "))
            }
            TransactionMessage::UnrealisticTrade {
                outgoing_ppg,
                incoming_ppg,
            } => write!(
                f,
                "Looks like this trade might be unrealistic in real life \
                 ({outgoing_ppg:.1} ppg out, {incoming_ppg:.1} ppg in)"
            ),
            TransactionMessage::TradeCompleted { team, partner } => {
                write!(f, "Trade completed: {team} with {partner}.")
            }
        }
    }
}

/// What a transaction did and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionReport {
    /// Whether the roster was mutated.
    pub applied: bool,
    pub messages: Vec<TransactionMessage>,
}

impl TransactionReport {
    pub fn lines(&self) -> Vec<String> {
        self.messages.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransactionError {
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("offer must not be negative, got {0}")]
    NegativeOffer(Salary),

    #[error("offer {0} is above the {max} contract limit", max = Salary::MAX_CONTRACT)]
    OfferTooLarge(Salary),
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Sign `player_name` to `roster` at `offer`.
///
/// A player whose catalog team is the roster's team is re-signed
/// unconditionally (Bird rights). Anyone else needs the roster under the cap
/// and the resulting payroll within the second apron.
pub fn sign(
    roster: &mut TeamRoster,
    player_name: &str,
    offer: Salary,
    catalog: &PlayerCatalog,
    rules: &CapRules,
) -> Result<TransactionReport, TransactionError> {
    let name = normalize_name(player_name);
    if offer < Salary::ZERO {
        return Err(TransactionError::NegativeOffer(offer));
    }
    if offer > Salary::MAX_CONTRACT {
        return Err(TransactionError::OfferTooLarge(offer));
    }
    let player = catalog
        .find(&name)
        .ok_or_else(|| TransactionError::PlayerNotFound(name.clone()))?;

    let mut messages = Vec::new();

    if player.team == roster.team {
        roster.remove(&name);
        roster.add(player.clone(), Some(offer));
        info!("{}: re-signed {} at {}", roster.team, name, offer);
        messages.push(TransactionMessage::Signed {
            player: name.clone(),
            salary: offer,
            bird_rights: true,
        });
        if offer.0 * 2 < player.salary.0 {
            messages.push(TransactionMessage::PayCut {
                player: name,
                previous: player.salary,
                offer,
            });
        }
        return Ok(TransactionReport {
            applied: true,
            messages,
        });
    }

    let payroll = roster.salary();
    match rules.signing_violation(payroll, offer) {
        None => {
            roster.remove(&name);
            roster.add(player.clone(), Some(offer));
            info!("{}: signed free agent {} at {}", roster.team, name, offer);
            messages.push(TransactionMessage::Signed {
                player: name,
                salary: offer,
                bird_rights: false,
            });
            Ok(TransactionReport {
                applied: true,
                messages,
            })
        }
        Some(violation) => {
            warn!(
                "{}: signing {} at {} rejected ({:?}, payroll {})",
                roster.team, name, offer, violation, payroll
            );
            messages.push(TransactionMessage::SigningRejected {
                player: name,
                payroll,
                offer,
                violation,
            });
            Ok(TransactionReport {
                applied: false,
                messages,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// One side's verdict on a trade, computed without touching the roster.
#[derive(Debug, Clone)]
pub struct TradeEvaluation {
    pub team: String,
    pub partner: String,
    /// Normalized names leaving the roster.
    pub players_out: Vec<String>,
    /// Roster members that matched `players_out`.
    pub outgoing: Vec<Player>,
    /// Partner players that matched `players_in`.
    pub incoming: Vec<Player>,
    pub outgoing_salary: Salary,
    pub incoming_salary: Salary,
    pub accepted: bool,
    pub messages: Vec<TransactionMessage>,
}

fn normalized_set(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| normalize_name(n))
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect()
}

fn unmatched(wanted: &[String], found: &[Player]) -> Vec<String> {
    wanted
        .iter()
        .filter(|name| !found.iter().any(|p| &p.name == *name))
        .cloned()
        .collect()
}

fn total_ppg(players: &[Player]) -> f64 {
    players.iter().map(|p| p.stats.points_per_game()).sum()
}

fn matching(players: &[Player], names: &[String]) -> Vec<Player> {
    players
        .iter()
        .filter(|p| names.contains(&p.name))
        .cloned()
        .collect()
}

/// Both sides of a proposed trade, with the players already resolved.
struct TradeSides<'a> {
    roster: &'a TeamRoster,
    out_names: Vec<String>,
    outgoing: Vec<Player>,
    partner_team: &'a str,
    partner_payroll: Salary,
    in_names: Vec<String>,
    incoming: Vec<Player>,
}

/// Run the cap and realism checks. With `strict`, a name that matched
/// nobody rejects the trade before any salary is compared.
fn judge(sides: TradeSides<'_>, rules: &CapRules, strict: bool) -> TradeEvaluation {
    let TradeSides {
        roster,
        out_names,
        outgoing,
        partner_team,
        partner_payroll,
        in_names,
        incoming,
    } = sides;

    let mut messages = Vec::new();
    let missing_out = unmatched(&out_names, &outgoing);
    if !missing_out.is_empty() {
        messages.push(TransactionMessage::UnmatchedPlayers {
            team: roster.team.clone(),
            names: missing_out,
        });
    }
    let missing_in = unmatched(&in_names, &incoming);
    if !missing_in.is_empty() {
        messages.push(TransactionMessage::UnmatchedPlayers {
            team: partner_team.to_string(),
            names: missing_in,
        });
    }
    let any_unmatched = !messages.is_empty();

    let outgoing_salary: Salary = outgoing.iter().map(|p| p.salary).sum();
    let incoming_salary: Salary = incoming.iter().map(|p| p.salary).sum();

    let mut evaluation = TradeEvaluation {
        team: roster.team.clone(),
        partner: partner_team.to_string(),
        players_out: out_names,
        outgoing,
        incoming,
        outgoing_salary,
        incoming_salary,
        accepted: false,
        messages,
    };
    if strict && any_unmatched {
        return evaluation;
    }

    let payroll = roster.salary();
    if !rules.can_absorb(payroll, outgoing_salary, incoming_salary) {
        evaluation.messages.push(TransactionMessage::TradeRejected {
            team: roster.team.clone(),
            incoming: incoming_salary,
            max_incoming: rules.max_incoming(payroll, outgoing_salary),
        });
        return evaluation;
    }

    if !rules.can_absorb(partner_payroll, incoming_salary, outgoing_salary) {
        evaluation.messages.push(TransactionMessage::TradeRejected {
            team: partner_team.to_string(),
            incoming: outgoing_salary,
            max_incoming: rules.max_incoming(partner_payroll, incoming_salary),
        });
        return evaluation;
    }

    let outgoing_ppg = total_ppg(&evaluation.outgoing);
    let incoming_ppg = total_ppg(&evaluation.incoming);
    if (outgoing_ppg - incoming_ppg).abs() > REALISM_PPG_GAP {
        evaluation.messages.push(TransactionMessage::UnrealisticTrade {
            outgoing_ppg,
            incoming_ppg,
        });
    }

    evaluation.accepted = true;
    evaluation
}

/// Check one side of a trade.
///
/// `outgoing` comes from the roster, `incoming` from the partner's catalog
/// rows. The roster must be able to absorb the incoming salary, and the
/// partner (judged on its full catalog payroll) must be able to absorb the
/// outgoing salary. Unmatched names are reported but do not block.
pub fn evaluate_trade(
    roster: &TeamRoster,
    players_out: &[String],
    partner_team: &str,
    players_in: &[String],
    catalog: &PlayerCatalog,
    rules: &CapRules,
) -> TradeEvaluation {
    let out_names = normalized_set(players_out);
    let in_names = normalized_set(players_in);
    let outgoing = matching(roster.players(), &out_names);
    let partner_rows: Vec<Player> = catalog.team_players(partner_team).cloned().collect();
    let incoming = matching(&partner_rows, &in_names);
    judge(
        TradeSides {
            roster,
            out_names,
            outgoing,
            partner_team,
            partner_payroll: catalog.team_salary(partner_team),
            in_names,
            incoming,
        },
        rules,
        false,
    )
}

/// Check a trade between two live rosters.
///
/// Incoming players come from `partner` at their current salaries, and both
/// payrolls are the rosters' own. Every named player must be on the roster
/// named for them, otherwise the trade is rejected.
pub fn evaluate_exchange(
    roster: &TeamRoster,
    players_out: &[String],
    partner: &TeamRoster,
    players_in: &[String],
    rules: &CapRules,
) -> TradeEvaluation {
    let out_names = normalized_set(players_out);
    let in_names = normalized_set(players_in);
    let outgoing = matching(roster.players(), &out_names);
    let incoming = matching(partner.players(), &in_names);
    judge(
        TradeSides {
            roster,
            out_names,
            outgoing,
            partner_team: &partner.team,
            partner_payroll: partner.salary(),
            in_names,
            incoming,
        },
        rules,
        true,
    )
}

/// Apply an accepted evaluation to the evaluating roster: drop the outgoing
/// names, then add the incoming players at the salaries they carried.
pub fn apply_trade(roster: &mut TeamRoster, evaluation: TradeEvaluation) -> TransactionReport {
    let mut messages = evaluation.messages;
    if !evaluation.accepted {
        return TransactionReport {
            applied: false,
            messages,
        };
    }
    for name in &evaluation.players_out {
        roster.remove(name);
    }
    for player in evaluation.incoming {
        roster.add(player, None);
    }
    info!(
        "{}: trade with {} applied ({} out, {} in)",
        evaluation.team, evaluation.partner, evaluation.outgoing_salary, evaluation.incoming_salary
    );
    messages.push(TransactionMessage::TradeCompleted {
        team: evaluation.team,
        partner: evaluation.partner,
    });
    TransactionReport {
        applied: true,
        messages,
    }
}

/// Evaluate and, if accepted, apply one side of a trade.
///
/// Only `roster` is touched; the partner side is a separate call with the
/// lists reversed, and each side stands on its own verdict.
pub fn trade(
    roster: &mut TeamRoster,
    players_out: &[String],
    partner_team: &str,
    players_in: &[String],
    catalog: &PlayerCatalog,
    rules: &CapRules,
) -> TransactionReport {
    let evaluation = evaluate_trade(roster, players_out, partner_team, players_in, catalog, rules);
    if !evaluation.accepted {
        warn!("{}: trade with {} rejected", roster.team, partner_team);
    }
    apply_trade(roster, evaluation)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FreeAgentPool, StatLine};

    const M: i64 = 1_000_000;

    fn player(name: &str, team: &str, salary: i64, points: f64, games: u32) -> Player {
        Player {
            id: 0,
            name: normalize_name(name),
            team: team.into(),
            age: 27,
            stats: StatLine {
                games_played: games,
                minutes: games as f64 * 30.0,
                points,
                rebounds: 0.0,
                offensive_rebounds: 0.0,
                assists: 0.0,
                steals: 0.0,
                blocks: 0.0,
                turnovers: 0.0,
                threes_made: 0.0,
                plus_minus: 0.0,
                fg_pct: 0.45,
                fg3_pct: 0.35,
                ft_pct: 0.8,
            },
            salary: Salary(salary),
        }
    }

    /// A HOU roster whose payroll is exactly `payroll`, plus outside players.
    fn fixture(payroll: i64) -> (TeamRoster, PlayerCatalog) {
        let catalog = PlayerCatalog::new(vec![
            player("Filler", "HOU", payroll - 20 * M, 800.0, 80),
            player("Jalen Green", "HOU", 12 * M, 1600.0, 80),
            player("Dillon Brooks", "HOU", 8 * M, 1000.0, 80),
            player("Kevin Durant", "PHX", 24 * M, 2100.0, 80),
            player("Devin Booker", "PHX", 40 * M, 2000.0, 80),
            player("Outside FA", "DAL", 15 * M, 700.0, 70),
        ]);
        let roster = TeamRoster::build_initial("HOU", &catalog, &FreeAgentPool::default());
        (roster, catalog)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // -- Signing --

    #[test]
    fn bird_rights_resign_ignores_cap() {
        for payroll in [150 * M, 187_895_000, 250 * M] {
            for offer in [0, 5 * M, 60 * M] {
                let (mut roster, catalog) = fixture(payroll);
                roster.remove("jalen green");
                let report =
                    sign(&mut roster, "Jalen Green", Salary(offer), &catalog, &CapRules::default())
                        .unwrap();
                assert!(report.applied, "payroll {payroll}, offer {offer}");
                assert_eq!(roster.get("jalen green").unwrap().salary, Salary(offer));
            }
        }
    }

    #[test]
    fn bird_rights_resign_replaces_existing_entry() {
        let (mut roster, catalog) = fixture(150 * M);
        let before = roster.len();
        sign(&mut roster, "jalen green", Salary(30 * M), &catalog, &CapRules::default()).unwrap();
        assert_eq!(roster.len(), before);
        assert_eq!(roster.salary(), Salary(168 * M));
    }

    #[test]
    fn pay_cut_advisory_below_half() {
        let (mut roster, catalog) = fixture(150 * M);
        // Catalog salary 12M: 5.9M is under half, 6M is exactly half.
        let report = sign(&mut roster, "Jalen Green", Salary(5_900_000), &catalog, &CapRules::default()).unwrap();
        assert!(report
            .messages
            .iter()
            .any(|m| matches!(m, TransactionMessage::PayCut { .. })));

        let report = sign(&mut roster, "Jalen Green", Salary(6 * M), &catalog, &CapRules::default()).unwrap();
        assert_eq!(report.messages.len(), 1);
        assert!(report.applied);
    }

    #[test]
    fn outside_signing_under_cap_accepted() {
        let (mut roster, catalog) = fixture(150 * M);
        let report = sign(&mut roster, "Outside FA", Salary(20 * M), &catalog, &CapRules::default()).unwrap();
        assert!(report.applied);
        assert_eq!(roster.salary(), Salary(170 * M));
        assert_eq!(
            report.messages,
            vec![TransactionMessage::Signed {
                player: "outside fa".into(),
                salary: Salary(20 * M),
                bird_rights: false,
            }]
        );
    }

    #[test]
    fn outside_signing_at_185m_for_5m_accepted() {
        // 185M < 187.895M and 190M <= 207.824M.
        let (mut roster, catalog) = fixture(185 * M);
        let report = sign(&mut roster, "Outside FA", Salary(5 * M), &catalog, &CapRules::default()).unwrap();
        assert!(report.applied);
        assert_eq!(roster.salary(), Salary(190 * M));
    }

    #[test]
    fn outside_signing_at_cap_rejected() {
        let (mut roster, catalog) = fixture(187_895_000);
        let report = sign(&mut roster, "Outside FA", Salary(1), &catalog, &CapRules::default()).unwrap();
        assert!(!report.applied);
        assert!(!roster.contains("outside fa"));
        assert!(matches!(
            report.messages[0],
            TransactionMessage::SigningRejected {
                violation: CapViolation::OverCap,
                ..
            }
        ));
    }

    #[test]
    fn outside_signing_second_apron_boundary() {
        // Payroll one dollar under the cap.
        let payroll = 187_894_999;
        let exact = 207_824_000 - payroll;

        let (mut roster, catalog) = fixture(payroll);
        let report = sign(&mut roster, "Outside FA", Salary(exact), &catalog, &CapRules::default()).unwrap();
        assert!(report.applied, "landing exactly on the apron is allowed");

        let (mut roster, catalog) = fixture(payroll);
        let report = sign(&mut roster, "Outside FA", Salary(exact + 1), &catalog, &CapRules::default()).unwrap();
        assert!(!report.applied);
        assert!(matches!(
            report.messages[0],
            TransactionMessage::SigningRejected {
                violation: CapViolation::OverSecondApron,
                ..
            }
        ));
    }

    #[test]
    fn unknown_player_is_lookup_failure() {
        let (mut roster, catalog) = fixture(150 * M);
        let err = sign(&mut roster, "Nobody Here", Salary(M), &catalog, &CapRules::default()).unwrap_err();
        assert_eq!(err, TransactionError::PlayerNotFound("nobody here".into()));
    }

    #[test]
    fn negative_offer_refused() {
        let (mut roster, catalog) = fixture(150 * M);
        let err = sign(&mut roster, "Outside FA", Salary(-1), &catalog, &CapRules::default()).unwrap_err();
        assert!(matches!(err, TransactionError::NegativeOffer(_)));
    }

    #[test]
    fn offer_above_contract_limit_refused() {
        let (mut roster, catalog) = fixture(150 * M);
        let err = sign(
            &mut roster,
            "Outside FA",
            Salary::from_millions(1e13),
            &catalog,
            &CapRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TransactionError::OfferTooLarge(_)));
        assert!(!roster.contains("outside fa"));

        let report = sign(&mut roster, "Jalen Green", Salary::MAX_CONTRACT, &catalog, &CapRules::default()).unwrap();
        assert!(report.applied);
    }

    #[test]
    fn overflowing_amounts_are_violations() {
        let rules = CapRules::default();
        assert_eq!(
            rules.signing_violation(Salary(100 * M), Salary(i64::MAX)),
            Some(CapViolation::OverSecondApron)
        );
        assert!(!rules.can_absorb(Salary(170 * M), Salary(i64::MAX), Salary(M)));
        assert!(!rules.can_absorb(Salary(190 * M), Salary(M), Salary(i64::MAX)));
        assert_eq!(rules.max_incoming(Salary(170 * M), Salary(i64::MAX)), Salary(i64::MAX));
    }

    // -- Cap multiplier rule --

    #[test]
    fn absorb_boundaries() {
        let rules = CapRules::default();
        let under = Salary(170 * M);
        let over = Salary(190 * M);
        assert!(rules.can_absorb(under, Salary(30 * M), Salary(60 * M)));
        assert!(!rules.can_absorb(under, Salary(30 * M), Salary(60 * M + 1)));
        assert!(rules.can_absorb(over, Salary(40 * M), Salary(50 * M)));
        assert!(!rules.can_absorb(over, Salary(40 * M), Salary(50 * M + 1)));
        assert_eq!(rules.max_incoming(over, Salary(40 * M)), Salary(50 * M));
        assert_eq!(rules.max_incoming(under, Salary(30 * M)), Salary(60 * M));
    }

    // -- Trades --

    #[test]
    fn two_for_one_under_cap_accepted() {
        // Out: 12M + 8M = 20M, in: 24M. Acquiring side 170M (under cap).
        let (mut roster, catalog) = fixture(170 * M);
        let report = trade(
            &mut roster,
            &names(&["Jalen Green", "Dillon Brooks"]),
            "PHX",
            &names(&["Kevin Durant"]),
            &catalog,
            &CapRules::default(),
        );
        assert!(report.applied);
        assert!(roster.contains("kevin durant"));
        assert!(!roster.contains("jalen green"));
        assert!(!roster.contains("dillon brooks"));
        assert_eq!(roster.salary(), Salary(174 * M));
        assert!(matches!(
            report.messages.last(),
            Some(TransactionMessage::TradeCompleted { .. })
        ));
    }

    #[test]
    fn thirty_million_out_for_fifty_five_in_at_170m() {
        let catalog = PlayerCatalog::new(vec![
            player("Rest Of Roster", "HOU", 140 * M, 800.0, 80),
            player("Starter One", "HOU", 18 * M, 1300.0, 80),
            player("Starter Two", "HOU", 12 * M, 900.0, 80),
            player("Max Star", "PHX", 55 * M, 2200.0, 80),
        ]);
        let mut roster = TeamRoster::build_initial("HOU", &catalog, &FreeAgentPool::default());
        assert_eq!(roster.salary(), Salary(170 * M));

        let report = trade(
            &mut roster,
            &names(&["Starter One", "Starter Two"]),
            "PHX",
            &names(&["Max Star"]),
            &catalog,
            &CapRules::default(),
        );
        assert!(report.applied, "{:?}", report.lines());
        assert_eq!(roster.salary(), Salary(195 * M));
        assert!(roster.contains("max star"));
    }

    #[test]
    fn over_cap_uses_125_percent() {
        // 190M payroll: 20M out allows 25M in; Booker's 40M is too much.
        let (mut roster, catalog) = fixture(190 * M);
        let report = trade(
            &mut roster,
            &names(&["Jalen Green", "Dillon Brooks"]),
            "PHX",
            &names(&["Devin Booker"]),
            &catalog,
            &CapRules::default(),
        );
        assert!(!report.applied);
        assert!(roster.contains("jalen green"));
        assert_eq!(
            report.messages,
            vec![TransactionMessage::TradeRejected {
                team: "HOU".into(),
                incoming: Salary(40 * M),
                max_incoming: Salary(25 * M),
            }]
        );
    }

    #[test]
    fn partner_side_check_rejects() {
        // Partner PHX catalog payroll is 64M (under cap, 2x): taking 20M back
        // for nothing outgoing fails on their side.
        let (mut roster, catalog) = fixture(150 * M);
        let report = trade(
            &mut roster,
            &names(&["Jalen Green", "Dillon Brooks"]),
            "PHX",
            &names(&[]),
            &catalog,
            &CapRules::default(),
        );
        assert!(!report.applied);
        assert!(matches!(
            report.messages.last(),
            Some(TransactionMessage::TradeRejected { team, .. }) if team == "PHX"
        ));
    }

    #[test]
    fn unknown_names_surface_as_advisory() {
        let (mut roster, catalog) = fixture(150 * M);
        let report = trade(
            &mut roster,
            &names(&["Jalen Green"]),
            "PHX",
            &names(&["Ghost Player"]),
            &catalog,
            &CapRules::default(),
        );
        assert!(report.messages.contains(&TransactionMessage::UnmatchedPlayers {
            team: "PHX".into(),
            names: vec!["ghost player".into()],
        }));
    }

    fn ppg_fixture(out_points: f64, in_points: f64) -> (TeamRoster, PlayerCatalog) {
        let catalog = PlayerCatalog::new(vec![
            player("Mine", "HOU", 10 * M, out_points, 10),
            player("Theirs", "PHX", 10 * M, in_points, 10),
        ]);
        let roster = TeamRoster::build_initial("HOU", &catalog, &FreeAgentPool::default());
        (roster, catalog)
    }

    fn realism_flagged(out_points: f64, in_points: f64) -> bool {
        let (mut roster, catalog) = ppg_fixture(out_points, in_points);
        let report = trade(
            &mut roster,
            &names(&["Mine"]),
            "PHX",
            &names(&["Theirs"]),
            &catalog,
            &CapRules::default(),
        );
        assert!(report.applied);
        report
            .messages
            .iter()
            .any(|m| matches!(m, TransactionMessage::UnrealisticTrade { .. }))
    }

    #[test]
    fn realism_advisory_threshold() {
        // 10 games: 150 points = 15 ppg.
        assert!(!realism_flagged(150.0, 150.0 + 99.0)); // 9.9 gap
        assert!(realism_flagged(150.0, 150.0 + 101.0)); // 10.1 gap
        assert!(realism_flagged(150.0 + 101.0, 150.0));
    }

    #[test]
    fn mirrored_request_swaps_sides() {
        let req = TradeRequest {
            team: "HOU".into(),
            partner: "PHX".into(),
            players_out: names(&["a"]),
            players_in: names(&["b", "c"]),
        };
        let m = req.mirrored();
        assert_eq!(m.team, "PHX");
        assert_eq!(m.players_out, names(&["b", "c"]));
        assert_eq!(m.mirrored(), req);
    }

    #[test]
    fn message_text() {
        let msg = TransactionMessage::Signed {
            player: "fred vanvleet".into(),
            salary: Salary(20 * M),
            bird_rights: false,
        };
        assert_eq!(msg.to_string(), "Signed fred vanvleet as FA at $20.0M");
    }
}
