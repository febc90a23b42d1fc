// Player catalog loading and validation.
//
// Reads season stat CSVs (one row per player per season, counting stats as
// season totals) and the free-agent list. Rows that break the data
// invariants are skipped at this boundary and never reach the roster or
// forecasting code.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Read;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::path::Path;
use tracing::warn;

/// Maximum games in a regular season; catalog rows above this are rejected.
pub const MAX_GAMES: u32 = 82;

const MIN_AGE: u32 = 17;
const MAX_AGE: u32 = 50;

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A salary amount in whole dollars.
///
/// Cap thresholds are dollars too, so all cap arithmetic stays in one unit.
/// Offers typed by a user in millions go through [`Salary::from_millions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Salary(pub i64);

impl Salary {
    pub const ZERO: Salary = Salary(0);
    /// Largest single contract the engine accepts, from the catalog or an
    /// offer. Rosters of such contracts still sum well inside `i64`.
    pub const MAX_CONTRACT: Salary = Salary(1_000_000_000);

    pub fn from_dollars(dollars: i64) -> Self {
        Salary(dollars)
    }

    /// Convert an amount expressed in millions (e.g. `20.5`) to dollars.
    pub fn from_millions(millions: f64) -> Self {
        Salary((millions * 1_000_000.0).round() as i64)
    }

    pub fn checked_add(self, rhs: Salary) -> Option<Salary> {
        self.0.checked_add(rhs.0).map(Salary)
    }

    pub fn dollars(self) -> i64 {
        self.0
    }

    /// Millions, rounded to one decimal for display.
    pub fn millions(self) -> f64 {
        (self.0 as f64 / 100_000.0).round() / 10.0
    }
}

impl fmt::Display for Salary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.1}M", self.millions())
    }
}

impl Add for Salary {
    type Output = Salary;
    fn add(self, rhs: Salary) -> Salary {
        Salary(self.0 + rhs.0)
    }
}

impl AddAssign for Salary {
    fn add_assign(&mut self, rhs: Salary) {
        self.0 += rhs.0;
    }
}

impl Sub for Salary {
    type Output = Salary;
    fn sub(self, rhs: Salary) -> Salary {
        Salary(self.0 - rhs.0)
    }
}

impl Sum for Salary {
    fn sum<I: Iterator<Item = Salary>>(iter: I) -> Salary {
        iter.fold(Salary::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Salary> for Salary {
    fn sum<I: Iterator<Item = &'a Salary>>(iter: I) -> Salary {
        iter.copied().sum()
    }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Lowercase, trim, and collapse internal whitespace so "  LeBron   James"
/// and "lebron james" refer to the same player.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One season of counting stats and shooting percentages.
///
/// Counting stats and minutes are season totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub games_played: u32,
    pub minutes: f64,
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

impl StatLine {
    /// Points per game; zero for a player with no games.
    pub fn points_per_game(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.points / self.games_played as f64
        }
    }

    /// Minutes per game rounded to one decimal; zero with no games.
    pub fn minutes_per_game(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            (self.minutes / self.games_played as f64 * 10.0).round() / 10.0
        }
    }

    /// `stat / minutes`, or zero when the player logged no minutes.
    pub fn per_minute(&self, stat: f64) -> f64 {
        if self.minutes > 0.0 {
            stat / self.minutes
        } else {
            0.0
        }
    }
}

/// A catalog player record. Immutable apart from `salary`, which a signing
/// may overwrite with the negotiated amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    /// Normalized (lowercase) name.
    pub name: String,
    pub team: String,
    pub age: u32,
    pub stats: StatLine,
    pub salary: Salary,
}

/// Every player row for one season.
#[derive(Debug, Clone, Default)]
pub struct PlayerCatalog {
    players: Vec<Player>,
}

impl PlayerCatalog {
    pub fn new(players: Vec<Player>) -> Self {
        PlayerCatalog { players }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// First row matching the (normalized) name.
    pub fn find(&self, name: &str) -> Option<&Player> {
        let key = normalize_name(name);
        self.players.iter().find(|p| p.name == key)
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Look a player up by `PLAYER_ID` when the query is all digits,
    /// falling back to the name.
    pub fn find_by_name_or_id(&self, query: &str) -> Option<&Player> {
        let query = query.trim();
        match query.parse::<u64>() {
            Ok(id) => self.find_by_id(id).or_else(|| self.find(query)),
            Err(_) => self.find(query),
        }
    }

    /// All rows whose team abbreviation matches.
    pub fn team_players<'a>(&'a self, team: &'a str) -> impl Iterator<Item = &'a Player> + 'a {
        self.players.iter().filter(move |p| p.team == team)
    }

    /// Total catalog salary of a team, ignoring any session moves.
    pub fn team_salary(&self, team: &str) -> Salary {
        self.team_players(team).map(|p| p.salary).sum()
    }

    /// Distinct team abbreviations in sorted order.
    pub fn teams(&self) -> Vec<String> {
        self.players
            .iter()
            .map(|p| p.team.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Names of players available to sign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeAgentPool {
    names: BTreeSet<String>,
}

impl FreeAgentPool {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        FreeAgentPool {
            names: names.into_iter().map(|n| normalize_name(n.as_ref())).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }

    /// Remove a player who has signed. Returns whether they were in the pool.
    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(&normalize_name(name))
    }

    /// Sorted names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Season stat CSV row. SALARY is absent from the historical files, and any
/// extra columns are absorbed by the flattened map.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
pub(crate) struct RawPlayerRow {
    pub(crate) PLAYER_ID: u64,
    pub(crate) PLAYER_NAME: String,
    pub(crate) TEAM_ABBREVIATION: String,
    pub(crate) AGE: f64,
    pub(crate) GP: f64,
    pub(crate) MIN: f64,
    pub(crate) PTS: f64,
    pub(crate) REB: f64,
    pub(crate) OREB: f64,
    pub(crate) AST: f64,
    pub(crate) STL: f64,
    pub(crate) BLK: f64,
    pub(crate) TOV: f64,
    pub(crate) FG3M: f64,
    pub(crate) FG_PCT: f64,
    pub(crate) FG3_PCT: f64,
    pub(crate) FT_PCT: f64,
    pub(crate) PLUS_MINUS: f64,
    #[serde(default)]
    pub(crate) SALARY: f64,
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawFreeAgent {
    PLAYER_NAME: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Why a row was refused at the catalog boundary.
fn row_violation(raw: &RawPlayerRow) -> Option<String> {
    let numbers = [
        raw.AGE, raw.GP, raw.MIN, raw.PTS, raw.REB, raw.OREB, raw.AST, raw.STL, raw.BLK,
        raw.TOV, raw.FG3M, raw.FG_PCT, raw.FG3_PCT, raw.FT_PCT, raw.PLUS_MINUS, raw.SALARY,
    ];
    if !numbers.iter().all(|v| v.is_finite()) {
        return Some("non-finite value".into());
    }
    if raw.SALARY < 0.0 {
        return Some(format!("negative salary {}", raw.SALARY));
    }
    if raw.SALARY > Salary::MAX_CONTRACT.0 as f64 {
        return Some(format!("salary {} above the contract limit", raw.SALARY));
    }
    if !(MIN_AGE as f64..=MAX_AGE as f64).contains(&raw.AGE) {
        return Some(format!("age {} out of range", raw.AGE));
    }
    if raw.GP < 0.0 || raw.GP > MAX_GAMES as f64 {
        return Some(format!("games played {} out of range", raw.GP));
    }
    let counts = [
        raw.MIN, raw.PTS, raw.REB, raw.OREB, raw.AST, raw.STL, raw.BLK, raw.TOV, raw.FG3M,
    ];
    if counts.iter().any(|v| *v < 0.0) {
        return Some("negative counting stat".into());
    }
    for (label, pct) in [("FG_PCT", raw.FG_PCT), ("FG3_PCT", raw.FG3_PCT), ("FT_PCT", raw.FT_PCT)] {
        if !(0.0..=1.0).contains(&pct) {
            return Some(format!("{label} {pct} outside [0, 1]"));
        }
    }
    None
}

fn player_from_raw(raw: RawPlayerRow) -> Player {
    Player {
        id: raw.PLAYER_ID,
        name: normalize_name(&raw.PLAYER_NAME),
        team: raw.TEAM_ABBREVIATION.trim().to_uppercase(),
        age: raw.AGE.round() as u32,
        stats: StatLine {
            games_played: raw.GP.round() as u32,
            minutes: raw.MIN,
            points: raw.PTS,
            rebounds: raw.REB,
            offensive_rebounds: raw.OREB,
            assists: raw.AST,
            steals: raw.STL,
            blocks: raw.BLK,
            turnovers: raw.TOV,
            threes_made: raw.FG3M,
            plus_minus: raw.PLUS_MINUS,
            fg_pct: raw.FG_PCT,
            fg3_pct: raw.FG3_PCT,
            ft_pct: raw.FT_PCT,
        },
        salary: Salary::from_dollars(raw.SALARY.round() as i64),
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (enable testing without temp files)
// ---------------------------------------------------------------------------

/// Parse and validate season rows, skipping malformed or invalid ones.
pub(crate) fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        match result {
            Ok(raw) => {
                if let Some(reason) = row_violation(&raw) {
                    warn!("skipping player '{}': {}", raw.PLAYER_NAME.trim(), reason);
                    continue;
                }
                players.push(player_from_raw(raw));
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

fn load_free_agents_from_reader<R: Read>(rdr: R) -> Result<FreeAgentPool, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut names = Vec::new();
    for result in reader.deserialize::<RawFreeAgent>() {
        match result {
            Ok(raw) if !raw.PLAYER_NAME.trim().is_empty() => names.push(raw.PLAYER_NAME),
            Ok(_) => warn!("skipping free-agent row with empty name"),
            Err(e) => warn!("skipping malformed free-agent row: {}", e),
        }
    }
    Ok(FreeAgentPool::new(names))
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

pub(crate) fn open(path: &Path) -> Result<std::fs::File, CatalogError> {
    std::fs::File::open(path).map_err(|e| CatalogError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the current-season catalog. A file with no valid rows is an error.
pub fn load_catalog(path: &Path) -> Result<PlayerCatalog, CatalogError> {
    let players = load_players_from_reader(open(path)?).map_err(|e| CatalogError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if players.is_empty() {
        return Err(CatalogError::Validation(format!(
            "{} produced zero valid player rows",
            path.display()
        )));
    }
    Ok(PlayerCatalog::new(players))
}

/// Load the free-agent list (a CSV with a PLAYER_NAME column).
pub fn load_free_agents(path: &Path) -> Result<FreeAgentPool, CatalogError> {
    load_free_agents_from_reader(open(path)?).map_err(|e| CatalogError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "PLAYER_ID,PLAYER_NAME,TEAM_ABBREVIATION,AGE,GP,MIN,PTS,REB,OREB,AST,STL,BLK,TOV,FG3M,FG_PCT,FG3_PCT,FT_PCT,PLUS_MINUS,SALARY";

    fn csv_with(rows: &[&str]) -> String {
        let mut s = HEADER.to_string();
        for r in rows {
            s.push('\n');
            s.push_str(r);
        }
        s
    }

    #[test]
    fn parses_valid_rows() {
        let data = csv_with(&[
            "1630224,Jalen Green,HOU,23,82,2707,1722,376,40,275,74,22,209,217,0.423,0.354,0.813,127,33333333",
            "1628983,Shai Gilgeous-Alexander,OKC,26,76,2598,2485,380,65,486,129,77,183,163,0.519,0.375,0.898,916,35859950",
        ]);
        let players = load_players_from_reader(data.as_bytes()).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "jalen green");
        assert_eq!(players[0].team, "HOU");
        assert_eq!(players[0].age, 23);
        assert_eq!(players[0].stats.games_played, 82);
        assert_eq!(players[0].salary, Salary(33_333_333));
        assert!((players[1].stats.fg_pct - 0.519).abs() < f64::EPSILON);
    }

    #[test]
    fn salary_column_optional() {
        let data = "PLAYER_ID,PLAYER_NAME,TEAM_ABBREVIATION,AGE,GP,MIN,PTS,REB,OREB,AST,STL,BLK,TOV,FG3M,FG_PCT,FG3_PCT,FT_PCT,PLUS_MINUS\n\
1,Test Player,BOS,30,60,1500,700,300,50,100,40,20,60,80,0.45,0.36,0.8,10";
        let players = load_players_from_reader(data.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].salary, Salary::ZERO);
    }

    #[test]
    fn rejects_rows_breaking_invariants() {
        let data = csv_with(&[
            "1,Valid,HOU,25,70,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,1000000",
            "2,Negative Pay,HOU,25,70,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,-5",
            "3,Too Old,HOU,61,70,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,1000000",
            "4,Too Many Games,HOU,25,90,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,1000000",
            "5,Bad Pct,HOU,25,70,2000,1000,300,50,200,60,30,100,100,1.47,0.36,0.80,50,1000000",
            "6,NaN Row,HOU,25,70,NaN,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,1000000",
            "7,Bad Number,HOU,25,seventy,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,1000000",
            "8,Huge Pay,HOU,25,70,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,5000000000",
        ]);
        let players = load_players_from_reader(data.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "valid");
    }

    #[test]
    fn names_normalized_and_team_uppercased() {
        let data = csv_with(&[
            "1,  Fred   VanVleet ,hou,30,60,2000,900,250,30,350,90,40,100,150,0.38,0.34,0.9,40,42846000",
        ]);
        let players = load_players_from_reader(data.as_bytes()).unwrap();
        assert_eq!(players[0].name, "fred vanvleet");
        assert_eq!(players[0].team, "HOU");
    }

    #[test]
    fn catalog_lookup_and_team_salary() {
        let data = csv_with(&[
            "1,A One,HOU,25,70,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,10000000",
            "2,B Two,HOU,25,70,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,5000000",
            "3,C Three,PHX,25,70,2000,1000,300,50,200,60,30,100,100,0.47,0.36,0.80,50,7000000",
        ]);
        let catalog = PlayerCatalog::new(load_players_from_reader(data.as_bytes()).unwrap());
        assert_eq!(catalog.find(" A  ONE ").map(|p| p.id), Some(1));
        assert!(catalog.find("nobody").is_none());
        assert_eq!(catalog.find_by_id(3).map(|p| p.name.as_str()), Some("c three"));
        assert!(catalog.find_by_id(99).is_none());
        assert_eq!(catalog.find_by_name_or_id(" 2 ").map(|p| p.id), Some(2));
        assert_eq!(catalog.find_by_name_or_id("b two").map(|p| p.id), Some(2));
        assert!(catalog.find_by_name_or_id("42").is_none());
        assert_eq!(catalog.team_salary("HOU"), Salary(15_000_000));
        assert_eq!(catalog.teams(), vec!["HOU".to_string(), "PHX".to_string()]);
    }

    #[test]
    fn free_agent_pool_loading() {
        let data = "PLAYER_NAME\nFred VanVleet\n  Dorian Finney-Smith \n\n";
        let pool = load_free_agents_from_reader(data.as_bytes()).unwrap();
        assert_eq!(pool.len(), 2);
        assert!(pool.contains("FRED VANVLEET"));
        assert!(pool.contains("dorian finney-smith"));
    }

    #[test]
    fn free_agent_pool_shrinks() {
        let mut pool = FreeAgentPool::new(["A", "B"]);
        assert!(pool.remove("a"));
        assert!(!pool.remove("a"));
        assert_eq!(pool.names().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn salary_units() {
        assert_eq!(Salary::from_millions(20.0), Salary(20_000_000));
        assert_eq!(Salary::from_millions(187.895), Salary(187_895_000));
        assert_eq!(Salary(33_333_333).to_string(), "$33.3M");
        assert_eq!([Salary(1), Salary(2)].iter().sum::<Salary>(), Salary(3));
        assert_eq!(Salary(i64::MAX).checked_add(Salary(1)), None);
        assert_eq!(Salary(2).checked_add(Salary(3)), Some(Salary(5)));
    }

    #[test]
    fn stat_line_rates() {
        let line = StatLine {
            games_played: 0,
            minutes: 0.0,
            points: 10.0,
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
        assert_eq!(line.points_per_game(), 0.0);
        assert_eq!(line.minutes_per_game(), 0.0);
        assert_eq!(line.per_minute(line.points), 0.0);
    }
}
