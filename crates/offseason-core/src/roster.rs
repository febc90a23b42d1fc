// Team roster membership and payroll.

use serde::{Deserialize, Serialize};

use crate::catalog::{normalize_name, FreeAgentPool, Player, PlayerCatalog, Salary};

/// One team's current players.
///
/// Payroll is always recomputed from the members, never cached, so it
/// reflects the latest add/remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRoster {
    /// Team abbreviation, e.g. "HOU".
    pub team: String,
    players: Vec<Player>,
}

impl TeamRoster {
    /// An empty roster for a team.
    pub fn new(team: &str) -> Self {
        TeamRoster {
            team: team.to_string(),
            players: Vec::new(),
        }
    }

    /// Build a team's opening roster: every catalog row for the team,
    /// minus anyone in the free-agent pool.
    pub fn build_initial(team: &str, catalog: &PlayerCatalog, free_agents: &FreeAgentPool) -> Self {
        let players = catalog
            .team_players(team)
            .filter(|p| !free_agents.contains(&p.name))
            .cloned()
            .collect();
        TeamRoster {
            team: team.to_string(),
            players,
        }
    }

    /// Sum of member salaries.
    pub fn salary(&self) -> Salary {
        self.players.iter().map(|p| p.salary).sum()
    }

    /// Append a player, optionally overwriting their salary with a
    /// negotiated amount. Duplicate names are not checked here.
    pub fn add(&mut self, mut player: Player, override_salary: Option<Salary>) {
        if let Some(salary) = override_salary {
            player.salary = salary;
        }
        self.players.push(player);
    }

    /// Remove every member matching the name. Returns how many were removed.
    pub fn remove(&mut self, player_name: &str) -> usize {
        let key = normalize_name(player_name);
        let before = self.players.len();
        self.players.retain(|p| p.name != key);
        before - self.players.len()
    }

    /// Whether a player is on this roster.
    pub fn contains(&self, player_name: &str) -> bool {
        self.get(player_name).is_some()
    }

    pub fn get(&self, player_name: &str) -> Option<&Player> {
        let key = normalize_name(player_name);
        self.players.iter().find(|p| p.name == key)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn names(&self) -> Vec<&str> {
        self.players.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StatLine;

    fn player(name: &str, team: &str, salary: i64) -> Player {
        Player {
            id: 0,
            name: normalize_name(name),
            team: team.into(),
            age: 26,
            stats: StatLine {
                games_played: 70,
                minutes: 2100.0,
                points: 1200.0,
                rebounds: 300.0,
                offensive_rebounds: 60.0,
                assists: 250.0,
                steals: 70.0,
                blocks: 30.0,
                turnovers: 120.0,
                threes_made: 150.0,
                plus_minus: 20.0,
                fg_pct: 0.46,
                fg3_pct: 0.37,
                ft_pct: 0.82,
            },
            salary: Salary(salary),
        }
    }

    fn catalog() -> PlayerCatalog {
        PlayerCatalog::new(vec![
            player("Alperen Sengun", "HOU", 5_424_654),
            player("Fred VanVleet", "HOU", 42_846_000),
            player("Jalen Green", "HOU", 12_483_048),
            player("Devin Booker", "PHX", 49_205_800),
        ])
    }

    #[test]
    fn build_initial_filters_team_and_free_agents() {
        let fa = FreeAgentPool::new(["Fred VanVleet"]);
        let roster = TeamRoster::build_initial("HOU", &catalog(), &fa);
        assert_eq!(roster.len(), 2);
        assert!(roster.contains("alperen sengun"));
        assert!(!roster.contains("fred vanvleet"));
        assert!(!roster.contains("devin booker"));
    }

    #[test]
    fn salary_reflects_every_mutation() {
        let mut roster = TeamRoster::build_initial("HOU", &catalog(), &FreeAgentPool::default());
        assert_eq!(roster.salary(), Salary(5_424_654 + 42_846_000 + 12_483_048));

        roster.remove("Jalen Green");
        assert_eq!(roster.salary(), Salary(5_424_654 + 42_846_000));

        roster.add(player("Devin Booker", "PHX", 49_205_800), None);
        assert_eq!(roster.salary(), Salary(5_424_654 + 42_846_000 + 49_205_800));
    }

    #[test]
    fn add_with_override_salary() {
        let mut roster = TeamRoster::new("HOU");
        roster.add(player("Fred VanVleet", "HOU", 42_846_000), Some(Salary::from_millions(20.0)));
        assert_eq!(roster.get("fred vanvleet").unwrap().salary, Salary(20_000_000));
        assert_eq!(roster.salary(), Salary(20_000_000));
    }

    #[test]
    fn add_does_not_deduplicate() {
        let mut roster = TeamRoster::new("HOU");
        roster.add(player("A", "HOU", 1), None);
        roster.add(player("A", "HOU", 1), None);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn remove_normalizes_and_removes_all_matches() {
        let mut roster = TeamRoster::new("HOU");
        roster.add(player("A Player", "HOU", 1), None);
        roster.add(player("A Player", "HOU", 1), None);
        roster.add(player("Other", "HOU", 1), None);
        assert_eq!(roster.remove("  a   PLAYER "), 2);
        assert_eq!(roster.names(), vec!["other"]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut roster = TeamRoster::new("HOU");
        roster.add(player("Other", "HOU", 1), None);
        assert_eq!(roster.remove("nobody"), 0);
        assert_eq!(roster.len(), 1);
    }
}
