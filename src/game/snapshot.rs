//! HUD snapshot cadence and leaderboard payloads

use crate::protocol::{HudSnapshot, LeaderboardRow, TeamLeaderboard, UiMessage};

use super::player::{PlayerState, Roster};
use super::team::TeamRegistry;
use super::territory::TerritoryLedger;

/// Decides which ticks carry a HUD refresh
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build one player's HUD
    pub fn build(
        &self,
        time: &str,
        player: &PlayerState,
        teams: &TeamRegistry,
        ledger: &TerritoryLedger,
    ) -> HudSnapshot {
        let team_name = teams
            .team_of(player.id)
            .and_then(|id| teams.name(id))
            .unwrap_or("Spectator")
            .to_string();

        HudSnapshot {
            time: time.to_string(),
            scores: score_line(teams, ledger),
            team_name,
            stamina: player.stamina.round(),
            max_stamina: player.max_stamina,
            points: player.points,
            kills: player.kills,
            deaths: player.deaths,
            name: player.name.clone(),
            class: player.class,
            invincible: player.invincible,
            strength_boost: player.strength_boost,
        }
    }
}

/// "Name: score | Name: score", lowest team id first
pub fn score_line(teams: &TeamRegistry, ledger: &TerritoryLedger) -> String {
    teams
        .ids()
        .map(|id| format!("{}: {}", teams.name(id).unwrap_or("?"), ledger.score(id)))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// One ranked list per team, by descending points
pub fn leaderboard(roster: &Roster, teams: &TeamRegistry) -> UiMessage {
    let boards = teams
        .ids()
        .map(|team| {
            let mut rows: Vec<LeaderboardRow> = teams
                .members(team)
                .filter_map(|id| roster.get(id))
                .map(|p| LeaderboardRow {
                    name: p.name.clone(),
                    points: p.points,
                    kills: p.kills,
                    deaths: p.deaths,
                })
                .collect();
            rows.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));
            TeamLeaderboard {
                team_name: teams.name(team).unwrap_or("?").to_string(),
                rows,
            }
        })
        .collect();
    UiMessage::Leaderboard { teams: boards }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::{ActorKind, PlayerClass};
    use uuid::Uuid;

    #[test]
    fn cadence_fires_every_interval() {
        let mut builder = SnapshotBuilder::new(3);
        let sent: Vec<bool> = (0..6).map(|_| builder.should_send()).collect();
        assert_eq!(sent, vec![false, false, true, false, false, true]);
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn leaderboard_ranks_by_points_per_team() {
        let mut roster = Roster::new();
        let mut teams = TeamRegistry::new(
            [("Blue".to_string(), None), ("Red".to_string(), None)],
            0.0,
        );
        for (name, team, points) in [("a", 1, 3), ("b", 1, 9), ("c", 2, 1)] {
            let id = Uuid::new_v4();
            let mut p = PlayerState::new(id, name, ActorKind::Human, PlayerClass::Sniper, 520.0);
            p.points = points;
            roster.insert(p);
            teams.assign(id, team);
        }
        let UiMessage::Leaderboard { teams: boards } = leaderboard(&roster, &teams) else {
            panic!("expected leaderboard");
        };
        assert_eq!(boards.len(), 2);
        assert_eq!(boards[0].rows[0].name, "b");
        assert_eq!(boards[0].rows[1].name, "a");
        assert_eq!(boards[1].rows.len(), 1);
    }

    #[test]
    fn score_line_lists_teams_in_order() {
        let teams = TeamRegistry::new(
            [("Blue".to_string(), None), ("Red".to_string(), None)],
            0.0,
        );
        let ledger = TerritoryLedger::new([1, 2]);
        assert_eq!(score_line(&teams, &ledger), "Blue: 0 | Red: 0");
    }
}
