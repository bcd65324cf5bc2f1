//! Team membership, names and spawn anchors

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use super::math::jitter_horizontal;

/// Small positive team identifier. Team 1 is listed first everywhere.
pub type TeamId = u8;

/// A team and its members
#[derive(Debug, Clone)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub spawn: Option<Vec3>,
    pub members: BTreeSet<Uuid>,
}

/// Authoritative player ↔ team mapping
#[derive(Debug, Clone, Default)]
pub struct TeamRegistry {
    teams: BTreeMap<TeamId, Team>,
    spawn_jitter: f32,
}

impl TeamRegistry {
    /// Build teams numbered from 1 in the order given
    pub fn new(teams: impl IntoIterator<Item = (String, Option<Vec3>)>, spawn_jitter: f32) -> Self {
        let teams = teams
            .into_iter()
            .enumerate()
            .map(|(i, (name, spawn))| {
                let id = (i + 1) as TeamId;
                (
                    id,
                    Team {
                        id,
                        name,
                        spawn,
                        members: BTreeSet::new(),
                    },
                )
            })
            .collect();
        Self {
            teams,
            spawn_jitter,
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = TeamId> + '_ {
        self.teams.keys().copied()
    }

    pub fn get(&self, team_id: TeamId) -> Option<&Team> {
        self.teams.get(&team_id)
    }

    pub fn name(&self, team_id: TeamId) -> Option<&str> {
        self.teams.get(&team_id).map(|t| t.name.as_str())
    }

    pub fn set_name(&mut self, team_id: TeamId, name: impl Into<String>) -> bool {
        match self.teams.get_mut(&team_id) {
            Some(team) => {
                team.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn team_of(&self, player_id: Uuid) -> Option<TeamId> {
        self.teams
            .values()
            .find(|team| team.members.contains(&player_id))
            .map(|team| team.id)
    }

    pub fn members(&self, team_id: TeamId) -> impl Iterator<Item = Uuid> + '_ {
        self.teams
            .get(&team_id)
            .into_iter()
            .flat_map(|team| team.members.iter().copied())
    }

    /// Move a player onto `team_id`, leaving any previous team
    pub fn assign(&mut self, player_id: Uuid, team_id: TeamId) -> bool {
        if !self.teams.contains_key(&team_id) {
            return false;
        }
        self.remove(player_id);
        if let Some(team) = self.teams.get_mut(&team_id) {
            team.members.insert(player_id);
        }
        true
    }

    /// Join path used at connect time: the smallest team, lowest id on ties
    pub fn add_to_min_team(&mut self, player_id: Uuid) -> Option<TeamId> {
        self.remove(player_id);
        let target = self
            .teams
            .values()
            .min_by_key(|team| (team.members.len(), team.id))
            .map(|team| team.id)?;
        self.assign(player_id, target);
        debug!(player_id = %player_id, team_id = target, "Assigned player to team");
        Some(target)
    }

    /// Toggle between team 1 and team 2. Players without a team stay put.
    pub fn switch_team(&mut self, player_id: Uuid) -> Option<TeamId> {
        let current = self.team_of(player_id)?;
        let next = if current == 1 { 2 } else { 1 };
        if self.assign(player_id, next) {
            Some(next)
        } else {
            Some(current)
        }
    }

    /// Remove a player from whichever team holds them; no-op otherwise
    pub fn remove(&mut self, player_id: Uuid) {
        for team in self.teams.values_mut() {
            if team.members.remove(&player_id) {
                break;
            }
        }
    }

    /// The team's anchor perturbed by up to the configured jitter on x and z
    pub fn spawn_point<R: Rng + ?Sized>(&self, team_id: TeamId, rng: &mut R) -> Option<Vec3> {
        let anchor = self.teams.get(&team_id)?.spawn?;
        Some(jitter_horizontal(rng, anchor, self.spawn_jitter))
    }

    /// The other team of a two-team match
    pub fn opponent_of(&self, team_id: TeamId) -> Option<TeamId> {
        self.teams.keys().copied().find(|id| *id != team_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn registry() -> TeamRegistry {
        TeamRegistry::new(
            [
                ("Blue Bandits".to_string(), Some(Vec3::new(-10.0, 15.0, -10.0))),
                ("Red Raiders".to_string(), Some(Vec3::new(10.0, 15.0, 10.0))),
            ],
            1.0,
        )
    }

    #[test]
    fn min_team_balances_and_breaks_ties_low() {
        let mut teams = registry();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let assigned: Vec<TeamId> = ids
            .iter()
            .map(|id| teams.add_to_min_team(*id).unwrap_or_default())
            .collect();
        assert_eq!(assigned, vec![1, 2, 1, 2, 1]);
        assert_eq!(teams.members(1).count(), 3);
        assert_eq!(teams.members(2).count(), 2);
    }

    #[test]
    fn player_is_on_at_most_one_team() {
        let mut teams = registry();
        let id = Uuid::new_v4();
        teams.assign(id, 1);
        teams.assign(id, 2);
        assert_eq!(teams.team_of(id), Some(2));
        assert_eq!(teams.members(1).count(), 0);
    }

    #[test]
    fn switch_toggles_between_teams() {
        let mut teams = registry();
        let id = Uuid::new_v4();
        teams.assign(id, 1);
        assert_eq!(teams.switch_team(id), Some(2));
        assert_eq!(teams.switch_team(id), Some(1));
        assert_eq!(teams.switch_team(Uuid::new_v4()), None);
    }

    #[test]
    fn removing_unknown_player_is_noop() {
        let mut teams = registry();
        teams.remove(Uuid::new_v4());
        assert_eq!(teams.members(1).count(), 0);
    }

    #[test]
    fn spawn_point_is_jittered_within_bounds() {
        let teams = registry();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let anchor = Vec3::new(10.0, 15.0, 10.0);
        for _ in 0..50 {
            let p = teams.spawn_point(2, &mut rng).unwrap_or(Vec3::ZERO);
            assert!((p.x - anchor.x).abs() <= 1.0);
            assert!((p.z - anchor.z).abs() <= 1.0);
            assert_eq!(p.y, anchor.y);
        }
    }

    #[test]
    fn missing_spawn_yields_none() {
        let teams = TeamRegistry::new([("Solo".to_string(), None)], 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(teams.spawn_point(1, &mut rng).is_none());
        assert!(teams.spawn_point(9, &mut rng).is_none());
    }
}
