//! Bot behaviour: target acquisition, pursuit and search
//!
//! Bots are ordinary roster entries with `ActorKind::Bot`. They fire through
//! the same combat resolver and die through the same lifecycle as humans;
//! this module only decides where they go and what they shoot at.

use std::collections::BTreeMap;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::host::Host;
use crate::protocol::PathOutcome;

use super::buffs::BuffSystem;
use super::combat::{CombatResolver, FireOutcome};
use super::context::{MatchContext, TimerEvent};
use super::lifecycle;
use super::player::{ActorId, ActorKind, LifeState, PlayerClass, PlayerState, Roster};
use super::team::{TeamId, TeamRegistry};
use super::timer::TimerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcState {
    Idle,
    Pursuing,
    Searching,
    Respawning,
}

#[derive(Debug, Clone)]
struct BotBrain {
    state: NpcState,
    team: TeamId,
    search_index: usize,
}

#[derive(Debug, Default)]
pub struct NpcController {
    brains: BTreeMap<ActorId, BotBrain>,
    think: Option<TimerHandle>,
    spawned_total: u32,
}

fn nearest<H: Host>(
    ctx: &MatchContext<H>,
    origin: Vec3,
    candidates: impl Iterator<Item = ActorId>,
) -> Option<Vec3> {
    candidates
        .filter_map(|id| ctx.host.actor_position(id))
        .min_by(|a, b| {
            a.distance_squared(origin)
                .total_cmp(&b.distance_squared(origin))
        })
}

impl NpcController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, bot: ActorId) -> Option<NpcState> {
        self.brains.get(&bot).map(|b| b.state)
    }

    pub fn bot_count(&self) -> usize {
        self.brains.len()
    }

    pub fn bots(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.brains.keys().copied()
    }

    /// Spawn `per_team` bots on every team and start the think interval
    pub fn spawn_bots<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        teams: &mut TeamRegistry,
        per_team: usize,
    ) -> Vec<ActorId> {
        let mut spawned = Vec::new();
        let team_ids: Vec<TeamId> = teams.ids().collect();
        for team in team_ids {
            for _ in 0..per_team {
                self.spawned_total += 1;
                let id = Uuid::from_u128(ctx.rng.gen());
                let name = format!("Bot_{}", self.spawned_total);
                let class = PlayerClass::Slingshot;
                let max = ctx.config.max_stamina(class);
                roster.insert(PlayerState::new(id, name.clone(), ActorKind::Bot, class, max));
                teams.assign(id, team);

                let position = match teams.spawn_point(team, &mut ctx.rng) {
                    Some(point) => point + Vec3::Y,
                    None => {
                        warn!(team_id = team, "No team spawn configured for bot, using lobby");
                        lifecycle::lobby_point(ctx)
                    }
                };
                ctx.host.spawn_bot(id, &name, position);
                self.brains.insert(
                    id,
                    BotBrain {
                        state: NpcState::Pursuing,
                        team,
                        search_index: 0,
                    },
                );
                spawned.push(id);
            }
        }

        if !self.brains.is_empty() && self.think.is_none() {
            let interval = ctx.config.bots.think_interval_ms;
            self.think = Some(ctx.schedule_repeating(interval, TimerEvent::BotThink));
        }
        if !spawned.is_empty() {
            info!(count = spawned.len(), "Bots spawned");
        }
        spawned
    }

    /// Remove every bot from the world and the match
    pub fn despawn_all<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        teams: &mut TeamRegistry,
        combat: &mut CombatResolver,
        buffs: &mut BuffSystem,
    ) {
        ctx.cancel(&mut self.think);
        let bots: Vec<ActorId> = self.brains.keys().copied().collect();
        for bot in bots {
            lifecycle::cancel_pending(ctx, roster, bot);
            buffs.clear_actor(ctx, roster, bot);
            combat.forget_actor(ctx, bot);
            teams.remove(bot);
            roster.remove(bot);
            ctx.host.despawn_bot(bot);
        }
        self.brains.clear();
    }

    /// Periodic decision step for every bot
    pub fn think<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        teams: &TeamRegistry,
        combat: &mut CombatResolver,
    ) {
        let bots: Vec<ActorId> = self.brains.keys().copied().collect();
        for bot in bots {
            let Some(brain) = self.brains.get(&bot).cloned() else {
                continue;
            };
            if brain.state == NpcState::Respawning
                || !roster.get(bot).is_some_and(|p| p.can_act())
            {
                continue;
            }

            match brain.state {
                NpcState::Idle | NpcState::Pursuing => {
                    let Some(target) = self.find_target(ctx, roster, teams, bot, brain.team) else {
                        trace!(bot_id = %bot, "No target");
                        self.set_state(bot, NpcState::Idle);
                        continue;
                    };
                    if let Some(position) = ctx.host.actor_position(bot) {
                        self.shoot(ctx, roster, teams, combat, bot, target - position);
                    }
                    self.move_toward(ctx, bot, target);
                }
                NpcState::Searching => {
                    let facing = ctx.host.actor_facing(bot).unwrap_or(Vec3::NEG_Z);
                    self.shoot(ctx, roster, teams, combat, bot, facing);
                }
                NpcState::Respawning => {}
            }
        }
    }

    /// Nearest live opposing human, else nearest opposing bot not respawning
    fn find_target<H: Host>(
        &self,
        ctx: &MatchContext<H>,
        roster: &Roster,
        teams: &TeamRegistry,
        bot: ActorId,
        team: TeamId,
    ) -> Option<Vec3> {
        let origin = ctx.host.actor_position(bot)?;
        let enemy_team = teams.opponent_of(team)?;
        let enemies: Vec<ActorId> = teams.members(enemy_team).collect();

        let humans = enemies.iter().copied().filter(|id| {
            roster
                .get(*id)
                .is_some_and(|p| p.is_human() && p.life != LifeState::Dead)
        });
        if let Some(target) = nearest(ctx, origin, humans) {
            return Some(target);
        }

        let bots = enemies.iter().copied().filter(|id| {
            self.brains
                .get(id)
                .is_some_and(|b| b.state != NpcState::Respawning)
        });
        nearest(ctx, origin, bots)
    }

    /// Fire at `direction` with deliberate inaccuracy
    fn shoot<H: Host>(
        &self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        teams: &TeamRegistry,
        combat: &mut CombatResolver,
        bot: ActorId,
        direction: Vec3,
    ) {
        let Some(weapon) = roster.get(bot).and_then(|p| p.class.weapon()) else {
            return;
        };
        let Some(position) = ctx.host.actor_position(bot) else {
            return;
        };
        let jitter = ctx.config.bots.aim_jitter;
        let mut dir = direction.normalize_or_zero();
        dir += Vec3::new(
            ctx.rng.gen_range(-1.0..=1.0) * jitter.x,
            ctx.rng.gen_range(-1.0..=1.0) * jitter.y,
            ctx.rng.gen_range(-1.0..=1.0) * jitter.z,
        );
        let origin = Vec3::new(
            position.x + dir.x,
            position.y + ctx.config.bots.muzzle_height,
            position.z + dir.z,
        );
        let outcome = combat.fire_projectile(ctx, roster, teams, bot, origin, dir, weapon);
        if !matches!(outcome, FireOutcome::Fired { .. }) {
            trace!(bot_id = %bot, ?outcome, "Bot shot skipped");
        }
    }

    /// Path toward the target; on failure walk to the next search point
    fn move_toward<H: Host>(&mut self, ctx: &mut MatchContext<H>, bot: ActorId, target: Vec3) {
        let speed = ctx.config.bots.speed;
        if ctx.host.request_path(bot, target, speed) {
            self.set_state(bot, NpcState::Pursuing);
            return;
        }

        let Some(brain) = self.brains.get_mut(&bot) else {
            return;
        };
        let points = ctx.config.search_points(brain.team.saturating_sub(1) as usize);
        if points.is_empty() {
            warn!(bot_id = %bot, "No route to target and no search points");
            brain.state = NpcState::Pursuing;
            return;
        }
        let point = points[brain.search_index % points.len()];
        brain.search_index = (brain.search_index + 1) % points.len();

        if ctx.host.request_path(bot, point, speed) {
            debug!(bot_id = %bot, ?point, "Searching");
            brain.state = NpcState::Searching;
        } else {
            warn!(bot_id = %bot, ?point, "No route to search point");
            brain.state = NpcState::Pursuing;
        }
    }

    fn set_state(&mut self, bot: ActorId, state: NpcState) {
        if let Some(brain) = self.brains.get_mut(&bot) {
            brain.state = state;
        }
    }

    /// Pathfinding completed or aborted: always resume pursuit
    pub fn on_path_finished(&mut self, bot: ActorId, outcome: PathOutcome) {
        if let Some(brain) = self.brains.get_mut(&bot) {
            if brain.state != NpcState::Respawning {
                trace!(bot_id = %bot, ?outcome, "Path finished");
                brain.state = NpcState::Pursuing;
            }
        }
    }

    pub fn on_death(&mut self, bot: ActorId) {
        self.set_state(bot, NpcState::Respawning);
    }

    pub fn on_respawned(&mut self, bot: ActorId) {
        self.set_state(bot, NpcState::Idle);
    }

    pub fn is_bot(&self, actor: ActorId) -> bool {
        self.brains.contains_key(&actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::host::HeadlessHost;

    struct World {
        ctx: MatchContext<HeadlessHost>,
        roster: Roster,
        teams: TeamRegistry,
        combat: CombatResolver,
        npcs: NpcController,
    }

    fn world() -> World {
        let mut config = GameConfig::default();
        config.bots.per_team = 1;
        let teams = TeamRegistry::new(
            config.teams.iter().map(|t| (t.name.clone(), t.spawn)),
            config.spawn_jitter,
        );
        World {
            ctx: MatchContext::new(HeadlessHost::arena(24, 0), config, 5),
            roster: Roster::new(),
            teams,
            combat: CombatResolver::new(),
            npcs: NpcController::new(),
        }
    }

    fn add_human(w: &mut World, team: TeamId, at: Vec3) -> ActorId {
        let id = Uuid::new_v4();
        w.ctx.host.connect(id, "human");
        w.ctx.host.place_actor(id, at);
        w.roster.insert(PlayerState::new(
            id,
            "human",
            ActorKind::Human,
            PlayerClass::Sniper,
            520.0,
        ));
        w.teams.assign(id, team);
        id
    }

    #[test]
    fn bots_are_named_and_placed_on_each_team() {
        let mut w = world();
        let bots = w
            .npcs
            .spawn_bots(&mut w.ctx, &mut w.roster, &mut w.teams, 2);
        assert_eq!(bots.len(), 4);
        assert_eq!(w.teams.members(1).count(), 2);
        assert_eq!(w.roster.name_of(bots[0]), Some("Bot_1"));
        assert!(bots.iter().all(|b| w.npcs.state(*b) == Some(NpcState::Pursuing)));
    }

    #[test]
    fn bot_fires_at_nearest_enemy_human() {
        let mut w = world();
        let bots = w
            .npcs
            .spawn_bots(&mut w.ctx, &mut w.roster, &mut w.teams, 1);
        add_human(&mut w, 2, Vec3::new(5.0, 1.0, 5.0));
        w.npcs
            .think(&mut w.ctx, &mut w.roster, &w.teams, &mut w.combat);
        assert_eq!(w.ctx.host.path_target(bots[0]), Some(Vec3::new(5.0, 1.0, 5.0)));
        // Each bot fires one slingshot fan of three
        assert_eq!(w.combat.projectile_count(), 6);
    }

    #[test]
    fn unreachable_target_switches_to_search() {
        let mut w = world();
        let bots = w
            .npcs
            .spawn_bots(&mut w.ctx, &mut w.roster, &mut w.teams, 1);
        add_human(&mut w, 2, Vec3::new(5.0, 1.0, 5.0));
        w.ctx.host.block_paths_to(Vec3::new(5.0, 1.0, 5.0));
        w.npcs
            .think(&mut w.ctx, &mut w.roster, &w.teams, &mut w.combat);
        assert_eq!(w.npcs.state(bots[0]), Some(NpcState::Searching));

        w.npcs.on_path_finished(bots[0], PathOutcome::Aborted);
        assert_eq!(w.npcs.state(bots[0]), Some(NpcState::Pursuing));
    }

    #[test]
    fn respawning_bots_ignore_think_ticks() {
        let mut w = world();
        let bots = w
            .npcs
            .spawn_bots(&mut w.ctx, &mut w.roster, &mut w.teams, 1);
        add_human(&mut w, 2, Vec3::new(5.0, 1.0, 5.0));
        w.npcs.on_death(bots[0]);
        w.npcs
            .think(&mut w.ctx, &mut w.roster, &w.teams, &mut w.combat);
        assert_eq!(w.combat.projectile_count(), 0);
        w.npcs.on_path_finished(bots[0], PathOutcome::Completed);
        assert_eq!(w.npcs.state(bots[0]), Some(NpcState::Respawning));
    }

    #[test]
    fn falls_back_to_enemy_bots_when_no_humans() {
        let mut w = world();
        w.npcs
            .spawn_bots(&mut w.ctx, &mut w.roster, &mut w.teams, 1);
        w.npcs
            .think(&mut w.ctx, &mut w.roster, &w.teams, &mut w.combat);
        // Both bots see each other
        assert_eq!(w.combat.projectile_count(), 6);
    }
}
