//! Combat system - weapons, projectiles, knockback, melee
//!
//! Every entry point is total: unmet preconditions (wrong class, cooldown,
//! stamina, friendly fire, invincibility) return an outcome and leave state
//! untouched instead of erroring.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::host::{EntityId, Host, ProjectileSpawn};

use super::context::{MatchContext, TimerEvent};
use super::math::rotate_about_y;
use super::player::{ActorId, LifeState, Roster};
use super::team::{TeamId, TeamRegistry};
use super::timer::TimerHandle;

/// Ranged weapon families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    Blob,
    Slingshot,
    Sniper,
}

/// Extra projectiles either side of the primary direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FanSpread {
    pub offset_degrees: f32,
    /// Added to the primary speed for the side projectiles
    pub speed_delta: f32,
}

/// Weapon stats per weapon kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub speed: f32,
    pub knockback: f32,
    pub energy_cost: f32,
    pub cooldown_ms: u64,
    /// Maximum cells painted per impact
    pub paint_cap: u32,
    pub fan: Option<FanSpread>,
    /// Despawn as soon as it strikes an actor
    pub despawn_on_hit: bool,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            speed: 30.0,
            knockback: 10.0,
            energy_cost: 25.0,
            cooldown_ms: 500,
            paint_cap: 4,
            fan: None,
            despawn_on_hit: false,
        }
    }
}

/// Live projectile tracked by the resolver
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: EntityId,
    pub owner: ActorId,
    pub team: Option<TeamId>,
    pub weapon: WeaponKind,
    pub launch_velocity: Vec3,
    expiry: Option<TimerHandle>,
}

/// Independent cooldown slots per actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownSlot {
    Weapon(WeaponKind),
    Melee,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireOutcome {
    Fired { projectiles: usize },
    UnknownActor,
    NotAlive,
    /// Back in play but still settling after a respawn
    Respawning,
    WrongClass,
    CoolingDown,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitOutcome {
    Knockback { impulse: Vec3 },
    /// Friendly fire or invincible target: no effect, projectile removed
    Blocked,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeleeOutcome {
    Hit { target: ActorId, impulse: Vec3 },
    Blocked { target: ActorId },
    Missed,
    CoolingDown,
    NotAlive,
}

/// Resolves fire, projectile contact and melee for every actor
#[derive(Debug, Default)]
pub struct CombatResolver {
    cooldowns: HashMap<(ActorId, CooldownSlot), TimerHandle>,
    projectiles: HashMap<EntityId, Projectile>,
}

impl CombatResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projectile(&self, id: EntityId) -> Option<&Projectile> {
        self.projectiles.get(&id)
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// True while `slot` is cooling down for `actor`
    pub fn on_cooldown<H: Host>(
        &self,
        ctx: &MatchContext<H>,
        actor: ActorId,
        slot: CooldownSlot,
    ) -> bool {
        self.cooldowns
            .get(&(actor, slot))
            .is_some_and(|handle| ctx.is_live(*handle))
    }

    fn stamp_cooldown<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        actor: ActorId,
        slot: CooldownSlot,
        duration_ms: u64,
    ) {
        let handle = ctx.schedule_once(duration_ms, TimerEvent::CooldownReady);
        if let Some(old) = self.cooldowns.insert((actor, slot), handle) {
            ctx.scheduler.cancel(old);
        }
    }

    /// Fire `weapon` for `actor` from `origin` along `direction`.
    ///
    /// The class must carry the weapon, the weapon's cooldown must have
    /// elapsed and stamina must cover the cost. Stamina and cooldown are only
    /// consumed when projectiles actually spawn.
    #[allow(clippy::too_many_arguments)]
    pub fn fire_projectile<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        teams: &TeamRegistry,
        actor: ActorId,
        origin: Vec3,
        direction: Vec3,
        weapon: WeaponKind,
    ) -> FireOutcome {
        let stats = *ctx.config.weapon(weapon);
        let Some(player) = roster.get(actor) else {
            return FireOutcome::UnknownActor;
        };
        if !player.can_act() {
            return FireOutcome::NotAlive;
        }
        if player.life == LifeState::Respawning {
            trace!(actor_id = %actor, "Cannot fire while respawning");
            return FireOutcome::Respawning;
        }
        if player.class.weapon() != Some(weapon) {
            trace!(actor_id = %actor, ?weapon, "Weapon not available to class");
            return FireOutcome::WrongClass;
        }
        if self.on_cooldown(ctx, actor, CooldownSlot::Weapon(weapon)) {
            return FireOutcome::CoolingDown;
        }
        if player.stamina < stats.energy_cost {
            trace!(actor_id = %actor, stamina = player.stamina, "Not enough stamina to fire");
            return FireOutcome::Exhausted;
        }

        if let Some(player) = roster.get_mut(actor) {
            player.try_spend(stats.energy_cost);
        }
        self.stamp_cooldown(ctx, actor, CooldownSlot::Weapon(weapon), stats.cooldown_ms);
        let team = teams.team_of(actor);
        let projectiles = self.launch(ctx, actor, team, origin, direction, weapon);
        FireOutcome::Fired { projectiles }
    }

    /// Spawn the primary projectile and any fan, each with its own expiry
    fn launch<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        owner: ActorId,
        team: Option<TeamId>,
        origin: Vec3,
        direction: Vec3,
        weapon: WeaponKind,
    ) -> usize {
        let stats = *ctx.config.weapon(weapon);
        let direction = direction.normalize_or_zero();

        let mut shots = vec![(direction, stats.speed)];
        if let Some(fan) = stats.fan {
            let speed = stats.speed + fan.speed_delta;
            shots.push((rotate_about_y(direction, fan.offset_degrees), speed));
            shots.push((rotate_about_y(direction, -fan.offset_degrees), speed));
        }

        let lifetime = ctx.config.projectile_lifetime_ms;
        for (dir, speed) in &shots {
            let velocity = *dir * *speed;
            let id = ctx.host.spawn_projectile(ProjectileSpawn {
                owner,
                weapon,
                origin,
                velocity,
            });
            let expiry = ctx.schedule_once(lifetime, TimerEvent::ProjectileExpired(id));
            self.projectiles.insert(
                id,
                Projectile {
                    id,
                    owner,
                    team,
                    weapon,
                    launch_velocity: velocity,
                    expiry: Some(expiry),
                },
            );
        }
        debug!(actor_id = %owner, ?weapon, count = shots.len(), "Projectiles launched");
        shots.len()
    }

    /// Remove a projectile from play and from the world
    pub fn despawn_projectile<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        id: EntityId,
    ) -> Option<Projectile> {
        let mut projectile = self.projectiles.remove(&id)?;
        ctx.cancel(&mut projectile.expiry);
        ctx.host.despawn_entity(id);
        Some(projectile)
    }

    /// Lifetime timer fired
    pub fn expire_projectile<H: Host>(&mut self, ctx: &mut MatchContext<H>, id: EntityId) {
        if let Some(mut projectile) = self.projectiles.remove(&id) {
            projectile.expiry = None;
            ctx.host.despawn_entity(id);
        }
    }

    pub fn despawn_all<H: Host>(&mut self, ctx: &mut MatchContext<H>) {
        let ids: Vec<EntityId> = self.projectiles.keys().copied().collect();
        for id in ids {
            self.despawn_projectile(ctx, id);
        }
    }

    /// Drop an actor's cooldowns when they leave
    pub fn forget_actor<H: Host>(&mut self, ctx: &mut MatchContext<H>, actor: ActorId) {
        self.cooldowns.retain(|(owner, _), handle| {
            if *owner == actor {
                ctx.scheduler.cancel(*handle);
                false
            } else {
                true
            }
        });
    }

    /// A projectile touched `target`
    pub fn resolve_projectile_hit<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        teams: &TeamRegistry,
        projectile_id: EntityId,
        target: ActorId,
    ) -> HitOutcome {
        let Some(projectile) = self.projectiles.get(&projectile_id).cloned() else {
            return HitOutcome::Ignored;
        };
        if projectile.owner == target {
            return HitOutcome::Ignored;
        }
        let Some(victim) = roster.get(target) else {
            return HitOutcome::Ignored;
        };
        if !victim.can_act() || out_of_play(ctx, target) {
            return HitOutcome::Ignored;
        }

        let same_team = projectile.team.is_some() && projectile.team == teams.team_of(target);
        if victim.invincible || (same_team && !ctx.config.friendly_fire) {
            trace!(target_id = %target, shooter_id = %projectile.owner, "Hit blocked");
            self.despawn_projectile(ctx, projectile_id);
            return HitOutcome::Blocked;
        }

        let strength = roster
            .get(projectile.owner)
            .is_some_and(|shooter| shooter.strength_boost);
        let multiplier = if strength {
            ctx.config.buffs.strength_multiplier
        } else {
            1.0
        };
        let velocity = ctx
            .host
            .projectile_velocity(projectile_id)
            .unwrap_or(projectile.launch_velocity);
        let stats = *ctx.config.weapon(projectile.weapon);
        let impulse = projectile_knockback(
            velocity,
            stats.knockback,
            multiplier,
            ctx.config.projectile_min_lift,
            ctx.config.projectile_lift_scale,
        );

        if let Some(victim) = roster.get_mut(target) {
            victim.last_hit_by = Some(projectile.owner);
        }
        ctx.host.apply_impulse(target, impulse);
        debug!(target_id = %target, shooter_id = %projectile.owner, ?impulse, "Projectile knockback");

        if stats.despawn_on_hit {
            self.despawn_projectile(ctx, projectile_id);
        }
        HitOutcome::Knockback { impulse }
    }

    /// Melee swing: lunge forward, then line-check for a victim within reach
    pub fn resolve_melee_attack<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        teams: &TeamRegistry,
        actor: ActorId,
    ) -> MeleeOutcome {
        let melee = ctx.config.melee.clone();
        let Some(attacker) = roster.get(actor) else {
            return MeleeOutcome::NotAlive;
        };
        if !attacker.can_act() {
            return MeleeOutcome::NotAlive;
        }
        if self.on_cooldown(ctx, actor, CooldownSlot::Melee) {
            return MeleeOutcome::CoolingDown;
        }
        let class = attacker.class;
        let strength = attacker.strength_boost;
        self.stamp_cooldown(ctx, actor, CooldownSlot::Melee, melee.cooldown_ms);

        let facing = ctx
            .host
            .actor_facing(actor)
            .unwrap_or(Vec3::NEG_Z)
            .normalize_or_zero();
        let dash = melee.self_force * melee.dash_multiplier.get(class);
        ctx.host.apply_impulse(
            actor,
            Vec3::new(facing.x * dash, melee.self_lift * melee.self_force, facing.z * dash),
        );

        let Some(origin) = ctx.host.actor_position(actor) else {
            return MeleeOutcome::Missed;
        };
        let origin = origin + Vec3::Y * (ctx.config.muzzle_height * 0.5);
        let Some(target) = ctx
            .host
            .raycast(origin, facing, melee.reach, actor)
            .and_then(|hit| hit.actor)
        else {
            return MeleeOutcome::Missed;
        };
        let Some(victim) = roster.get(target) else {
            return MeleeOutcome::Missed;
        };
        if !victim.can_act() {
            return MeleeOutcome::Missed;
        }

        let same_team = teams.team_of(actor).is_some() && teams.team_of(actor) == teams.team_of(target);
        if victim.invincible || (same_team && !ctx.config.friendly_fire) {
            trace!(actor_id = %actor, target_id = %target, "Melee blocked");
            return MeleeOutcome::Blocked { target };
        }

        let multiplier = if strength {
            ctx.config.buffs.strength_multiplier
        } else {
            1.0
        };
        let lift = facing.y.max(melee.min_lift) * melee.hit_vertical_force;
        let impulse = Vec3::new(
            facing.x * melee.hit_force * multiplier,
            lift * multiplier,
            facing.z * melee.hit_force * multiplier,
        );
        ctx.host.apply_impulse(target, impulse);
        if let Some(victim) = roster.get_mut(target) {
            victim.last_hit_by = Some(actor);
        }
        if let Some(attacker) = roster.get_mut(actor) {
            attacker.spend_saturating(melee.energy_cost);
        }
        debug!(actor_id = %actor, target_id = %target, "Melee hit");
        MeleeOutcome::Hit { target, impulse }
    }
}

/// Actors parked in a holding area above the map cannot be hit
fn out_of_play<H: Host>(ctx: &MatchContext<H>, actor: ActorId) -> bool {
    ctx.host
        .actor_position(actor)
        .is_some_and(|p| p.y > ctx.config.out_of_play_height)
}

/// Knockback along the projectile's own travel direction. The vertical part is
/// floored so every hit lifts the target.
pub fn projectile_knockback(
    velocity: Vec3,
    knockback: f32,
    multiplier: f32,
    min_lift: f32,
    lift_scale: f32,
) -> Vec3 {
    let dir = velocity.normalize_or_zero();
    Vec3::new(
        dir.x * knockback * multiplier,
        dir.y.max(min_lift) * knockback * lift_scale,
        dir.z * knockback * multiplier,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knockback_follows_velocity_with_lift_floor() {
        let impulse = projectile_knockback(Vec3::new(0.0, -5.0, -30.0), 12.0, 1.0, 0.5, 0.9);
        assert!(impulse.z < -11.0);
        assert!((impulse.y - 0.5 * 12.0 * 0.9).abs() < 1e-4);
    }

    #[test]
    fn strength_scales_horizontal_knockback() {
        let base = projectile_knockback(Vec3::new(30.0, 0.0, 0.0), 9.0, 1.0, 0.5, 0.9);
        let boosted = projectile_knockback(Vec3::new(30.0, 0.0, 0.0), 9.0, 5.0, 0.5, 0.9);
        assert!((boosted.x - base.x * 5.0).abs() < 1e-4);
        assert_eq!(boosted.y, base.y);
    }

    #[test]
    fn steep_shot_keeps_its_own_lift() {
        let impulse = projectile_knockback(Vec3::new(0.0, 1.0, 0.0), 10.0, 1.0, 0.5, 0.9);
        assert!((impulse.y - 9.0).abs() < 1e-4);
    }
}
