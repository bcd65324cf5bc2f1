//! Death and respawn sequencing shared by humans and bots

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::host::Host;
use crate::protocol::UiMessage;

use super::buffs::{BuffKind, BuffSystem};
use super::context::{MatchContext, TimerEvent};
use super::math::jitter_horizontal;
use super::player::{ActorId, ActorKind, LifeState, Roster};
use super::team::TeamRegistry;

/// Distance from the holding position that counts as already parked
const HOLDING_TOLERANCE: f32 = 1.0;

/// Horizontal spread of lobby spawns
const LOBBY_JITTER: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathOutcome {
    /// Already dead or parked; nothing changed
    Ignored,
    Fell,
    Killed { by: ActorId },
}

pub fn fall_message<R: Rng + ?Sized>(rng: &mut R, victim: &str) -> String {
    let templates: [fn(&str) -> String; 5] = [
        |v| format!("{v} has fallen into the void!"),
        |v| format!("{v} slipped on a banana peel!"),
        |v| format!("{v} forgot that they couldn't fly!"),
        |v| format!("{v} fell off the edge of the world!"),
        |v| format!("{v} fell into a bottomless pit!"),
    ];
    templates
        .choose(rng)
        .map(|t| t(victim))
        .unwrap_or_else(|| format!("{victim} fell!"))
}

pub fn kill_message<R: Rng + ?Sized>(rng: &mut R, killer: &str, victim: &str) -> String {
    let templates: [fn(&str, &str) -> String; 5] = [
        |k, v| format!("{k} sent {v} out of this world!"),
        |k, v| format!("{k} threw a paintball right at {v}'s face!"),
        |k, v| format!("{k} just introduced {v} to the concept of gravity... the hard way."),
        |k, v| format!("{k} gave {v} a free skydiving lesson... without a parachute."),
        |k, v| format!("{k} just proved that {v} was never meant to be an astronaut."),
    ];
    templates
        .choose(rng)
        .map(|t| t(killer, victim))
        .unwrap_or_else(|| format!("{killer} eliminated {victim}!"))
}

/// Fall threshold for an actor kind
pub fn fall_threshold<H: Host>(ctx: &MatchContext<H>, kind: ActorKind) -> f32 {
    match kind {
        ActorKind::Human => ctx.config.respawn.player_fall_y,
        ActorKind::Bot => ctx.config.respawn.bot_fall_y,
    }
}

fn holding_position<H: Host>(ctx: &MatchContext<H>, kind: ActorKind) -> Vec3 {
    match kind {
        ActorKind::Human => ctx.config.respawn.player_holding,
        ActorKind::Bot => ctx.config.respawn.bot_holding,
    }
}

/// A point near the lobby spawn
pub fn lobby_point<H: Host>(ctx: &mut MatchContext<H>) -> Vec3 {
    let anchor = ctx.config.lobby_spawn;
    jitter_horizontal(&mut ctx.rng, anchor, LOBBY_JITTER)
}

/// Alive → Dead. Attributes the kill, parks the actor and schedules respawn.
///
/// Calling this again while the actor is dead or parked is a no-op.
pub fn handle_death<H: Host>(
    ctx: &mut MatchContext<H>,
    roster: &mut Roster,
    actor: ActorId,
) -> DeathOutcome {
    let Some(victim) = roster.get(actor) else {
        return DeathOutcome::Ignored;
    };
    let holding = holding_position(ctx, victim.kind);
    if victim.life == LifeState::Dead {
        return DeathOutcome::Ignored;
    }
    if ctx
        .host
        .actor_position(actor)
        .is_some_and(|p| p.distance(holding) < HOLDING_TOLERANCE)
    {
        return DeathOutcome::Ignored;
    }

    let victim_name = victim.name.clone();
    let victim_kind = victim.kind;
    let delay = ctx.config.respawn.delay_ms;

    let killer = roster
        .get_mut(actor)
        .and_then(|victim| victim.last_hit_by.take())
        .filter(|killer| *killer != actor);
    let killer_name = killer.and_then(|id| {
        let killer = roster.get_mut(id)?;
        killer.kills += 1;
        Some(killer.name.clone())
    });

    let (message, outcome) = match (killer, &killer_name) {
        (Some(by), Some(name)) => (
            kill_message(&mut ctx.rng, name, &victim_name),
            DeathOutcome::Killed { by },
        ),
        _ => (fall_message(&mut ctx.rng, &victim_name), DeathOutcome::Fell),
    };
    ctx.host.broadcast(&message);
    if victim_kind == ActorKind::Human {
        ctx.host.send_ui(
            actor,
            UiMessage::PlayerDeath {
                message: message.clone(),
                killer: killer_name.clone(),
                respawn_in_ms: delay,
            },
        );
    }

    ctx.host.teleport(actor, holding);
    ctx.host.set_physics_enabled(actor, false);

    let respawn = ctx.schedule_once(delay, TimerEvent::Respawn(actor));
    if let Some(victim) = roster.get_mut(actor) {
        victim.deaths += 1;
        victim.life = LifeState::Dead;
        victim.last_cell = None;
        ctx.scheduler.cancel_slot(&mut victim.settle_timer);
        ctx.scheduler.cancel_slot(&mut victim.respawn_timer);
        victim.respawn_timer = Some(respawn);
    }
    info!(actor_id = %actor, killer = ?killer_name, "Actor died");
    outcome
}

/// Dead → Respawning. Places the actor at its team spawn while a match is
/// active, otherwise in the lobby, and grants spawn invincibility.
pub fn respawn<H: Host>(
    ctx: &mut MatchContext<H>,
    roster: &mut Roster,
    teams: &TeamRegistry,
    buffs: &mut BuffSystem,
    actor: ActorId,
    match_active: bool,
) {
    let Some(player) = roster.get_mut(actor) else {
        return;
    };
    if player.life != LifeState::Dead {
        return;
    }
    player.respawn_timer = None;
    player.life = LifeState::Respawning;

    let spawn = if match_active {
        match teams
            .team_of(actor)
            .and_then(|team| teams.spawn_point(team, &mut ctx.rng))
        {
            Some(point) => point,
            None => {
                warn!(actor_id = %actor, "No team spawn configured, using lobby");
                lobby_point(ctx)
            }
        }
    } else {
        lobby_point(ctx)
    };

    ctx.host.set_physics_enabled(actor, true);
    ctx.host.teleport(actor, spawn);

    let invincibility = ctx.config.respawn.invincibility_ms;
    buffs.activate(ctx, roster, actor, BuffKind::Invincibility, invincibility);

    let settle = ctx.schedule_once(ctx.config.respawn.settle_ms, TimerEvent::RespawnSettled(actor));
    if let Some(player) = roster.get_mut(actor) {
        ctx.scheduler.cancel_slot(&mut player.settle_timer);
        player.settle_timer = Some(settle);
    }
    info!(actor_id = %actor, ?spawn, "Actor respawned");
}

/// Respawning → Alive
pub fn settle(roster: &mut Roster, actor: ActorId) -> bool {
    match roster.get_mut(actor) {
        Some(player) if player.life == LifeState::Respawning => {
            player.life = LifeState::Alive;
            player.settle_timer = None;
            true
        }
        _ => false,
    }
}

/// Cancel any pending respawn or settle timers for an actor
pub fn cancel_pending<H: Host>(ctx: &mut MatchContext<H>, roster: &mut Roster, actor: ActorId) {
    if let Some(player) = roster.get_mut(actor) {
        ctx.scheduler.cancel_slot(&mut player.respawn_timer);
        ctx.scheduler.cancel_slot(&mut player.settle_timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::player::{PlayerClass, PlayerState};
    use crate::host::HeadlessHost;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    fn setup() -> (MatchContext<HeadlessHost>, Roster, ActorId, ActorId) {
        let mut ctx = MatchContext::new(HeadlessHost::new(), GameConfig::default(), 9);
        let mut roster = Roster::new();
        let victim = Uuid::new_v4();
        let killer = Uuid::new_v4();
        for (id, name) in [(victim, "vic"), (killer, "kat")] {
            ctx.host.connect(id, name);
            ctx.host.place_actor(id, Vec3::new(0.0, 5.0, 0.0));
            roster.insert(PlayerState::new(
                id,
                name,
                ActorKind::Human,
                PlayerClass::Sniper,
                520.0,
            ));
        }
        (ctx, roster, victim, killer)
    }

    #[test]
    fn second_death_while_parked_is_a_noop() {
        let (mut ctx, mut roster, victim, _) = setup();
        assert_eq!(handle_death(&mut ctx, &mut roster, victim), DeathOutcome::Fell);
        assert_eq!(handle_death(&mut ctx, &mut roster, victim), DeathOutcome::Ignored);
        assert_eq!(roster.get(victim).map(|p| p.deaths), Some(1));
        assert_eq!(
            ctx.scheduler.count_live(|e| *e == TimerEvent::Respawn(victim)),
            1
        );
    }

    #[test]
    fn last_attacker_gets_the_kill_once() {
        let (mut ctx, mut roster, victim, killer) = setup();
        if let Some(p) = roster.get_mut(victim) {
            p.last_hit_by = Some(killer);
        }
        assert_eq!(
            handle_death(&mut ctx, &mut roster, victim),
            DeathOutcome::Killed { by: killer }
        );
        assert_eq!(roster.get(killer).map(|p| p.kills), Some(1));
        assert_eq!(roster.get(victim).and_then(|p| p.last_hit_by), None);
        let broadcast = ctx.host.broadcasts().last().cloned().unwrap_or_default();
        assert!(broadcast.contains("kat") && broadcast.contains("vic"));
        assert!(ctx
            .host
            .ui_for(victim)
            .iter()
            .any(|m| matches!(m, UiMessage::PlayerDeath { .. })));
    }

    #[test]
    fn respawn_grants_invincibility_then_settles() {
        let (mut ctx, mut roster, victim, _) = setup();
        let mut teams = TeamRegistry::new([("Solo".to_string(), Some(Vec3::new(5.0, 10.0, 5.0)))], 1.0);
        teams.assign(victim, 1);
        let mut buffs = BuffSystem::new();

        handle_death(&mut ctx, &mut roster, victim);
        ctx.advance_to(5_000);
        respawn(&mut ctx, &mut roster, &teams, &mut buffs, victim, true);

        let player = roster.get(victim).expect("victim");
        assert_eq!(player.life, LifeState::Respawning);
        assert!(player.invincible);
        let pos = ctx.host.actor_position(victim).unwrap_or(Vec3::ZERO);
        assert!((pos.x - 5.0).abs() <= 1.0 && (pos.z - 5.0).abs() <= 1.0);

        assert!(settle(&mut roster, victim));
        assert!(roster.get(victim).is_some_and(|p| p.is_alive()));
    }

    #[test]
    fn missing_spawn_falls_back_to_lobby() {
        let (mut ctx, mut roster, victim, _) = setup();
        let mut teams = TeamRegistry::new([("Nowhere".to_string(), None)], 1.0);
        teams.assign(victim, 1);
        let mut buffs = BuffSystem::new();
        handle_death(&mut ctx, &mut roster, victim);
        respawn(&mut ctx, &mut roster, &teams, &mut buffs, victim, true);
        let pos = ctx.host.actor_position(victim).unwrap_or(Vec3::ZERO);
        assert_eq!(pos.y, ctx.config.lobby_spawn.y);
    }

    #[test]
    fn messages_name_everyone_involved() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..10 {
            assert!(fall_message(&mut rng, "vic").contains("vic"));
            let msg = kill_message(&mut rng, "kat", "vic");
            assert!(msg.contains("kat") && msg.contains("vic"));
        }
    }
}
