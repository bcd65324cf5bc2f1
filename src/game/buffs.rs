//! Timed buffs with refresh semantics
//!
//! Re-acquiring an active buff replaces its single timer with one covering the
//! new duration plus whatever was left of the old one. There is never more
//! than one live timer per (actor, kind).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::host::{EffectHandle, EffectKind, Host};

use super::context::{MatchContext, TimerEvent};
use super::player::{ActorId, Roster};
use super::timer::TimerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    Strength,
    Invincibility,
}

#[derive(Debug, Clone)]
struct ActiveBuff {
    handle: TimerHandle,
    /// Duration granted at the last activation
    remaining_ms: u64,
    activated_at: u64,
    effect: Option<EffectHandle>,
}

#[derive(Debug, Default)]
pub struct BuffSystem {
    active: HashMap<(ActorId, BuffKind), ActiveBuff>,
}

impl BuffSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant or extend a buff. Returns the duration of the live timer.
    pub fn activate<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        actor: ActorId,
        kind: BuffKind,
        duration_ms: u64,
    ) -> u64 {
        if !roster.contains(actor) {
            return 0;
        }
        let now = ctx.now();

        let (remaining, effect) = match self.active.remove(&(actor, kind)) {
            Some(previous) => {
                ctx.scheduler.cancel(previous.handle);
                let elapsed = now.saturating_sub(previous.activated_at);
                let carried = previous.remaining_ms.saturating_sub(elapsed);
                (duration_ms + carried, previous.effect)
            }
            None => {
                let effect = match kind {
                    BuffKind::Strength => {
                        Some(ctx.host.start_effect(actor, EffectKind::StrengthAura))
                    }
                    BuffKind::Invincibility => None,
                };
                (duration_ms, effect)
            }
        };

        let handle = ctx.schedule_once(remaining, TimerEvent::BuffExpired { actor, kind });
        self.active.insert(
            (actor, kind),
            ActiveBuff {
                handle,
                remaining_ms: remaining,
                activated_at: now,
                effect,
            },
        );
        set_flag(roster, actor, kind, true);
        debug!(actor_id = %actor, ?kind, remaining_ms = remaining, "Buff active");
        remaining
    }

    /// Expiry timer fired. Stale handles are ignored.
    pub fn expire<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        actor: ActorId,
        kind: BuffKind,
        handle: TimerHandle,
    ) {
        let key = (actor, kind);
        if self.active.get(&key).map(|b| b.handle) != Some(handle) {
            return;
        }
        if let Some(buff) = self.active.remove(&key) {
            if let Some(effect) = buff.effect {
                ctx.host.stop_effect(effect);
            }
        }
        set_flag(roster, actor, kind, false);
        debug!(actor_id = %actor, ?kind, "Buff expired");
    }

    /// Milliseconds left on a live buff
    pub fn remaining<H: Host>(
        &self,
        ctx: &MatchContext<H>,
        actor: ActorId,
        kind: BuffKind,
    ) -> Option<u64> {
        self.active
            .get(&(actor, kind))
            .and_then(|buff| ctx.remaining(buff.handle))
    }

    /// Drop every buff an actor holds
    pub fn clear_actor<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        actor: ActorId,
    ) {
        for kind in [BuffKind::Strength, BuffKind::Invincibility] {
            if let Some(buff) = self.active.remove(&(actor, kind)) {
                ctx.scheduler.cancel(buff.handle);
                if let Some(effect) = buff.effect {
                    ctx.host.stop_effect(effect);
                }
                set_flag(roster, actor, kind, false);
            }
        }
    }

    pub fn clear_all<H: Host>(&mut self, ctx: &mut MatchContext<H>, roster: &mut Roster) {
        let actors: Vec<ActorId> = self.active.keys().map(|(actor, _)| *actor).collect();
        for actor in actors {
            self.clear_actor(ctx, roster, actor);
        }
    }
}

fn set_flag(roster: &mut Roster, actor: ActorId, kind: BuffKind, on: bool) {
    if let Some(player) = roster.get_mut(actor) {
        match kind {
            BuffKind::Strength => player.strength_boost = on,
            BuffKind::Invincibility => player.invincible = on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::player::{ActorKind, PlayerClass, PlayerState};
    use crate::host::HeadlessHost;
    use uuid::Uuid;

    fn setup() -> (MatchContext<HeadlessHost>, Roster, ActorId) {
        let ctx = MatchContext::new(HeadlessHost::new(), GameConfig::default(), 1);
        let mut roster = Roster::new();
        let id = Uuid::new_v4();
        roster.insert(PlayerState::new(
            id,
            "ada",
            ActorKind::Human,
            PlayerClass::Sniper,
            520.0,
        ));
        (ctx, roster, id)
    }

    fn live_buff_timers(ctx: &MatchContext<HeadlessHost>, actor: ActorId, kind: BuffKind) -> usize {
        ctx.scheduler.count_live(|ev| {
            *ev == TimerEvent::BuffExpired { actor, kind }
        })
    }

    #[test]
    fn refresh_extends_instead_of_stacking() {
        let (mut ctx, mut roster, id) = setup();
        let mut buffs = BuffSystem::new();

        buffs.activate(&mut ctx, &mut roster, id, BuffKind::Strength, 10_000);
        ctx.advance_to(3_000);
        let remaining = buffs.activate(&mut ctx, &mut roster, id, BuffKind::Strength, 10_000);

        assert_eq!(remaining, 17_000);
        assert_eq!(live_buff_timers(&ctx, id, BuffKind::Strength), 1);
        assert_eq!(buffs.remaining(&ctx, id, BuffKind::Strength), Some(17_000));
        assert_eq!(ctx.host.active_effects(), 1);
    }

    #[test]
    fn expiry_clears_flag_and_effect() {
        let (mut ctx, mut roster, id) = setup();
        let mut buffs = BuffSystem::new();
        buffs.activate(&mut ctx, &mut roster, id, BuffKind::Strength, 1_000);
        assert!(roster.get(id).is_some_and(|p| p.strength_boost));

        ctx.advance_to(1_000);
        let (handle, event) = ctx.pop_due().expect("buff timer due");
        assert_eq!(event, TimerEvent::BuffExpired { actor: id, kind: BuffKind::Strength });
        buffs.expire(&mut ctx, &mut roster, id, BuffKind::Strength, handle);

        assert!(roster.get(id).is_some_and(|p| !p.strength_boost));
        assert_eq!(ctx.host.active_effects(), 0);
    }

    #[test]
    fn replaced_timer_never_expires_the_buff() {
        let (mut ctx, mut roster, id) = setup();
        let mut buffs = BuffSystem::new();
        buffs.activate(&mut ctx, &mut roster, id, BuffKind::Invincibility, 1_000);
        ctx.advance_to(500);
        buffs.activate(&mut ctx, &mut roster, id, BuffKind::Invincibility, 1_000);

        ctx.advance_to(1_200);
        assert!(ctx.pop_due().is_none());
        assert!(roster.get(id).is_some_and(|p| p.invincible));
    }

    #[test]
    fn late_refresh_carries_nothing() {
        let (mut ctx, mut roster, id) = setup();
        let mut buffs = BuffSystem::new();
        buffs.activate(&mut ctx, &mut roster, id, BuffKind::Invincibility, 1_000);
        ctx.advance_to(900);
        let remaining = buffs.activate(&mut ctx, &mut roster, id, BuffKind::Invincibility, 1_000);
        assert_eq!(remaining, 1_100);
    }
}
