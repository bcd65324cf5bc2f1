//! Boost pickups scattered over the map while a match runs

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::PickupConfig;
use crate::host::{EntityId, Host};

use super::buffs::{BuffKind, BuffSystem};
use super::context::{MatchContext, TimerEvent};
use super::player::{ActorId, Roster};
use super::timer::TimerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    Energy,
    Strength,
    Invincibility,
}

impl PickupKind {
    /// Pick a kind from a uniform roll in [0, 1) by cumulative probability
    pub fn roll(roll: f32, config: &PickupConfig) -> Option<Self> {
        let table = [
            (PickupKind::Energy, config.energy_probability),
            (PickupKind::Strength, config.strength_probability),
            (PickupKind::Invincibility, config.invincibility_probability),
        ];
        let mut cumulative = 0.0;
        for (kind, probability) in table {
            cumulative += probability;
            if roll < cumulative {
                return Some(kind);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct LivePickup {
    kind: PickupKind,
    location: usize,
}

#[derive(Debug, Default)]
pub struct PickupSpawner {
    live: HashMap<EntityId, LivePickup>,
    interval: Option<TimerHandle>,
}

impl PickupSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pickup(&self, id: EntityId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Spawn one pickup now and one every interval after
    pub fn start<H: Host>(&mut self, ctx: &mut MatchContext<H>) {
        self.stop(ctx);
        self.spawn_random(ctx);
        let interval = ctx.config.pickups.interval_ms;
        self.interval = Some(ctx.schedule_repeating(interval, TimerEvent::PickupSpawn));
    }

    /// Cancel the spawn interval and remove every pickup
    pub fn stop<H: Host>(&mut self, ctx: &mut MatchContext<H>) {
        ctx.cancel(&mut self.interval);
        for (id, _) in self.live.drain() {
            ctx.host.despawn_entity(id);
        }
    }

    /// Try one spawn at a random location. Occupied locations are skipped.
    pub fn spawn_random<H: Host>(&mut self, ctx: &mut MatchContext<H>) -> Option<EntityId> {
        let count = ctx.config.pickups.locations.len();
        if count == 0 {
            return None;
        }
        let location = ctx.rng.gen_range(0..count);
        if self.live.values().any(|p| p.location == location) {
            trace!(location, "Pickup location occupied");
            return None;
        }
        let roll: f32 = ctx.rng.gen();
        let kind = PickupKind::roll(roll, &ctx.config.pickups)?;
        let position = ctx.config.pickups.locations[location];
        let id = ctx.host.spawn_pickup(kind, position);
        self.live.insert(id, LivePickup { kind, location });
        debug!(?kind, ?position, "Pickup spawned");
        Some(id)
    }

    /// A human touched a pickup. Applies its effect and removes it.
    pub fn consume<H: Host>(
        &mut self,
        ctx: &mut MatchContext<H>,
        roster: &mut Roster,
        buffs: &mut BuffSystem,
        pickup: EntityId,
        actor: ActorId,
    ) -> Option<PickupKind> {
        let player = roster.get(actor)?;
        if !player.is_human() || !player.can_act() {
            return None;
        }
        let LivePickup { kind, .. } = self.live.remove(&pickup)?;
        ctx.host.despawn_entity(pickup);

        let message = match kind {
            PickupKind::Energy => {
                let credit = ctx.config.buffs.energy_credit;
                if let Some(player) = roster.get_mut(actor) {
                    player.credit_stamina(credit);
                }
                format!("You earned {credit} stamina from an energy drink!")
            }
            PickupKind::Strength => {
                let duration = ctx.config.buffs.strength_duration_ms;
                buffs.activate(ctx, roster, actor, BuffKind::Strength, duration);
                format!(
                    "You're feeling stronger! Increased knockback on enemy hits for {} seconds!",
                    duration / 1000
                )
            }
            PickupKind::Invincibility => {
                let duration = ctx.config.buffs.invincibility_duration_ms;
                buffs.activate(ctx, roster, actor, BuffKind::Invincibility, duration);
                format!("You're invincible for {} seconds!", duration / 1000)
            }
        };
        ctx.host.send_chat(actor, &message);
        debug!(actor_id = %actor, ?kind, "Pickup consumed");
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::player::{ActorKind, PlayerClass, PlayerState};
    use crate::host::HeadlessHost;
    use uuid::Uuid;

    #[test]
    fn roll_uses_cumulative_probability() {
        let cfg = PickupConfig::default();
        assert_eq!(PickupKind::roll(0.0, &cfg), Some(PickupKind::Energy));
        assert_eq!(PickupKind::roll(0.69, &cfg), Some(PickupKind::Energy));
        assert_eq!(PickupKind::roll(0.75, &cfg), Some(PickupKind::Strength));
        assert_eq!(PickupKind::roll(0.95, &cfg), Some(PickupKind::Invincibility));
    }

    #[test]
    fn zero_probability_kind_never_wins() {
        let mut cfg = PickupConfig::default();
        cfg.energy_probability = 0.0;
        cfg.strength_probability = 1.0;
        cfg.invincibility_probability = 0.0;
        assert_eq!(PickupKind::roll(0.0, &cfg), Some(PickupKind::Strength));
        assert_eq!(PickupKind::roll(0.999, &cfg), Some(PickupKind::Strength));
    }

    #[test]
    fn each_location_holds_one_pickup() {
        let mut cfg = GameConfig::default();
        cfg.pickups.locations.truncate(1);
        let mut ctx = MatchContext::new(HeadlessHost::new(), cfg, 2);
        let mut spawner = PickupSpawner::new();
        assert!(spawner.spawn_random(&mut ctx).is_some());
        assert!(spawner.spawn_random(&mut ctx).is_none());
        assert_eq!(spawner.live_count(), 1);
        spawner.stop(&mut ctx);
        assert_eq!(spawner.live_count(), 0);
        assert_eq!(ctx.host.live_pickups(), 0);
    }

    #[test]
    fn energy_pickup_credits_up_to_max() {
        let mut cfg = GameConfig::default();
        cfg.pickups.energy_probability = 1.0;
        let mut ctx = MatchContext::new(HeadlessHost::new(), cfg, 2);
        let mut roster = Roster::new();
        let mut buffs = BuffSystem::new();
        let id = Uuid::new_v4();
        let mut player = PlayerState::new(id, "ada", ActorKind::Human, PlayerClass::Sniper, 520.0);
        player.stamina = 400.0;
        roster.insert(player);

        let mut spawner = PickupSpawner::new();
        let pickup = spawner.spawn_random(&mut ctx).expect("spawned");
        let kind = spawner.consume(&mut ctx, &mut roster, &mut buffs, pickup, id);
        assert_eq!(kind, Some(PickupKind::Energy));
        assert_eq!(roster.get(id).map(|p| p.stamina), Some(520.0));
        assert!(!spawner.is_pickup(pickup));
    }
}
