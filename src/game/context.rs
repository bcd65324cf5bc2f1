//! Explicit match context handed to every component
//!
//! Holds the engine handle, balance constants, the timer queue, the rng and
//! the simulated clock. Components borrow it for the duration of a call and
//! never keep their own copies.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::GameConfig;
use crate::host::{EntityId, Host};

use super::buffs::BuffKind;
use super::player::ActorId;
use super::timer::{Scheduler, TimerHandle};

/// Everything the scheduler can fire
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    CountdownSecond,
    MatchSecond,
    StaminaRegen,
    /// A cooldown elapsed; the gate is the handle's liveness
    CooldownReady,
    ProjectileExpired(EntityId),
    BuffExpired { actor: ActorId, kind: BuffKind },
    Respawn(ActorId),
    RespawnSettled(ActorId),
    BotThink,
    PickupSpawn,
}

pub struct MatchContext<H> {
    pub host: H,
    pub config: GameConfig,
    pub scheduler: Scheduler<TimerEvent>,
    pub rng: ChaCha8Rng,
    now_ms: u64,
}

impl<H: Host> MatchContext<H> {
    pub fn new(host: H, config: GameConfig, seed: u64) -> Self {
        Self {
            host,
            config,
            scheduler: Scheduler::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            now_ms: 0,
        }
    }

    /// Simulated milliseconds since the controller was created
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Move the clock forward; it never runs backwards
    pub fn advance_to(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn schedule_once(&mut self, delay_ms: u64, event: TimerEvent) -> TimerHandle {
        self.scheduler.schedule_once(self.now_ms, delay_ms, event)
    }

    pub fn schedule_repeating(&mut self, interval_ms: u64, event: TimerEvent) -> TimerHandle {
        self.scheduler
            .schedule_repeating(self.now_ms, interval_ms, event)
    }

    pub fn cancel(&mut self, slot: &mut Option<TimerHandle>) {
        self.scheduler.cancel_slot(slot);
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.scheduler.is_live(handle)
    }

    pub fn remaining(&self, handle: TimerHandle) -> Option<u64> {
        self.scheduler.remaining(handle, self.now_ms)
    }

    /// Next timer due at the current time
    pub fn pop_due(&mut self) -> Option<(TimerHandle, TimerEvent)> {
        self.scheduler.pop_due(self.now_ms)
    }
}
