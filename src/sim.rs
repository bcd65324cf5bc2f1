//! Headless server loop: a `MatchController` over the in-memory host,
//! optionally populated by synthetic players

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use uuid::Uuid;

use crate::app::StatusSnapshot;
use crate::config::GameConfig;
use crate::game::{ActorId, MatchController, PlayerClass};
use crate::host::{HeadlessHost, Host};
use crate::protocol::{ActionInput, HostEvent, UiCommand};
use crate::util::time::{tick_delta, SIMULATION_TPS};

/// Half width of the generated arena floor, in cells
pub const ARENA_HALF_EXTENT: i32 = 30;

/// Chance per tick that a synthetic player picks a new destination
const WANDER_CHANCE: f64 = 0.02;
/// Chance per tick that a synthetic player pulls the trigger
const FIRE_CHANCE: f64 = 0.1;

pub struct Simulation {
    controller: MatchController<HeadlessHost>,
    crew: Vec<ActorId>,
    rng: ChaCha8Rng,
    ticks: u64,
}

impl Simulation {
    pub fn new(config: GameConfig, seed: u64, synthetic_players: usize) -> Self {
        let host = HeadlessHost::arena(ARENA_HALF_EXTENT, 0);
        let mut sim = Self {
            controller: MatchController::new(host, config, seed),
            crew: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed ^ 0x5eed),
            ticks: 0,
        };
        for n in 1..=synthetic_players {
            sim.add_player(&format!("Player_{n}"));
        }
        sim
    }

    pub fn controller(&self) -> &MatchController<HeadlessHost> {
        &self.controller
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn add_player(&mut self, name: &str) {
        let id = Uuid::from_u128(self.rng.gen());
        self.controller.host_mut().connect(id, name);
        self.controller.handle_event(HostEvent::PlayerJoined {
            player_id: id,
            name: name.to_string(),
        });
        let class = PlayerClass::ALL[self.rng.gen_range(0..PlayerClass::ALL.len())];
        self.controller.handle_event(HostEvent::Ui {
            player_id: id,
            command: UiCommand::SelectClass { class },
        });
        self.crew.push(id);
    }

    /// One fixed-rate tick at `now_ms`
    pub fn step(&mut self, now_ms: u64) {
        self.ticks += 1;
        self.drive_crew();

        let events = self.controller.host_mut().step(tick_delta());
        for event in events {
            self.controller.handle_event(event);
        }
        self.controller.tick(now_ms);

        // UI traffic has no client in headless mode
        let delivered = self.controller.host_mut().drain_ui().len();
        if delivered > 0 && self.ticks % u64::from(SIMULATION_TPS) == 0 {
            debug!(delivered, "UI messages flushed");
        }
    }

    fn drive_crew(&mut self) {
        let extent = ARENA_HALF_EXTENT as f32 - 2.0;
        for id in self.crew.clone() {
            if self.rng.gen_bool(WANDER_CHANCE) {
                let target = Vec3::new(
                    self.rng.gen_range(-extent..=extent),
                    1.0,
                    self.rng.gen_range(-extent..=extent),
                );
                self.controller.host_mut().request_path(id, target, 5.0);
            }
            if self.rng.gen_bool(FIRE_CHANCE) {
                let input = ActionInput {
                    fire: true,
                    yaw: self.rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI),
                    pitch: self.rng.gen_range(-0.6..0.1),
                    ..Default::default()
                };
                self.controller.handle_event(HostEvent::Input {
                    player_id: id,
                    input,
                });
            }
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            tick: self.ticks,
            status: self.controller.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchPhase;
    use crate::util::time::TICK_DURATION_MILLIS;

    #[test]
    fn synthetic_players_reach_an_active_match() {
        let mut config = GameConfig::default();
        config.countdown_secs = 1;
        let mut sim = Simulation::new(config, 3, 4);
        for n in 1..=60 {
            sim.step(n * TICK_DURATION_MILLIS);
        }
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.status.players, 4);
        assert_eq!(snapshot.status.phase, MatchPhase::Active);
        assert_eq!(sim.ticks(), 60);
    }
}
