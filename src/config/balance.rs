//! Balance constants
//!
//! Every numeric knob of the match lives here. Defaults describe the shipped
//! arena; a JSON file can override any subset of fields.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::game::combat::{FanSpread, WeaponKind, WeaponStats};
use crate::game::player::PlayerClass;

use super::ConfigError;

/// One value per player class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerClass<T> {
    pub runner: T,
    pub sniper: T,
    pub grenader: T,
    pub slingshot: T,
}

impl<T: Copy> PerClass<T> {
    pub fn get(&self, class: PlayerClass) -> T {
        match class {
            PlayerClass::Runner => self.runner,
            PlayerClass::Sniper => self.sniper,
            PlayerClass::Grenader => self.grenader,
            PlayerClass::Slingshot => self.slingshot,
        }
    }
}

/// Per-class maximum stamina
pub type ClassStamina = PerClass<f32>;

fn default_max_stamina() -> ClassStamina {
    PerClass {
        runner: 200.0,
        sniper: 520.0,
        grenader: 460.0,
        slingshot: 440.0,
    }
}

/// Weapon stats per weapon kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponTable {
    pub blob: WeaponStats,
    pub slingshot: WeaponStats,
    pub sniper: WeaponStats,
}

impl WeaponTable {
    pub fn get(&self, kind: WeaponKind) -> &WeaponStats {
        match kind {
            WeaponKind::Blob => &self.blob,
            WeaponKind::Slingshot => &self.slingshot,
            WeaponKind::Sniper => &self.sniper,
        }
    }
}

impl Default for WeaponTable {
    fn default() -> Self {
        Self {
            blob: WeaponStats {
                speed: 30.0,
                knockback: 12.0,
                energy_cost: 28.0,
                cooldown_ms: 500,
                paint_cap: 12,
                despawn_on_hit: false,
                fan: None,
            },
            slingshot: WeaponStats {
                speed: 38.0,
                knockback: 9.0,
                energy_cost: 30.0,
                cooldown_ms: 500,
                paint_cap: 4,
                despawn_on_hit: true,
                fan: Some(FanSpread {
                    offset_degrees: 15.0,
                    speed_delta: -2.0,
                }),
            },
            sniper: WeaponStats {
                speed: 60.0,
                knockback: 9.0,
                energy_cost: 20.0,
                cooldown_ms: 300,
                paint_cap: 2,
                despawn_on_hit: false,
                fan: None,
            },
        }
    }
}

/// Melee punch tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeStats {
    pub cooldown_ms: u64,
    pub reach: f32,
    /// Forward impulse applied to the attacker on every swing
    pub self_force: f32,
    pub self_lift: f32,
    pub hit_force: f32,
    pub hit_vertical_force: f32,
    /// Minimum vertical direction component used for the lift
    pub min_lift: f32,
    pub energy_cost: f32,
    /// Scales the attacker's own forward lunge
    pub dash_multiplier: PerClass<f32>,
}

impl Default for MeleeStats {
    fn default() -> Self {
        Self {
            cooldown_ms: 500,
            reach: 3.5,
            self_force: 10.0,
            self_lift: 0.1,
            hit_force: 12.0,
            hit_vertical_force: 10.0,
            min_lift: 0.7,
            energy_cost: 20.0,
            dash_multiplier: PerClass {
                runner: 1.4,
                sniper: 1.0,
                grenader: 1.1,
                slingshot: 1.0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffConfig {
    pub strength_duration_ms: u64,
    pub strength_multiplier: f32,
    pub invincibility_duration_ms: u64,
    /// Instant stamina credit from an energy pickup
    pub energy_credit: f32,
}

impl Default for BuffConfig {
    fn default() -> Self {
        Self {
            strength_duration_ms: 10_000,
            strength_multiplier: 5.0,
            invincibility_duration_ms: 10_000,
            energy_credit: 220.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RespawnConfig {
    pub delay_ms: u64,
    pub invincibility_ms: u64,
    /// Delay after respawn before the respawning flag clears
    pub settle_ms: u64,
    pub player_fall_y: f32,
    pub bot_fall_y: f32,
    pub player_holding: Vec3,
    pub bot_holding: Vec3,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            delay_ms: 5_000,
            invincibility_ms: 6_000,
            settle_ms: 4_000,
            player_fall_y: -8.0,
            bot_fall_y: -10.0,
            player_holding: Vec3::new(0.0, 45.0, 0.0),
            bot_holding: Vec3::new(0.0, 100.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    pub name: String,
    pub spawn: Option<Vec3>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub per_team: usize,
    pub think_interval_ms: u64,
    pub speed: f32,
    /// Maximum per-axis error added to a normalized aim direction
    pub aim_jitter: Vec3,
    pub muzzle_height: f32,
    /// Fallback destinations per team, indexed by team id - 1
    pub search_points: Vec<Vec<Vec3>>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            per_team: 0,
            think_interval_ms: 2_000,
            speed: 4.5,
            aim_jitter: Vec3::new(0.1, 0.05, 0.1),
            muzzle_height: 1.2,
            search_points: vec![
                vec![
                    Vec3::new(-17.0, 6.0, 20.0),
                    Vec3::new(17.0, 6.0, 20.0),
                    Vec3::new(-17.0, 6.0, -20.0),
                ],
                vec![
                    Vec3::new(17.0, 6.0, 20.0),
                    Vec3::new(17.0, 6.0, -20.0),
                    Vec3::new(-17.0, 6.0, 20.0),
                ],
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupConfig {
    pub interval_ms: u64,
    pub energy_probability: f32,
    pub strength_probability: f32,
    pub invincibility_probability: f32,
    pub locations: Vec<Vec3>,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            energy_probability: 0.70,
            strength_probability: 0.10,
            invincibility_probability: 0.20,
            locations: vec![
                Vec3::new(3.5, 5.5, 0.5),
                Vec3::new(-4.5, 5.5, 1.5),
                Vec3::new(10.0, 5.5, -10.0),
                Vec3::new(-10.0, 5.5, 10.0),
                Vec3::new(0.0, 5.5, 10.0),
                Vec3::new(0.0, 5.5, -10.0),
                Vec3::new(34.0, 10.0, -3.0),
                Vec3::new(6.0, 11.0, 35.0),
            ],
        }
    }
}

/// All balance constants for one server process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub match_duration_secs: u32,
    pub countdown_secs: u32,
    pub min_players: usize,
    /// HUD snapshot cadence in simulation ticks
    pub hud_interval_ticks: u32,
    pub stamina_regen_interval_ms: u64,
    pub stamina_regen_per_tick: f32,
    pub max_stamina: ClassStamina,
    pub weapons: WeaponTable,
    pub projectile_lifetime_ms: u64,
    /// Vertical direction floor for projectile knockback
    pub projectile_min_lift: f32,
    pub projectile_lift_scale: f32,
    /// Actors held above this height are out of play and cannot be hit
    pub out_of_play_height: f32,
    /// Height above the actor's feet where projectiles leave the hand
    pub muzzle_height: f32,
    pub melee: MeleeStats,
    pub sprint_cost: f32,
    pub buffs: BuffConfig,
    pub respawn: RespawnConfig,
    pub lobby_spawn: Vec3,
    pub spawn_jitter: f32,
    pub teams: Vec<TeamConfig>,
    pub friendly_fire: bool,
    pub bots: BotConfig,
    pub pickups: PickupConfig,
    /// Impact expansion order, closest first, straight neighbours before diagonals
    pub paint_pattern: Vec<[i32; 3]>,
    /// Cells painted under a runner, relative to the cell beneath them
    pub runner_footprint: Vec<[i32; 3]>,
    /// Cells reset per tick while clearing the board
    pub clear_batch_cells: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            match_duration_secs: 270,
            countdown_secs: 20,
            min_players: 4,
            hud_interval_ticks: 7,
            stamina_regen_interval_ms: 225,
            stamina_regen_per_tick: 8.0,
            max_stamina: default_max_stamina(),
            weapons: WeaponTable::default(),
            projectile_lifetime_ms: 2_000,
            projectile_min_lift: 0.5,
            projectile_lift_scale: 0.9,
            out_of_play_height: 40.0,
            muzzle_height: 1.4,
            melee: MeleeStats::default(),
            sprint_cost: 0.85,
            buffs: BuffConfig::default(),
            respawn: RespawnConfig::default(),
            lobby_spawn: Vec3::new(0.0, 65.0, 0.0),
            spawn_jitter: 1.0,
            teams: vec![
                TeamConfig {
                    name: "Blue Bandits".to_string(),
                    spawn: Some(Vec3::new(-10.0, 15.0, -10.0)),
                },
                TeamConfig {
                    name: "Red Raiders".to_string(),
                    spawn: Some(Vec3::new(10.0, 15.0, 10.0)),
                },
            ],
            friendly_fire: false,
            bots: BotConfig::default(),
            pickups: PickupConfig::default(),
            paint_pattern: vec![
                [0, 0, 0],
                [0, 1, 0],
                [0, -1, 0],
                [1, 0, 0],
                [-1, 0, 0],
                [0, 0, 1],
                [0, 0, -1],
                [1, 0, 1],
                [-1, 0, 1],
                [1, 0, -1],
                [-1, 0, -1],
                [-1, -1, -1],
                [1, -1, -1],
                [0, -1, 1],
                [1, 1, 1],
                [-1, 1, 1],
                [1, 1, -1],
                [-1, 1, -1],
                [0, -2, 0],
            ],
            runner_footprint: vec![[0, 0, 0], [1, 0, 0], [-1, 0, 0], [0, 0, 1], [0, 0, -1]],
            clear_batch_cells: 64,
        }
    }
}

impl GameConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::BalanceRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn max_stamina(&self, class: PlayerClass) -> f32 {
        self.max_stamina.get(class)
    }

    pub fn weapon(&self, kind: WeaponKind) -> &WeaponStats {
        self.weapons.get(kind)
    }

    pub fn search_points(&self, team_index: usize) -> &[Vec3] {
        self.bots
            .search_points
            .get(team_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = GameConfig::from_json_str(
            r#"{ "match_duration_secs": 60, "weapons": { "sniper": { "paint_cap": 3 } } }"#,
        )
        .expect("valid balance json");
        assert_eq!(cfg.match_duration_secs, 60);
        assert_eq!(cfg.countdown_secs, 20);
        assert_eq!(cfg.weapon(WeaponKind::Sniper).paint_cap, 3);
        assert_eq!(cfg.weapon(WeaponKind::Blob).paint_cap, 12);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            GameConfig::from_json_str("{ not json"),
            Err(ConfigError::BalanceParse(_))
        ));
    }

    #[test]
    fn large_area_weapon_paints_more_than_precise_one() {
        let cfg = GameConfig::default();
        assert!(cfg.weapon(WeaponKind::Blob).paint_cap > cfg.weapon(WeaponKind::Sniper).paint_cap);
    }
}
