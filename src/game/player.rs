//! Player classes and per-actor mutable state

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::combat::WeaponKind;
use super::math::CellPos;
use super::timer::TimerHandle;

/// Humans and bots share one id space
pub type ActorId = Uuid;

/// Player classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerClass {
    /// Paints by running over cells, melee only
    Runner,
    /// Fast precise shots, small paint area
    #[default]
    Sniper,
    /// Heavy blobs, large paint area
    Grenader,
    /// Three-shot fan
    Slingshot,
}

impl PlayerClass {
    pub const ALL: [PlayerClass; 4] = [
        PlayerClass::Runner,
        PlayerClass::Sniper,
        PlayerClass::Grenader,
        PlayerClass::Slingshot,
    ];

    /// Ranged weapon available to this class
    pub fn weapon(self) -> Option<WeaponKind> {
        match self {
            PlayerClass::Runner => None,
            PlayerClass::Sniper => Some(WeaponKind::Sniper),
            PlayerClass::Grenader => Some(WeaponKind::Blob),
            PlayerClass::Slingshot => Some(WeaponKind::Slingshot),
        }
    }

    /// Class bound to a number key
    pub fn from_slot(slot: u8) -> Option<Self> {
        match slot {
            1 => Some(PlayerClass::Runner),
            2 => Some(PlayerClass::Grenader),
            3 => Some(PlayerClass::Sniper),
            4 => Some(PlayerClass::Slingshot),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlayerClass::Runner => "Runner",
            PlayerClass::Sniper => "Sniper",
            PlayerClass::Grenader => "Grenader",
            PlayerClass::Slingshot => "Slingshot",
        }
    }
}

impl fmt::Display for PlayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Human,
    Bot,
}

/// Alive → Dead → Respawning → Alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    Alive,
    /// Parked at the holding position waiting for the respawn timer
    Dead,
    /// Back in play, still settling
    Respawning,
}

/// Authoritative per-actor record, owned by the match for the actor's lifetime
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: ActorId,
    pub name: String,
    pub kind: ActorKind,
    pub class: PlayerClass,
    pub stamina: f32,
    pub max_stamina: f32,
    pub kills: u32,
    pub deaths: u32,
    pub points: u32,
    /// Attacker credited if this actor dies before the tag is consumed
    pub last_hit_by: Option<ActorId>,
    pub invincible: bool,
    pub strength_boost: bool,
    pub life: LifeState,
    pub respawn_timer: Option<TimerHandle>,
    pub settle_timer: Option<TimerHandle>,
    /// Cell beneath the actor at the last movement check
    pub last_cell: Option<CellPos>,
}

impl PlayerState {
    pub fn new(
        id: ActorId,
        name: impl Into<String>,
        kind: ActorKind,
        class: PlayerClass,
        max_stamina: f32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            class,
            stamina: max_stamina,
            max_stamina,
            kills: 0,
            deaths: 0,
            points: 0,
            last_hit_by: None,
            invincible: false,
            strength_boost: false,
            life: LifeState::Alive,
            respawn_timer: None,
            settle_timer: None,
            last_cell: None,
        }
    }

    pub fn is_human(&self) -> bool {
        self.kind == ActorKind::Human
    }

    pub fn is_bot(&self) -> bool {
        self.kind == ActorKind::Bot
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    /// Whether the actor may fire, swing or sprint
    pub fn can_act(&self) -> bool {
        self.life != LifeState::Dead
    }

    /// Change class; current stamina is clamped to the new maximum
    pub fn set_class(&mut self, class: PlayerClass, max_stamina: f32) {
        self.class = class;
        self.max_stamina = max_stamina;
        self.stamina = self.stamina.min(max_stamina);
    }

    /// Start-of-match reset. Identity, name and class survive.
    pub fn reset_for_match(&mut self) {
        self.stamina = self.max_stamina;
        self.kills = 0;
        self.deaths = 0;
        self.points = 0;
        self.last_hit_by = None;
    }

    /// Add stamina up to the class maximum. Returns the amount actually added.
    pub fn credit_stamina(&mut self, amount: f32) -> f32 {
        let before = self.stamina;
        self.stamina = (self.stamina + amount.max(0.0)).min(self.max_stamina);
        self.stamina - before
    }

    /// Debit `cost` only if fully affordable
    pub fn try_spend(&mut self, cost: f32) -> bool {
        if self.stamina < cost {
            return false;
        }
        self.stamina -= cost;
        true
    }

    /// Debit `cost`, flooring at zero
    pub fn spend_saturating(&mut self, cost: f32) {
        self.stamina = (self.stamina - cost).max(0.0);
    }

    pub fn award_points(&mut self, points: u32) {
        self.points += points;
    }
}

/// Arena of every actor in the match, keyed by id
#[derive(Debug, Default)]
pub struct Roster {
    players: HashMap<ActorId, PlayerState>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: PlayerState) {
        self.players.insert(player.id, player);
    }

    pub fn remove(&mut self, id: ActorId) -> Option<PlayerState> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut PlayerState> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut PlayerState> {
        self.players.values_mut()
    }

    /// Ids in a stable order
    pub fn ids(&self) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = self.players.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn human_ids(&self) -> Vec<ActorId> {
        self.ids_where(PlayerState::is_human)
    }

    pub fn human_count(&self) -> usize {
        self.players.values().filter(|p| p.is_human()).count()
    }

    fn ids_where(&self, pred: impl Fn(&PlayerState) -> bool) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = self
            .players
            .values()
            .filter(|p| pred(p))
            .map(|p| p.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn name_of(&self, id: ActorId) -> Option<&str> {
        self.players.get(&id).map(|p| p.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniper() -> PlayerState {
        PlayerState::new(Uuid::new_v4(), "ada", ActorKind::Human, PlayerClass::Sniper, 520.0)
    }

    #[test]
    fn stamina_credit_is_capped_at_max() {
        let mut p = sniper();
        p.stamina = 400.0;
        assert_eq!(p.credit_stamina(220.0), 120.0);
        assert_eq!(p.stamina, 520.0);
    }

    #[test]
    fn spend_requires_full_cost() {
        let mut p = sniper();
        p.stamina = 10.0;
        assert!(!p.try_spend(20.0));
        assert_eq!(p.stamina, 10.0);
        p.spend_saturating(20.0);
        assert_eq!(p.stamina, 0.0);
    }

    #[test]
    fn match_reset_keeps_identity_and_class() {
        let mut p = sniper();
        p.set_class(PlayerClass::Grenader, 460.0);
        p.kills = 3;
        p.deaths = 2;
        p.points = 40;
        p.stamina = 1.0;
        p.reset_for_match();
        assert_eq!(p.class, PlayerClass::Grenader);
        assert_eq!(p.name, "ada");
        assert_eq!((p.kills, p.deaths, p.points), (0, 0, 0));
        assert_eq!(p.stamina, 460.0);
    }

    #[test]
    fn class_change_clamps_stamina() {
        let mut p = sniper();
        p.set_class(PlayerClass::Runner, 200.0);
        assert_eq!(p.stamina, 200.0);
        assert_eq!(p.class.weapon(), None);
    }

    #[test]
    fn number_keys_map_to_classes() {
        assert_eq!(PlayerClass::from_slot(1), Some(PlayerClass::Runner));
        assert_eq!(PlayerClass::from_slot(2), Some(PlayerClass::Grenader));
        assert_eq!(PlayerClass::from_slot(4), Some(PlayerClass::Slingshot));
        assert_eq!(PlayerClass::from_slot(9), None);
    }
}
