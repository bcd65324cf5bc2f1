//! Engine boundary
//!
//! The simulation never touches rendering, physics internals or transport
//! directly. Everything it needs from the engine goes through [`Host`], and
//! everything the engine reports comes back as a [`crate::protocol::HostEvent`].

pub mod headless;

pub use headless::HeadlessHost;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::game::combat::WeaponKind;
use crate::game::math::CellPos;
use crate::game::pickups::PickupKind;
use crate::game::player::ActorId;
use crate::game::territory::CellOwner;
use crate::protocol::UiMessage;

/// Engine handle for a non-player entity (projectile or pickup)
pub type EntityId = u64;

/// Engine handle for a running visual effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    StrengthAura,
}

/// Parameters for one projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    pub owner: ActorId,
    pub weapon: WeaponKind,
    pub origin: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Actor struck, if the ray stopped on one
    pub actor: Option<ActorId>,
    pub point: Vec3,
    pub distance: f32,
}

/// World-cell read/write primitive
pub trait CellWorld {
    /// True if the cell holds a surface that can be painted
    fn is_paintable(&self, cell: CellPos) -> bool;

    /// Write a cell's visual state
    fn set_cell(&mut self, cell: CellPos, owner: CellOwner);
}

/// Everything the simulation consumes from the engine
pub trait Host: CellWorld {
    fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> EntityId;
    fn projectile_velocity(&self, id: EntityId) -> Option<Vec3>;
    fn spawn_pickup(&mut self, kind: PickupKind, position: Vec3) -> EntityId;
    /// Despawn a projectile or pickup; unknown ids are ignored
    fn despawn_entity(&mut self, id: EntityId);

    fn spawn_bot(&mut self, actor: ActorId, name: &str, position: Vec3);
    fn despawn_bot(&mut self, actor: ActorId);

    fn actor_position(&self, actor: ActorId) -> Option<Vec3>;
    /// Unit horizontal facing of the actor
    fn actor_facing(&self, actor: ActorId) -> Option<Vec3>;
    fn set_actor_facing(&mut self, actor: ActorId, facing: Vec3);
    fn teleport(&mut self, actor: ActorId, position: Vec3);
    fn apply_impulse(&mut self, actor: ActorId, impulse: Vec3);
    fn set_physics_enabled(&mut self, actor: ActorId, enabled: bool);

    /// Ray query that ignores `exclude`
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: ActorId,
    ) -> Option<RaycastHit>;

    /// Start moving `actor` toward `target`. Returns false when no route exists;
    /// otherwise a `PathFinished` event follows later.
    fn request_path(&mut self, actor: ActorId, target: Vec3, speed: f32) -> bool;

    fn broadcast(&mut self, message: &str);
    fn send_chat(&mut self, player: ActorId, message: &str);
    fn send_ui(&mut self, player: ActorId, message: UiMessage);

    fn start_effect(&mut self, actor: ActorId, kind: EffectKind) -> EffectHandle;
    fn stop_effect(&mut self, handle: EffectHandle);
}
