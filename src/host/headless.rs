//! In-memory host used by the standalone server loop and by tests
//!
//! Integrates actor and projectile motion with simple drag and gravity,
//! resolves radius contacts and reports them as [`HostEvent`]s. Terrain is a
//! set of solid, paintable cells.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use tracing::trace;

use crate::game::combat::WeaponKind;
use crate::game::math::CellPos;
use crate::game::pickups::PickupKind;
use crate::game::player::ActorId;
use crate::game::territory::CellOwner;
use crate::protocol::{HostEvent, PathOutcome, UiMessage};

use super::{CellWorld, EffectHandle, EffectKind, EntityId, Host, ProjectileSpawn, RaycastHit};

/// Downward acceleration in units per second squared
const GRAVITY: f32 = 9.81;
/// Horizontal velocity retained per step for actors
const ACTOR_DRAG: f32 = 0.9;
/// Actor capsule radius
const ACTOR_RADIUS: f32 = 0.6;
/// Actor capsule height above the feet
const ACTOR_HEIGHT: f32 = 1.8;
/// Touch radius around a pickup
const PICKUP_RADIUS: f32 = 0.75;
/// Horizontal distance at which a path counts as arrived
const ARRIVAL_DISTANCE: f32 = 0.5;
/// Blocked path targets match within this distance
const BLOCKED_TOLERANCE: f32 = 0.5;

#[derive(Debug, Clone)]
struct ActorBody {
    name: String,
    position: Vec3,
    velocity: Vec3,
    facing: Vec3,
    physics: bool,
    is_bot: bool,
}

impl ActorBody {
    fn new(name: &str, position: Vec3, is_bot: bool) -> Self {
        Self {
            name: name.to_string(),
            position,
            velocity: Vec3::ZERO,
            facing: Vec3::NEG_Z,
            physics: true,
            is_bot,
        }
    }

    fn contains(&self, point: Vec3, margin: f32) -> bool {
        let horizontal = Vec3::new(point.x - self.position.x, 0.0, point.z - self.position.z);
        horizontal.length() <= ACTOR_RADIUS + margin
            && point.y >= self.position.y - margin
            && point.y <= self.position.y + ACTOR_HEIGHT + margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EntityKind {
    Projectile { owner: ActorId, weapon: WeaponKind },
    Pickup(PickupKind),
}

#[derive(Debug, Clone)]
struct Entity {
    kind: EntityKind,
    position: Vec3,
    velocity: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct PathRequest {
    target: Vec3,
    speed: f32,
}

#[derive(Debug, Default)]
pub struct HeadlessHost {
    actors: HashMap<ActorId, ActorBody>,
    entities: HashMap<EntityId, Entity>,
    paintable: HashSet<CellPos>,
    cells: HashMap<CellPos, CellOwner>,
    broadcasts: Vec<String>,
    chats: Vec<(ActorId, String)>,
    ui: Vec<(ActorId, UiMessage)>,
    paths: HashMap<ActorId, PathRequest>,
    blocked_paths: Vec<Vec3>,
    effects: HashMap<EffectHandle, (ActorId, EffectKind)>,
    impulses: Vec<(ActorId, Vec3)>,
    /// Contacts reported last step, so each touch is reported once
    contacts: HashSet<(EntityId, ActorId)>,
    next_entity: EntityId,
    next_effect: u64,
}

impl HeadlessHost {
    /// Empty world with no terrain
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            next_effect: 1,
            ..Default::default()
        }
    }

    /// Square slab of paintable cells at height `floor_y`, spanning
    /// `-half_extent..=half_extent` on both horizontal axes
    pub fn arena(half_extent: i32, floor_y: i32) -> Self {
        let mut host = Self::new();
        for x in -half_extent..=half_extent {
            for z in -half_extent..=half_extent {
                host.add_block(CellPos::new(x, floor_y, z));
            }
        }
        host
    }

    pub fn add_block(&mut self, cell: CellPos) {
        self.paintable.insert(cell);
    }

    /// A player session opened. The body appears above the origin.
    pub fn connect(&mut self, id: ActorId, name: &str) {
        self.actors
            .entry(id)
            .or_insert_with(|| ActorBody::new(name, Vec3::new(0.0, 1.0, 0.0), false));
    }

    pub fn disconnect(&mut self, id: ActorId) {
        self.actors.remove(&id);
        self.paths.remove(&id);
        self.contacts.retain(|(_, actor)| *actor != id);
    }

    /// Move an actor without touching its velocity
    pub fn place_actor(&mut self, id: ActorId, position: Vec3) {
        self.actors
            .entry(id)
            .or_insert_with(|| ActorBody::new("actor", position, false))
            .position = position;
    }

    pub fn actor_name(&self, id: ActorId) -> Option<&str> {
        self.actors.get(&id).map(|a| a.name.as_str())
    }

    pub fn physics_enabled(&self, id: ActorId) -> bool {
        self.actors.get(&id).is_some_and(|a| a.physics)
    }

    pub fn cell_owner(&self, cell: CellPos) -> CellOwner {
        self.cells.get(&cell).copied().unwrap_or_default()
    }

    /// Number of cells currently drawn in a team colour
    pub fn painted_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn live_projectiles(&self) -> usize {
        self.projectile_ids().len()
    }

    pub fn live_pickups(&self) -> usize {
        self.pickup_ids().len()
    }

    /// Live projectile ids, oldest first
    pub fn projectile_ids(&self) -> Vec<EntityId> {
        self.entity_ids(|kind| matches!(kind, EntityKind::Projectile { .. }))
    }

    pub fn pickup_ids(&self) -> Vec<EntityId> {
        self.entity_ids(|kind| matches!(kind, EntityKind::Pickup(_)))
    }

    fn entity_ids(&self, pred: impl Fn(&EntityKind) -> bool) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| pred(&e.kind))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn projectile_weapon(&self, id: EntityId) -> Option<WeaponKind> {
        match self.entities.get(&id)?.kind {
            EntityKind::Projectile { weapon, .. } => Some(weapon),
            EntityKind::Pickup(_) => None,
        }
    }

    pub fn pickup_position(&self, id: EntityId) -> Option<Vec3> {
        self.entities
            .get(&id)
            .filter(|e| matches!(e.kind, EntityKind::Pickup(_)))
            .map(|e| e.position)
    }

    pub fn active_effects(&self) -> usize {
        self.effects.len()
    }

    pub fn broadcasts(&self) -> &[String] {
        &self.broadcasts
    }

    pub fn chats_for(&self, id: ActorId) -> Vec<&str> {
        self.chats
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    pub fn ui_for(&self, id: ActorId) -> Vec<&UiMessage> {
        self.ui
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, msg)| msg)
            .collect()
    }

    /// Hand every queued UI message to the caller
    pub fn drain_ui(&mut self) -> Vec<(ActorId, UiMessage)> {
        std::mem::take(&mut self.ui)
    }

    pub fn impulses_for(&self, id: ActorId) -> Vec<Vec3> {
        self.impulses
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, impulse)| *impulse)
            .collect()
    }

    pub fn path_target(&self, actor: ActorId) -> Option<Vec3> {
        self.paths.get(&actor).map(|p| p.target)
    }

    /// Make every later path request toward `point` fail
    pub fn block_paths_to(&mut self, point: Vec3) {
        self.blocked_paths.push(point);
    }

    /// Advance the world by `dt` seconds and report what happened
    pub fn step(&mut self, dt: f32) -> Vec<HostEvent> {
        let mut events = Vec::new();
        let mut touching = HashSet::new();
        self.step_paths(dt, &mut events);
        self.step_actors(dt);
        self.step_projectiles(dt, &mut touching, &mut events);
        self.step_pickup_touches(&mut touching, &mut events);
        self.contacts = touching;
        events
    }

    fn step_paths(&mut self, dt: f32, events: &mut Vec<HostEvent>) {
        let mut finished = Vec::new();
        for (id, path) in &self.paths {
            let Some(body) = self.actors.get_mut(id) else {
                finished.push((*id, PathOutcome::Aborted));
                continue;
            };
            if !body.physics {
                finished.push((*id, PathOutcome::Aborted));
                continue;
            }
            let to_target = Vec3::new(
                path.target.x - body.position.x,
                0.0,
                path.target.z - body.position.z,
            );
            let distance = to_target.length();
            if distance <= ARRIVAL_DISTANCE {
                finished.push((*id, PathOutcome::Completed));
                continue;
            }
            let dir = to_target / distance;
            let advance = (path.speed * dt).min(distance);
            body.position += dir * advance;
            body.facing = dir;
        }
        for (actor, outcome) in finished {
            self.paths.remove(&actor);
            events.push(HostEvent::PathFinished { actor, outcome });
        }
    }

    fn step_actors(&mut self, dt: f32) {
        for body in self.actors.values_mut() {
            if !body.physics {
                continue;
            }
            body.velocity.y -= GRAVITY * dt;
            body.velocity.x *= ACTOR_DRAG;
            body.velocity.z *= ACTOR_DRAG;

            let mut next = body.position + body.velocity * dt;
            let inside = CellPos::containing(next);
            if self.paintable.contains(&inside) && body.velocity.y <= 0.0 {
                next.y = inside.y as f32 + 1.0;
                body.velocity.y = 0.0;
            }
            body.position = next;
        }
    }

    fn step_projectiles(
        &mut self,
        dt: f32,
        touching: &mut HashSet<(EntityId, ActorId)>,
        events: &mut Vec<HostEvent>,
    ) {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            let EntityKind::Projectile { owner, .. } = entity.kind else {
                continue;
            };
            entity.velocity.y -= GRAVITY * dt;
            entity.position += entity.velocity * dt;
            let position = entity.position;

            let mut struck: Vec<(ActorId, f32)> = self
                .actors
                .iter()
                .filter(|(actor, body)| **actor != owner && body.contains(position, 0.0))
                .map(|(actor, body)| (*actor, body.position.distance_squared(position)))
                .collect();
            struck.sort_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((target, _)) = struck.first() {
                touching.insert((id, *target));
                if !self.contacts.contains(&(id, *target)) {
                    events.push(HostEvent::ProjectileHitActor {
                        projectile: id,
                        target: *target,
                    });
                }
                continue;
            }

            if let Some(pickup) = self.pickup_near(position) {
                events.push(HostEvent::ProjectileTouchedPickup {
                    projectile: id,
                    pickup,
                });
                continue;
            }

            if self.paintable.contains(&CellPos::from_contact(position))
                || self.paintable.contains(&CellPos::containing(position))
            {
                trace!(projectile = id, ?position, "Projectile struck terrain");
                events.push(HostEvent::ProjectileHitBlock {
                    projectile: id,
                    point: position,
                });
            }
        }
    }

    fn step_pickup_touches(
        &self,
        touching: &mut HashSet<(EntityId, ActorId)>,
        events: &mut Vec<HostEvent>,
    ) {
        for (pickup, entity) in &self.entities {
            if !matches!(entity.kind, EntityKind::Pickup(_)) {
                continue;
            }
            for (actor, body) in &self.actors {
                if body.contains(entity.position, PICKUP_RADIUS) {
                    touching.insert((*pickup, *actor));
                    if !self.contacts.contains(&(*pickup, *actor)) {
                        events.push(HostEvent::PickupTouched {
                            pickup: *pickup,
                            actor: *actor,
                        });
                    }
                }
            }
        }
    }

    fn pickup_near(&self, point: Vec3) -> Option<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| matches!(e.kind, EntityKind::Pickup(_)))
            .find(|(_, e)| e.position.distance(point) <= PICKUP_RADIUS)
            .map(|(id, _)| *id)
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_entity;
        self.next_entity += 1;
        id
    }
}

impl CellWorld for HeadlessHost {
    fn is_paintable(&self, cell: CellPos) -> bool {
        self.paintable.contains(&cell)
    }

    fn set_cell(&mut self, cell: CellPos, owner: CellOwner) {
        match owner {
            CellOwner::Empty => {
                self.cells.remove(&cell);
            }
            CellOwner::Team(_) => {
                self.cells.insert(cell, owner);
            }
        }
    }
}

impl Host for HeadlessHost {
    fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> EntityId {
        let id = self.next_entity_id();
        self.entities.insert(
            id,
            Entity {
                kind: EntityKind::Projectile {
                    owner: spawn.owner,
                    weapon: spawn.weapon,
                },
                position: spawn.origin,
                velocity: spawn.velocity,
            },
        );
        id
    }

    fn projectile_velocity(&self, id: EntityId) -> Option<Vec3> {
        self.entities
            .get(&id)
            .filter(|e| matches!(e.kind, EntityKind::Projectile { .. }))
            .map(|e| e.velocity)
    }

    fn spawn_pickup(&mut self, kind: PickupKind, position: Vec3) -> EntityId {
        let id = self.next_entity_id();
        self.entities.insert(
            id,
            Entity {
                kind: EntityKind::Pickup(kind),
                position,
                velocity: Vec3::ZERO,
            },
        );
        id
    }

    fn despawn_entity(&mut self, id: EntityId) {
        self.entities.remove(&id);
        self.contacts.retain(|(entity, _)| *entity != id);
    }

    fn spawn_bot(&mut self, actor: ActorId, name: &str, position: Vec3) {
        self.actors.insert(actor, ActorBody::new(name, position, true));
    }

    fn despawn_bot(&mut self, actor: ActorId) {
        if self.actors.get(&actor).is_some_and(|a| a.is_bot) {
            self.actors.remove(&actor);
            self.paths.remove(&actor);
        }
    }

    fn actor_position(&self, actor: ActorId) -> Option<Vec3> {
        self.actors.get(&actor).map(|a| a.position)
    }

    fn actor_facing(&self, actor: ActorId) -> Option<Vec3> {
        self.actors.get(&actor).map(|a| a.facing)
    }

    fn set_actor_facing(&mut self, actor: ActorId, facing: Vec3) {
        if let Some(body) = self.actors.get_mut(&actor) {
            let horizontal = Vec3::new(facing.x, 0.0, facing.z).normalize_or_zero();
            if horizontal != Vec3::ZERO {
                body.facing = horizontal;
            }
        }
    }

    fn teleport(&mut self, actor: ActorId, position: Vec3) {
        if let Some(body) = self.actors.get_mut(&actor) {
            body.position = position;
            body.velocity = Vec3::ZERO;
        }
        self.paths.remove(&actor);
    }

    fn apply_impulse(&mut self, actor: ActorId, impulse: Vec3) {
        if let Some(body) = self.actors.get_mut(&actor) {
            if body.physics {
                body.velocity += impulse;
            }
            self.impulses.push((actor, impulse));
        }
    }

    fn set_physics_enabled(&mut self, actor: ActorId, enabled: bool) {
        if let Some(body) = self.actors.get_mut(&actor) {
            body.physics = enabled;
            if !enabled {
                body.velocity = Vec3::ZERO;
            }
        }
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: ActorId,
    ) -> Option<RaycastHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        self.actors
            .iter()
            .filter(|(id, _)| **id != exclude)
            .filter_map(|(id, body)| {
                let center = body.position + Vec3::Y * (ACTOR_HEIGHT * 0.5);
                let along = (center - origin).dot(dir).clamp(0.0, max_distance);
                let closest = origin + dir * along;
                body.contains(closest, 0.0).then_some(RaycastHit {
                    actor: Some(*id),
                    point: closest,
                    distance: along,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn request_path(&mut self, actor: ActorId, target: Vec3, speed: f32) -> bool {
        if !self.actors.contains_key(&actor) {
            return false;
        }
        if self
            .blocked_paths
            .iter()
            .any(|p| p.distance(target) <= BLOCKED_TOLERANCE)
        {
            return false;
        }
        self.paths.insert(actor, PathRequest { target, speed });
        true
    }

    fn broadcast(&mut self, message: &str) {
        self.broadcasts.push(message.to_string());
    }

    fn send_chat(&mut self, player: ActorId, message: &str) {
        self.chats.push((player, message.to_string()));
    }

    fn send_ui(&mut self, player: ActorId, message: UiMessage) {
        self.ui.push((player, message));
    }

    fn start_effect(&mut self, actor: ActorId, kind: EffectKind) -> EffectHandle {
        let handle = EffectHandle(self.next_effect);
        self.next_effect += 1;
        self.effects.insert(handle, (actor, kind));
        handle
    }

    fn stop_effect(&mut self, handle: EffectHandle) {
        self.effects.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn actors_land_on_the_slab() {
        let mut host = HeadlessHost::arena(4, 0);
        let id = Uuid::new_v4();
        host.connect(id, "ada");
        host.place_actor(id, Vec3::new(0.5, 3.0, 0.5));
        for _ in 0..120 {
            host.step(1.0 / 30.0);
        }
        let pos = host.actor_position(id).unwrap_or(Vec3::ZERO);
        assert!((pos.y - 1.0).abs() < 1e-3, "rests on top of the floor, got {pos}");
    }

    #[test]
    fn actors_off_the_slab_keep_falling() {
        let mut host = HeadlessHost::arena(2, 0);
        let id = Uuid::new_v4();
        host.connect(id, "ada");
        host.place_actor(id, Vec3::new(20.0, 3.0, 20.0));
        for _ in 0..90 {
            host.step(1.0 / 30.0);
        }
        assert!(host.actor_position(id).is_some_and(|p| p.y < -8.0));
    }

    #[test]
    fn projectile_reports_a_block_hit() {
        let mut host = HeadlessHost::arena(8, 0);
        let owner = Uuid::new_v4();
        let id = host.spawn_projectile(ProjectileSpawn {
            owner,
            weapon: WeaponKind::Blob,
            origin: Vec3::new(0.0, 3.0, 0.0),
            velocity: Vec3::new(0.0, -20.0, 0.0),
        });
        let mut hit = None;
        for _ in 0..30 {
            if let Some(HostEvent::ProjectileHitBlock { projectile, point }) = host
                .step(1.0 / 30.0)
                .into_iter()
                .find(|e| matches!(e, HostEvent::ProjectileHitBlock { .. }))
            {
                hit = Some((projectile, point));
                break;
            }
        }
        let (projectile, point) = hit.expect("projectile reached the floor");
        assert_eq!(projectile, id);
        assert!(point.y < 1.0);
    }

    #[test]
    fn actor_contact_is_reported_once() {
        let mut host = HeadlessHost::new();
        let owner = Uuid::new_v4();
        let target = Uuid::new_v4();
        host.connect(target, "tgt");
        host.place_actor(target, Vec3::new(0.0, 0.0, -1.0));
        host.set_physics_enabled(target, false);
        host.spawn_projectile(ProjectileSpawn {
            owner,
            weapon: WeaponKind::Sniper,
            origin: Vec3::new(0.0, 1.0, -0.9),
            velocity: Vec3::new(0.0, 0.0, -0.5),
        });
        let hits: usize = (0..5)
            .map(|_| {
                host.step(1.0 / 30.0)
                    .iter()
                    .filter(|e| matches!(e, HostEvent::ProjectileHitActor { .. }))
                    .count()
            })
            .sum();
        assert_eq!(hits, 1);
    }

    #[test]
    fn raycast_finds_the_actor_in_front() {
        let mut host = HeadlessHost::new();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        host.place_actor(me, Vec3::ZERO);
        host.place_actor(other, Vec3::new(0.0, 0.0, -2.0));
        let hit = host.raycast(Vec3::new(0.0, 0.7, 0.0), Vec3::NEG_Z, 3.5, me);
        assert_eq!(hit.and_then(|h| h.actor), Some(other));
        assert!(host.raycast(Vec3::new(0.0, 0.7, 0.0), Vec3::Z, 3.5, me).is_none());
    }

    #[test]
    fn paths_complete_and_blocked_targets_fail() {
        let mut host = HeadlessHost::arena(8, 0);
        let bot = Uuid::new_v4();
        host.spawn_bot(bot, "Bot_1", Vec3::new(0.0, 1.0, 0.0));
        host.block_paths_to(Vec3::new(5.0, 1.0, 5.0));
        assert!(!host.request_path(bot, Vec3::new(5.0, 1.0, 5.0), 4.5));
        assert!(host.request_path(bot, Vec3::new(2.0, 1.0, 0.0), 4.5));

        let finished = (0..60).flat_map(|_| host.step(1.0 / 30.0)).any(|e| {
            e == HostEvent::PathFinished {
                actor: bot,
                outcome: PathOutcome::Completed,
            }
        });
        assert!(finished);
        assert_eq!(host.path_target(bot), None);
    }
}
