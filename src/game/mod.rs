//! Match and combat simulation

pub mod buffs;
pub mod combat;
pub mod context;
pub mod lifecycle;
pub mod r#match;
pub mod math;
pub mod npc;
pub mod pickups;
pub mod player;
pub mod snapshot;
pub mod team;
pub mod territory;
pub mod timer;

pub use r#match::{MatchController, MatchPhase, MatchResult};
pub use player::{ActorId, PlayerClass};
