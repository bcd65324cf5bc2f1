//! Territory Arena Server - authoritative match and combat simulation
//!
//! Teams paint world cells with projectiles and footsteps while knocking
//! opponents off the map. The core is engine-agnostic: everything it needs
//! from the world goes through [`host::Host`].

pub mod app;
pub mod commands;
pub mod config;
pub mod game;
pub mod host;
pub mod http;
pub mod protocol;
pub mod sim;
pub mod util;
