//! Wire types exchanged with the host engine and the per-player UI
//!
//! `HostEvent` is everything the engine delivers into the simulation;
//! `UiMessage` is everything the simulation pushes to a player's UI channel.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::player::{ActorId, PlayerClass};
use crate::game::r#match::MatchPhase;
use crate::game::team::TeamId;
use crate::host::EntityId;

/// Per-player HUD snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HudSnapshot {
    /// Match time remaining ("m:ss") or countdown text
    pub time: String,
    /// "Team: score | Team: score"
    pub scores: String,
    pub team_name: String,
    pub stamina: f32,
    pub max_stamina: f32,
    pub points: u32,
    pub kills: u32,
    pub deaths: u32,
    pub name: String,
    pub class: PlayerClass,
    pub invincible: bool,
    pub strength_boost: bool,
}

/// One row of a team leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub name: String,
    pub points: u32,
    pub kills: u32,
    pub deaths: u32,
}

/// Ranked list for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLeaderboard {
    pub team_name: String,
    pub rows: Vec<LeaderboardRow>,
}

/// One team's line in the status summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    pub team_id: TeamId,
    pub name: String,
    pub score: u32,
}

/// Read-only summary of the running match for the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub phase: MatchPhase,
    /// Match clock while active, countdown otherwise
    pub time_remaining_secs: u32,
    pub scores: Vec<TeamScore>,
    pub players: usize,
    pub bots: usize,
    pub painted_cells: usize,
    pub clearing: bool,
}

/// Payloads sent to a single player's UI channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiMessage {
    /// Sent once on join so the client can identify itself
    PlayerId { player_id: Uuid },

    /// Periodic HUD refresh
    GameUi(HudSnapshot),

    /// Two ranked lists, one per team, by descending points
    Leaderboard { teams: Vec<TeamLeaderboard> },

    /// Sent once per death to the victim
    PlayerDeath {
        message: String,
        killer: Option<String>,
        respawn_in_ms: u64,
    },

    Victory { winner: String, score: u32 },

    Defeat { winner: String, score: u32 },

    /// Ask the client to open the class picker
    ShowClassSelect,
}

/// Commands accepted from the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiCommand {
    SelectClass { class: PlayerClass },
    SwitchTeam,
    SetName { name: String },
    ShowLeaderboard,
}

/// Input state for one engine tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionInput {
    pub fire: bool,
    pub melee: bool,
    pub sprint: bool,
    /// Facing yaw in radians
    pub yaw: f32,
    /// Camera pitch in radians
    pub pitch: f32,
    /// Number key pressed this tick (1-4)
    pub class_slot: Option<u8>,
    pub leaderboard: bool,
    pub class_menu: bool,
}

/// How a pathfinding request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOutcome {
    Completed,
    Aborted,
}

/// Events delivered by the host engine, one at a time, on the simulation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    PlayerJoined {
        player_id: ActorId,
        name: String,
    },
    PlayerLeft {
        player_id: ActorId,
    },
    Input {
        player_id: ActorId,
        input: ActionInput,
    },
    Ui {
        player_id: ActorId,
        command: UiCommand,
    },
    Chat {
        player_id: ActorId,
        text: String,
    },
    ProjectileHitActor {
        projectile: EntityId,
        target: ActorId,
    },
    /// Projectile touched a world cell; `point` is the first contact point
    ProjectileHitBlock {
        projectile: EntityId,
        point: Vec3,
    },
    ProjectileTouchedPickup {
        projectile: EntityId,
        pickup: EntityId,
    },
    PickupTouched {
        pickup: EntityId,
        actor: ActorId,
    },
    PathFinished {
        actor: ActorId,
        outcome: PathOutcome,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_command_uses_kebab_case_tags() {
        let cmd: UiCommand =
            serde_json::from_str(r#"{"type":"select-class","class":"grenader"}"#).expect("parse");
        assert_eq!(
            cmd,
            UiCommand::SelectClass {
                class: PlayerClass::Grenader
            }
        );
    }

    #[test]
    fn hud_snapshot_serializes_flat() {
        let msg = UiMessage::GameUi(HudSnapshot {
            time: "4:30".into(),
            scores: "Blue Bandits: 0 | Red Raiders: 0".into(),
            team_name: "Blue Bandits".into(),
            stamina: 520.0,
            max_stamina: 520.0,
            points: 0,
            kills: 0,
            deaths: 0,
            name: "ada".into(),
            class: PlayerClass::Sniper,
            invincible: false,
            strength_boost: false,
        });
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "game-ui");
        assert_eq!(json["teamName"], "Blue Bandits");
        assert_eq!(json["class"], "sniper");
    }
}
