//! Match lifecycle and event routing
//!
//! `MatchController` owns every component and the roster. The host delivers
//! events and clock ticks one at a time; nothing here runs concurrently.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::commands::{sanitize_name, OperatorCommand};
use crate::config::GameConfig;
use crate::host::{EntityId, Host};
use crate::protocol::{ActionInput, HostEvent, MatchStatus, TeamScore, UiCommand, UiMessage};
use crate::util::rate_limit::CommandLimiter;
use crate::util::time::format_clock;

use super::buffs::BuffSystem;
use super::combat::{CombatResolver, FireOutcome, HitOutcome, MeleeOutcome};
use super::context::{MatchContext, TimerEvent};
use super::lifecycle;
use super::math::{aim_direction, facing_from_yaw, CellPos};
use super::npc::NpcController;
use super::pickups::PickupSpawner;
use super::player::{ActorId, ActorKind, LifeState, PlayerClass, PlayerState, Roster};
use super::snapshot::{self, SnapshotBuilder};
use super::team::{TeamId, TeamRegistry};
use super::territory::TerritoryLedger;
use super::timer::{CountdownTick, TimerController, TimerHandle};

const WELCOME_LINES: [&str; 8] = [
    "Welcome! Use WASD to move around.",
    "Press space to jump.",
    "Hold shift to sprint.",
    "Press left mouse button to shoot.",
    "Press Q button to punch.",
    "Press E to select your class.",
    "Press R to view the leaderboard.",
    "Type /set-name to set your name.",
];

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Waiting for enough players
    Waiting,
    /// Counting down, or clearing the board before the start
    Countdown,
    Active,
    /// Result being announced; the controller re-arms in the same call
    Ended,
}

/// Outcome of the last finished match
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub winner: TeamId,
    pub winner_name: String,
    pub score: u32,
    pub scores: Vec<(TeamId, u32)>,
}

pub struct MatchController<H: Host> {
    ctx: MatchContext<H>,
    phase: MatchPhase,
    roster: Roster,
    teams: TeamRegistry,
    ledger: TerritoryLedger,
    combat: CombatResolver,
    buffs: BuffSystem,
    pickups: PickupSpawner,
    npcs: NpcController,
    hud: SnapshotBuilder,
    limiter: CommandLimiter,
    countdown: TimerController,
    clock: TimerController,
    regen: Option<TimerHandle>,
    /// Start as soon as the board clear finishes
    start_pending: bool,
    last_result: Option<MatchResult>,
}

impl<H: Host> MatchController<H> {
    pub fn new(host: H, config: GameConfig, seed: u64) -> Self {
        let teams = TeamRegistry::new(
            config.teams.iter().map(|t| (t.name.clone(), t.spawn)),
            config.spawn_jitter,
        );
        let ledger = TerritoryLedger::new(teams.ids());
        let hud = SnapshotBuilder::new(config.hud_interval_ticks);
        let countdown = TimerController::new(config.countdown_secs);
        let clock = TimerController::new(config.match_duration_secs);

        Self {
            ctx: MatchContext::new(host, config, seed),
            phase: MatchPhase::Waiting,
            roster: Roster::new(),
            teams,
            ledger,
            combat: CombatResolver::new(),
            buffs: BuffSystem::new(),
            pickups: PickupSpawner::new(),
            npcs: NpcController::new(),
            hud,
            limiter: CommandLimiter::new(),
            countdown,
            clock,
            regen: None,
            start_pending: false,
            last_result: None,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn host(&self) -> &H {
        &self.ctx.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.ctx.host
    }

    pub fn config(&self) -> &GameConfig {
        &self.ctx.config
    }

    pub fn now(&self) -> u64 {
        self.ctx.now()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Direct roster access for operator tooling
    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn teams(&self) -> &TeamRegistry {
        &self.teams
    }

    pub fn ledger(&self) -> &TerritoryLedger {
        &self.ledger
    }

    pub fn combat(&self) -> &CombatResolver {
        &self.combat
    }

    pub fn npcs(&self) -> &NpcController {
        &self.npcs
    }

    pub fn pickups(&self) -> &PickupSpawner {
        &self.pickups
    }

    pub fn last_result(&self) -> Option<&MatchResult> {
        self.last_result.as_ref()
    }

    /// Seconds left on the match clock, or on the countdown before it
    pub fn time_remaining(&self) -> u32 {
        match self.phase {
            MatchPhase::Active => self.clock.remaining(),
            MatchPhase::Countdown => self.countdown.remaining(),
            MatchPhase::Waiting | MatchPhase::Ended => 0,
        }
    }

    pub fn status(&self) -> MatchStatus {
        MatchStatus {
            phase: self.phase,
            time_remaining_secs: self.time_remaining(),
            scores: self
                .teams
                .ids()
                .map(|id| TeamScore {
                    team_id: id,
                    name: self.teams.name(id).unwrap_or("?").to_string(),
                    score: self.ledger.score(id),
                })
                .collect(),
            players: self.roster.human_count(),
            bots: self.npcs.bot_count(),
            painted_cells: self.ledger.owned_cells(),
            clearing: self.ledger.is_clearing(),
        }
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Advance the simulated clock and run one world tick
    pub fn tick(&mut self, now_ms: u64) {
        self.ctx.advance_to(now_ms);
        while let Some((handle, event)) = self.ctx.pop_due() {
            self.on_timer(handle, event);
        }

        self.step_clear();
        self.check_bounds();
        if self.phase == MatchPhase::Active {
            self.paint_under_runners();
        }
        if self.hud.should_send() {
            self.send_hud();
        }
    }

    fn on_timer(&mut self, handle: TimerHandle, event: TimerEvent) {
        match event {
            TimerEvent::CountdownSecond => {
                if !self.countdown.owns(handle) {
                    return;
                }
                match self.countdown.tick(&mut self.ctx.scheduler) {
                    CountdownTick::Running(left) => trace!(left, "Countdown"),
                    CountdownTick::Expired => self.clear_then_start(),
                }
            }
            TimerEvent::MatchSecond => {
                if !self.clock.owns(handle) {
                    return;
                }
                if self.clock.tick(&mut self.ctx.scheduler) == CountdownTick::Expired {
                    self.end_match();
                }
            }
            TimerEvent::StaminaRegen => {
                let amount = self.ctx.config.stamina_regen_per_tick;
                for player in self.roster.values_mut() {
                    player.credit_stamina(amount);
                }
            }
            TimerEvent::CooldownReady => {}
            TimerEvent::ProjectileExpired(id) => self.combat.expire_projectile(&mut self.ctx, id),
            TimerEvent::BuffExpired { actor, kind } => {
                self.buffs
                    .expire(&mut self.ctx, &mut self.roster, actor, kind, handle)
            }
            TimerEvent::Respawn(actor) => {
                let active = self.phase == MatchPhase::Active;
                lifecycle::respawn(
                    &mut self.ctx,
                    &mut self.roster,
                    &self.teams,
                    &mut self.buffs,
                    actor,
                    active,
                );
                if self.npcs.is_bot(actor) {
                    self.npcs.on_respawned(actor);
                }
            }
            TimerEvent::RespawnSettled(actor) => {
                lifecycle::settle(&mut self.roster, actor);
            }
            TimerEvent::BotThink => {
                if self.phase == MatchPhase::Active {
                    self.npcs
                        .think(&mut self.ctx, &mut self.roster, &self.teams, &mut self.combat);
                }
            }
            TimerEvent::PickupSpawn => {
                if self.phase == MatchPhase::Active {
                    self.pickups.spawn_random(&mut self.ctx);
                }
            }
        }
    }

    /// One batch of the board clear; starts the match once it is done
    fn step_clear(&mut self) {
        if !self.ledger.is_clearing() {
            return;
        }
        let batch = self.ctx.config.clear_batch_cells;
        let finished = self.ledger.clear_step(&mut self.ctx.host, batch);
        if finished && self.start_pending {
            self.start_pending = false;
            self.start_match();
        }
    }

    /// Anyone below their fall threshold dies
    fn check_bounds(&mut self) {
        for actor in self.roster.ids() {
            let Some(player) = self.roster.get(actor) else {
                continue;
            };
            if player.life == LifeState::Dead {
                continue;
            }
            let threshold = lifecycle::fall_threshold(&self.ctx, player.kind);
            let fell = self
                .ctx
                .host
                .actor_position(actor)
                .is_some_and(|p| p.y < threshold);
            if !fell {
                continue;
            }
            let outcome = lifecycle::handle_death(&mut self.ctx, &mut self.roster, actor);
            if outcome != lifecycle::DeathOutcome::Ignored && self.npcs.is_bot(actor) {
                self.npcs.on_death(actor);
            }
        }
    }

    /// Runners paint the cells they walk over
    fn paint_under_runners(&mut self) {
        for actor in self.roster.ids() {
            let Some(player) = self.roster.get(actor) else {
                continue;
            };
            if player.class != PlayerClass::Runner || !player.can_act() {
                continue;
            }
            let Some(team) = self.teams.team_of(actor) else {
                continue;
            };
            let Some(position) = self.ctx.host.actor_position(actor) else {
                continue;
            };
            let cell = CellPos::beneath(position);
            if player.last_cell == Some(cell) {
                continue;
            }

            let changed = self.ledger.paint_footprint(
                &mut self.ctx.host,
                cell,
                team,
                &self.ctx.config.runner_footprint,
            );
            if let Some(player) = self.roster.get_mut(actor) {
                player.last_cell = Some(cell);
                player.award_points(changed);
            }
        }
    }

    fn hud_time(&self) -> String {
        match self.phase {
            MatchPhase::Active => format_clock(self.clock.remaining()),
            MatchPhase::Countdown if self.ledger.is_clearing() => "Resetting map".to_string(),
            MatchPhase::Countdown => format!("Starting in {}", self.countdown.remaining()),
            MatchPhase::Waiting => "Waiting for players".to_string(),
            MatchPhase::Ended => "Game over".to_string(),
        }
    }

    fn send_hud(&mut self) {
        let time = self.hud_time();
        for id in self.roster.human_ids() {
            let Some(player) = self.roster.get(id) else {
                continue;
            };
            let hud = self.hud.build(&time, player, &self.teams, &self.ledger);
            self.ctx.host.send_ui(id, UiMessage::GameUi(hud));
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    fn start_countdown(&mut self) {
        if self.phase != MatchPhase::Waiting {
            return;
        }
        self.phase = MatchPhase::Countdown;
        let now = self.ctx.now();
        self.countdown
            .start(&mut self.ctx.scheduler, now, TimerEvent::CountdownSecond);
        let message = format!("Game starting in {} seconds!", self.countdown.duration());
        self.ctx.host.broadcast(&message);
        info!(seconds = self.countdown.duration(), "Countdown started");
    }

    fn cancel_countdown(&mut self) {
        self.countdown.stop(&mut self.ctx.scheduler);
        self.phase = MatchPhase::Waiting;
        info!("Countdown cancelled");
    }

    /// Every match starts on an empty board. A dirty board is cleared in
    /// batches first while the phase stays at Countdown.
    fn clear_then_start(&mut self) {
        self.countdown.stop(&mut self.ctx.scheduler);
        self.phase = MatchPhase::Countdown;
        if self.ledger.is_empty() && !self.ledger.is_clearing() {
            self.start_match();
            return;
        }
        self.ctx
            .host
            .broadcast("Game will begin once the map is reset!");
        if !self.ledger.is_clearing() {
            self.ledger.start_clear();
        }
        self.start_pending = true;
    }

    fn start_match(&mut self) {
        if self.phase == MatchPhase::Active {
            return;
        }
        self.phase = MatchPhase::Active;
        self.buffs.clear_all(&mut self.ctx, &mut self.roster);
        for player in self.roster.values_mut() {
            player.reset_for_match();
        }

        for actor in self.roster.human_ids() {
            if self.teams.team_of(actor).is_none() {
                self.teams.add_to_min_team(actor);
            }
            lifecycle::cancel_pending(&mut self.ctx, &mut self.roster, actor);
            let spawn = self.team_spawn(actor);
            self.place(actor, spawn);
        }

        let per_team = self.ctx.config.bots.per_team;
        if per_team > 0 {
            self.npcs
                .spawn_bots(&mut self.ctx, &mut self.roster, &mut self.teams, per_team);
        }
        self.pickups.start(&mut self.ctx);

        let regen_interval = self.ctx.config.stamina_regen_interval_ms;
        self.ctx.cancel(&mut self.regen);
        self.regen = Some(
            self.ctx
                .schedule_repeating(regen_interval, TimerEvent::StaminaRegen),
        );
        let now = self.ctx.now();
        self.clock
            .start(&mut self.ctx.scheduler, now, TimerEvent::MatchSecond);
        self.hud.force_next();
        info!(
            players = self.roster.human_count(),
            bots = self.npcs.bot_count(),
            "Match started"
        );
    }

    /// Remove everything a round spawned and send players back to the lobby
    fn teardown_round(&mut self) {
        self.clock.stop(&mut self.ctx.scheduler);
        self.ctx.cancel(&mut self.regen);
        self.combat.despawn_all(&mut self.ctx);
        self.pickups.stop(&mut self.ctx);
        self.npcs.despawn_all(
            &mut self.ctx,
            &mut self.roster,
            &mut self.teams,
            &mut self.combat,
            &mut self.buffs,
        );
        self.buffs.clear_all(&mut self.ctx, &mut self.roster);

        for actor in self.roster.human_ids() {
            lifecycle::cancel_pending(&mut self.ctx, &mut self.roster, actor);
            let lobby = lifecycle::lobby_point(&mut self.ctx);
            self.place(actor, lobby);
        }
    }

    /// Time is up: announce the winner and re-arm the countdown gate
    fn end_match(&mut self) {
        if self.phase != MatchPhase::Active {
            return;
        }
        self.phase = MatchPhase::Ended;

        let scores: Vec<(TeamId, u32)> = self
            .teams
            .ids()
            .map(|id| (id, self.ledger.score(id)))
            .collect();
        let (winner, score) = scores
            .iter()
            .copied()
            .fold(None, |best: Option<(TeamId, u32)>, (id, score)| match best {
                Some((_, best_score)) if score <= best_score => best,
                _ => Some((id, score)),
            })
            .unwrap_or((1, 0));
        let winner_name = self.teams.name(winner).unwrap_or("Nobody").to_string();

        self.ctx.host.broadcast(&format!(
            "Game Over! {winner_name} wins with {score} blocks!"
        ));
        for actor in self.roster.human_ids() {
            let message = if self.teams.team_of(actor) == Some(winner) {
                UiMessage::Victory {
                    winner: winner_name.clone(),
                    score,
                }
            } else {
                UiMessage::Defeat {
                    winner: winner_name.clone(),
                    score,
                }
            };
            self.ctx.host.send_ui(actor, message);
        }
        info!(team_id = winner, team = %winner_name, score, "Match ended");

        self.teardown_round();
        self.last_result = Some(MatchResult {
            winner,
            winner_name,
            score,
            scores,
        });
        self.rearm();
    }

    /// Back to Waiting, or straight into a new countdown if enough players remain
    fn rearm(&mut self) {
        self.phase = MatchPhase::Waiting;
        if self.roster.human_count() >= self.ctx.config.min_players {
            self.start_countdown();
        }
    }

    /// Operator start. Refused while a match is running.
    pub fn force_start(&mut self) -> bool {
        if self.phase == MatchPhase::Active {
            self.ctx.host.broadcast("Game already running!");
            return false;
        }
        self.ctx.host.broadcast("Starting game...");
        info!("Match force-started");
        self.clear_then_start();
        true
    }

    /// Abandon any running match and start a fresh one on a clean board
    pub fn restart(&mut self) {
        if self.phase == MatchPhase::Active {
            self.teardown_round();
        }
        self.ctx.host.broadcast("Restarting game...");
        info!("Match restarted");
        self.clear_then_start();
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::PlayerJoined { player_id, name } => self.join(player_id, &name),
            HostEvent::PlayerLeft { player_id } => self.leave(player_id),
            HostEvent::Input { player_id, input } => self.handle_input(player_id, input),
            HostEvent::Ui { player_id, command } => self.handle_ui_command(player_id, command),
            HostEvent::Chat { player_id, text } => self.handle_chat(player_id, &text),
            HostEvent::ProjectileHitActor { projectile, target } => {
                let outcome = self.combat.resolve_projectile_hit(
                    &mut self.ctx,
                    &mut self.roster,
                    &self.teams,
                    projectile,
                    target,
                );
                if let HitOutcome::Knockback { impulse } = outcome {
                    trace!(target_id = %target, ?impulse, "Knockback applied");
                }
            }
            HostEvent::ProjectileHitBlock { projectile, point } => {
                self.on_projectile_hit_block(projectile, point)
            }
            HostEvent::ProjectileTouchedPickup { projectile, .. } => {
                self.combat.despawn_projectile(&mut self.ctx, projectile);
            }
            HostEvent::PickupTouched { pickup, actor } => {
                if self.pickups.is_pickup(pickup) {
                    self.pickups.consume(
                        &mut self.ctx,
                        &mut self.roster,
                        &mut self.buffs,
                        pickup,
                        actor,
                    );
                }
            }
            HostEvent::PathFinished { actor, outcome } => {
                self.npcs.on_path_finished(actor, outcome)
            }
        }
    }

    pub fn join(&mut self, player_id: ActorId, name: &str) {
        if self.roster.contains(player_id) {
            warn!(player_id = %player_id, "Player already joined");
            return;
        }
        let name = sanitize_name(name).unwrap_or_else(|| "Player".to_string());
        let class = PlayerClass::default();
        let max = self.ctx.config.max_stamina(class);
        self.roster.insert(PlayerState::new(
            player_id,
            name.clone(),
            ActorKind::Human,
            class,
            max,
        ));
        let team = self.teams.add_to_min_team(player_id);

        let spawn = if self.phase == MatchPhase::Active {
            self.team_spawn(player_id)
        } else {
            lifecycle::lobby_point(&mut self.ctx)
        };
        self.place(player_id, spawn);

        self.ctx
            .host
            .send_ui(player_id, UiMessage::PlayerId { player_id });
        for line in WELCOME_LINES {
            self.ctx.host.send_chat(player_id, line);
        }
        info!(
            player_id = %player_id,
            name = %name,
            team_id = ?team,
            players = self.roster.human_count(),
            "Player joined"
        );

        if self.phase == MatchPhase::Waiting
            && self.roster.human_count() >= self.ctx.config.min_players
        {
            self.start_countdown();
        }
    }

    pub fn leave(&mut self, player_id: ActorId) {
        if !self.roster.contains(player_id) {
            return;
        }
        lifecycle::cancel_pending(&mut self.ctx, &mut self.roster, player_id);
        self.buffs
            .clear_actor(&mut self.ctx, &mut self.roster, player_id);
        self.combat.forget_actor(&mut self.ctx, player_id);
        self.teams.remove(player_id);
        self.roster.remove(player_id);
        self.limiter.prune();
        info!(player_id = %player_id, players = self.roster.human_count(), "Player left");

        if self.phase == MatchPhase::Countdown
            && !self.start_pending
            && self.roster.human_count() == 0
        {
            self.cancel_countdown();
        }
    }

    pub fn handle_input(&mut self, player_id: ActorId, input: ActionInput) {
        if !self.roster.get(player_id).is_some_and(|p| p.is_human()) {
            return;
        }
        if let Some(class) = input.class_slot.and_then(PlayerClass::from_slot) {
            self.select_class(player_id, class);
        }
        if input.class_menu {
            self.ctx.host.send_ui(player_id, UiMessage::ShowClassSelect);
        }
        if input.leaderboard {
            self.send_leaderboard(player_id);
        }

        self.ctx
            .host
            .set_actor_facing(player_id, facing_from_yaw(input.yaw));
        if input.sprint {
            self.sprint(player_id);
        }
        if input.fire {
            self.fire(player_id, input.yaw, input.pitch);
        }
        if input.melee {
            let outcome = self.combat.resolve_melee_attack(
                &mut self.ctx,
                &mut self.roster,
                &self.teams,
                player_id,
            );
            if !matches!(outcome, MeleeOutcome::Hit { .. }) {
                trace!(player_id = %player_id, ?outcome, "Melee");
            }
        }
    }

    /// Fire the class weapon along the camera aim
    pub fn fire(&mut self, player_id: ActorId, yaw: f32, pitch: f32) -> FireOutcome {
        let Some(weapon) = self.roster.get(player_id).and_then(|p| p.class.weapon()) else {
            return FireOutcome::WrongClass;
        };
        let Some(position) = self.ctx.host.actor_position(player_id) else {
            return FireOutcome::UnknownActor;
        };
        let direction = aim_direction(yaw, pitch);
        let origin = position
            + Vec3::new(direction.x, self.ctx.config.muzzle_height, direction.z);
        self.combat.fire_projectile(
            &mut self.ctx,
            &mut self.roster,
            &self.teams,
            player_id,
            origin,
            direction,
            weapon,
        )
    }

    /// One input tick of sprinting. False when stamina is short.
    pub fn sprint(&mut self, player_id: ActorId) -> bool {
        let cost = self.ctx.config.sprint_cost;
        self.roster
            .get_mut(player_id)
            .is_some_and(|p| p.can_act() && p.try_spend(cost))
    }

    fn on_projectile_hit_block(&mut self, projectile: EntityId, point: Vec3) {
        let Some(shot) = self.combat.projectile(projectile).cloned() else {
            return;
        };
        if self.phase == MatchPhase::Active {
            if let Some(team) = shot.team {
                let cap = self.ctx.config.weapon(shot.weapon).paint_cap;
                let changed = self.ledger.paint(
                    &mut self.ctx.host,
                    CellPos::from_contact(point),
                    team,
                    cap,
                    &self.ctx.config.paint_pattern,
                );
                if let Some(shooter) = self.roster.get_mut(shot.owner) {
                    shooter.award_points(changed);
                }
            }
        }
        self.combat.despawn_projectile(&mut self.ctx, projectile);
    }

    pub fn handle_ui_command(&mut self, player_id: ActorId, command: UiCommand) {
        if !self.roster.contains(player_id) {
            return;
        }
        if !self.limiter.check(player_id) {
            debug!(player_id = %player_id, "UI command rate limited");
            return;
        }
        match command {
            UiCommand::SelectClass { class } => self.select_class(player_id, class),
            UiCommand::SwitchTeam => self.switch_team(player_id),
            UiCommand::SetName { name } => self.set_name(player_id, &name),
            UiCommand::ShowLeaderboard => self.send_leaderboard(player_id),
        }
    }

    fn handle_chat(&mut self, player_id: ActorId, text: &str) {
        let Some(parsed) = OperatorCommand::parse(text) else {
            return;
        };
        match parsed {
            Ok(OperatorCommand::StartGame) => {
                self.force_start();
            }
            Ok(OperatorCommand::RestartGame) => self.restart(),
            Ok(OperatorCommand::SetName(name)) => self.set_name(player_id, &name),
            Ok(OperatorCommand::SwitchTeam) => self.switch_team(player_id),
            Err(err) => self.ctx.host.send_chat(player_id, &err.to_string()),
        }
    }

    pub fn select_class(&mut self, player_id: ActorId, class: PlayerClass) {
        let max = self.ctx.config.max_stamina(class);
        let Some(player) = self.roster.get_mut(player_id) else {
            return;
        };
        if player.class == class {
            return;
        }
        player.set_class(class, max);
        player.last_cell = None;
        self.ctx
            .host
            .send_chat(player_id, &format!("You are now a {class}!"));
        debug!(player_id = %player_id, ?class, "Class selected");
    }

    pub fn switch_team(&mut self, player_id: ActorId) {
        let Some(team) = self.teams.switch_team(player_id) else {
            return;
        };
        let name = self.teams.name(team).unwrap_or("?").to_string();
        self.ctx
            .host
            .send_chat(player_id, &format!("You joined {name}!"));
        debug!(player_id = %player_id, team_id = team, "Switched team");
    }

    pub fn set_name(&mut self, player_id: ActorId, raw: &str) {
        let Some(name) = sanitize_name(raw) else {
            return;
        };
        let Some(player) = self.roster.get_mut(player_id) else {
            return;
        };
        player.name = name.clone();
        self.ctx
            .host
            .send_chat(player_id, &format!("Name set to {name}"));
    }

    fn send_leaderboard(&mut self, player_id: ActorId) {
        let board = snapshot::leaderboard(&self.roster, &self.teams);
        self.ctx.host.send_ui(player_id, board);
    }

    /// Team spawn, or the lobby when the team has none
    fn team_spawn(&mut self, actor: ActorId) -> Vec3 {
        let point = self
            .teams
            .team_of(actor)
            .and_then(|team| self.teams.spawn_point(team, &mut self.ctx.rng));
        match point {
            Some(point) => point,
            None => {
                warn!(actor_id = %actor, "No team spawn configured, using lobby");
                lifecycle::lobby_point(&mut self.ctx)
            }
        }
    }

    /// Put a human back in play at `position`
    fn place(&mut self, actor: ActorId, position: Vec3) {
        if let Some(player) = self.roster.get_mut(actor) {
            player.life = LifeState::Alive;
            player.last_cell = None;
        }
        self.ctx.host.set_physics_enabled(actor, true);
        self.ctx.host.teleport(actor, position);
    }
}
