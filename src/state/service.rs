//! The top-level session service.
//!
//! [`PillarService`] owns the configuration, the registry, the RNG and the
//! two host collaborators. Everything that changes session state goes
//! through it: admin operations, joins and leaves, deaths and quits, and
//! (in `orchestrator.rs` / `reconciler.rs`) the scheduled callbacks.

use super::config::{ConfigStore, PluginConfig, SessionConfig, TICKS_PER_SECOND};
use super::display::{boss_bar_view, objective_name, scoreboard_view};
use super::error::AdminError;
use super::host::{GameMode, Host, TitleTiming};
use super::machine::{SessionEvent, SessionState};
use super::region::{BlockPos, Region, Vec3};
use super::registry::SessionRegistry;
use super::session::SessionRuntime;
use super::tasks::{Scheduler, Task, TaskHandle, TaskKind};
use super::weighted::WeightedTable;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// How a round ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundOutcome {
    pub session_id: String,
    pub winner: Option<String>,
    pub message: String,
    /// Seconds the round was live
    pub elapsed: u64,
    pub participants: Vec<String>,
    pub ended_at: DateTime<Utc>,
}

/// Progress of the two-step wait-area command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitAreaStep {
    /// First corner recorded, waiting for the second
    FirstCorner(BlockPos),
    /// Both corners recorded and saved
    Completed(Region),
}

/// Lucky Pillar session service.
pub struct PillarService<H, S> {
    pub(crate) host: H,
    pub(crate) scheduler: S,
    store: ConfigStore,
    pub(crate) config: PluginConfig,
    pub(crate) items: WeightedTable<String>,
    pub(crate) registry: SessionRegistry,
    pub(crate) rng: ChaCha8Rng,
    /// First wait-area corner per session, until the second arrives
    pending_wait_areas: HashMap<String, BlockPos>,
    reconcile_task: Option<TaskHandle>,
}

fn item_table(pool: &std::collections::BTreeMap<String, u32>) -> WeightedTable<String> {
    WeightedTable::new(pool.iter().map(|(item, weight)| (item.clone(), *weight)))
}

impl<H: Host, S: Scheduler> PillarService<H, S> {
    /// Create a service with an entropy-seeded RNG.
    pub fn new(host: H, scheduler: S, store: ConfigStore) -> Self {
        Self::with_rng(host, scheduler, store, ChaCha8Rng::from_entropy())
    }

    /// Create a service with a fixed seed, for reproducible rounds.
    pub fn with_seed(host: H, scheduler: S, store: ConfigStore, seed: u64) -> Self {
        Self::with_rng(host, scheduler, store, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(host: H, scheduler: S, store: ConfigStore, rng: ChaCha8Rng) -> Self {
        let config = PluginConfig {
            sessions: Default::default(),
            item_pool: super::config::default_item_pool(),
        };
        let items = item_table(&config.item_pool);
        Self {
            host,
            scheduler,
            store,
            config,
            items,
            registry: SessionRegistry::new(),
            rng,
            pending_wait_areas: HashMap::new(),
            reconcile_task: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn runtime(&self, session_id: &str) -> Option<&SessionRuntime> {
        self.registry.get(session_id)
    }

    pub(crate) fn session_config(&self, session_id: &str) -> Option<&SessionConfig> {
        self.config.sessions.get(session_id)
    }

    // --- Lifecycle ---

    /// Load configuration, create runtimes and arm the membership sweep.
    pub fn enable(&mut self) {
        let config = self.store.load();
        self.apply_config(config);

        if let Err(e) = self.host.dispatch_command("gamerule doimmediaterespawn true") {
            warn!(error = %e, "Failed to set immediate respawn");
        }

        if self.reconcile_task.is_none() {
            self.reconcile_task = Some(self.scheduler.run_repeating(
                Task::Reconcile,
                TICKS_PER_SECOND,
                TICKS_PER_SECOND,
            ));
        }

        info!(sessions = self.config.sessions.len(), "Lucky Pillar enabled");
    }

    /// Stop every active session and cancel the membership sweep.
    pub fn disable(&mut self) {
        for session_id in self.registry.session_ids() {
            self.stop_round(&session_id, "§cThe server is shutting down");
        }
        if let Some(handle) = self.reconcile_task.take() {
            self.scheduler.cancel(handle);
        }
        info!("Lucky Pillar disabled");
    }

    /// Re-read the configuration file.
    pub fn reload_config(&mut self) {
        let config = self.store.load();
        self.apply_config(config);
        info!("Configuration reloaded");
    }

    /// Replace the configuration with the built-in default.
    pub fn reset_config(&mut self) {
        let config = self.store.reset();
        self.apply_config(config);
        info!("Configuration reset to defaults");
    }

    fn apply_config(&mut self, config: PluginConfig) {
        self.config = config;
        self.items = item_table(&self.config.item_pool);

        for session_id in self.registry.session_ids() {
            if !self.config.sessions.contains_key(&session_id) {
                self.stop_round(&session_id, "§cThe session no longer exists");
                self.discard_runtime(&session_id);
            }
        }
        for (session_id, session) in &self.config.sessions {
            self.registry.ensure(session_id, session);
        }
    }

    fn discard_runtime(&mut self, session_id: &str) {
        self.cancel_session_tasks(session_id);
        if let Some(runtime) = self.registry.remove(session_id) {
            if let Some(bar) = runtime.boss_bar {
                self.host.remove_boss_bar(bar);
            }
        }
        self.pending_wait_areas.remove(session_id);
    }

    fn persist(&self) -> Result<(), AdminError> {
        self.store.save(&self.config).map_err(|e| {
            error!(error = %e, "Failed to save configuration");
            AdminError::from(e)
        })
    }

    fn sender_block(&self, sender: &str) -> Result<BlockPos, AdminError> {
        self.host
            .location(sender)
            .map(BlockPos::from_location)
            .ok_or(AdminError::NoPosition)
    }

    // --- Admin operations ---

    /// Create a session centred on the sender. Returns its ID.
    pub fn add_session(&mut self, sender: &str, name: &str) -> Result<String, AdminError> {
        let center = self.sender_block(sender)?;
        let session_id = self.config.next_session_id();
        let session = SessionConfig::new(name, center);

        self.registry.ensure(&session_id, &session);
        self.config.sessions.insert(session_id.clone(), session);
        self.persist()?;

        info!(session_id = %session_id, name, "Session created");
        Ok(session_id)
    }

    /// Delete a session, stopping any round in progress.
    pub fn remove_session(&mut self, session_id: &str) -> Result<(), AdminError> {
        if !self.config.sessions.contains_key(session_id) {
            return Err(AdminError::UnknownSession(session_id.to_string()));
        }

        self.stop_round(session_id, "§cThe session was deleted by an admin");
        self.config.sessions.remove(session_id);
        self.discard_runtime(session_id);
        self.persist()?;

        info!(session_id, "Session removed");
        Ok(())
    }

    pub fn set_center(&mut self, sender: &str, session_id: &str) -> Result<BlockPos, AdminError> {
        let pos = self.sender_block(sender)?;
        let session = self
            .config
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| AdminError::UnknownSession(session_id.to_string()))?;
        session.center_pos = pos;
        self.persist()?;
        Ok(pos)
    }

    fn editable_session(&mut self, session_id: &str) -> Result<&mut SessionConfig, AdminError> {
        let in_round = self
            .registry
            .get(session_id)
            .is_some_and(|r| r.state().is_in_round());
        let session = self
            .config
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| AdminError::UnknownSession(session_id.to_string()))?;
        if in_round {
            return Err(AdminError::RoundInProgress(session_id.to_string()));
        }
        Ok(session)
    }

    /// Append a pillar at the sender's position. Returns the pillar ID.
    pub fn add_pillar(&mut self, sender: &str, session_id: &str) -> Result<String, AdminError> {
        let pos = self.sender_block(sender)?;
        let session = self.editable_session(session_id)?;
        let pillar_id = session.next_pillar_id();
        session.pillars.insert(pillar_id.clone(), pos);
        self.persist()?;
        Ok(pillar_id)
    }

    /// Move an existing pillar to the sender's position.
    pub fn set_pillar(
        &mut self,
        sender: &str,
        session_id: &str,
        pillar_id: &str,
    ) -> Result<BlockPos, AdminError> {
        let pos = self.sender_block(sender)?;
        let session = self.editable_session(session_id)?;
        let pillar = session
            .pillars
            .get_mut(pillar_id)
            .ok_or_else(|| AdminError::UnknownPillar {
                session_id: session_id.to_string(),
                pillar_id: pillar_id.to_string(),
            })?;
        *pillar = pos;
        self.persist()?;
        Ok(pos)
    }

    pub fn remove_pillar(&mut self, session_id: &str, pillar_id: &str) -> Result<(), AdminError> {
        let session = self.editable_session(session_id)?;
        if session.pillars.remove(pillar_id).is_none() {
            return Err(AdminError::UnknownPillar {
                session_id: session_id.to_string(),
                pillar_id: pillar_id.to_string(),
            });
        }
        self.persist()
    }

    /// Record one wait-area corner. The second call completes the box.
    pub fn set_wait_area(
        &mut self,
        sender: &str,
        session_id: &str,
    ) -> Result<WaitAreaStep, AdminError> {
        if !self.config.sessions.contains_key(session_id) {
            return Err(AdminError::UnknownSession(session_id.to_string()));
        }
        let pos = self.sender_block(sender)?;

        let Some(first) = self.pending_wait_areas.remove(session_id) else {
            self.pending_wait_areas.insert(session_id.to_string(), pos);
            return Ok(WaitAreaStep::FirstCorner(pos));
        };

        let region = Region::new(first, pos);
        if let Some(session) = self.config.sessions.get_mut(session_id) {
            session.wait_area = Some(region);
        }
        self.persist()?;
        info!(session_id, area = %region, "Wait area set");
        Ok(WaitAreaStep::Completed(region))
    }

    // --- Membership ---

    /// Online registered players of a session.
    pub(crate) fn present_count(&self, runtime: &SessionRuntime) -> usize {
        runtime
            .players()
            .iter()
            .filter(|p| self.host.is_online(p))
            .count()
    }

    pub(crate) fn in_wait_area(&self, player: &str, session_id: &str) -> bool {
        let Some(area) = self.session_config(session_id).and_then(|s| s.wait_area) else {
            return false;
        };
        self.host
            .location(player)
            .is_some_and(|loc| area.contains(loc))
    }

    /// Register a player with a session that has not started its round.
    pub fn join(&mut self, player: &str, session_id: &str) -> bool {
        let Some(session) = self.config.sessions.get(session_id) else {
            return false;
        };
        let name = session.name.clone();
        if !self.registry.ensure(session_id, session).state().is_pre_round() {
            return false;
        }

        if let Some(current) = self.registry.session_of(player) {
            if current == session_id {
                return false;
            }
            self.leave(player, false);
        }

        if let Err(e) = self.registry.join(session_id, player) {
            warn!(player, session_id, error = %e, "Join rejected");
            return false;
        }

        self.host.send_message(
            player,
            &format!("§aYou entered the wait area of {}!", name),
        );
        debug!(player, session_id, "Player joined");
        self.refresh_displays(session_id);
        true
    }

    /// Remove a player from whatever session they are in.
    pub fn leave(&mut self, player: &str, silent: bool) -> Option<String> {
        let Ok(session_id) = self.registry.leave(player) else {
            if !silent {
                self.host.send_message(player, "§cYou are not in any session!");
            }
            return None;
        };

        let (state, bar) = match self.registry.get(&session_id) {
            Some(runtime) => (runtime.state(), runtime.boss_bar),
            None => (SessionState::Idle, None),
        };
        if let Some(bar) = bar {
            self.host.hide_boss_bar(bar, player);
        }
        self.host.hide_scoreboard(&objective_name(&session_id), player);

        if state.is_in_round() && self.host.is_online(player) {
            if let Err(e) = self.host.set_movement_enabled(player, true) {
                warn!(player = %player, error = %e, "Failed to restore movement");
            }
            self.host.set_game_mode(player, GameMode::Adventure);
        }
        if !silent {
            self.host.send_message(player, "§eYou left the game.");
        }
        debug!(player, session_id = %session_id, "Player left");

        if state == SessionState::Running {
            self.check_winner(&session_id);
        } else {
            self.refresh_displays(&session_id);
        }
        Some(session_id)
    }

    /// Host death event.
    pub fn on_player_death(&mut self, player: &str) {
        let Some(session_id) = self.registry.session_of(player).map(str::to_string) else {
            return;
        };
        let Some(runtime) = self.registry.get_mut(&session_id) else {
            return;
        };
        if runtime.state() != SessionState::Running {
            return;
        }
        runtime.eliminate(player);
        let handle = self.scheduler.run_later(
            Task::session(
                &session_id,
                TaskKind::DeathFollowUp {
                    player: player.to_string(),
                },
            ),
            1,
        );
        runtime.track_task(handle);
        info!(player, session_id = %session_id, alive = runtime.alive_count(), "Player eliminated");
    }

    /// Host disconnect event.
    pub fn on_player_quit(&mut self, player: &str) {
        self.leave(player, true);
    }

    // --- Rounds ---

    /// Admin start: validate, teleport everyone to a shuffled pillar, freeze
    /// them and arm the countdown.
    pub fn start_round(&mut self, session_id: &str) -> Result<(), AdminError> {
        let session = self
            .session_config(session_id)
            .cloned()
            .ok_or_else(|| AdminError::UnknownSession(session_id.to_string()))?;
        let runtime = self.registry.ensure(session_id, &session);

        if runtime.state().is_in_round() {
            return Err(AdminError::RoundInProgress(session_id.to_string()));
        }
        let current = runtime.player_count();
        if current < session.min_players {
            return Err(AdminError::NotEnoughPlayers {
                current,
                required: session.min_players,
            });
        }
        if session.pillars.is_empty() {
            return Err(AdminError::NoPillars(session_id.to_string()));
        }
        runtime
            .apply(SessionEvent::StartCountdown)
            .map_err(|_| AdminError::NotEnoughPlayers {
                current,
                required: session.min_players,
            })?;
        runtime.begin_round(&session.border);
        let players = runtime.players().to_vec();

        if let Err(e) = self.host.dispatch_command("gamerule doimmediaterespawn true") {
            warn!(error = %e, "Failed to set immediate respawn");
        }

        let mut pillars: Vec<BlockPos> = session.pillars.values().copied().collect();
        pillars.shuffle(&mut self.rng);
        for (i, player) in players.iter().enumerate() {
            // Players beyond capacity stay put; they are evicted when the round goes live
            if let Some(pillar) = pillars.get(i) {
                if let Err(e) = self.host.teleport(player, pillar.standing_point()) {
                    warn!(player = %player, error = %e, "Failed to teleport to pillar");
                }
            }
            if let Err(e) = self.host.clear_inventory(player) {
                warn!(player = %player, error = %e, "Failed to clear inventory");
            }
            if let Err(e) = self.host.set_movement_enabled(player, false) {
                warn!(player = %player, error = %e, "Failed to freeze player");
            }
            self.host.set_game_mode(player, GameMode::Survival);
        }

        let handle = self.scheduler.run_repeating(
            Task::session(session_id, TaskKind::Countdown),
            0,
            TICKS_PER_SECOND,
        );
        if let Some(runtime) = self.registry.get_mut(session_id) {
            runtime.track_task(handle);
        }

        info!(session_id, players = players.len(), "Round countdown started");
        Ok(())
    }

    /// Cancel every task owned by a session.
    pub(crate) fn cancel_session_tasks(&mut self, session_id: &str) {
        let Some(runtime) = self.registry.get_mut(session_id) else {
            return;
        };
        for handle in runtime.take_tasks() {
            self.scheduler.cancel(handle);
        }
    }

    /// Forget tracked handles that have already fired.
    pub(crate) fn prune_finished_tasks(&mut self, session_id: &str) {
        let scheduler = &self.scheduler;
        if let Some(runtime) = self.registry.get_mut(session_id) {
            runtime.retain_tasks(|handle| scheduler.is_scheduled(handle));
        }
    }

    /// End a round (or a countdown) and reset the session to idle.
    /// A no-op for idle or unknown sessions.
    pub fn stop_round(&mut self, session_id: &str, message: &str) -> Option<RoundOutcome> {
        let runtime = self.registry.get_mut(session_id)?;
        let was_running = runtime.state() == SessionState::Running;
        if runtime.apply(SessionEvent::Finish).is_err() {
            return None;
        }
        let winner = if was_running {
            runtime.winner().map(str::to_string)
        } else {
            None
        };
        let elapsed = runtime.elapsed;
        let participants = runtime.players().to_vec();
        let bar = runtime.boss_bar.take();

        self.cancel_session_tasks(session_id);

        let session = self.session_config(session_id).cloned();
        let objective = objective_name(session_id);
        for player in &participants {
            if !self.host.is_online(player) {
                continue;
            }
            self.host.send_title(
                player,
                "§6Game Over",
                message,
                TitleTiming::new(10, 60, 10),
            );
            self.host.set_game_mode(player, GameMode::Adventure);
            if let Err(e) = self.host.set_movement_enabled(player, true) {
                warn!(player = %player, error = %e, "Failed to restore movement");
            }
            if let Err(e) = self.host.clear_inventory(player) {
                warn!(player = %player, error = %e, "Failed to clear inventory");
            }
            self.host.hide_scoreboard(&objective, player);

            let Some(session) = &session else { continue };
            let center = session.center_pos.standing_point();
            if let Err(e) = self.host.teleport(player, center) {
                warn!(player = %player, error = %e, "Failed to teleport to center");
            }
            let sounds = &session.sounds;
            if sounds.enabled {
                self.host.play_sound(
                    player,
                    center,
                    &sounds.game_end_sound,
                    sounds.game_end_volume,
                    sounds.game_end_pitch,
                );
            }
        }

        self.registry.release_all(session_id);
        if let Err(e) = self.host.dispatch_command("kill @e[type=ghast]") {
            warn!(error = %e, "Failed to clear ghasts");
        }
        if let Some(bar) = bar {
            self.host.remove_boss_bar(bar);
        }
        if let Some(runtime) = self.registry.get_mut(session_id) {
            runtime.reset_after_round();
        }

        let outcome = RoundOutcome {
            session_id: session_id.to_string(),
            winner,
            message: message.to_string(),
            elapsed,
            participants,
            ended_at: Utc::now(),
        };
        info!(
            session_id,
            winner = ?outcome.winner,
            elapsed = outcome.elapsed,
            "Round stopped: {}",
            message
        );
        Some(outcome)
    }

    /// End the round if at most one participant is left standing.
    pub(crate) fn check_winner(&mut self, session_id: &str) -> Option<RoundOutcome> {
        let runtime = self.registry.get(session_id)?;
        if runtime.state() != SessionState::Running {
            return None;
        }
        match runtime.alive_count() {
            0 => self.stop_round(session_id, "§cNo survivors"),
            1 => {
                let winner = runtime.winner().map(str::to_string).unwrap_or_default();
                self.stop_round(
                    session_id,
                    &format!("§6Round over! The winner is: §l{}", winner),
                )
            }
            _ => None,
        }
    }

    // --- Displays ---

    /// Recompute the pre-round state and republish both displays.
    pub fn refresh_displays(&mut self, session_id: &str) {
        let Some(session) = self.session_config(session_id) else {
            return;
        };
        let min_players = session.min_players;
        let Some(runtime) = self.registry.get(session_id) else {
            return;
        };
        let present = self.present_count(runtime);
        if let Some(runtime) = self.registry.get_mut(session_id) {
            runtime.refresh_membership_state(present, min_players);
        }
        self.update_boss_bar(session_id);
        self.update_scoreboard(session_id);
    }

    /// Whether a player should see this session's displays.
    fn sees_displays_of(&self, player: &str, session_id: &str) -> bool {
        self.registry.session_of(player) == Some(session_id) || self.in_wait_area(player, session_id)
    }

    pub(crate) fn update_boss_bar(&mut self, session_id: &str) {
        let (Some(session), Some(runtime)) = (
            self.config.sessions.get(session_id),
            self.registry.get(session_id),
        ) else {
            return;
        };
        let view = boss_bar_view(runtime, session, self.present_count(runtime));

        let bar = match runtime.boss_bar {
            Some(bar) => {
                if let Err(e) = self.host.update_boss_bar(bar, &view) {
                    warn!(session_id, error = %e, "Failed to update boss bar");
                }
                bar
            }
            None => match self.host.create_boss_bar(&view) {
                Ok(bar) => {
                    if let Some(runtime) = self.registry.get_mut(session_id) {
                        runtime.boss_bar = Some(bar);
                    }
                    bar
                }
                Err(e) => {
                    warn!(session_id, error = %e, "Failed to create boss bar");
                    return;
                }
            },
        };

        for player in self.host.online_players() {
            if self.sees_displays_of(&player, session_id) {
                self.host.show_boss_bar(bar, &player);
            } else {
                self.host.hide_boss_bar(bar, &player);
            }
        }
    }

    pub(crate) fn update_scoreboard(&mut self, session_id: &str) {
        let (Some(session), Some(runtime)) = (
            self.config.sessions.get(session_id),
            self.registry.get(session_id),
        ) else {
            return;
        };
        let Some(view) = scoreboard_view(runtime, session, self.present_count(runtime)) else {
            return;
        };

        if let Err(e) = self.host.publish_scoreboard(&view) {
            error!(session_id, error = %e, "Failed to publish scoreboard");
            return;
        }
        if let Some(runtime) = self.registry.get_mut(session_id) {
            runtime.scoreboard = Some(view.objective.clone());
        }
        for player in self.host.online_players() {
            if !self.sees_displays_of(&player, session_id) {
                self.host.hide_scoreboard(&view.objective, &player);
            }
        }
    }

    // --- Player-facing helpers ---

    /// Send the session listing to a player.
    pub fn describe_sessions(&mut self, player: &str) {
        if self.config.sessions.is_empty() {
            self.host.send_message(player, "§cThere are no sessions available.");
            return;
        }

        let mut lines = vec!["§e===== Lucky Pillar - Sessions =====".to_string()];
        for (session_id, session) in &self.config.sessions {
            let (state, count) = self
                .registry
                .get(session_id)
                .map(|r| (r.state(), r.player_count()))
                .unwrap_or_default();
            lines.push(format!("§6Session {}: §f{}", session_id, session.name));
            lines.push(format!("  State: {} §r| §b{} players", state.label(), count));
            lines.push(format!("  Center: §e{}", session.center_pos));
            match session.wait_area {
                Some(area) => lines.push(format!("  Wait area: §e{}", area)),
                None => lines.push("  Wait area: §cnot set".to_string()),
            }
        }
        lines.push("§e===================================".to_string());

        for line in lines {
            self.host.send_message(player, &line);
        }
    }

    /// Teleport a player to a session's center.
    pub fn teleport_to_center(&mut self, player: &str, session_id: &str) -> Result<(), AdminError> {
        let center = self
            .session_config(session_id)
            .map(|s| s.center_pos.standing_point())
            .ok_or_else(|| AdminError::UnknownSession(session_id.to_string()))?;
        if let Err(e) = self.host.teleport(player, center) {
            warn!(player = %player, error = %e, "Failed to teleport to center");
            return Ok(());
        }
        self.host.send_message(
            player,
            &format!("§aTeleported to the center of session {}!", session_id),
        );
        Ok(())
    }

    /// Snapshot of every runtime for status reporting.
    pub fn status_json(&self) -> serde_json::Value {
        let sessions: Vec<serde_json::Value> =
            self.registry.runtimes().map(|r| r.to_json()).collect();
        serde_json::json!({
            "sessions": sessions,
            "indexed_players": self.registry.indexed_players(),
        })
    }

    /// Where evicted and withdrawn players are sent.
    pub(crate) fn wait_point(&self, session_id: &str) -> Option<Vec3> {
        let session = self.session_config(session_id)?;
        Some(match session.wait_area {
            Some(area) => Vec3::new(
                f64::from(area.pos1.x) - 0.5,
                f64::from(area.pos1.y),
                f64::from(area.pos1.z) + 0.5,
            ),
            None => session.center_pos.standing_point(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::host::BarColor;
    use super::super::tasks::TickScheduler;
    use super::super::testing::FakeHost;
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    type Service = PillarService<FakeHost, TickScheduler>;

    const WAIT: Vec3 = Vec3 {
        x: 0.5,
        y: 100.0,
        z: 0.5,
    };

    fn service() -> (Service, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let mut service = PillarService::with_seed(FakeHost::new(), TickScheduler::new(), store, 42);
        service.enable();
        (service, dir)
    }

    fn with_players(players: &[&str]) -> (Service, TempDir) {
        let (mut service, dir) = service();
        for player in players {
            service.host_mut().connect(player, WAIT);
            assert!(service.join(player, "1"));
        }
        (service, dir)
    }

    fn go_live(service: &mut Service) {
        service.start_round("1").unwrap();
        service.run_pending();
        service.run_ticks(200);
        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Running);
    }

    #[test]
    fn test_enable_writes_default_config() {
        let (service, dir) = service();
        assert!(dir.path().join("config.json").exists());
        assert_eq!(service.config().sessions.len(), 1);
        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Idle);
        assert_eq!(
            service
                .host()
                .commands_containing("gamerule doimmediaterespawn true")
                .len(),
            1
        );
        assert_eq!(service.scheduler().pending(), 1);
    }

    #[test]
    fn test_disable_cancels_everything() {
        let (mut service, _dir) = with_players(&["Alex", "Steve"]);
        go_live(&mut service);
        service.disable();
        assert_eq!(service.scheduler().pending(), 0);
        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Idle);
    }

    #[test]
    fn test_membership_drives_state_and_bar() {
        let (mut service, _dir) = with_players(&["Alex"]);
        let runtime = service.runtime("1").unwrap();
        assert_eq!(runtime.state(), SessionState::Waiting);
        let bar = runtime.boss_bar.unwrap();
        assert_eq!(service.host().bars[&bar.0].color, BarColor::Yellow);

        service.host_mut().connect("Steve", WAIT);
        service.join("Steve", "1");
        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Ready);
        assert_eq!(service.host().bars[&bar.0].color, BarColor::Green);
        assert!(service.host().bar_viewers[&bar.0].contains("Steve"));

        service.host_mut().move_to("Steve", Vec3::new(80.0, 100.0, 80.0));
        service.leave("Steve", false);
        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Waiting);
        assert!(!service.host().bar_viewers[&bar.0].contains("Steve"));
    }

    #[test]
    fn test_join_moves_between_sessions() {
        let (mut service, _dir) = with_players(&["Alex"]);
        let second = service.add_session("Alex", "Second").unwrap();
        assert_eq!(second, "2");

        assert!(service.join("Alex", "2"));
        assert_eq!(service.registry().session_of("Alex"), Some("2"));
        assert!(!service.runtime("1").unwrap().has_player("Alex"));
        assert!(service.registry().is_consistent());

        // Same session again is a no-op
        assert!(!service.join("Alex", "2"));
        assert!(!service.join("Alex", "404"));
    }

    #[test]
    fn test_join_refused_during_round() {
        let (mut service, _dir) = with_players(&["Alex", "Steve"]);
        service.start_round("1").unwrap();
        service.host_mut().connect("Late", WAIT);
        assert!(!service.join("Late", "1"));
        assert_eq!(service.registry().session_of("Late"), None);
    }

    #[test]
    fn test_start_validation() {
        let (mut service, _dir) = with_players(&["Alex"]);
        assert!(matches!(
            service.start_round("1"),
            Err(AdminError::NotEnoughPlayers {
                current: 1,
                required: 2
            })
        ));
        assert!(matches!(
            service.start_round("9"),
            Err(AdminError::UnknownSession(_))
        ));

        let second = service.add_session("Alex", "Bare").unwrap();
        service.host_mut().connect("Steve", WAIT);
        service.join("Alex", &second);
        service.join("Steve", &second);
        assert!(matches!(
            service.start_round(&second),
            Err(AdminError::NoPillars(_))
        ));

        service.join("Alex", "1");
        service.join("Steve", "1");
        service.start_round("1").unwrap();
        assert!(matches!(
            service.start_round("1"),
            Err(AdminError::RoundInProgress(_))
        ));
    }

    #[test]
    fn test_start_teleports_to_distinct_pillars() {
        let (mut service, _dir) = with_players(&["Alex", "Steve"]);
        service.start_round("1").unwrap();

        let alex = service.host().location("Alex").unwrap();
        let steve = service.host().location("Steve").unwrap();
        assert_ne!(alex, steve);
        let pillars: Vec<Vec3> = service.config().sessions["1"]
            .pillars
            .values()
            .map(|p| p.standing_point())
            .collect();
        assert!(pillars.contains(&alex));
        assert!(pillars.contains(&steve));
        assert_eq!(service.host().commands_containing("clear \"Alex\"").len(), 1);
    }

    #[test]
    fn test_two_player_round_end_to_end() {
        let (mut service, _dir) = with_players(&["Alex", "Steve"]);
        go_live(&mut service);

        service.on_player_death("Alex");
        assert_eq!(service.runtime("1").unwrap().alive_count(), 1);
        service.run_ticks(1);

        let runtime = service.runtime("1").unwrap();
        assert_eq!(runtime.state(), SessionState::Idle);
        assert!(runtime.players().is_empty());
        assert_eq!(service.registry().indexed_players(), 0);
        assert_eq!(service.scheduler().pending_for("1"), 0);
        assert_eq!(service.host().commands_containing("kill @e[type=ghast]").len(), 1);
        assert_eq!(service.host().removed_bars.len(), 1);
        assert!(service
            .host()
            .titles
            .iter()
            .any(|(p, t, sub)| p == "Alex" && t == "§6Game Over" && sub.contains("Steve")));
        assert_eq!(service.host().game_modes["Steve"], GameMode::Adventure);
        assert_eq!(service.host().sounds_named("mob.wither.death"), 2);
    }

    #[test]
    fn test_stop_reports_outcome_and_cancels_follow_up() {
        let (mut service, _dir) = with_players(&["Alex", "Steve"]);
        go_live(&mut service);
        service.run_ticks(40);
        service.on_player_death("Steve");

        let outcome = service.stop_round("1", "§cStopped").unwrap();
        assert_eq!(outcome.winner.as_deref(), Some("Alex"));
        assert_eq!(outcome.elapsed, 3);
        assert_eq!(outcome.participants, vec!["Alex".to_string(), "Steve".to_string()]);
        assert_eq!(service.scheduler().pending_for("1"), 0);

        // Idempotent, and the pending follow-up never fires
        assert_eq!(service.stop_round("1", "§cStopped"), None);
        service.run_ticks(5);
        assert!(!service
            .host()
            .messages_for("Steve")
            .iter()
            .any(|m| m.contains("spectating")));
        assert_eq!(service.host().commands_containing("kill @e[type=ghast]").len(), 1);
    }

    #[test]
    fn test_elimination_turns_spectator() {
        let (mut service, _dir) = with_players(&["Alex", "Steve", "Herobrine"]);
        go_live(&mut service);
        service.on_player_death("Herobrine");
        service.run_ticks(1);

        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Running);
        assert_eq!(service.host().game_modes["Herobrine"], GameMode::Spectator);
        assert_eq!(service.runtime("1").unwrap().alive_count(), 2);
        // Still a participant for display purposes
        assert_eq!(service.registry().session_of("Herobrine"), Some("1"));
    }

    #[test]
    fn test_death_outside_round_is_ignored() {
        let (mut service, _dir) = with_players(&["Alex", "Steve"]);
        service.on_player_death("Alex");
        service.on_player_death("Nobody");
        assert_eq!(service.scheduler().pending_for("1"), 0);
        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Ready);
    }

    #[test]
    fn test_quit_during_round_ends_it() {
        let (mut service, _dir) = with_players(&["Alex", "Steve"]);
        go_live(&mut service);
        service.host_mut().disconnect("Alex");
        service.on_player_quit("Alex");

        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Idle);
        assert_eq!(service.registry().session_of("Alex"), None);
        assert_eq!(service.registry().session_of("Steve"), None);
    }

    #[test]
    fn test_quit_during_countdown_keeps_counting() {
        let (mut service, _dir) = with_players(&["Alex", "Steve", "Herobrine"]);
        service.start_round("1").unwrap();
        service.host_mut().disconnect("Herobrine");
        service.on_player_quit("Herobrine");

        let runtime = service.runtime("1").unwrap();
        assert_eq!(runtime.state(), SessionState::Countdown);
        assert_eq!(runtime.player_count(), 2);
        assert_eq!(runtime.alive_count(), 2);
        service.run_pending();
        service.run_ticks(200);
        assert_eq!(service.runtime("1").unwrap().state(), SessionState::Running);
    }

    #[test]
    fn test_pillar_edits_refused_in_round() {
        let (mut service, _dir) = with_players(&["Alex", "Steve"]);
        service.start_round("1").unwrap();
        assert!(matches!(
            service.add_pillar("Alex", "1"),
            Err(AdminError::RoundInProgress(_))
        ));
        assert!(matches!(
            service.remove_pillar("1", "1"),
            Err(AdminError::RoundInProgress(_))
        ));
        assert_eq!(service.config().sessions["1"].pillars.len(), 9);
    }

    #[test]
    fn test_reload_drops_deleted_sessions() {
        let (mut service, dir) = with_players(&["Alex"]);
        service.add_session("Alex", "Temp").unwrap();
        assert!(service.runtime("2").is_some());

        let store = ConfigStore::new(dir.path().join("config.json"));
        let mut config = service.config().clone();
        config.sessions.remove("2");
        store.save(&config).unwrap();

        service.reload_config();
        assert!(service.runtime("2").is_none());
        assert!(service.runtime("1").is_some());
        assert!(service.registry().is_consistent());
    }

    #[test]
    fn test_status_json() {
        let (service, _dir) = with_players(&["Alex"]);
        let json = service.status_json();
        assert_eq!(json["indexed_players"], 1);
        assert_eq!(json["sessions"][0]["state"], "waiting");
        assert_eq!(json["sessions"][0]["players"][0], "Alex");
    }
}
