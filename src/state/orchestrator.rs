//! Scheduled round callbacks.
//!
//! Every callback re-checks that its session is still in the state it was
//! armed for; a late firing after cancellation is a silent no-op.

use super::config::TICKS_PER_SECOND;
use super::host::{GameMode, Host, TitleTiming};
use super::machine::{SessionEvent, SessionState};
use super::region::Vec3;
use super::service::PillarService;
use super::tasks::{Scheduler, Task, TaskKind, TickScheduler};
use super::weighted::{triggered_event, RandomEvent};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error, info, warn};

/// Largest number of ghasts a single event summons.
const MAX_GHASTS: usize = 5;

/// Ticks between TNT drops during a rain.
const TNT_DROP_SPACING: u64 = 5;

/// Status effect events: effect id, seconds, amplifier, announcement.
fn effect_for(event: RandomEvent) -> Option<(&'static str, u32, u32, &'static str)> {
    match event {
        RandomEvent::Darkness => Some(("darkness", 10, 1, "§8[Event] §7Darkness falls over the arena...")),
        RandomEvent::Blindness => Some(("blindness", 10, 1, "§8[Event] §7You have been blinded!")),
        RandomEvent::Slowness => Some(("slowness", 10, 2, "§8[Event] §7Your legs feel heavy...")),
        RandomEvent::Levitation => Some(("levitation", 5, 1, "§8[Event] §7You start to float!")),
        RandomEvent::TntRain | RandomEvent::Ghast | RandomEvent::Lightning => None,
    }
}

impl<H: Host, S: Scheduler> PillarService<H, S> {
    /// Dispatch a fired task.
    pub fn run_task(&mut self, task: Task) {
        let (session_id, kind) = match task {
            Task::Reconcile => {
                self.reconcile();
                return;
            }
            Task::Session { session_id, kind } => (session_id, kind),
        };
        if !self.registry.contains(&session_id) {
            debug!(session_id = %session_id, task = kind.as_str(), "Task for unknown session dropped");
            return;
        }
        if matches!(kind, TaskKind::TntDrop | TaskKind::DeathFollowUp { .. }) {
            self.prune_finished_tasks(&session_id);
        }

        match kind {
            TaskKind::Countdown => self.countdown_tick(&session_id),
            TaskKind::GameTimer => self.game_timer_tick(&session_id),
            TaskKind::ItemDrop => self.give_random_items(&session_id),
            TaskKind::RandomEvent => self.trigger_random_event(&session_id),
            TaskKind::BorderCheck => self.check_border(&session_id),
            TaskKind::Particles => self.show_border_particles(&session_id),
            TaskKind::Scoreboard => self.scoreboard_tick(&session_id),
            TaskKind::TntDrop => self.drop_tnt(&session_id),
            TaskKind::DeathFollowUp { player } => self.death_follow_up(&session_id, &player),
        }
    }

    fn is_running(&self, session_id: &str) -> bool {
        self.registry
            .get(session_id)
            .is_some_and(|r| r.state() == SessionState::Running)
    }

    /// Alive participants that are currently online, in join order.
    fn alive_online(&self, session_id: &str) -> Vec<String> {
        self.registry
            .get(session_id)
            .map(|r| r.alive_players())
            .unwrap_or_default()
            .into_iter()
            .filter(|p| self.host.is_online(p))
            .collect()
    }

    /// One second of countdown: announce, tick the pitch up, go live at zero.
    pub(crate) fn countdown_tick(&mut self, session_id: &str) {
        let Some(runtime) = self.registry.get(session_id) else {
            return;
        };
        if runtime.state() != SessionState::Countdown {
            return;
        }
        if runtime.countdown == 0 {
            self.begin_running(session_id);
            return;
        }
        let remaining = runtime.countdown;
        let players = runtime.players().to_vec();

        self.update_boss_bar(session_id);
        self.update_scoreboard(session_id);

        let sounds = self.session_config(session_id).map(|s| s.sounds.clone());
        for player in &players {
            self.host.send_title(
                player,
                "§l§eCountdown",
                &format!("§eThe round starts in §c{} §eseconds!", remaining),
                TitleTiming::new(0, 20, 0),
            );
            let Some(sounds) = sounds.as_ref().filter(|s| s.enabled) else {
                continue;
            };
            if remaining > 5 {
                continue;
            }
            if let Some(at) = self.host.location(player) {
                let pitch = sounds.countdown_pitch + (5 - remaining) as f32 * 0.2;
                self.host.play_sound(
                    player,
                    at,
                    &sounds.countdown_sound,
                    sounds.countdown_volume,
                    pitch,
                );
            }
        }

        if let Some(runtime) = self.registry.get_mut(session_id) {
            runtime.countdown -= 1;
        }
    }

    /// Countdown reached zero: enforce capacity, unfreeze and arm the timers.
    pub(crate) fn begin_running(&mut self, session_id: &str) {
        self.cancel_session_tasks(session_id);
        let Some(session) = self.session_config(session_id).cloned() else {
            return;
        };
        let Some(runtime) = self.registry.get(session_id) else {
            return;
        };
        let capacity = session.max_players();
        let players = runtime.players().to_vec();

        if players.len() > capacity {
            let excess = players.len() - capacity;
            let evicted: Vec<String> = players
                .choose_multiple(&mut self.rng, excess)
                .cloned()
                .collect();
            let wait_point = self.wait_point(session_id);
            let bar = runtime.boss_bar;

            for player in &evicted {
                if let Err(e) = self.registry.leave(player) {
                    warn!(player = %player, error = %e, "Evicted player was not indexed");
                }
                if let Some(bar) = bar {
                    self.host.hide_boss_bar(bar, player);
                }
                if let Some(at) = wait_point {
                    if let Err(e) = self.host.teleport(player, at) {
                        warn!(player = %player, error = %e, "Failed to return evicted player");
                    }
                }
                if let Err(e) = self.host.set_movement_enabled(player, true) {
                    warn!(player = %player, error = %e, "Failed to restore movement");
                }
                self.host.set_game_mode(player, GameMode::Adventure);
                self.host.send_message(
                    player,
                    "§cSorry, the session is full. You have been removed from this round.",
                );
            }

            let notice = format!(
                "§eToo many players (capacity {}). {} were removed at random.",
                capacity, excess
            );
            for player in players.iter().filter(|p| !evicted.contains(p)) {
                self.host.send_message(player, &notice);
            }
            info!(session_id, evicted = ?evicted, "Over capacity, players evicted");
        }

        let Some(runtime) = self.registry.get_mut(session_id) else {
            return;
        };
        if let Err(e) = runtime.apply(SessionEvent::CountdownFinished) {
            error!(session_id, error = %e, "Cannot go live");
            return;
        }
        runtime.round_started_at = Some(Utc::now());
        let participants = runtime.players().to_vec();
        let alive = runtime.alive_count();

        for player in &participants {
            if let Err(e) = self.host.set_movement_enabled(player, true) {
                warn!(player = %player, error = %e, "Failed to unfreeze player");
            }
            self.host
                .send_title(player, "§aGo!", "§7Good luck!", TitleTiming::new(10, 40, 10));
        }

        if alive == 0 {
            self.stop_round(session_id, "§cNo survivors");
            return;
        }

        let tasks = &session.tasks;
        let timers = [
            (TaskKind::GameTimer, 0, TICKS_PER_SECOND),
            (TaskKind::ItemDrop, tasks.item_interval, tasks.item_interval),
            (TaskKind::RandomEvent, tasks.event_interval, tasks.event_interval),
            (
                TaskKind::BorderCheck,
                tasks.border_check_interval,
                tasks.border_check_interval,
            ),
            (TaskKind::Particles, 100, tasks.particle_interval),
            (
                TaskKind::Scoreboard,
                0,
                tasks.scoreboard_update_interval,
            ),
        ];
        for (kind, delay, period) in timers {
            let handle = self.scheduler.run_repeating(
                Task::session(session_id, kind),
                delay,
                period.max(1),
            );
            if let Some(runtime) = self.registry.get_mut(session_id) {
                runtime.track_task(handle);
            }
        }

        info!(session_id, players = participants.len(), "Round is live");
        self.show_border_particles(session_id);
        self.refresh_displays(session_id);
    }

    fn game_timer_tick(&mut self, session_id: &str) {
        let Some(runtime) = self.registry.get_mut(session_id) else {
            return;
        };
        if runtime.state() != SessionState::Running {
            return;
        }
        runtime.elapsed += 1;
        self.update_boss_bar(session_id);
    }

    /// One weighted draw per alive participant. A failed grant is logged
    /// and the rest still receive theirs.
    fn give_random_items(&mut self, session_id: &str) {
        if !self.is_running(session_id) {
            return;
        }
        for player in self.alive_online(session_id) {
            let Some(item) = self.items.pick(&mut self.rng).cloned() else {
                warn!("Item pool is empty, nothing to give");
                return;
            };
            match self.host.give_item(&player, &item, 1) {
                Ok(()) => self
                    .host
                    .send_tip(&player, &format!("§aYou received: §f{}", item)),
                Err(e) => error!(player = %player, item = %item, error = %e, "Failed to give item"),
            }
        }
    }

    /// Fire the event bound to the cycle that just completed.
    fn trigger_random_event(&mut self, session_id: &str) {
        let Some(session) = self.session_config(session_id) else {
            return;
        };
        let period = session.tasks.event_period_secs();
        let Some(runtime) = self.registry.get(session_id) else {
            return;
        };
        if runtime.state() != SessionState::Running {
            return;
        }
        let event = triggered_event(runtime.elapsed, period);
        self.apply_event(session_id, event);
    }

    /// Apply one random event to the alive participants of a running session.
    pub(crate) fn apply_event(&mut self, session_id: &str, event: RandomEvent) {
        if !self.is_running(session_id) {
            return;
        }
        let targets = self.alive_online(session_id);
        info!(session_id, event = %event, targets = targets.len(), "Random event");

        if let Some((effect, seconds, amplifier, announcement)) = effect_for(event) {
            for player in &targets {
                let command = format!(
                    "effect \"{}\" {} {} {} true",
                    player, effect, seconds, amplifier
                );
                if let Err(e) = self.host.dispatch_command(&command) {
                    warn!(player = %player, error = %e, "Failed to apply effect");
                }
                self.host.send_message(player, announcement);
            }
            return;
        }

        match event {
            RandomEvent::Lightning => {
                for player in &targets {
                    if let Some(at) = self.host.location(player) {
                        let command =
                            format!("summon lightning_bolt {:.2} {:.2} {:.2}", at.x, at.y, at.z);
                        if let Err(e) = self.host.dispatch_command(&command) {
                            warn!(player = %player, error = %e, "Failed to summon lightning");
                        }
                    }
                    self.host
                        .send_message(player, "§8[Event] §eLightning strikes!");
                }
            }
            RandomEvent::TntRain => {
                let seconds: u64 = self.rng.gen_range(3..=5);
                let drops = seconds * TICKS_PER_SECOND / TNT_DROP_SPACING;
                for i in 0..drops {
                    let handle = self.scheduler.run_later(
                        Task::session(session_id, TaskKind::TntDrop),
                        i * TNT_DROP_SPACING,
                    );
                    if let Some(runtime) = self.registry.get_mut(session_id) {
                        runtime.track_task(handle);
                    }
                }
                for player in &targets {
                    self.host
                        .send_message(player, "§8[Event] §cTNT is raining from the sky!");
                }
            }
            RandomEvent::Ghast => self.summon_ghasts(&targets),
            _ => {}
        }
    }

    /// Ghasts above the centroid of the alive participants, at most five.
    fn summon_ghasts(&mut self, targets: &[String]) {
        let positions: Vec<Vec3> = targets
            .iter()
            .filter_map(|p| self.host.location(p))
            .collect();
        if positions.is_empty() {
            return;
        }
        let n = positions.len() as f64;
        let center = Vec3::new(
            positions.iter().map(|p| p.x).sum::<f64>() / n,
            positions.iter().map(|p| p.y).sum::<f64>() / n,
            positions.iter().map(|p| p.z).sum::<f64>() / n,
        );

        for i in 0..positions.len().min(MAX_GHASTS) {
            let x = center.x + self.rng.gen_range(-5.0..=5.0);
            let z = center.z + self.rng.gen_range(-5.0..=5.0);
            let y = center.y + 10.0 + i as f64 * 3.0;
            let command = format!("summon ghast {:.2} {:.2} {:.2}", x, y, z);
            if let Err(e) = self.host.dispatch_command(&command) {
                warn!(error = %e, "Failed to summon ghast");
            }
        }
        for player in targets {
            self.host
                .send_message(player, "§8[Event] §cGhasts have appeared!");
        }
    }

    /// One TNT above a random alive participant, somewhere inside the border.
    fn drop_tnt(&mut self, session_id: &str) {
        let Some(center) = self.session_config(session_id).map(|s| s.center_pos) else {
            return;
        };
        let Some(runtime) = self.registry.get(session_id) else {
            return;
        };
        if runtime.state() != SessionState::Running {
            return;
        }
        let radius = f64::from(runtime.border_radius);
        let targets = self.alive_online(session_id);
        let Some(target) = targets.choose(&mut self.rng) else {
            return;
        };
        let Some(at) = self.host.location(target) else {
            return;
        };

        let (cx, cz) = (f64::from(center.x), f64::from(center.z));
        let x = self.rng.gen_range(cx - radius..=cx + radius);
        let z = self.rng.gen_range(cz - radius..=cz + radius);
        let y = at.y + f64::from(self.rng.gen_range(10..=20_i32));
        let command = format!("summon tnt {:.2} {:.2} {:.2}", x, y, z);
        if let Err(e) = self.host.dispatch_command(&command) {
            warn!(error = %e, "Failed to drop TNT");
        }
    }

    /// Shrink when due, then damage everyone outside the radius.
    fn check_border(&mut self, session_id: &str) {
        let Some(session) = self.session_config(session_id).cloned() else {
            return;
        };
        let Some(runtime) = self.registry.get_mut(session_id) else {
            return;
        };
        if runtime.state() != SessionState::Running {
            return;
        }
        let shrunk = runtime.shrink_border(&session.border);
        let radius = runtime.border_radius;
        let targets = self.alive_online(session_id);

        if let Some(radius) = shrunk {
            info!(session_id, radius, "Border shrunk");
            let sounds = &session.sounds;
            for player in &targets {
                self.host.send_message(
                    player,
                    &format!("§cThe border is shrinking! Current radius: {} blocks", radius),
                );
                self.host.send_title(
                    player,
                    "§cWarning",
                    "§eThe border is shrinking!",
                    TitleTiming::new(10, 40, 10),
                );
                if sounds.enabled {
                    if let Some(at) = self.host.location(player) {
                        self.host.play_sound(
                            player,
                            at,
                            &sounds.border_shrink_sound,
                            sounds.border_shrink_volume,
                            sounds.border_shrink_pitch,
                        );
                    }
                }
            }
            self.update_scoreboard(session_id);
        }

        let center = Vec3::from(session.center_pos);
        for player in &targets {
            let Some(at) = self.host.location(player) else {
                continue;
            };
            if at.planar_distance(&center) <= f64::from(radius) {
                continue;
            }
            let command = format!(
                "damage \"{}\" {} magic",
                player, session.border.damage_per_second
            );
            if let Err(e) = self.host.dispatch_command(&command) {
                warn!(player = %player, error = %e, "Failed to apply border damage");
                continue;
            }
            if self.host.health(player).is_some_and(|h| h <= 0.0) {
                self.host
                    .send_message(player, "§cYou died outside the border!");
            }
        }
    }

    /// Draw the square border, clipped per viewer to a window around them.
    pub(crate) fn show_border_particles(&mut self, session_id: &str) {
        let Some(session) = self.session_config(session_id) else {
            return;
        };
        let particles = session.particles.clone();
        let center = session.center_pos;
        let Some(runtime) = self.registry.get(session_id) else {
            return;
        };
        if runtime.state() != SessionState::Running || !particles.enabled {
            return;
        }

        let radius = i64::from(runtime.border_radius);
        let (x_min, x_max) = (i64::from(center.x) - radius, i64::from(center.x) + radius);
        let (z_min, z_max) = (i64::from(center.z) - radius, i64::from(center.z) + radius);
        let y_top = i64::from(center.y) + i64::from(particles.particle_height);
        let y_bottom = i64::from(center.y) + i64::from(particles.particle_y_offset);
        let h_step = particles.horizontal_step.max(1) as usize;
        let v_step = particles.vertical_step.max(1) as usize;
        let view = i64::from(particles.view_distance);

        let viewers: Vec<String> = runtime
            .players()
            .iter()
            .filter(|p| self.host.is_online(p))
            .cloned()
            .collect();

        for player in &viewers {
            let Some(at) = self.host.location(player) else {
                continue;
            };
            let (px, pz) = (at.x.floor() as i64, at.z.floor() as i64);

            let mut points = Vec::new();
            for y in (y_bottom + 1..=y_top).rev().step_by(v_step) {
                for x in (x_min.max(px - view)..=x_max.min(px + view)).step_by(h_step) {
                    for z in [z_min, z_max] {
                        if (pz - z).abs() <= view {
                            points.push((x, y, z));
                        }
                    }
                }
                for z in (z_min.max(pz - view)..=z_max.min(pz + view)).step_by(h_step) {
                    for x in [x_min, x_max] {
                        if (px - x).abs() <= view {
                            points.push((x, y, z));
                        }
                    }
                }
            }

            for (x, y, z) in points {
                self.host.spawn_particle(
                    player,
                    &particles.particle_type,
                    Vec3::new(x as f64, y as f64, z as f64),
                );
            }
        }
    }

    fn scoreboard_tick(&mut self, session_id: &str) {
        if self.is_running(session_id) {
            self.update_scoreboard(session_id);
        }
    }

    /// One tick after a death: end the round or turn the player into a
    /// spectator.
    fn death_follow_up(&mut self, session_id: &str, player: &str) {
        if !self.host.is_online(player) {
            return;
        }
        let Some(runtime) = self.registry.get(session_id) else {
            return;
        };
        if runtime.state() != SessionState::Running {
            return;
        }
        if runtime.alive_count() <= 1 {
            self.check_winner(session_id);
            return;
        }
        self.host.set_game_mode(player, GameMode::Spectator);
        self.host
            .send_message(player, "§cYou have been eliminated and are now spectating.");
        self.update_scoreboard(session_id);
    }
}

impl<H: Host> PillarService<H, TickScheduler> {
    /// Fire everything due at the current tick.
    pub fn run_pending(&mut self) {
        while let Some(task) = self.scheduler.pop_due() {
            self.run_task(task);
        }
    }

    /// Advance `ticks` ticks, firing due tasks after each.
    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.scheduler.advance();
            self.run_pending();
        }
    }
}
