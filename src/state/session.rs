//! Per-session runtime state.
//!
//! A runtime is created the first time a session is referenced and lives as
//! long as the session is configured. Rounds reset it; they never destroy it.

use super::config::{BorderConfig, SessionConfig};
use super::host::BossBarId;
use super::machine::{InvalidTransition, SessionEvent, SessionState};
use super::tasks::TaskHandle;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Seconds of pre-round countdown.
pub const COUNTDOWN_SECONDS: u32 = 10;

/// Mutable state of one session.
#[derive(Debug, Clone)]
pub struct SessionRuntime {
    /// Session ID
    pub id: String,

    /// Lifecycle state
    state: SessionState,

    /// Registered players in join order
    players: Vec<String>,

    /// Participants not yet eliminated
    alive: BTreeSet<String>,

    /// Whole seconds since the round went live
    pub elapsed: u64,

    /// Seconds of countdown remaining
    pub countdown: u32,

    /// Current safe-zone radius
    pub border_radius: u32,

    /// Elapsed time of the last shrink
    pub last_shrink_time: u64,

    /// Scheduled tasks owned by this session
    tasks: Vec<TaskHandle>,

    /// Progress bar, created lazily
    pub boss_bar: Option<BossBarId>,

    /// Sidebar objective name, once published
    pub scoreboard: Option<String>,

    /// Set once the "everyone is back in the wait area" cue has played,
    /// cleared when someone steps out again
    pub return_cue_played: bool,

    /// When the current round went live
    pub round_started_at: Option<DateTime<Utc>>,
}

impl SessionRuntime {
    pub fn new(id: impl Into<String>, config: &SessionConfig) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Idle,
            players: Vec::new(),
            alive: BTreeSet::new(),
            elapsed: 0,
            countdown: 0,
            border_radius: config.border.initial_radius,
            last_shrink_time: 0,
            tasks: Vec::new(),
            boss_bar: None,
            scoreboard: None,
            return_cue_played: false,
            round_started_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Apply a lifecycle event in place.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), InvalidTransition> {
        self.state = self.state.apply(&event)?;
        Ok(())
    }

    /// Recompute the pre-round state from the current head count.
    /// A no-op once a round has started.
    pub fn refresh_membership_state(&mut self, present: usize, min_players: usize) {
        let _ = self.apply(SessionEvent::MembershipChanged {
            players: present,
            min_players,
        });
    }

    /// Append a player. Returns false if already registered.
    pub fn add_player(&mut self, name: &str) -> bool {
        if self.has_player(name) {
            return false;
        }
        self.players.push(name.to_string());
        true
    }

    /// Remove a player from the roster and the alive set.
    pub fn remove_player(&mut self, name: &str) -> bool {
        self.alive.remove(name);
        let before = self.players.len();
        self.players.retain(|p| p != name);
        self.players.len() != before
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.players.iter().any(|p| p == name)
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_alive(&self, name: &str) -> bool {
        self.alive.contains(name)
    }

    pub fn alive(&self) -> impl Iterator<Item = &String> {
        self.alive.iter()
    }

    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    /// Registered players still alive, in join order.
    pub fn alive_players(&self) -> Vec<String> {
        self.players
            .iter()
            .filter(|p| self.alive.contains(*p))
            .cloned()
            .collect()
    }

    /// Mark a participant as eliminated.
    pub fn eliminate(&mut self, name: &str) -> bool {
        self.alive.remove(name)
    }

    /// The sole survivor, if exactly one remains.
    pub fn winner(&self) -> Option<&str> {
        if self.alive.len() == 1 {
            self.alive.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Reset per-round counters on entering the countdown.
    pub fn begin_round(&mut self, border: &BorderConfig) {
        self.alive = self.players.iter().cloned().collect();
        self.elapsed = 0;
        self.countdown = COUNTDOWN_SECONDS;
        self.last_shrink_time = 0;
        self.return_cue_played = false;
        if border.reset_each_round {
            self.border_radius = border.initial_radius;
        }
    }

    pub fn track_task(&mut self, handle: TaskHandle) {
        self.tasks.push(handle);
    }

    /// Drop handles for which `armed` is false.
    pub fn retain_tasks(&mut self, mut armed: impl FnMut(TaskHandle) -> bool) {
        self.tasks.retain(|handle| armed(*handle));
    }

    /// Hand over every tracked handle for cancellation.
    pub fn take_tasks(&mut self) -> Vec<TaskHandle> {
        std::mem::take(&mut self.tasks)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Shrink the border if the interval has elapsed and the radius is above
    /// the floor. Returns the new radius when a shrink happened.
    pub fn shrink_border(&mut self, border: &BorderConfig) -> Option<u32> {
        if self.elapsed.saturating_sub(self.last_shrink_time) < border.shrink_interval {
            return None;
        }
        if self.border_radius <= border.min_radius {
            return None;
        }
        let radius = self
            .border_radius
            .saturating_sub(border.shrink_amount)
            .max(border.min_radius);
        self.border_radius = radius;
        self.last_shrink_time = self.elapsed;
        Some(radius)
    }

    /// Radius after the next shrink.
    pub fn next_radius(&self, border: &BorderConfig) -> u32 {
        self.border_radius
            .saturating_sub(border.shrink_amount)
            .max(border.min_radius)
    }

    /// Seconds until the next shrink is due (zero if overdue).
    pub fn seconds_until_shrink(&self, border: &BorderConfig) -> u64 {
        (self.last_shrink_time + border.shrink_interval).saturating_sub(self.elapsed)
    }

    /// Return to idle after a round. The border radius is left alone.
    pub fn reset_after_round(&mut self) {
        self.players.clear();
        self.alive.clear();
        self.elapsed = 0;
        self.countdown = 0;
        self.return_cue_played = false;
        self.round_started_at = None;
        self.state = self
            .state
            .apply(&SessionEvent::Reset)
            .unwrap_or(SessionState::Idle);
    }

    /// Convert to JSON for status reporting.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "session_id": self.id,
            "state": self.state.as_str(),
            "players": self.players,
            "alive_players": self.alive_players(),
            "elapsed": self.elapsed,
            "countdown": self.countdown,
            "border_radius": self.border_radius,
            "last_shrink_time": self.last_shrink_time,
            "scheduled_tasks": self.tasks.len(),
        })
    }
}
