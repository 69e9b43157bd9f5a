//! Scheduled task descriptors.
//!
//! Every timed callback is a plain [`Task`] value: the session it belongs to
//! plus what to do. The host scheduler stores the value and hands it back to
//! [`PillarService::run_task`](super::PillarService::run_task) when it fires,
//! so cancellation is bookkeeping over [`TaskHandle`]s rather than dropping
//! captured closures.
//!
//! [`TickScheduler`] is a deterministic in-process scheduler for hosts that
//! do not bring their own, and for tests.

use std::fmt;

/// Opaque handle returned by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub u64);

/// What a session-scoped task does when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Pre-round countdown, once per second
    Countdown,
    /// Elapsed-time counter, once per second
    GameTimer,
    /// Hand every alive participant a random item
    ItemDrop,
    /// Apply the event bound to the current cycle
    RandomEvent,
    /// Shrink the border when due and damage players outside it
    BorderCheck,
    /// Render the border
    Particles,
    /// Republish the scoreboard
    Scoreboard,
    /// One TNT drop of a TNT-rain event
    TntDrop,
    /// Post-death handling, one tick after the death event
    DeathFollowUp { player: String },
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Countdown => "countdown",
            Self::GameTimer => "game_timer",
            Self::ItemDrop => "item_drop",
            Self::RandomEvent => "random_event",
            Self::BorderCheck => "border_check",
            Self::Particles => "particles",
            Self::Scoreboard => "scoreboard",
            Self::TntDrop => "tnt_drop",
            Self::DeathFollowUp { .. } => "death_follow_up",
        }
    }

    /// One of the six periodic timers armed when a round starts.
    pub fn is_round_timer(&self) -> bool {
        matches!(
            self,
            Self::GameTimer
                | Self::ItemDrop
                | Self::RandomEvent
                | Self::BorderCheck
                | Self::Particles
                | Self::Scoreboard
        )
    }
}

/// A scheduled unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Task {
    /// Global membership sweep
    Reconcile,
    /// Work owned by a single session
    Session { session_id: String, kind: TaskKind },
}

impl Task {
    pub fn session(session_id: impl Into<String>, kind: TaskKind) -> Self {
        Self::Session {
            session_id: session_id.into(),
            kind,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Session { session_id, .. } => Some(session_id),
            Self::Reconcile => None,
        }
    }

    pub fn kind(&self) -> Option<&TaskKind> {
        match self {
            Self::Session { kind, .. } => Some(kind),
            Self::Reconcile => None,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconcile => write!(f, "reconcile"),
            Self::Session { session_id, kind } => write!(f, "{}:{}", session_id, kind.as_str()),
        }
    }
}

/// Host scheduler. Delays and periods are in ticks.
pub trait Scheduler {
    /// Arm `task` to fire after `delay` ticks, then every `period` ticks if given.
    fn schedule(&mut self, task: Task, delay: u64, period: Option<u64>) -> TaskHandle;

    /// Cancel a previously armed task. Unknown or finished handles are a no-op.
    fn cancel(&mut self, handle: TaskHandle) -> bool;

    /// Whether `handle` is still armed. A one-shot stops being armed as soon
    /// as it is handed out to fire.
    fn is_scheduled(&self, handle: TaskHandle) -> bool;

    fn run_later(&mut self, task: Task, delay: u64) -> TaskHandle {
        self.schedule(task, delay, None)
    }

    fn run_repeating(&mut self, task: Task, delay: u64, period: u64) -> TaskHandle {
        self.schedule(task, delay, Some(period))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    handle: TaskHandle,
    task: Task,
    due: u64,
    period: Option<u64>,
}

/// Deterministic tick-driven scheduler.
///
/// Tasks due on the same tick fire in scheduling order.
#[derive(Debug, Default)]
pub struct TickScheduler {
    now: u64,
    next_id: u64,
    entries: Vec<Entry>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Move time forward by one tick.
    pub fn advance(&mut self) {
        self.now += 1;
    }

    /// Take the next task due at or before the current tick, re-arming it
    /// if periodic.
    pub fn pop_due(&mut self) -> Option<Task> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= self.now)
            .min_by_key(|(_, e)| (e.due, e.handle))
            .map(|(idx, _)| idx)?;

        let entry = self.entries.get_mut(idx)?;
        match entry.period {
            Some(period) => {
                entry.due += period.max(1);
                Some(entry.task.clone())
            }
            None => Some(self.entries.remove(idx).task),
        }
    }

    /// Number of armed tasks.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    pub fn scheduled_tasks(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().map(|e| &e.task)
    }

    /// Armed tasks belonging to one session.
    pub fn pending_for(&self, session_id: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.task.session_id() == Some(session_id))
            .count()
    }
}

impl Scheduler for TickScheduler {
    fn schedule(&mut self, task: Task, delay: u64, period: Option<u64>) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        self.entries.push(Entry {
            handle,
            task,
            due: self.now + delay,
            period,
        });
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(kind: TaskKind) -> Task {
        Task::session("1", kind)
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut scheduler = TickScheduler::new();
        let handle = scheduler.run_later(timer(TaskKind::TntDrop), 2);

        assert_eq!(scheduler.pop_due(), None);
        scheduler.advance();
        assert_eq!(scheduler.pop_due(), None);
        scheduler.advance();
        assert_eq!(scheduler.pop_due(), Some(timer(TaskKind::TntDrop)));
        assert_eq!(scheduler.pop_due(), None);
        assert!(!scheduler.is_scheduled(handle));
    }

    #[test]
    fn test_repeating_rearms() {
        let mut scheduler = TickScheduler::new();
        scheduler.run_repeating(timer(TaskKind::GameTimer), 0, 20);

        let mut fired = 0;
        for _ in 0..=60 {
            while scheduler.pop_due().is_some() {
                fired += 1;
            }
            scheduler.advance();
        }
        // Ticks 0, 20, 40, 60
        assert_eq!(fired, 4);
    }

    #[test]
    fn test_same_tick_runs_in_scheduling_order() {
        let mut scheduler = TickScheduler::new();
        scheduler.run_later(timer(TaskKind::GameTimer), 0);
        scheduler.run_later(timer(TaskKind::RandomEvent), 0);

        assert_eq!(scheduler.pop_due(), Some(timer(TaskKind::GameTimer)));
        assert_eq!(scheduler.pop_due(), Some(timer(TaskKind::RandomEvent)));
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = TickScheduler::new();
        let handle = scheduler.run_repeating(timer(TaskKind::Scoreboard), 0, 20);
        scheduler.run_repeating(Task::Reconcile, 20, 20);

        assert_eq!(scheduler.pending_for("1"), 1);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert_eq!(scheduler.pending_for("1"), 0);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_round_timer_kinds() {
        assert!(TaskKind::BorderCheck.is_round_timer());
        assert!(!TaskKind::Countdown.is_round_timer());
        assert!(!TaskKind::DeathFollowUp {
            player: "Steve".into()
        }
        .is_round_timer());
        assert_eq!(format!("{}", timer(TaskKind::ItemDrop)), "1:item_drop");
    }
}
