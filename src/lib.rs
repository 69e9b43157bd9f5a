//! Lucky Pillar State Library
//!
//! This crate provides session state and timed-event orchestration for the
//! Lucky Pillar mini-game.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Session State Machine** - Idle, waiting, ready, countdown, running and
//!   ended, with validated transitions.
//!
//! - **Membership** - Standing in a session's wait area joins it; a player
//!   index guarantees nobody is in two sessions at once.
//!
//! - **Round Orchestration** - Countdown, then item drops, random events, a
//!   shrinking border and border particles on independent timers.
//!
//! - **Persistence** - Arena definitions and the item pool in one JSON file,
//!   repaired or replaced with defaults when unreadable.
//!
//! # Design Principles
//!
//! 1. **The server is a trait** - Everything the game server does (teleports,
//!    commands, bossbars) goes through [`Host`]; timers go through
//!    [`Scheduler`]. Tests use a recording host and [`TickScheduler`].
//!
//! 2. **Every timer belongs to its session** - Stopping a round cancels all
//!    of them at once, and late callbacks re-check the state.
//!
//! 3. **Event previews never lie** - The random event for a cycle is a pure
//!    function of elapsed time.
//!
//! # Example
//!
//! ```rust
//! use luckypillar_state::state::{SessionConfig, SessionEvent, SessionRegistry, SessionState};
//! use luckypillar_state::BlockPos;
//!
//! let config = SessionConfig::new("Sky Arena", BlockPos::new(0, 100, 0));
//! let mut registry = SessionRegistry::new();
//! registry.ensure("1", &config);
//!
//! registry.join("1", "Alex").unwrap();
//! registry.join("1", "Steve").unwrap();
//!
//! let runtime = registry.get_mut("1").unwrap();
//! runtime.refresh_membership_state(2, config.min_players);
//! assert_eq!(runtime.state(), SessionState::Ready);
//!
//! runtime.apply(SessionEvent::StartCountdown).unwrap();
//! assert_eq!(runtime.state(), SessionState::Countdown);
//! ```

pub mod logging;
pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
