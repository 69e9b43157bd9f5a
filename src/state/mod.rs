//! State management module for Lucky Pillar.
//!
//! This module provides the core state types and the service that drives
//! them:
//!
//! - `machine` - Session lifecycle state machine
//! - `session` - Per-session runtime (roster, alive set, border, timers)
//! - `registry` - Runtimes by session ID plus the player index
//! - `config` - Persisted arena definitions and the item pool
//! - `tasks` - Scheduler abstraction and a deterministic tick scheduler
//! - `host` - What the core needs from the game server
//! - `service` - Admin operations, membership and round lifecycle
//! - `orchestrator` - Countdown and in-round timer callbacks
//! - `reconciler` - Wait-area membership sweep
//! - `commands` - `/lpadmin` and `/lp`
//! - `display` - Bossbar and sidebar content
//! - `weighted` - Item draws and the deterministic event sequence
//! - `region` - Positions and box containment
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     PillarService<Host, Scheduler>                   │
//! │                                                                      │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐       │
//! │  │  PluginConfig   │  │ SessionRegistry │  │    Scheduler    │       │
//! │  │                 │  │                 │  │                 │       │
//! │  │ session_id →    │  │ session_id →    │  │ handle →        │       │
//! │  │   SessionConfig │  │   SessionRuntime│  │   Task          │       │
//! │  │                 │  │                 │  │                 │       │
//! │  │ item → weight   │  │ player →        │  │                 │       │
//! │  │                 │  │   session_id    │  │                 │       │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘       │
//! │                                                                      │
//! │  ┌──────────────────────────────────────────────────────────────┐    │
//! │  │                 SessionState (per session)                   │    │
//! │  │                                                              │    │
//! │  │  Idle ◀─▶ Waiting ◀─▶ Ready ──▶ Countdown ──▶ Running        │    │
//! │  │   ▲                                               │          │    │
//! │  │   └─────────────────── Ended ◀────────────────────┘          │    │
//! │  └──────────────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use luckypillar_state::state::{ConfigStore, PillarService, TickScheduler};
//!
//! let store = ConfigStore::new("plugins/EasyLuckyPillar/config/EasyLuckyPillar.json");
//! let mut service = PillarService::new(my_host, TickScheduler::new(), store);
//! service.enable();
//!
//! // Once per server tick
//! service.run_ticks(1);
//!
//! // Host events
//! service.on_player_death("Alex");
//! service.handle_command("Admin", "lpadmin", &["start", "1"]);
//! ```

pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod host;
pub mod machine;
pub mod orchestrator;
pub mod reconciler;
pub mod region;
pub mod registry;
pub mod service;
pub mod session;
pub mod tasks;
pub mod weighted;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use commands::{AdminCommand, PlayerCommand};
pub use config::{
    BorderConfig, ConfigStore, ParticleConfig, PluginConfig, SessionConfig, SoundConfig,
    TaskConfig, DEFAULT_CONFIG_PATH, TICKS_PER_SECOND,
};
pub use error::{AdminError, CommandError, ConfigError, HostError, HostResult};
pub use host::{BarColor, BossBarId, BossBarView, GameMode, Host, ScoreboardView, TitleTiming};
pub use machine::{InvalidTransition, SessionEvent, SessionState};
pub use region::{BlockPos, Region, Vec3};
pub use registry::{MembershipError, SessionRegistry};
pub use service::{PillarService, RoundOutcome, WaitAreaStep};
pub use session::{SessionRuntime, COUNTDOWN_SECONDS};
pub use tasks::{Scheduler, Task, TaskHandle, TaskKind, TickScheduler};
pub use weighted::{RandomEvent, WeightedTable};
