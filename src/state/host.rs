//! The host game-server surface the session core calls into.
//!
//! Players are referred to by name. The host owns the authoritative world;
//! this crate only asks it to do things and reads positions back.

use super::error::HostResult;
use super::region::Vec3;

/// Player game mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Survival,
    Adventure,
    Spectator,
}

/// Title animation timings, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleTiming {
    pub fade_in: u32,
    pub stay: u32,
    pub fade_out: u32,
}

impl TitleTiming {
    pub const fn new(fade_in: u32, stay: u32, fade_out: u32) -> Self {
        Self {
            fade_in,
            stay,
            fade_out,
        }
    }
}

/// Handle to a host-side progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BossBarId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarColor {
    Yellow,
    Red,
    Green,
    White,
}

/// What a progress bar should show.
#[derive(Debug, Clone, PartialEq)]
pub struct BossBarView {
    pub title: String,
    pub color: BarColor,
    /// 0.0 ..= 1.0
    pub progress: f32,
}

/// Ordered list of labelled scores shown in the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreboardView {
    pub objective: String,
    pub title: String,
    pub lines: Vec<(String, i32)>,
}

/// Everything the core needs from the game server.
pub trait Host {
    fn online_players(&self) -> Vec<String>;

    fn is_online(&self, player: &str) -> bool {
        self.online_players().iter().any(|p| p == player)
    }

    /// Current position, `None` if the player is not online.
    fn location(&self, player: &str) -> Option<Vec3>;

    fn health(&self, player: &str) -> Option<f64>;

    fn teleport(&mut self, player: &str, to: Vec3) -> HostResult;

    fn give_item(&mut self, player: &str, item: &str, amount: u32) -> HostResult;

    fn send_message(&mut self, player: &str, message: &str);

    fn send_title(&mut self, player: &str, title: &str, subtitle: &str, timing: TitleTiming);

    fn send_tip(&mut self, player: &str, tip: &str);

    fn play_sound(&mut self, player: &str, at: Vec3, sound: &str, volume: f32, pitch: f32);

    fn spawn_particle(&mut self, player: &str, particle: &str, at: Vec3);

    fn set_game_mode(&mut self, player: &str, mode: GameMode);

    /// Run a server command as the console.
    fn dispatch_command(&mut self, command: &str) -> HostResult;

    fn clear_inventory(&mut self, player: &str) -> HostResult {
        self.dispatch_command(&format!("clear \"{}\"", player))
    }

    fn set_movement_enabled(&mut self, player: &str, enabled: bool) -> HostResult {
        let mode = if enabled { "enabled" } else { "disabled" };
        self.dispatch_command(&format!(
            "inputpermission set \"{}\" movement {}",
            player, mode
        ))
    }

    fn create_boss_bar(&mut self, view: &BossBarView) -> HostResult<BossBarId>;

    fn update_boss_bar(&mut self, bar: BossBarId, view: &BossBarView) -> HostResult;

    fn show_boss_bar(&mut self, bar: BossBarId, player: &str);

    fn hide_boss_bar(&mut self, bar: BossBarId, player: &str);

    fn remove_boss_bar(&mut self, bar: BossBarId);

    /// Replace the objective's sidebar content.
    fn publish_scoreboard(&mut self, view: &ScoreboardView) -> HostResult;

    fn hide_scoreboard(&mut self, objective: &str, player: &str);
}
