//! Recording host double for unit tests.

use super::error::{HostError, HostResult};
use super::host::{BossBarId, BossBarView, GameMode, Host, ScoreboardView, TitleTiming};
use super::region::Vec3;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    pub online: Vec<String>,
    pub positions: HashMap<String, Vec3>,
    pub health: HashMap<String, f64>,
    pub messages: Vec<(String, String)>,
    pub titles: Vec<(String, String, String)>,
    pub tips: Vec<(String, String)>,
    pub sounds: Vec<(String, String, f32)>,
    pub particles: usize,
    pub commands: Vec<String>,
    pub teleports: Vec<(String, Vec3)>,
    pub items: Vec<(String, String)>,
    pub game_modes: HashMap<String, GameMode>,
    pub bars: HashMap<u64, BossBarView>,
    pub bar_viewers: HashMap<u64, BTreeSet<String>>,
    pub removed_bars: Vec<u64>,
    pub scoreboards: HashMap<String, ScoreboardView>,
    /// Players whose item grants fail
    pub failing_items: BTreeSet<String>,
    next_bar: u64,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, name: &str, at: Vec3) {
        if !self.online.iter().any(|p| p == name) {
            self.online.push(name.to_string());
        }
        self.positions.insert(name.to_string(), at);
        self.health.insert(name.to_string(), 20.0);
    }

    pub fn disconnect(&mut self, name: &str) {
        self.online.retain(|p| p != name);
        self.positions.remove(name);
    }

    pub fn move_to(&mut self, name: &str, at: Vec3) {
        self.positions.insert(name.to_string(), at);
    }

    pub fn messages_for(&self, name: &str) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(p, _)| p == name)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    pub fn commands_containing(&self, needle: &str) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|c| c.contains(needle))
            .map(String::as_str)
            .collect()
    }

    pub fn sounds_named(&self, sound: &str) -> usize {
        self.sounds.iter().filter(|(_, s, _)| s == sound).count()
    }
}

impl Host for FakeHost {
    fn online_players(&self) -> Vec<String> {
        self.online.clone()
    }

    fn location(&self, player: &str) -> Option<Vec3> {
        self.positions.get(player).copied()
    }

    fn health(&self, player: &str) -> Option<f64> {
        self.health.get(player).copied()
    }

    fn teleport(&mut self, player: &str, to: Vec3) -> HostResult {
        if !self.is_online(player) {
            return Err(HostError::PlayerOffline(player.to_string()));
        }
        self.positions.insert(player.to_string(), to);
        self.teleports.push((player.to_string(), to));
        Ok(())
    }

    fn give_item(&mut self, player: &str, item: &str, _amount: u32) -> HostResult {
        if self.failing_items.contains(player) {
            return Err(HostError::Failed(format!("inventory full for {}", player)));
        }
        self.items.push((player.to_string(), item.to_string()));
        Ok(())
    }

    fn send_message(&mut self, player: &str, message: &str) {
        self.messages.push((player.to_string(), message.to_string()));
    }

    fn send_title(&mut self, player: &str, title: &str, subtitle: &str, _timing: TitleTiming) {
        self.titles
            .push((player.to_string(), title.to_string(), subtitle.to_string()));
    }

    fn send_tip(&mut self, player: &str, tip: &str) {
        self.tips.push((player.to_string(), tip.to_string()));
    }

    fn play_sound(&mut self, player: &str, _at: Vec3, sound: &str, _volume: f32, pitch: f32) {
        self.sounds
            .push((player.to_string(), sound.to_string(), pitch));
    }

    fn spawn_particle(&mut self, _player: &str, _particle: &str, _at: Vec3) {
        self.particles += 1;
    }

    fn set_game_mode(&mut self, player: &str, mode: GameMode) {
        self.game_modes.insert(player.to_string(), mode);
    }

    fn dispatch_command(&mut self, command: &str) -> HostResult {
        self.commands.push(command.to_string());
        Ok(())
    }

    fn create_boss_bar(&mut self, view: &BossBarView) -> HostResult<BossBarId> {
        self.next_bar += 1;
        self.bars.insert(self.next_bar, view.clone());
        Ok(BossBarId(self.next_bar))
    }

    fn update_boss_bar(&mut self, bar: BossBarId, view: &BossBarView) -> HostResult {
        self.bars.insert(bar.0, view.clone());
        Ok(())
    }

    fn show_boss_bar(&mut self, bar: BossBarId, player: &str) {
        self.bar_viewers
            .entry(bar.0)
            .or_default()
            .insert(player.to_string());
    }

    fn hide_boss_bar(&mut self, bar: BossBarId, player: &str) {
        if let Some(viewers) = self.bar_viewers.get_mut(&bar.0) {
            viewers.remove(player);
        }
    }

    fn remove_boss_bar(&mut self, bar: BossBarId) {
        self.bars.remove(&bar.0);
        self.bar_viewers.remove(&bar.0);
        self.removed_bars.push(bar.0);
    }

    fn publish_scoreboard(&mut self, view: &ScoreboardView) -> HostResult {
        self.scoreboards.insert(view.objective.clone(), view.clone());
        Ok(())
    }

    fn hide_scoreboard(&mut self, _objective: &str, _player: &str) {}
}
