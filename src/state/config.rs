//! Persisted configuration.
//!
//! The plugin keeps one JSON document holding every session definition and
//! the item pool. Loading never fails: a missing or malformed document is
//! replaced by the built-in default and written back.

use super::error::ConfigError;
use super::region::{BlockPos, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Where the host conventionally keeps the document.
pub const DEFAULT_CONFIG_PATH: &str = "plugins/EasyLuckyPillar/config/EasyLuckyPillar.json";

/// Host scheduler resolution.
pub const TICKS_PER_SECOND: u64 = 20;

/// Safe-zone parameters. Radii in blocks, interval in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub initial_radius: u32,
    pub min_radius: u32,
    pub shrink_interval: u64,
    pub shrink_amount: u32,
    pub damage_per_second: u32,
    /// Re-initialise the radius at the start of every round instead of
    /// carrying it over from the previous one.
    pub reset_each_round: bool,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            initial_radius: 20,
            min_radius: 4,
            shrink_interval: 300,
            shrink_amount: 4,
            damage_per_second: 5,
            reset_each_round: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub enabled: bool,
    pub particle_type: String,
    pub particle_height: i32,
    pub particle_y_offset: i32,
    pub horizontal_step: u32,
    pub vertical_step: u32,
    pub view_distance: u32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            particle_type: "minecraft:falling_border_dust_particle".to_string(),
            particle_height: 10,
            particle_y_offset: -48,
            horizontal_step: 2,
            vertical_step: 1,
            view_distance: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub enabled: bool,
    pub border_shrink_sound: String,
    pub border_shrink_volume: f32,
    pub border_shrink_pitch: f32,
    pub victory_sound: String,
    pub victory_volume: f32,
    pub victory_pitch: f32,
    pub countdown_sound: String,
    pub countdown_volume: f32,
    /// Pitch at five seconds remaining; rises by 0.2 per second after that.
    pub countdown_pitch: f32,
    pub game_end_sound: String,
    pub game_end_volume: f32,
    pub game_end_pitch: f32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            border_shrink_sound: "random.explode".to_string(),
            border_shrink_volume: 10.0,
            border_shrink_pitch: 1.0,
            victory_sound: "mob.enderdragon.death".to_string(),
            victory_volume: 10.0,
            victory_pitch: 1.0,
            countdown_sound: "random.orb".to_string(),
            countdown_volume: 10.0,
            countdown_pitch: 0.6,
            game_end_sound: "mob.wither.death".to_string(),
            game_end_volume: 10.0,
            game_end_pitch: 1.0,
        }
    }
}

/// Task cadences, in ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub item_interval: u64,
    pub event_interval: u64,
    pub border_check_interval: u64,
    pub particle_interval: u64,
    pub scoreboard_update_interval: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            item_interval: 100,
            event_interval: 1200,
            border_check_interval: 20,
            particle_interval: 20,
            scoreboard_update_interval: 20,
        }
    }
}

impl TaskConfig {
    /// Event period in whole seconds, never zero.
    pub fn event_period_secs(&self) -> u64 {
        (self.event_interval / TICKS_PER_SECOND).max(1)
    }

    /// Round `event_interval` up to a whole, non-zero number of seconds so
    /// the event cycle counted in seconds matches the timer cadence. Returns
    /// whether the value changed.
    pub fn align_event_interval(&mut self) -> bool {
        let aligned = self
            .event_interval
            .div_ceil(TICKS_PER_SECOND)
            .max(1)
            * TICKS_PER_SECOND;
        let changed = aligned != self.event_interval;
        self.event_interval = aligned;
        changed
    }
}

/// One arena definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub name: String,
    pub center_pos: BlockPos,
    /// Spawn points; their count is the session capacity.
    pub pillars: BTreeMap<String, BlockPos>,
    pub min_players: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_area: Option<Region>,
    pub border: BorderConfig,
    pub particles: ParticleConfig,
    pub sounds: SoundConfig,
    pub tasks: TaskConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            center_pos: BlockPos::new(0, 100, 0),
            pillars: BTreeMap::new(),
            min_players: 2,
            wait_area: None,
            border: BorderConfig::default(),
            particles: ParticleConfig::default(),
            sounds: SoundConfig::default(),
            tasks: TaskConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(name: impl Into<String>, center_pos: BlockPos) -> Self {
        Self {
            name: name.into(),
            center_pos,
            ..Self::default()
        }
    }

    pub fn max_players(&self) -> usize {
        self.pillars.len()
    }

    /// Smallest unused positive integer pillar id.
    pub fn next_pillar_id(&self) -> String {
        next_free_id(&self.pillars)
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub sessions: BTreeMap<String, SessionConfig>,
    #[serde(default = "default_item_pool")]
    pub item_pool: BTreeMap<String, u32>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        let mut pillars = BTreeMap::new();
        let spawn_points = [
            (0, 0),
            (0, -16),
            (16, 0),
            (0, 16),
            (-16, 0),
            (-11, -11),
            (11, -11),
            (-11, 11),
            (11, 11),
        ];
        for (i, (x, z)) in spawn_points.iter().enumerate() {
            pillars.insert((i + 1).to_string(), BlockPos::new(*x, 99, *z));
        }

        let session = SessionConfig {
            name: "Default Arena".to_string(),
            center_pos: BlockPos::new(0, 100, 0),
            pillars,
            min_players: 2,
            wait_area: Some(Region::new(
                BlockPos::new(-20, 100, -20),
                BlockPos::new(20, 100, 20),
            )),
            ..SessionConfig::default()
        };

        let mut sessions = BTreeMap::new();
        sessions.insert("1".to_string(), session);
        Self {
            sessions,
            item_pool: default_item_pool(),
        }
    }
}

impl PluginConfig {
    /// Smallest unused positive integer session id.
    pub fn next_session_id(&self) -> String {
        next_free_id(&self.sessions)
    }
}

fn next_free_id<V>(map: &BTreeMap<String, V>) -> String {
    (1..)
        .map(|n: usize| n.to_string())
        .find(|id| !map.contains_key(id))
        .unwrap_or_default()
}

const COLORS: [&str; 16] = [
    "white",
    "orange",
    "magenta",
    "light_blue",
    "yellow",
    "lime",
    "pink",
    "gray",
    "light_gray",
    "cyan",
    "purple",
    "blue",
    "brown",
    "green",
    "red",
    "black",
];

const BASE_ITEMS: &[(&str, u32)] = &[
    ("cobblestone", 100),
    ("dirt", 100),
    ("sand", 80),
    ("gravel", 80),
    ("planks", 100),
    ("log", 80),
    ("glass", 60),
    ("wool", 60),
    ("stone", 80),
    ("andesite", 70),
    ("diorite", 70),
    ("granite", 70),
    ("deepslate", 70),
    ("tuff", 60),
    ("moss_block", 50),
    ("mud", 60),
    ("iron_ingot", 50),
    ("gold_ingot", 40),
    ("coal", 60),
    ("copper_ingot", 50),
    ("redstone", 40),
    ("lapis_lazuli", 30),
    ("emerald", 20),
    ("diamond", 10),
    ("netherite_ingot", 2),
    ("bread", 60),
    ("cooked_beef", 50),
    ("apple", 60),
    ("carrot", 60),
    ("potato", 60),
    ("golden_apple", 10),
    ("enchanted_golden_apple", 1),
    ("bow", 30),
    ("arrow", 50),
    ("crossbow", 20),
    ("iron_sword", 30),
    ("diamond_sword", 5),
    ("iron_pickaxe", 30),
    ("diamond_pickaxe", 5),
    ("shield", 20),
    ("totem_of_undying", 2),
    ("trident", 3),
    ("spyglass", 10),
    ("fishing_rod", 20),
    ("snowball", 40),
    ("egg", 40),
    ("iron_helmet", 15),
    ("iron_chestplate", 10),
    ("iron_leggings", 15),
    ("iron_boots", 15),
    ("diamond_helmet", 3),
    ("diamond_chestplate", 2),
    ("diamond_leggings", 3),
    ("diamond_boots", 3),
    ("tnt", 25),
    ("ender_pearl", 15),
    ("bucket", 30),
    ("water_bucket", 20),
    ("lava_bucket", 15),
    ("firework_rocket", 20),
    ("slime_ball", 20),
    ("magma_cream", 15),
    ("obsidian", 10),
];

/// Built-in item pool used when the document has none.
pub fn default_item_pool() -> BTreeMap<String, u32> {
    let mut pool: BTreeMap<String, u32> = BASE_ITEMS
        .iter()
        .map(|(item, weight)| (item.to_string(), *weight))
        .collect();
    for color in COLORS {
        pool.insert(format!("{}_wool", color), 60);
        pool.insert(format!("{}_concrete", color), 70);
    }
    pool
}

/// File-backed store for [`PluginConfig`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict read. The flag reports whether the document had to be
    /// repaired (missing `sessions`, empty item pool or an event interval
    /// that is not whole seconds) and should be saved.
    pub fn read(&self) -> Result<(PluginConfig, bool), ConfigError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ConfigError::NotFound(self.path.clone())
            } else {
                ConfigError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let mut repaired = value.get("sessions").is_none();
        let mut config: PluginConfig = serde_json::from_value(value)?;
        if config.item_pool.values().all(|w| *w == 0) {
            config.item_pool = default_item_pool();
            repaired = true;
        }
        for (id, session) in config.sessions.iter_mut() {
            let before = session.tasks.event_interval;
            if session.tasks.align_event_interval() {
                warn!(
                    session_id = %id,
                    from = before,
                    to = session.tasks.event_interval,
                    "Event interval rounded up to whole seconds"
                );
                repaired = true;
            }
        }
        Ok((config, repaired))
    }

    /// Load with fallback. Never fails; problems are logged and the
    /// resulting document is written back when it differs from disk.
    pub fn load(&self) -> PluginConfig {
        match self.read() {
            Ok((config, repaired)) => {
                if repaired {
                    warn!(path = %self.path.display(), "Configuration repaired, saving");
                    self.save_logged(&config);
                }
                config
            }
            Err(ConfigError::NotFound(_)) => {
                info!(path = %self.path.display(), "No configuration found, writing defaults");
                self.reset()
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to load configuration, falling back to defaults");
                self.reset()
            }
        }
    }

    /// Replace the document with the built-in default.
    pub fn reset(&self) -> PluginConfig {
        let config = PluginConfig::default();
        self.save_logged(&config);
        config
    }

    pub fn save(&self, config: &PluginConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn save_logged(&self, config: &PluginConfig) {
        if let Err(e) = self.save(config) {
            error!(path = %self.path.display(), error = %e, "Failed to save configuration");
        }
    }
}
