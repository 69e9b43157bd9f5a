//! Weighted random selection and deterministic event scheduling.
//!
//! Item drops draw from a [`WeightedTable`] using the service RNG, which is
//! either seeded (tests, replays) or drawn from entropy. Random events are
//! NOT drawn from the RNG: the event for a cycle is a pure function of the
//! cycle index so that the scoreboard preview and the actual trigger agree
//! no matter how the timers interleave.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::fmt;

/// Fixed salt mixed into every event-cycle hash.
pub const EVENT_SALT: u64 = 123_456_789;

/// A table of items with positive integer weights.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    items: Vec<T>,
    weights: Vec<u32>,
    index: Option<WeightedIndex<u32>>,
}

impl<T> WeightedTable<T> {
    /// Build a table. Zero-weight entries are dropped.
    pub fn new(entries: impl IntoIterator<Item = (T, u32)>) -> Self {
        let (items, weights): (Vec<T>, Vec<u32>) =
            entries.into_iter().filter(|(_, w)| *w > 0).unzip();
        let index = WeightedIndex::new(&weights).ok();
        Self {
            items,
            weights,
            index,
        }
    }

    /// Draw one item, or `None` if the table is empty.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        let index = self.index.as_ref()?;
        self.items.get(index.sample(rng))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.weights.iter().map(|w| u64::from(*w)).sum()
    }
}

/// Hazards applied to every alive participant when the event timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RandomEvent {
    Darkness,
    TntRain,
    Ghast,
    Lightning,
    Blindness,
    Slowness,
    Levitation,
}

impl RandomEvent {
    /// Selection order. Changing it changes which event every cycle maps to.
    pub const ALL: [RandomEvent; 7] = [
        Self::Darkness,
        Self::TntRain,
        Self::Ghast,
        Self::Lightning,
        Self::Blindness,
        Self::Slowness,
        Self::Levitation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Darkness => "darkness",
            Self::TntRain => "tnt",
            Self::Ghast => "ghast",
            Self::Lightning => "lightning",
            Self::Blindness => "blindness",
            Self::Slowness => "slowness",
            Self::Levitation => "levitation",
        }
    }

    /// Name shown on the scoreboard.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Darkness => "Darkness Falls",
            Self::TntRain => "TNT Rain",
            Self::Ghast => "Ghast Raid",
            Self::Lightning => "Lightning Strike",
            Self::Blindness => "Blinded",
            Self::Slowness => "Sluggish",
            Self::Levitation => "Levitation",
        }
    }
}

impl fmt::Display for RandomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// splitmix64 finalizer over `(cycle, salt)`. Stable across builds and platforms.
fn mix(cycle: u64, salt: u64) -> u64 {
    let mut z = cycle.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ salt;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// The event bound to an event cycle.
pub fn event_for_cycle(cycle: u64) -> RandomEvent {
    let idx = (mix(cycle, EVENT_SALT) % RandomEvent::ALL.len() as u64) as usize;
    RandomEvent::ALL[idx]
}

/// Cycle index the event timer resolves when it fires at `elapsed` seconds.
pub fn triggered_cycle(elapsed: u64, period: u64) -> u64 {
    elapsed / period.max(1)
}

/// Cycle index of the next boundary at or after `elapsed` seconds. Cycle 0
/// never fires, so the first boundary is one full period in.
pub fn upcoming_cycle(elapsed: u64, period: u64) -> u64 {
    elapsed.div_ceil(period.max(1)).max(1)
}

/// The event the timer applies when it fires at `elapsed`.
pub fn triggered_event(elapsed: u64, period: u64) -> RandomEvent {
    event_for_cycle(triggered_cycle(elapsed, period))
}

/// The event the display announces at `elapsed`.
pub fn upcoming_event(elapsed: u64, period: u64) -> RandomEvent {
    event_for_cycle(upcoming_cycle(elapsed, period))
}

/// Seconds until the boundary of [`upcoming_cycle`]. Zero at an exact
/// boundary: the event timer fires one second later, once the game timer
/// has moved past it.
pub fn seconds_until_event(elapsed: u64, period: u64) -> u64 {
    upcoming_cycle(elapsed, period) * period.max(1) - elapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    #[test]
    fn test_empty_table_picks_nothing() {
        let table: WeightedTable<&str> = WeightedTable::new(vec![("dirt", 0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(table.is_empty());
        assert_eq!(table.pick(&mut rng), None);
    }

    #[test]
    fn test_seeded_picks_are_reproducible() {
        let table = WeightedTable::new(vec![("dirt", 100), ("diamond", 10), ("netherite", 1)]);
        let draw = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| *table.pick(&mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
        assert_eq!(table.total_weight(), 111);
    }

    #[test]
    fn test_weights_bias_the_draw() {
        let table = WeightedTable::new(vec![("common", 1000), ("rare", 1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..2000 {
            *counts.entry(*table.pick(&mut rng).unwrap()).or_default() += 1;
        }
        assert!(counts["common"] > 1900);
    }

    #[test]
    fn test_preview_matches_trigger() {
        let period = 60;
        for t in 0..(period * 12) {
            let boundary = upcoming_cycle(t, period) * period;
            assert!(boundary >= t);
            assert_eq!(upcoming_event(t, period), triggered_event(boundary, period));
            // The event timer sees the boundary second already counted
            assert_eq!(upcoming_event(t, period), triggered_event(boundary + 1, period));
        }
    }

    #[test]
    fn test_countdown_points_at_previewed_boundary() {
        for period in [1, 7, 60] {
            for t in 0..(period * 12) {
                assert_eq!(
                    t + seconds_until_event(t, period),
                    upcoming_cycle(t, period) * period,
                    "t={} period={}",
                    t,
                    period
                );
            }
        }
        assert_eq!(seconds_until_event(0, 60), 60);
        assert_eq!(seconds_until_event(60, 60), 0);
        assert_eq!(seconds_until_event(61, 60), 59);
    }

    #[test]
    fn test_first_preview_is_first_fired_cycle() {
        assert_eq!(upcoming_cycle(0, 60), 1);
        assert_eq!(upcoming_event(0, 60), event_for_cycle(1));
        assert_eq!(triggered_cycle(61, 60), 1);
    }

    #[test]
    fn test_trigger_tolerates_late_timer() {
        // The game timer may have ticked a few more seconds when the event fires.
        let period = 60;
        for cycle in 1..10u64 {
            let expected = event_for_cycle(cycle);
            for lag in 0..period {
                assert_eq!(triggered_event(cycle * period + lag, period), expected);
            }
        }
    }

    #[test]
    fn test_event_selection_is_stable() {
        let first: Vec<RandomEvent> = (0..500).map(event_for_cycle).collect();
        let second: Vec<RandomEvent> = (0..500).map(event_for_cycle).collect();
        assert_eq!(first, second);
        // Every event is reachable.
        for event in RandomEvent::ALL {
            assert!(first.contains(&event), "{} never selected", event);
        }
    }

    #[test]
    fn test_seconds_until_event() {
        assert_eq!(seconds_until_event(0, 60), 60);
        assert_eq!(seconds_until_event(45, 60), 15);
        assert_eq!(seconds_until_event(60, 60), 60);
        assert_eq!(seconds_until_event(61, 60), 59);
    }
}
