//! Karma and levels.
//!
//! Karma is a non-negative integer. A user's level is derived from it through
//! fixed thresholds and is never tracked independently.

use std::fmt;

use serde::{Serialize, Serializer};

/// Lowest karma that earns [`Level::Neighbor`].
pub const NEIGHBOR_THRESHOLD: i64 = 50;

/// Lowest karma that earns [`Level::GoodSoul`].
pub const GOOD_SOUL_THRESHOLD: i64 = 200;

/// Lowest karma that earns [`Level::Legend`].
pub const LEGEND_THRESHOLD: i64 = 500;

/// Reputation tier. Ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Newcomer,
    Neighbor,
    GoodSoul,
    Legend,
}

impl Level {
    /// Human-readable label shown on profiles.
    pub fn label(&self) -> &'static str {
        match self {
            Level::Newcomer => "Newcomer",
            Level::Neighbor => "Neighbor",
            Level::GoodSoul => "Good soul",
            Level::Legend => "Legend of the building",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Level for a karma value. Thresholds are inclusive lower bounds.
pub fn level_for(karma: i64) -> Level {
    if karma >= LEGEND_THRESHOLD {
        Level::Legend
    } else if karma >= GOOD_SOUL_THRESHOLD {
        Level::GoodSoul
    } else if karma >= NEIGHBOR_THRESHOLD {
        Level::Neighbor
    } else {
        Level::Newcomer
    }
}

/// Result of applying a karma delta. Callers persist both fields together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KarmaUpdate {
    pub karma: i64,
    pub level: Level,
}

/// Apply `delta` to `current`, flooring the result at zero.
pub fn apply_delta(current: i64, delta: i64) -> KarmaUpdate {
    let karma = current.saturating_add(delta).max(0);
    KarmaUpdate {
        karma,
        level: level_for(karma),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for(0), Level::Newcomer);
        assert_eq!(level_for(49), Level::Newcomer);
        assert_eq!(level_for(50), Level::Neighbor);
        assert_eq!(level_for(199), Level::Neighbor);
        assert_eq!(level_for(200), Level::GoodSoul);
        assert_eq!(level_for(499), Level::GoodSoul);
        assert_eq!(level_for(500), Level::Legend);
        assert_eq!(level_for(1000), Level::Legend);
    }

    #[test]
    fn test_level_labels() {
        assert_eq!(level_for(0).label(), "Newcomer");
        assert_eq!(level_for(50).label(), "Neighbor");
        assert_eq!(level_for(200).label(), "Good soul");
        assert_eq!(level_for(500).label(), "Legend of the building");
    }

    #[test]
    fn test_level_is_monotonic() {
        let mut previous = level_for(0);
        for karma in 0..=1200 {
            let level = level_for(karma);
            assert!(level >= previous, "level dropped at karma {}", karma);
            assert_eq!(level, level_for(karma));
            previous = level;
        }
    }

    #[test]
    fn test_apply_delta_clamps_at_zero() {
        let update = apply_delta(30, -100);
        assert_eq!(update.karma, 0);
        assert_eq!(update.level, Level::Newcomer);
    }

    #[test]
    fn test_apply_delta_crosses_threshold() {
        let update = apply_delta(150, 50);
        assert_eq!(update.karma, 200);
        assert_eq!(update.level, Level::GoodSoul);
    }

    #[test]
    fn test_apply_delta_never_negative() {
        let karmas = [0, 1, 49, 50, 499, 500, 10_000];
        let deltas = [i64::MIN, -10_001, -500, -1, 0, 1, 500, i64::MAX];
        for &k in &karmas {
            for &d in &deltas {
                let update = apply_delta(k, d);
                assert!(update.karma >= 0);
                if let Some(sum) = k.checked_add(d) {
                    if sum >= 0 {
                        assert_eq!(update.karma, sum);
                    }
                }
                assert_eq!(update.level, level_for(update.karma));
            }
        }
    }

    #[test]
    fn test_level_serializes_as_label() {
        let json = serde_json::to_value(Level::Legend).unwrap();
        assert_eq!(json, serde_json::json!("Legend of the building"));
    }
}
