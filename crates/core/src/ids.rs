use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Produces a statistically unique identifier on every call.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Returns the instant stamped onto created records.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Identifier scheme used for newly created categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Random UUID (v4).
    Random,
    /// Time-ordered UUID (v7); ids sort by creation time.
    #[default]
    TimeOrdered,
}

impl IdStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::TimeOrdered => "time_ordered",
        }
    }

    /// Returns a generator producing hyphenated UUID strings for this strategy.
    pub fn generator(self) -> IdGenerator {
        match self {
            Self::Random => Arc::new(|| Uuid::new_v4().to_string()),
            Self::TimeOrdered => Arc::new(|| Uuid::now_v7().to_string()),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown id strategy '{0}' (expected 'random' or 'time_ordered')")]
pub struct ParseIdStrategyError(pub String);

impl FromStr for IdStrategy {
    type Err = ParseIdStrategyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "random" | "v4" => Ok(Self::Random),
            "time" | "time_ordered" | "v7" => Ok(Self::TimeOrdered),
            _ => Err(ParseIdStrategyError(value.to_string())),
        }
    }
}

/// Clock backed by the system wall clock.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Clock that always returns `at`.
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}

/// Deterministic generator yielding `{prefix}-1`, `{prefix}-2`, ...
///
/// Unique within a single generator instance only. Intended for tests and
/// replays where stable identifiers matter more than global uniqueness.
pub fn sequence_ids(prefix: impl Into<String>) -> IdGenerator {
    let prefix = prefix.into();
    let counter = AtomicU64::new(0);
    Arc::new(move || {
        let next = counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{next}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn parses_strategy_aliases() {
        assert_eq!("random".parse::<IdStrategy>(), Ok(IdStrategy::Random));
        assert_eq!("V4".parse::<IdStrategy>(), Ok(IdStrategy::Random));
        assert_eq!("time".parse::<IdStrategy>(), Ok(IdStrategy::TimeOrdered));
        assert_eq!(" time_ordered ".parse::<IdStrategy>(), Ok(IdStrategy::TimeOrdered));
        assert_eq!("v7".parse::<IdStrategy>(), Ok(IdStrategy::TimeOrdered));
        assert_eq!(
            "v1".parse::<IdStrategy>(),
            Err(ParseIdStrategyError("v1".to_string()))
        );
    }

    #[test]
    fn default_strategy_is_time_ordered() {
        assert_eq!(IdStrategy::default(), IdStrategy::TimeOrdered);
    }

    #[test]
    fn generators_emit_expected_uuid_versions() {
        let random = IdStrategy::Random.generator()();
        let ordered = IdStrategy::TimeOrdered.generator()();
        assert_eq!(Uuid::parse_str(&random).unwrap().get_version_num(), 4);
        assert_eq!(Uuid::parse_str(&ordered).unwrap().get_version_num(), 7);
    }

    #[test]
    fn generators_do_not_repeat() {
        for strategy in [IdStrategy::Random, IdStrategy::TimeOrdered] {
            let generate = strategy.generator();
            let ids: HashSet<String> = (0..1_000).map(|_| generate()).collect();
            assert_eq!(ids.len(), 1_000, "{strategy} produced a duplicate id");
        }
    }

    #[test]
    fn sequence_ids_count_from_one() {
        let generate = sequence_ids("cat");
        assert_eq!(generate(), "cat-1");
        assert_eq!(generate(), "cat-2");
        assert_eq!(sequence_ids("cat")(), "cat-1");
    }

    #[test]
    fn fixed_clock_never_moves() {
        let at = Utc.with_ymd_and_hms(2023, 11, 5, 8, 30, 0).unwrap();
        let clock = fixed_clock(at);
        assert_eq!(clock(), at);
        assert_eq!(clock(), at);
    }

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Utc::now();
        let observed = system_clock()();
        let after = Utc::now();
        assert!(before <= observed && observed <= after);
    }
}
