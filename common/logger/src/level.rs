use lazy_static::lazy_static;
use log::*;
use std::borrow::Cow;
use std::collections::HashMap;

/// The numeric severity of a message or of a sink/channel floor.
pub type Rank = u32;

/// Sentinel rank produced for level names that cannot be resolved.
/// Used as a floor, it lets everything through.
pub const NOTSET: Rank = 0;
pub const DEBUG: Rank = 10;
pub const INFO: Rank = 20;
pub const WARNING: Rank = 30;
pub const ERROR: Rank = 40;
pub const CRITICAL: Rank = 50;

/// Distance between the highest built-in severity and the fatal tier.
pub const FATAL_OFFSET: Rank = 10;
pub const FATAL: Rank = CRITICAL + FATAL_OFFSET;

/// Call-site level that suppresses a single log call entirely.
/// It is not a severity and never reaches the registry.
pub const IGNORE_LEVEL: &str = "ignore";

/// The canonical level names, in strictly increasing rank order.
pub static LEVELS: [(&str, Rank); 6] = [
    ("debug", DEBUG),
    ("info", INFO),
    ("warning", WARNING),
    ("error", ERROR),
    ("critical", CRITICAL),
    ("fatal", FATAL),
];

// "warn" is accepted on input but is never enumerated, so it cannot produce
// a second per-level file next to "warning".
const ALIASES: [(&str, &str); 1] = [("warn", "warning")];

lazy_static! {
    static ref RANKS_BY_NAME: HashMap<&'static str, Rank> = {
        let mut ranks: HashMap<&'static str, Rank> = LEVELS.iter().copied().collect();
        for (alias, canonical) in ALIASES.iter().copied() {
            if let Some(rank) = ranks.get(canonical).copied() {
                ranks.insert(alias, rank);
            }
        }
        ranks
    };
    static ref DISPLAY_NAMES: HashMap<Rank, &'static str> = {
        let mut names = HashMap::new();
        names.insert(NOTSET, "NOTSET");
        names.insert(DEBUG, "DEBUG");
        names.insert(INFO, "INFO");
        names.insert(WARNING, "WARNING");
        names.insert(ERROR, "ERROR");
        names.insert(CRITICAL, "CRITICAL");
        names.insert(FATAL, "FATAL");
        names
    };
}

/// The outcome of resolving a level name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelResolution {
    pub rank: Rank,
    /// false when the name was unknown and `rank` is the [`NOTSET`] sentinel.
    pub recognized: bool,
}

/// The fixed, process-wide mapping from level names to ranks.
pub struct LevelRegistry;

impl LevelRegistry {
    /// Resolves a level name. Unknown names never fail: they resolve to [`NOTSET`],
    /// which disables filtering wherever the rank is used as a floor.
    pub fn resolve(name: &str) -> LevelResolution {
        match RANKS_BY_NAME.get(name) {
            Some(rank) => LevelResolution { rank: *rank, recognized: true },
            None => {
                warn!(
                    "LevelRegistry - unknown level name [{}]; falling back to NOTSET (no filtering)",
                    name
                );
                LevelResolution { rank: NOTSET, recognized: false }
            }
        }
    }

    pub fn rank(name: &str) -> Rank {
        Self::resolve(name).rank
    }

    pub fn is_known(name: &str) -> bool {
        RANKS_BY_NAME.contains_key(name)
    }

    /// The upper-case name rendered in formatted lines.
    pub fn display_name(rank: Rank) -> Cow<'static, str> {
        match DISPLAY_NAMES.get(&rank) {
            Some(name) => Cow::Borrowed(*name),
            None => Cow::Owned(format!("Level {}", rank)),
        }
    }

    /// Canonical levels whose rank is at or above `floor`, in rank order.
    pub fn levels_at_or_above(floor: Rank) -> impl Iterator<Item = (&'static str, Rank)> {
        LEVELS.iter().copied().filter(move |(_, rank)| *rank >= floor)
    }
}
