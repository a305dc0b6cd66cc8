use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// How many more hops a crawl may take from a page
///
/// On the wire a depth is a signed integer where `-1` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Depth {
    /// Crawl until no new pages are found
    Unbounded,
    /// Crawl this many more hops
    Remaining(u32),
}

impl Depth {
    /// Wire value for an unbounded depth
    pub const UNBOUNDED: i64 = -1;

    /// Returns true when at least one more hop is allowed
    pub fn has_remaining(&self) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Remaining(n) => *n > 0,
        }
    }

    /// Budget for the next hop down; saturates at zero
    pub fn decrement(self) -> Self {
        match self {
            Self::Unbounded => Self::Unbounded,
            Self::Remaining(n) => Self::Remaining(n.saturating_sub(1)),
        }
    }

    /// Returns true if a walk that already took `hops` hops may take another
    pub fn allows_hop(&self, hops: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Remaining(n) => hops < *n as usize,
        }
    }

    /// Returns true if a tree of the given depth satisfies this budget
    ///
    /// An unbounded budget is satisfied by any tree.
    pub fn is_reached_by(&self, max_depth: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Remaining(n) => max_depth >= *n as usize,
        }
    }

    /// The part of this budget left once `shallower` hops are taken
    pub fn beyond(self, shallower: Depth) -> Self {
        match (self, shallower) {
            (Self::Unbounded, _) => Self::Unbounded,
            (Self::Remaining(_), Self::Unbounded) => Self::Remaining(0),
            (Self::Remaining(a), Self::Remaining(b)) => Self::Remaining(a.saturating_sub(b)),
        }
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::Remaining(0)
    }
}

impl From<i64> for Depth {
    fn from(value: i64) -> Self {
        if value < 0 {
            Self::Unbounded
        } else {
            Self::Remaining(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }
}

impl From<Depth> for i64 {
    fn from(depth: Depth) -> Self {
        match depth {
            Depth::Unbounded => Depth::UNBOUNDED,
            Depth::Remaining(n) => i64::from(n),
        }
    }
}

// Unbounded sorts above every finite budget.
impl Ord for Depth {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Unbounded, Self::Unbounded) => Ordering::Equal,
            (Self::Unbounded, Self::Remaining(_)) => Ordering::Greater,
            (Self::Remaining(_), Self::Unbounded) => Ordering::Less,
            (Self::Remaining(a), Self::Remaining(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Depth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Remaining(n) => write!(f, "{}", n),
        }
    }
}
