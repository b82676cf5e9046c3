//! Stored record types
//!
//! Every physical key holds one [`Record`]: a container (ordered set or hash)
//! plus an optional absolute expiry in epoch milliseconds. Records are encoded
//! with bincode.
//!
//! Ordered sets sort ascending by score, ties broken by member bytes; the
//! descending view is the exact reverse. Scores are never NaN and `-0.0` is
//! stored as `0.0` so that ordering and equality agree.

use crate::{Result, TallyError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tally_core::StateRead;

#[derive(Debug, Clone)]
struct Scored {
    score: f64,
    member: String,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.member.cmp(&other.member))
    }
}

/// Map from member id to score with rank queries in both directions
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
    order: BTreeSet<Scored>,
}

/// Reject NaN and fold `-0.0` into `0.0`
pub fn check_score(score: f64) -> Result<f64> {
    if score.is_nan() {
        return Err(TallyError::MalformedPayload("score is not a number".into()));
    }
    Ok(score + 0.0)
}

/// Resolve inclusive rank bounds against a container of `len` members
///
/// Negative bounds count from the end (`-1` is the last member). Returns
/// `None` when the range selects nothing.
pub fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let mut stop = if stop < 0 { stop + len } else { stop };
    if start > stop || start >= len {
        return None;
    }
    if stop >= len {
        stop = len - 1;
    }
    Some((start as usize, stop as usize))
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Insert or overwrite a member's score; true when the member is new
    ///
    /// Callers validate `score` with [`check_score`] first.
    pub fn insert(&mut self, member: &str, score: f64) -> bool {
        let added = match self.scores.insert(member.to_string(), score) {
            Some(old) => {
                self.order.remove(&Scored {
                    score: old,
                    member: member.to_string(),
                });
                false
            }
            None => true,
        };
        self.order.insert(Scored {
            score,
            member: member.to_string(),
        });
        added
    }

    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.order.remove(&Scored {
                    score,
                    member: member.to_string(),
                });
                true
            }
            None => false,
        }
    }

    /// 0-based position in ascending order
    ///
    /// Counts the members ordered below `member`, so the cost grows with the
    /// rank (linear in the set size in the worst case). Boards in the tens of
    /// thousands are fine; much larger ones want an order-statistics tree.
    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = self.score(member)?;
        let probe = Scored {
            score,
            member: member.to_string(),
        };
        Some(self.order.range(..probe).count())
    }

    /// 0-based position in descending order
    pub fn rev_rank(&self, member: &str) -> Option<usize> {
        self.rank(member).map(|r| self.len() - 1 - r)
    }

    /// Members between two inclusive rank bounds
    ///
    /// Walks from the chosen end and skips to `start`, so deep pages cost
    /// O(start + count) rather than O(log n + count).
    pub fn range(&self, start: i64, stop: i64, descending: bool) -> Vec<(String, f64)> {
        let Some((first, last)) = resolve_range(self.len(), start, stop) else {
            return Vec::new();
        };
        let take = last - first + 1;
        let pick = |s: &Scored| (s.member.clone(), s.score);
        if descending {
            self.order.iter().rev().skip(first).take(take).map(pick).collect()
        } else {
            self.order.iter().skip(first).take(take).map(pick).collect()
        }
    }

    /// Remove and return up to `count` lowest-scoring members
    pub fn pop_min(&mut self, count: usize) -> Vec<(String, f64)> {
        let mut popped = Vec::with_capacity(count.min(self.len()));
        while popped.len() < count {
            let Some(lowest) = self.order.pop_first() else {
                break;
            };
            self.scores.remove(&lowest.member);
            popped.push((lowest.member, lowest.score));
        }
        popped
    }

    /// Ascending iteration
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.order.iter().map(|s| (s.member.as_str(), s.score))
    }
}

impl Serialize for SortedSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for SortedSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let pairs: Vec<(String, f64)> = Vec::deserialize(deserializer)?;
        let mut set = SortedSet::new();
        for (member, score) in pairs {
            set.insert(&member, score);
        }
        Ok(set)
    }
}

/// Field-addressable byte payloads
pub type HashValue = BTreeMap<String, Vec<u8>>;

/// Container held under one physical key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    SortedSet(SortedSet),
    Hash(HashValue),
}

/// Stored form of one physical key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Absolute deadline in epoch milliseconds; `None` persists
    pub expires_at: Option<i64>,
    pub value: Value,
}

impl Record {
    pub fn new(value: Value) -> Self {
        Self {
            expires_at: None,
            value,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now_ms)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| TallyError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| TallyError::Serialization(e.to_string()))
    }
}

/// Remaining lifetime of a physical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyTtl {
    Missing,
    Persistent,
    Remaining(i64),
}

/// Load a record, treating one past its deadline as absent
///
/// The second element is true when an expired record was found, so the
/// caller can delete it on its next write.
pub fn read_live<R: StateRead>(
    reader: &R,
    key: &str,
    now_ms: i64,
) -> Result<(Option<Record>, bool)> {
    match reader.get_state(key.as_bytes())? {
        Some(bytes) => {
            let record = Record::from_bytes(&bytes)?;
            if record.is_expired(now_ms) {
                Ok((None, true))
            } else {
                Ok((Some(record), false))
            }
        }
        None => Ok((None, false)),
    }
}
