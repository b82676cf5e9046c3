//! Policy preamble run at the start of every unit
//!
//! Order: init, construct_from, capacity trim, expiry. Cloning runs before the
//! trim so a freshly cloned leaderboard is still bounded by `capacity`.
//! Writing bodies are followed by [`settle`], which repeats init, trim and
//! expiry.

use crate::keyspace::Keyspace;
use crate::options::{Expiry, Options};
use crate::Result;
use tally_core::{observe, StateTxn};

const ZSET_SUFFIX: &str = ":z";
const INFO_SUFFIX: &str = ":h";

/// Physical keys backing one logical leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardKeys {
    pub zset: String,
    pub info: String,
}

impl LeaderboardKeys {
    pub fn new(key: &str) -> Self {
        Self {
            zset: format!("{}{}", key, ZSET_SUFFIX),
            info: format!("{}{}", key, INFO_SUFFIX),
        }
    }
}

/// What the preamble changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// The ordered set did not exist before this unit
    pub created: bool,
    /// Members copied from `construct_from`
    pub cloned: Option<usize>,
    /// Members evicted by the capacity trim
    pub evicted: usize,
}

/// Bring the pair for `key` into shape before an operation body runs
///
/// With `options == None` only the init step runs and expiry is untouched.
pub fn apply<T: StateTxn>(
    ks: &mut Keyspace<T>,
    key: &str,
    options: Option<&Options>,
) -> Result<PolicyOutcome> {
    if let Some(options) = options {
        options.validate()?;
    }

    let keys = LeaderboardKeys::new(key);
    let mut outcome = PolicyOutcome {
        created: !ks.exists(&keys.zset)?,
        ..Default::default()
    };

    ks.create_zset(&keys.zset)?;
    ks.create_hash(&keys.info)?;

    let Some(options) = options else {
        return Ok(outcome);
    };

    if let Some(source) = options.construct_from.as_deref() {
        if outcome.created && source != key {
            outcome.cloned = construct_from(ks, &keys, source)?;
        }
    }

    if let Some(capacity) = options.capacity_limit() {
        outcome.evicted = enforce_capacity(ks, &keys, capacity)?;
    }

    apply_expiry(ks, &keys, options.expiry())?;
    Ok(outcome)
}

/// Re-assert the pair after a writing body
///
/// A body may recreate one key after the preamble dropped both on a past
/// deadline, or grow the set past `capacity`. Init, trim and expiry run again
/// so the pair leaves the unit with one shared state.
pub fn settle<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    options: Option<&Options>,
) -> Result<usize> {
    ks.create_zset(&keys.zset)?;
    ks.create_hash(&keys.info)?;

    let Some(options) = options else {
        return Ok(0);
    };

    let evicted = match options.capacity_limit() {
        Some(capacity) => enforce_capacity(ks, keys, capacity)?,
        None => 0,
    };
    apply_expiry(ks, keys, options.expiry())?;
    Ok(evicted)
}

/// Give both keys the same expiry state
pub fn apply_expiry<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    expiry: Expiry,
) -> Result<()> {
    match expiry {
        Expiry::At(at) => {
            ks.pexpireat(&keys.zset, at)?;
            ks.pexpireat(&keys.info, at)?;
        }
        Expiry::Idle(ttl) => {
            ks.pexpire(&keys.zset, ttl)?;
            ks.pexpire(&keys.info, ttl)?;
        }
        Expiry::Persist => {
            ks.persist(&keys.zset)?;
            ks.persist(&keys.info)?;
        }
    }
    Ok(())
}

fn construct_from<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    source: &str,
) -> Result<Option<usize>> {
    let from = LeaderboardKeys::new(source);
    if !ks.exists(&from.zset)? {
        return Ok(None);
    }

    let copied = ks.zunionstore(&keys.zset, &[from.zset.as_str()])?;
    let fields = ks.hgetall(&from.info)?;
    let pairs: Vec<(&str, &[u8])> = fields
        .iter()
        .map(|(field, value)| (field.as_str(), value.as_slice()))
        .collect();
    ks.hset(&keys.info, &pairs)?;

    tracing::info!(
        target_key = %keys.zset,
        source_key = %from.zset,
        members = copied,
        "Constructed leaderboard from source"
    );
    Ok(Some(copied))
}

/// Evict the lowest-scoring members beyond `capacity`, with their info
pub fn enforce_capacity<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    capacity: usize,
) -> Result<usize> {
    let size = ks.zcard(&keys.zset)?;
    if size <= capacity {
        return Ok(0);
    }

    let popped = ks.zpopmin(&keys.zset, size - capacity)?;
    let ids: Vec<&str> = popped.iter().map(|(id, _)| id.as_str()).collect();
    ks.hdel(&keys.info, &ids)?;

    tracing::warn!(
        key = %keys.zset,
        capacity,
        evicted = popped.len(),
        "Evicted members over capacity"
    );
    observe::record_evictions(popped.len());
    Ok(popped.len())
}
