use crate::entry::EntryInput;
use crate::keyspace::Keyspace;
use crate::policy::LeaderboardKeys;
use crate::{Result, TallyError};
use std::collections::HashSet;
use tally_core::StateTxn;

/// Append new ids ahead of every existing one
///
/// Scores act as a sequence counter that climbs from the current top score
/// (0 on an empty board), so each new id lands above everything already
/// ranked and the latest append takes rank 0. Ids that already hold a score
/// are skipped, as are repeats within the batch.
pub fn append<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    entries: &[EntryInput],
) -> Result<usize> {
    let mut counter = ks
        .zrevrange(&keys.zset, 0, 0)?
        .first()
        .map_or(0.0, |(_, score)| *score);

    let mut seen = HashSet::new();
    let mut scores: Vec<(&str, f64)> = Vec::new();
    let mut fields: Vec<(&str, &[u8])> = Vec::new();
    for entry in entries {
        if !seen.insert(entry.id.as_str()) || ks.zscore(&keys.zset, &entry.id)?.is_some() {
            continue;
        }
        counter += 1.0;
        scores.push((entry.id.as_str(), counter));
        if let Some(info) = entry.nonempty_info() {
            fields.push((entry.id.as_str(), info));
        }
    }

    if scores.is_empty() {
        return Ok(0);
    }
    let added = ks.zadd(&keys.zset, &scores)?;
    ks.hset(&keys.info, &fields)?;
    Ok(added)
}

/// Exchange the scores of two ids
///
/// Neither present: no-op, returns 0. One present: the other is created at
/// the same score and 1 is returned. Both present: scores are swapped.
pub fn swap_by_id<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    id_a: &str,
    id_b: &str,
) -> Result<usize> {
    let score_a = ks.zscore(&keys.zset, id_a)?;
    let score_b = ks.zscore(&keys.zset, id_b)?;

    match (score_a, score_b) {
        (None, None) => Ok(0),
        (Some(score), None) => ks.zadd(&keys.zset, &[(id_b, score)]),
        (None, Some(score)) => ks.zadd(&keys.zset, &[(id_a, score)]),
        (Some(a), Some(b)) => ks.zadd(&keys.zset, &[(id_a, b), (id_b, a)]),
    }
}

/// Exchange the scores of the members at two descending ranks
///
/// Both ranks are resolved before anything is written; a rank with no member
/// fails the unit with [`TallyError::RankNotFound`].
pub fn swap_by_rank<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    rank_a: i64,
    rank_b: i64,
) -> Result<usize> {
    let (id_a, score_a) = member_at(ks, keys, rank_a)?;
    let (id_b, score_b) = member_at(ks, keys, rank_b)?;
    if id_a == id_b {
        return Ok(0);
    }
    ks.zadd(&keys.zset, &[(id_a.as_str(), score_b), (id_b.as_str(), score_a)])
}

fn member_at<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    rank: i64,
) -> Result<(String, f64)> {
    ks.zrevrange(&keys.zset, rank, rank)?
        .into_iter()
        .next()
        .ok_or(TallyError::RankNotFound { rank })
}
