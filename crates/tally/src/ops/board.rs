use crate::entry::{Entry, EntryInput};
use crate::keyspace::Keyspace;
use crate::policy::LeaderboardKeys;
use crate::values::resolve_range;
use crate::Result;
use tally_core::StateTxn;

/// Drop ids from both the ordered set and the info map
///
/// Returns how many ids were ranked before removal.
pub fn remove_id<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    ids: &[&str],
) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    ks.hdel(&keys.info, ids)?;
    ks.zrem(&keys.zset, ids)
}

/// Overwrite scores and any non-empty info; returns new member count
pub fn set_score<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    entries: &[EntryInput],
) -> Result<usize> {
    if entries.is_empty() {
        return Ok(0);
    }

    let scores: Vec<(&str, f64)> = entries.iter().map(|e| (e.id.as_str(), e.score)).collect();
    let added = ks.zadd(&keys.zset, &scores)?;
    write_info(ks, keys, entries)?;
    Ok(added)
}

/// Add each entry's score to the member's current one
///
/// The result holds the post-increment scores in input order.
pub fn inc_score<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    entries: &[EntryInput],
) -> Result<Vec<f64>> {
    let mut scores = Vec::with_capacity(entries.len());
    for entry in entries {
        scores.push(ks.zincrby(&keys.zset, &entry.id, entry.score)?);
    }
    write_info(ks, keys, entries)?;
    Ok(scores)
}

/// Overwrite info fields without touching ranks
///
/// Entries without info are skipped. Returns how many fields were new.
pub fn set_info<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    entries: &[EntryInput],
) -> Result<usize> {
    let fields: Vec<(&str, &[u8])> = entries
        .iter()
        .filter_map(|e| e.info.as_deref().map(|info| (e.id.as_str(), info)))
        .collect();
    ks.hset(&keys.info, &fields)
}

/// Members between two inclusive rank bounds, highest score first
pub fn get_range<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    start: i64,
    stop: i64,
) -> Result<Vec<Entry>> {
    let Some((first, _)) = resolve_range(ks.zcard(&keys.zset)?, start, stop) else {
        return Ok(Vec::new());
    };

    let members = ks.zrevrange(&keys.zset, start, stop)?;
    let ids: Vec<&str> = members.iter().map(|(id, _)| id.as_str()).collect();
    let infos = ks.hmget(&keys.info, &ids)?;

    Ok(members
        .iter()
        .zip(infos)
        .enumerate()
        .map(|(offset, ((id, score), info))| Entry {
            id: id.clone(),
            rank: first + offset,
            score: *score,
            info,
        })
        .collect())
}

/// A single member with rank and info, `None` when unranked
pub fn get_by_id<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    id: &str,
) -> Result<Option<Entry>> {
    let Some(rank) = ks.zrevrank(&keys.zset, id)? else {
        return Ok(None);
    };
    let Some(score) = ks.zscore(&keys.zset, id)? else {
        return Ok(None);
    };
    let info = ks.hget(&keys.info, id)?;

    Ok(Some(Entry {
        id: id.to_string(),
        rank,
        score,
        info,
    }))
}

fn write_info<T: StateTxn>(
    ks: &mut Keyspace<T>,
    keys: &LeaderboardKeys,
    entries: &[EntryInput],
) -> Result<usize> {
    let fields: Vec<(&str, &[u8])> = entries
        .iter()
        .filter_map(|e| e.nonempty_info().map(|info| (e.id.as_str(), info)))
        .collect();
    ks.hset(&keys.info, &fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::{keyspace, open_store};
    use crate::TallyError;

    fn keys() -> LeaderboardKeys {
        LeaderboardKeys::new("weekly")
    }

    #[test]
    fn test_set_score_then_get_by_id() {
        let (store, _dir) = open_store();
        let mut ks = keyspace(&store);

        let added = set_score(&mut ks, &keys(), &[EntryInput::new("a", 5.0).with_info("x")]).unwrap();
        assert_eq!(added, 1);

        let entry = get_by_id(&mut ks, &keys(), "a").unwrap().unwrap();
        assert_eq!(entry.rank, 0);
        assert_eq!(entry.score, 5.0);
        assert_eq!(entry.info_str(), Some("x"));
        assert!(get_by_id(&mut ks, &keys(), "missing").unwrap().is_none());
    }

    #[test]
    fn test_set_score_counts_added_not_updated() {
        let (store, _dir) = open_store();
        let mut ks = keyspace(&store);

        set_score(&mut ks, &keys(), &[EntryInput::new("a", 1.0)]).unwrap();
        let added = set_score(
            &mut ks,
            &keys(),
            &[EntryInput::new("a", 2.0), EntryInput::new("b", 3.0)],
        )
        .unwrap();
        assert_eq!(added, 1);
        assert_eq!(set_score(&mut ks, &keys(), &[]).unwrap(), 0);
    }

    #[test]
    fn test_empty_info_does_not_overwrite() {
        let (store, _dir) = open_store();
        let mut ks = keyspace(&store);

        set_score(&mut ks, &keys(), &[EntryInput::new("a", 1.0).with_info("keep")]).unwrap();
        set_score(&mut ks, &keys(), &[EntryInput::new("a", 2.0).with_info("")]).unwrap();
        assert_eq!(ks.hget("weekly:h", "a").unwrap(), Some(b"keep".to_vec()));
    }

    #[test]
    fn test_inc_score_aligned_with_input() {
        let (store, _dir) = open_store();
        let mut ks = keyspace(&store);

        set_score(&mut ks, &keys(), &[EntryInput::new("a", 10.0)]).unwrap();
        let scores = inc_score(
            &mut ks,
            &keys(),
            &[
                EntryInput::new("b", 1.5),
                EntryInput::new("a", -4.0),
                EntryInput::new("b", 1.0).with_info("twice"),
            ],
        )
        .unwrap();
        assert_eq!(scores, vec![1.5, 6.0, 2.5]);
        assert_eq!(ks.hget("weekly:h", "b").unwrap(), Some(b"twice".to_vec()));
    }

    #[test]
    fn test_inc_score_nan_rejected() {
        let (store, _dir) = open_store();
        let mut ks = keyspace(&store);

        let err = inc_score(&mut ks, &keys(), &[EntryInput::new("a", f64::NAN)]).unwrap_err();
        assert!(matches!(err, TallyError::MalformedPayload(_)));
    }

    #[test]
    fn test_set_info_does_not_rank() {
        let (store, _dir) = open_store();
        let mut ks = keyspace(&store);

        let set = set_info(
            &mut ks,
            &keys(),
            &[EntryInput::new("a", 0.0).with_info("x"), EntryInput::new("b", 0.0)],
        )
        .unwrap();
        assert_eq!(set, 1);
        assert_eq!(ks.zcard("weekly:z").unwrap(), 0);
        assert!(get_by_id(&mut ks, &keys(), "a").unwrap().is_none());
    }

    #[test]
    fn test_remove_id_is_idempotent() {
        let (store, _dir) = open_store();
        let mut ks = keyspace(&store);

        set_score(&mut ks, &keys(), &[EntryInput::new("a", 1.0).with_info("x")]).unwrap();
        assert_eq!(remove_id(&mut ks, &keys(), &["a", "ghost"]).unwrap(), 1);
        assert_eq!(remove_id(&mut ks, &keys(), &["a"]).unwrap(), 0);
        assert_eq!(ks.hget("weekly:h", "a").unwrap(), None);
        assert_eq!(remove_id(&mut ks, &keys(), &[]).unwrap(), 0);
    }

    #[test]
    fn test_get_range_ranks_and_info() {
        let (store, _dir) = open_store();
        let mut ks = keyspace(&store);

        set_score(
            &mut ks,
            &keys(),
            &[
                EntryInput::new("a", 1.0),
                EntryInput::new("b", 2.0).with_info("bee"),
                EntryInput::new("c", 3.0),
            ],
        )
        .unwrap();

        let top = get_range(&mut ks, &keys(), 0, 1).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!((top[0].id.as_str(), top[0].rank), ("c", 0));
        assert_eq!((top[1].id.as_str(), top[1].rank), ("b", 1));
        assert_eq!(top[1].info_str(), Some("bee"));
        assert!(top[0].info.is_none());

        let tail = get_range(&mut ks, &keys(), -1, -1).unwrap();
        assert_eq!((tail[0].id.as_str(), tail[0].rank), ("a", 2));

        assert!(get_range(&mut ks, &keys(), 5, 9).unwrap().is_empty());
    }
}
