//! Sharded, per-shard-LRU buffer of results awaiting collection by their
//! submitter (spec §4.7).

use crate::result::TaskResult;
use md5::{Digest, Md5};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Hash a task id into a shard index the same way the spec names: MD5 of
/// the UTF-8 bytes, low 4 bytes, little-endian, mod `shard_count`.
fn shard_index(task_id: &str, shard_count: usize) -> usize {
    let digest = Md5::digest(task_id.as_bytes());
    let low4 = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (low4 as usize) % shard_count
}

struct Shard {
    map: HashMap<String, TaskResult>,
    /// Most-recently-used at the back.
    order: VecDeque<String>,
    max_len: usize,
}

impl Shard {
    fn new(max_len: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_len,
        }
    }

    fn touch(&mut self, task_id: &str) {
        if let Some(pos) = self.order.iter().position(|id| id == task_id) {
            let id = self.order.remove(pos).unwrap();
            self.order.push_back(id);
        }
    }

    fn put(&mut self, result: TaskResult) {
        let task_id = result.task_id.clone();
        if self.map.insert(task_id.clone(), result).is_some() {
            self.touch(&task_id);
            return;
        }
        self.order.push_back(task_id);
        if self.map.len() > self.max_len {
            if let Some(lru) = self.order.pop_front() {
                self.map.remove(&lru);
            }
        }
    }

    fn get(&mut self, task_id: &str) -> Option<TaskResult> {
        let result = self.map.remove(task_id);
        if result.is_some() {
            if let Some(pos) = self.order.iter().position(|id| id == task_id) {
                self.order.remove(pos);
            }
        }
        result
    }
}

/// An N-shard associative store mapping task-id to [`TaskResult`]. Each
/// shard has its own `parking_lot::Mutex`; no global lock, and shard mutexes
/// are never acquired nested across shards (spec §5 lock-ordering rule).
pub struct ShardedResultCache {
    shards: Vec<Mutex<Shard>>,
}

impl ShardedResultCache {
    pub fn new(shard_count: usize, max_per_shard: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Mutex::new(Shard::new(max_per_shard)))
            .collect();
        Self { shards }
    }

    pub fn put(&self, result: TaskResult) {
        let idx = shard_index(&result.task_id, self.shards.len());
        self.shards[idx].lock().put(result);
    }

    /// Consuming get: removes and returns the entry if present. A second
    /// call for the same id returns `None`.
    pub fn get(&self, task_id: &str) -> Option<TaskResult> {
        let idx = shard_index(task_id, self.shards.len());
        self.shards[idx].lock().get(task_id)
    }

    pub fn size(&self) -> usize {
        self.shards.iter().map(|s| s.lock().map.len()).sum()
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            let mut shard = shard.lock();
            shard.map.clear();
            shard.order.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn result(id: &str) -> TaskResult {
        TaskResult::success(id, json!({"ok": true}), Utc::now())
    }

    #[test]
    fn put_then_get_once() {
        let cache = ShardedResultCache::new(16, 100);
        cache.put(result("abc"));
        assert!(cache.get("abc").is_some());
        assert!(cache.get("abc").is_none());
    }

    #[test]
    fn evicts_lru_beyond_capacity() {
        let cache = ShardedResultCache::new(1, 2);
        cache.put(result("a"));
        cache.put(result("b"));
        cache.put(result("c")); // evicts "a"
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn size_and_clear() {
        let cache = ShardedResultCache::new(4, 100);
        for i in 0..10 {
            cache.put(result(&format!("id-{i}")));
        }
        assert_eq!(cache.size(), 10);
        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::collection::hash_set;
        use proptest::prelude::*;

        proptest! {
            /// Every id put into a cache with room for all of them is
            /// retrievable exactly once, regardless of shard count or the
            /// order the ids were inserted in.
            #[test]
            fn put_then_get_once_for_any_id_set(
                ids in hash_set("[a-z0-9-]{1,20}", 1..50),
                shard_count in 1usize..16,
            ) {
                let ids: Vec<String> = ids.into_iter().collect();
                let cache = ShardedResultCache::new(shard_count, ids.len() + 1);
                for id in &ids {
                    cache.put(result(id));
                }
                for id in &ids {
                    prop_assert!(cache.get(id).is_some(), "missing {id} on first get");
                    prop_assert!(cache.get(id).is_none(), "{id} served twice");
                }
            }

            /// `size()` always equals the number of distinct ids put, as long
            /// as capacity never forces an eviction.
            #[test]
            fn size_tracks_distinct_ids_below_capacity(
                ids in hash_set("[a-z0-9-]{1,20}", 1..50),
                shard_count in 1usize..16,
            ) {
                let ids: Vec<String> = ids.into_iter().collect();
                let cache = ShardedResultCache::new(shard_count, ids.len() + 1);
                for id in &ids {
                    cache.put(result(id));
                }
                prop_assert_eq!(cache.size(), ids.len());
            }
        }
    }
}
