// Copyright 2025 OpenObserve Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::sync::Arc;

use config::{RwHashMap, metrics};

use crate::common::meta::{alarm::NodeCriteria, node::Node};

/// Concurrent directory of the latest inventory snapshot per node, keyed by
/// the node identity key with a numeric-id secondary index. Reads are
/// lock-free; the nodes-topic consumer is the only writer.
pub struct NodeCache {
    nodes: RwHashMap<String, Arc<Node>>,
    // numeric id -> identity key currently holding that node
    by_id: RwHashMap<i64, String>,
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCache {
    pub fn new() -> Self {
        Self {
            nodes: RwHashMap::default(),
            by_id: RwHashMap::default(),
        }
    }

    /// Insert or wholesale-replace the snapshot for the node's identity key.
    /// The primary map is written before the secondary index, so a reader
    /// that found an id in the index always finds the entry behind it.
    pub fn put(&self, node: Node) {
        let key = node.identity_key();
        let node = Arc::new(node);
        let id = node.id;
        if let Some(prev) = self.nodes.insert(key.clone(), node)
            && prev.id != id
        {
            self.by_id.remove_if(&prev.id, |_, v| v == &key);
        }
        if id > 0 {
            self.by_id.insert(id, key);
        }
        metrics::CACHED_NODES.set(self.nodes.len() as i64);
    }

    /// Tombstone removal by identity key.
    pub fn remove(&self, key: &str) -> Option<Arc<Node>> {
        let removed = self.nodes.remove(key).map(|(_, node)| node);
        if let Some(node) = &removed {
            self.by_id.remove_if(&node.id, |_, v| v == key);
            metrics::CACHED_NODES.set(self.nodes.len() as i64);
        }
        removed
    }

    pub fn remove_by_id(&self, id: i64) -> Option<Arc<Node>> {
        let key = self.by_id.get(&id).map(|v| v.value().clone())?;
        self.remove(&key)
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<Node>> {
        self.nodes.get(key).map(|v| v.value().clone())
    }

    pub fn get_by_id(&self, id: i64) -> Option<Arc<Node>> {
        let key = self.by_id.get(&id).map(|v| v.value().clone())?;
        self.get_by_key(&key)
    }

    /// Deterministic probe order: the foreign-source pair when complete,
    /// the numeric id otherwise. A miss is a normal outcome.
    pub fn get_by_criteria(&self, criteria: &NodeCriteria) -> Option<Arc<Node>> {
        if !criteria.foreign_source.is_empty() && !criteria.foreign_id.is_empty() {
            return self.get_by_key(&format!(
                "{}:{}",
                criteria.foreign_source, criteria.foreign_id
            ));
        }
        if criteria.id > 0 {
            return self.get_by_id(criteria.id);
        }
        None
    }

    pub fn snapshot(&self) -> Vec<Arc<Node>> {
        self.nodes.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&self) {
        self.nodes.clear();
        self.by_id.clear();
        metrics::CACHED_NODES.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, fs: &str, fid: &str, label: &str) -> Node {
        Node {
            id,
            foreign_source: fs.to_string(),
            foreign_id: fid.to_string(),
            label: label.to_string(),
            ..Default::default()
        }
    }

    fn criteria(id: i64, fs: &str, fid: &str) -> NodeCriteria {
        NodeCriteria {
            id,
            foreign_source: fs.to_string(),
            foreign_id: fid.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_put_replaces_not_merges() {
        let cache = NodeCache::new();
        cache.put(node(10, "fs", "n10", "router-1"));
        cache.put(node(10, "fs", "n10", "router-1-renamed"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_by_key("fs:n10").unwrap().label, "router-1-renamed");
    }

    #[test]
    fn test_size_tracks_distinct_live_keys() {
        let cache = NodeCache::new();
        cache.put(node(1, "fs", "a", "a"));
        cache.put(node(2, "fs", "b", "b"));
        cache.put(node(3, "", "", "by-id"));
        assert_eq!(cache.len(), 3);
        cache.remove("fs:a");
        assert_eq!(cache.len(), 2);
        // tombstone for an unknown node key is a no-op
        assert!(cache.remove("fs:ghost").is_none());
        assert_eq!(cache.len(), 2);
        cache.remove("3");
        cache.remove("fs:b");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_criteria_prefers_foreign_pair() {
        let cache = NodeCache::new();
        cache.put(node(10, "fs", "n10", "router-1"));
        let hit = cache.get_by_criteria(&criteria(10, "fs", "n10")).unwrap();
        assert_eq!(hit.label, "router-1");
        // incomplete pair falls back to the id index
        let hit = cache.get_by_criteria(&criteria(10, "fs", "")).unwrap();
        assert_eq!(hit.label, "router-1");
        // neither half present and no usable id is a miss
        assert!(cache.get_by_criteria(&criteria(0, "", "")).is_none());
    }

    #[test]
    fn test_secondary_index_follows_primary_key() {
        let cache = NodeCache::new();
        // node first appears keyed by raw id, then gets requisitioned
        cache.put(node(10, "", "", "plain"));
        assert_eq!(cache.get_by_id(10).unwrap().label, "plain");
        cache.put(node(10, "fs", "n10", "managed"));
        assert_eq!(cache.get_by_id(10).unwrap().label, "managed");
        // the stale raw-id entry is still in the primary map under "10",
        // but the index resolves to the latest write
        cache.remove("10");
        assert_eq!(cache.get_by_id(10).unwrap().label, "managed");
    }

    #[test]
    fn test_remove_by_id() {
        let cache = NodeCache::new();
        cache.put(node(7, "fs", "n7", "x"));
        assert!(cache.remove_by_id(7).is_some());
        assert!(cache.get_by_key("fs:n7").is_none());
        assert!(cache.get_by_id(7).is_none());
    }

    #[test]
    fn test_clear() {
        let cache = NodeCache::new();
        cache.put(node(1, "", "", "a"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get_by_id(1).is_none());
    }
}
