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

use config::{RwHashMap, metrics, utils::time};

use crate::{
    common::meta::{alarm::Alarm, alert::Alert},
    service::{
        mapper::{self, MapperSettings},
        node_cache::NodeCache,
        sink::AlertSink,
    },
};

/// One active alarm: the last raw record, the alert it last mapped to, and
/// when it was last pushed. The alert is re-derived on every resend so node
/// updates land on the next tick; the stored copy only serves tombstones,
/// where the raw record is already gone.
#[derive(Clone)]
pub struct CachedAlarm {
    pub alarm: Arc<Alarm>,
    pub alert: Alert,
    /// epoch milliseconds
    pub last_sent: i64,
}

#[derive(Clone)]
struct ResolvedAlarm {
    alert: Alert,
    /// epoch milliseconds
    expires_at: i64,
}

/// The table of currently-firing alarms, keyed by reduction key. Also keeps
/// a shadow table of recent resolves so a lost resolve POST is repaired by a
/// later resend tick.
pub struct ActiveAlarmTable {
    entries: RwHashMap<String, CachedAlarm>,
    resolved: RwHashMap<String, ResolvedAlarm>,
    nodes: Arc<NodeCache>,
    sink: Arc<AlertSink>,
    settings: MapperSettings,
    resolved_retention_ms: i64,
}

impl ActiveAlarmTable {
    pub fn new(
        nodes: Arc<NodeCache>,
        sink: Arc<AlertSink>,
        settings: MapperSettings,
        resolved_retention_ms: i64,
    ) -> Self {
        Self {
            entries: RwHashMap::default(),
            resolved: RwHashMap::default(),
            nodes,
            sink,
            settings,
            resolved_retention_ms,
        }
    }

    /// Apply a non-tombstone alarm record. Clear records resolve, everything
    /// else refreshes the table and pushes one immediate fire.
    pub fn upsert(&self, alarm: Alarm) {
        if alarm.is_clear() {
            let key = alarm.reduction_key.clone();
            self.resolve(&key, Some(&alarm));
            return;
        }
        if !self.settings.accepts(&alarm) {
            log::debug!(
                "[ALARM_TABLE] filtered alarm {} ({})",
                alarm.id,
                alarm.reduction_key
            );
            return;
        }
        let alert = self.map(&alarm, None);
        let key = alarm.reduction_key.clone();
        // a re-fired alarm supersedes any parked resolve for the same key
        self.resolved.remove(&key);
        self.entries.insert(
            key,
            CachedAlarm {
                alarm: Arc::new(alarm),
                alert: alert.clone(),
                last_sent: time::now_millis(),
            },
        );
        metrics::ACTIVE_ALARMS.set(self.entries.len() as i64);
        self.emit(vec![alert]);
    }

    /// Remove the entry and push a resolve. Works for keys never seen, the
    /// aggregator tolerates idempotent resolves.
    pub fn resolve(&self, reduction_key: &str, alarm: Option<&Alarm>) {
        let removed = self.entries.remove(reduction_key).map(|(_, v)| v);
        metrics::ACTIVE_ALARMS.set(self.entries.len() as i64);
        let ends_at = time::now_rfc3339();
        let alert = match (alarm, removed) {
            (Some(alarm), _) => self.map(alarm, Some(ends_at)),
            (None, Some(cached)) => {
                let mut alert = cached.alert;
                alert.ends_at = Some(ends_at);
                alert
            }
            (None, None) => mapper::deleted_alert(reduction_key, ends_at),
        };
        self.park_resolved(reduction_key, alert.clone());
        self.emit(vec![alert]);
    }

    /// A tombstone deletes the alarm upstream; the raw record is gone, so
    /// the previously mapped alert carries the resolve.
    pub fn on_tombstone(&self, reduction_key: &str) {
        self.resolve(reduction_key, None);
    }

    /// One resend cycle: re-map every live entry against the current node
    /// cache, stamp it, and push everything (plus unexpired resolves) as a
    /// single batch. Returns the batch size.
    pub fn resend_all(&self) -> usize {
        let now_ms = time::now_millis();
        let snapshot: Vec<(String, Arc<Alarm>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().alarm.clone()))
            .collect();
        let mut batch = Vec::with_capacity(snapshot.len());
        for (key, alarm) in snapshot {
            let alert = self.map(&alarm, None);
            if let Some(mut entry) = self.entries.get_mut(&key) {
                entry.alert = alert.clone();
                entry.last_sent = now_ms;
            }
            batch.push(alert);
        }
        self.resolved.retain(|_, r| r.expires_at > now_ms);
        for r in self.resolved.iter() {
            batch.push(r.value().alert.clone());
        }
        let count = batch.len();
        self.emit(batch);
        count
    }

    pub fn iter_snapshot(&self) -> Vec<(String, CachedAlarm)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.resolved.clear();
        metrics::ACTIVE_ALARMS.set(0);
    }

    fn map(&self, alarm: &Alarm, ends_at: Option<String>) -> Alert {
        let node = alarm
            .node_criteria
            .as_ref()
            .and_then(|c| self.nodes.get_by_criteria(c));
        mapper::map_alarm(alarm, node.as_deref(), &self.settings, ends_at)
    }

    fn park_resolved(&self, reduction_key: &str, alert: Alert) {
        if self.resolved_retention_ms <= 0 {
            return;
        }
        self.resolved.insert(
            reduction_key.to_string(),
            ResolvedAlarm {
                alert,
                expires_at: time::now_millis() + self.resolved_retention_ms,
            },
        );
    }

    /// Hand a batch to the sink on its own task so ingest and the scheduler
    /// never wait out retry backoff.
    fn emit(&self, alerts: Vec<Alert>) {
        if alerts.is_empty() {
            return;
        }
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let _ = sink.send(&alerts).await;
        });
    }
}
