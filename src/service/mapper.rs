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

use std::collections::BTreeMap;

use config::utils::{json, time};
use hashbrown::HashSet;
use itertools::Itertools;

use crate::common::meta::{
    alarm::Alarm,
    alert::{ALERTNAME_LABEL, Alert},
    node::Node,
};

const UEI_PREFIXES: [&str; 2] = ["uei.opennms.org/", "uei."];

/// The slice of configuration the mapper consumes. Built once at startup;
/// tests construct it directly.
#[derive(Clone, Debug)]
pub struct MapperSettings {
    pub base_url: String,
    pub static_labels: Vec<(String, String)>,
    /// mapped severity names, lowercase; empty accepts everything
    pub include_severities: HashSet<String>,
    pub exclude_ueis: HashSet<String>,
    pub include_node_metadata: bool,
    pub node_metadata_prefix: String,
    pub include_node_categories: bool,
    pub categories_label: String,
    pub include_node_details: bool,
    pub node_details_key: String,
    pub include_description: bool,
    pub include_operator_instructions: bool,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8980/opennms".to_string(),
            static_labels: Vec::new(),
            include_severities: HashSet::new(),
            exclude_ueis: HashSet::new(),
            include_node_metadata: true,
            node_metadata_prefix: "node_meta_".to_string(),
            include_node_categories: true,
            categories_label: "opennms_categories".to_string(),
            include_node_details: false,
            node_details_key: "opennms_node".to_string(),
            include_description: true,
            include_operator_instructions: true,
        }
    }
}

impl MapperSettings {
    pub fn from_config(cfg: &config::Config) -> Self {
        Self {
            base_url: cfg.opennms.base_url.clone(),
            static_labels: cfg
                .alert
                .static_labels
                .split(',')
                .filter_map(|pair| {
                    let (k, v) = pair.split_once('=')?;
                    let (k, v) = (k.trim(), v.trim());
                    (!k.is_empty() && !v.is_empty()).then(|| (k.to_string(), v.to_string()))
                })
                .collect(),
            // severity names compare lowercase, UEIs are case-significant
            include_severities: split_set(&cfg.alert.include_severities.to_lowercase()),
            exclude_ueis: split_set(&cfg.alert.exclude_ueis),
            include_node_metadata: cfg.alert.include_node_metadata,
            node_metadata_prefix: cfg.alert.node_metadata_prefix.clone(),
            include_node_categories: cfg.alert.include_node_categories,
            categories_label: cfg.alert.categories_label.clone(),
            include_node_details: cfg.alert.include_node_details,
            node_details_key: cfg.alert.node_details_key.clone(),
            include_description: cfg.alert.include_description,
            include_operator_instructions: cfg.alert.include_operator_instructions,
        }
    }

    /// Filter policy. Clear records never reach this, they resolve instead.
    pub fn accepts(&self, alarm: &Alarm) -> bool {
        if !self.include_severities.is_empty()
            && !self
                .include_severities
                .contains(alarm.severity.alert_severity())
        {
            return false;
        }
        !self.exclude_ueis.contains(alarm.uei.as_str())
    }
}

fn split_set(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Derive the `alertname` label from a UEI. The body keeps its case, only
/// label keys are lowercased elsewhere.
pub fn alert_name(uei: &str) -> String {
    let body = UEI_PREFIXES
        .iter()
        .find_map(|p| uei.strip_prefix(p))
        .unwrap_or(uei);
    let mut out: String = body
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() {
        return "opennms_unknown".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    format!("opennms_{out}")
}

/// Force a label key into `^[a-z_][a-z0-9_]*$`.
pub fn sanitize_label_key(key: &str) -> String {
    let mut out: String = key
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

// keys are sanitised on the way in and empty values never emit a key
fn put(map: &mut BTreeMap<String, String>, key: &str, value: impl Into<String>) {
    let value = value.into();
    if value.is_empty() {
        return;
    }
    let key = sanitize_label_key(key);
    if key.is_empty() {
        return;
    }
    map.insert(key, value);
}

/// Map one alarm to one alertmanager alert. Never fails; enrichment is best
/// effort and a missing node just means fewer labels. `ends_at` is set by
/// the resolve paths only.
pub fn map_alarm(
    alarm: &Alarm,
    node: Option<&Node>,
    settings: &MapperSettings,
    ends_at: Option<String>,
) -> Alert {
    let mut labels = BTreeMap::new();
    labels.insert(ALERTNAME_LABEL.to_string(), alert_name(&alarm.uei));
    put(&mut labels, "opennms_alarm_id", alarm.id.to_string());
    put(&mut labels, "opennms_reduction_key", &alarm.reduction_key);
    put(&mut labels, "severity", alarm.severity.alert_severity());
    put(&mut labels, "opennms_alarm_type", alarm.alarm_type.as_label());
    put(&mut labels, "service", &alarm.service_name);
    if !alarm.ip_address.is_empty() {
        put(&mut labels, "instance", &alarm.ip_address);
        put(&mut labels, "ip_address", &alarm.ip_address);
    }
    if let Some(if_index) = alarm.if_index {
        put(&mut labels, "if_index", if_index.to_string());
    }
    if !alarm.trouble_ticket_id.is_empty() {
        put(&mut labels, "trouble_ticket_id", &alarm.trouble_ticket_id);
        if let Some(state) = alarm.trouble_ticket_state {
            put(&mut labels, "trouble_ticket_state", state.to_string());
        }
    }
    put(&mut labels, "managed_object_type", &alarm.managed_object_type);
    put(
        &mut labels,
        "managed_object_instance",
        &alarm.managed_object_instance,
    );

    if let Some(criteria) = &alarm.node_criteria
        && criteria.id > 0
    {
        put(&mut labels, "node_id", criteria.id.to_string());
        put(&mut labels, "node_label", &criteria.node_label);
        put(&mut labels, "foreign_source", &criteria.foreign_source);
        put(&mut labels, "foreign_id", &criteria.foreign_id);
        put(&mut labels, "location", &criteria.location);
    }

    if let Some(node) = node {
        if settings.include_node_categories && !node.categories.is_empty() {
            put(
                &mut labels,
                &settings.categories_label,
                node.categories.iter().join(","),
            );
        }
        if settings.include_node_metadata {
            for (key, value) in &node.flat_metadata {
                put(
                    &mut labels,
                    &format!("{}{}", settings.node_metadata_prefix, key),
                    value,
                );
            }
        }
        put(&mut labels, "sys_object_id", &node.sys_object_id);
    }

    // static labels go in last and never shadow a computed label
    for (key, value) in &settings.static_labels {
        let key = sanitize_label_key(key);
        if !key.is_empty() && !value.is_empty() {
            labels.entry(key).or_insert_with(|| value.clone());
        }
    }

    let mut annotations = BTreeMap::new();
    put(&mut annotations, "summary", &alarm.log_message);
    if settings.include_description {
        put(&mut annotations, "description", &alarm.description);
    }
    if settings.include_operator_instructions {
        put(&mut annotations, "runbook", &alarm.operator_instructions);
    }
    if alarm.count > 0 {
        put(&mut annotations, "alarm_count", alarm.count.to_string());
    }
    put(&mut annotations, "opennms_uei", &alarm.uei);
    if !alarm.ack_user.is_empty() {
        put(&mut annotations, "acknowledged_by", &alarm.ack_user);
        if alarm.ack_time > 0
            && let Some(at) = time::millis_to_rfc3339(alarm.ack_time)
        {
            put(&mut annotations, "acknowledged_at", at);
        }
    }
    if settings.include_node_details
        && let Some(node) = node
    {
        match json::to_string(node) {
            Ok(body) => put(&mut annotations, &settings.node_details_key, body),
            Err(e) => {
                // drop only this annotation, the alert still goes out
                log::warn!(
                    "[MAPPER] node details for alarm {} not serializable: {e}",
                    alarm.id
                );
            }
        }
    }
    if !alarm.related_alarms.is_empty() {
        put(
            &mut annotations,
            "related_alarms",
            alarm
                .related_alarms
                .iter()
                .map(|r| r.reduction_key.as_str())
                .filter(|rk| !rk.is_empty())
                .join(","),
        );
    }

    let starts_at = (alarm.first_event_time > 0)
        .then(|| time::millis_to_rfc3339(alarm.first_event_time))
        .flatten();

    Alert {
        labels,
        annotations,
        starts_at,
        ends_at,
        generator_url: format!("{}/alarm/detail.htm?id={}", settings.base_url, alarm.id),
    }
}

/// The synthetic resolve for a tombstone whose fire was never seen. Only the
/// stream key survives, so that is all the label set carries.
pub fn deleted_alert(reduction_key: &str, ends_at: String) -> Alert {
    let mut labels = BTreeMap::new();
    labels.insert(
        ALERTNAME_LABEL.to_string(),
        "opennms_alarm_deleted".to_string(),
    );
    put(&mut labels, "opennms_reduction_key", reduction_key);
    Alert {
        labels,
        ends_at: Some(ends_at),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::common::meta::alarm::{AlarmType, NodeCriteria, Severity};

    use super::*;

    fn sample_alarm() -> Alarm {
        Alarm {
            id: 1,
            reduction_key: "rk1".to_string(),
            uei: "uei.opennms.org/nodes/nodeDown".to_string(),
            severity: Severity::Major,
            alarm_type: AlarmType::Raise,
            first_event_time: 1700000000000,
            log_message: "node down".to_string(),
            count: 1,
            node_criteria: Some(NodeCriteria {
                id: 10,
                foreign_source: "fs".to_string(),
                foreign_id: "n10".to_string(),
                node_label: "router-1".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn sample_node() -> Node {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "requisition".to_string(),
            BTreeMap::from([("rack".to_string(), "r12".to_string())]),
        );
        Node {
            id: 10,
            foreign_source: "fs".to_string(),
            foreign_id: "n10".to_string(),
            label: "router-1".to_string(),
            categories: vec!["core".to_string()],
            metadata,
            ..Default::default()
        }
        .with_flat_metadata()
    }

    #[test]
    fn test_alert_name_strips_prefixes_and_keeps_case() {
        assert_eq!(
            alert_name("uei.opennms.org/nodes/nodeDown"),
            "opennms_nodes_nodeDown"
        );
        assert_eq!(alert_name("uei.custom/thing-x"), "opennms_custom_thing_x");
        assert_eq!(alert_name("no-prefix here"), "opennms_no_prefix_here");
    }

    #[test]
    fn test_alert_name_boundary_cases() {
        assert_eq!(alert_name(""), "opennms_unknown");
        assert_eq!(alert_name("uei.opennms.org/"), "opennms_unknown");
        assert_eq!(alert_name("uei.5xx/storm"), "opennms__5xx_storm");
        // non-ascii collapses to underscores
        assert_eq!(alert_name("uei.überAlarm"), "opennms__berAlarm");
    }

    #[test]
    fn test_sanitize_label_key() {
        assert_eq!(sanitize_label_key("Context:Key"), "context_key");
        assert_eq!(sanitize_label_key("9lives"), "_9lives");
        assert_eq!(sanitize_label_key("already_fine_2"), "already_fine_2");
    }

    #[test]
    fn test_single_fire_mapping() {
        let settings = MapperSettings::default();
        let alert = map_alarm(&sample_alarm(), Some(&sample_node()), &settings, None);
        assert_eq!(alert.labels["alertname"], "opennms_nodes_nodeDown");
        assert_eq!(alert.labels["severity"], "major");
        assert_eq!(alert.labels["node_id"], "10");
        assert_eq!(alert.labels["node_label"], "router-1");
        assert_eq!(alert.labels["foreign_source"], "fs");
        assert_eq!(alert.labels["opennms_categories"], "core");
        assert_eq!(alert.labels["node_meta_requisition_rack"], "r12");
        assert_eq!(alert.annotations["summary"], "node down");
        assert_eq!(alert.annotations["alarm_count"], "1");
        assert_eq!(alert.starts_at.as_deref(), Some("2023-11-14T22:13:20Z"));
        assert!(alert.ends_at.is_none());
        assert_eq!(
            alert.generator_url,
            "http://localhost:8980/opennms/alarm/detail.htm?id=1"
        );
    }

    #[test]
    fn test_enrichment_miss_degrades_gracefully() {
        let settings = MapperSettings::default();
        let alert = map_alarm(&sample_alarm(), None, &settings, None);
        assert!(!alert.labels.contains_key("opennms_categories"));
        assert!(!alert.labels.contains_key("sys_object_id"));
        // node-criteria labels still come from the alarm itself
        assert_eq!(alert.labels["node_label"], "router-1");
    }

    #[test]
    fn test_label_keys_and_values_are_well_formed() {
        let settings = MapperSettings {
            static_labels: vec![("Env".to_string(), "prod".to_string())],
            ..Default::default()
        };
        let mut alarm = sample_alarm();
        alarm.service_name = "".to_string(); // empty value never emits a key
        let alert = map_alarm(&alarm, Some(&sample_node()), &settings, None);
        for (key, value) in &alert.labels {
            assert!(!value.is_empty(), "label {key} has an empty value");
            if key == "alertname" {
                continue;
            }
            let mut chars = key.chars();
            let first = chars.next().unwrap();
            assert!(first.is_ascii_lowercase() || first == '_');
            assert!(
                chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "label key {key} is not sanitised"
            );
        }
        assert!(!alert.labels.contains_key("service"));
        assert_eq!(alert.labels["env"], "prod");
    }

    #[test]
    fn test_static_labels_never_override_computed() {
        let settings = MapperSettings {
            static_labels: vec![
                ("severity".to_string(), "low".to_string()),
                ("team".to_string(), "noc".to_string()),
            ],
            ..Default::default()
        };
        let alert = map_alarm(&sample_alarm(), None, &settings, None);
        assert_eq!(alert.labels["severity"], "major");
        assert_eq!(alert.labels["team"], "noc");
    }

    #[test]
    fn test_filter_by_severity_and_uei() {
        let settings = MapperSettings {
            include_severities: HashSet::from_iter(["critical".to_string()]),
            ..Default::default()
        };
        assert!(!settings.accepts(&sample_alarm()));

        let mut settings = MapperSettings::default();
        settings
            .exclude_ueis
            .insert("uei.opennms.org/nodes/nodeDown".to_string());
        assert!(!settings.accepts(&sample_alarm()));
        assert!(MapperSettings::default().accepts(&sample_alarm()));
    }

    #[test]
    fn test_exclude_ueis_from_config_preserves_case() {
        let mut cfg = config::Config::init().unwrap();
        cfg.alert.exclude_ueis =
            "uei.opennms.org/nodes/nodeDown, uei.opennms.org/nodes/nodeUp".to_string();
        let settings = MapperSettings::from_config(&cfg);
        assert!(!settings.accepts(&sample_alarm()));

        let mut other = sample_alarm();
        other.uei = "uei.opennms.org/nodes/interfaceDown".to_string();
        assert!(settings.accepts(&other));
    }

    #[test]
    fn test_include_severities_from_config_is_case_insensitive() {
        let mut cfg = config::Config::init().unwrap();
        cfg.alert.include_severities = "Critical,MAJOR".to_string();
        let settings = MapperSettings::from_config(&cfg);
        assert!(settings.accepts(&sample_alarm()));

        let mut minor = sample_alarm();
        minor.severity = Severity::Minor;
        assert!(!settings.accepts(&minor));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let settings = MapperSettings::default();
        let node = sample_node();
        let a = map_alarm(&sample_alarm(), Some(&node), &settings, None);
        let b = map_alarm(&sample_alarm(), Some(&node), &settings, None);
        assert_eq!(
            json::to_string(&a).unwrap(),
            json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_alarm_without_node_criteria_maps_without_node_labels() {
        let mut alarm = sample_alarm();
        alarm.node_criteria = None;
        let alert = map_alarm(&alarm, None, &MapperSettings::default(), None);
        assert!(!alert.labels.contains_key("node_id"));
        assert!(!alert.labels.contains_key("node_label"));
        assert_eq!(alert.labels["opennms_reduction_key"], "rk1");
    }

    #[test]
    fn test_zero_first_event_time_omits_starts_at() {
        let mut alarm = sample_alarm();
        alarm.first_event_time = 0;
        let alert = map_alarm(&alarm, None, &MapperSettings::default(), None);
        assert!(alert.starts_at.is_none());
    }

    #[test]
    fn test_acknowledgement_annotations() {
        let mut alarm = sample_alarm();
        alarm.ack_user = "admin".to_string();
        alarm.ack_time = 1700000000000;
        let alert = map_alarm(&alarm, None, &MapperSettings::default(), None);
        assert_eq!(alert.annotations["acknowledged_by"], "admin");
        assert_eq!(alert.annotations["acknowledged_at"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_node_details_annotation_when_enabled() {
        let settings = MapperSettings {
            include_node_details: true,
            ..Default::default()
        };
        let alert = map_alarm(&sample_alarm(), Some(&sample_node()), &settings, None);
        let body = &alert.annotations["opennms_node"];
        let node: Node = json::from_str(body).unwrap();
        assert_eq!(node.id, 10);
    }

    #[test]
    fn test_deleted_alert_shape() {
        let alert = deleted_alert("rkX", "2023-11-14T22:13:20Z".to_string());
        assert_eq!(alert.labels["alertname"], "opennms_alarm_deleted");
        assert_eq!(alert.labels["opennms_reduction_key"], "rkX");
        assert!(alert.is_resolved());
        assert!(alert.starts_at.is_none());
    }
}
