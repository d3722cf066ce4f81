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

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OpenNMS alarm severity. Unknown wire values decode as `Indeterminate`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Warning,
    Normal,
    Cleared,
    #[default]
    #[serde(other)]
    Indeterminate,
}

impl Severity {
    /// The `severity` label value on the alertmanager side.
    pub fn alert_severity(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Warning => "warning",
            Severity::Normal => "info",
            Severity::Cleared => "resolved",
            Severity::Indeterminate => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let name = match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Warning => "warning",
            Severity::Normal => "normal",
            Severity::Cleared => "cleared",
            Severity::Indeterminate => "indeterminate",
        };
        write!(f, "{name}")
    }
}

/// OpenNMS alarm type, `1` raises a problem and `2` clears one. Anything
/// else is carried through as `Unknown` and treated like a raise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(from = "i32", into = "i32")]
pub enum AlarmType {
    Raise,
    Clear,
    #[default]
    Unknown,
}

impl AlarmType {
    pub fn as_label(&self) -> &'static str {
        match self {
            AlarmType::Raise => "raise",
            AlarmType::Clear => "clear",
            AlarmType::Unknown => "unknown",
        }
    }
}

impl From<i32> for AlarmType {
    fn from(v: i32) -> Self {
        match v {
            1 => AlarmType::Raise,
            2 => AlarmType::Clear,
            _ => AlarmType::Unknown,
        }
    }
}

impl From<AlarmType> for i32 {
    fn from(v: AlarmType) -> Self {
        match v {
            AlarmType::Raise => 1,
            AlarmType::Clear => 2,
            AlarmType::Unknown => 0,
        }
    }
}

/// The reference an alarm carries to the node it concerns.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeCriteria {
    pub id: i64,
    pub foreign_source: String,
    pub foreign_id: String,
    pub node_label: String,
    pub location: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RelatedAlarm {
    pub id: i64,
    pub reduction_key: String,
    pub uei: String,
    pub severity: Severity,
}

/// An OpenNMS fault alarm as it arrives on the alarms topic. The reduction
/// key is the per-alarm uniqueness key and doubles as the stream record key.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Alarm {
    pub id: i64,
    pub reduction_key: String,
    pub uei: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub alarm_type: AlarmType,
    /// epoch milliseconds, 0 = unset
    pub first_event_time: i64,
    pub service_name: String,
    pub ip_address: String,
    pub if_index: Option<i32>,
    pub trouble_ticket_id: String,
    pub trouble_ticket_state: Option<i32>,
    pub managed_object_type: String,
    pub managed_object_instance: String,
    pub log_message: String,
    pub description: String,
    pub operator_instructions: String,
    pub count: i64,
    pub ack_user: String,
    /// epoch milliseconds, 0 = not acknowledged
    pub ack_time: i64,
    pub node_criteria: Option<NodeCriteria>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_alarms: Vec<RelatedAlarm>,
}

impl Alarm {
    /// A clear in either dimension resolves the alarm instead of refreshing it.
    pub fn is_clear(&self) -> bool {
        self.severity == Severity::Cleared || self.alarm_type == AlarmType::Clear
    }
}

#[cfg(test)]
mod tests {
    use config::utils::json;

    use super::*;

    #[test]
    fn test_severity_decodes_unknown_values_as_indeterminate() {
        let sev: Severity = json::from_str("\"MAJOR\"").unwrap();
        assert_eq!(sev, Severity::Major);
        let sev: Severity = json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(sev, Severity::Indeterminate);
    }

    #[test]
    fn test_severity_mapping_table() {
        assert_eq!(Severity::Critical.alert_severity(), "critical");
        assert_eq!(Severity::Normal.alert_severity(), "info");
        assert_eq!(Severity::Cleared.alert_severity(), "resolved");
        assert_eq!(Severity::Indeterminate.alert_severity(), "unknown");
    }

    #[test]
    fn test_alarm_type_from_wire() {
        assert_eq!(AlarmType::from(1), AlarmType::Raise);
        assert_eq!(AlarmType::from(2), AlarmType::Clear);
        assert_eq!(AlarmType::from(3), AlarmType::Unknown);
    }

    #[test]
    fn test_alarm_decodes_with_missing_fields() {
        let alarm: Alarm = json::from_str(
            r#"{"id":1,"reductionKey":"rk1","uei":"uei.opennms.org/nodes/nodeDown","severity":"MAJOR","type":1}"#,
        )
        .unwrap();
        assert_eq!(alarm.reduction_key, "rk1");
        assert_eq!(alarm.severity, Severity::Major);
        assert_eq!(alarm.alarm_type, AlarmType::Raise);
        assert!(!alarm.is_clear());
        assert!(alarm.node_criteria.is_none());
        assert_eq!(alarm.first_event_time, 0);
    }

    #[test]
    fn test_is_clear_on_either_dimension() {
        let mut alarm = Alarm {
            severity: Severity::Cleared,
            ..Default::default()
        };
        assert!(alarm.is_clear());
        alarm.severity = Severity::Major;
        alarm.alarm_type = AlarmType::Clear;
        assert!(alarm.is_clear());
    }
}
